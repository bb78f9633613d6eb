//! Find options, filter helpers and the filter expression tree.
//!
//! Filters are plain operator-style BSON documents (`{"age": {"$gt": 30}}`) handed to the
//! store as-is. Backends that evaluate filters themselves parse them into an [`Expr`] tree
//! with [`Expr::from_filter`] and walk it with a [`QueryVisitor`].
//!
//! # Find options
//!
//! ```ignore
//! use docmodel::query::{FindOptions, SortDirection};
//!
//! let options = FindOptions::builder()
//!     .sort("age", SortDirection::Desc)
//!     .limit(10)
//!     .skip(20)
//!     .build();
//! ```
//!
//! # Filter helpers
//!
//! [`Filter`] builds the documents for the common operators:
//!
//! ```ignore
//! use docmodel::query::Filter;
//!
//! let adults = Filter::and([Filter::gte("age", 18), Filter::exists("email")]);
//! ```

use bson::{Bson, Document, doc};

use crate::error::{DocumentError, DocumentResult};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Storage constant for ascending sorts.
pub const ASCENDING: i32 = 1;
/// Storage constant for descending sorts.
pub const DESCENDING: i32 = -1;

impl SortDirection {
    /// The numeric form stores expect in sort documents.
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Asc => ASCENDING,
            SortDirection::Desc => DESCENDING,
        }
    }
}

/// Sort specification for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Options passed through to the store's find primitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Inclusion or exclusion projection. `None` returns whole records.
    pub projection: Option<Document>,
    /// Sort keys, applied in order.
    pub sort: Vec<Sort>,
    /// Maximum number of records to return. `Some(0)` is the same as no limit.
    pub limit: Option<usize>,
    /// Number of records to skip.
    pub skip: Option<usize>,
    /// Return only the index keys of each record.
    pub return_key: bool,
}

impl FindOptions {
    /// Creates a new options builder for fluent construction.
    pub fn builder() -> FindOptionsBuilder {
        FindOptionsBuilder::new()
    }

    /// The effective limit, treating `0` as unlimited.
    pub fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|limit| *limit > 0)
    }

    /// Renders the sort keys as a sort document (`{"age": -1}`).
    pub fn sort_document(&self) -> Option<Document> {
        if self.sort.is_empty() {
            return None;
        }

        Some(
            self.sort
                .iter()
                .map(|s| (s.field.clone(), Bson::Int32(s.direction.as_i32())))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindOptionsBuilder {
    options: FindOptions,
}

impl FindOptionsBuilder {
    /// Creates a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts or excludes returned fields.
    pub fn projection(mut self, projection: Document) -> Self {
        self.options.projection = Some(projection);
        self
    }

    /// Appends a sort key. Keys apply in the order they were added.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.options.sort.push(Sort { field: field.into(), direction });
        self
    }

    /// Sets the maximum number of records to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Sets the number of records to skip.
    pub fn skip(mut self, skip: usize) -> Self {
        self.options.skip = Some(skip);
        self
    }

    /// Requests index keys only.
    pub fn return_key(mut self, return_key: bool) -> Self {
        self.options.return_key = return_key;
        self
    }

    /// Builds and returns the final options.
    pub fn build(self) -> FindOptions {
        self.options
    }
}

/// Helper for constructing operator-style filter documents.
pub struct Filter;

impl Filter {
    /// Matches records where the field equals the value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::op(field, "$eq", value)
    }

    /// Matches records where the field does not equal the value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::op(field, "$ne", value)
    }

    /// Matches records where the field is greater than the value.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::op(field, "$gt", value)
    }

    /// Matches records where the field is greater than or equal to the value.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::op(field, "$gte", value)
    }

    /// Matches records where the field is less than the value.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::op(field, "$lt", value)
    }

    /// Matches records where the field is less than or equal to the value.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Document {
        Self::op(field, "$lte", value)
    }

    /// Matches records where the field is one of the values.
    pub fn is_in<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Document {
        Self::op(field, "$in", values.into_iter().map(Into::into).collect::<Vec<Bson>>())
    }

    /// Matches records where the field is none of the values.
    pub fn not_in<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Document {
        Self::op(field, "$nin", values.into_iter().map(Into::into).collect::<Vec<Bson>>())
    }

    /// Matches records that have the field.
    pub fn exists(field: impl Into<String>) -> Document {
        Self::op(field, "$exists", true)
    }

    /// Matches records where every filter matches.
    pub fn and(filters: impl IntoIterator<Item = Document>) -> Document {
        doc! { "$and": filters.into_iter().collect::<Vec<_>>() }
    }

    /// Matches records where at least one filter matches.
    pub fn or(filters: impl IntoIterator<Item = Document>) -> Document {
        doc! { "$or": filters.into_iter().collect::<Vec<_>>() }
    }

    fn op(field: impl Into<String>, op: &str, value: impl Into<Bson>) -> Document {
        let mut inner = Document::new();
        inner.insert(op, value.into());

        let mut outer = Document::new();
        outer.insert(field.into(), inner);
        outer
    }
}

/// Field comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal to (also matches any array element).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Member of the given array of values.
    In,
    /// Not a member of the given array of values.
    Nin,
}

impl FieldOp {
    fn from_operator(op: &str) -> Option<Self> {
        Some(match op {
            "$eq" => FieldOp::Eq,
            "$ne" => FieldOp::Ne,
            "$gt" => FieldOp::Gt,
            "$gte" => FieldOp::Gte,
            "$lt" => FieldOp::Lt,
            "$lte" => FieldOp::Lte,
            "$in" => FieldOp::In,
            "$nin" => FieldOp::Nin,
            _ => return None,
        })
    }
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// All expressions must match. An empty list always matches.
    And(Vec<Expr>),
    /// Any expression must match.
    Or(Vec<Expr>),
    /// No expression may match.
    Nor(Vec<Expr>),
    /// Inverts the result.
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The field name (dotted paths address nested documents).
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: impl Into<String>, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field: field.into(), op, value }
    }

    /// Parses an operator-style filter document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidFilter`] for unknown operators or malformed operands.
    pub fn from_filter(filter: &Document) -> DocumentResult<Expr> {
        let mut exprs = Vec::with_capacity(filter.len());

        for (key, value) in filter {
            exprs.push(match key.as_str() {
                "$and" => Expr::And(Self::parse_list(key, value)?),
                "$or" => Expr::Or(Self::parse_list(key, value)?),
                "$nor" => Expr::Nor(Self::parse_list(key, value)?),
                op if op.starts_with('$') => {
                    return Err(DocumentError::InvalidFilter(format!("unsupported top-level operator {op}")));
                }
                field => Self::parse_field(field, value)?,
            });
        }

        Ok(match exprs.len() {
            1 => exprs.remove(0),
            _ => Expr::And(exprs),
        })
    }

    fn parse_list(op: &str, value: &Bson) -> DocumentResult<Vec<Expr>> {
        let Bson::Array(items) = value else {
            return Err(DocumentError::InvalidFilter(format!("{op} expects an array, got {value}")));
        };

        items
            .iter()
            .map(|item| match item {
                Bson::Document(doc) => Self::from_filter(doc),
                other => Err(DocumentError::InvalidFilter(format!("{op} expects documents, got {other}"))),
            })
            .collect()
    }

    fn parse_field(field: &str, value: &Bson) -> DocumentResult<Expr> {
        match value {
            Bson::Document(ops) if is_operator_document(ops) => Self::parse_operators(field, ops),
            _ => Ok(Expr::field(field, FieldOp::Eq, value.clone())),
        }
    }

    fn parse_operators(field: &str, ops: &Document) -> DocumentResult<Expr> {
        let mut exprs = Vec::with_capacity(ops.len());

        for (op, operand) in ops {
            exprs.push(match op.as_str() {
                "$exists" => Expr::Exists(field.to_string(), is_truthy(operand)),
                "$not" => match operand {
                    Bson::Document(inner) if is_operator_document(inner) => {
                        Self::parse_operators(field, inner)?.not()
                    }
                    other => {
                        return Err(DocumentError::InvalidFilter(format!(
                            "$not on {field} expects an operator document, got {other}"
                        )));
                    }
                },
                other => {
                    let op = FieldOp::from_operator(other).ok_or_else(|| {
                        DocumentError::InvalidFilter(format!("unsupported operator {other} on {field}"))
                    })?;
                    if matches!(op, FieldOp::In | FieldOp::Nin) && !matches!(operand, Bson::Array(_)) {
                        return Err(DocumentError::InvalidFilter(format!(
                            "{other} on {field} expects an array, got {operand}"
                        )));
                    }
                    Expr::field(field, op, operand.clone())
                }
            });
        }

        Ok(match exprs.len() {
            1 => exprs.remove(0),
            _ => Expr::And(exprs),
        })
    }

    /// Combines this expression with another using logical AND.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

fn is_operator_document(doc: &Document) -> bool {
    !doc.is_empty() && doc.keys().all(|k| k.starts_with('$'))
}

fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        Bson::Null => false,
        _ => true,
    }
}

/// Walks an [`Expr`] tree, producing one output per node.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_nor(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Nor(exprs) => self.visit_nor(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}
