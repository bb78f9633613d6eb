//! Runtime creation of document classes.
//!
//! Classes made here are bound when they are created, so they skip the lazy resolution
//! through the process-wide connection. They are registered in a caller-owned
//! [`Namespace`] under their name.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::{capability::Capability, class::DocumentClass, store::Database};

/// An ordered registry of document classes, keyed by class name.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    classes: IndexMap<String, DocumentClass>,
}

impl Namespace {
    /// Creates an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `class` under its name, returning the class it replaces.
    pub fn register(&mut self, class: DocumentClass) -> Option<DocumentClass> {
        self.classes
            .insert(class.name().to_string(), class)
    }

    /// Returns the class registered under `name`.
    pub fn get(&self, name: &str) -> Option<&DocumentClass> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Returns the number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterates classes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DocumentClass)> {
        self.classes
            .iter()
            .map(|(name, class)| (name.as_str(), class))
    }
}

/// Creates a document class bound to `database` and registers it in `namespace`.
///
/// The collection name defaults to the snake_case plural of `name`.
///
/// # Example
///
/// ```ignore
/// let mut models = Namespace::new();
/// let users = create_document_class(&db, &mut models, "User", None, Vec::new());
///
/// assert_eq!(users.collection_name(), "users");
/// assert!(models.contains("User"));
/// ```
pub fn create_document_class(
    database: &Database,
    namespace: &mut Namespace,
    name: &str,
    collection_name: Option<&str>,
    capabilities: Vec<Arc<dyn Capability>>,
) -> DocumentClass {
    let mut builder = DocumentClass::builder(name).bind(database);

    if let Some(collection_name) = collection_name {
        builder = builder.collection(collection_name);
    }

    let class = capabilities
        .into_iter()
        .fold(builder, |builder, capability| builder.shared_capability(capability))
        .build();

    namespace.register(class.clone());
    class
}
