//! Identifier parsing for the `_id` field.

use bson::{Bson, Document, oid::ObjectId};

use crate::error::{DocumentError, DocumentResult};

/// Name of the identifier field in stored records.
pub const ID_FIELD: &str = "_id";

/// Parses a BSON value as a canonical [`ObjectId`].
///
/// Accepts an `ObjectId` or its 24 character hex string form. Anything else fails with
/// [`DocumentError::FieldValidation`] naming the rejected value.
pub fn parse_object_id(value: &Bson) -> DocumentResult<ObjectId> {
    match value {
        Bson::ObjectId(id) => Ok(*id),
        Bson::String(s) => ObjectId::parse_str(s).map_err(|_| invalid_id(value)),
        _ => Err(invalid_id(value)),
    }
}

/// Rewrites a string `_id` in a filter document into its canonical `ObjectId` form.
///
/// Non-string `_id` values (already canonical, or operator documents) are left alone.
pub fn normalize_id_filter(filter: &mut Document) -> DocumentResult<()> {
    if let Some(value @ Bson::String(_)) = filter.get(ID_FIELD) {
        let parsed = parse_object_id(value)?;
        filter.insert(ID_FIELD, parsed);
    }

    Ok(())
}

fn invalid_id(value: &Bson) -> DocumentError {
    DocumentError::FieldValidation {
        field: ID_FIELD.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn parses_hex_and_object_ids() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&Bson::ObjectId(id)).unwrap(), id);
        assert_eq!(parse_object_id(&Bson::String(id.to_hex())).unwrap(), id);
    }

    #[test]
    fn rejects_malformed_ids_with_value() {
        let err = parse_object_id(&Bson::String("not-24-hex-chars".into())).unwrap_err();
        match err {
            DocumentError::FieldValidation { field, value } => {
                assert_eq!(field, "_id");
                assert!(value.contains("not-24-hex-chars"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(parse_object_id(&Bson::Int32(18)).is_err());
    }

    #[test]
    fn normalizes_string_id_in_filter() {
        let id = ObjectId::new();
        let mut filter = doc! { "_id": id.to_hex(), "name": "Alice" };
        normalize_id_filter(&mut filter).unwrap();
        assert_eq!(filter.get_object_id("_id").unwrap(), id);

        let mut filter = doc! { "_id": { "$in": [id] } };
        normalize_id_filter(&mut filter).unwrap();
        assert!(filter.get_document("_id").is_ok());
    }
}
