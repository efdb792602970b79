use serde::{Serialize, Deserialize};
use std::collections::HashMap;
use crate::core::error::{Error, Result};

/// Stable document identifier: the 0-based ordinal of the accepted data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u32);

impl DocId {
    /// Native bindings exchange ids as signed 32-bit words.
    pub fn as_native(&self) -> Result<i32> {
        i32::try_from(self.0)
            .map_err(|_| Error::invalid_argument(format!("doc id {} exceeds native id range", self.0)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
}

/// Parsed, dimension-normalized vector. Construct through
/// [`crate::dataset::parser::reduce_dimension_vector`] so that every record
/// handed to a backend has exactly the configured dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord(pub Vec<f32>);

#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocId,
    pub fields: HashMap<String, FieldValue>,
    pub vector_field: String,
    pub vector: Vec<f32>,
}

impl Document {
    pub fn new(id: DocId, vector_field: &str, vector: VectorRecord) -> Self {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), FieldValue::Text(id.0.to_string()));
        Document {
            id,
            fields,
            vector_field: vector_field.to_string(),
            vector: vector.0,
        }
    }

    pub fn with_field(mut self, name: &str, value: FieldValue) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_stores_id_field() {
        let doc = Document::new(DocId(7), "title_vector", VectorRecord(vec![1.0, 2.0]));
        assert_eq!(doc.get_field("id"), Some(&FieldValue::Text("7".into())));
        assert_eq!(doc.vector.len(), 2);
    }

    #[test]
    fn native_id_conversion_rejects_ids_past_i32() {
        assert_eq!(DocId(12).as_native().unwrap(), 12);
        assert!(DocId(u32::MAX).as_native().is_err());
    }
}
