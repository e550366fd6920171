use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat metadata stored next to each vector: scalar values only.
pub type Attributes = Map<String, Value>;

/// Attribute key that mirrors the product id inside the metadata.
pub const SEQ_ID_KEY: &str = "seq_id";

/// A normalized catalog entry ready for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u32,
    pub searchable_text: String,
    pub attributes: Attributes,
}

impl Product {
    pub fn vector_id(&self) -> String {
        self.id.to_string()
    }

    pub fn name(&self) -> String {
        display_name(&self.attributes)
    }
}

/// One entry of the per-request candidate set.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: u32,
    pub name: String,
}

impl Candidate {
    pub fn from_attributes(id: u32, attributes: &Attributes) -> Self {
        Self {
            id,
            name: display_name(attributes),
        }
    }
}

/// Product name as shown to the model. Raw catalogs use either `name` or `Title`.
pub fn display_name(attributes: &Attributes) -> String {
    ["name", "Title"]
        .iter()
        .filter_map(|key| attributes.get(*key))
        .map(scalar_to_string)
        .find(|name| !name.trim().is_empty())
        .unwrap_or_default()
}

/// Render a scalar JSON value as plain text (`null` becomes empty).
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
