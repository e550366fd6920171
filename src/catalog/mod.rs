//! Normalization of raw catalog records into indexable products.
//!
//! Raw datasets are loosely shaped: some rows use `name`/`price`, others
//! `Title`/`Price`, and attributes may nest. Each record becomes a single
//! searchable text blob plus a flat, scalar-only attribute map suitable for
//! vector-store metadata.

use serde_json::{Map, Value};
use std::{fs::File, io::BufReader, path::Path};
use tracing::{error, warn};

use crate::{
    error::{ApiError, Result},
    models::{scalar_to_string, Attributes, Product, SEQ_ID_KEY},
};

const KEY_SEPARATOR: &str = "_";
const LIST_SEPARATOR: &str = ", ";

/// Read a catalog file: either a JSON array of products or an object holding
/// the array under `field`.
pub fn load_catalog(path: &Path, field: &str) -> Result<Vec<Value>> {
    let file = File::open(path)?;
    let data: Value = serde_json::from_reader(BufReader::new(file))?;
    extract_records(data, field)
}

pub fn extract_records(data: Value, field: &str) -> Result<Vec<Value>> {
    match data {
        Value::Array(records) => Ok(records),
        Value::Object(mut object) => match object.remove(field) {
            Some(Value::Array(records)) => Ok(records),
            Some(_) => Err(ApiError::InvalidInput(format!(
                "Catalog field '{}' is not an array",
                field
            ))),
            None => {
                warn!("Catalog object has no '{}' field; nothing to load", field);
                Ok(Vec::new())
            }
        },
        _ => Err(ApiError::InvalidInput(
            "Unexpected catalog format: expected an array or an object".to_string(),
        )),
    }
}

/// Normalize every record. Ids follow catalog position (1-based) even when a
/// record is skipped, so re-ingesting the same file reproduces the same ids.
pub fn normalize_catalog(records: &[Value]) -> Vec<Product> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let normalized = normalize_record(index + 1, record);
            if normalized.is_none() {
                error!("Skipping catalog record {}: not a JSON object", index + 1);
            }
            normalized
        })
        .collect()
}

pub fn normalize_record(position: usize, record: &Value) -> Option<Product> {
    let raw = record.as_object()?;
    let id = u32::try_from(position).ok()?;

    let searchable_text = searchable_text(raw);
    if first_non_empty(raw, &["name", "Title"]).is_empty() {
        warn!("Product {} has no valid name", id);
    }

    let mut attributes = flatten_attributes(raw);
    attributes.insert(SEQ_ID_KEY.to_string(), Value::from(id));

    Some(Product {
        id,
        searchable_text,
        attributes,
    })
}

/// Text embedded for similarity search.
pub fn searchable_text(raw: &Map<String, Value>) -> String {
    let name = first_non_empty(raw, &["name", "Title"]);
    let brand = first_non_empty(raw, &["brand"]);
    let price = first_non_empty(raw, &["price", "Price"]);
    let description = first_non_empty(raw, &["description"]);
    let image = first_non_empty(raw, &["image"]);
    let color = first_non_empty(raw, &["color"]);

    format!(
        "Product: {}. Brand: {}. Price: {}. Description: {}. Image: {}. Color: {}.",
        name, brand, price, description, image, color
    )
    .trim()
    .to_string()
}

/// Flatten nested objects into `parent_child` keys and coerce every value to a
/// scalar: lists join into a comma-separated string, nulls become `""`.
pub fn flatten_attributes(raw: &Map<String, Value>) -> Attributes {
    let mut flat = Attributes::new();
    flatten_into(&mut flat, raw, "");
    flat
}

fn flatten_into(flat: &mut Attributes, object: &Map<String, Value>, parent: &str) {
    for (key, value) in object {
        let key = if parent.is_empty() {
            key.clone()
        } else {
            format!("{}{}{}", parent, KEY_SEPARATOR, key)
        };

        match value {
            Value::Object(nested) => flatten_into(flat, nested, &key),
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(scalar_to_string)
                    .collect::<Vec<_>>()
                    .join(LIST_SEPARATOR);
                flat.insert(key, Value::String(joined));
            }
            Value::Null => {
                flat.insert(key, Value::String(String::new()));
            }
            scalar => {
                flat.insert(key, scalar.clone());
            }
        }
    }
}

fn first_non_empty(raw: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .map(scalar_to_string)
        .find(|value| !value.trim().is_empty())
        .unwrap_or_default()
}
