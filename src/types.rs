use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// JSON payload of an item.
pub type JsonObject = Map<String, Value>;

/// Name of the binary property that carries the generated workbook.
pub const BINARY_PROPERTY: &str = "data";

//==============================================================================
// Node Parameters
//==============================================================================

/// Pairs a 1-based spreadsheet column with the item field written into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub index: u32,
    pub property: String,
}

impl ColumnMapping {
    pub fn new(index: u32, property: impl Into<String>) -> Self {
        Self {
            index,
            property: property.into(),
        }
    }
}

/// The `columnsConfig` parameter. Mappings keep their configured order, so
/// for two mappings on the same column the later one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsConfig {
    #[serde(default)]
    pub index_column: Vec<ColumnMapping>,
}

impl ColumnsConfig {
    pub fn new(index_column: Vec<ColumnMapping>) -> Self {
        Self { index_column }
    }

    pub fn is_empty(&self) -> bool {
        self.index_column.is_empty()
    }
}

/// Resolved node parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillParameters {
    pub template_file: String,
    pub start_row: u32,
    pub columns_config: ColumnsConfig,
}

//==============================================================================
// Items
//==============================================================================

/// One item flowing in or out of the node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionData {
    #[serde(default)]
    pub json: JsonObject,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binary: BTreeMap<String, BinaryData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_item: Option<usize>,
}

impl NodeExecutionData {
    pub fn from_json(json: JsonObject) -> Self {
        Self {
            json,
            ..Default::default()
        }
    }

    /// An item with no JSON fields and a single binary attachment.
    pub fn with_binary(property: impl Into<String>, data: BinaryData) -> Self {
        let mut binary = BTreeMap::new();
        binary.insert(property.into(), data);
        Self {
            binary,
            ..Default::default()
        }
    }

    /// A diagnostic item for an input item that failed under continue-on-fail.
    pub fn failed(json: JsonObject, error: impl Into<String>, item_index: usize) -> Self {
        Self {
            json,
            binary: BTreeMap::new(),
            error: Some(error.into()),
            paired_item: Some(item_index),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<JsonObject> for NodeExecutionData {
    fn from(json: JsonObject) -> Self {
        Self::from_json(json)
    }
}

/// Binary attachment of an item. `data` travels as base64 in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryData {
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
    pub file_extension: String,
    pub file_size: usize,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_columns_config_camel_case() {
        let config: ColumnsConfig = serde_json::from_value(json!({
            "indexColumn": [{"index": 2, "property": "name"}]
        }))
        .unwrap();
        assert_eq!(config.index_column, vec![ColumnMapping::new(2, "name")]);
    }

    #[test]
    fn test_columns_config_missing_collection_is_empty() {
        let config: ColumnsConfig = serde_json::from_value(json!({})).unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_binary_data_base64() {
        let binary = BinaryData {
            data: b"PK".to_vec(),
            mime_type: "application/zip".to_string(),
            file_name: "a.zip".to_string(),
            file_extension: "zip".to_string(),
            file_size: 2,
        };
        let value = serde_json::to_value(&binary).unwrap();
        assert_eq!(value["data"], "UEs=");
        assert_eq!(value["mimeType"], "application/zip");

        let back: BinaryData = serde_json::from_value(value).unwrap();
        assert_eq!(back.data, b"PK");
    }

    #[test]
    fn test_failed_item_shape() {
        let mut json = JsonObject::new();
        json.insert("name".to_string(), json!("Bob"));
        let item = NodeExecutionData::failed(json, "boom", 3);
        assert!(item.is_error());

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["pairedItem"], 3);
        assert_eq!(value["error"], "boom");
        assert!(value.get("binary").is_none());
    }
}
