//! Node metadata shown to hosts: name, ports and parameter definitions

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescription {
    pub display_name: String,
    pub name: String,
    pub icon: String,
    pub group: Vec<String>,
    pub version: u32,
    pub description: String,
    pub defaults: NodeDefaults,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub properties: Vec<NodeProperty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefaults {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyType {
    String,
    Number,
    FixedCollection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProperty {
    pub display_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(default)]
    pub required: bool,
    pub default: Value,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_options: Option<TypeOptions>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<PropertyCollection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_values: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_data_path: Option<String>,
}

/// One repeatable group inside a fixed collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyCollection {
    pub name: String,
    pub display_name: String,
    pub values: Vec<NodeProperty>,
}

impl NodeDescription {
    pub fn property(&self, name: &str) -> Option<&NodeProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

impl NodeProperty {
    fn new(display_name: &str, name: &str, kind: PropertyType, default: Value) -> Self {
        Self {
            display_name: display_name.to_string(),
            name: name.to_string(),
            kind,
            required: false,
            default,
            description: String::new(),
            placeholder: None,
            type_options: None,
            options: Vec::new(),
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    fn options(mut self, type_options: TypeOptions) -> Self {
        self.type_options = Some(type_options);
        self
    }
}

pub(super) fn excel_by_template() -> NodeDescription {
    let index = NodeProperty::new("Index", "index", PropertyType::Number, json!(1)).options(
        TypeOptions {
            min_value: Some(1),
            ..Default::default()
        },
    );
    let property = NodeProperty::new("Property", "property", PropertyType::String, json!(""))
        .describe("Set property column")
        .options(TypeOptions {
            requires_data_path: Some("single".to_string()),
            ..Default::default()
        });

    let mut columns = NodeProperty::new(
        "Columns",
        "columnsConfig",
        PropertyType::FixedCollection,
        json!({}),
    )
    .required()
    .describe("Add Columns")
    .options(TypeOptions {
        multiple_values: Some(true),
        ..Default::default()
    });
    columns.placeholder = Some("Add Columns".to_string());
    columns.options = vec![PropertyCollection {
        name: "indexColumn".to_string(),
        display_name: "Index Column".to_string(),
        values: vec![index, property],
    }];

    NodeDescription {
        display_name: "Excel By Template".to_string(),
        name: "excelByTemplate".to_string(),
        icon: "file:excelByTemplate.svg".to_string(),
        group: vec!["transform".to_string()],
        version: 1,
        description: "Create Excel By Template".to_string(),
        defaults: NodeDefaults {
            name: "ExcelByTemplate".to_string(),
        },
        inputs: vec!["main".to_string()],
        outputs: vec!["main".to_string()],
        properties: vec![
            NodeProperty::new("Template File", "templateFile", PropertyType::String, json!(""))
                .required()
                .describe("Template File")
                .options(TypeOptions {
                    requires_data_path: Some("multiple".to_string()),
                    ..Default::default()
                }),
            NodeProperty::new("Start Row", "startRow", PropertyType::Number, json!(1))
                .required()
                .describe("Start Row")
                .options(TypeOptions {
                    min_value: Some(1),
                    ..Default::default()
                }),
            columns,
        ],
    }
}
