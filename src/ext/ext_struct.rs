use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// Dynamically typed value stored in a plugin's field map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PluginValue {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<PluginValue>),
    Map(BTreeMap<String, PluginValue>),
}

impl PluginValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            PluginValue::Nil => "nil",
            PluginValue::Bool(_) => "bool",
            PluginValue::Int(_) => "int",
            PluginValue::Float(_) => "float",
            PluginValue::Str(_) => "string",
            PluginValue::Bytes(_) => "bytes",
            PluginValue::Array(_) => "array",
            PluginValue::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PluginValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PluginValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// Why a typed field lookup failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("field '{0}' is missing")]
    Missing(String),
    #[error("field '{name}' is {found}, expected {expected}")]
    WrongType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// One plugin's saved data: its own version number and a field map.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct PluginRecord {
    pub version: i32,
    pub fields: BTreeMap<String, PluginValue>,
}

impl PluginRecord {
    pub fn field(&self, name: &str) -> Option<&PluginValue> {
        self.fields.get(name)
    }

    pub fn str_field(&self, name: &str) -> Result<&str, FieldError> {
        let value = self
            .field(name)
            .ok_or_else(|| FieldError::Missing(name.to_string()))?;
        value.as_str().ok_or_else(|| FieldError::WrongType {
            name: name.to_string(),
            expected: "string",
            found: value.type_name(),
        })
    }

    pub fn int_field(&self, name: &str) -> Result<i64, FieldError> {
        let value = self
            .field(name)
            .ok_or_else(|| FieldError::Missing(name.to_string()))?;
        value.as_i64().ok_or_else(|| FieldError::WrongType {
            name: name.to_string(),
            expected: "int",
            found: value.type_name(),
        })
    }
}

/// Decoded extended save block.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedPayload {
    pub marker: String,
    pub version: i32,
    /// Plugin records in the order they were stored. Ids are unique.
    pub plugins: Vec<(String, PluginRecord)>,
}

impl ExtendedPayload {
    pub fn plugin(&self, id: &str) -> Option<&PluginRecord> {
        self.plugins
            .iter()
            .find(|(plugin_id, _)| plugin_id == id)
            .map(|(_, record)| record)
    }

    pub fn plugin_ids(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|(id, _)| id.as_str())
    }
}
