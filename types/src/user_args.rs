//! User-args schema and typed value map.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A declared argument type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArgType {
    Boolean,
    Number,
    String,
    #[serde(rename = "boolean[]")]
    BooleanArray,
    #[serde(rename = "number[]")]
    NumberArray,
    #[serde(rename = "string[]")]
    StringArray,
}

impl ArgType {
    /// A short example literal for this type, used in schema error messages.
    pub fn example_literal(self) -> &'static str {
        match self {
            ArgType::Boolean => "true",
            ArgType::Number => "0",
            ArgType::String => "\"example\"",
            ArgType::BooleanArray => "[true, false]",
            ArgType::NumberArray => "[0, 1]",
            ArgType::StringArray => "[\"a\", \"b\"]",
        }
    }
}

/// Declared schema: argument name -> expected type.
pub type UserArgsSchema = HashMap<String, ArgType>;

/// A single typed user-arg value, as it arrives already-typed (e.g. from a
/// prior parse, or when constructed programmatically for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserArgsValue {
    Boolean(bool),
    Number(f64),
    String(String),
    BooleanArray(Vec<bool>),
    NumberArray(Vec<f64>),
    StringArray(Vec<String>),
}

impl UserArgsValue {
    /// The `ArgType` this value is an instance of.
    pub fn arg_type(&self) -> ArgType {
        match self {
            UserArgsValue::Boolean(_) => ArgType::Boolean,
            UserArgsValue::Number(_) => ArgType::Number,
            UserArgsValue::String(_) => ArgType::String,
            UserArgsValue::BooleanArray(_) => ArgType::BooleanArray,
            UserArgsValue::NumberArray(_) => ArgType::NumberArray,
            UserArgsValue::StringArray(_) => ArgType::StringArray,
        }
    }
}

/// The typed map of user-supplied arguments, keyed by name.
pub type UserArgs = HashMap<String, UserArgsValue>;
