//! Schema validation/parsing errors.

use thiserror::Error;
use w3f_types::ArgType;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArgsError {
    #[error("missing required user arg \"{key}\" (expected {expected:?}, e.g. {example})")]
    MissingKey {
        key: String,
        expected: ArgType,
        example: &'static str,
    },

    #[error("user arg \"{key}\" has the wrong type: expected {expected:?}, e.g. {example}")]
    WrongType {
        key: String,
        expected: ArgType,
        example: &'static str,
    },

    #[error("user arg \"{key}\" is a heterogeneous array: expected {expected:?}, e.g. {example}")]
    HeterogeneousArray {
        key: String,
        expected: ArgType,
        example: &'static str,
    },

    #[error("user arg \"{key}\" is not valid JSON: {message}")]
    InvalidJson { key: String, message: String },
}

impl ArgsError {
    pub fn missing(key: &str, expected: ArgType) -> Self {
        ArgsError::MissingKey {
            key: key.to_string(),
            expected,
            example: expected.example_literal(),
        }
    }

    pub fn wrong_type(key: &str, expected: ArgType) -> Self {
        ArgsError::WrongType {
            key: key.to_string(),
            expected,
            example: expected.example_literal(),
        }
    }

    pub fn heterogeneous(key: &str, expected: ArgType) -> Self {
        ArgsError::HeterogeneousArray {
            key: key.to_string(),
            expected,
            example: expected.example_literal(),
        }
    }
}
