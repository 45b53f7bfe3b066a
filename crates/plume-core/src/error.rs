//! Error types for Plume

use thiserror::Error;

/// The main error type for Plume operations
#[derive(Debug, Error)]
pub enum PlumeError {
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    #[error("Invalid parameter type for {name}: expected {expected}, got {got}")]
    InvalidParameterType {
        name: String,
        expected: String,
        got: String,
    },

    #[error("Invalid enum value for {name}: {value} is not one of {allowed:?}")]
    InvalidEnumValue {
        name: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("Attribute already registered: {0}")]
    AttributeAlreadyRegistered(String),

    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("Attribute type mismatch for {name}: expected {expected}")]
    AttributeTypeMismatch { name: String, expected: String },

    #[error("Cannot reduce particle capacity from {current} to {requested}")]
    InvalidCapacity { current: usize, requested: usize },

    #[error("Definition not found: {0}")]
    DefinitionNotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("Asset error: {0}")]
    AssetError(String),
}

/// Result type alias for Plume operations
pub type Result<T> = std::result::Result<T, PlumeError>;

impl From<toml::de::Error> for PlumeError {
    fn from(err: toml::de::Error) -> Self {
        PlumeError::TomlParseError(err.to_string())
    }
}

impl PlumeError {
    /// Shorthand for a parameter kind mismatch
    pub fn wrong_type(name: &str, expected: &str, got: &str) -> Self {
        PlumeError::InvalidParameterType {
            name: name.to_string(),
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = PlumeError::wrong_type("EmitterLife", "float", "bool");
        assert_eq!(
            err.to_string(),
            "Invalid parameter type for EmitterLife: expected float, got bool"
        );

        let err = PlumeError::InvalidCapacity {
            current: 96,
            requested: 64,
        };
        assert!(err.to_string().contains("96"));
    }

    #[test]
    fn toml_errors_convert() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("a = [");
        let err: PlumeError = parsed.unwrap_err().into();
        assert!(matches!(err, PlumeError::TomlParseError(_)));
    }
}
