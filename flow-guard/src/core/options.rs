//! Validator options and configurable messages.
//!
//! Both types deserialize with defaults for every missing field, so they can
//! be loaded from any serde-supported configuration format and applied with
//! [`Validator::with_options`](super::Validator::with_options) and
//! [`Validator::with_messages`](super::Validator::with_messages).

use serde::{Deserialize, Serialize};

/// Run policies of a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    /// Report declared top-level keys that are absent from the record
    pub strict: bool,
    /// Keep validating other paths after a failure
    pub collect_all: bool,
    /// Accept arrays as root records, validating every element
    pub array_root_allowed: bool,
    /// Maximum path depth; `None` is unbounded
    pub max_depth: Option<usize>,
    /// Whether nested validators inherit the running depth budget
    pub max_depth_propagates: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            strict: false,
            collect_all: false,
            array_root_allowed: false,
            max_depth: None,
            max_depth_propagates: true,
        }
    }
}

impl ValidatorOptions {
    /// Strict, collect-all options for reporting every problem in a record.
    pub fn exhaustive() -> Self {
        Self {
            strict: true,
            collect_all: true,
            ..Self::default()
        }
    }
}

/// Messages recorded by the engine itself rather than by rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// Recorded under `??` when the root record is rejected
    pub invalid_root: String,
    /// Recorded for declared keys missing in strict mode
    pub missing_key: String,
    /// Recorded at `<path>.*` when the depth limit is hit
    pub max_depth_reached: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            invalid_root: "invalid root".to_string(),
            missing_key: "missing key".to_string(),
            max_depth_reached: "max depth reached".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ValidatorOptions::default();
        assert!(!options.strict);
        assert!(!options.collect_all);
        assert!(!options.array_root_allowed);
        assert_eq!(options.max_depth, None);
        assert!(options.max_depth_propagates);
    }

    #[test]
    fn test_exhaustive_preset() {
        let options = ValidatorOptions::exhaustive();
        assert!(options.strict);
        assert!(options.collect_all);
        assert!(options.max_depth_propagates);
    }

    #[test]
    fn test_partial_deserialization() {
        let options: ValidatorOptions =
            serde_json::from_str(r#"{"strict": true, "max_depth": 3}"#).unwrap();
        assert!(options.strict);
        assert_eq!(options.max_depth, Some(3));
        assert!(options.max_depth_propagates);

        let messages: Messages = serde_json::from_str(r#"{"missing_key": "is missing"}"#).unwrap();
        assert_eq!(messages.missing_key, "is missing");
        assert_eq!(messages.invalid_root, "invalid root");
    }
}
