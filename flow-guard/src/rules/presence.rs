//! Presence rules.

use super::RuleCheck;
use serde_json::Value;

/// Fails when the field is absent. Registered as `isExists` and `required`.
///
/// `null` counts as present.
#[derive(Debug, Clone)]
pub struct IsExists {
    name: String,
}

impl IsExists {
    /// Creates the rule under the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl RuleCheck for IsExists {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, value: Option<&mut Value>, _args: &[Value]) -> bool {
        value.is_some()
    }

    fn checks_missing(&self) -> bool {
        true
    }

    fn default_message(&self) -> &str {
        "is required"
    }
}

/// Fails on `null`, empty strings, empty arrays and empty objects.
#[derive(Debug, Clone, Copy)]
pub struct NotEmpty;

impl RuleCheck for NotEmpty {
    fn name(&self) -> &str {
        "notEmpty"
    }

    fn check(&self, value: Option<&mut Value>, _args: &[Value]) -> bool {
        match value {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }

    fn default_message(&self) -> &str {
        "must not be empty"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_exists() {
        let rule = IsExists::new("required");
        assert_eq!(rule.name(), "required");
        assert!(rule.checks_missing());
        assert!(rule.check(Some(&mut json!(null)), &[]));
        assert!(!rule.check(None, &[]));
    }

    #[test]
    fn test_not_empty() {
        assert!(NotEmpty.check(Some(&mut json!("x")), &[]));
        assert!(NotEmpty.check(Some(&mut json!(0)), &[]));
        assert!(!NotEmpty.check(Some(&mut json!("")), &[]));
        assert!(!NotEmpty.check(Some(&mut json!([])), &[]));
        assert!(!NotEmpty.check(Some(&mut json!({})), &[]));
        assert!(!NotEmpty.check(Some(&mut json!(null)), &[]));
    }
}
