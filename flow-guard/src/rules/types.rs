//! Type predicates and value membership.

use super::RuleCheck;
use crate::error::{FlowError, Result};
use serde_json::Value;
use std::fmt;

/// The JSON value kinds a [`TypeCheck`] can assert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    /// A number without a fractional part
    Integer,
    Boolean,
    Array,
    Object,
}

impl ValueKind {
    /// Returns the rule name for this kind.
    pub fn rule_name(&self) -> &'static str {
        match self {
            ValueKind::String => "isString",
            ValueKind::Number => "isNumber",
            ValueKind::Integer => "isInteger",
            ValueKind::Boolean => "isBoolean",
            ValueKind::Array => "isArray",
            ValueKind::Object => "isObject",
        }
    }

    /// Returns true if `value` is of this kind.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueKind::String => value.is_string(),
            ValueKind::Number => value.is_number(),
            ValueKind::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().map_or(false, |n| n.is_finite() && n.fract() == 0.0)
            }
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::Array => value.is_array(),
            ValueKind::Object => value.is_object(),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Integer => "integer",
            ValueKind::Boolean => "boolean",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        };
        write!(f, "{name}")
    }
}

/// Asserts the JSON kind of a present value.
#[derive(Debug, Clone)]
pub struct TypeCheck {
    kind: ValueKind,
    message: String,
}

impl TypeCheck {
    /// Creates a type check for `kind`.
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            message: format!("must be {} {kind}", article(kind)),
        }
    }
}

fn article(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Array | ValueKind::Integer | ValueKind::Object => "an",
        _ => "a",
    }
}

impl RuleCheck for TypeCheck {
    fn name(&self) -> &str {
        self.kind.rule_name()
    }

    fn check(&self, value: Option<&mut Value>, _args: &[Value]) -> bool {
        value.map_or(false, |v| self.kind.matches(v))
    }

    fn default_message(&self) -> &str {
        &self.message
    }
}

/// Passes when the value equals one of the rule arguments (`isIn`).
#[derive(Debug, Clone, Copy)]
pub struct IsIn;

impl RuleCheck for IsIn {
    fn name(&self) -> &str {
        "isIn"
    }

    fn check(&self, value: Option<&mut Value>, args: &[Value]) -> bool {
        let Some(value) = value else {
            return false;
        };
        match args {
            [Value::Array(allowed)] => allowed.contains(value),
            allowed => allowed.contains(value),
        }
    }

    fn default_message(&self) -> &str {
        "is not an allowed value"
    }

    fn validate_args(&self, args: &[Value]) -> Result<()> {
        if args.is_empty() {
            return Err(FlowError::invalid_args(
                self.name(),
                "expected at least one allowed value",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_checks() {
        assert!(TypeCheck::new(ValueKind::String).check(Some(&mut json!("a")), &[]));
        assert!(!TypeCheck::new(ValueKind::String).check(Some(&mut json!(1)), &[]));
        assert!(TypeCheck::new(ValueKind::Number).check(Some(&mut json!(1.5)), &[]));
        assert!(TypeCheck::new(ValueKind::Integer).check(Some(&mut json!(2.0)), &[]));
        assert!(!TypeCheck::new(ValueKind::Integer).check(Some(&mut json!(2.5)), &[]));
        assert!(TypeCheck::new(ValueKind::Array).check(Some(&mut json!([])), &[]));
        assert!(!TypeCheck::new(ValueKind::Object).check(None, &[]));
    }

    #[test]
    fn test_type_check_messages() {
        assert_eq!(
            TypeCheck::new(ValueKind::Array).default_message(),
            "must be an array"
        );
        assert_eq!(
            TypeCheck::new(ValueKind::String).default_message(),
            "must be a string"
        );
    }

    #[test]
    fn test_is_in() {
        let allowed = [json!("red"), json!("green")];
        assert!(IsIn.check(Some(&mut json!("red")), &allowed));
        assert!(!IsIn.check(Some(&mut json!("blue")), &allowed));
        assert!(IsIn.check(Some(&mut json!(2)), &[json!([1, 2, 3])]));
        assert!(IsIn.validate_args(&[]).is_err());
    }
}
