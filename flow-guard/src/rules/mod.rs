//! Named rules and the registry that resolves them.
//!
//! A schema refers to rules by name (`"isString"`, `"minLength"`, ...). The
//! [`RuleRegistry`] maps those names to [`RuleCheck`] implementations when a
//! schema is compiled, so unknown names are reported at construction time and
//! never looked up again while validating.
//!
//! ## Built-in rules
//!
//! | Name | Arguments | Kind |
//! |---|---|---|
//! | `isExists`, `required` | none | presence |
//! | `notEmpty` | none | predicate |
//! | `isString`, `isNumber`, `isInteger`, `isBoolean`, `isArray`, `isObject` | none | type |
//! | `minLength`, `maxLength` | length | predicate |
//! | `matches` | pattern | predicate |
//! | `isIn` | allowed values | predicate |
//! | `trim`, `toLowerCase` | none | sanitizer |

mod presence;
mod strings;
mod types;

pub use presence::{IsExists, NotEmpty};
pub use strings::{Length, LengthBound, Matches, Sanitizer, Sanitize};
pub use types::{IsIn, TypeCheck, ValueKind};

pub(crate) use strings::validate_pattern;

use crate::error::{FlowError, Result};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Message used when a rule fails without a configured message of its own.
pub const GENERIC_MESSAGE: &str = "invalid value";

/// A leaf rule that can be evaluated against a single field.
///
/// Rules receive the field value (or `None` when the field is absent) and the
/// arguments declared in the schema. Returning `false` marks the field as
/// invalid. Sanitizers may rewrite the value in place and return `true`.
///
/// # Examples
///
/// ```rust
/// use flow_guard::rules::RuleCheck;
/// use serde_json::Value;
///
/// #[derive(Debug)]
/// struct IsPositive;
///
/// impl RuleCheck for IsPositive {
///     fn name(&self) -> &str {
///         "isPositive"
///     }
///
///     fn check(&self, value: Option<&mut Value>, _args: &[Value]) -> bool {
///         value.and_then(|v| v.as_f64()).map_or(false, |n| n > 0.0)
///     }
/// }
/// ```
pub trait RuleCheck: Debug + Send + Sync {
    /// Returns the name the rule is registered under.
    fn name(&self) -> &str;

    /// Evaluates the rule.
    fn check(&self, value: Option<&mut Value>, args: &[Value]) -> bool;

    /// Whether the rule runs for absent fields.
    ///
    /// Most rules only apply to values that are present; presence checks
    /// override this to observe missing fields.
    fn checks_missing(&self) -> bool {
        false
    }

    /// Message recorded when the rule fails and the schema gives none.
    fn default_message(&self) -> &str {
        GENERIC_MESSAGE
    }

    /// Validates the schema arguments once, when the schema is compiled.
    fn validate_args(&self, _args: &[Value]) -> Result<()> {
        Ok(())
    }
}

/// Registry mapping rule names to implementations.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rules: HashMap<String, Arc<dyn RuleCheck>>,
    generic_message: String,
}

static BUILTIN: Lazy<Arc<RuleRegistry>> = Lazy::new(|| Arc::new(RuleRegistry::with_builtins()));

impl RuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
            generic_message: GENERIC_MESSAGE.to_string(),
        }
    }

    /// Returns the shared registry of built-in rules.
    pub fn builtin() -> Arc<RuleRegistry> {
        Arc::clone(&BUILTIN)
    }

    /// Creates a registry populated with the built-in rules.
    ///
    /// Use this as a starting point for registering custom rules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(IsExists::new("isExists"));
        registry.register(IsExists::new("required"));
        registry.register(NotEmpty);
        for kind in [
            ValueKind::String,
            ValueKind::Number,
            ValueKind::Integer,
            ValueKind::Boolean,
            ValueKind::Array,
            ValueKind::Object,
        ] {
            registry.register(TypeCheck::new(kind));
        }
        registry.register(Length::new(LengthBound::Min));
        registry.register(Length::new(LengthBound::Max));
        registry.register(Matches);
        registry.register(IsIn);
        registry.register(Sanitizer::new(Sanitize::Trim));
        registry.register(Sanitizer::new(Sanitize::LowerCase));
        registry
    }

    /// Registers a rule, replacing any rule with the same name.
    pub fn register(&mut self, rule: impl RuleCheck + 'static) -> &mut Self {
        self.rules.insert(rule.name().to_string(), Arc::new(rule));
        self
    }

    /// Sets the message used by custom rules that reject without a message.
    pub fn set_generic_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.generic_message = message.into();
        self
    }

    /// Returns the generic invalid-value message.
    pub fn generic_message(&self) -> &str {
        &self.generic_message
    }

    /// Looks up a rule by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn RuleCheck>> {
        self.rules.get(name).cloned()
    }

    /// Looks up a rule by name, failing with [`FlowError::UnknownRule`].
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn RuleCheck>> {
        self.get(name).ok_or_else(|| FlowError::unknown_rule(name))
    }

    /// Returns true if a rule is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct AlwaysFails;

    impl RuleCheck for AlwaysFails {
        fn name(&self) -> &str {
            "alwaysFails"
        }

        fn check(&self, _value: Option<&mut Value>, _args: &[Value]) -> bool {
            false
        }
    }

    #[test]
    fn test_builtin_registry_contents() {
        let registry = RuleRegistry::builtin();
        for name in [
            "isExists",
            "required",
            "isString",
            "isNumber",
            "isArray",
            "minLength",
            "matches",
            "trim",
        ] {
            assert!(registry.contains(name), "missing builtin {name}");
        }
        assert!(!registry.contains("dummy"));
    }

    #[test]
    fn test_resolve_unknown_rule() {
        let err = RuleRegistry::builtin().resolve("dummy").unwrap_err();
        assert_eq!(err, FlowError::unknown_rule("dummy"));
    }

    #[test]
    fn test_register_custom_rule() {
        let mut registry = RuleRegistry::with_builtins();
        registry
            .register(AlwaysFails)
            .set_generic_message("nope");

        let rule = registry.resolve("alwaysFails").unwrap();
        assert!(!rule.check(Some(&mut json!(1)), &[]));
        assert_eq!(rule.default_message(), GENERIC_MESSAGE);
        assert_eq!(registry.generic_message(), "nope");
    }
}
