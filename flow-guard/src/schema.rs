//! Raw schema tokens.
//!
//! A [`Schema`] is an ordered mapping from paths to rule lists, written with
//! the same shorthands a configuration literal would use: rule names with an
//! optional `:message` suffix, `[name, args...]` tuples, functions and nested
//! sub-schemas. Tokens are interpreted exactly once, when a
//! [`Validator`](crate::core::Validator) is constructed.
//!
//! # Examples
//!
//! ```rust
//! use flow_guard::schema::{Arg, Outcome, Rule, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::new()
//!     .path("name", ["isExists:name is required", "isString:name must be text"])
//!     .path("age", vec![Rule::tuple(["default".into(), Arg::from(json!(18))])])
//!     .path("tags", ["isArray"])
//!     .path("tags.[]", vec![Rule::custom(|value, _key, _record| {
//!         Outcome::from(value.as_str().map_or(false, |tag| !tag.is_empty()))
//!     })]);
//! assert_eq!(schema.len(), 4);
//! ```

use crate::core::Validator;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Result of a custom rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The value is valid
    Pass,
    /// The value is invalid; the string is recorded as the message
    Fail(String),
    /// The value is invalid; the registry's generic message is recorded
    Reject,
}

impl From<bool> for Outcome {
    fn from(passed: bool) -> Self {
        if passed {
            Outcome::Pass
        } else {
            Outcome::Reject
        }
    }
}

impl From<&str> for Outcome {
    fn from(message: &str) -> Self {
        Outcome::Fail(message.to_string())
    }
}

impl From<String> for Outcome {
    fn from(message: String) -> Self {
        Outcome::Fail(message)
    }
}

/// A custom rule: `(value, key, record) -> Outcome`.
///
/// `value` is a snapshot of the field; `record` is the object (or array)
/// holding the field and may be modified to sanitize it.
pub type CustomFn = Arc<dyn Fn(&Value, &str, &mut Value) -> Outcome + Send + Sync>;

/// An inline condition for `if` rules.
pub type ConditionFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Computes a default value from the field key.
pub type DefaultFn = Arc<dyn Fn(&str) -> Value + Send + Sync>;

/// An argument of a tuple rule.
#[derive(Clone)]
pub enum Arg {
    /// A plain value (rule names, literals, rule arguments)
    Value(Value),
    /// A custom rule function
    Custom(CustomFn),
    /// An inline condition
    Condition(ConditionFn),
    /// A default value factory
    Default(DefaultFn),
    /// A plain sub-schema
    Schema(Schema),
    /// An existing validator
    Validator(Validator),
}

impl Arg {
    /// Wraps a custom rule function.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value, &str, &mut Value) -> Outcome + Send + Sync + 'static,
    {
        Arg::Custom(Arc::new(f))
    }

    /// Wraps an inline condition.
    pub fn condition<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Arg::Condition(Arc::new(f))
    }

    /// Wraps a default value factory.
    pub fn default_with<F>(f: F) -> Self
    where
        F: Fn(&str) -> Value + Send + Sync + 'static,
    {
        Arg::Default(Arc::new(f))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Arg::Value(_) => "value",
            Arg::Custom(_) => "custom function",
            Arg::Condition(_) => "condition",
            Arg::Default(_) => "default function",
            Arg::Schema(_) => "schema",
            Arg::Validator(_) => "validator",
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(value) => write!(f, "Value({value})"),
            Arg::Schema(schema) => f.debug_tuple("Schema").field(schema).finish(),
            Arg::Validator(validator) => f.debug_tuple("Validator").field(validator).finish(),
            other => write!(f, "<{}>", other.kind()),
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Value(Value::String(value.to_string()))
    }
}

impl From<Schema> for Arg {
    fn from(schema: Schema) -> Self {
        Arg::Schema(schema)
    }
}

impl From<Validator> for Arg {
    fn from(validator: Validator) -> Self {
        Arg::Validator(validator)
    }
}

impl From<&Validator> for Arg {
    fn from(validator: &Validator) -> Self {
        Arg::Validator(validator.clone())
    }
}

/// A single rule token.
#[derive(Clone)]
pub enum Rule {
    /// `"name"` or `"name:message"`
    Name(String),
    /// `[name, args...]`
    Tuple(Vec<Arg>),
    /// A bare custom rule function
    Custom(CustomFn),
    /// A plain sub-schema applied to the field value
    Schema(Schema),
    /// A validator applied to the field value
    Validator(Validator),
}

impl Rule {
    /// Builds a tuple rule.
    pub fn tuple(args: impl IntoIterator<Item = Arg>) -> Self {
        Rule::Tuple(args.into_iter().collect())
    }

    /// Builds a bare custom rule.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value, &str, &mut Value) -> Outcome + Send + Sync + 'static,
    {
        Rule::Custom(Arc::new(f))
    }

    /// Shorthand for `["include", name]`.
    pub fn include(name: &str) -> Self {
        Rule::tuple(["include".into(), name.into()])
    }

    /// Shorthand for `["default", value]`.
    pub fn default_value(value: impl Into<Value>) -> Self {
        Rule::tuple(["default".into(), Arg::Value(value.into())])
    }

    /// Shorthand for `["if", condition, then, else]`.
    pub fn when(condition: Arg, then: impl Into<Arg>, otherwise: impl Into<Arg>) -> Self {
        Rule::tuple(["if".into(), condition, then.into(), otherwise.into()])
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Rule::Tuple(args) => f.debug_tuple("Tuple").field(args).finish(),
            Rule::Custom(_) => write!(f, "Custom(<function>)"),
            Rule::Schema(schema) => f.debug_tuple("Schema").field(schema).finish(),
            Rule::Validator(validator) => f.debug_tuple("Validator").field(validator).finish(),
        }
    }
}

impl From<&str> for Rule {
    fn from(token: &str) -> Self {
        Rule::Name(token.to_string())
    }
}

impl From<String> for Rule {
    fn from(token: String) -> Self {
        Rule::Name(token)
    }
}

impl From<Schema> for Rule {
    fn from(schema: Schema) -> Self {
        Rule::Schema(schema)
    }
}

impl From<Validator> for Rule {
    fn from(validator: Validator) -> Self {
        Rule::Validator(validator)
    }
}

/// An ordered mapping from paths to rule lists.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entries: Vec<(String, Vec<Rule>)>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds rules for `path`.
    ///
    /// Declaring the same path twice appends to the first declaration.
    pub fn path<I, R>(mut self, path: impl Into<String>, rules: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        let path = path.into();
        let rules = rules.into_iter().map(Into::into);
        match self.entries.iter_mut().find(|(existing, _)| *existing == path) {
            Some((_, existing)) => existing.extend(rules),
            None => self.entries.push((path, rules.collect())),
        }
        self
    }

    /// Returns the number of declared paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no path is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, Vec<Rule>)> {
        self.entries
    }
}

/// A root procedure call: `[name, args...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    pub name: String,
    pub args: Vec<Value>,
}

impl Procedure {
    pub fn new(name: impl Into<String>, args: impl IntoIterator<Item = Value>) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Shorthand for `["filterKeys", pattern]`.
    pub fn filter_keys(pattern: &str) -> Self {
        Self::new("filterKeys", [Value::String(pattern.to_string())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_preserves_declaration_order() {
        let schema = Schema::new()
            .path("b", ["isString"])
            .path("a", ["isNumber"])
            .path("b", ["isExists"]);

        let entries = schema.into_entries();
        let paths: Vec<_> = entries.iter().map(|(path, _)| path.as_str()).collect();
        assert_eq!(paths, vec!["b", "a"]);
        assert_eq!(entries[0].1.len(), 2);
    }

    #[test]
    fn test_outcome_conversions() {
        assert_eq!(Outcome::from(true), Outcome::Pass);
        assert_eq!(Outcome::from(false), Outcome::Reject);
        assert_eq!(Outcome::from("bad"), Outcome::Fail("bad".to_string()));
    }

    #[test]
    fn test_rule_shorthands() {
        let Rule::Tuple(args) = Rule::include("self") else {
            panic!("expected a tuple");
        };
        assert_eq!(args.len(), 2);
        assert!(matches!(&args[1], Arg::Value(v) if *v == json!("self")));

        let Rule::Tuple(args) = Rule::default_value(1) else {
            panic!("expected a tuple");
        };
        assert!(matches!(&args[1], Arg::Value(v) if *v == json!(1)));
    }

    #[test]
    fn test_filter_keys_procedure() {
        let procedure = Procedure::filter_keys("^(a)$");
        assert_eq!(procedure.name, "filterKeys");
        assert_eq!(procedure.args, vec![json!("^(a)$")]);
    }
}
