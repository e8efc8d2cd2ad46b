//! Error types for the flow-guard validation engine.
//!
//! Every configuration problem (a malformed schema, an unknown rule, an
//! include that was never resolved) is represented by [`FlowError`]. Data
//! validation failures are never errors: they are collected in the
//! validator's error map and reported through the boolean result of
//! `validate`.

use thiserror::Error;

/// The main error type for flow-guard.
///
/// These are programmer errors: they are raised while compiling a schema,
/// while wiring validators together, or when `validate` is called on a
/// validator that is not fully configured.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// A named rule is not registered.
    #[error("Rule is not defined: {name}")]
    UnknownRule { name: String },

    /// The argument of a `custom` rule is not a function.
    #[error("Rule [custom] must be given a function")]
    InvalidCustomRule,

    /// An `if` tuple lacks its condition or one of its branches.
    #[error("Rule [if] must contain a condition checker and two sub-flows")]
    MalformedConditional,

    /// The condition of an `if` tuple is neither a rule name nor a function.
    #[error("Rule [if] must define a valid condition checker")]
    InvalidCondition,

    /// The named condition of an `if` tuple is not registered.
    #[error("Condition checker is not defined: {name}")]
    UnknownCondition { name: String },

    /// A branch of an `if` tuple is neither a sub-schema nor a validator.
    #[error("Rule [if] sub-flows must be schemas or validators")]
    InvalidBranches,

    /// A `default` rule has no value to fill in.
    #[error("Rule [default] must be given a value or a function")]
    MissingDefault,

    /// An `include` rule has no target name.
    #[error("Rule [include] must be given a validator name")]
    InvalidInclude,

    /// A `showAs` rule has no label.
    #[error("Rule [showAs] must be given a label")]
    InvalidShowAs,

    /// A rule token could not be interpreted.
    #[error("Invalid rule token at '{path}': {message}")]
    InvalidRuleToken { path: String, message: String },

    /// A registered rule rejected the arguments it was given.
    #[error("Invalid arguments for rule '{rule}': {message}")]
    InvalidRuleArgs { rule: String, message: String },

    /// A schema path is empty or contains an empty segment.
    #[error("Invalid path '{path}'")]
    InvalidPath { path: String },

    /// A root procedure is not known.
    #[error("Root procedure is not defined: {name}")]
    UnknownProcedure { name: String },

    /// A root procedure rejected its arguments.
    #[error("Invalid arguments for root procedure '{procedure}': {message}")]
    InvalidProcedureArgs { procedure: String, message: String },

    /// `validate` was called while include targets are still unbound.
    #[error("Unresolved include: {}", names.join(", "))]
    UnresolvedInclude { names: Vec<String> },

    /// An included validator was dropped before validation.
    #[error("Included validator '{name}' is no longer alive")]
    IncludeDropped { name: String },

    /// Generic configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// A type alias for `Result<T, FlowError>`.
///
/// # Examples
///
/// ```rust
/// use flow_guard::error::Result;
///
/// fn build() -> Result<()> {
///     Ok(())
/// }
/// # build().unwrap();
/// ```
pub type Result<T> = std::result::Result<T, FlowError>;

impl FlowError {
    /// Creates an unknown rule error.
    pub fn unknown_rule(name: impl Into<String>) -> Self {
        Self::UnknownRule { name: name.into() }
    }

    /// Creates an invalid rule token error for the given path.
    pub fn invalid_token(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRuleToken {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid rule arguments error.
    pub fn invalid_args(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRuleArgs {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid procedure arguments error.
    pub fn invalid_procedure(procedure: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidProcedureArgs {
            procedure: procedure.into(),
            message: message.into(),
        }
    }
}
