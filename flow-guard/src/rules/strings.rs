//! String rules: length bounds, pattern matching and sanitizers.

use super::RuleCheck;
use crate::error::{FlowError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Patterns longer than this are rejected when the schema is compiled.
const MAX_PATTERN_LENGTH: usize = 1000;

/// Lazy static pattern cache for compiled regex patterns
static PATTERN_CACHE: Lazy<RwLock<HashMap<String, Regex>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Which side of a length is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthBound {
    Min,
    Max,
}

/// Bounds the length of a string (in characters) or of an array.
#[derive(Debug, Clone)]
pub struct Length {
    bound: LengthBound,
}

impl Length {
    pub fn new(bound: LengthBound) -> Self {
        Self { bound }
    }
}

fn length_arg(args: &[Value]) -> Option<usize> {
    args.first()?.as_u64().and_then(|n| usize::try_from(n).ok())
}

impl RuleCheck for Length {
    fn name(&self) -> &str {
        match self.bound {
            LengthBound::Min => "minLength",
            LengthBound::Max => "maxLength",
        }
    }

    fn check(&self, value: Option<&mut Value>, args: &[Value]) -> bool {
        let (Some(value), Some(limit)) = (value, length_arg(args)) else {
            return false;
        };
        let len = match value {
            Value::String(s) => s.chars().count(),
            Value::Array(items) => items.len(),
            _ => return false,
        };
        match self.bound {
            LengthBound::Min => len >= limit,
            LengthBound::Max => len <= limit,
        }
    }

    fn default_message(&self) -> &str {
        match self.bound {
            LengthBound::Min => "is too short",
            LengthBound::Max => "is too long",
        }
    }

    fn validate_args(&self, args: &[Value]) -> Result<()> {
        match (args.len(), length_arg(args)) {
            (1, Some(_)) => Ok(()),
            _ => Err(FlowError::invalid_args(
                self.name(),
                "expected a single non-negative integer",
            )),
        }
    }
}

/// Matches a string against a regular expression (`matches`).
///
/// Compiled patterns are cached process-wide.
#[derive(Debug, Clone, Copy)]
pub struct Matches;

impl Matches {
    fn compiled(pattern: &str) -> Option<Regex> {
        {
            let cache = PATTERN_CACHE.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(regex) = cache.get(pattern) {
                return Some(regex.clone());
            }
        }
        let regex = Regex::new(pattern).ok()?;
        PATTERN_CACHE
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pattern.to_string(), regex.clone());
        Some(regex)
    }
}

impl RuleCheck for Matches {
    fn name(&self) -> &str {
        "matches"
    }

    fn check(&self, value: Option<&mut Value>, args: &[Value]) -> bool {
        let (Some(Value::String(text)), Some(Value::String(pattern))) = (value, args.first())
        else {
            return false;
        };
        Self::compiled(pattern).map_or(false, |regex| regex.is_match(text))
    }

    fn default_message(&self) -> &str {
        "does not match the expected format"
    }

    fn validate_args(&self, args: &[Value]) -> Result<()> {
        let [Value::String(pattern)] = args else {
            return Err(FlowError::invalid_args(self.name(), "expected a pattern string"));
        };
        validate_pattern(pattern).map_err(|message| FlowError::invalid_args(self.name(), message))
    }
}

/// Checks that a user-supplied pattern is usable.
pub(crate) fn validate_pattern(pattern: &str) -> std::result::Result<(), String> {
    if pattern.len() > MAX_PATTERN_LENGTH {
        return Err(format!(
            "pattern too long (max {MAX_PATTERN_LENGTH} characters)"
        ));
    }
    if pattern.contains('\0') {
        return Err("pattern cannot contain null bytes".to_string());
    }
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| format!("invalid pattern: {e}"))
}

/// The rewrite a [`Sanitizer`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sanitize {
    /// Strip leading and trailing whitespace (`trim`)
    Trim,
    /// Lowercase the string (`toLowerCase`)
    LowerCase,
}

/// Rewrites string values in place. Non-string values fail.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    op: Sanitize,
}

impl Sanitizer {
    pub fn new(op: Sanitize) -> Self {
        Self { op }
    }
}

impl RuleCheck for Sanitizer {
    fn name(&self) -> &str {
        match self.op {
            Sanitize::Trim => "trim",
            Sanitize::LowerCase => "toLowerCase",
        }
    }

    fn check(&self, value: Option<&mut Value>, _args: &[Value]) -> bool {
        let Some(Value::String(text)) = value else {
            return false;
        };
        *text = match self.op {
            Sanitize::Trim => text.trim().to_string(),
            Sanitize::LowerCase => text.to_lowercase(),
        };
        true
    }

    fn default_message(&self) -> &str {
        "must be a string"
    }
}
