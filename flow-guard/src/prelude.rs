//! Prelude for commonly used types and traits in flow-guard.

pub use crate::core::{ErrorMap, ErrorValue, FieldError, Messages, Validator, ValidatorOptions};
pub use crate::error::{FlowError, Result};
pub use crate::logging::LogConfig;
pub use crate::rules::{RuleCheck, RuleRegistry};
pub use crate::schema::{Arg, Outcome, Procedure, Rule, Schema};
