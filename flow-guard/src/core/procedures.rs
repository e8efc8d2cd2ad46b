//! Root procedures: whole-record transforms applied before any path is walked.

use crate::error::{FlowError, Result};
use crate::rules::validate_pattern;
use crate::schema::Procedure;
use regex::Regex;
use serde_json::Value;
use std::fmt::Debug;

/// A transform of the root record.
pub(crate) trait RootProcedure: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, record: &mut Value);
}

/// Removes top-level keys that do not match a pattern (`filterKeys`).
#[derive(Debug, Clone)]
pub(crate) struct FilterKeys {
    pattern: Regex,
}

impl FilterKeys {
    fn filter(&self, record: &mut Value) {
        if let Value::Object(map) = record {
            map.retain(|key, _| self.pattern.is_match(key));
        }
    }
}

impl RootProcedure for FilterKeys {
    fn name(&self) -> &str {
        "filterKeys"
    }

    fn apply(&self, record: &mut Value) {
        match record {
            Value::Array(items) => items.iter_mut().for_each(|item| self.filter(item)),
            other => self.filter(other),
        }
    }
}

/// Compiles a raw procedure call.
pub(crate) fn compile(procedure: Procedure) -> Result<Box<dyn RootProcedure>> {
    match procedure.name.as_str() {
        "filterKeys" => {
            let [Value::String(pattern)] = procedure.args.as_slice() else {
                return Err(FlowError::invalid_procedure(
                    "filterKeys",
                    "expected a single pattern string",
                ));
            };
            validate_pattern(pattern)
                .map_err(|message| FlowError::invalid_procedure("filterKeys", message))?;
            let pattern = Regex::new(pattern)
                .map_err(|e| FlowError::invalid_procedure("filterKeys", e.to_string()))?;
            Ok(Box::new(FilterKeys { pattern }))
        }
        other => Err(FlowError::UnknownProcedure {
            name: other.to_string(),
        }),
    }
}
