//! Path resolution.
//!
//! A [`Walker`] runs one validator over one record: it applies the root
//! policy, resolves every declared path (expanding `[]` wildcards), enforces
//! the depth budget and hands each resolved field to the flow executor.
//! Nested validators and conditional branches get a walker of their own whose
//! errors are merged back under the field's path.

use super::compiler::{PathFlow, Segment};
use super::errors::{ErrorMap, ErrorValue};
use super::options::ValidatorOptions;
use super::validator::{Settings, Translator, Validator};
use crate::error::Result;
use serde_json::Value;
use tracing::debug;

/// Error key used when the root record itself is rejected.
pub const INVALID_ROOT_KEY: &str = "??";

/// Outcome of walking part of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    Passed,
    Failed,
}

impl Progress {
    pub(crate) fn failed(self) -> bool {
        self == Progress::Failed
    }
}

/// State shared down a chain of nested runs.
#[derive(Clone)]
pub(crate) struct RunContext {
    /// Depth limit in force, `None` when unbounded
    limit: Option<usize>,
    /// Depth of the field this run is anchored at
    base: usize,
    /// Whether this run belongs to a nested validator
    nested: bool,
    /// Error-collection policy of the top-level run
    collect_all: bool,
    depth_message: String,
    translator: Option<Translator>,
}

impl RunContext {
    fn top_level(settings: &Settings) -> Self {
        Self {
            limit: settings.options.max_depth,
            base: 0,
            nested: false,
            collect_all: settings.options.collect_all,
            depth_message: settings.messages.max_depth_reached.clone(),
            translator: settings.translator.clone(),
        }
    }

    /// Context for a nested validator applied to a field at `field_depth`.
    pub(crate) fn enter_nested(
        &self,
        owner: &ValidatorOptions,
        child: &ValidatorOptions,
        field_depth: usize,
    ) -> Self {
        let (limit, base) = match self.limit {
            Some(limit) if owner.max_depth_propagates => (Some(limit), field_depth),
            _ => (child.max_depth, 0),
        };
        Self {
            limit,
            base,
            nested: true,
            ..self.clone()
        }
    }

    /// Context for a conditional branch running against a container at
    /// `container_depth`.
    pub(crate) fn enter_branch(&self, container_depth: usize) -> Self {
        Self {
            base: container_depth,
            ..self.clone()
        }
    }
}

pub(crate) struct Walker<'v> {
    pub(crate) validator: &'v Validator,
    pub(crate) settings: Settings,
    pub(crate) ctx: RunContext,
    translator: Option<Translator>,
    /// Array index a leading `[]` is restricted to
    focus: Option<usize>,
    errors: ErrorMap,
}

impl<'v> Walker<'v> {
    pub(crate) fn top_level(validator: &'v Validator) -> Self {
        let settings = validator.settings();
        let ctx = RunContext::top_level(&settings);
        Self::new(validator, settings, ctx)
    }

    pub(crate) fn new(validator: &'v Validator, settings: Settings, ctx: RunContext) -> Self {
        let translator = ctx
            .translator
            .clone()
            .or_else(|| settings.translator.clone());
        Self {
            validator,
            settings,
            ctx,
            translator,
            focus: None,
            errors: ErrorMap::new(),
        }
    }

    /// Restricts a leading `[]` in every path to the element at `index`.
    pub(crate) fn focused(mut self, index: Option<usize>) -> Self {
        self.focus = index;
        self
    }

    pub(crate) fn fail_fast(&self) -> bool {
        !self.ctx.collect_all
    }

    /// Runs the validator against a root record: procedures, root policy and
    /// then every path.
    pub(crate) fn run_root(mut self, record: &mut Value) -> Result<ErrorMap> {
        for procedure in self.validator.procedures() {
            debug!(procedure = procedure.name(), "applying root procedure");
            procedure.apply(record);
        }

        match record {
            Value::Object(_) => {
                self.run_record(record)?;
            }
            Value::Array(items) if self.settings.options.array_root_allowed => {
                for (index, item) in items.iter_mut().enumerate() {
                    let mut element =
                        Walker::new(self.validator, self.settings.clone(), self.ctx.clone());
                    let progress = element.run_record(item)?;
                    self.absorb(&index.to_string(), None, element.errors);
                    if progress.failed() && self.fail_fast() {
                        break;
                    }
                }
            }
            _ => {
                debug!(kind = value_kind(record), "root record rejected");
                let message = self.settings.messages.invalid_root.clone();
                self.fail_at(INVALID_ROOT_KEY, &message);
            }
        }
        Ok(self.errors)
    }

    /// Runs every path against `record` without applying the root policy.
    pub(crate) fn run_branch(mut self, record: &mut Value) -> Result<ErrorMap> {
        self.run_record(record)?;
        Ok(self.errors)
    }

    fn run_record(&mut self, record: &mut Value) -> Result<Progress> {
        let validator = self.validator;
        let mut progress = Progress::Passed;
        for flow in validator.flows() {
            let mut trail = Vec::with_capacity(flow.segments.len());
            if self.walk(flow, 0, record, &mut trail)?.failed() {
                progress = Progress::Failed;
                if self.fail_fast() {
                    return Ok(progress);
                }
            }
        }
        if self.settings.options.strict && self.check_missing(record).failed() {
            progress = Progress::Failed;
        }
        Ok(progress)
    }

    fn check_missing(&mut self, record: &Value) -> Progress {
        let validator = self.validator;
        let mut progress = Progress::Passed;
        for top in validator.top_keys() {
            if field(record, &top.key).is_some() {
                continue;
            }
            let message = self.settings.messages.missing_key.clone();
            self.fail_at(top.label.as_deref().unwrap_or(&top.key), &message);
            progress = Progress::Failed;
            if self.fail_fast() {
                break;
            }
        }
        progress
    }

    /// Resolves `flow.segments[idx..]` below `container`.
    fn walk(
        &mut self,
        flow: &'v PathFlow,
        idx: usize,
        container: &mut Value,
        trail: &mut Vec<String>,
    ) -> Result<Progress> {
        if self.depth_exceeded(idx) {
            self.record_depth_limit(trail);
            return Ok(Progress::Failed);
        }
        let last = idx + 1 == flow.segments.len();

        match &flow.segments[idx] {
            Segment::Each => {
                let Some(len) = container.as_array().map(Vec::len) else {
                    return Ok(Progress::Passed);
                };
                let indexes = match self.focus.filter(|_| idx == 0) {
                    Some(index) => index..len.min(index + 1),
                    None => 0..len,
                };
                let mut progress = Progress::Passed;
                for index in indexes {
                    trail.push(index.to_string());
                    let step = if last {
                        self.execute_flow(flow, container, index.to_string().as_str(), trail)?
                    } else {
                        match container.get_mut(index) {
                            Some(child) => self.walk(flow, idx + 1, child, trail)?,
                            None => Progress::Passed,
                        }
                    };
                    trail.pop();
                    if step.failed() {
                        progress = Progress::Failed;
                        if self.fail_fast() {
                            break;
                        }
                    }
                }
                Ok(progress)
            }
            Segment::Key(key) => {
                trail.push(key.clone());
                let progress = if last {
                    self.execute_flow(flow, container, key, trail)?
                } else {
                    match field_mut(container, key) {
                        Some(child) if is_container(child) => {
                            self.walk(flow, idx + 1, child, trail)?
                        }
                        _ => Progress::Passed,
                    }
                };
                trail.pop();
                Ok(progress)
            }
        }
    }

    fn depth_exceeded(&self, idx: usize) -> bool {
        self.ctx
            .limit
            .map_or(false, |limit| self.ctx.base + idx + 1 > limit)
    }

    fn record_depth_limit(&mut self, trail: &[String]) {
        let key = if trail.is_empty() {
            "*".to_string()
        } else {
            format!("{}.*", trail.join("."))
        };
        debug!(path = %key, limit = ?self.ctx.limit, "max depth reached");
        let value = if self.ctx.nested {
            ErrorValue::Failed
        } else {
            ErrorValue::Message(self.translate(&self.ctx.depth_message))
        };
        self.errors.record(key, value);
    }

    /// Depth of the last segment in `trail`.
    pub(crate) fn depth_of(&self, trail: &[String]) -> usize {
        self.ctx.base + trail.len()
    }

    pub(crate) fn translate(&self, message: &str) -> String {
        match &self.translator {
            Some(translate) => translate(message),
            None => message.to_string(),
        }
    }

    /// Records a translated message under `key`.
    pub(crate) fn fail_at(&mut self, key: &str, message: &str) {
        let value = ErrorValue::Message(self.translate(message));
        self.errors.record(key, value);
    }

    /// Merges errors of a nested run, prefixing their keys with `prefix`.
    ///
    /// With a `(field_path, label)` relabelling, keys at or below the field
    /// path are reported under the label instead.
    pub(crate) fn absorb(
        &mut self,
        prefix: &str,
        relabel: Option<(&str, &str)>,
        errors: ErrorMap,
    ) {
        for (key, value) in errors {
            let full = join_path(prefix, &key);
            let full = match relabel {
                Some((field_path, label)) => apply_label(full, field_path, label),
                None => full,
            };
            self.errors.record(full, value);
        }
    }
}

pub(crate) fn join_path(prefix: &str, key: &str) -> String {
    match (prefix.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{prefix}.{key}"),
    }
}

fn apply_label(key: String, field_path: &str, label: &str) -> String {
    if key == field_path {
        return label.to_string();
    }
    match key
        .strip_prefix(field_path)
        .and_then(|rest| rest.strip_prefix('.'))
    {
        Some(rest) => format!("{label}.{rest}"),
        None => key,
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Looks up `key` in an object, or a numeric index in an array.
pub(crate) fn field<'a>(container: &'a Value, key: &str) -> Option<&'a Value> {
    match container {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

pub(crate) fn field_mut<'a>(container: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    match container {
        Value::Object(map) => map.get_mut(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

/// Writes `value` at `key`. Array slots past the end are not created.
pub(crate) fn set_field(container: &mut Value, key: &str, value: Value) -> bool {
    match container {
        Value::Object(map) => {
            map.insert(key.to_string(), value);
            true
        }
        Value::Array(items) => match key.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        },
        _ => false,
    }
}
