//! The validator handle.

use super::compiler::{self, CompiledSchema, PathFlow, TopKey};
use super::errors::{ErrorMap, FieldError};
use super::options::{Messages, ValidatorOptions};
use super::procedures::{self, RootProcedure};
use super::walker::Walker;
use crate::error::{FlowError, Result};
use crate::logging::LogConfig;
use crate::rules::RuleRegistry;
use crate::schema::{Procedure, Schema};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, Weak};
use tracing::{debug, instrument};

/// Message translation hook, applied when a message is stored.
pub type Translator = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Mutable configuration of a validator.
#[derive(Clone, Default)]
pub(crate) struct Settings {
    pub(crate) name: Option<String>,
    pub(crate) options: ValidatorOptions,
    pub(crate) messages: Messages,
    pub(crate) translator: Option<Translator>,
    pub(crate) log: LogConfig,
}

#[derive(Default)]
struct ErrorState {
    errors: ErrorMap,
    cursor: usize,
}

pub(crate) struct Core {
    schema: CompiledSchema,
    procedures: Vec<Box<dyn RootProcedure>>,
    registry: Arc<RuleRegistry>,
    settings: RwLock<Settings>,
    pending: Mutex<BTreeSet<String>>,
    state: Mutex<ErrorState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// A compiled schema together with its options and last run's errors.
///
/// `Validator` is a cheap, shared handle: clones refer to the same validator,
/// so setters applied through one clone are visible through all of them.
///
/// # Examples
///
/// ```rust
/// use flow_guard::prelude::*;
/// use serde_json::json;
///
/// # fn main() -> flow_guard::error::Result<()> {
/// let validator = Validator::new(
///     Schema::new()
///         .path("name", ["isExists:name is required", "isString"])
///         .path("tags.[]", ["isString:tags must be text"]),
/// )?
/// .try_all(true);
///
/// let mut record = json!({"tags": ["a", 1]});
/// assert!(!validator.validate(&mut record)?);
/// assert_eq!(
///     validator.get_errors().to_json(),
///     json!({"name": "name is required", "tags.1": "tags must be text"})
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Validator {
    core: Arc<Core>,
}

impl Validator {
    /// Compiles `schema` against the built-in rules.
    pub fn new(schema: Schema) -> Result<Self> {
        Self::with_registry(schema, Vec::new(), RuleRegistry::builtin())
    }

    /// Compiles `schema` with root procedures run before every validation.
    pub fn with_procedures(
        schema: Schema,
        procedures: impl IntoIterator<Item = Procedure>,
    ) -> Result<Self> {
        Self::with_registry(schema, procedures, RuleRegistry::builtin())
    }

    /// Compiles `schema` against a custom rule registry.
    ///
    /// Sub-schemas declared inline are compiled against the same registry.
    pub fn with_registry(
        schema: Schema,
        procedures: impl IntoIterator<Item = Procedure>,
        registry: Arc<RuleRegistry>,
    ) -> Result<Self> {
        let (schema, pending) = compiler::compile(schema, &registry)?;
        let procedures = procedures
            .into_iter()
            .map(procedures::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            core: Arc::new(Core {
                schema,
                procedures,
                registry,
                settings: RwLock::new(Settings::default()),
                pending: Mutex::new(pending),
                state: Mutex::new(ErrorState::default()),
            }),
        })
    }

    pub(crate) fn from_core(core: Arc<Core>) -> Self {
        Self { core }
    }

    pub(crate) fn downgrade(&self) -> Weak<Core> {
        Arc::downgrade(&self.core)
    }

    fn update(self, apply: impl FnOnce(&mut Settings)) -> Self {
        {
            let mut settings = self
                .core
                .settings
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            apply(&mut *settings);
        }
        self
    }

    /// Reports declared top-level keys missing from the record.
    pub fn strict(self, enabled: bool) -> Self {
        self.update(|s| s.options.strict = enabled)
    }

    /// Collects every error instead of stopping at the first one.
    pub fn try_all(self, enabled: bool) -> Self {
        self.update(|s| s.options.collect_all = enabled)
    }

    /// Accepts arrays as root records.
    pub fn array_allow(self, enabled: bool) -> Self {
        self.update(|s| s.options.array_root_allowed = enabled)
    }

    /// Limits the path depth walked by this validator.
    pub fn max_depth(self, limit: usize) -> Self {
        self.update(|s| s.options.max_depth = Some(limit))
    }

    /// Whether nested validators inherit the running depth budget.
    pub fn max_depth_pass_to_nested(self, enabled: bool) -> Self {
        self.update(|s| s.options.max_depth_propagates = enabled)
    }

    /// Message recorded under `??` when the root record is rejected.
    pub fn set_message_invalid(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.update(|s| s.messages.invalid_root = message)
    }

    /// Message recorded for a declared top-level key missing in strict mode.
    pub fn set_message_missing_key(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.update(|s| s.messages.missing_key = message)
    }

    /// Message recorded when the depth limit is hit.
    pub fn set_message_max_depth_reached(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.update(|s| s.messages.max_depth_reached = message)
    }

    /// Installs a translator applied to every stored message.
    pub fn set_translator<F>(self, translator: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let translator: Translator = Arc::new(translator);
        self.update(|s| s.translator = Some(translator))
    }

    /// Names the validator so that other schemas can include it.
    pub fn set_name(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.update(|s| s.name = Some(name))
    }

    /// Replaces every option at once.
    pub fn with_options(self, options: ValidatorOptions) -> Self {
        self.update(|s| s.options = options)
    }

    /// Replaces every message at once.
    pub fn with_messages(self, messages: Messages) -> Self {
        self.update(|s| s.messages = messages)
    }

    /// Controls which per-rule events are logged.
    pub fn with_log_config(self, log: LogConfig) -> Self {
        self.update(|s| s.log = log)
    }

    /// Binds every pending include of `other`'s name to `other`.
    ///
    /// Slots in nested sub-validators and conditional branches are bound too.
    /// The binding is weak: `other` must be kept alive by the caller.
    pub fn include(self, other: &Validator) -> Result<Self> {
        let name = other.name().ok_or_else(|| {
            FlowError::Configuration("cannot include a validator without a name".to_string())
        })?;
        let bound_slots = self.bind_include(&name, other);
        debug!(include = %name, bound_slots, "include bound");
        Ok(self)
    }

    fn bind_include(&self, name: &str, target: &Validator) -> usize {
        let mut bound_slots = self.core.schema.bind(name, target);
        if bound_slots > 0 {
            lock(&self.core.pending).remove(name);
        }
        for child in self.core.schema.children() {
            bound_slots += child.bind_include(name, target);
        }
        bound_slots
    }

    /// Names of includes that are not bound yet, nested ones included.
    pub fn pending_includes(&self) -> Vec<String> {
        let mut pending = lock(&self.core.pending).clone();
        for child in self.core.schema.children() {
            pending.extend(child.pending_includes());
        }
        pending.into_iter().collect()
    }

    /// Returns the validator the first include declared at `path` refers to.
    pub fn included_at(&self, path: &str) -> Option<Validator> {
        let flow = self.core.schema.flow(path)?;
        flow.steps.iter().find_map(|step| match step {
            compiler::FlowStep::Include(target) => target.resolve(self).ok(),
            _ => None,
        })
    }

    /// Returns true if both handles refer to the same validator.
    pub fn ptr_eq(&self, other: &Validator) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    pub fn name(&self) -> Option<String> {
        read(&self.core.settings).name.clone()
    }

    pub fn options(&self) -> ValidatorOptions {
        read(&self.core.settings).options.clone()
    }

    pub fn messages(&self) -> Messages {
        read(&self.core.settings).messages.clone()
    }

    /// Declared paths, in declaration order.
    pub fn paths(&self) -> Vec<&str> {
        self.core
            .schema
            .flows
            .iter()
            .map(|flow| flow.path.as_str())
            .collect()
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.core.registry
    }

    pub(crate) fn settings(&self) -> Settings {
        read(&self.core.settings).clone()
    }

    pub(crate) fn flows(&self) -> &[PathFlow] {
        &self.core.schema.flows
    }

    pub(crate) fn top_keys(&self) -> &[TopKey] {
        &self.core.schema.top_keys
    }

    pub(crate) fn procedures(&self) -> &[Box<dyn RootProcedure>] {
        &self.core.procedures
    }

    /// Validates `record` in place.
    ///
    /// Returns `Ok(false)` when the record has errors; they are available
    /// from [`get_errors`](Self::get_errors) until the next call. `Err` is
    /// reserved for configuration problems such as unresolved includes.
    #[instrument(skip_all, fields(validator = ?self.name()))]
    pub fn validate(&self, record: &mut Value) -> Result<bool> {
        *lock(&self.core.state) = ErrorState::default();

        let pending = self.pending_includes();
        if !pending.is_empty() {
            return Err(FlowError::UnresolvedInclude { names: pending });
        }

        debug!(paths = self.core.schema.flows.len(), "validation started");
        let errors = Walker::top_level(self).run_root(record)?;
        let valid = errors.is_empty();
        debug!(valid, errors = errors.len(), "validation finished");

        *lock(&self.core.state) = ErrorState { errors, cursor: 0 };
        Ok(valid)
    }

    /// Returns the errors of the last run, in recorded order.
    pub fn get_errors(&self) -> ErrorMap {
        lock(&self.core.state).errors.clone()
    }

    /// Returns the next unread error of the last run.
    pub fn get_next_error(&self) -> Option<FieldError> {
        let mut state = lock(&self.core.state);
        let entry = state.errors.entry(state.cursor)?;
        state.cursor += 1;
        Some(entry)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("name", &self.name())
            .field("paths", &self.paths())
            .field("pending", &self.pending_includes())
            .finish()
    }
}
