//! Flow execution for a single resolved field.

use super::compiler::{FlowStep, PathFlow};
use super::errors::ErrorMap;
use super::validator::Validator;
use super::walker::{field, field_mut, set_field, Progress, Walker};
use crate::error::Result;
use crate::logging::truncate_field;
use crate::schema::Outcome;
use crate::{log_rule, log_sanitize};
use serde_json::Value;

impl<'v> Walker<'v> {
    /// Runs the steps of `flow` against `container[key]`.
    ///
    /// `trail` holds the concrete path of the field, wildcards expanded.
    pub(crate) fn execute_flow(
        &mut self,
        flow: &'v PathFlow,
        container: &mut Value,
        key: &str,
        trail: &[String],
    ) -> Result<Progress> {
        let field_path = trail.join(".");

        for step in &flow.steps {
            match step {
                FlowStep::Named {
                    rule,
                    args,
                    message,
                } => {
                    if field(container, key).is_none() && !rule.checks_missing() {
                        continue;
                    }
                    let passed = rule.check(field_mut(container, key), args);
                    log_rule!(
                        self.settings.log,
                        path = %field_path,
                        rule = rule.name(),
                        passed,
                        "rule evaluated"
                    );
                    if !passed {
                        let message = message.as_deref().unwrap_or_else(|| rule.default_message());
                        return Ok(self.fail_flow(flow, &field_path, message));
                    }
                }
                FlowStep::Custom(custom) => {
                    let Some(snapshot) = field(container, key).cloned() else {
                        continue;
                    };
                    match custom(&snapshot, key, container) {
                        Outcome::Pass => {}
                        Outcome::Fail(message) => {
                            return Ok(self.fail_flow(flow, &field_path, &message))
                        }
                        Outcome::Reject => {
                            let validator = self.validator;
                            let message = validator.registry().generic_message();
                            return Ok(self.fail_flow(flow, &field_path, message));
                        }
                    }
                }
                FlowStep::Default(default) => {
                    if field(container, key).is_some() {
                        continue;
                    }
                    let value = default.resolve(key);
                    log_sanitize!(
                        self.settings.log,
                        path = %field_path,
                        value = %truncate_field(&value.to_string(), self.settings.log.max_field_length),
                        "default applied"
                    );
                    set_field(container, key, value);
                }
                FlowStep::Nested(child) => {
                    let errors = self.run_nested(child, container, key, trail)?;
                    if !errors.is_empty() {
                        return Ok(self.settle(flow, &field_path, &field_path, errors));
                    }
                }
                FlowStep::Include(target) => {
                    if field(container, key).is_none() {
                        continue;
                    }
                    let included = target.resolve(self.validator)?;
                    let errors = self.run_nested(&included, container, key, trail)?;
                    if !errors.is_empty() {
                        return Ok(self.settle(flow, &field_path, &field_path, errors));
                    }
                }
                FlowStep::Conditional {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    let Some(value) = field(container, key) else {
                        continue;
                    };
                    let branch = if condition.test(value) {
                        then_branch
                    } else {
                        else_branch
                    };
                    let container_trail = &trail[..trail.len().saturating_sub(1)];
                    let ctx = self.ctx.enter_branch(self.depth_of(container_trail));
                    let focus = container.as_array().and_then(|_| key.parse::<usize>().ok());
                    let errors = Walker::new(branch, branch.settings(), ctx)
                        .focused(focus)
                        .run_branch(container)?;
                    if !errors.is_empty() {
                        let prefix = container_trail.join(".");
                        return Ok(self.settle(flow, &field_path, &prefix, errors));
                    }
                }
                FlowStep::ShowAs(_) => {}
            }
        }
        Ok(Progress::Passed)
    }

    /// Applies `child` to the value at `container[key]`.
    fn run_nested(
        &self,
        child: &Validator,
        container: &mut Value,
        key: &str,
        trail: &[String],
    ) -> Result<ErrorMap> {
        let Some(value) = field_mut(container, key) else {
            return Ok(ErrorMap::new());
        };
        let child_settings = child.settings();
        let ctx = self.ctx.enter_nested(
            &self.settings.options,
            &child_settings.options,
            self.depth_of(trail),
        );
        Walker::new(child, child_settings, ctx).run_root(value)
    }

    fn fail_flow(&mut self, flow: &PathFlow, field_path: &str, message: &str) -> Progress {
        let key = flow.label.as_deref().unwrap_or(field_path);
        self.fail_at(key, message);
        Progress::Failed
    }

    /// Merges child errors found while running `flow` and fails it.
    fn settle(
        &mut self,
        flow: &PathFlow,
        field_path: &str,
        prefix: &str,
        errors: ErrorMap,
    ) -> Progress {
        let relabel = flow.label.as_deref().map(|label| (field_path, label));
        self.absorb(prefix, relabel, errors);
        Progress::Failed
    }
}
