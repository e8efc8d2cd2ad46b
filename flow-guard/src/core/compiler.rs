//! Schema compilation.
//!
//! Turns raw [`Rule`] tokens into [`FlowStep`]s once, at construction time.
//! Every shape check happens here; the walker never inspects token shapes.

use super::validator::{Core, Validator};
use crate::error::{FlowError, Result};
use crate::rules::{RuleCheck, RuleRegistry};
use crate::schema::{Arg, ConditionFn, CustomFn, DefaultFn, Rule, Schema};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Target name that binds an include to the validator being compiled.
pub(crate) const SELF_INCLUDE: &str = "self";

/// One segment of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Key(String),
    /// `[]`: every element of the array at this position
    Each,
}

/// A compiled rule.
pub(crate) enum FlowStep {
    Named {
        rule: Arc<dyn RuleCheck>,
        args: Vec<Value>,
        message: Option<String>,
    },
    Custom(CustomFn),
    Nested(Validator),
    Conditional {
        condition: Condition,
        then_branch: Validator,
        else_branch: Validator,
    },
    Include(IncludeTarget),
    Default(DefaultValue),
    ShowAs(String),
}

pub(crate) enum Condition {
    Named(Arc<dyn RuleCheck>),
    Inline(ConditionFn),
}

impl Condition {
    pub(crate) fn test(&self, value: &Value) -> bool {
        match self {
            // Named predicates may sanitize; they only ever see a copy here.
            Condition::Named(rule) => rule.check(Some(&mut value.clone()), &[]),
            Condition::Inline(f) => f(value),
        }
    }
}

pub(crate) enum DefaultValue {
    Literal(Value),
    Computed(DefaultFn),
}

impl DefaultValue {
    pub(crate) fn resolve(&self, key: &str) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Computed(f) => f(key),
        }
    }
}

pub(crate) enum IncludeTarget {
    /// The validator owning the schema
    Itself,
    Named {
        name: String,
        bound: RwLock<Option<Weak<Core>>>,
    },
}

impl IncludeTarget {
    /// Resolves the target, `owner` being the validator running the flow.
    pub(crate) fn resolve(&self, owner: &Validator) -> Result<Validator> {
        match self {
            IncludeTarget::Itself => Ok(owner.clone()),
            IncludeTarget::Named { name, bound } => {
                let slot = bound.read().unwrap_or_else(PoisonError::into_inner);
                match slot.as_ref() {
                    None => Err(FlowError::UnresolvedInclude {
                        names: vec![name.clone()],
                    }),
                    Some(weak) => weak
                        .upgrade()
                        .map(Validator::from_core)
                        .ok_or_else(|| FlowError::IncludeDropped { name: name.clone() }),
                }
            }
        }
    }
}

/// The rule flow attached to one path.
pub(crate) struct PathFlow {
    pub(crate) path: String,
    pub(crate) segments: Vec<Segment>,
    pub(crate) steps: Vec<FlowStep>,
    /// Error key override from `showAs`
    pub(crate) label: Option<String>,
}

/// A top-level key checked in strict mode.
pub(crate) struct TopKey {
    pub(crate) key: String,
    pub(crate) label: Option<String>,
}

pub(crate) struct CompiledSchema {
    pub(crate) flows: Vec<PathFlow>,
    pub(crate) top_keys: Vec<TopKey>,
}

impl CompiledSchema {
    /// Validators owned by this schema: nested sub-validators and branches.
    pub(crate) fn children(&self) -> impl Iterator<Item = &Validator> {
        self.flows
            .iter()
            .flat_map(|flow| flow.steps.iter())
            .flat_map(|step| match step {
                FlowStep::Nested(child) => vec![child],
                FlowStep::Conditional {
                    then_branch,
                    else_branch,
                    ..
                } => vec![then_branch, else_branch],
                _ => Vec::new(),
            })
    }

    /// Binds every include slot named `name` to `target`.
    ///
    /// Returns the number of slots bound in this schema, children excluded.
    pub(crate) fn bind(&self, name: &str, target: &Validator) -> usize {
        let mut bound_slots = 0;
        for step in self.flows.iter().flat_map(|flow| flow.steps.iter()) {
            if let FlowStep::Include(IncludeTarget::Named { name: slot_name, bound }) = step {
                if slot_name == name {
                    *bound.write().unwrap_or_else(PoisonError::into_inner) =
                        Some(target.downgrade());
                    bound_slots += 1;
                }
            }
        }
        bound_slots
    }

    pub(crate) fn flow(&self, path: &str) -> Option<&PathFlow> {
        self.flows.iter().find(|flow| flow.path == path)
    }
}

/// Compiles `schema`, returning it with the include names left pending.
pub(crate) fn compile(
    schema: Schema,
    registry: &Arc<RuleRegistry>,
) -> Result<(CompiledSchema, BTreeSet<String>)> {
    let mut compiler = Compiler {
        registry,
        pending: BTreeSet::new(),
    };
    let flows = schema
        .into_entries()
        .into_iter()
        .map(|(path, rules)| compiler.compile_flow(path, rules))
        .collect::<Result<Vec<_>>>()?;
    let top_keys = top_keys(&flows);
    Ok((CompiledSchema { flows, top_keys }, compiler.pending))
}

fn top_keys(flows: &[PathFlow]) -> Vec<TopKey> {
    let mut keys: Vec<TopKey> = Vec::new();
    for flow in flows {
        let Some(Segment::Key(key)) = flow.segments.first() else {
            continue;
        };
        let label = if flow.segments.len() == 1 {
            flow.label.clone()
        } else {
            None
        };
        match keys.iter_mut().find(|top| top.key == *key) {
            Some(top) => top.label = top.label.take().or(label),
            None => keys.push(TopKey {
                key: key.clone(),
                label,
            }),
        }
    }
    keys
}

pub(crate) fn parse_path(path: &str) -> Result<Vec<Segment>> {
    path.split('.')
        .map(|segment| match segment {
            "" => Err(FlowError::InvalidPath {
                path: path.to_string(),
            }),
            "[]" => Ok(Segment::Each),
            key => Ok(Segment::Key(key.to_string())),
        })
        .collect()
}

/// Splits `"name:message"` into its parts.
fn split_token(token: &str) -> (&str, Option<String>) {
    match token.split_once(':') {
        Some((name, message)) if !message.is_empty() => (name, Some(message.to_string())),
        Some((name, _)) => (name, None),
        None => (token, None),
    }
}

struct Compiler<'r> {
    registry: &'r Arc<RuleRegistry>,
    pending: BTreeSet<String>,
}

impl Compiler<'_> {
    fn compile_flow(&mut self, path: String, rules: Vec<Rule>) -> Result<PathFlow> {
        let segments = parse_path(&path)?;
        let steps = rules
            .into_iter()
            .map(|rule| self.compile_rule(&path, rule))
            .collect::<Result<Vec<_>>>()?;
        let label = steps.iter().rev().find_map(|step| match step {
            FlowStep::ShowAs(label) => Some(label.clone()),
            _ => None,
        });
        Ok(PathFlow {
            path,
            segments,
            steps,
            label,
        })
    }

    fn compile_rule(&mut self, path: &str, rule: Rule) -> Result<FlowStep> {
        match rule {
            Rule::Name(token) => self.compile_token(&token),
            Rule::Tuple(args) => self.compile_tuple(path, args),
            Rule::Custom(f) => Ok(FlowStep::Custom(f)),
            Rule::Schema(schema) => Ok(FlowStep::Nested(self.sub_validator(schema)?)),
            Rule::Validator(validator) => Ok(FlowStep::Nested(validator)),
        }
    }

    fn compile_token(&mut self, token: &str) -> Result<FlowStep> {
        let (name, message) = split_token(token);
        match name {
            "showAs" => message.map(FlowStep::ShowAs).ok_or(FlowError::InvalidShowAs),
            "custom" => Err(FlowError::InvalidCustomRule),
            "if" => Err(FlowError::MalformedConditional),
            "default" => Err(FlowError::MissingDefault),
            "include" => Err(FlowError::InvalidInclude),
            _ => self.named(name, Vec::new(), message),
        }
    }

    fn compile_tuple(&mut self, path: &str, args: Vec<Arg>) -> Result<FlowStep> {
        let mut args = args.into_iter();
        let head = match args.next() {
            Some(Arg::Value(Value::String(head))) => head,
            Some(other) => {
                return Err(FlowError::invalid_token(
                    path,
                    format!("tuple must start with a rule name, found {}", other.kind()),
                ))
            }
            None => return Err(FlowError::invalid_token(path, "empty tuple")),
        };
        let (name, message) = split_token(&head);
        let rest: Vec<Arg> = args.collect();

        match name {
            "custom" => match rest.into_iter().next() {
                Some(Arg::Custom(f)) => Ok(FlowStep::Custom(f)),
                _ => Err(FlowError::InvalidCustomRule),
            },
            "default" => match rest.into_iter().next() {
                Some(Arg::Value(value)) => Ok(FlowStep::Default(DefaultValue::Literal(value))),
                Some(Arg::Default(f)) => Ok(FlowStep::Default(DefaultValue::Computed(f))),
                _ => Err(FlowError::MissingDefault),
            },
            "include" => match rest.into_iter().next() {
                Some(Arg::Value(Value::String(target))) => Ok(FlowStep::Include(self.include(target))),
                _ => Err(FlowError::InvalidInclude),
            },
            "showAs" => match rest.into_iter().next() {
                Some(Arg::Value(Value::String(label))) if !label.is_empty() => {
                    Ok(FlowStep::ShowAs(label))
                }
                _ => Err(FlowError::InvalidShowAs),
            },
            "if" => self.compile_conditional(rest),
            _ => {
                let values = rest
                    .into_iter()
                    .map(|arg| match arg {
                        Arg::Value(value) => Ok(value),
                        other => Err(FlowError::invalid_args(
                            name,
                            format!("expected plain values, found {}", other.kind()),
                        )),
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.named(name, values, message)
            }
        }
    }

    fn compile_conditional(&mut self, args: Vec<Arg>) -> Result<FlowStep> {
        let [condition, then_arg, else_arg]: [Arg; 3] =
            args.try_into().map_err(|_| FlowError::MalformedConditional)?;

        let (name, inline) = match condition {
            Arg::Value(Value::String(name)) => (Some(name), None),
            Arg::Condition(f) => (None, Some(f)),
            _ => return Err(FlowError::InvalidCondition),
        };
        if !is_branch(&then_arg) || !is_branch(&else_arg) {
            return Err(FlowError::InvalidBranches);
        }
        let condition = match (name, inline) {
            (Some(name), _) => {
                let rule = self
                    .registry
                    .get(&name)
                    .ok_or(FlowError::UnknownCondition { name })?;
                // Conditions are evaluated without arguments.
                rule.validate_args(&[])?;
                Condition::Named(rule)
            }
            (None, Some(f)) => Condition::Inline(f),
            (None, None) => return Err(FlowError::InvalidCondition),
        };

        Ok(FlowStep::Conditional {
            condition,
            then_branch: self.branch(then_arg)?,
            else_branch: self.branch(else_arg)?,
        })
    }

    fn branch(&mut self, arg: Arg) -> Result<Validator> {
        match arg {
            Arg::Schema(schema) => self.sub_validator(schema),
            Arg::Validator(validator) => Ok(validator),
            _ => Err(FlowError::InvalidBranches),
        }
    }

    fn named(&mut self, name: &str, args: Vec<Value>, message: Option<String>) -> Result<FlowStep> {
        let rule = self.registry.resolve(name)?;
        rule.validate_args(&args)?;
        Ok(FlowStep::Named {
            rule,
            args,
            message,
        })
    }

    fn include(&mut self, target: String) -> IncludeTarget {
        if target == SELF_INCLUDE {
            return IncludeTarget::Itself;
        }
        self.pending.insert(target.clone());
        IncludeTarget::Named {
            name: target,
            bound: RwLock::new(None),
        }
    }

    fn sub_validator(&mut self, schema: Schema) -> Result<Validator> {
        Validator::with_registry(schema, Vec::new(), Arc::clone(self.registry))
    }
}

fn is_branch(arg: &Arg) -> bool {
    matches!(arg, Arg::Schema(_) | Arg::Validator(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile_rules(rules: Vec<Rule>) -> Result<(CompiledSchema, BTreeSet<String>)> {
        compile(Schema::new().path("a", rules), &RuleRegistry::builtin())
    }

    fn compile_error(rules: Vec<Rule>) -> FlowError {
        match compile_rules(rules) {
            Ok(_) => panic!("expected a compile error"),
            Err(err) => err,
        }
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(
            parse_path("a.[].b").unwrap(),
            vec![
                Segment::Key("a".to_string()),
                Segment::Each,
                Segment::Key("b".to_string())
            ]
        );
        assert!(parse_path("").is_err());
        assert!(parse_path("a..b").is_err());
    }

    #[test]
    fn test_split_token() {
        assert_eq!(split_token("isString"), ("isString", None));
        assert_eq!(
            split_token("isString:not: a string"),
            ("isString", Some("not: a string".to_string()))
        );
        assert_eq!(split_token("isString:"), ("isString", None));
    }

    #[test]
    fn test_token_shapes() {
        let (schema, pending) = compile_rules(vec![
            Rule::from("isString:not string"),
            Rule::tuple(["minLength".into(), Arg::from(json!(2))]),
            Rule::from("showAs:label"),
            Rule::default_value(1),
            Rule::custom(|_, _, _| true.into()),
            Rule::from(Schema::new().path("b", ["isNumber"])),
        ])
        .unwrap();
        assert!(pending.is_empty());

        let flow = &schema.flows[0];
        assert_eq!(flow.label.as_deref(), Some("label"));
        assert!(matches!(
            &flow.steps[0],
            FlowStep::Named { message: Some(m), args, .. } if m == "not string" && args.is_empty()
        ));
        assert!(matches!(&flow.steps[1], FlowStep::Named { args, .. } if args == &vec![json!(2)]));
        assert!(matches!(flow.steps[3], FlowStep::Default(DefaultValue::Literal(_))));
        assert!(matches!(flow.steps[4], FlowStep::Custom(_)));
        assert!(matches!(flow.steps[5], FlowStep::Nested(_)));
        assert_eq!(schema.children().count(), 1);
    }

    #[test]
    fn test_unknown_rule() {
        assert_eq!(
            compile_error(vec![Rule::from("dummy")]),
            FlowError::unknown_rule("dummy")
        );
    }

    #[test]
    fn test_rule_args_are_validated() {
        let err = compile_error(vec![Rule::tuple(["minLength".into(), "x".into()])]);
        assert!(matches!(err, FlowError::InvalidRuleArgs { .. }));
    }

    #[test]
    fn test_condition_needing_args_is_rejected() {
        let err = compile_error(vec![Rule::when(
            "minLength".into(),
            Schema::new().path("a", ["isString:then branch"]),
            Schema::new().path("a", ["isNumber:else branch"]),
        )]);
        assert_eq!(
            err,
            FlowError::invalid_args("minLength", "expected a single non-negative integer")
        );

        let err = compile_error(vec![Rule::when("matches".into(), Schema::new(), Schema::new())]);
        assert!(matches!(err, FlowError::InvalidRuleArgs { rule, .. } if rule == "matches"));

        let plain = Rule::when("isString".into(), Schema::new(), Schema::new());
        assert!(compile_rules(vec![plain]).is_ok());
    }

    #[test]
    fn test_custom_requires_function() {
        assert_eq!(
            compile_error(vec![Rule::tuple(["custom".into(), Arg::from(json!(null))])]),
            FlowError::InvalidCustomRule
        );
    }

    #[test]
    fn test_conditional_errors_in_order() {
        assert_eq!(
            compile_error(vec![Rule::tuple(["if".into()])]),
            FlowError::MalformedConditional
        );
        assert_eq!(
            compile_error(vec![Rule::when(
                Arg::from(json!(true)),
                Schema::new(),
                Schema::new()
            )]),
            FlowError::InvalidCondition
        );
        assert_eq!(
            compile_error(vec![Rule::when(
                "dummy".into(),
                Arg::from(json!(1)),
                Arg::from(json!(2))
            )]),
            FlowError::InvalidBranches
        );
        assert_eq!(
            compile_error(vec![Rule::when(
                "dummy".into(),
                Schema::new(),
                Arg::from(json!(2))
            )]),
            FlowError::InvalidBranches
        );
        assert_eq!(
            compile_error(vec![Rule::when("dummy".into(), Schema::new(), Schema::new())]),
            FlowError::UnknownCondition {
                name: "dummy".to_string()
            }
        );
    }

    #[test]
    fn test_includes() {
        let (schema, pending) = compile_rules(vec![Rule::include("self")]).unwrap();
        assert!(pending.is_empty());
        assert!(matches!(
            schema.flows[0].steps[0],
            FlowStep::Include(IncludeTarget::Itself)
        ));

        let (_, pending) = compile_rules(vec![Rule::include("address")]).unwrap();
        assert_eq!(pending.into_iter().collect::<Vec<_>>(), vec!["address"]);

        assert_eq!(
            compile_error(vec![Rule::tuple(["include".into()])]),
            FlowError::InvalidInclude
        );
    }

    #[test]
    fn test_top_keys() {
        let (schema, _) = compile(
            Schema::new()
                .path("a.b", ["isString"])
                .path("c", ["isString", "showAs:C"])
                .path("a", ["isObject"])
                .path("[].x", ["isString"]),
            &RuleRegistry::builtin(),
        )
        .unwrap();
        let keys: Vec<_> = schema
            .top_keys
            .iter()
            .map(|top| (top.key.as_str(), top.label.as_deref()))
            .collect();
        assert_eq!(keys, vec![("a", None), ("c", Some("C"))]);
    }
}
