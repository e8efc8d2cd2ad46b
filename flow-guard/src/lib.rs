//! # flow-guard - Path-addressed validation and sanitization for JSON records
//!
//! flow-guard validates `serde_json::Value` records against declarative
//! schemas. A schema maps dot-delimited paths (with `[]` standing for every
//! element of an array) to an ordered flow of rules; the engine walks the
//! record, fills defaults, rewrites values through sanitizers and collects
//! one error per failing path.
//!
//! ## Quick Start
//!
//! ```rust
//! use flow_guard::prelude::*;
//! use serde_json::json;
//!
//! # fn main() -> flow_guard::error::Result<()> {
//! let validator = Validator::new(
//!     Schema::new()
//!         .path("email", ["isExists:email is required", "isString", "trim", "toLowerCase"])
//!         .path("role", vec![Rule::default_value("member")])
//!         .path("tags", ["isArray"])
//!         .path("tags.[]", ["isString:tags must be text"]),
//! )?
//! .try_all(true);
//!
//! let mut record = json!({"email": " Ada@Example.com ", "tags": ["x", 2]});
//! assert!(!validator.validate(&mut record)?);
//! assert_eq!(record["email"], "ada@example.com");
//! assert_eq!(record["role"], "member");
//! assert_eq!(validator.get_errors().to_json(), json!({"tags.1": "tags must be text"}));
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Features
//!
//! - **Rule flows**: named rules with `name:message` overrides, custom
//!   functions, defaults, `showAs` labels, `if` branches and nested schemas
//! - **Includes**: recursive schemas through `include "self"` and named
//!   validators bound after construction
//! - **Policies**: fail-fast or collect-all, strict mode, array roots and a
//!   depth budget that can propagate into nested validators
//! - **Root procedures**: `filterKeys` drops unexpected top-level keys
//! - **Translation**: a hook applied to every stored message
//!
//! ## Architecture
//!
//! - **`schema`**: raw schema tokens (`Schema`, `Rule`, `Arg`, `Procedure`)
//! - **`rules`**: the `RuleCheck` trait, built-in rules and `RuleRegistry`
//! - **`core`**: compiler, walker, executor and the `Validator` handle
//! - **`error`**: configuration errors
//! - **`logging`**: `tracing` configuration helpers

pub mod core;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod rules;
pub mod schema;
