//! Core validation engine.
//!
//! This module turns a [`Schema`](crate::schema::Schema) into a [`Validator`]
//! and runs it against mutable JSON records.
//!
//! ## Overview
//!
//! - **[`Validator`]**: a compiled schema, its options and the errors of its
//!   last run
//! - **[`ValidatorOptions`]** / **[`Messages`]**: run policies and engine
//!   messages, loadable through serde
//! - **[`ErrorMap`]**: per-path errors in the order they were recorded
//!
//! ## Architecture
//!
//! ```text
//! Validator::validate
//!     ├── root procedures (filterKeys)
//!     ├── root policy (objects, arrays with array_allow)
//!     ├── walker: path segments, [] wildcards, depth budget
//!     │   └── executor: rule flow of one field
//!     │       ├── named rules, custom rules, defaults
//!     │       ├── nested validators / includes  ──► child walker
//!     │       └── if branches                   ──► branch walker
//!     └── strict mode: missing top-level keys
//! ```
//!
//! ## Example
//!
//! ```rust
//! use flow_guard::core::Validator;
//! use flow_guard::schema::{Arg, Rule, Schema};
//! use serde_json::json;
//!
//! # fn main() -> flow_guard::error::Result<()> {
//! let address = Schema::new()
//!     .path("city", ["isExists:city is required", "isString"])
//!     .path("zip", vec![Rule::tuple(["matches:bad zip".into(), Arg::from(json!("^[0-9]{5}$"))])]);
//!
//! let validator = Validator::new(
//!     Schema::new()
//!         .path("name", ["isString", "trim"])
//!         .path("address", vec![Rule::from(address)]),
//! )?
//! .strict(true)
//! .try_all(true);
//!
//! let mut record = json!({"name": " Ada ", "address": {"zip": "1234"}});
//! assert!(!validator.validate(&mut record)?);
//! assert_eq!(record["name"], "Ada");
//! assert_eq!(
//!     validator.get_errors().to_json(),
//!     json!({"address.city": "city is required", "address.zip": "bad zip"})
//! );
//! # Ok(())
//! # }
//! ```

mod compiler;
mod errors;
mod executor;
mod options;
mod procedures;
mod validator;
mod walker;

pub use errors::{ErrorMap, ErrorValue, FieldError};
pub use options::{Messages, ValidatorOptions};
pub use validator::{Translator, Validator};
pub use walker::INVALID_ROOT_KEY;
