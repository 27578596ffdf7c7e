//! # policy-engine
//!
//! Role-conditioned data-visibility policies for the data-veil workspace.
//! This crate loads YAML policy files, compiles rule predicates, and decides
//! per caller what value a column shows (masking policies) and which rows a
//! query may see (row access policies).
//!
//! A policy is an ordered list of (predicate, outcome) rules plus a mandatory
//! default outcome: rules are checked in declaration order, the first match
//! wins, and the default applies otherwise, so evaluation is total over every
//! caller context.  Bindings attach mask policies to columns (one per column)
//! and row access policies to tables (one per table); both kinds compose, with
//! the row filter deciding visibility before the mask transforms the value.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use policy_engine::{CallerContext, PolicyEngine, loader};
//!
//! let config = loader::load_policy("policies.yaml").unwrap();
//! let engine = PolicyEngine::new(config).unwrap();
//!
//! let ctx = CallerContext::new("analyst", "jdoe");
//! let decision = engine.evaluate_mask("email_mask", &ctx, "a@b.com").unwrap();
//! println!("{}", decision.value);
//! ```

mod context;
mod decision;
mod error;
mod evaluator;
pub mod loader;
pub mod redaction;
mod registry;
mod schema;

// Re-export primary public API at crate root.
pub use context::CallerContext;
pub use decision::{FilterDecision, MaskDecision};
pub use error::{PolicyError, Result};
pub use evaluator::{CompiledPolicy, PolicyEngine};
pub use registry::PolicyRegistry;
pub use schema::{
    BindingDef, PolicyConfig, PolicyDef, PolicyKind, PolicyRule, RuleOutcome, RulePredicate,
};
