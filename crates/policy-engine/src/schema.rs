use serde::{Deserialize, Serialize};

/// Top-level policy configuration loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Schema version; currently must be "1.0".
    pub version: String,
    /// Policy definitions, registered in declaration order.
    #[serde(default)]
    pub policies: Vec<PolicyDef>,
    /// Bindings attaching policies to tables and table columns.
    #[serde(default)]
    pub bindings: Vec<BindingDef>,
}

/// A single policy: an ordered rule list plus a default outcome.
///
/// Rules are evaluated in declaration order and the first matching predicate
/// wins.  The default outcome applies when no rule matches, which makes
/// evaluation total over every caller context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDef {
    /// Unique policy identifier.
    pub name: String,
    /// Optional longer description, surfaced in decision reasons.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether this policy transforms column values or filters rows.
    pub kind: PolicyKind,
    /// Match the caller's secondary roles in addition to the active role.
    /// Off by default: a role predicate then only sees the active role.
    #[serde(default)]
    pub match_secondary_roles: bool,
    /// Ordered rule list (first match wins).
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
    /// Outcome applied when no rule matches.  Optional in the schema so that
    /// registration can report a precise `NoDefaultRule` error instead of a
    /// generic deserialization failure.
    #[serde(default)]
    pub default_outcome: Option<RuleOutcome>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Transforms the displayed value of a column.
    Mask,
    /// Decides which rows a caller may see.
    RowFilter,
}

/// A single (predicate, outcome) pair inside a policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Optional label surfaced in decisions and audit records.
    #[serde(default)]
    pub label: Option<String>,
    /// Conditions that must all hold for the rule to fire.
    #[serde(default)]
    pub predicate: RulePredicate,
    /// Effect applied when the rule fires.
    pub outcome: RuleOutcome,
}

/// Conjunction of conditions evaluated against the caller context and, for
/// row filters, the row's discriminant column value.  An omitted condition
/// matches anything, so an empty predicate fires unconditionally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulePredicate {
    /// Caller's role must be one of these (compared case-insensitively).
    #[serde(default)]
    pub roles: Vec<String>,
    /// Caller's user identity must be one of these (exact match).
    #[serde(default)]
    pub users: Vec<String>,
    /// Pattern matched against the row discriminant (row filters only).
    /// `*` and `?` are glob wildcards and `|` separates alternatives, unless
    /// `discriminant_is_regex` is set.
    #[serde(default)]
    pub discriminant: Option<String>,
    /// Interpret `discriminant` as a regular expression instead of a glob.
    #[serde(default)]
    pub discriminant_is_regex: bool,
}

/// The effect applied when a rule (or the policy default) fires.
///
/// Mask outcomes produce a deterministic transformed value whose shape does
/// not depend on the input length beyond what the transform keeps; row-filter
/// outcomes resolve to a visibility boolean.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleOutcome {
    /// Return the original value unchanged.
    Passthrough,
    /// Fixed full redaction.
    Redact,
    /// Hide the local part of an email address, keep the domain.
    MaskEmail,
    /// Hide all but the last four digits of a phone number.
    MaskPhone,
    /// Keep the first character, redact the remainder.
    InitialOnly,
    /// Replace the value with a fixed literal.
    Literal { value: String },
    /// The row is visible (row filters only).
    Admit,
    /// The row is hidden (row filters only).
    Exclude,
}

impl RuleOutcome {
    /// Whether this outcome is legal for a policy of the given kind.
    pub fn allowed_for(&self, kind: PolicyKind) -> bool {
        match self {
            RuleOutcome::Admit | RuleOutcome::Exclude => kind == PolicyKind::RowFilter,
            _ => kind == PolicyKind::Mask,
        }
    }
}

/// Attaches a policy to a table (row filter) or a table column (mask).
///
/// Table and column names are compared case-insensitively, matching the
/// identifier semantics of the warehouses these policies front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingDef {
    pub table: String,
    /// Present for mask bindings, absent for row-filter bindings.
    #[serde(default)]
    pub column: Option<String>,
    /// Name of the bound policy.
    pub policy: String,
}
