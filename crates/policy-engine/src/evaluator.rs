use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use tracing::{debug, trace, warn};

use crate::context::CallerContext;
use crate::decision::{FilterDecision, MaskDecision};
use crate::error::{PolicyError, Result};
use crate::redaction;
use crate::registry::PolicyRegistry;
use crate::schema::{PolicyConfig, PolicyDef, PolicyKind, RuleOutcome};

// ---------------------------------------------------------------------------
// Compiled policy representations
// ---------------------------------------------------------------------------

/// A discriminant predicate compiled for fast repeated evaluation.
#[derive(Debug)]
enum CompiledDiscriminant {
    /// `|`-separated glob alternatives; matches if any alternative matches.
    Globs(GlobSet),
    /// A single regular expression tested against the discriminant value.
    Pattern(Regex),
}

impl CompiledDiscriminant {
    fn is_match(&self, value: &str) -> bool {
        match self {
            CompiledDiscriminant::Globs(set) => set.is_match(value),
            CompiledDiscriminant::Pattern(re) => re.is_match(value),
        }
    }
}

/// A single rule with its predicate pre-compiled.
#[derive(Debug)]
struct CompiledRule {
    /// Label surfaced in decisions; falls back to the rule's position.
    label: String,
    /// Roles accepted by this rule (empty = any role).
    roles: Vec<String>,
    /// Users accepted by this rule (empty = any user).
    users: Vec<String>,
    /// Discriminant pattern (row filters only).
    discriminant: Option<CompiledDiscriminant>,
    outcome: RuleOutcome,
}

impl CompiledRule {
    /// All predicate conditions must hold (AND logic); omitted conditions
    /// are vacuously true.
    fn matches(
        &self,
        ctx: &CallerContext,
        discriminant: Option<&str>,
        include_secondary: bool,
    ) -> bool {
        if !self.roles.is_empty() && !self.roles.iter().any(|r| ctx.holds_role(r, include_secondary))
        {
            return false;
        }
        if !self.users.is_empty() && !self.users.iter().any(|u| u == ctx.user()) {
            return false;
        }
        if let Some(pattern) = &self.discriminant {
            match discriminant {
                Some(value) => {
                    if !pattern.is_match(value) {
                        return false;
                    }
                }
                // A discriminant condition cannot hold without a value.
                None => return false,
            }
        }
        true
    }
}

/// A policy whose rule predicates have been compiled eagerly.
///
/// Evaluation walks the rules in declaration order; the first matching
/// predicate wins and the default outcome applies when nothing matches, so
/// every (policy, context) pair yields a defined outcome.
#[derive(Debug)]
pub struct CompiledPolicy {
    name: String,
    description: Option<String>,
    kind: PolicyKind,
    match_secondary_roles: bool,
    rules: Vec<CompiledRule>,
    default_outcome: RuleOutcome,
}

impl CompiledPolicy {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    /// Walk rules in declaration order and return the first match.
    fn first_match(&self, ctx: &CallerContext, discriminant: Option<&str>) -> Option<&CompiledRule> {
        self.rules
            .iter()
            .find(|rule| rule.matches(ctx, discriminant, self.match_secondary_roles))
    }

    /// Transform `raw` according to the first matching rule, or the default
    /// outcome when no rule matches.  Total over every well-formed context.
    pub fn evaluate_mask(&self, ctx: &CallerContext, raw: &str) -> MaskDecision {
        match self.first_match(ctx, None) {
            Some(rule) => {
                trace!(policy = self.name, rule = rule.label, "mask rule matched");
                MaskDecision {
                    value: apply_mask_outcome(&self.name, &rule.outcome, raw),
                    matched_rule: Some(rule.label.clone()),
                    reason: format!("matched rule '{}'", rule.label),
                }
            }
            None => MaskDecision {
                value: apply_mask_outcome(&self.name, &self.default_outcome, raw),
                matched_rule: None,
                reason: self
                    .description
                    .clone()
                    .unwrap_or_else(|| "no rule matched; default outcome applied".to_string()),
            },
        }
    }

    /// Decide row visibility according to the first matching rule, or the
    /// default outcome when no rule matches.
    pub fn evaluate_row(&self, ctx: &CallerContext, discriminant: &str) -> FilterDecision {
        match self.first_match(ctx, Some(discriminant)) {
            Some(rule) => {
                trace!(policy = self.name, rule = rule.label, "row rule matched");
                FilterDecision {
                    visible: row_outcome_visible(&self.name, &rule.outcome),
                    matched_rule: Some(rule.label.clone()),
                    reason: format!("matched rule '{}'", rule.label),
                }
            }
            None => FilterDecision {
                visible: row_outcome_visible(&self.name, &self.default_outcome),
                matched_rule: None,
                reason: self
                    .description
                    .clone()
                    .unwrap_or_else(|| "no rule matched; default outcome applied".to_string()),
            },
        }
    }
}

/// Apply a mask outcome to a raw value.
///
/// Kind agreement is enforced at compile time; a row-filter outcome reaching
/// this path resolves to full redaction.
fn apply_mask_outcome(policy: &str, outcome: &RuleOutcome, raw: &str) -> String {
    match outcome {
        RuleOutcome::Passthrough => raw.to_string(),
        RuleOutcome::Redact => redaction::redact_full(raw),
        RuleOutcome::MaskEmail => redaction::mask_email(raw),
        RuleOutcome::MaskPhone => redaction::mask_phone(raw),
        RuleOutcome::InitialOnly => redaction::initial_only(raw),
        RuleOutcome::Literal { value } => value.clone(),
        RuleOutcome::Admit | RuleOutcome::Exclude => {
            warn!(policy, "row-filter outcome reached mask evaluation");
            redaction::redact_full(raw)
        }
    }
}

/// Resolve a row-filter outcome to a visibility boolean.
///
/// Kind agreement is enforced at compile time; a mask outcome reaching this
/// path resolves to hidden.
fn row_outcome_visible(policy: &str, outcome: &RuleOutcome) -> bool {
    match outcome {
        RuleOutcome::Admit => true,
        RuleOutcome::Exclude => false,
        _ => {
            warn!(policy, "mask outcome reached row-filter evaluation");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Compile a [`PolicyDef`] into its pre-compiled form, validating it along
/// the way.
///
/// Fails with `NoDefaultRule` when the default outcome is missing,
/// `KindMismatch` when an outcome (or a discriminant predicate on a mask
/// policy) disagrees with the policy kind, and `InvalidPattern` when a
/// discriminant pattern does not compile.
pub(crate) fn compile_policy(def: PolicyDef) -> Result<CompiledPolicy> {
    let default_outcome = def.default_outcome.ok_or_else(|| PolicyError::NoDefaultRule {
        name: def.name.clone(),
    })?;

    if !default_outcome.allowed_for(def.kind) {
        return Err(PolicyError::kind_mismatch(
            &def.name,
            "default outcome disagrees with policy kind",
        ));
    }

    let mut rules = Vec::with_capacity(def.rules.len());
    for (idx, rule) in def.rules.into_iter().enumerate() {
        if !rule.outcome.allowed_for(def.kind) {
            return Err(PolicyError::kind_mismatch(
                &def.name,
                format!("rule {} outcome disagrees with policy kind", idx + 1),
            ));
        }

        let discriminant = match rule.predicate.discriminant {
            Some(pattern) => {
                if def.kind == PolicyKind::Mask {
                    return Err(PolicyError::kind_mismatch(
                        &def.name,
                        "discriminant predicates apply to row filters only",
                    ));
                }
                Some(compile_discriminant(
                    &def.name,
                    &pattern,
                    rule.predicate.discriminant_is_regex,
                )?)
            }
            None => None,
        };

        rules.push(CompiledRule {
            label: rule.label.unwrap_or_else(|| format!("rule {}", idx + 1)),
            roles: rule.predicate.roles,
            users: rule.predicate.users,
            discriminant,
            outcome: rule.outcome,
        });
    }

    Ok(CompiledPolicy {
        name: def.name,
        description: def.description,
        kind: def.kind,
        match_secondary_roles: def.match_secondary_roles,
        rules,
        default_outcome,
    })
}

/// Compile a discriminant pattern: either a single regex or a set of
/// `|`-separated glob alternatives.
fn compile_discriminant(
    policy: &str,
    pattern: &str,
    is_regex: bool,
) -> Result<CompiledDiscriminant> {
    if is_regex {
        let re = Regex::new(pattern).map_err(|_| PolicyError::InvalidPattern {
            name: policy.to_string(),
            pattern: pattern.to_string(),
        })?;
        return Ok(CompiledDiscriminant::Pattern(re));
    }

    let mut builder = GlobSetBuilder::new();
    for alt in pattern.split('|') {
        let glob = Glob::new(alt.trim()).map_err(|_| PolicyError::InvalidPattern {
            name: policy.to_string(),
            pattern: pattern.to_string(),
        })?;
        builder.add(glob);
    }
    let set = builder.build().map_err(|_| PolicyError::InvalidPattern {
        name: policy.to_string(),
        pattern: pattern.to_string(),
    })?;
    Ok(CompiledDiscriminant::Globs(set))
}

// ---------------------------------------------------------------------------
// PolicyEngine
// ---------------------------------------------------------------------------

/// The main policy evaluation engine.
///
/// Construct via [`PolicyEngine::new`] from a loaded [`PolicyConfig`]; every
/// policy is compiled and bound eagerly, and the registry is immutable
/// afterwards.  Evaluation is pure and synchronous.
pub struct PolicyEngine {
    registry: PolicyRegistry,
}

impl std::fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEngine")
            .field("num_policies", &self.registry.policy_count())
            .field("num_bindings", &self.registry.binding_count())
            .finish()
    }
}

impl PolicyEngine {
    /// Build an engine from a validated [`PolicyConfig`].
    ///
    /// Registers every policy and binding in declaration order; the first
    /// validation failure is returned.
    pub fn new(config: PolicyConfig) -> Result<Self> {
        Ok(Self {
            registry: PolicyRegistry::from_config(config)?,
        })
    }

    /// Build an engine around an already-populated registry.
    pub fn with_registry(registry: PolicyRegistry) -> Self {
        Self { registry }
    }

    /// Return a reference to the underlying registry.
    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    // -- Evaluate entry points ------------------------------------------------

    /// Evaluate the named mask policy against a raw value.
    ///
    /// Fails with `UnknownPolicy` for an unregistered name and `KindMismatch`
    /// when the name refers to a row-filter policy.
    pub fn evaluate_mask(
        &self,
        policy_id: &str,
        ctx: &CallerContext,
        raw_value: &str,
    ) -> Result<MaskDecision> {
        debug!(policy = policy_id, role = ctx.active_role(), "evaluating mask policy");

        let policy = self
            .registry
            .get(policy_id)
            .ok_or_else(|| PolicyError::UnknownPolicy {
                name: policy_id.to_string(),
            })?;
        if policy.kind() != PolicyKind::Mask {
            return Err(PolicyError::kind_mismatch(
                policy_id,
                "not a mask policy",
            ));
        }
        Ok(policy.evaluate_mask(ctx, raw_value))
    }

    /// Evaluate the named row access policy against a row discriminant.
    ///
    /// Fails with `UnknownPolicy` for an unregistered name and `KindMismatch`
    /// when the name refers to a mask policy.
    pub fn evaluate_row_filter(
        &self,
        policy_id: &str,
        ctx: &CallerContext,
        discriminant: &str,
    ) -> Result<FilterDecision> {
        debug!(
            policy = policy_id,
            role = ctx.active_role(),
            "evaluating row access policy"
        );

        let policy = self
            .registry
            .get(policy_id)
            .ok_or_else(|| PolicyError::UnknownPolicy {
                name: policy_id.to_string(),
            })?;
        if policy.kind() != PolicyKind::RowFilter {
            return Err(PolicyError::kind_mismatch(
                policy_id,
                "not a row access policy",
            ));
        }
        Ok(policy.evaluate_row(ctx, discriminant))
    }

    // -- Binding-resolved evaluation ------------------------------------------

    /// Apply the mask policy bound to `table.column`, if any.
    ///
    /// Unbound columns pass through unchanged.
    pub fn mask_cell(
        &self,
        table: &str,
        column: &str,
        ctx: &CallerContext,
        raw_value: &str,
    ) -> MaskDecision {
        match self.registry.resolve_mask(table, column) {
            Some(policy) => policy.evaluate_mask(ctx, raw_value),
            None => MaskDecision::passthrough(raw_value, "no masking policy bound"),
        }
    }

    /// Apply the row access policy bound to `table`, if any.
    ///
    /// Unbound tables admit every row.
    pub fn row_visible(&self, table: &str, ctx: &CallerContext, discriminant: &str) -> FilterDecision {
        match self.registry.resolve_row_filter(table) {
            Some(policy) => policy.evaluate_row(ctx, discriminant),
            None => FilterDecision::admit_default("no row access policy bound"),
        }
    }

    /// Compose both policy kinds for a single cell: the row filter decides
    /// visibility first, and only for visible rows is the mask applied.
    ///
    /// Returns `None` when the row is hidden from the caller.
    pub fn evaluate_cell(
        &self,
        table: &str,
        column: &str,
        ctx: &CallerContext,
        discriminant: &str,
        raw_value: &str,
    ) -> Option<MaskDecision> {
        let filter = self.row_visible(table, ctx, discriminant);
        if !filter.visible {
            debug!(table, column, reason = filter.reason, "row hidden from caller");
            return None;
        }
        Some(self.mask_cell(table, column, ctx, raw_value))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_policy_from_str;

    fn engine_from_yaml(yaml: &str) -> PolicyEngine {
        let config = load_policy_from_str(yaml).expect("test YAML should parse");
        PolicyEngine::new(config).expect("engine construction should succeed")
    }

    /// Tiered email visibility: officers see clear, analysts see the domain,
    /// everyone else gets full redaction.
    const EMAIL_TIERS: &str = r#"
version: "1.0"
policies:
  - name: email_mask
    kind: mask
    rules:
      - label: "officers-see-clear"
        predicate:
          roles: [admin, compliance]
        outcome:
          type: passthrough
      - label: "analysts-see-domain"
        predicate:
          roles: [analyst, engineer]
        outcome:
          type: mask_email
    default_outcome:
      type: redact
"#;

    // -- Mask evaluation ------------------------------------------------------

    #[test]
    fn admin_and_compliance_see_original_value() {
        let engine = engine_from_yaml(EMAIL_TIERS);

        for role in ["admin", "compliance", "ADMIN"] {
            let ctx = CallerContext::new(role, "jdoe");
            let d = engine.evaluate_mask("email_mask", &ctx, "a@b.com").unwrap();
            assert_eq!(d.value, "a@b.com", "role {role} should see the clear value");
            assert_eq!(d.matched_rule.as_deref(), Some("officers-see-clear"));
        }
    }

    #[test]
    fn analyst_sees_domain_only() {
        let engine = engine_from_yaml(EMAIL_TIERS);

        let ctx = CallerContext::new("analyst", "jdoe");
        let d = engine.evaluate_mask("email_mask", &ctx, "a@b.com").unwrap();
        assert_eq!(d.value, "****@b.com");
        assert_eq!(d.matched_rule.as_deref(), Some("analysts-see-domain"));
    }

    #[test]
    fn unmatched_role_gets_default_redaction() {
        let engine = engine_from_yaml(EMAIL_TIERS);

        let ctx = CallerContext::new("viewer", "jdoe");
        let d = engine.evaluate_mask("email_mask", &ctx, "a@b.com").unwrap();
        assert_eq!(d.value, "*****");
        assert!(d.matched_rule.is_none());
    }

    #[test]
    fn evaluation_is_total_for_arbitrary_contexts() {
        let engine = engine_from_yaml(EMAIL_TIERS);

        // No role or user in the policy mentions these; the default outcome
        // must still produce a defined result.
        for (role, user) in [("", ""), ("intern", "nobody"), ("ADMIN2", "jdoe")] {
            let ctx = CallerContext::new(role, user);
            let d = engine.evaluate_mask("email_mask", &ctx, "a@b.com").unwrap();
            assert_eq!(d.value, "*****");
        }
    }

    #[test]
    fn rule_order_decides_overlapping_predicates() {
        // Both rules match the analyst role; the first declared must win.
        let engine = engine_from_yaml(
            r#"
version: "1.0"
policies:
  - name: overlap
    kind: mask
    rules:
      - label: "first"
        predicate:
          roles: [analyst]
        outcome:
          type: mask_email
      - label: "second"
        predicate:
          roles: [analyst, admin]
        outcome:
          type: passthrough
    default_outcome:
      type: redact
"#,
        );

        let ctx = CallerContext::new("analyst", "jdoe");
        let d = engine.evaluate_mask("overlap", &ctx, "a@b.com").unwrap();
        assert_eq!(d.matched_rule.as_deref(), Some("first"));
        assert_eq!(d.value, "****@b.com");

        // A role only the later rule matches still reaches it.
        let ctx = CallerContext::new("admin", "jdoe");
        let d = engine.evaluate_mask("overlap", &ctx, "a@b.com").unwrap();
        assert_eq!(d.matched_rule.as_deref(), Some("second"));
        assert_eq!(d.value, "a@b.com");
    }

    #[test]
    fn user_predicate_requires_exact_match() {
        let engine = engine_from_yaml(
            r#"
version: "1.0"
policies:
  - name: owner_only
    kind: mask
    rules:
      - predicate:
          users: [jdoe]
        outcome:
          type: passthrough
    default_outcome:
      type: redact
"#,
        );

        let d = engine
            .evaluate_mask("owner_only", &CallerContext::new("any", "jdoe"), "secret")
            .unwrap();
        assert_eq!(d.value, "secret");

        let d = engine
            .evaluate_mask("owner_only", &CallerContext::new("any", "JDOE"), "secret")
            .unwrap();
        assert_eq!(d.value, "*****");
    }

    #[test]
    fn phone_mask_keeps_last_four() {
        let engine = engine_from_yaml(
            r#"
version: "1.0"
policies:
  - name: phone_mask
    kind: mask
    rules:
      - predicate:
          roles: [admin, compliance]
        outcome:
          type: passthrough
    default_outcome:
      type: mask_phone
"#,
        );

        let ctx = CallerContext::new("analyst", "jdoe");
        let d = engine
            .evaluate_mask("phone_mask", &ctx, "555-867-5309")
            .unwrap();
        assert_eq!(d.value, "***-***-5309");

        let ctx = CallerContext::new("compliance", "jdoe");
        let d = engine
            .evaluate_mask("phone_mask", &ctx, "555-867-5309")
            .unwrap();
        assert_eq!(d.value, "555-867-5309");
    }

    #[test]
    fn secondary_roles_only_match_when_policy_opts_in() {
        let strict = engine_from_yaml(EMAIL_TIERS);
        let ctx = CallerContext::new("viewer", "jdoe").with_secondary_roles(["compliance"]);

        // Default: the secondary compliance role does not widen access.
        let d = strict.evaluate_mask("email_mask", &ctx, "a@b.com").unwrap();
        assert_eq!(d.value, "*****");

        // Same rule set with the explicit opt-in.
        let lenient = engine_from_yaml(
            r#"
version: "1.0"
policies:
  - name: email_mask
    kind: mask
    match_secondary_roles: true
    rules:
      - predicate:
          roles: [admin, compliance]
        outcome:
          type: passthrough
    default_outcome:
      type: redact
"#,
        );
        let d = lenient.evaluate_mask("email_mask", &ctx, "a@b.com").unwrap();
        assert_eq!(d.value, "a@b.com");
    }

    #[test]
    fn unknown_policy_is_an_error() {
        let engine = engine_from_yaml(EMAIL_TIERS);
        let err = engine
            .evaluate_mask("nope", &CallerContext::new("admin", "jdoe"), "x")
            .unwrap_err();
        assert!(matches!(err, PolicyError::UnknownPolicy { .. }));
    }

    #[test]
    fn mask_entry_point_rejects_row_filter_policy() {
        let engine = engine_from_yaml(
            r#"
version: "1.0"
policies:
  - name: region_filter
    kind: row_filter
    default_outcome:
      type: exclude
"#,
        );

        let err = engine
            .evaluate_mask("region_filter", &CallerContext::new("admin", "jdoe"), "x")
            .unwrap_err();
        assert!(matches!(err, PolicyError::KindMismatch { .. }));
    }

    // -- Row-filter evaluation ------------------------------------------------

    const REGION_FILTER: &str = r#"
version: "1.0"
policies:
  - name: region_filter
    kind: row_filter
    rules:
      - label: "admins-see-all"
        predicate:
          roles: [admin]
        outcome:
          type: admit
      - label: "domestic-only"
        predicate:
          discriminant: "US-*"
        outcome:
          type: admit
    default_outcome:
      type: exclude
"#;

    #[test]
    fn row_filter_admits_by_role() {
        let engine = engine_from_yaml(REGION_FILTER);
        let ctx = CallerContext::new("admin", "jdoe");

        let d = engine
            .evaluate_row_filter("region_filter", &ctx, "EU-CENTRAL")
            .unwrap();
        assert!(d.visible);
        assert_eq!(d.matched_rule.as_deref(), Some("admins-see-all"));
    }

    #[test]
    fn row_filter_admits_by_discriminant_glob() {
        let engine = engine_from_yaml(REGION_FILTER);
        let ctx = CallerContext::new("analyst", "jdoe");

        assert!(engine
            .evaluate_row_filter("region_filter", &ctx, "US-WEST")
            .unwrap()
            .visible);
        assert!(!engine
            .evaluate_row_filter("region_filter", &ctx, "EU-CENTRAL")
            .unwrap()
            .visible);
    }

    #[test]
    fn row_filter_regex_discriminant() {
        let engine = engine_from_yaml(
            r#"
version: "1.0"
policies:
  - name: tier_filter
    kind: row_filter
    rules:
      - predicate:
          discriminant: "^(gold|platinum)$"
          discriminant_is_regex: true
        outcome:
          type: admit
    default_outcome:
      type: exclude
"#,
        );
        let ctx = CallerContext::new("analyst", "jdoe");

        assert!(engine
            .evaluate_row_filter("tier_filter", &ctx, "gold")
            .unwrap()
            .visible);
        assert!(!engine
            .evaluate_row_filter("tier_filter", &ctx, "silver")
            .unwrap()
            .visible);
    }

    #[test]
    fn row_filter_glob_alternatives() {
        let engine = engine_from_yaml(
            r#"
version: "1.0"
policies:
  - name: coast_filter
    kind: row_filter
    rules:
      - predicate:
          discriminant: "US-EAST-*|US-WEST-*"
        outcome:
          type: admit
    default_outcome:
      type: exclude
"#,
        );
        let ctx = CallerContext::new("analyst", "jdoe");

        assert!(engine
            .evaluate_row_filter("coast_filter", &ctx, "US-EAST-1")
            .unwrap()
            .visible);
        assert!(engine
            .evaluate_row_filter("coast_filter", &ctx, "US-WEST-2")
            .unwrap()
            .visible);
        assert!(!engine
            .evaluate_row_filter("coast_filter", &ctx, "US-CENTRAL-1")
            .unwrap()
            .visible);
    }

    #[test]
    fn role_and_discriminant_are_conjunctive() {
        let engine = engine_from_yaml(
            r#"
version: "1.0"
policies:
  - name: scoped
    kind: row_filter
    rules:
      - predicate:
          roles: [analyst]
          discriminant: "US-*"
        outcome:
          type: admit
    default_outcome:
      type: exclude
"#,
        );

        let analyst = CallerContext::new("analyst", "jdoe");
        let viewer = CallerContext::new("viewer", "jdoe");

        // Both conditions must hold.
        assert!(engine
            .evaluate_row_filter("scoped", &analyst, "US-WEST")
            .unwrap()
            .visible);
        assert!(!engine
            .evaluate_row_filter("scoped", &analyst, "EU-WEST")
            .unwrap()
            .visible);
        assert!(!engine
            .evaluate_row_filter("scoped", &viewer, "US-WEST")
            .unwrap()
            .visible);
    }

    // -- Binding-resolved evaluation -------------------------------------------

    const BOUND_CONFIG: &str = r#"
version: "1.0"
policies:
  - name: email_mask
    kind: mask
    rules:
      - predicate:
          roles: [admin, compliance]
        outcome:
          type: passthrough
      - predicate:
          roles: [analyst, engineer]
        outcome:
          type: mask_email
    default_outcome:
      type: redact
  - name: region_filter
    kind: row_filter
    rules:
      - predicate:
          roles: [admin]
        outcome:
          type: admit
      - predicate:
          discriminant: "US-*"
        outcome:
          type: admit
    default_outcome:
      type: exclude
bindings:
  - table: customers
    column: email
    policy: email_mask
  - table: customers
    policy: region_filter
"#;

    #[test]
    fn mask_cell_resolves_binding() {
        let engine = engine_from_yaml(BOUND_CONFIG);
        let ctx = CallerContext::new("analyst", "jdoe");

        let d = engine.mask_cell("customers", "email", &ctx, "a@b.com");
        assert_eq!(d.value, "****@b.com");

        // Case-insensitive table/column resolution.
        let d = engine.mask_cell("CUSTOMERS", "EMAIL", &ctx, "a@b.com");
        assert_eq!(d.value, "****@b.com");
    }

    #[test]
    fn unbound_column_passes_through() {
        let engine = engine_from_yaml(BOUND_CONFIG);
        let ctx = CallerContext::new("viewer", "jdoe");

        let d = engine.mask_cell("customers", "signup_date", &ctx, "2024-01-01");
        assert_eq!(d.value, "2024-01-01");
        assert!(d.matched_rule.is_none());
    }

    #[test]
    fn unbound_table_admits_rows() {
        let engine = engine_from_yaml(BOUND_CONFIG);
        let ctx = CallerContext::new("viewer", "jdoe");

        let d = engine.row_visible("orders", &ctx, "EU-CENTRAL");
        assert!(d.visible);
    }

    #[test]
    fn cell_composition_filters_before_masking() {
        let engine = engine_from_yaml(BOUND_CONFIG);

        // Analyst sees US rows, with the email masked to domain-only.
        let analyst = CallerContext::new("analyst", "jdoe");
        let cell = engine.evaluate_cell("customers", "email", &analyst, "US-WEST", "a@b.com");
        assert_eq!(cell.unwrap().value, "****@b.com");

        // The same caller gets no value at all for a hidden row, regardless
        // of the column's mask policy.
        let cell = engine.evaluate_cell("customers", "email", &analyst, "EU-CENTRAL", "a@b.com");
        assert!(cell.is_none());

        // Admin sees every row with the clear value.
        let admin = CallerContext::new("admin", "jdoe");
        let cell = engine.evaluate_cell("customers", "email", &admin, "EU-CENTRAL", "a@b.com");
        assert_eq!(cell.unwrap().value, "a@b.com");
    }

    // -- Construction errors ---------------------------------------------------

    #[test]
    fn missing_default_outcome_rejected_at_construction() {
        let config = load_policy_from_str(
            r#"
version: "1.0"
policies:
  - name: incomplete
    kind: mask
    rules:
      - predicate:
          roles: [admin]
        outcome:
          type: passthrough
"#,
        )
        .unwrap();

        let err = PolicyEngine::new(config).unwrap_err();
        assert!(matches!(err, PolicyError::NoDefaultRule { .. }));
        assert!(err.to_string().contains("incomplete"));
    }

    #[test]
    fn invalid_regex_rejected_at_construction() {
        let config = load_policy_from_str(
            r#"
version: "1.0"
policies:
  - name: bad_pattern
    kind: row_filter
    rules:
      - predicate:
          discriminant: "[invalid"
          discriminant_is_regex: true
        outcome:
          type: admit
    default_outcome:
      type: exclude
"#,
        )
        .unwrap();

        let err = PolicyEngine::new(config).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidPattern { .. }));
        assert!(err.to_string().contains("bad_pattern"));
    }

    #[test]
    fn mask_policy_with_row_outcome_rejected() {
        let config = load_policy_from_str(
            r#"
version: "1.0"
policies:
  - name: confused
    kind: mask
    rules:
      - predicate:
          roles: [admin]
        outcome:
          type: admit
    default_outcome:
      type: redact
"#,
        )
        .unwrap();

        let err = PolicyEngine::new(config).unwrap_err();
        assert!(matches!(err, PolicyError::KindMismatch { .. }));
    }

    #[test]
    fn mask_policy_with_discriminant_predicate_rejected() {
        let config = load_policy_from_str(
            r#"
version: "1.0"
policies:
  - name: confused
    kind: mask
    rules:
      - predicate:
          discriminant: "US-*"
        outcome:
          type: passthrough
    default_outcome:
      type: redact
"#,
        )
        .unwrap();

        let err = PolicyEngine::new(config).unwrap_err();
        assert!(matches!(err, PolicyError::KindMismatch { .. }));
    }
}
