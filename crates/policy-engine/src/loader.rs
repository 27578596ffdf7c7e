use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::schema::PolicyConfig;

/// Load a [`PolicyConfig`] from a YAML file on disk.
///
/// Performs structural validation after deserialization (version gate,
/// non-empty policy names).  Semantic validation — duplicate names, missing
/// default outcomes, kind agreement, pattern compilation — happens when the
/// engine is constructed, where it surfaces as a typed
/// [`PolicyError`](crate::PolicyError).
pub fn load_policy(path: impl AsRef<Path>) -> Result<PolicyConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read policy file: {}", path.display()))?;
    load_policy_from_str(&contents)
        .with_context(|| format!("failed to parse policy file: {}", path.display()))
}

/// Parse and structurally validate a [`PolicyConfig`] from a YAML string.
///
/// This is the primary entry point used in tests.
pub fn load_policy_from_str(yaml: &str) -> Result<PolicyConfig> {
    let config: PolicyConfig = serde_yml::from_str(yaml).context("YAML deserialization failed")?;
    validate(&config)?;
    Ok(config)
}

/// Run post-deserialization structural checks.
fn validate(config: &PolicyConfig) -> Result<()> {
    // Version gate
    if config.version != "1.0" {
        bail!(
            "unsupported policy version '{}'; only '1.0' is supported",
            config.version
        );
    }

    for policy in &config.policies {
        if policy.name.is_empty() {
            bail!("policy name must not be empty");
        }
    }

    for binding in &config.bindings {
        if binding.table.is_empty() {
            bail!("binding table must not be empty");
        }
        if binding.policy.is_empty() {
            bail!("binding must name a policy");
        }
    }

    Ok(())
}
