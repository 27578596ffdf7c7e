/// The outcome of evaluating a mask policy for one value.
#[derive(Debug, Clone)]
pub struct MaskDecision {
    /// The value to display, already transformed.
    pub value: String,
    /// Label (or positional name) of the rule that matched, if any.
    pub matched_rule: Option<String>,
    /// Human-readable reason explaining the decision.
    pub reason: String,
}

/// The outcome of evaluating a row access policy for one row.
#[derive(Debug, Clone)]
pub struct FilterDecision {
    /// Whether the row is visible to the caller.
    pub visible: bool,
    /// Label (or positional name) of the rule that matched, if any.
    pub matched_rule: Option<String>,
    /// Human-readable reason explaining the decision.
    pub reason: String,
}

impl MaskDecision {
    /// Convenience constructor for an unmodified value with no matching rule.
    pub fn passthrough(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            matched_rule: None,
            reason: reason.into(),
        }
    }
}

impl FilterDecision {
    /// Convenience constructor for an admitted row with no matching rule.
    pub fn admit_default(reason: impl Into<String>) -> Self {
        Self {
            visible: true,
            matched_rule: None,
            reason: reason.into(),
        }
    }

    /// Convenience constructor for an excluded row with no matching rule.
    pub fn exclude_default(reason: impl Into<String>) -> Self {
        Self {
            visible: false,
            matched_rule: None,
            reason: reason.into(),
        }
    }
}
