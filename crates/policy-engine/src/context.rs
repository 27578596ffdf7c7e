/// Identity of the caller a policy is evaluated for.
///
/// Constructed per request from session state and never mutated by the
/// evaluator.  The active role is always passed in explicitly; nothing in
/// this crate reads ambient session state.
#[derive(Debug, Clone)]
pub struct CallerContext {
    active_role: String,
    user: String,
    secondary_roles: Vec<String>,
}

impl CallerContext {
    /// Create a context with an active role and a user identity and no
    /// secondary roles.
    pub fn new(active_role: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            active_role: active_role.into(),
            user: user.into(),
            secondary_roles: Vec::new(),
        }
    }

    /// Attach secondary roles, consuming and returning `self` for
    /// builder-style usage.
    ///
    /// Secondary roles only participate in role predicates for policies that
    /// set `match_secondary_roles`; the default is active-role-only matching.
    pub fn with_secondary_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secondary_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn active_role(&self) -> &str {
        &self.active_role
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn secondary_roles(&self) -> &[String] {
        &self.secondary_roles
    }

    /// Whether the context holds `role`.  Roles compare case-insensitively;
    /// secondary roles are consulted only when `include_secondary` is set.
    pub(crate) fn holds_role(&self, role: &str, include_secondary: bool) -> bool {
        if self.active_role.eq_ignore_ascii_case(role) {
            return true;
        }
        include_secondary
            && self
                .secondary_roles
                .iter()
                .any(|r| r.eq_ignore_ascii_case(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_active_role_case_insensitively() {
        let ctx = CallerContext::new("ANALYST", "jdoe");
        assert!(ctx.holds_role("analyst", false));
        assert!(ctx.holds_role("Analyst", false));
        assert!(!ctx.holds_role("admin", false));
    }

    #[test]
    fn secondary_roles_require_opt_in() {
        let ctx = CallerContext::new("viewer", "jdoe").with_secondary_roles(["compliance"]);

        // Without opt-in, only the active role counts.
        assert!(!ctx.holds_role("compliance", false));
        // With opt-in, secondary roles widen the match.
        assert!(ctx.holds_role("compliance", true));
        assert!(ctx.holds_role("viewer", true));
    }

    #[test]
    fn context_is_not_mutated_by_accessors() {
        let ctx = CallerContext::new("admin", "root").with_secondary_roles(["ops", "dba"]);
        assert_eq!(ctx.active_role(), "admin");
        assert_eq!(ctx.user(), "root");
        assert_eq!(ctx.secondary_roles(), &["ops", "dba"]);
    }
}
