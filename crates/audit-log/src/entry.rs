use serde::{Deserialize, Serialize};

/// A single audit log entry recording one event in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: uuid::Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event_type: AuditEventType,
    pub source: AuditSource,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationRecord>,
}

impl AuditEntry {
    /// Create a new `AuditEntry` with an auto-generated UUID v4 and the
    /// current UTC timestamp.  The caller supplies the event type, source,
    /// and free-form details JSON value; `evaluation` defaults to `None`.
    pub fn new(
        event_type: AuditEventType,
        source: AuditSource,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            event_type,
            source,
            details,
            evaluation: None,
        }
    }

    /// Attach an evaluation record to this entry, consuming and returning
    /// `self` for builder-style usage.
    pub fn with_evaluation(mut self, record: EvaluationRecord) -> Self {
        self.evaluation = Some(record);
        self
    }
}

/// The category of audit event being recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    PolicyLoaded,
    MaskEvaluated,
    RowFilterEvaluated,
    CellEvaluated,
    ValidationFailed,
    ProcessStarted,
    ProcessStopped,
    ConfigChanged,
}

/// Identifies the component and optional data-object context for the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSource {
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller_role: Option<String>,
}

impl AuditSource {
    /// Convenience constructor that only requires the component name.  All
    /// optional fields default to `None`.
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            table: None,
            column: None,
            caller_role: None,
        }
    }

    /// Attach the caller's active role.
    pub fn with_caller_role(mut self, role: impl Into<String>) -> Self {
        self.caller_role = Some(role.into());
        self
    }

    /// Attach the table (and optionally column) the event concerns.
    pub fn with_target(mut self, table: impl Into<String>, column: Option<String>) -> Self {
        self.table = Some(table.into());
        self.column = column;
        self
    }
}

/// Records the outcome of a policy evaluation attached to an audit event.
///
/// Raw values never appear here; only the policy name, the matched rule, and
/// the shape of the outcome are recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub policy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
    pub outcome: String,
}
