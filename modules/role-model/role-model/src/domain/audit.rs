//! Audit event emission.
//!
//! Events are emitted with a success or failure status rather than rolled
//! back with the operation; consumers must treat the stream as at-least-once.
//! Emission never alters the outcome of the operation that produced it.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEventKind {
    RoleGranted,
    RoleRevoked,
    TechnicalUserGranted,
    CustomPrivilegesAdded,
    CustomPrivilegesUpdated,
    CustomPrivilegesRemoved,
    TenantDeleted,
}

impl AuditEventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoleGranted => "RoleGranted",
            Self::RoleRevoked => "RoleRevoked",
            Self::TechnicalUserGranted => "TechnicalUserGranted",
            Self::CustomPrivilegesAdded => "CustomPrivilegesAdded",
            Self::CustomPrivilegesUpdated => "CustomPrivilegesUpdated",
            Self::CustomPrivilegesRemoved => "CustomPrivilegesRemoved",
            Self::TenantDeleted => "TenantDeleted",
        }
    }
}

/// Who performed the operation, for the audit trail.
#[derive(Debug, Clone)]
pub struct AuditActor {
    pub name: String,
    pub remote_addr: String,
}

impl AuditActor {
    #[must_use]
    pub fn new(name: impl Into<String>, remote_addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote_addr: remote_addr.into(),
        }
    }

    /// Actor for operations the process runs on its own behalf, such as the
    /// startup bootstrap or cascading revokes.
    #[must_use]
    pub fn system() -> Self {
        Self::new("system", "-")
    }
}

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub kind: AuditEventKind,
    pub actor: AuditActor,
    pub success: bool,
    pub params: BTreeMap<String, String>,
}

impl AuditEvent {
    #[must_use]
    pub fn success(kind: AuditEventKind, actor: &AuditActor) -> Self {
        Self {
            kind,
            actor: actor.clone(),
            success: true,
            params: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn failure(kind: AuditEventKind, actor: &AuditActor) -> Self {
        Self {
            success: false,
            ..Self::success(kind, actor)
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_owned(), value.to_string());
        self
    }
}

/// Narrow sink the services emit through. Implementations must not block
/// the calling operation; failures stay inside the sink.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: &AuditEvent);
}

/// Default sink: structured log records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: &AuditEvent) {
        if event.success {
            tracing::info!(
                event = event.kind.as_str(),
                actor = %event.actor.name,
                remote_addr = %event.actor.remote_addr,
                params = ?event.params,
                "audit"
            );
        } else {
            tracing::warn!(
                event = event.kind.as_str(),
                actor = %event.actor.name,
                remote_addr = %event.actor.remote_addr,
                params = ?event.params,
                "audit failure"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_carry_params() {
        let actor = AuditActor::new("alice", "10.0.0.1");
        let event = AuditEvent::success(AuditEventKind::RoleGranted, &actor)
            .with_param("user_id", 7)
            .with_param("role", "owner");
        assert!(event.success);
        assert_eq!(event.params["user_id"], "7");
        assert_eq!(event.params["role"], "owner");
    }

    #[test]
    fn failure_flips_status_only() {
        let actor = AuditActor::system();
        let event = AuditEvent::failure(AuditEventKind::TenantDeleted, &actor);
        assert!(!event.success);
        assert_eq!(event.kind.as_str(), "TenantDeleted");
    }
}
