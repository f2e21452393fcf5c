//! IAM-token ingestion: parse externally issued privilege strings, reduce
//! them to one grant per project, and apply the result in one transaction.
//!
//! A privilege string is `<tenantKey>_<tool>_<projectLower>_<roleLetter>`,
//! exactly four underscore-separated fields. Project names containing `_`
//! are unrepresentable in this format; the parser stays strict rather than
//! guessing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use role_model_sdk::Role;
use sea_orm::{ConnectionTrait, TransactionTrait};
use serde::Deserialize;

use crate::domain::audit::{AuditActor, AuditEvent, AuditEventKind, AuditSink};
use crate::domain::error::DomainError;
use crate::domain::grants::GrantService;
use crate::infra::storage::DirectoryRepository;

/// One parsed privilege string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IamPrivilege {
    pub tenant_key: String,
    pub tool: String,
    pub project: String,
    pub role: Role,
}

/// Parse a raw privilege string.
///
/// # Errors
///
/// Returns [`DomainError::InvalidInput`] unless the string has exactly four
/// non-empty fields and the role letter is one of `a`, `x`, `w`, `r`.
pub fn parse_privilege(raw: &str) -> Result<IamPrivilege, DomainError> {
    let parts: Vec<&str> = raw.split('_').collect();
    let [tenant_key, tool, project, letter] = parts.as_slice() else {
        return Err(DomainError::invalid_input(format!(
            "malformed privilege string '{raw}': expected 4 fields"
        )));
    };
    if tenant_key.is_empty() || tool.is_empty() || project.is_empty() {
        return Err(DomainError::invalid_input(format!(
            "malformed privilege string '{raw}': empty field"
        )));
    }
    let role = match *letter {
        "a" => Role::Owner,
        "x" => Role::Manager,
        "w" => Role::Writer,
        "r" => Role::Reader,
        other => {
            return Err(DomainError::invalid_input(format!(
                "unknown role letter '{other}' in privilege string '{raw}'"
            )));
        }
    };
    Ok(IamPrivilege {
        tenant_key: (*tenant_key).to_owned(),
        tool: (*tool).to_owned(),
        project: (*project).to_owned(),
        role,
    })
}

/// One element of the `Ws-Privileges` header payload.
#[derive(Debug, Clone, Deserialize)]
pub struct WsPrivilegeEntry {
    pub organization: String,
    #[serde(rename = "rolesMapping", default)]
    pub roles_mapping: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct WsPrivilegesPayload {
    #[serde(rename = "Ws-Privileges", default)]
    ws_privileges: Vec<WsPrivilegeEntry>,
}

/// Parse the JSON header payload carrying the privilege bundles.
///
/// # Errors
///
/// Returns [`DomainError::InvalidInput`] on malformed JSON.
pub fn parse_ws_privileges(json: &str) -> Result<Vec<WsPrivilegeEntry>, DomainError> {
    let payload: WsPrivilegesPayload = serde_json::from_str(json)
        .map_err(|e| DomainError::invalid_input(format!("invalid Ws-Privileges payload: {e}")))?;
    Ok(payload.ws_privileges)
}

#[derive(Clone)]
pub struct IamIngestor {
    grants: GrantService,
    directory: DirectoryRepository,
    audit: Arc<dyn AuditSink>,
    tool_name: String,
}

impl IamIngestor {
    #[must_use]
    pub fn new(grants: GrantService, audit: Arc<dyn AuditSink>, tool_name: String) -> Self {
        Self {
            grants,
            directory: DirectoryRepository::new(),
            audit,
            tool_name,
        }
    }

    /// Apply a token's privilege bundles for one user.
    ///
    /// The tenant is selected by the token's tenant name; entries keyed by a
    /// different `orgKey`, privileges for another tool, and projects with no
    /// matching active organization are dropped. Per project the maximum
    /// privilege wins (lowest role rank). Existing grants of the user in the
    /// tenant are removed first; conflicts that only signal a no-op are
    /// skipped.
    pub async fn apply_token<C>(
        &self,
        db: &C,
        actor: &AuditActor,
        user_id: i64,
        tenant_name: &str,
        entries: &[WsPrivilegeEntry],
    ) -> Result<(), DomainError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        if user_id <= 0 {
            return Err(DomainError::invalid_input("user id must be positive"));
        }
        let tenant = self
            .directory
            .tenant_by_name(db, tenant_name)
            .await?
            .ok_or_else(|| DomainError::tenant_not_found(tenant_name))?;

        let mut best: HashMap<String, Role> = HashMap::new();
        for entry in entries {
            if entry.organization != tenant.org_key {
                continue;
            }
            for raw in entry.roles_mapping.values().flatten() {
                let privilege = parse_privilege(raw)?;
                if privilege.tool != self.tool_name {
                    continue;
                }
                if privilege.tenant_key != tenant.org_key {
                    tracing::warn!(
                        privilege = %raw,
                        org_key = %tenant.org_key,
                        "privilege tenant key does not match the token tenant, dropped"
                    );
                    continue;
                }
                let project = privilege.project.to_lowercase();
                match best.get(&project) {
                    Some(current) if current.builtin_rank() <= privilege.role.builtin_rank() => {}
                    _ => {
                        best.insert(project, privilege.role);
                    }
                }
            }
        }

        let projects: Vec<String> = best.keys().cloned().collect();
        let orgs = self
            .directory
            .active_orgs_by_lower_names(db, &projects)
            .await?;
        // A token whose privileges all point at unknown projects must not
        // touch the grants the user already holds.
        if orgs.is_empty() && !best.is_empty() {
            return Err(DomainError::organization_not_found(projects.join(", ")));
        }
        let org_by_name: HashMap<&str, i64> =
            orgs.iter().map(|o| (o.lower_name.as_str(), o.id)).collect();
        for project in &projects {
            if !org_by_name.contains_key(project.as_str()) {
                tracing::warn!(project = %project, "no active organization for privilege, dropped");
            }
        }

        let txn = db.begin().await?;
        self.grants
            .remove_privileges_by_user_tenant_tx(&txn, user_id, &tenant.id)
            .await?;

        let mut applied = 0usize;
        for (project, role) in &best {
            let Some(org_id) = org_by_name.get(project.as_str()) else {
                continue;
            };
            match self
                .grants
                .grant_role_tx(&txn, user_id, &tenant.id, *org_id, role)
                .await
            {
                Ok(()) => applied += 1,
                Err(e) if e.is_benign_grant_conflict() => {
                    tracing::debug!(user_id, org_id, error = %e, "grant skipped");
                }
                Err(e) => return Err(e),
            }
        }
        txn.commit().await?;

        self.audit.emit(
            &AuditEvent::success(AuditEventKind::RoleGranted, actor)
                .with_param("user_id", user_id)
                .with_param("tenant_id", &tenant.id)
                .with_param("grants_applied", applied)
                .with_param("source", "iam"),
        );
        Ok(())
    }
}
