//! Authorization facade consumed by callers.

use role_model_sdk::{Action, OrgAccessRequest, RepoAccessRequest, UserAccessRequest, Visibility};
use sea_orm::ConnectionTrait;

use crate::domain::enforcer::Enforcer;
use crate::domain::error::DomainError;
use crate::infra::storage::DirectoryRepository;

#[derive(Clone, Copy)]
pub struct AccessService {
    enforcer: Enforcer,
    directory: DirectoryRepository,
    admin_can_merge_without_checks: bool,
}

impl AccessService {
    #[must_use]
    pub fn new(admin_can_merge_without_checks: bool) -> Self {
        Self {
            enforcer: Enforcer::new(),
            directory: DirectoryRepository::new(),
            admin_can_merge_without_checks,
        }
    }

    /// Org-level check. Administrators bypass the `mergeWithoutCheck` action
    /// when the corresponding flag is enabled; every other action goes
    /// through the matcher tracks.
    pub async fn is_access_granted<C: ConnectionTrait>(
        &self,
        conn: &C,
        request: &OrgAccessRequest,
    ) -> Result<bool, DomainError> {
        if request.action == Action::MergeWithoutCheck
            && self.admin_can_merge_without_checks
            && let Some(doer) = self.directory.user_by_id(conn, request.doer_id).await?
            && doer.is_admin
        {
            return Ok(true);
        }
        self.enforcer.is_access_granted(conn, request).await
    }

    pub async fn is_read_access_granted<C: ConnectionTrait>(
        &self,
        conn: &C,
        doer_id: i64,
        target_tenant_id: &str,
        target_org_id: i64,
    ) -> Result<bool, DomainError> {
        let request = OrgAccessRequest {
            doer_id,
            target_tenant_id: target_tenant_id.to_owned(),
            target_org_id,
            action: Action::Read,
        };
        self.is_access_granted(conn, &request).await
    }

    pub async fn accesses_by_custom_privileges<C: ConnectionTrait>(
        &self,
        conn: &C,
        request: &RepoAccessRequest,
    ) -> Result<bool, DomainError> {
        self.enforcer.is_custom_granted(conn, request).await
    }

    /// Profile-visibility predicate; never touches the policy store.
    #[must_use]
    pub fn is_user_read_access_granted(request: &UserAccessRequest) -> bool {
        match request.visibility {
            Visibility::Public => true,
            Visibility::Private => request.doer_id == request.target_user_id,
            Visibility::Limited => {
                request.doer_id == request.target_user_id
                    || request
                        .doer_tenant_ids
                        .iter()
                        .any(|t| request.target_tenant_ids.contains(t))
            }
        }
    }
}
