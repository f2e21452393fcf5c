//! Module wiring: constructs the shared vocabulary, the audit sink, and the
//! services, and runs migrations plus the startup bootstrap.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::RoleModelConfig;
use crate::domain::access::AccessService;
use crate::domain::apply::ApplyService;
use crate::domain::audit::{AuditSink, TracingAuditSink};
use crate::domain::bootstrap::Bootstrap;
use crate::domain::custom::CustomPrivilegeService;
use crate::domain::error::DomainError;
use crate::domain::grants::GrantService;
use crate::domain::iam::IamIngestor;
use crate::domain::privileges::PrivilegeQueryService;
use crate::domain::vocabulary::RoleRegistry;
use crate::infra::storage::migrations::Migrator;

#[derive(Clone)]
pub struct RoleModel {
    config: RoleModelConfig,
    registry: Arc<RoleRegistry>,
    access: AccessService,
    grants: GrantService,
    custom: CustomPrivilegeService,
    privileges: PrivilegeQueryService,
    iam: IamIngestor,
    apply: ApplyService,
}

impl RoleModel {
    #[must_use]
    pub fn new(config: RoleModelConfig) -> Self {
        Self::with_audit(config, Arc::new(TracingAuditSink))
    }

    #[must_use]
    pub fn with_audit(config: RoleModelConfig, audit: Arc<dyn AuditSink>) -> Self {
        let registry = Arc::new(RoleRegistry::new());
        let grants = GrantService::new(
            registry.clone(),
            audit.clone(),
            config.multi_tenant_enabled,
        );
        let access = AccessService::new(config.admin_can_merge_without_checks);
        let custom = CustomPrivilegeService::new(audit.clone());
        let privileges = PrivilegeQueryService::new(registry.clone());
        let iam = IamIngestor::new(grants.clone(), audit.clone(), config.iam_tool_name.clone());
        let apply = ApplyService::new(grants.clone(), registry.clone(), audit);
        Self {
            config,
            registry,
            access,
            grants,
            custom,
            privileges,
            iam,
            apply,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.tenant_with_role_model_enabled
    }

    /// Run migrations and the startup bootstrap. A no-op when the subsystem
    /// is disabled.
    pub async fn init(&self, db: &DatabaseConnection) -> Result<(), DomainError> {
        if !self.enabled() {
            info!("role model is disabled, skipping initialization");
            return Ok(());
        }
        Migrator::up(db, None).await?;
        Bootstrap::new(self.registry.clone(), self.config.clone())
            .run(db)
            .await
    }

    #[must_use]
    pub fn config(&self) -> &RoleModelConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<RoleRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn access(&self) -> &AccessService {
        &self.access
    }

    #[must_use]
    pub fn grants(&self) -> &GrantService {
        &self.grants
    }

    #[must_use]
    pub fn custom_privileges(&self) -> &CustomPrivilegeService {
        &self.custom
    }

    #[must_use]
    pub fn privileges(&self) -> &PrivilegeQueryService {
        &self.privileges
    }

    #[must_use]
    pub fn iam(&self) -> &IamIngestor {
        &self.iam
    }

    #[must_use]
    pub fn apply(&self) -> &ApplyService {
        &self.apply
    }
}
