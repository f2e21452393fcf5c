//! End-to-end tests over an in-memory `SQLite` database: bootstrap, grant
//! lifecycle, both enforcer tracks, custom privileges, IAM ingestion, and
//! the batch apply pipeline.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;

use role_model_sdk::{
    Action, CustomPrivilege, OrgAccessRequest, RepoAccessRequest, Role,
};
use sea_orm::{DatabaseConnection, EntityTrait};
use tokio_util::sync::CancellationToken;

use crate::domain::apply::{PrivilegeAssignment, UserPrivilegeChange};
use crate::domain::audit::AuditActor;
use crate::domain::error::DomainError;
use crate::domain::iam::WsPrivilegeEntry;
use crate::infra::storage::entity::{repo_privilege, role_grant, team_bundle};
use crate::infra::storage::{CustomPolicyRepository, DirectoryRepository, OWNERS_TEAM};
use crate::module::RoleModel;
use crate::test_support::{
    bootstrapped_module, config_with_groups, enabled_config, seed_org, seed_team,
    seed_team_member, seed_tenant, seed_user, seed_user_with_flags,
};

fn actor() -> AuditActor {
    AuditActor::new("test", "127.0.0.1")
}

fn org_request(doer: i64, tenant: &str, org: i64, action: Action) -> OrgAccessRequest {
    OrgAccessRequest {
        doer_id: doer,
        target_tenant_id: tenant.to_owned(),
        target_org_id: org,
        action,
    }
}

fn repo_request(doer: i64, org: i64, repo: i64, privilege: CustomPrivilege) -> RepoAccessRequest {
    RepoAccessRequest {
        doer_id: doer,
        org_id: org,
        repo_id: repo,
        target_tenant_id: "t1".to_owned(),
        custom_privilege: privilege,
        team: None,
    }
}

async fn seed_basic(db: &DatabaseConnection) {
    seed_tenant(db, "t1", "Tenant One", "t1key", true).await;
    seed_tenant(db, "t2", "Tenant Two", "t2key", false).await;
    seed_org(db, 345, "Project", "t1").await;
    seed_user(db, 123, "alice").await;
}

#[tokio::test]
async fn owner_grant_allows_own_and_write_in_the_granted_tenant_only() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;

    module
        .grants()
        .grant_role(&db, &actor(), 123, "t1", 345, &Role::Owner)
        .await
        .unwrap();

    let access = module.access();
    assert!(access
        .is_access_granted(&db, &org_request(123, "t1", 345, Action::Write))
        .await
        .unwrap());
    assert!(access
        .is_access_granted(&db, &org_request(123, "t1", 345, Action::Own))
        .await
        .unwrap());
    assert!(!access
        .is_access_granted(&db, &org_request(123, "t2", 345, Action::Write))
        .await
        .unwrap());
}

#[tokio::test]
async fn reader_gets_read_but_not_write() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;

    module
        .grants()
        .grant_role(&db, &actor(), 123, "t1", 345, &Role::Reader)
        .await
        .unwrap();

    let access = module.access();
    assert!(!access
        .is_access_granted(&db, &org_request(123, "t1", 345, Action::Write))
        .await
        .unwrap());
    assert!(access
        .is_access_granted(&db, &org_request(123, "t1", 345, Action::Read))
        .await
        .unwrap());
}

#[tokio::test]
async fn inner_source_read_is_blocked_across_tenants() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;

    module
        .grants()
        .add_project_to_inner_source(&db, 345)
        .await
        .unwrap();

    let access = module.access();
    assert!(access
        .is_access_granted(&db, &org_request(123, "t1", 345, Action::Read))
        .await
        .unwrap());
    assert!(!access
        .is_access_granted(&db, &org_request(123, "t2", 345, Action::Read))
        .await
        .unwrap());
    // Inner source only covers read.
    assert!(!access
        .is_access_granted(&db, &org_request(123, "t1", 345, Action::Write))
        .await
        .unwrap());
}

#[tokio::test]
async fn technical_user_inherits_the_owner_action_set_everywhere() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;
    seed_user(&db, 9, "robot").await;

    module
        .grants()
        .grant_technical_user(&db, &actor(), 9)
        .await
        .unwrap();

    let access = module.access();
    for action in [Action::Own, Action::Write, Action::MergeWithoutCheck] {
        assert!(
            access
                .is_access_granted(&db, &org_request(9, "t1", 345, action))
                .await
                .unwrap(),
            "{action}"
        );
    }
    assert!(module.privileges().is_technical_user(&db, 9).await.unwrap());
}

#[tokio::test]
async fn custom_privilege_is_granted_through_team_and_bundle() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;
    seed_user(&db, 7, "bob").await;

    module
        .custom_privileges()
        .add_user_to_team(&db, &actor(), 7, "t1", 345, "devs")
        .await
        .unwrap();
    module
        .custom_privileges()
        .assign_team_repo_privileges(&db, &actor(), "devs", 345, &[(1000, "vB_chB".to_owned())])
        .await
        .unwrap();

    let access = module.access();
    assert!(access
        .accesses_by_custom_privileges(&db, &repo_request(7, 345, 1000, CustomPrivilege::ChangeBranch))
        .await
        .unwrap());
    assert!(!access
        .accesses_by_custom_privileges(&db, &repo_request(7, 345, 1000, CustomPrivilege::MergePr))
        .await
        .unwrap());
    // A user outside the carrier team gets nothing.
    assert!(!access
        .accesses_by_custom_privileges(&db, &repo_request(123, 345, 1000, CustomPrivilege::ChangeBranch))
        .await
        .unwrap());
}

#[tokio::test]
async fn reassigning_a_bundle_merges_short_codes_into_one_row() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;

    let custom = module.custom_privileges();
    custom
        .assign_team_repo_privileges(&db, &actor(), "devs", 345, &[(1000, "vB_chB".to_owned())])
        .await
        .unwrap();
    custom
        .assign_team_repo_privileges(&db, &actor(), "devs", 345, &[(1000, "cPR".to_owned())])
        .await
        .unwrap();

    let rows = repo_privilege::Entity::find().all(&db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].bundle, "vB_chB_cPR");

    let repo = CustomPolicyRepository::new();
    let stored = repo
        .find_repo_privilege(&db, "devs", 345, 1000)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.bundle, "vB_chB_cPR");
}

#[tokio::test]
async fn iam_ingestion_keeps_the_maximum_privilege_per_project() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_tenant(&db, "tenant-rum", "rum", "rum", false).await;
    seed_org(&db, 700, "skey", "tenant-rum").await;
    seed_user(&db, 42, "carol").await;

    let entries = vec![WsPrivilegeEntry {
        organization: "rum".to_owned(),
        roles_mapping: BTreeMap::from([(
            "any".to_owned(),
            vec![
                "rum_sc_skey_w".to_owned(),
                "rum_sc_skey_x".to_owned(),
                "rum_sc_skey_a".to_owned(),
            ],
        )]),
    }];
    module
        .iam()
        .apply_token(&db, &actor(), 42, "rum", &entries)
        .await
        .unwrap();

    let rows = role_grant::Entity::find().all(&db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].role, "owner");
    assert_eq!(
        module
            .privileges()
            .role_for_user(&db, 42, 700, "tenant-rum")
            .await
            .unwrap(),
        Some(Role::Owner)
    );
}

#[tokio::test]
async fn iam_ingestion_fails_for_unknown_tenants_and_drops_other_tools() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_tenant(&db, "tenant-rum", "rum", "rum", false).await;
    seed_org(&db, 700, "skey", "tenant-rum").await;
    seed_user(&db, 42, "carol").await;

    let err = module
        .iam()
        .apply_token(&db, &actor(), 42, "nowhere", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::TenantNotFound { .. }));

    let entries = vec![WsPrivilegeEntry {
        organization: "rum".to_owned(),
        roles_mapping: BTreeMap::from([(
            "any".to_owned(),
            vec!["rum_othertool_skey_a".to_owned()],
        )]),
    }];
    module
        .iam()
        .apply_token(&db, &actor(), 42, "rum", &entries)
        .await
        .unwrap();
    assert!(role_grant::Entity::find().all(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn iam_ingestion_keeps_existing_grants_when_no_project_resolves() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_tenant(&db, "tenant-rum", "rum", "rum", false).await;
    seed_org(&db, 700, "skey", "tenant-rum").await;
    seed_user(&db, 42, "carol").await;

    let entries = vec![WsPrivilegeEntry {
        organization: "rum".to_owned(),
        roles_mapping: BTreeMap::from([("any".to_owned(), vec!["rum_sc_skey_a".to_owned()])]),
    }];
    module
        .iam()
        .apply_token(&db, &actor(), 42, "rum", &entries)
        .await
        .unwrap();
    assert_eq!(role_grant::Entity::find().all(&db).await.unwrap().len(), 1);

    // Every privilege points at an unknown project: the call fails and the
    // grant the user already holds survives.
    let entries = vec![WsPrivilegeEntry {
        organization: "rum".to_owned(),
        roles_mapping: BTreeMap::from([(
            "any".to_owned(),
            vec!["rum_sc_ghostproject_a".to_owned()],
        )]),
    }];
    let err = module
        .iam()
        .apply_token(&db, &actor(), 42, "rum", &entries)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::OrganizationNotFound { .. }));

    let rows = role_grant::Entity::find().all(&db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].role, "owner");
}

#[tokio::test]
async fn granting_the_same_role_twice_is_a_conflict_and_keeps_one_row() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;

    let grants = module.grants();
    grants
        .grant_role(&db, &actor(), 123, "t1", 345, &Role::Owner)
        .await
        .unwrap();
    let err = grants
        .grant_role(&db, &actor(), 123, "t1", 345, &Role::Owner)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::RoleAlreadyExists { .. }));
    assert_eq!(role_grant::Entity::find().all(&db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn granting_a_different_role_replaces_the_previous_one() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;

    let grants = module.grants();
    grants
        .grant_role(&db, &actor(), 123, "t1", 345, &Role::Writer)
        .await
        .unwrap();
    grants
        .grant_role(&db, &actor(), 123, "t1", 345, &Role::Reader)
        .await
        .unwrap();

    let rows = role_grant::Entity::find().all(&db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].role, "reader");
    assert_eq!(rows[0].tenant_id, "t1");
}

#[tokio::test]
async fn non_permanent_revoke_keeps_org_membership() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;

    module
        .grants()
        .grant_role(&db, &actor(), 123, "t1", 345, &Role::Owner)
        .await
        .unwrap();
    module
        .grants()
        .revoke_role(&db, &actor(), 123, "t1", 345, &Role::Owner, false)
        .await
        .unwrap();

    assert!(role_grant::Entity::find().all(&db).await.unwrap().is_empty());
    let directory = DirectoryRepository::new();
    let owners = directory.find_team(&db, 345, OWNERS_TEAM).await.unwrap().unwrap();
    assert!(directory.is_team_member(&db, owners.id, 123).await.unwrap());
}

#[tokio::test]
async fn permanent_revoke_refuses_to_remove_the_last_owner() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;
    seed_user(&db, 124, "dave").await;

    let grants = module.grants();
    grants
        .grant_role(&db, &actor(), 123, "t1", 345, &Role::Owner)
        .await
        .unwrap();
    let qa_team = seed_team(&db, 345, "qa").await;
    seed_team_member(&db, qa_team, 123).await;

    let err = grants
        .revoke_role(&db, &actor(), 123, "t1", 345, &Role::Owner, true)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::LastOwner { org_id: 345 }));
    // The rollback keeps the grant.
    assert_eq!(role_grant::Entity::find().all(&db).await.unwrap().len(), 1);

    // With a second owner the removal goes through and clears every team of
    // the organization.
    grants
        .grant_role(&db, &actor(), 124, "t1", 345, &Role::Owner)
        .await
        .unwrap();
    grants
        .revoke_role(&db, &actor(), 123, "t1", 345, &Role::Owner, true)
        .await
        .unwrap();
    let directory = DirectoryRepository::new();
    let owners = directory.find_team(&db, 345, OWNERS_TEAM).await.unwrap().unwrap();
    assert!(!directory.is_team_member(&db, owners.id, 123).await.unwrap());
    assert!(!directory.is_team_member(&db, qa_team, 123).await.unwrap());
}

#[tokio::test]
async fn configured_custom_groups_grant_their_bundled_actions() {
    let config = config_with_groups(&[("deployer", "Deployer", "read,write,viewBranch")]);
    let (module, db) = bootstrapped_module(config).await;
    seed_basic(&db).await;

    module
        .grants()
        .grant_role(&db, &actor(), 123, "t1", 345, &Role::Custom("deployer".to_owned()))
        .await
        .unwrap();

    let access = module.access();
    assert!(access
        .is_access_granted(&db, &org_request(123, "t1", 345, Action::Write))
        .await
        .unwrap());
    assert!(!access
        .is_access_granted(&db, &org_request(123, "t1", 345, Action::Own))
        .await
        .unwrap());
    assert_eq!(module.registry().rank_of("deployer"), Some(5));
}

#[tokio::test]
async fn group_update_with_assignees_must_not_shrink_the_privilege_set() {
    let config = config_with_groups(&[("deployer", "Deployer", "read,write")]);
    let (module, db) = bootstrapped_module(config).await;
    seed_basic(&db).await;
    module
        .grants()
        .grant_role(&db, &actor(), 123, "t1", 345, &Role::Custom("deployer".to_owned()))
        .await
        .unwrap();

    // Shrinking fails while the grant exists.
    let shrunk = RoleModel::new(config_with_groups(&[("deployer", "Deployer", "read")]));
    let err = shrunk.init(&db).await.unwrap_err();
    assert!(matches!(err, DomainError::PrivilegeSetShrinkForbidden { .. }));

    // Enlarging is fine.
    let grown = RoleModel::new(config_with_groups(&[(
        "deployer",
        "Deployer",
        "read,write,delete",
    )]));
    grown.init(&db).await.unwrap();
}

#[tokio::test]
async fn unconfigured_groups_are_pruned_only_when_empty() {
    let config = config_with_groups(&[("deployer", "Deployer", "read")]);
    let (module, db) = bootstrapped_module(config).await;
    seed_basic(&db).await;
    module
        .grants()
        .grant_role(&db, &actor(), 123, "t1", 345, &Role::Custom("deployer".to_owned()))
        .await
        .unwrap();

    let repo = CustomPolicyRepository::new();

    // Still referenced: the group survives a config without it.
    let without = RoleModel::new(config_with_groups(&[]));
    without.init(&db).await.unwrap();
    assert!(repo.find_group(&db, "deployer").await.unwrap().is_some());

    // Revoke, then the next reconciliation prunes it.
    module
        .grants()
        .revoke_role(&db, &actor(), 123, "t1", 345, &Role::Custom("deployer".to_owned()), false)
        .await
        .unwrap();
    let without = RoleModel::new(config_with_groups(&[]));
    without.init(&db).await.unwrap();
    assert!(repo.find_group(&db, "deployer").await.unwrap().is_none());
}

#[tokio::test]
async fn bundles_shared_across_repositories_survive_a_merge_on_one_of_them() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;
    seed_user(&db, 7, "bob").await;

    let custom = module.custom_privileges();
    custom
        .add_user_to_team(&db, &actor(), 7, "t1", 345, "devs")
        .await
        .unwrap();
    custom
        .assign_team_repo_privileges(
            &db,
            &actor(),
            "devs",
            345,
            &[(1000, "vB".to_owned()), (1001, "vB".to_owned())],
        )
        .await
        .unwrap();

    // Merging on repository 1000 must not strip the grouping row repository
    // 1001 still relies on.
    custom
        .assign_team_repo_privileges(&db, &actor(), "devs", 345, &[(1000, "cPR".to_owned())])
        .await
        .unwrap();

    let access = module.access();
    assert!(access
        .accesses_by_custom_privileges(&db, &repo_request(7, 345, 1001, CustomPrivilege::ViewBranch))
        .await
        .unwrap());
    assert!(access
        .accesses_by_custom_privileges(&db, &repo_request(7, 345, 1000, CustomPrivilege::CreatePr))
        .await
        .unwrap());
    assert!(access
        .accesses_by_custom_privileges(&db, &repo_request(7, 345, 1000, CustomPrivilege::ViewBranch))
        .await
        .unwrap());

    let bundles: Vec<String> = team_bundle::Entity::find()
        .all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.bundle)
        .collect();
    assert!(bundles.contains(&"vB".to_owned()));
    assert!(bundles.contains(&"vB_cPR".to_owned()));
}

#[tokio::test]
async fn repository_rows_without_a_carried_bundle_grant_nothing() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;
    seed_user(&db, 7, "bob").await;

    module
        .custom_privileges()
        .add_user_to_team(&db, &actor(), 7, "t1", 345, "devs")
        .await
        .unwrap();
    // A repository row whose bundle the team no longer carries is inert.
    let repo = CustomPolicyRepository::new();
    repo.insert_repo_privilege(&db, "devs", 345, 1000, "vB")
        .await
        .unwrap();

    assert!(!module
        .access()
        .accesses_by_custom_privileges(&db, &repo_request(7, 345, 1000, CustomPrivilege::ViewBranch))
        .await
        .unwrap());
}

#[tokio::test]
async fn team_bundles_cannot_be_removed_while_users_depend_on_them() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;
    seed_user(&db, 7, "bob").await;

    let custom = module.custom_privileges();
    custom
        .add_user_to_team(&db, &actor(), 7, "t1", 345, "devs")
        .await
        .unwrap();
    custom
        .assign_team_repo_privileges(&db, &actor(), "devs", 345, &[(1000, "vB".to_owned())])
        .await
        .unwrap();

    let err = custom
        .remove_team_custom_privileges(&db, &actor(), "devs")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::GroupNotEmpty { .. }));

    custom
        .remove_user_from_team(&db, &actor(), 7, "t1", 345, "devs")
        .await
        .unwrap();
    custom
        .remove_team_custom_privileges(&db, &actor(), "devs")
        .await
        .unwrap();
    assert!(repo_privilege::Entity::find().all(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn tenant_cascade_removes_grants_and_bundles_and_honors_cancellation() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;
    seed_user(&db, 124, "dave").await;

    let grants = module.grants();
    grants
        .grant_role(&db, &actor(), 123, "t1", 345, &Role::Owner)
        .await
        .unwrap();
    grants
        .grant_role(&db, &actor(), 124, "t1", 345, &Role::Reader)
        .await
        .unwrap();
    module
        .custom_privileges()
        .assign_team_repo_privileges(&db, &actor(), "devs", 345, &[(1000, "vB".to_owned())])
        .await
        .unwrap();

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let err = grants
        .remove_privileges_by_tenant(&db, &actor(), "t1", &cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Cancelled));
    assert_eq!(role_grant::Entity::find().all(&db).await.unwrap().len(), 2);

    grants
        .remove_privileges_by_tenant(&db, &actor(), "t1", &CancellationToken::new())
        .await
        .unwrap();
    assert!(role_grant::Entity::find().all(&db).await.unwrap().is_empty());
    assert!(repo_privilege::Entity::find().all(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn user_tenants_resolve_through_grants_membership_and_default() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;
    seed_user(&db, 50, "erin").await;

    let privileges = module.privileges();

    // No grants anywhere: the default tenant substitutes.
    assert_eq!(
        privileges.user_tenant_id(&db, 50).await.unwrap(),
        Some("t1".to_owned())
    );
    assert_eq!(
        privileges.user_tenant_ids_or_default(&db, 50).await.unwrap(),
        vec!["t1".to_owned()]
    );

    module
        .grants()
        .grant_role(&db, &actor(), 50, "t1", 345, &Role::Reader)
        .await
        .unwrap();
    assert_eq!(
        privileges.user_tenant_id(&db, 50).await.unwrap(),
        Some("t1".to_owned())
    );
    // Membership added by the grant also resolves through the org link.
    assert_eq!(
        privileges.user_tenant_ids_or_default(&db, 50).await.unwrap(),
        vec!["t1".to_owned()]
    );
}

#[tokio::test]
async fn assignment_candidates_exclude_granted_technical_and_foreign_users() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;
    seed_user(&db, 60, "frank").await;
    seed_user(&db, 61, "frida").await;
    seed_user(&db, 62, "frodo").await;

    let grants = module.grants();
    grants
        .grant_role(&db, &actor(), 60, "t1", 345, &Role::Owner)
        .await
        .unwrap();
    grants.grant_technical_user(&db, &actor(), 62).await.unwrap();

    let candidates = module
        .privileges()
        .users_for_assignment(&db, "fr", 345, "t1")
        .await
        .unwrap();
    let logins: Vec<&str> = candidates.iter().map(|u| u.login.as_str()).collect();
    assert_eq!(logins, vec!["frida"]);
}

#[tokio::test]
async fn enriched_privileges_resolve_directory_entries() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;

    module
        .grants()
        .grant_role(&db, &actor(), 123, "t1", 345, &Role::Manager)
        .await
        .unwrap();

    let enriched = module.privileges().privileges_by_org(&db, 345).await.unwrap();
    assert_eq!(enriched.len(), 1);
    assert_eq!(enriched[0].user.login, "alice");
    assert_eq!(enriched[0].org.name, "Project");
    assert_eq!(enriched[0].role, Role::Manager);
    assert_eq!(enriched[0].tenant_id, "t1");

    let actions = module
        .privileges()
        .actions_for_role(&db, &Role::Manager)
        .await
        .unwrap();
    assert!(actions.contains(&Action::EditProject));
    assert!(actions.contains(&Action::ManageComments));
    assert!(!actions.contains(&Action::Own));
    assert!(!actions.contains(&Action::MergeWithoutCheck));
}

#[tokio::test]
async fn batch_apply_grants_and_revokes_per_user_with_error_accumulation() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;
    seed_user(&db, 80, "gail").await;

    let changes = vec![UserPrivilegeChange {
        user_id: 80,
        grant: vec![
            PrivilegeAssignment {
                tenant_key: "t1key".to_owned(),
                project_key: "Project".to_owned(),
                group_code: "owner".to_owned(),
            },
            PrivilegeAssignment {
                tenant_key: "t1key".to_owned(),
                project_key: "missing".to_owned(),
                group_code: "owner".to_owned(),
            },
        ],
        revoke: Vec::new(),
    }];
    let outcomes = module.apply().apply(&db, &actor(), &changes).await.unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].applied, 1);
    assert_eq!(outcomes[0].errors.len(), 1);
    assert_eq!(
        module
            .privileges()
            .role_for_user(&db, 80, 345, "t1")
            .await
            .unwrap(),
        Some(Role::Owner)
    );

    // A second owner keeps the revoke clear of the last-owner guard.
    module
        .grants()
        .grant_role(&db, &actor(), 123, "t1", 345, &Role::Owner)
        .await
        .unwrap();
    let changes = vec![UserPrivilegeChange {
        user_id: 80,
        grant: Vec::new(),
        revoke: vec![PrivilegeAssignment {
            tenant_key: "t1key".to_owned(),
            project_key: "Project".to_owned(),
            group_code: "owner".to_owned(),
        }],
    }];
    let outcomes = module.apply().apply(&db, &actor(), &changes).await.unwrap();
    assert_eq!(outcomes[0].applied, 1);
    assert!(outcomes[0].errors.is_empty());
    assert_eq!(
        module
            .privileges()
            .role_for_user(&db, 80, 345, "t1")
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn admins_bypass_merge_without_check_when_enabled() {
    let mut config = enabled_config();
    config.admin_can_merge_without_checks = true;
    let (module, db) = bootstrapped_module(config).await;
    seed_basic(&db).await;
    seed_user_with_flags(&db, 90, "root", true).await;

    let access = module.access();
    assert!(access
        .is_access_granted(&db, &org_request(90, "t1", 345, Action::MergeWithoutCheck))
        .await
        .unwrap());
    // The bypass is scoped to that one action.
    assert!(!access
        .is_access_granted(&db, &org_request(90, "t1", 345, Action::Write))
        .await
        .unwrap());
    // Non-admins still need a role.
    assert!(!access
        .is_access_granted(&db, &org_request(123, "t1", 345, Action::MergeWithoutCheck))
        .await
        .unwrap());
}

#[tokio::test]
async fn enforcer_rejects_malformed_requests() {
    let (module, db) = bootstrapped_module(enabled_config()).await;
    seed_basic(&db).await;

    let err = module
        .access()
        .is_access_granted(&db, &org_request(0, "t1", 345, Action::Read))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidInput { .. }));

    let err = module
        .access()
        .is_access_granted(&db, &org_request(123, "", 345, Action::Read))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidInput { .. }));
}
