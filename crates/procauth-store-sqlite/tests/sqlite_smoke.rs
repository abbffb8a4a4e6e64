use chrono::{Duration, Utc};
use procauth_storage::{
    CatalogStore, CreatePermissionParams, CreateRoleParams, GrantKind, GrantStore,
    PermissionFilter, PermissionId, ProcessDirectory, RoleStore, StageDirectory, StoreError,
    SubjectSnapshots, UpdateRoleParams, UpsertGrantParams, UserDirectory, UserId,
};
use procauth_store_sqlite::SqliteStore;

fn permission(resource: &str, action: &str) -> CreatePermissionParams {
    CreatePermissionParams {
        resource: resource.to_string(),
        action: action.to_string(),
        name: format!("{} {}", action, resource),
        description: None,
    }
}

fn capability(
    user_id: &UserId,
    permission_id: &PermissionId,
    process_id: &procauth_storage::ProcessId,
    granted_by: &UserId,
) -> UpsertGrantParams {
    UpsertGrantParams {
        user_id: user_id.clone(),
        process_id: process_id.clone(),
        kind: GrantKind::Capability {
            permission_id: permission_id.clone(),
            stage_id: None,
        },
        granted_by: granted_by.clone(),
        expires_at: None,
    }
}

#[tokio::test]
async fn catalog_rejects_duplicate_resource_action() {
    let s = SqliteStore::open_in_memory().await.unwrap();

    let created = s.create_permission(&permission("ticket", "read")).await.unwrap();
    let err = s
        .create_permission(&permission("ticket", "read"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists));

    let by_pair = s
        .get_permission_by_resource_action("ticket", "read")
        .await
        .unwrap();
    assert_eq!(by_pair.id, created.id);
    assert_eq!(s.get_permission(&created.id).await.unwrap(), created);
}

#[tokio::test]
async fn catalog_bulk_create_is_all_or_nothing() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    s.create_permission(&permission("ticket", "delete")).await.unwrap();

    let err = s
        .create_permissions(&[permission("ticket", "read"), permission("ticket", "delete")])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists));

    let all = s.list_permissions(&PermissionFilter::default()).await.unwrap();
    assert_eq!(all.len(), 1, "failed batch must not leave partial rows");

    let created = s
        .create_permissions(&[permission("stage", "move"), permission("ticket", "read")])
        .await
        .unwrap();
    assert_eq!(created.len(), 2);
}

#[tokio::test]
async fn catalog_list_filters_and_orders() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    for (r, a) in [("ticket", "update"), ("stage", "move"), ("ticket", "create")] {
        s.create_permission(&permission(r, a)).await.unwrap();
    }

    let all = s.list_permissions(&PermissionFilter::default()).await.unwrap();
    let keys: Vec<String> = all.iter().map(|p| p.key()).collect();
    assert_eq!(keys, vec!["stage:move", "ticket:create", "ticket:update"]);

    let tickets = s
        .list_permissions(&PermissionFilter::resource("ticket"))
        .await
        .unwrap();
    assert_eq!(tickets.len(), 2);

    let searched = s
        .list_permissions(&PermissionFilter {
            search: Some("MOVE".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].resource, "stage");
}

#[tokio::test]
async fn grant_upsert_is_idempotent_and_refreshes_provenance() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let p = s.create_permission(&permission("ticket", "read")).await.unwrap();
    let process = s.create_process("onboarding").await.unwrap();
    let user = UserId::new();
    let admin_a = UserId::new();
    let admin_b = UserId::new();

    let first = s
        .upsert_grant(&capability(&user, &p.id, &process.id, &admin_a))
        .await
        .unwrap();

    let expires = Utc::now() + Duration::days(7);
    let mut again = capability(&user, &p.id, &process.id, &admin_b);
    again.expires_at = Some(expires);
    let second = s.upsert_grant(&again).await.unwrap();

    assert_eq!(first.id, second.id, "same key must update in place");
    assert_eq!(second.granted_by, admin_b);
    assert_eq!(
        second.expires_at.map(|t| t.timestamp()),
        Some(expires.timestamp())
    );

    let rows = s.list_grants_for_user(&user).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn stage_membership_uses_sentinel_for_uniqueness() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let process = s.create_process("review").await.unwrap();
    let stage = s.create_stage(&process.id, "qa").await.unwrap();
    let user = UserId::new();

    let params = UpsertGrantParams {
        user_id: user.clone(),
        process_id: process.id.clone(),
        kind: GrantKind::StageMembership {
            stage_id: stage.id.clone(),
        },
        granted_by: user.clone(),
        expires_at: None,
    };
    let a = s.upsert_grant(&params).await.unwrap();
    let b = s.upsert_grant(&params).await.unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(a.kind, params.kind);

    assert_eq!(s.list_grants_for_process(&process.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_grants_spans_stages_and_leaves_other_processes() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let p = s.create_permission(&permission("ticket", "read")).await.unwrap();
    let a = s.create_process("a").await.unwrap();
    let b = s.create_process("b").await.unwrap();
    let stage = s.create_stage(&a.id, "triage").await.unwrap();
    let user = UserId::new();

    s.upsert_grant(&capability(&user, &p.id, &a.id, &user)).await.unwrap();
    let mut staged = capability(&user, &p.id, &a.id, &user);
    staged.kind = GrantKind::Capability {
        permission_id: p.id.clone(),
        stage_id: Some(stage.id.clone()),
    };
    s.upsert_grant(&staged).await.unwrap();
    s.upsert_grant(&capability(&user, &p.id, &b.id, &user)).await.unwrap();

    assert_eq!(s.count_grants(&user, &p.id, &a.id).await.unwrap(), 2);
    let processes = s.list_grant_processes(&user, &p.id).await.unwrap();
    assert_eq!(processes.len(), 2);

    assert_eq!(s.delete_grants(&user, &p.id, &a.id).await.unwrap(), 2);
    assert_eq!(s.count_grants(&user, &p.id, &a.id).await.unwrap(), 0);
    assert_eq!(s.list_grant_processes(&user, &p.id).await.unwrap(), vec![b.id.clone()]);

    // Nothing left to delete is a zero count, not an error.
    assert_eq!(s.delete_grants(&user, &p.id, &a.id).await.unwrap(), 0);
}

#[tokio::test]
async fn delete_grants_for_process_removes_every_kind() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let p1 = s.create_permission(&permission("ticket", "read")).await.unwrap();
    let p2 = s.create_permission(&permission("ticket", "update")).await.unwrap();
    let process = s.create_process("a").await.unwrap();
    let other = s.create_process("b").await.unwrap();
    let stage = s.create_stage(&process.id, "qa").await.unwrap();
    let user = UserId::new();

    s.upsert_grant(&capability(&user, &p1.id, &process.id, &user)).await.unwrap();
    s.upsert_grant(&capability(&user, &p2.id, &process.id, &user)).await.unwrap();
    s.upsert_grant(&UpsertGrantParams {
        user_id: user.clone(),
        process_id: process.id.clone(),
        kind: GrantKind::StageMembership { stage_id: stage.id },
        granted_by: user.clone(),
        expires_at: None,
    })
    .await
    .unwrap();
    s.upsert_grant(&capability(&user, &p1.id, &other.id, &user)).await.unwrap();

    assert_eq!(s.delete_grants_for_process(&process.id, &user).await.unwrap(), 3);
    let remaining = s.list_grants_for_user(&user).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].process_id, other.id);
}

#[tokio::test]
async fn snapshot_filters_expired_rows_but_keeps_them_stored() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let live = s.create_permission(&permission("ticket", "read")).await.unwrap();
    let stale = s.create_permission(&permission("ticket", "update")).await.unwrap();
    let process = s.create_process("a").await.unwrap();
    let user = UserId::new();
    s.upsert_user(&user, None, Some("Ana")).await.unwrap();

    s.upsert_grant(&capability(&user, &live.id, &process.id, &user)).await.unwrap();
    let mut expired = capability(&user, &stale.id, &process.id, &user);
    expired.expires_at = Some(Utc::now() - Duration::hours(1));
    s.upsert_grant(&expired).await.unwrap();

    let snapshot = s.load_subject(&user, Utc::now()).await.unwrap();
    assert_eq!(snapshot.grants.len(), 1);
    assert_eq!(snapshot.grants[0].kind.permission_id(), Some(&live.id));

    assert_eq!(s.list_grants_for_user(&user).await.unwrap().len(), 2);
}

#[tokio::test]
async fn snapshot_includes_role_permissions_only_for_active_roles() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let p = s.create_permission(&permission("ticket", "read")).await.unwrap();
    let role = s
        .create_role(
            &CreateRoleParams {
                name: "agent".into(),
                description: None,
                is_system_role: false,
            },
            &[p.id.clone()],
        )
        .await
        .unwrap();
    let user = UserId::new();
    s.upsert_user(&user, Some(&role.id), None).await.unwrap();

    let snapshot = s.load_subject(&user, Utc::now()).await.unwrap();
    assert_eq!(snapshot.role_id, Some(role.id.clone()));
    assert_eq!(snapshot.role_permission_ids, vec![p.id.clone()]);

    s.update_role(
        &role.id,
        &UpdateRoleParams {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let snapshot = s.load_subject(&user, Utc::now()).await.unwrap();
    assert!(snapshot.role_permission_ids.is_empty());

    // Unknown user: empty snapshot, not an error.
    let nobody = s.load_subject(&UserId::new(), Utc::now()).await.unwrap();
    assert!(nobody.role_id.is_none() && nobody.grants.is_empty());
}

#[tokio::test]
async fn role_links_and_copy() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let read = s.create_permission(&permission("ticket", "read")).await.unwrap();
    let update = s.create_permission(&permission("ticket", "update")).await.unwrap();
    let params = |name: &str| CreateRoleParams {
        name: name.into(),
        description: None,
        is_system_role: false,
    };
    let agent = s.create_role(&params("agent"), &[read.id.clone()]).await.unwrap();
    let lead = s.create_role(&params("lead"), &[]).await.unwrap();

    assert!(s.add_role_permission(&agent.id, &update.id).await.unwrap());
    assert!(!s.add_role_permission(&agent.id, &update.id).await.unwrap());

    let missing = s
        .add_role_permission(&agent.id, &PermissionId::new())
        .await
        .unwrap_err();
    assert!(matches!(missing, StoreError::NotFound));

    assert_eq!(s.copy_role_permissions(&agent.id, &lead.id).await.unwrap(), 2);
    assert_eq!(s.copy_role_permissions(&agent.id, &lead.id).await.unwrap(), 0);
    assert_eq!(s.list_role_permissions(&lead.id).await.unwrap().len(), 2);

    assert!(s.remove_role_permission(&lead.id, &read.id).await.unwrap());
    assert!(!s.remove_role_permission(&lead.id, &read.id).await.unwrap());

    s.set_role_permissions(&lead.id, &[read.id.clone()]).await.unwrap();
    let lead_perms = s.list_role_permissions(&lead.id).await.unwrap();
    assert_eq!(lead_perms.len(), 1);
    assert_eq!(lead_perms[0].id, read.id);

    let dup = s.create_role(&params("agent"), &[]).await.unwrap_err();
    assert!(matches!(dup, StoreError::AlreadyExists));
    assert_eq!(s.get_role_by_name("lead").await.unwrap().id, lead.id);
    assert_eq!(s.list_roles().await.unwrap().len(), 2);
}

#[tokio::test]
async fn deleting_a_role_leaves_users_without_role() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let role = s
        .create_role(
            &CreateRoleParams {
                name: "temp".into(),
                description: None,
                is_system_role: false,
            },
            &[],
        )
        .await
        .unwrap();
    let user = UserId::new();
    s.upsert_user(&user, Some(&role.id), None).await.unwrap();

    s.delete_role(&role.id).await.unwrap();
    assert_eq!(s.get_user_role_id(&user).await.unwrap(), None);
    assert!(matches!(
        s.delete_role(&role.id).await.unwrap_err(),
        StoreError::NotFound
    ));
}

#[tokio::test]
async fn directory_soft_deletes() {
    let s = SqliteStore::open_in_memory().await.unwrap();
    let process = s.create_process("a").await.unwrap();
    let stage = s.create_stage(&process.id, "s1").await.unwrap();

    assert!(s.process_exists(&process.id, false).await.unwrap());
    assert!(s.stage_exists(&stage.id).await.unwrap());
    assert_eq!(s.get_stage_process_id(&stage.id).await.unwrap(), process.id);

    s.soft_delete_stage(&stage.id).await.unwrap();
    assert!(!s.stage_exists(&stage.id).await.unwrap());

    s.soft_delete_process(&process.id).await.unwrap();
    assert!(!s.process_exists(&process.id, false).await.unwrap());
    assert!(s.process_exists(&process.id, true).await.unwrap());
    assert!(s.get_process(&process.id).await.unwrap().is_deleted());

    let err = s.create_stage(&process.id, "late").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound));

    assert!(!s.user_exists(&UserId::new()).await.unwrap());
    assert!(matches!(
        s.set_user_role(&UserId::new(), None).await.unwrap_err(),
        StoreError::NotFound
    ));
}
