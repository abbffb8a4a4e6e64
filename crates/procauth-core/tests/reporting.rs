mod common;

use chrono::{Duration, Utc};
use common::fixture;
use procauth_core::{CreateRoleRequest, GrantRequest};
use procauth_storage::{ProcessId, UserId};

#[tokio::test]
async fn user_summary_for_user_with_nothing() {
    let f = fixture().await;
    f.permission("ticket", "read").await;

    let summary = f.authz.reporting.user_summary(&f.user).await.unwrap();
    assert!(summary.role.is_none());
    assert_eq!(summary.active_count, 0);
    assert_eq!(summary.inactive_count, 1);
    assert_eq!(summary.catalog_size, 1);
    assert!(summary.by_resource.is_empty());
    assert!(summary.processes.is_empty());
}

#[tokio::test]
async fn user_summary_groups_and_counts() {
    let f = fixture().await;
    let read = f.permission("ticket", "read").await;
    let write = f.permission("ticket", "write").await;
    let moving = f.permission("stage", "move").await;
    f.permission("report", "export").await;

    let role = f
        .authz
        .roles
        .create(&CreateRoleRequest {
            name: "agent".into(),
            permission_ids: vec![read.id.clone()],
            ..Default::default()
        })
        .await
        .unwrap();
    f.store.set_user_role(&f.user, Some(&role.id)).await.unwrap();
    for p in [&write.id, &moving.id] {
        f.authz
            .grants
            .grant(&f.request(p, &f.process_a.id, None, None))
            .await
            .unwrap();
    }
    f.store.soft_delete_process(&f.process_a.id).await.unwrap();

    let summary = f.authz.reporting.user_summary(&f.user).await.unwrap();
    let role_summary = summary.role.as_ref().unwrap();
    assert_eq!(role_summary.name, "agent");
    assert!(role_summary.is_active);

    assert_eq!(summary.active_count, 3);
    assert_eq!(summary.inactive_count, 1);
    assert_eq!(summary.role_permission_count, 1);
    assert_eq!(summary.direct_permission_count, 2);
    assert_eq!(summary.by_resource["ticket"].len(), 2);
    assert_eq!(summary.by_resource["stage"].len(), 1);

    assert_eq!(summary.processes.len(), 1);
    let process = &summary.processes[0];
    assert_eq!(process.name.as_deref(), Some("Onboarding"));
    assert!(process.deleted);
    assert_eq!(process.permission_count, 2);
    assert_eq!(process.permissions.len(), 2);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["active_count"], 3);
}

#[tokio::test]
async fn user_summary_requires_known_user() {
    let f = fixture().await;
    let err = f
        .authz
        .reporting
        .user_summary(&UserId::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn process_summary_lists_active_holders() {
    let f = fixture().await;
    let read = f.permission("ticket", "read").await;
    let write = f.permission("ticket", "write").await;
    let stage = f.store.create_stage(&f.process_a.id, "Intake").await.unwrap();
    let soon = Utc::now() + Duration::hours(4);

    f.authz
        .grants
        .grant(&f.request(&read.id, &f.process_a.id, Some(&stage.id), Some(soon)))
        .await
        .unwrap();
    f.authz
        .grants
        .grant(&f.request(
            &write.id,
            &f.process_a.id,
            None,
            Some(Utc::now() - Duration::minutes(1)),
        ))
        .await
        .unwrap();
    f.authz
        .grants
        .grant(&GrantRequest {
            user_id: f.admin.clone(),
            permission_id: Some(write.id.clone()),
            process_id: f.process_a.id.clone(),
            stage_id: None,
            expires_at: None,
            granted_by: f.admin.clone(),
        })
        .await
        .unwrap();

    let summary = f
        .authz
        .reporting
        .process_summary(&f.process_a.id)
        .await
        .unwrap();
    assert_eq!(summary.process.id, f.process_a.id);
    assert_eq!(summary.total_grants, 3);
    assert_eq!(summary.active_grants, 2);
    assert_eq!(summary.expired_grants, 1);
    assert_eq!(summary.users.len(), 2);

    let agent = summary
        .users
        .iter()
        .find(|u| u.user_id == f.user)
        .unwrap();
    assert_eq!(agent.permissions.len(), 1);
    assert_eq!(agent.permissions[0].id, read.id);
    assert_eq!(agent.stage_ids, vec![stage.id]);
    assert_eq!(
        agent.next_expiry.map(|t| t.timestamp()),
        Some(soon.timestamp())
    );

    let admin = summary
        .users
        .iter()
        .find(|u| u.user_id == f.admin)
        .unwrap();
    assert!(admin.next_expiry.is_none());
}

#[tokio::test]
async fn process_summary_for_empty_and_missing_process() {
    let f = fixture().await;

    let summary = f
        .authz
        .reporting
        .process_summary(&f.process_b.id)
        .await
        .unwrap();
    assert_eq!(summary.total_grants, 0);
    assert!(summary.users.is_empty());

    let err = f
        .authz
        .reporting
        .process_summary(&ProcessId::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
