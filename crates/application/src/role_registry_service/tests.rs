use std::sync::Arc;

use bastion_core::AppError;
use bastion_domain::{RoleId, SudoId};

use crate::access_ports::{
    CreateRoleInput, CreateSudoInput, RoleRepository, RuleInput, UpdateRoleInput,
};
use crate::test_support::{FakeAccessStore, FakeKeyStore, asset, asset_group, stored_role, user};
use crate::{RuleResolverService, SudoService};

use super::RoleRegistryService;

struct Fixture {
    store: Arc<FakeAccessStore>,
    key_store: Arc<FakeKeyStore>,
    service: RoleRegistryService,
}

fn fixture() -> Fixture {
    let store = Arc::new(FakeAccessStore::default());
    let key_store = Arc::new(FakeKeyStore::default());
    let service = RoleRegistryService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        key_store.clone(),
    );
    Fixture {
        store,
        key_store,
        service,
    }
}

fn role_input(name: &str) -> CreateRoleInput {
    CreateRoleInput {
        name: name.to_owned(),
        password: None,
        comment: String::new(),
        sudo_ids: Vec::new(),
        key_material: None,
    }
}

async fn restart_services(store: &Arc<FakeAccessStore>) -> SudoId {
    let created = SudoService::new(store.clone())
        .create_sudo(CreateSudoInput {
            name: "restart-services".to_owned(),
            commands: vec!["systemctl restart nginx".to_owned()],
            comment: String::new(),
        })
        .await;
    let Ok(sudo) = created else {
        panic!("sudo group must be created");
    };
    sudo.id()
}

#[tokio::test]
async fn create_role_issues_key_and_resolves_sudo() {
    let fixture = fixture();
    let sudo_id = restart_services(&fixture.store).await;

    let created = fixture
        .service
        .create_role(CreateRoleInput {
            sudo_ids: vec![sudo_id, sudo_id],
            password: Some(String::new()),
            ..role_input("  svc-deploy ")
        })
        .await;
    let Ok(role) = created else {
        panic!("role must be created");
    };

    assert_eq!(role.name().as_str(), "svc-deploy");
    assert_eq!(role.password(), None);
    assert_eq!(role.sudo_ids(), vec![sudo_id]);
    assert_eq!(fixture.key_store.issued(), vec![role.key_path().clone()]);

    let stored = fixture.store.find_role(role.id()).await.ok().flatten();
    assert_eq!(stored, Some(role));
}

#[tokio::test]
async fn duplicate_name_is_rejected_before_issuing_a_key() {
    let fixture = fixture();
    stored_role(&fixture.store, "svc-deploy").await;

    let result = fixture.service.create_role(role_input("svc-deploy")).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(fixture.key_store.issued().is_empty());
    assert_eq!(fixture.store.list_roles().await.unwrap_or_default().len(), 1);
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let fixture = fixture();
    let result = fixture.service.create_role(role_input("   ")).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(fixture.key_store.issued().is_empty());
}

#[tokio::test]
async fn unknown_sudo_ids_fail_role_creation() {
    let fixture = fixture();
    let known = restart_services(&fixture.store).await;
    let unknown = SudoId::new();

    let result = fixture
        .service
        .create_role(CreateRoleInput {
            sudo_ids: vec![known, unknown],
            ..role_input("svc-deploy")
        })
        .await;

    let Err(AppError::Validation(message)) = result else {
        panic!("unknown sudo ids must be a validation error");
    };
    assert!(message.contains(&unknown.to_string()));
    assert!(!message.contains(&known.to_string()));
    assert!(fixture.key_store.issued().is_empty());
}

#[tokio::test]
async fn malformed_key_material_persists_nothing() {
    let fixture = fixture();

    let result = fixture
        .service
        .create_role(CreateRoleInput {
            key_material: Some("not a key".to_owned()),
            ..role_input("svc-deploy")
        })
        .await;

    assert!(matches!(result, Err(AppError::KeyGeneration(_))));
    assert_eq!(fixture.store.role_insert_attempts(), 0);
    assert!(fixture.store.list_roles().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn blank_key_material_generates_a_key() {
    let fixture = fixture();

    for (name, material) in [("svc-empty", ""), ("svc-blank", "  \n\t")] {
        let created = fixture
            .service
            .create_role(CreateRoleInput {
                key_material: Some(material.to_owned()),
                ..role_input(name)
            })
            .await;
        let Ok(role) = created else {
            panic!("blank key material must fall back to a generated key");
        };
        let stored = fixture.store.find_role(role.id()).await.ok().flatten();
        assert_eq!(stored, Some(role));
    }

    assert_eq!(fixture.key_store.materials(), vec![None, None]);
    assert_eq!(fixture.key_store.issued().len(), 2);
}

#[tokio::test]
async fn single_storage_conflict_is_retried() {
    let fixture = fixture();
    fixture.store.inject_role_conflicts(1);

    let result = fixture.service.create_role(role_input("svc-deploy")).await;

    assert!(result.is_ok());
    assert_eq!(fixture.store.role_insert_attempts(), 2);
    assert!(fixture.key_store.discarded().is_empty());
}

#[tokio::test]
async fn repeated_storage_conflict_becomes_validation_and_discards_key() {
    let fixture = fixture();
    fixture.store.inject_role_conflicts(2);

    let result = fixture.service.create_role(role_input("svc-deploy")).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(fixture.store.role_insert_attempts(), 2);
    assert_eq!(fixture.key_store.discarded(), fixture.key_store.issued());
    assert!(fixture.store.list_roles().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn failed_insert_discards_the_issued_key() {
    let fixture = fixture();
    fixture.store.fail_role_inserts();

    let result = fixture.service.create_role(role_input("svc-deploy")).await;

    assert!(matches!(result, Err(AppError::Persistence(_))));
    assert_eq!(fixture.key_store.issued().len(), 1);
    assert_eq!(fixture.key_store.discarded(), fixture.key_store.issued());
}

#[tokio::test]
async fn get_role_reports_assets_bound_through_rules() {
    let fixture = fixture();
    fixture.store.add_asset("web-01", &[]).await;
    fixture.store.add_asset_group("web").await;
    fixture.store.add_user("alice", &[]).await;
    let created = fixture.service.create_role(role_input("svc-deploy")).await;
    let Ok(role) = created else {
        panic!("role must be created");
    };

    let resolver = RuleResolverService::new(
        fixture.store.clone(),
        fixture.store.clone(),
        fixture.store.clone(),
    );
    for name in ["web-direct", "web-grouped"] {
        let rule = resolver
            .create_rule(RuleInput {
                name: name.to_owned(),
                asset_ids: vec![asset("web-01")],
                asset_group_ids: vec![asset_group("web")],
                user_ids: vec![user("alice")],
                role_ids: vec![role.id()],
                ..RuleInput::default()
            })
            .await;
        assert!(rule.is_ok());
    }

    let detail = fixture.service.get_role(role.id()).await;
    let Ok(detail) = detail else {
        panic!("role detail must resolve");
    };
    assert_eq!(detail.role, role);
    assert_eq!(detail.assets, vec![asset("web-01")]);
    assert_eq!(detail.asset_groups.len(), 1);
}

#[tokio::test]
async fn get_unknown_role_is_not_found() {
    let result = fixture().service.get_role(RoleId::new()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn update_role_replaces_sudo_and_comment() {
    let fixture = fixture();
    let sudo_id = restart_services(&fixture.store).await;
    let created = fixture.service.create_role(role_input("svc-deploy")).await;
    let Ok(role) = created else {
        panic!("role must be created");
    };

    let updated = fixture
        .service
        .update_role(
            role.id(),
            UpdateRoleInput {
                password: Some("hunter2".to_owned()),
                comment: "deploys web tier".to_owned(),
                sudo_ids: vec![sudo_id],
            },
        )
        .await;
    let Ok(updated) = updated else {
        panic!("role must be updated");
    };

    assert_eq!(updated.comment(), "deploys web tier");
    assert_eq!(updated.password(), Some("hunter2"));
    assert_eq!(updated.sudo_ids(), vec![sudo_id]);
    assert_eq!(updated.key_path(), role.key_path());
    assert_eq!(updated.date_added(), role.date_added());
}

#[tokio::test]
async fn delete_role_discards_key_and_keeps_rules() {
    let fixture = fixture();
    fixture.store.add_asset("web-01", &[]).await;
    let created = fixture.service.create_role(role_input("svc-deploy")).await;
    let Ok(role) = created else {
        panic!("role must be created");
    };
    let resolver = RuleResolverService::new(
        fixture.store.clone(),
        fixture.store.clone(),
        fixture.store.clone(),
    );
    let rule = resolver
        .create_rule(RuleInput {
            name: "web".to_owned(),
            asset_ids: vec![asset("web-01")],
            role_ids: vec![role.id()],
            ..RuleInput::default()
        })
        .await;
    let Ok(rule) = rule else {
        panic!("rule must be created");
    };

    assert!(fixture.service.delete_role(role.id()).await.is_ok());

    assert_eq!(fixture.key_store.discarded(), vec![role.key_path().clone()]);
    let remaining = resolver.get_rule(rule.id()).await;
    let Ok(remaining) = remaining else {
        panic!("rule must survive role deletion");
    };
    assert!(remaining.rule.role_ids().is_empty());
    assert!(matches!(
        fixture.service.delete_role(role.id()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn delete_role_succeeds_when_key_removal_fails() {
    let fixture = fixture();
    let created = fixture.service.create_role(role_input("svc-deploy")).await;
    let Ok(role) = created else {
        panic!("role must be created");
    };
    fixture.key_store.fail_discards();

    assert!(fixture.service.delete_role(role.id()).await.is_ok());

    assert_eq!(fixture.store.find_role(role.id()).await.ok().flatten(), None);
    assert!(matches!(
        fixture.service.get_role(role.id()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn public_key_reads_the_issued_key() {
    let fixture = fixture();
    let created = fixture.service.create_role(role_input("svc-deploy")).await;
    let Ok(role) = created else {
        panic!("role must be created");
    };

    let public_key = fixture.service.public_key(role.id()).await;
    assert!(public_key.is_ok_and(|line| line.starts_with("ssh-rsa ")));
}
