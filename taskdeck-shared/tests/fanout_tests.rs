/// Notification fan-out tests
///
/// Use the recording registry to observe exactly which channels receive
/// which events.

use std::sync::Arc;

use serde_json::json;
use taskdeck_shared::auth::middleware::AuthContext;
use taskdeck_shared::models::user::{CreateUser, Role};
use taskdeck_shared::notify::{LiveEventKind, LiveHub, Notifier, RecordingRegistry};
use taskdeck_shared::store::{MemoryStore, TaskStore, UserStore};
use taskdeck_shared::tasks::{create_task, TaskPayload};
use uuid::Uuid;

struct Fixture {
    store: Arc<MemoryStore>,
    registry: Arc<RecordingRegistry>,
    notifier: Notifier<MemoryStore>,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(RecordingRegistry::new());
    let notifier = Notifier::new(store.clone(), registry.clone());
    Fixture {
        store,
        registry,
        notifier,
    }
}

async fn user(store: &MemoryStore, name: &str) -> AuthContext {
    let user = store
        .create_user(CreateUser {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password_hash: "hash".to_string(),
            role: Role::Member,
        })
        .await
        .unwrap();
    AuthContext::from_user(&user)
}

async fn task(store: &MemoryStore, creator: &AuthContext, assignee: Option<Uuid>) -> Uuid {
    let payload: TaskPayload = serde_json::from_value(json!({
        "title": "Fan-out subject",
        "assignedTo": assignee,
    }))
    .unwrap();
    create_task(store, creator, payload).await.unwrap().id
}

#[tokio::test]
async fn test_update_notifies_creator_and_assignee() {
    let f = fixture();
    let a = user(&f.store, "A").await;
    let b = user(&f.store, "B").await;
    let id = task(&f.store, &a, Some(b.user_id)).await;

    f.notifier.task_updated(id).await;

    let deliveries = f.registry.deliveries();
    assert_eq!(f.registry.recipients(), vec![a.user_id, b.user_id]);
    assert!(deliveries.iter().all(|d| d.event == LiveEventKind::TaskChanged));
    assert_eq!(deliveries[0].payload["id"], json!(id));
    assert_eq!(deliveries[0].payload["createdBy"]["name"], "A");
}

#[tokio::test]
async fn test_update_self_assigned_notifies_once() {
    let f = fixture();
    let a = user(&f.store, "A").await;
    let id = task(&f.store, &a, Some(a.user_id)).await;

    f.notifier.task_updated(id).await;

    assert_eq!(f.registry.recipients(), vec![a.user_id]);
}

#[tokio::test]
async fn test_create_without_assignee_notifies_nobody() {
    let f = fixture();
    let a = user(&f.store, "A").await;
    let id = task(&f.store, &a, None).await;

    f.notifier.task_created(id).await;

    assert!(f.registry.deliveries().is_empty());
}

#[tokio::test]
async fn test_create_notifies_only_assignee() {
    let f = fixture();
    let a = user(&f.store, "A").await;
    let b = user(&f.store, "B").await;
    let id = task(&f.store, &a, Some(b.user_id)).await;

    f.notifier.task_created(id).await;

    let deliveries = f.registry.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].user_id, b.user_id);
    assert_eq!(deliveries[0].event, LiveEventKind::NewTask);
}

#[tokio::test]
async fn test_deleted_task_is_skipped_silently() {
    let f = fixture();
    let a = user(&f.store, "A").await;
    let b = user(&f.store, "B").await;
    let id = task(&f.store, &a, Some(b.user_id)).await;
    f.store.delete_task(id).await.unwrap();

    f.notifier.task_updated(id).await;
    f.notifier.task_created(id).await;

    assert!(f.registry.deliveries().is_empty());
}

#[tokio::test]
async fn test_deleted_assignee_receives_nothing() {
    let f = fixture();
    let a = user(&f.store, "A").await;
    let b = user(&f.store, "B").await;
    let id = task(&f.store, &a, Some(b.user_id)).await;
    f.store.delete_user(b.user_id).await.unwrap();

    f.notifier.task_updated(id).await;

    assert_eq!(f.registry.recipients(), vec![a.user_id]);
}

#[tokio::test]
async fn test_failed_delivery_does_not_block_other_recipient() {
    let f = fixture();
    let a = user(&f.store, "A").await;
    let b = user(&f.store, "B").await;
    let id = task(&f.store, &a, Some(b.user_id)).await;
    f.registry.fail_for(a.user_id);

    f.notifier.task_updated(id).await;

    assert_eq!(f.registry.recipients(), vec![b.user_id]);
}

#[tokio::test]
async fn test_hub_delivers_frames_to_joined_users() {
    let store = Arc::new(MemoryStore::new());
    let hub = Arc::new(LiveHub::new());
    let notifier = Notifier::new(store.clone(), hub.clone());

    let a = user(&store, "A").await;
    let b = user(&store, "B").await;
    let mut b_rx = hub.join(b.user_id).await;
    let id = task(&store, &a, Some(b.user_id)).await;

    notifier.task_created(id).await;

    let frame: serde_json::Value = serde_json::from_str(&b_rx.recv().await.unwrap()).unwrap();
    assert_eq!(frame["event"], "new-task");
    assert_eq!(frame["data"]["id"], json!(id));
    assert_eq!(frame["data"]["assignedTo"]["id"], json!(b.user_id));
}
