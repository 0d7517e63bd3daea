/// In-memory store
///
/// Mirrors `PgStore` semantics (ordering, dangling references, email
/// uniqueness, omitted empty buckets) without a database. Used by the test
/// suites of both crates.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{GroupCount, GroupField, StoreError, StoreResult, TaskQuery, TaskStore, UserStore};
use crate::models::task::{NewTask, Task, TaskChanges, TaskPriority, TaskStatus, TaskView};
use crate::models::user::{CreateUser, UpdateUser, User, UserSummary};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,

    /// Insertion order
    tasks: Vec<Task>,
}

impl Inner {
    fn summary(&self, id: Uuid) -> Option<UserSummary> {
        self.users.get(&id).map(UserSummary::from)
    }

    fn view(&self, task: &Task) -> TaskView {
        TaskView::resolve(task, |id| self.summary(id))
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

/// Store that keeps everything behind a single lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_conflict() -> StoreError {
    StoreError::Conflict("User with this email already exists".to_string())
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn find_tasks(&self, query: &TaskQuery) -> StoreResult<Vec<TaskView>> {
        let inner = self.inner.read().await;

        // Newest insert first, then a stable sort keeps that order for equal timestamps
        let mut matching: Vec<&Task> = inner.tasks.iter().rev().filter(|t| query.matches(t)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matching.into_iter().map(|t| inner.view(t)).collect())
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let inner = self.inner.read().await;
        Ok(inner.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn get_task_view(&self, id: Uuid) -> StoreResult<Option<TaskView>> {
        let inner = self.inner.read().await;
        Ok(inner.tasks.iter().find(|t| t.id == id).map(|t| inner.view(t)))
    }

    async fn insert_task(&self, task: NewTask) -> StoreResult<Task> {
        let task = task.into_task();
        self.inner.write().await.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: Uuid, changes: TaskChanges) -> StoreResult<Option<Task>> {
        let mut inner = self.inner.write().await;
        Ok(inner.tasks.iter_mut().find(|t| t.id == id).map(|task| {
            changes.apply_to(task);
            task.clone()
        }))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.tasks.len();
        inner.tasks.retain(|t| t.id != id);
        Ok(inner.tasks.len() < before)
    }

    async fn count_tasks_by(&self, field: GroupField, query: &TaskQuery) -> StoreResult<Vec<GroupCount>> {
        let inner = self.inner.read().await;

        let mut counts: HashMap<&'static str, i64> = HashMap::new();
        for task in inner.tasks.iter().filter(|t| query.matches(t)) {
            *counts.entry(field.value_of(task)).or_default() += 1;
        }

        let order: Vec<&'static str> = match field {
            GroupField::Status => TaskStatus::ALL.iter().map(TaskStatus::as_str).collect(),
            GroupField::Priority => TaskPriority::ALL.iter().map(TaskPriority::as_str).collect(),
        };

        Ok(order
            .into_iter()
            .filter_map(|value| {
                counts.get(value).map(|&count| GroupCount {
                    value: value.to_string(),
                    count,
                })
            })
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: CreateUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(&user.email, None) {
            return Err(email_conflict());
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;
        if let Some(ref email) = changes.email {
            if inner.email_taken(email, Some(id)) {
                return Err(email_conflict());
            }
        }

        Ok(inner.users.get_mut(&id).map(|user| {
            changes.apply_to(user);
            user.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.inner.write().await.users.remove(&id).is_some())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn new_user(email: &str) -> CreateUser {
        CreateUser {
            name: "Test".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::Member,
        }
    }

    fn new_task(created_by: Uuid, status: TaskStatus) -> NewTask {
        NewTask {
            title: "Task".to_string(),
            description: None,
            status,
            priority: TaskPriority::Medium,
            due_date: None,
            assigned_to: None,
            created_by,
            tags: vec![],
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();

        let err = store.create_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_email_to_taken_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();
        let b = store.create_user(new_user("b@example.com")).await.unwrap();

        let changes = UpdateUser {
            email: Some("a@example.com".to_string()),
            ..Default::default()
        };
        assert!(store.update_user(b.id, changes).await.is_err());

        let same = UpdateUser {
            email: Some("b@example.com".to_string()),
            ..Default::default()
        };
        assert!(store.update_user(b.id, same).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_find_tasks_newest_first() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let first = store.insert_task(new_task(owner, TaskStatus::Todo)).await.unwrap();
        let second = store.insert_task(new_task(owner, TaskStatus::Todo)).await.unwrap();

        let tasks = store.find_tasks(&TaskQuery::default()).await.unwrap();
        let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_deleted_user_reference_resolves_to_none() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("gone@example.com")).await.unwrap();
        let task = store.insert_task(new_task(user.id, TaskStatus::Todo)).await.unwrap();

        assert!(store.get_task_view(task.id).await.unwrap().unwrap().created_by.is_some());

        store.delete_user(user.id).await.unwrap();

        let view = store.get_task_view(task.id).await.unwrap().unwrap();
        assert!(view.created_by.is_none());
        assert_eq!(store.get_task(task.id).await.unwrap().unwrap().created_by, user.id);
    }

    #[tokio::test]
    async fn test_count_omits_empty_buckets() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        store.insert_task(new_task(owner, TaskStatus::Todo)).await.unwrap();
        store.insert_task(new_task(owner, TaskStatus::Todo)).await.unwrap();
        store.insert_task(new_task(owner, TaskStatus::Completed)).await.unwrap();

        let counts = store
            .count_tasks_by(GroupField::Status, &TaskQuery::default())
            .await
            .unwrap();

        assert_eq!(
            counts,
            vec![
                GroupCount { value: "todo".to_string(), count: 2 },
                GroupCount { value: "completed".to_string(), count: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_missing_task_is_false() {
        let store = MemoryStore::new();
        assert!(!store.delete_task(Uuid::new_v4()).await.unwrap());
    }
}
