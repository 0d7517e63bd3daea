/// Database models for Taskdeck
///
/// # Models
///
/// - `user`: User accounts, roles and the display-safe user summary
/// - `task`: Tasks with their creator/assignee references
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::models::user::{User, CreateUser, Role};
/// use taskdeck_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     name: "John Doe".to_string(),
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: Role::Member,
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod task;
pub mod user;
