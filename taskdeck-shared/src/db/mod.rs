/// Database layer for Taskdeck
///
/// - `pool`: PostgreSQL connection pool construction and liveness checks
/// - `migrations`: embedded schema migrations
///
/// Row-level operations live next to the types they load, in `models`.
/// The storage seam used by the rest of the crate is `store::PgStore`.

pub mod migrations;
pub mod pool;
