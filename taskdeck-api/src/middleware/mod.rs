/// Middleware modules for the API server
///
/// Authentication lives with the router in `app`; this module holds the
/// reusable tower layers.

pub mod security;
