//! HTTP route handlers grouped by resource.
//!
//! Authentication routes live in [`crate::auth::routes`]; everything else
//! is mounted from here.

pub mod health;
pub(crate) mod helpers;
pub mod movies;
pub mod users;
