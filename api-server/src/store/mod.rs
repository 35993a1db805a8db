//! Persistence seams: one repository trait per entity, backed either by
//! PostgreSQL or by an in-process map.

use std::sync::Arc;

use thiserror::Error;

use crate::models::{
    Credential, Movie, MovieChanges, MovieFilter, NewMovie, NewUser, Pagination, User,
    UserChanges,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rocket_db_pools::sqlx::Error),
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[rocket::async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> StoreResult<User>;

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<User>>;

    /// Exact match on the stored (already normalised) email.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Returns `None` when no row has this id.
    async fn update(&self, id: i32, changes: UserChanges) -> StoreResult<Option<User>>;

    /// Removes the user and, through the foreign key, its credential.
    async fn delete(&self, id: i32) -> StoreResult<bool>;
}

#[rocket::async_trait]
pub trait CredentialRepository: Send + Sync {
    async fn create(&self, user_id: i32, password_hash: &str) -> StoreResult<Credential>;

    /// Only yields a credential whose owning user still exists.
    async fn find_by_user_id(&self, user_id: i32) -> StoreResult<Option<Credential>>;

    async fn update_hash(&self, id: i32, password_hash: &str) -> StoreResult<bool>;

    async fn delete(&self, id: i32) -> StoreResult<bool>;
}

#[rocket::async_trait]
pub trait MovieRepository: Send + Sync {
    async fn create(&self, movie: NewMovie) -> StoreResult<Movie>;

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Movie>>;

    /// One page of matches ordered by id, plus the total match count.
    async fn find_all(
        &self,
        filter: &MovieFilter,
        pagination: Pagination,
    ) -> StoreResult<(Vec<Movie>, i64)>;

    async fn update(&self, id: i32, changes: MovieChanges) -> StoreResult<Option<Movie>>;

    async fn delete(&self, id: i32) -> StoreResult<bool>;
}

/// Repository handles shared by every service.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub credentials: Arc<dyn CredentialRepository>,
    pub movies: Arc<dyn MovieRepository>,
}

impl Repositories {
    pub fn postgres(store: PgStore) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            credentials: store.clone(),
            movies: store,
        }
    }

    pub fn memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            credentials: store.clone(),
            movies: store,
        }
    }
}
