use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::models::{
    Credential, Movie, MovieChanges, MovieFilter, NewMovie, NewUser, Pagination, User,
    UserChanges,
};
use crate::store::{
    CredentialRepository, MovieRepository, StoreError, StoreResult, UserRepository,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    credentials: BTreeMap<i32, Credential>,
    movies: BTreeMap<i32, Movie>,
    next_user_id: i32,
    next_credential_id: i32,
    next_movie_id: i32,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<i32>) -> bool {
        self.users
            .values()
            .any(|user| user.email == email && Some(user.id) != except)
    }

    fn next_id(counter: &mut i32) -> i32 {
        *counter += 1;
        *counter
    }
}

/// Process-local store with the same constraints as the Postgres schema:
/// unique emails, one credential per user, cascade on user delete.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write();
        if tables.email_taken(&user.email, None) {
            return Err(StoreError::Conflict(format!(
                "users.email {} already exists",
                user.email
            )));
        }
        let id = Tables::next_id(&mut tables.next_user_id);
        let created = User {
            id,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn update(&self, id: i32, changes: UserChanges) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write();
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(StoreError::Conflict(format!("users.email {email} already exists")));
            }
        }
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i32) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        let removed = tables.users.remove(&id).is_some();
        if removed {
            tables.credentials.retain(|_, credential| credential.user_id != id);
        }
        Ok(removed)
    }
}

#[rocket::async_trait]
impl CredentialRepository for MemoryStore {
    async fn create(&self, user_id: i32, password_hash: &str) -> StoreResult<Credential> {
        let mut tables = self.tables.write();
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::Conflict(format!(
                "local_user_credentials.user_id {user_id} has no matching user"
            )));
        }
        if tables.credentials.values().any(|c| c.user_id == user_id) {
            return Err(StoreError::Conflict(format!(
                "local_user_credentials.user_id {user_id} already exists"
            )));
        }
        let id = Tables::next_id(&mut tables.next_credential_id);
        let credential = Credential {
            id,
            user_id,
            password_hash: password_hash.to_string(),
        };
        tables.credentials.insert(id, credential.clone());
        Ok(credential)
    }

    async fn find_by_user_id(&self, user_id: i32) -> StoreResult<Option<Credential>> {
        let tables = self.tables.read();
        if !tables.users.contains_key(&user_id) {
            return Ok(None);
        }
        Ok(tables
            .credentials
            .values()
            .find(|credential| credential.user_id == user_id)
            .cloned())
    }

    async fn update_hash(&self, id: i32, password_hash: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        match tables.credentials.get_mut(&id) {
            Some(credential) => {
                credential.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i32) -> StoreResult<bool> {
        Ok(self.tables.write().credentials.remove(&id).is_some())
    }
}

#[rocket::async_trait]
impl MovieRepository for MemoryStore {
    async fn create(&self, movie: NewMovie) -> StoreResult<Movie> {
        let mut tables = self.tables.write();
        let id = Tables::next_id(&mut tables.next_movie_id);
        let created = Movie {
            id,
            title: movie.title,
            description: movie.description,
            director: movie.director,
            release_date: movie.release_date,
            rating: movie.rating,
            genre: movie.genre,
            tags: movie.tags,
            episode_id: movie.episode_id,
            is_series: movie.is_series,
        };
        tables.movies.insert(id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Movie>> {
        Ok(self.tables.read().movies.get(&id).cloned())
    }

    async fn find_all(
        &self,
        filter: &MovieFilter,
        pagination: Pagination,
    ) -> StoreResult<(Vec<Movie>, i64)> {
        let tables = self.tables.read();
        // BTreeMap iteration is already ordered by id.
        let matches: Vec<&Movie> = tables
            .movies
            .values()
            .filter(|movie| filter.matches(movie))
            .collect();
        let count = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(pagination.offset().max(0) as usize)
            .take(pagination.limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, count))
    }

    async fn update(&self, id: i32, changes: MovieChanges) -> StoreResult<Option<Movie>> {
        let mut tables = self.tables.write();
        let Some(movie) = tables.movies.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply_to(movie);
        Ok(Some(movie.clone()))
    }

    async fn delete(&self, id: i32) -> StoreResult<bool> {
        Ok(self.tables.write().movies.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::responses::Role;
    use chrono::NaiveDate;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            full_name: "Jane".into(),
            email: email.into(),
            role: Role::User,
        }
    }

    fn new_movie(title: &str) -> NewMovie {
        NewMovie {
            title: title.into(),
            description: "desc".into(),
            director: "someone".into(),
            release_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            rating: None,
            genre: "Drama".into(),
            tags: vec!["classic".into()],
            episode_id: None,
            is_series: false,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        UserRepository::create(&store, new_user("jane@x.com"))
            .await
            .unwrap();
        let err = UserRepository::create(&store, new_user("jane@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_to_its_credential() {
        let store = MemoryStore::new();
        let user = UserRepository::create(&store, new_user("jane@x.com"))
            .await
            .unwrap();
        CredentialRepository::create(&store, user.id, "hash")
            .await
            .unwrap();

        assert!(UserRepository::delete(&store, user.id).await.unwrap());
        assert!(store.find_by_user_id(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_reports_missing_rows() {
        let store = MemoryStore::new();
        let changes = UserChanges {
            full_name: Some("New".into()),
            ..Default::default()
        };
        assert!(UserRepository::update(&store, 99, changes).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_all_pages_in_id_order_and_counts_all_matches() {
        let store = MemoryStore::new();
        for title in ["A New Hope", "Empire", "Return", "Phantom"] {
            MovieRepository::create(&store, new_movie(title)).await.unwrap();
        }

        let (page, count) = store
            .find_all(&MovieFilter::default(), Pagination { page: 2, limit: 3 })
            .await
            .unwrap();
        assert_eq!(count, 4);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "Phantom");

        let filter = MovieFilter {
            title: Some("e".into()),
            ..Default::default()
        };
        let (page, count) = store
            .find_all(&filter, Pagination::default())
            .await
            .unwrap();
        assert_eq!(count, 3);
        assert!(page.iter().all(|m| m.title != "Phantom"));
        assert_eq!(page.first().map(|m| m.id), Some(1));
    }
}
