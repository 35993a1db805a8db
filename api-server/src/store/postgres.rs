use rocket_db_pools::sqlx::{self, FromRow, PgPool, Postgres, QueryBuilder};

use crate::auth::responses::Role;
use crate::models::{
    Credential, Movie, MovieChanges, MovieFilter, NewMovie, NewUser, Pagination, User,
    UserChanges,
};
use crate::store::{
    CredentialRepository, MovieRepository, StoreError, StoreResult, UserRepository,
};

const USER_COLUMNS: &str = "id, full_name, email, role";
const MOVIE_COLUMNS: &str =
    "id, title, description, director, release_date, rating, genre, tags, episode_id, is_series";

/// Repository implementation over the shared Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i32,
    full_name: String,
    email: String,
    role: i16,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_code(row.role)
            .ok_or_else(|| StoreError::Corrupt(format!("user {} has role {}", row.id, row.role)))?;
        Ok(User {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            role,
        })
    }
}

fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            StoreError::Conflict(db_err.message().to_string())
        }
        _ => StoreError::Database(err),
    }
}

fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_movie_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &MovieFilter) {
    builder.push(" WHERE TRUE");

    let text_columns = [
        ("title", &filter.title),
        ("description", &filter.description),
        ("director", &filter.director),
        ("genre", &filter.genre),
    ];
    for (column, value) in text_columns {
        if let Some(value) = value {
            builder
                .push(format!(" AND {column} ILIKE "))
                .push_bind(like_pattern(value));
        }
    }

    if let Some(tag) = &filter.tag {
        builder
            .push(" AND EXISTS (SELECT 1 FROM unnest(tags) AS t(tag) WHERE t.tag ILIKE ")
            .push_bind(like_pattern(tag))
            .push(")");
    }
    if let Some(rating) = filter.rating {
        builder.push(" AND rating::float8 = ").push_bind(rating);
    }
    if let Some(episode_id) = filter.episode_id {
        builder.push(" AND episode_id = ").push_bind(episode_id);
    }
}

#[rocket::async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (full_name, email, role) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(user.role.code())
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;
        row.try_into()
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    async fn update(&self, id: i32, changes: UserChanges) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET full_name = COALESCE($2, full_name), email = COALESCE($3, email), \
             role = COALESCE($4, role), updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.full_name)
        .bind(changes.email)
        .bind(changes.role.map(Role::code))
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;
        row.map(User::try_from).transpose()
    }

    async fn delete(&self, id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[rocket::async_trait]
impl CredentialRepository for PgStore {
    async fn create(&self, user_id: i32, password_hash: &str) -> StoreResult<Credential> {
        let credential = sqlx::query_as::<_, Credential>(
            "INSERT INTO local_user_credentials (user_id, password_hash) VALUES ($1, $2) \
             RETURNING id, user_id, password_hash",
        )
        .bind(user_id)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;
        Ok(credential)
    }

    async fn find_by_user_id(&self, user_id: i32) -> StoreResult<Option<Credential>> {
        let credential = sqlx::query_as::<_, Credential>(
            "SELECT c.id, c.user_id, c.password_hash FROM local_user_credentials c \
             INNER JOIN users u ON u.id = c.user_id WHERE c.user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(credential)
    }

    async fn update_hash(&self, id: i32, password_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE local_user_credentials SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM local_user_credentials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[rocket::async_trait]
impl MovieRepository for PgStore {
    async fn create(&self, movie: NewMovie) -> StoreResult<Movie> {
        let created = sqlx::query_as::<_, Movie>(&format!(
            "INSERT INTO movies (title, description, director, release_date, rating, genre, tags, \
             episode_id, is_series) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(&movie.title)
        .bind(&movie.description)
        .bind(&movie.director)
        .bind(movie.release_date)
        .bind(movie.rating)
        .bind(&movie.genre)
        .bind(&movie.tags)
        .bind(movie.episode_id)
        .bind(movie.is_series)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;
        Ok(created)
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Movie>> {
        let movie =
            sqlx::query_as::<_, Movie>(&format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(movie)
    }

    async fn find_all(
        &self,
        filter: &MovieFilter,
        pagination: Pagination,
    ) -> StoreResult<(Vec<Movie>, i64)> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM movies");
        push_movie_filters(&mut count_query, filter);
        let count: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut rows_query =
            QueryBuilder::<Postgres>::new(format!("SELECT {MOVIE_COLUMNS} FROM movies"));
        push_movie_filters(&mut rows_query, filter);
        rows_query
            .push(" ORDER BY id ASC LIMIT ")
            .push_bind(pagination.limit)
            .push(" OFFSET ")
            .push_bind(pagination.offset());
        let movies = rows_query
            .build_query_as::<Movie>()
            .fetch_all(&self.pool)
            .await?;

        Ok((movies, count))
    }

    async fn update(&self, id: i32, changes: MovieChanges) -> StoreResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "UPDATE movies SET title = COALESCE($2, title), description = COALESCE($3, description), \
             director = COALESCE($4, director), release_date = COALESCE($5, release_date), \
             rating = COALESCE($6, rating), genre = COALESCE($7, genre), tags = COALESCE($8, tags), \
             episode_id = COALESCE($9, episode_id), is_series = COALESCE($10, is_series), \
             updated_at = NOW() WHERE id = $1 RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.director)
        .bind(changes.release_date)
        .bind(changes.rating)
        .bind(changes.genre)
        .bind(changes.tags)
        .bind(changes.episode_id)
        .bind(changes.is_series)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;
        Ok(movie)
    }

    async fn delete(&self, id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("star"), "%star%");
        assert_eq!(like_pattern("100%_"), "%100\\%\\_%");
    }

    #[test]
    fn filters_render_only_present_criteria() {
        let filter = MovieFilter {
            title: Some("hope".into()),
            tag: Some("space".into()),
            episode_id: Some(4),
            ..Default::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM movies");
        push_movie_filters(&mut builder, &filter);
        let sql = builder.sql();
        assert!(sql.contains("title ILIKE $1"));
        assert!(sql.contains("t.tag ILIKE $2"));
        assert!(sql.contains("episode_id = $3"));
        assert!(!sql.contains("director"));
    }
}
