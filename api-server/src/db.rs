use rocket_db_pools::sqlx::{self, PgPool};
use rocket_db_pools::Database;

#[derive(Database)]
#[database("movies_db")]
pub struct MoviesDb(sqlx::PgPool);

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Apply pending migrations; startup aborts when this fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    log::info!("checking database migration state");
    MIGRATOR.run(pool).await?;
    log::info!("database migrations up to date");
    Ok(())
}
