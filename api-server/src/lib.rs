#[macro_use]
extern crate rocket;

pub mod auth;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod movies;
pub mod request_logger;
pub mod routes;
pub mod store;
pub mod users;
pub mod validation;

use std::sync::Arc;

use crate::auth::{AuthConfig, AuthResult, AuthService, AuthState, JwtService, PasswordService};
use crate::db::MoviesDb;
use crate::logging::{LogContext, init_logger};
use crate::movies::MovieService;
use crate::request_logger::RequestLogger;
use crate::store::{PgStore, Repositories};
use crate::users::UserService;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket, Route};
use rocket_cors::{AllowedOrigins, Cors, CorsOptions};
use rocket_db_pools::Database;

pub use crate::error::catchers;

/// Everything the handlers and guards read from managed state.
pub struct AppServices {
    pub auth_state: AuthState,
    pub auth: AuthService,
    pub users: UserService,
    pub movies: MovieService,
}

impl AppServices {
    pub fn build(config: AuthConfig, repositories: Repositories) -> AuthResult<Self> {
        let password_service = Arc::new(PasswordService::from_config(&config)?);
        let jwt_service = Arc::new(JwtService::from_config(&config));
        let auth_state = AuthState::new(jwt_service.clone(), repositories.users.clone());

        let auth = AuthService::new(
            &repositories,
            password_service,
            jwt_service,
            LogContext::new("auth_service"),
        );
        let users = UserService::new(repositories.users.clone(), LogContext::new("user_service"));
        let movies = MovieService::new(
            repositories.movies.clone(),
            LogContext::new("movie_service"),
        );

        Ok(Self {
            auth_state,
            auth,
            users,
            movies,
        })
    }

    pub fn manage(self, rocket: Rocket<Build>) -> Rocket<Build> {
        rocket
            .manage(self.auth_state)
            .manage(self.auth)
            .manage(self.users)
            .manage(self.movies)
    }
}

pub fn api_routes() -> Vec<Route> {
    routes![
        // Health
        routes::health::health_check,
        // Auth
        auth::routes::signup,
        auth::routes::login,
        auth::routes::change_password,
        // Users
        routes::users::get_profile,
        routes::users::update_profile,
        routes::users::update_role,
        // Movies
        routes::movies::create_movie,
        routes::movies::list_movies,
        routes::movies::get_movie,
        routes::movies::update_movie,
        routes::movies::delete_movie,
    ]
}

pub fn cors() -> Result<Cors, rocket_cors::Error> {
    CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Patch, Method::Delete]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .to_cors()
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    rocket::build()
        .attach(RequestLogger::default())
        .attach(MoviesDb::init())
        .attach(AdHoc::try_on_ignite("CORS", |rocket| async move {
            match cors() {
                Ok(cors) => Ok(rocket.attach(cors)),
                Err(err) => {
                    log::error!("invalid CORS configuration: {}", err);
                    Err(rocket)
                }
            }
        }))
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite("Run Migrations", |rocket| async move {
            match MoviesDb::fetch(&rocket) {
                Some(pool) => match db::run_migrations(pool).await {
                    Ok(()) => {
                        log::info!("database migrations successful");
                        Ok(rocket)
                    }
                    Err(e) => {
                        log::error!("database migrations failed: {}", e);
                        Err(rocket)
                    }
                },
                None => {
                    log::error!("database pool not available for migrations");
                    Err(rocket)
                }
            }
        }))
        .attach(AdHoc::try_on_ignite(
            "Application Services",
            |rocket| async move {
                let config = match AuthConfig::from_env() {
                    Ok(config) => config,
                    Err(err) => {
                        log::error!("auth configuration invalid: {}", err);
                        return Err(rocket);
                    }
                };
                let Some(db) = MoviesDb::fetch(&rocket) else {
                    log::error!("database pool not available for services");
                    return Err(rocket);
                };
                let repositories = Repositories::postgres(PgStore::new((**db).clone()));

                match AppServices::build(config, repositories) {
                    Ok(services) => Ok(services.manage(rocket)),
                    Err(err) => {
                        log::error!("failed to initialise services: {}", err);
                        Err(rocket)
                    }
                }
            },
        ))
        .mount("/", api_routes())
        .register("/", catchers())
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use rocket_db_pools::sqlx::{self, PgPool};

    use crate::auth::responses::Role;
    use crate::auth::{AuthConfig, JwtService, PasswordService};
    use crate::models::User;
    use crate::store::{MemoryStore, PgStore, Repositories};
    use crate::AppServices;

    pub use database::{TestDatabase, TestDatabaseError};

    pub const TEST_JWT_SECRET: &str = "test-jwt-secret";

    /// Convenience helpers for seeding users and movies directly in Postgres.
    pub struct TestFixtures<'a> {
        pool: &'a PgPool,
    }

    impl<'a> TestFixtures<'a> {
        /// Create a fixture helper bound to the provided pool.
        pub fn new(pool: &'a PgPool) -> Self {
            Self { pool }
        }

        /// Insert a user row and optional local credentials, returning the new user id.
        pub async fn insert_user(
            &self,
            email: &str,
            full_name: &str,
            role: Role,
            password_hash: Option<&str>,
        ) -> Result<i32, sqlx::Error> {
            let user_id: i32 = sqlx::query_scalar(
                "INSERT INTO users (full_name, email, role) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(full_name)
            .bind(email)
            .bind(role.code())
            .fetch_one(self.pool)
            .await?;

            if let Some(hash) = password_hash {
                sqlx::query(
                    "INSERT INTO local_user_credentials (user_id, password_hash) VALUES ($1, $2)",
                )
                .bind(user_id)
                .bind(hash)
                .execute(self.pool)
                .await?;
            }

            Ok(user_id)
        }

        /// Insert a movie with placeholder details, returning the new movie id.
        pub async fn insert_movie(&self, title: &str, tags: &[&str]) -> Result<i32, sqlx::Error> {
            let tags: Vec<String> = tags.iter().map(|tag| tag.to_string()).collect();
            sqlx::query_scalar(
                "INSERT INTO movies (title, description, director, release_date, genre, tags) \
                 VALUES ($1, $2, $3, DATE '1977-05-25', $4, $5) RETURNING id",
            )
            .bind(title)
            .bind("Fixture description")
            .bind("Fixture Director")
            .bind("Action")
            .bind(tags)
            .fetch_one(self.pool)
            .await
        }
    }

    pub mod database {
        use log::LevelFilter;
        use rocket_db_pools::sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use rocket_db_pools::sqlx::{self, ConnectOptions, PgPool};
        use testcontainers::{GenericImage, ImageExt, core::WaitFor};
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;
        use tokio::runtime::Handle;
        use uuid::Uuid;

        use crate::db::MIGRATOR;

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("neither TEST_DATABASE_URL nor TESTCONTAINERS=1 is set")]
            MissingUrl,
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral database factory for integration tests.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            admin_options: PgConnectOptions,
            database_name: String,
            container: Option<ContainerAsync<GenericImage>>,
        }

        impl TestDatabase {
            /// Provision a fresh database on `TEST_DATABASE_URL`, or in a
            /// disposable Postgres container when `TESTCONTAINERS=1`.
            pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
                if let Ok(url) = std::env::var("TEST_DATABASE_URL") {
                    return Self::provision(&url, None).await;
                }
                let containers_enabled = std::env::var("TESTCONTAINERS")
                    .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false);
                if containers_enabled {
                    return Self::new().await;
                }
                Err(TestDatabaseError::MissingUrl)
            }

            /// Provision a fresh database by launching a disposable Postgres container.
            pub async fn new() -> Result<Self, TestDatabaseError> {
                let image = GenericImage::new("postgres", "16-alpine")
                    .with_wait_for(WaitFor::message_on_stderr(
                        "database system is ready to accept connections",
                    ));

                let request = image
                    .with_env_var("POSTGRES_DB", "postgres")
                    .with_env_var("POSTGRES_USER", "postgres")
                    .with_env_var("POSTGRES_PASSWORD", "postgres");

                let container = request.start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let admin_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                Self::provision(&admin_url, Some(container)).await
            }

            async fn provision(
                base_url: &str,
                container: Option<ContainerAsync<GenericImage>>,
            ) -> Result<Self, TestDatabaseError> {
                let base_options: PgConnectOptions =
                    base_url.parse().map_err(TestDatabaseError::Sqlx)?;
                let base_options = base_options.log_statements(LevelFilter::Off);

                let base_name = base_options
                    .get_database()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "postgres".to_string());

                let admin_options = base_options.clone().database("postgres");
                let admin_pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(admin_options.clone())
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                let new_db_name = format!("{}_{}", base_name, Uuid::new_v4().simple());
                let create_sql = format!("CREATE DATABASE \"{}\" TEMPLATE template0", new_db_name);
                sqlx::query(&create_sql)
                    .execute(&admin_pool)
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;
                admin_pool.close().await;

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect_with(base_options.clone().database(&new_db_name))
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                MIGRATOR.run(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    admin_options,
                    database_name: new_db_name,
                    container,
                })
            }

            /// Cloneable connection pool for use in tests and Rocket state.
            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            /// Convenience method returning a clone of the pooled connection handle.
            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Close pool connections and drop the ephemeral database.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }

                drop_database_with_fallback(self.admin_options.clone(), &self.database_name)
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                if let Some(container) = self.container.take() {
                    drop(container);
                }

                Ok(())
            }
        }

        async fn drop_database_with_fallback(
            admin_options: PgConnectOptions,
            database_name: &str,
        ) -> Result<(), sqlx::Error> {
            let admin_pool = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(admin_options)
                .await?;

            let drop_force = format!("DROP DATABASE \"{}\" WITH (FORCE)", database_name);
            match sqlx::query(&drop_force).execute(&admin_pool).await {
                Ok(_) => Ok(()),
                Err(err) if force_drop_unsupported(&err) => {
                    let drop_sql = format!("DROP DATABASE \"{}\"", database_name);
                    sqlx::query(&drop_sql).execute(&admin_pool).await?;
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }

        fn force_drop_unsupported(err: &sqlx::Error) -> bool {
            matches!(
                err,
                sqlx::Error::Database(db_err)
                    if db_err
                        .code()
                        .map(|code| code == "42601" || code == "0A000")
                        .unwrap_or(false)
            )
        }

        impl Drop for TestDatabase {
            fn drop(&mut self) {
                if let Some(pool) = self.pool.take() {
                    let admin_options = self.admin_options.clone();
                    let db_name = self.database_name.clone();
                    if let Ok(handle) = Handle::try_current() {
                        handle.spawn(async move {
                            pool.close().await;
                            let _ =
                                drop_database_with_fallback(admin_options.clone(), &db_name).await;
                        });
                    } else {
                        std::thread::spawn(move || {
                            if let Ok(rt) = tokio::runtime::Runtime::new() {
                                rt.block_on(async move {
                                    pool.close().await;
                                    let _ = drop_database_with_fallback(
                                        admin_options.clone(),
                                        &db_name,
                                    )
                                    .await;
                                });
                            }
                        });
                    }
                }

                if let Some(container) = self.container.take() {
                    drop(container);
                }
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    ///
    /// Services run against an in-memory store unless a Postgres pool is supplied.
    pub struct TestRocketBuilder {
        figment: Figment,
        routes: Vec<Route>,
        config: AuthConfig,
        repositories: Repositories,
    }

    impl Default for TestRocketBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                routes: Vec::new(),
                config: AuthConfig::for_tests(TEST_JWT_SECRET),
                repositories: Repositories::memory(MemoryStore::new()),
            }
        }

        /// Mount routes at the root, next to the error catchers.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.routes.extend(routes);
            self
        }

        /// Back the services with Postgres instead of the in-memory store.
        pub fn manage_pg_pool(mut self, pool: PgPool) -> Self {
            self.repositories = Repositories::postgres(PgStore::new(pool));
            self
        }

        /// Override token lifetime, e.g. a negative value to mint expired tokens.
        pub fn token_ttl_secs(mut self, ttl_secs: i64) -> Self {
            self.config.token_ttl_secs = ttl_secs;
            self
        }

        /// Handles onto the stores the built instance will use, for seeding.
        pub fn repositories(&self) -> Repositories {
            self.repositories.clone()
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let services = AppServices::build(self.config, self.repositories)
                .expect("test services build");

            let rocket = rocket::custom(self.figment)
                .mount("/", self.routes)
                .register("/", crate::catchers());

            services.manage(rocket)
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }

    /// Mint a bearer header value for `user`, signed with [`TEST_JWT_SECRET`].
    pub fn bearer_for(user: &User, ttl_secs: i64) -> String {
        let token = JwtService::new(TEST_JWT_SECRET, ttl_secs)
            .issue_access_token(user)
            .expect("issue token");
        format!("Bearer {}", token.token)
    }

    /// Hash a password with the cheap parameters the test services use.
    pub fn hash_password(password: &str) -> String {
        let config = AuthConfig::for_tests(TEST_JWT_SECRET);
        PasswordService::from_config(&config)
            .and_then(|service| service.hash_password(password))
            .expect("hash password")
    }
}
