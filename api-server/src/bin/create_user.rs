use std::io::{self, Write};

use clap::{Parser, ValueEnum};
use sqlx::postgres::PgPoolOptions;

use movie_api::auth::config::{DEFAULT_HASH_MEMORY_KIB, DEFAULT_HASH_ROUNDS};
use movie_api::auth::passwords::PasswordService;
use movie_api::auth::responses::Role;
use movie_api::validation;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    User,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::User => Role::User,
            RoleArg::Admin => Role::Admin,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "create_user",
    about = "Create a movie API account, e.g. the first administrator"
)]
struct Args {
    /// Email address for the account (case insensitive).
    #[arg(long)]
    email: String,

    /// Plaintext password to hash and store for this user.
    #[arg(long)]
    password: String,

    /// Full name shown on the profile.
    #[arg(long)]
    full_name: String,

    /// Role to assign.
    #[arg(long, value_enum, default_value_t = RoleArg::User)]
    role: RoleArg,
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let email = match validation::normalize_email(&args.email) {
        Ok(email) => email,
        Err(err) => {
            writeln!(io::stderr(), "error: {err}")?;
            std::process::exit(1);
        }
    };
    let full_name = args.full_name.trim().to_string();
    if let Err(err) = validation::require_non_empty("fullName", &full_name)
        .and_then(|_| validation::check_password(&args.password))
    {
        writeln!(io::stderr(), "error: {err}")?;
        std::process::exit(1);
    }
    let role = Role::from(args.role);

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;

    let mut tx = pool.begin().await?;

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&mut *tx)
        .await?;

    if existing > 0 {
        writeln!(
            io::stderr(),
            "error: a user with email '{email}' already exists."
        )?;
        std::process::exit(1);
    }

    let password_service = PasswordService::new(
        env_u32("PASSWORD_HASH_ROUNDS", DEFAULT_HASH_ROUNDS),
        env_u32("PASSWORD_HASH_MEMORY_KIB", DEFAULT_HASH_MEMORY_KIB),
    )
    .map_err(|err| io::Error::other(format!("argon2 init failed: {err}")))?;
    let password_hash = password_service
        .hash_password(&args.password)
        .map_err(|err| io::Error::other(format!("password hash failed: {err}")))?;

    let user_id: i32 = sqlx::query_scalar(
        "INSERT INTO users (full_name, email, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&full_name)
    .bind(&email)
    .bind(role.code())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO local_user_credentials (user_id, password_hash) VALUES ($1, $2)")
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    log::info!("created {} user '{}' with id {}", role.as_str(), email, user_id);
    println!("Created {} user '{email}' with id {user_id}", role.as_str());
    Ok(())
}
