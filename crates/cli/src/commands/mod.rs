//! CLI subcommand implementations.

pub mod migrate;
pub mod rules;

use petshop_admin::db::RepositoryError;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by every subcommand.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Stored rule data could not be read.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// No rule of the requested kind has this ID.
    #[error("{0}")]
    NotFound(String),

    /// Output could not be rendered.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Admin database URL from the environment.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("ADMIN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("ADMIN_DATABASE_URL"))
}

/// Connect to the admin database.
async fn connect() -> Result<PgPool, CommandError> {
    let database_url = database_url()?;
    Ok(PgPool::connect(database_url.expose_secret()).await?)
}
