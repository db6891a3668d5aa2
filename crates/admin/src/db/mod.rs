//! Database operations for the admin `PostgreSQL` schema.
//!
//! ## Tables
//!
//! - `admin.rules` - Fields every marketing rule shares (schedule, limits,
//!   discriminators, override, version)
//! - `admin.discount_rules`, `admin.free_shipping_rules`, `admin.banner_rules`,
//!   `admin.promo_rules` - Kind-specific fields, one row per rule
//! - `admin.rule_targets` - What a rule applies to, tagged by target kind
//! - `admin.rule_eligibility` - Who a rule applies to, tagged by eligibility kind
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p petshop-cli -- migrate
//! ```

pub mod associations;
pub mod rules;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use petshop_core::registry::RowError;

pub use rules::RuleRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique free-shipping name).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl From<RowError> for RepositoryError {
    fn from(err: RowError) -> Self {
        Self::DataCorruption(err.to_string())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map unique violations on known constraints to [`RepositoryError::Conflict`].
pub(crate) fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let message = match db_err.constraint() {
            Some("free_shipping_rules_name_key") => "free-shipping name already exists",
            Some("idx_discount_rules_code") => "discount code already exists",
            _ => "rule already exists",
        };
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}
