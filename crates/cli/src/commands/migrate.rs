//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! petshop-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! `crates/admin/migrations/`

use tracing::info;

use super::{CommandError, connect};

/// Run the admin database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or a migration fails to apply.
pub async fn admin() -> Result<(), CommandError> {
    info!("Connecting to admin database...");
    let pool = connect().await?;

    info!("Running admin migrations...");
    sqlx::migrate!("../admin/migrations").run(&pool).await?;

    info!("Admin migrations complete");
    Ok(())
}
