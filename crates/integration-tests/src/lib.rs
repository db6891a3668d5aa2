//! Integration tests for the Petshop rule engine.
//!
//! # Running Tests
//!
//! ```bash
//! # Create an empty database
//! createdb petshop_test
//!
//! # Run integration tests (they are ignored by default)
//! TEST_DATABASE_URL=postgres://localhost/petshop_test cargo test -p petshop-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `rule_reconcile` - Target and eligibility reconciliation against `PostgreSQL`
//! - `rule_service` - Versioning, conflicts, overrides, listing and images
//! - `rule_api` - HTTP round trips through the admin router
//!
//! Every test creates its own rules with unique names, so tests can share one
//! database and run in parallel.

use std::sync::Arc;

use axum::Router;
use serde_json::{Value, json};
use sqlx::PgPool;

use petshop_admin::models::{FreeShippingForm, RuleForm, RuleInput};
use petshop_admin::routes;
use petshop_admin::services::storage::MockObjectStorage;
use petshop_admin::state::AppState;
use petshop_core::RuleId;

/// Connect to the test database and apply migrations.
///
/// # Panics
///
/// Panics if `TEST_DATABASE_URL` (or `ADMIN_DATABASE_URL`) is unset or
/// migrations fail.
pub async fn test_pool() -> PgPool {
    dotenvy::dotenv().ok();

    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("ADMIN_DATABASE_URL"))
        .expect("TEST_DATABASE_URL must be set");

    let pool = PgPool::connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("../admin/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// A name no other test run will use.
#[must_use]
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

/// Free-shipping form body targeting `apply` under `apply_type`.
#[must_use]
pub fn free_shipping_body(apply_type: &str, apply: &[&str]) -> Value {
    json!({
        "name": unique("free-shipping"),
        "applyType": apply_type,
        "apply": apply,
        "startAt": "2026-01-01T00:00:00Z",
    })
}

/// Merge `extra` into `base`, overwriting shared keys.
///
/// # Panics
///
/// Panics if either value is not a JSON object.
#[must_use]
pub fn with(mut base: Value, extra: Value) -> Value {
    let (Value::Object(target), Value::Object(extra)) = (&mut base, extra) else {
        panic!("JSON objects expected");
    };
    target.extend(extra);
    base
}

/// Deserialize and validate a form body.
///
/// # Panics
///
/// Panics if the body does not deserialize or fails validation.
#[must_use]
pub fn input<F: RuleForm>(body: Value) -> RuleInput {
    let form: F = serde_json::from_value(body).expect("form should deserialize");
    form.validate().expect("form should validate")
}

/// Validated free-shipping input.
#[must_use]
pub fn free_shipping(apply_type: &str, apply: &[&str]) -> RuleInput {
    input::<FreeShippingForm>(free_shipping_body(apply_type, apply))
}

/// Stored target rows of a rule as `(target_kind, target_id)`, sorted.
///
/// # Panics
///
/// Panics if the query fails.
pub async fn target_rows(pool: &PgPool, id: RuleId) -> Vec<(String, String)> {
    sqlx::query_as(
        "SELECT target_kind, target_id FROM admin.rule_targets
         WHERE rule_id = $1 ORDER BY target_kind, target_id",
    )
    .bind(id.as_i32())
    .fetch_all(pool)
    .await
    .expect("Failed to load target rows")
}

/// Stored eligibility rows of a rule as `(eligibility_kind, value)`, sorted.
///
/// # Panics
///
/// Panics if the query fails.
pub async fn eligibility_rows(pool: &PgPool, id: RuleId) -> Vec<(String, String)> {
    sqlx::query_as(
        "SELECT eligibility_kind, value FROM admin.rule_eligibility
         WHERE rule_id = $1 ORDER BY eligibility_kind, value",
    )
    .bind(id.as_i32())
    .fetch_all(pool)
    .await
    .expect("Failed to load eligibility rows")
}

/// Make any insert of a target ID starting with `boom` fail.
///
/// Used to force a failure halfway through a rule transaction.
///
/// # Panics
///
/// Panics if the trigger cannot be installed.
pub async fn install_failing_target_trigger(pool: &PgPool) {
    sqlx::query(
        "CREATE OR REPLACE FUNCTION admin.reject_boom_target() RETURNS trigger AS $$
         BEGIN
             IF NEW.target_id LIKE 'boom%' THEN
                 RAISE EXCEPTION 'rejected target %', NEW.target_id;
             END IF;
             RETURN NEW;
         END;
         $$ LANGUAGE plpgsql",
    )
    .execute(pool)
    .await
    .expect("Failed to create trigger function");

    sqlx::query(
        "CREATE OR REPLACE TRIGGER reject_boom_target
         BEFORE INSERT ON admin.rule_targets
         FOR EACH ROW EXECUTE FUNCTION admin.reject_boom_target()",
    )
    .execute(pool)
    .await
    .expect("Failed to create trigger");
}

/// Admin router backed by `pool` and `storage`.
#[must_use]
pub fn app(pool: PgPool, storage: MockObjectStorage) -> Router {
    routes::routes().with_state(AppState::new(pool, Arc::new(storage)))
}
