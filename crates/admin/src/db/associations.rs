//! Reading and reconciling a rule's association rows.
//!
//! Both dimensions (targets and eligibility) live in tagged tables described
//! by [`petshop_core::registry`]. Everything here runs on a borrowed
//! connection so callers can keep it inside their transaction.

use std::collections::BTreeSet;

use sqlx::PgConnection;
use tracing::{debug, instrument};

use petshop_core::reconcile::{self, AssociationSet, ReconcileOutcome, ReconcilePlan};
use petshop_core::registry::{AssociationTable, eligibility_binding, target_binding};
use petshop_core::{ApplyType, EligibilitySet, EligibilityType, RuleId, TargetSet};

use super::RepositoryError;

/// Internal row type for association queries.
#[derive(Debug, sqlx::FromRow)]
struct AssociationRow {
    kind: String,
    value: String,
}

async fn fetch_rows(
    conn: &mut PgConnection,
    table: &AssociationTable,
    rule_id: RuleId,
) -> Result<Vec<AssociationRow>, RepositoryError> {
    let sql = format!(
        "SELECT {kind} AS kind, {value} AS value FROM {table} WHERE rule_id = $1 ORDER BY {value}",
        kind = table.kind_column,
        value = table.value_column,
        table = table.table,
    );

    let rows = sqlx::query_as::<_, AssociationRow>(&sql)
        .bind(rule_id)
        .fetch_all(conn)
        .await?;

    Ok(rows)
}

/// Load the stored values of one dimension under its current discriminator.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` if a stored row carries a kind
/// other than the one `discriminator` writes, or if rows exist for a
/// discriminator that stores none.
pub async fn load_keys<S: AssociationSet>(
    conn: &mut PgConnection,
    rule_id: RuleId,
    discriminator: S::Discriminator,
) -> Result<BTreeSet<String>, RepositoryError> {
    let expected = S::row_tag(discriminator);

    fetch_rows(conn, S::TABLE, rule_id)
        .await?
        .into_iter()
        .map(|row| {
            if expected == Some(row.kind.as_str()) {
                Ok(row.value)
            } else {
                Err(RepositoryError::DataCorruption(format!(
                    "rule {rule_id} has {} row of kind '{}' under {discriminator}",
                    S::TABLE.table,
                    row.kind
                )))
            }
        })
        .collect()
}

/// Load the typed target set of a rule.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` if any stored row does not decode
/// under `apply_type`.
pub async fn load_targets(
    conn: &mut PgConnection,
    rule_id: RuleId,
    apply_type: ApplyType,
) -> Result<TargetSet, RepositoryError> {
    let binding = target_binding(apply_type);
    let keys = load_keys::<TargetSet>(conn, rule_id, apply_type).await?;

    let ids = keys
        .iter()
        .map(|key| binding.extract(key).map(|target| target.id().clone()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TargetSet::new(apply_type, ids))
}

/// Load the typed eligibility set of a rule.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` if any stored row does not decode
/// under `eligibility_type`.
pub async fn load_eligibility(
    conn: &mut PgConnection,
    rule_id: RuleId,
    eligibility_type: EligibilityType,
) -> Result<EligibilitySet, RepositoryError> {
    let keys = load_keys::<EligibilitySet>(conn, rule_id, eligibility_type).await?;

    let Some(binding) = eligibility_binding(eligibility_type) else {
        return Ok(EligibilitySet::all());
    };

    let members = keys
        .iter()
        .map(|key| binding.extract(key))
        .collect::<Result<Vec<_>, _>>()?;

    EligibilitySet::from_members(eligibility_type, members).map_err(|stray| {
        RepositoryError::DataCorruption(format!(
            "rule {rule_id} has {} eligibility under {eligibility_type}",
            stray.eligibility_type()
        ))
    })
}

/// Reconcile one dimension of an existing rule with the requested set.
///
/// When the discriminator is unchanged only the difference is written.
/// When it changed, every stored row is cleared first.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` if stored rows do not match
/// `previous`, or `RepositoryError::Database` if a write fails.
#[instrument(
    name = "rules.associations.reconcile",
    skip(conn, requested),
    fields(
        table = S::TABLE.table,
        rule_id = %rule_id,
        previous = %previous,
        next = %requested.discriminator(),
    ),
    err
)]
pub async fn reconcile<S>(
    conn: &mut PgConnection,
    rule_id: RuleId,
    previous: S::Discriminator,
    requested: &S,
) -> Result<ReconcileOutcome, RepositoryError>
where
    S: AssociationSet + Sync,
    S::Discriminator: Send + Sync,
{
    let existing = if previous == requested.discriminator() {
        load_keys::<S>(conn, rule_id, previous).await?
    } else {
        BTreeSet::new()
    };

    let plan = reconcile::plan(previous, &existing, requested);
    let outcome = apply_plan(conn, S::TABLE, rule_id, &plan).await?;

    debug!(
        inserted = outcome.inserted,
        deleted = outcome.deleted,
        cleared = plan.clear_all,
        "reconciled associations"
    );

    Ok(outcome)
}

/// Insert the full requested set for a rule that has no rows yet.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_all<S>(
    conn: &mut PgConnection,
    rule_id: RuleId,
    requested: &S,
) -> Result<ReconcileOutcome, RepositoryError>
where
    S: AssociationSet + Sync,
{
    let plan = reconcile::plan(requested.discriminator(), &BTreeSet::new(), requested);
    apply_plan(conn, S::TABLE, rule_id, &plan).await
}

async fn apply_plan(
    conn: &mut PgConnection,
    table: &AssociationTable,
    rule_id: RuleId,
    plan: &ReconcilePlan,
) -> Result<ReconcileOutcome, RepositoryError> {
    let mut outcome = ReconcileOutcome::default();

    if plan.clear_all {
        outcome.deleted = clear(conn, table, rule_id).await?;
    } else if !plan.delete.is_empty() {
        let row_tag = plan.row_tag.ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "rule {rule_id} has {} rows to delete but no row kind",
                table.table
            ))
        })?;
        outcome.deleted = delete_values(conn, table, rule_id, row_tag, &plan.delete).await?;
    }

    if !plan.insert.is_empty() {
        let row_tag = plan.row_tag.ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "rule {rule_id} has {} rows to insert but no row kind",
                table.table
            ))
        })?;
        outcome.inserted = insert_values(conn, table, rule_id, row_tag, &plan.insert).await?;
    }

    Ok(outcome)
}

async fn clear(
    conn: &mut PgConnection,
    table: &AssociationTable,
    rule_id: RuleId,
) -> Result<u64, RepositoryError> {
    let sql = format!("DELETE FROM {} WHERE rule_id = $1", table.table);

    let result = sqlx::query(&sql).bind(rule_id).execute(conn).await?;

    Ok(result.rows_affected())
}

async fn delete_values(
    conn: &mut PgConnection,
    table: &AssociationTable,
    rule_id: RuleId,
    row_tag: &str,
    values: &BTreeSet<String>,
) -> Result<u64, RepositoryError> {
    let sql = format!(
        "DELETE FROM {table} WHERE rule_id = $1 AND {kind} = $2 AND {value} = ANY($3)",
        table = table.table,
        kind = table.kind_column,
        value = table.value_column,
    );
    let values: Vec<String> = values.iter().cloned().collect();

    let result = sqlx::query(&sql)
        .bind(rule_id)
        .bind(row_tag)
        .bind(values)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

async fn insert_values(
    conn: &mut PgConnection,
    table: &AssociationTable,
    rule_id: RuleId,
    row_tag: &str,
    values: &BTreeSet<String>,
) -> Result<u64, RepositoryError> {
    let sql = format!(
        "INSERT INTO {table} (rule_id, {kind}, {value}) SELECT $1, $2, UNNEST($3::text[])",
        table = table.table,
        kind = table.kind_column,
        value = table.value_column,
    );
    let values: Vec<String> = values.iter().cloned().collect();

    let result = sqlx::query(&sql)
        .bind(rule_id)
        .bind(row_tag)
        .bind(values)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}
