//! Rule inspection commands.
//!
//! # Usage
//!
//! ```bash
//! # Status of every active discount
//! petshop-cli rules status discount --status active
//!
//! # Show one banner with its targets and eligibility as JSON
//! petshop-cli rules show banner 12
//! ```

use chrono::Utc;

use petshop_admin::db::RuleRepository;
use petshop_admin::models::RuleSummary;
use petshop_core::{RuleId, RuleKind, RuleStatus};

use super::{CommandError, connect};

/// Accepts either the stored tag (`free_shipping`) or the URL segment (`free-shipping`).
pub fn parse_kind(value: &str) -> Result<RuleKind, String> {
    RuleKind::ALL
        .iter()
        .copied()
        .find(|kind| kind.as_str() == value || kind.path_segment() == value)
        .ok_or_else(|| {
            let known: Vec<_> = RuleKind::ALL.iter().map(|k| k.as_str()).collect();
            format!("unknown rule kind '{value}' (expected one of {})", known.join(", "))
        })
}

/// Status of each rule of `kind`, newest first.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a stored rule is invalid.
pub async fn status(
    kind: RuleKind,
    status: Option<RuleStatus>,
    limit: usize,
) -> Result<(), CommandError> {
    let pool = connect().await?;
    let mut conn = pool.acquire().await?;

    let rules = RuleRepository::new().list(&mut conn, kind, None).await?;
    let now = Utc::now();

    let summaries: Vec<RuleSummary> = rules
        .iter()
        .map(|rule| RuleSummary::new(rule, now))
        .filter(|summary| status.is_none_or(|s| summary.status == s))
        .take(limit)
        .collect();

    for summary in &summaries {
        tracing::info!(
            rule_id = %summary.id,
            status = %summary.status,
            version = summary.version,
            apply_type = %summary.apply_type,
            label = %summary.label,
            "rule"
        );
    }
    tracing::info!(kind = %kind, count = summaries.len(), "rule status listed");

    Ok(())
}

/// Full view of one rule as pretty JSON.
///
/// # Errors
///
/// Returns `CommandError::NotFound` if no rule of `kind` has this ID.
pub async fn show(kind: RuleKind, id: RuleId) -> Result<(), CommandError> {
    let pool = connect().await?;
    let mut conn = pool.acquire().await?;

    let view = RuleRepository::new()
        .find_view(&mut conn, kind, id, Utc::now())
        .await?
        .ok_or_else(|| CommandError::NotFound(format!("{kind} rule {id} not found")))?;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&view)?);
    }

    Ok(())
}
