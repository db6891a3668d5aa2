//! Rule service shared by every rule kind.
//!
//! Takes validated [`RuleInput`]s, handles image storage for the kinds that
//! have one, and runs each mutation in a single transaction: scalar and
//! detail writes, then target reconciliation, then eligibility
//! reconciliation. Reads derive status at call time.

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{Span, info, instrument, warn};

use petshop_core::reconcile::ReconcileOutcome;
use petshop_core::{EligibilitySet, RuleId, RuleKind, TargetSet};

use crate::db::associations;
use crate::db::{RepositoryError, RuleRepository};
use crate::models::{Rule, RuleFilter, RuleInput, RuleSummary, RuleView};
use crate::services::storage::{ImageUpload, ObjectStorage, StorageError, replace_image};

/// Errors returned by [`RuleService`].
#[derive(Debug, Error)]
pub enum RuleError {
    /// No rule of the requested kind has this ID.
    #[error("{kind} rule {id} not found")]
    NotFound { kind: RuleKind, id: RuleId },

    /// Unique constraint or stale version.
    #[error("{0}")]
    Conflict(String),

    /// The request is valid JSON but cannot be applied to this kind.
    #[error("{0}")]
    Unsupported(String),

    /// Object storage failed before the transaction opened.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Database failure. The transaction was rolled back.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for RuleError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Repository(other),
        }
    }
}

impl From<sqlx::Error> for RuleError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Association writes performed by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    pub version: i32,
    pub targets: ReconcileOutcome,
    pub eligibility: ReconcileOutcome,
}

/// Rule operations for all four kinds.
#[derive(Clone, Copy)]
pub struct RuleService<'a> {
    pool: &'a PgPool,
    storage: &'a dyn ObjectStorage,
    rules: RuleRepository,
}

impl<'a> RuleService<'a> {
    /// Create a new rule service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, storage: &'a dyn ObjectStorage) -> Self {
        Self {
            pool,
            storage,
            rules: RuleRepository::new(),
        }
    }

    /// Create a rule with its targets and eligibility.
    ///
    /// The image, if any, is uploaded before the transaction opens and
    /// removed again if the transaction fails.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::Unsupported` for an image on a kind without one,
    /// `RuleError::Storage` if the upload fails, `RuleError::Conflict` on a
    /// unique violation and `RuleError::Repository` for other database errors.
    #[instrument(
        name = "rules.service.create",
        skip(self, input, image),
        fields(
            kind = %input.kind(),
            rule_id = tracing::field::Empty,
            target_count = input.targets.len(),
            has_image = image.is_some(),
        ),
        err
    )]
    pub async fn create(
        &self,
        mut input: RuleInput,
        image: Option<ImageUpload>,
    ) -> Result<RuleId, RuleError> {
        let kind = input.kind();
        check_image_allowed(kind, image.as_ref())?;

        let uploaded = match image {
            Some(upload) => Some(self.storage.put(upload).await?),
            None => None,
        };
        input.details.set_image_key(uploaded.clone());

        let result = self.create_in_transaction(&input).await;

        if result.is_err()
            && let Some(key) = uploaded.as_deref()
        {
            self.discard_image(key).await;
        }

        let id = result?;
        Span::current().record("rule_id", tracing::field::display(id));
        info!(rule_id = %id, kind = %kind, "created rule");

        Ok(id)
    }

    async fn create_in_transaction(&self, input: &RuleInput) -> Result<RuleId, RuleError> {
        let mut tx = self.pool.begin().await?;

        let id = self.rules.insert(&mut tx, input).await?;
        associations::insert_all(&mut tx, id, &input.targets).await?;
        associations::insert_all(&mut tx, id, &input.eligibility).await?;

        tx.commit().await?;

        Ok(id)
    }

    /// Get the full view of a rule, with status derived now.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::NotFound` if no rule of `kind` has this ID.
    /// Returns `RuleError::Repository` if stored data cannot be read.
    #[instrument(name = "rules.service.get", skip(self), err)]
    pub async fn get(&self, kind: RuleKind, id: RuleId) -> Result<RuleView, RuleError> {
        let mut conn = self.pool.acquire().await?;

        self.rules
            .find_view(&mut conn, kind, id, Utc::now())
            .await?
            .ok_or(RuleError::NotFound { kind, id })
    }

    /// List rules of `kind`, newest first, with status derived now.
    ///
    /// A status filter is applied after derivation, before paging.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::Repository` if the query fails or a row is invalid.
    #[instrument(name = "rules.service.list", skip(self), err)]
    pub async fn list(
        &self,
        kind: RuleKind,
        filter: RuleFilter,
    ) -> Result<Vec<RuleSummary>, RuleError> {
        let mut conn = self.pool.acquire().await?;
        let now = Utc::now();

        let Some(status) = filter.status else {
            let rules = self
                .rules
                .list(&mut conn, kind, Some((filter.limit, filter.offset)))
                .await?;
            return Ok(rules.iter().map(|rule| RuleSummary::new(rule, now)).collect());
        };

        let rules = self.rules.list(&mut conn, kind, None).await?;
        let offset = usize::try_from(filter.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(filter.limit).unwrap_or(usize::MAX);

        Ok(rules
            .iter()
            .map(|rule| RuleSummary::new(rule, now))
            .filter(|summary| summary.status == status)
            .skip(offset)
            .take(limit)
            .collect())
    }

    /// Replace a rule's fields, targets and eligibility.
    ///
    /// An image, if given, replaces the stored one before the transaction
    /// opens. Inside the transaction the rule row is locked, the version is
    /// checked, and each association dimension is reconciled with minimal
    /// writes.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::NotFound` if no rule of this kind has the ID,
    /// `RuleError::Conflict` on a stale `expected_version` or unique violation,
    /// `RuleError::Storage` if image replacement fails and
    /// `RuleError::Repository` for other database errors.
    #[instrument(
        name = "rules.service.update",
        skip(self, input, image),
        fields(
            kind = %input.kind(),
            rule_id = %id,
            has_image = image.is_some(),
            inserted = tracing::field::Empty,
            deleted = tracing::field::Empty,
        ),
        err
    )]
    pub async fn update(
        &self,
        id: RuleId,
        mut input: RuleInput,
        image: Option<ImageUpload>,
    ) -> Result<UpdateOutcome, RuleError> {
        let kind = input.kind();
        check_image_allowed(kind, image.as_ref())?;

        let current = {
            let mut conn = self.pool.acquire().await?;
            self.rules
                .find(&mut conn, kind, id)
                .await?
                .ok_or(RuleError::NotFound { kind, id })?
        };
        check_version(&current, input.expected_version)?;

        let image_key = match image {
            Some(upload) => {
                Some(replace_image(self.storage, current.details.image_key(), upload).await?)
            }
            None => current.details.image_key().map(str::to_owned),
        };
        let replaced = image_key.as_deref() != current.details.image_key();
        input.details.set_image_key(image_key.clone());

        let result = self.update_in_transaction(id, &input).await;

        if replaced
            && result.is_err()
            && let Some(key) = image_key.as_deref()
        {
            self.discard_image(key).await;
        }

        let outcome = result?;
        let span = Span::current();
        span.record(
            "inserted",
            outcome.targets.inserted + outcome.eligibility.inserted,
        );
        span.record(
            "deleted",
            outcome.targets.deleted + outcome.eligibility.deleted,
        );
        info!(rule_id = %id, version = outcome.version, "updated rule");

        Ok(outcome)
    }

    async fn update_in_transaction(
        &self,
        id: RuleId,
        input: &RuleInput,
    ) -> Result<UpdateOutcome, RuleError> {
        let kind = input.kind();
        let mut tx = self.pool.begin().await?;

        let locked = self
            .rules
            .find_for_update(&mut tx, kind, id)
            .await?
            .ok_or(RuleError::NotFound { kind, id })?;
        check_version(&locked, input.expected_version)?;

        let version = self.rules.update(&mut tx, id, input).await?;

        let targets = associations::reconcile::<TargetSet>(
            &mut tx,
            id,
            locked.apply_type,
            &input.targets,
        )
        .await?;
        let eligibility = associations::reconcile::<EligibilitySet>(
            &mut tx,
            id,
            locked.eligibility_type,
            &input.eligibility,
        )
        .await?;

        tx.commit().await?;

        Ok(UpdateOutcome {
            version,
            targets,
            eligibility,
        })
    }

    /// Set or clear the admin override of a rule.
    ///
    /// Returns the new version.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::NotFound` if no rule of `kind` has this ID,
    /// `RuleError::Conflict` on a stale `expected_version` and
    /// `RuleError::Repository` for database errors.
    #[instrument(name = "rules.service.set_override", skip(self), err)]
    pub async fn set_override(
        &self,
        kind: RuleKind,
        id: RuleId,
        active_override: Option<bool>,
        expected_version: Option<i32>,
    ) -> Result<i32, RuleError> {
        let mut tx = self.pool.begin().await?;

        let locked = self
            .rules
            .find_for_update(&mut tx, kind, id)
            .await?
            .ok_or(RuleError::NotFound { kind, id })?;
        check_version(&locked, expected_version)?;

        let version = self
            .rules
            .set_override(&mut tx, kind, id, active_override)
            .await?
            .ok_or(RuleError::NotFound { kind, id })?;

        tx.commit().await?;

        info!(rule_id = %id, ?active_override, "set rule override");
        Ok(version)
    }

    /// Delete a rule and, after commit, its image.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::NotFound` if no rule of `kind` has this ID.
    /// Returns `RuleError::Repository` for database errors.
    #[instrument(name = "rules.service.delete", skip(self), err)]
    pub async fn delete(&self, kind: RuleKind, id: RuleId) -> Result<(), RuleError> {
        let mut tx = self.pool.begin().await?;

        let rule = self
            .rules
            .find_for_update(&mut tx, kind, id)
            .await?
            .ok_or(RuleError::NotFound { kind, id })?;

        if !self.rules.delete(&mut tx, kind, id).await? {
            return Err(RuleError::NotFound { kind, id });
        }

        tx.commit().await?;

        if let Some(key) = rule.details.image_key() {
            self.discard_image(key).await;
        }

        info!(rule_id = %id, kind = %kind, "deleted rule");
        Ok(())
    }

    async fn discard_image(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            warn!(key, error = %e, "failed to delete image from object storage");
        }
    }
}

fn check_image_allowed(kind: RuleKind, image: Option<&ImageUpload>) -> Result<(), RuleError> {
    if image.is_some() && !kind.has_image() {
        return Err(RuleError::Unsupported(format!(
            "{kind} rules do not accept an image"
        )));
    }
    Ok(())
}

fn check_version(rule: &Rule, expected: Option<i32>) -> Result<(), RuleError> {
    match expected {
        Some(expected) if expected != rule.version => Err(RuleError::Conflict(format!(
            "rule {} was modified (expected version {expected}, found {})",
            rule.id, rule.version
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use petshop_core::{ApplyType, EligibilityType};

    use super::*;
    use crate::models::{FreeShippingDetails, RuleDetails, RuleLimits, RuleSchedule};

    fn rule(version: i32) -> Rule {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Rule {
            id: RuleId::new(4),
            details: RuleDetails::FreeShipping(FreeShippingDetails {
                name: "Over 50".to_owned(),
            }),
            apply_type: ApplyType::Categories,
            eligibility_type: EligibilityType::All,
            limits: RuleLimits::default(),
            schedule: RuleSchedule {
                start_at: at,
                end_at: None,
                active_override: None,
            },
            version,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_version_check() {
        assert!(check_version(&rule(2), None).is_ok());
        assert!(check_version(&rule(2), Some(2)).is_ok());

        let err = check_version(&rule(3), Some(2)).unwrap_err();
        assert!(matches!(err, RuleError::Conflict(_)));
        assert_eq!(
            err.to_string(),
            "rule 4 was modified (expected version 2, found 3)"
        );
    }

    #[test]
    fn test_image_only_for_banner_and_promo() {
        let upload = ImageUpload {
            file_name: "a.png".to_owned(),
            content_type: "image/png".to_owned(),
            bytes: vec![0],
        };

        assert!(check_image_allowed(RuleKind::Banner, Some(&upload)).is_ok());
        assert!(check_image_allowed(RuleKind::Promo, Some(&upload)).is_ok());
        assert!(check_image_allowed(RuleKind::Discount, None).is_ok());
        assert!(matches!(
            check_image_allowed(RuleKind::FreeShipping, Some(&upload)),
            Err(RuleError::Unsupported(_))
        ));
    }

    #[test]
    fn test_repository_conflict_becomes_rule_conflict() {
        let err: RuleError =
            RepositoryError::Conflict("free-shipping name already exists".into()).into();
        assert!(
            matches!(err, RuleError::Conflict(ref m) if m == "free-shipping name already exists")
        );

        let err: RuleError = RepositoryError::NotFound.into();
        assert!(matches!(err, RuleError::Repository(RepositoryError::NotFound)));
    }
}
