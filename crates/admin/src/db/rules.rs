//! Database operations for rules and their kind-specific detail rows.
//!
//! Every method runs on a borrowed connection. Mutations are expected to be
//! called inside the caller's transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;

use petshop_core::{
    ApplyType, DiscountValueType, EligibilityType, MinimumType, RuleId, RuleKind, UnknownTag,
};

use super::{RepositoryError, associations, map_unique_violation};
use crate::models::rule::{
    BannerDetails, DiscountDetails, FreeShippingDetails, PromoDetails, Rule, RuleDetails,
    RuleInput, RuleLimits, RuleSchedule, RuleView,
};

/// Select every rule column joined with all detail tables, followed by `$tail`.
macro_rules! select_rules {
    ($tail:literal) => {
        concat!(
            r"
            SELECT r.id, r.kind, r.apply_type, r.eligibility_type,
                   r.minimum_type, r.minimum, r.max_total_use, r.max_user_once,
                   r.start_at, r.end_at, r.active_override, r.version,
                   r.created_at, r.updated_at,
                   d.title AS discount_title, d.code AS discount_code,
                   d.value_type AS discount_value_type, d.value AS discount_value,
                   f.name AS free_shipping_name,
                   b.title AS banner_title, b.link_url AS banner_link_url,
                   b.image_key AS banner_image_key,
                   p.title AS promo_title, p.description AS promo_description,
                   p.image_key AS promo_image_key
            FROM admin.rules r
            LEFT JOIN admin.discount_rules d ON d.rule_id = r.id
            LEFT JOIN admin.free_shipping_rules f ON f.rule_id = r.id
            LEFT JOIN admin.banner_rules b ON b.rule_id = r.id
            LEFT JOIN admin.promo_rules p ON p.rule_id = r.id
            ",
            $tail
        )
    };
}

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for rule queries, one nullable column group per kind.
#[derive(Debug, sqlx::FromRow)]
struct RuleRow {
    id: i32,
    kind: String,
    apply_type: String,
    eligibility_type: String,
    minimum_type: String,
    minimum: Option<Decimal>,
    max_total_use: Option<i32>,
    max_user_once: bool,
    start_at: DateTime<Utc>,
    end_at: Option<DateTime<Utc>>,
    active_override: Option<bool>,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    discount_title: Option<String>,
    discount_code: Option<String>,
    discount_value_type: Option<String>,
    discount_value: Option<Decimal>,
    free_shipping_name: Option<String>,
    banner_title: Option<String>,
    banner_link_url: Option<String>,
    banner_image_key: Option<String>,
    promo_title: Option<String>,
    promo_description: Option<String>,
    promo_image_key: Option<String>,
}

fn corrupt_tag(id: i32, err: &UnknownTag) -> RepositoryError {
    RepositoryError::DataCorruption(format!("rule {id}: {err}"))
}

fn missing_details(id: i32, kind: RuleKind) -> RepositoryError {
    RepositoryError::DataCorruption(format!("rule {id} has no {kind} details"))
}

impl RuleRow {
    fn details(&mut self, kind: RuleKind) -> Result<RuleDetails, RepositoryError> {
        let id = self.id;
        let details = match kind {
            RuleKind::Discount => {
                let (Some(title), Some(value_type), Some(value)) = (
                    self.discount_title.take(),
                    self.discount_value_type.take(),
                    self.discount_value,
                ) else {
                    return Err(missing_details(id, kind));
                };
                RuleDetails::Discount(DiscountDetails {
                    title,
                    code: self.discount_code.take(),
                    value_type: value_type
                        .parse::<DiscountValueType>()
                        .map_err(|e| corrupt_tag(id, &e))?,
                    value,
                })
            }
            RuleKind::FreeShipping => {
                let name = self
                    .free_shipping_name
                    .take()
                    .ok_or_else(|| missing_details(id, kind))?;
                RuleDetails::FreeShipping(FreeShippingDetails { name })
            }
            RuleKind::Banner => {
                let title = self
                    .banner_title
                    .take()
                    .ok_or_else(|| missing_details(id, kind))?;
                RuleDetails::Banner(BannerDetails {
                    title,
                    link_url: self.banner_link_url.take(),
                    image_key: self.banner_image_key.take(),
                })
            }
            RuleKind::Promo => {
                let title = self
                    .promo_title
                    .take()
                    .ok_or_else(|| missing_details(id, kind))?;
                RuleDetails::Promo(PromoDetails {
                    title,
                    description: self.promo_description.take(),
                    image_key: self.promo_image_key.take(),
                })
            }
        };
        Ok(details)
    }
}

impl TryFrom<RuleRow> for Rule {
    type Error = RepositoryError;

    fn try_from(mut row: RuleRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let kind = row
            .kind
            .parse::<RuleKind>()
            .map_err(|e| corrupt_tag(id, &e))?;
        let details = row.details(kind)?;

        Ok(Self {
            id: RuleId::new(id),
            details,
            apply_type: row
                .apply_type
                .parse::<ApplyType>()
                .map_err(|e| corrupt_tag(id, &e))?,
            eligibility_type: row
                .eligibility_type
                .parse::<EligibilityType>()
                .map_err(|e| corrupt_tag(id, &e))?,
            limits: RuleLimits {
                minimum_type: row
                    .minimum_type
                    .parse::<MinimumType>()
                    .map_err(|e| corrupt_tag(id, &e))?,
                minimum: row.minimum,
                max_total_use: row.max_total_use,
                max_user_once: row.max_user_once,
            },
            schedule: RuleSchedule {
                start_at: row.start_at,
                end_at: row.end_at,
                active_override: row.active_override,
            },
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for rule rows and their kind detail rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleRepository;

impl RuleRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Get a rule of `kind` by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if stored tags or details are invalid.
    pub async fn find(
        &self,
        conn: &mut PgConnection,
        kind: RuleKind,
        id: RuleId,
    ) -> Result<Option<Rule>, RepositoryError> {
        let row = sqlx::query_as::<_, RuleRow>(select_rules!("WHERE r.id = $1 AND r.kind = $2"))
            .bind(id)
            .bind(kind.as_str())
            .fetch_optional(conn)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a rule of `kind` with its targets and eligibility, status derived at `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if the rule or an association row is invalid.
    pub async fn find_view(
        &self,
        conn: &mut PgConnection,
        kind: RuleKind,
        id: RuleId,
        now: DateTime<Utc>,
    ) -> Result<Option<RuleView>, RepositoryError> {
        let Some(rule) = self.find(conn, kind, id).await? else {
            return Ok(None);
        };

        let targets = associations::load_targets(conn, id, rule.apply_type).await?;
        let eligibility = associations::load_eligibility(conn, id, rule.eligibility_type).await?;

        Ok(Some(RuleView::new(rule, &targets, &eligibility, now)))
    }

    /// Get a rule of `kind` by ID and lock its row until the transaction ends.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if stored tags or details are invalid.
    pub async fn find_for_update(
        &self,
        conn: &mut PgConnection,
        kind: RuleKind,
        id: RuleId,
    ) -> Result<Option<Rule>, RepositoryError> {
        let row = sqlx::query_as::<_, RuleRow>(select_rules!(
            "WHERE r.id = $1 AND r.kind = $2 FOR UPDATE OF r"
        ))
        .bind(id)
        .bind(kind.as_str())
        .fetch_optional(conn)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List rules of `kind`, newest first. `page` is `(limit, offset)`; `None` returns all.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if any row is invalid.
    pub async fn list(
        &self,
        conn: &mut PgConnection,
        kind: RuleKind,
        page: Option<(i64, i64)>,
    ) -> Result<Vec<Rule>, RepositoryError> {
        let (limit, offset) = page.map_or((None, 0), |(limit, offset)| (Some(limit), offset));

        let rows = sqlx::query_as::<_, RuleRow>(select_rules!(
            "WHERE r.kind = $1 ORDER BY r.created_at DESC, r.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(kind.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(conn)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Insert a rule and its detail row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a duplicate free-shipping name or discount code.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        input: &RuleInput,
    ) -> Result<RuleId, RepositoryError> {
        let id: RuleId = sqlx::query_scalar(
            r"
            INSERT INTO admin.rules (
                kind, apply_type, eligibility_type, minimum_type, minimum,
                max_total_use, max_user_once, start_at, end_at, active_override
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            ",
        )
        .bind(input.kind().as_str())
        .bind(input.targets.apply_type().as_str())
        .bind(input.eligibility.eligibility_type().as_str())
        .bind(input.limits.minimum_type.as_str())
        .bind(input.limits.minimum)
        .bind(input.limits.max_total_use)
        .bind(input.limits.max_user_once)
        .bind(input.schedule.start_at)
        .bind(input.schedule.end_at)
        .bind(input.schedule.active_override)
        .fetch_one(&mut *conn)
        .await?;

        insert_details(conn, id, &input.details).await?;

        Ok(id)
    }

    /// Overwrite a rule's scalars and details and bump its version.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the rule row is gone.
    /// Returns `RepositoryError::Conflict` on a duplicate free-shipping name or discount code.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        conn: &mut PgConnection,
        id: RuleId,
        input: &RuleInput,
    ) -> Result<i32, RepositoryError> {
        let version: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE admin.rules
            SET apply_type = $2, eligibility_type = $3, minimum_type = $4, minimum = $5,
                max_total_use = $6, max_user_once = $7, start_at = $8, end_at = $9,
                active_override = $10, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND kind = $11
            RETURNING version
            ",
        )
        .bind(id)
        .bind(input.targets.apply_type().as_str())
        .bind(input.eligibility.eligibility_type().as_str())
        .bind(input.limits.minimum_type.as_str())
        .bind(input.limits.minimum)
        .bind(input.limits.max_total_use)
        .bind(input.limits.max_user_once)
        .bind(input.schedule.start_at)
        .bind(input.schedule.end_at)
        .bind(input.schedule.active_override)
        .bind(input.kind().as_str())
        .fetch_optional(&mut *conn)
        .await?;

        let version = version.ok_or(RepositoryError::NotFound)?;

        update_details(conn, id, &input.details).await?;

        Ok(version)
    }

    /// Set or clear the admin override and bump the version.
    ///
    /// Returns the new version, or `None` if no rule of `kind` has this ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_override(
        &self,
        conn: &mut PgConnection,
        kind: RuleKind,
        id: RuleId,
        active_override: Option<bool>,
    ) -> Result<Option<i32>, RepositoryError> {
        let version = sqlx::query_scalar(
            r"
            UPDATE admin.rules
            SET active_override = $3, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND kind = $2
            RETURNING version
            ",
        )
        .bind(id)
        .bind(kind.as_str())
        .bind(active_override)
        .fetch_optional(conn)
        .await?;

        Ok(version)
    }

    /// Delete a rule. Detail and association rows cascade.
    ///
    /// Returns `true` if a rule was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(
        &self,
        conn: &mut PgConnection,
        kind: RuleKind,
        id: RuleId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM admin.rules WHERE id = $1 AND kind = $2")
            .bind(id)
            .bind(kind.as_str())
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

async fn insert_details(
    conn: &mut PgConnection,
    id: RuleId,
    details: &RuleDetails,
) -> Result<(), RepositoryError> {
    let query = match details {
        RuleDetails::Discount(discount) => sqlx::query(
            r"
            INSERT INTO admin.discount_rules (rule_id, title, code, value_type, value)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(id)
        .bind(&discount.title)
        .bind(&discount.code)
        .bind(discount.value_type.as_str())
        .bind(discount.value),
        RuleDetails::FreeShipping(shipping) => {
            sqlx::query("INSERT INTO admin.free_shipping_rules (rule_id, name) VALUES ($1, $2)")
                .bind(id)
                .bind(&shipping.name)
        }
        RuleDetails::Banner(banner) => sqlx::query(
            r"
            INSERT INTO admin.banner_rules (rule_id, title, link_url, image_key)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(id)
        .bind(&banner.title)
        .bind(&banner.link_url)
        .bind(&banner.image_key),
        RuleDetails::Promo(promo) => sqlx::query(
            r"
            INSERT INTO admin.promo_rules (rule_id, title, description, image_key)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(id)
        .bind(&promo.title)
        .bind(&promo.description)
        .bind(&promo.image_key),
    };

    query.execute(conn).await.map_err(map_unique_violation)?;

    Ok(())
}

async fn update_details(
    conn: &mut PgConnection,
    id: RuleId,
    details: &RuleDetails,
) -> Result<(), RepositoryError> {
    let query = match details {
        RuleDetails::Discount(discount) => sqlx::query(
            r"
            UPDATE admin.discount_rules
            SET title = $2, code = $3, value_type = $4, value = $5
            WHERE rule_id = $1
            ",
        )
        .bind(id)
        .bind(&discount.title)
        .bind(&discount.code)
        .bind(discount.value_type.as_str())
        .bind(discount.value),
        RuleDetails::FreeShipping(shipping) => {
            sqlx::query("UPDATE admin.free_shipping_rules SET name = $2 WHERE rule_id = $1")
                .bind(id)
                .bind(&shipping.name)
        }
        RuleDetails::Banner(banner) => sqlx::query(
            r"
            UPDATE admin.banner_rules
            SET title = $2, link_url = $3, image_key = $4
            WHERE rule_id = $1
            ",
        )
        .bind(id)
        .bind(&banner.title)
        .bind(&banner.link_url)
        .bind(&banner.image_key),
        RuleDetails::Promo(promo) => sqlx::query(
            r"
            UPDATE admin.promo_rules
            SET title = $2, description = $3, image_key = $4
            WHERE rule_id = $1
            ",
        )
        .bind(id)
        .bind(&promo.title)
        .bind(&promo.description)
        .bind(&promo.image_key),
    };

    let result = query.execute(conn).await.map_err(map_unique_violation)?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::DataCorruption(format!(
            "rule {id} has no {} details",
            details.kind()
        )));
    }

    Ok(())
}
