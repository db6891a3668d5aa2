//! Association set reconciliation planning.
//!
//! Given what is stored for a rule and what the rule should now hold, compute
//! the smallest set of writes that gets from one to the other. Planning is
//! pure; applying a plan is the storage layer's job and must happen inside the
//! same transaction as the rest of the rule update.
//!
//! Two regimes:
//!
//! - **Discriminator changed.** Stored rows belong to the old discriminator and
//!   are not comparable with the requested set, even where identifiers happen
//!   to coincide. Every stored row is cleared and the requested set is inserted
//!   in full.
//! - **Discriminator unchanged.** Only the symmetric difference is written:
//!   `requested - existing` is inserted, `existing - requested` is deleted, and
//!   the intersection is left alone.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::registry::{
    AssociationTable, ELIGIBILITY_TABLE, TARGET_TABLE, eligibility_binding, target_binding,
};
use crate::types::{ApplyType, EligibilitySet, EligibilityType, TargetSet};

/// A requested association set for one dimension of a rule.
pub trait AssociationSet {
    /// The tag that decides how this dimension's rows are stored.
    type Discriminator: Copy + Eq + fmt::Debug + fmt::Display;

    /// Table holding this dimension's rows.
    const TABLE: &'static AssociationTable;

    /// Current discriminator of the set.
    fn discriminator(&self) -> Self::Discriminator;

    /// Row kind tag for a discriminator, or `None` if it stores no rows.
    fn row_tag(discriminator: Self::Discriminator) -> Option<&'static str>;

    /// Stored values of the members.
    fn keys(&self) -> BTreeSet<String>;
}

impl AssociationSet for TargetSet {
    type Discriminator = ApplyType;

    const TABLE: &'static AssociationTable = &TARGET_TABLE;

    fn discriminator(&self) -> ApplyType {
        self.apply_type()
    }

    fn row_tag(discriminator: ApplyType) -> Option<&'static str> {
        Some(target_binding(discriminator).row_tag)
    }

    fn keys(&self) -> BTreeSet<String> {
        self.ids().iter().map(|id| id.as_str().to_owned()).collect()
    }
}

impl AssociationSet for EligibilitySet {
    type Discriminator = EligibilityType;

    const TABLE: &'static AssociationTable = &ELIGIBILITY_TABLE;

    fn discriminator(&self) -> EligibilityType {
        self.eligibility_type()
    }

    fn row_tag(discriminator: EligibilityType) -> Option<&'static str> {
        eligibility_binding(discriminator).map(|binding| binding.row_tag)
    }

    fn keys(&self) -> BTreeSet<String> {
        self.values().map(str::to_owned).collect()
    }
}

/// The writes needed to bring one dimension in line with a requested set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcilePlan {
    /// Delete every stored row of the dimension before inserting.
    pub clear_all: bool,
    /// Row kind tag the inserted rows carry. `None` when nothing is stored.
    pub row_tag: Option<&'static str>,
    /// Values to insert.
    pub insert: BTreeSet<String>,
    /// Values to delete. Always empty when `clear_all` is set.
    pub delete: BTreeSet<String>,
}

impl ReconcilePlan {
    /// Whether applying this plan writes nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.clear_all && self.insert.is_empty() && self.delete.is_empty()
    }
}

/// Plan the reconciliation of one dimension.
///
/// `existing` holds the values stored under `previous`, as read through the
/// registry binding of `previous`.
#[must_use]
pub fn plan<S: AssociationSet>(
    previous: S::Discriminator,
    existing: &BTreeSet<String>,
    requested: &S,
) -> ReconcilePlan {
    let next = requested.discriminator();
    let row_tag = S::row_tag(next);

    let wanted = if row_tag.is_some() {
        requested.keys()
    } else {
        BTreeSet::new()
    };

    if previous != next {
        return ReconcilePlan {
            clear_all: true,
            row_tag,
            insert: wanted,
            delete: BTreeSet::new(),
        };
    }

    ReconcilePlan {
        clear_all: false,
        row_tag,
        insert: wanted.difference(existing).cloned().collect(),
        delete: existing.difference(&wanted).cloned().collect(),
    }
}

/// Rows actually written while applying a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReconcileOutcome {
    pub inserted: u64,
    pub deleted: u64,
}

impl ReconcileOutcome {
    /// Total number of rows written.
    #[must_use]
    pub const fn writes(&self) -> u64 {
        self.inserted + self.deleted
    }
}

impl std::ops::Add for ReconcileOutcome {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            inserted: self.inserted + rhs.inserted,
            deleted: self.deleted + rhs.deleted,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{CustomerRole, ExternalId};

    fn ids(values: &[&str]) -> Vec<ExternalId> {
        values.iter().map(|v| ExternalId::parse(v).unwrap()).collect()
    }

    fn keys(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn test_unchanged_discriminator_writes_only_the_delta() {
        let requested = TargetSet::new(ApplyType::Categories, ids(&["B", "C", "D"]));
        let plan = plan(ApplyType::Categories, &keys(&["A", "B", "C"]), &requested);

        assert!(!plan.clear_all);
        assert_eq!(plan.row_tag, Some("category"));
        assert_eq!(plan.insert, keys(&["D"]));
        assert_eq!(plan.delete, keys(&["A"]));
    }

    #[test]
    fn test_identical_set_is_noop() {
        let requested = TargetSet::new(ApplyType::Pets, ids(&["dog", "cat"]));
        let plan = plan(ApplyType::Pets, &keys(&["cat", "dog"]), &requested);
        assert!(plan.is_noop());
    }

    #[test]
    fn test_changed_discriminator_replaces_everything() {
        let requested = TargetSet::new(ApplyType::Products, ids(&["x"]));
        let plan = plan(ApplyType::Categories, &keys(&["x"]), &requested);

        assert!(plan.clear_all);
        assert_eq!(plan.row_tag, Some("product"));
        assert_eq!(plan.insert, keys(&["x"]));
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn test_changed_discriminator_with_no_stored_rows_still_clears() {
        let requested = EligibilitySet::roles([CustomerRole::Member]);
        let plan = plan(EligibilityType::All, &BTreeSet::new(), &requested);
        assert!(plan.clear_all);
        assert_eq!(plan.insert, keys(&["member"]));
        assert!(!plan.is_noop());
    }

    #[test]
    fn test_transition_into_all_clears_without_inserts() {
        let plan = plan(
            EligibilityType::User,
            &keys(&["u-1", "u-2"]),
            &EligibilitySet::all(),
        );
        assert!(plan.clear_all);
        assert_eq!(plan.row_tag, None);
        assert!(plan.insert.is_empty());
    }

    #[test]
    fn test_all_to_all_is_noop() {
        let plan = plan(EligibilityType::All, &BTreeSet::new(), &EligibilitySet::all());
        assert!(plan.is_noop());
    }

    #[test]
    fn test_empty_requested_set_deletes_everything_stored() {
        let requested = EligibilitySet::users([]);
        let plan = plan(EligibilityType::User, &keys(&["u-1"]), &requested);
        assert!(!plan.clear_all);
        assert_eq!(plan.delete, keys(&["u-1"]));
        assert!(plan.insert.is_empty());
    }

    #[test]
    fn test_role_values_use_wire_tags() {
        let requested = EligibilitySet::roles([CustomerRole::Wholesale, CustomerRole::Customer]);
        let plan = plan(EligibilityType::Role, &keys(&["customer"]), &requested);
        assert_eq!(plan.insert, keys(&["wholesale"]));
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn test_outcome_addition() {
        let a = ReconcileOutcome {
            inserted: 1,
            deleted: 2,
        };
        let b = ReconcileOutcome {
            inserted: 3,
            deleted: 0,
        };
        assert_eq!((a + b).writes(), 6);
        assert_eq!(ReconcileOutcome::default().writes(), 0);
    }
}
