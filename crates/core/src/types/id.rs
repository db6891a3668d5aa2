//! Rule identity.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Database ID of a rule, shared by every rule kind.
///
/// The ID alone does not say which kind a rule is; lookups always pair it
/// with a [`RuleKind`](crate::RuleKind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
#[serde(transparent)]
pub struct RuleId(i32);

impl RuleId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RuleId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<i32> for RuleId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_plain_integer() {
        let id = RuleId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        assert_eq!(serde_json::from_str::<RuleId>("7").unwrap(), RuleId::new(7));
    }

    #[test]
    fn test_parse_from_cli_argument() {
        assert_eq!(" 12 ".parse::<RuleId>().unwrap(), RuleId::new(12));
        assert!("twelve".parse::<RuleId>().is_err());
    }
}
