//! Marketplace user roles.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role of a signed-in marketplace user.
///
/// Only buyers own a cart. Sellers list products and services; any role the
/// API adds later deserializes as [`UserRole::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Buyer,
    Seller,
    #[serde(other)]
    Other,
}

impl UserRole {
    /// Whether this role may use the cart and checkout.
    #[must_use]
    pub const fn can_shop(&self) -> bool {
        matches!(self, Self::Buyer)
    }

    /// Get the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_role_deserializes_as_other() {
        let role: Result<UserRole, _> = serde_json::from_str("\"freelancer\"");
        assert_eq!(role.ok(), Some(UserRole::Other));
    }

    #[test]
    fn test_only_buyers_can_shop() {
        assert!(UserRole::Buyer.can_shop());
        assert!(!UserRole::Seller.can_shop());
        assert!(!UserRole::Other.can_shop());
    }

    #[test]
    fn test_role_round_trips_through_str() {
        assert_eq!("seller".parse::<UserRole>(), Ok(UserRole::Seller));
        assert!("admin".parse::<UserRole>().is_err());
    }
}
