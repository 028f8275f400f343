//! Identifiers and caller roles.
//!
//! Every identifier is a newtype around a [`Uuid`] so that a restaurant id can
//! never be passed where a complaint id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a user (customer, owner, official or admin)
    UserId
);

define_id!(
    /// Unique identifier for a restaurant aggregate
    RestaurantId
);

define_id!(
    /// Unique identifier for a complaint, unique across all restaurants
    ComplaintId
);

define_id!(
    /// Unique identifier for a notification
    NotificationId
);

/// Role held by an authenticated caller.
///
/// The wire names match the role strings issued by the identity provider, so
/// `FoodSafetyOfficer` travels as `FoodSafetyOfficeUser`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Platform administrator
    Admin,
    /// Customer filing reviews and complaints
    Customer,
    /// Owner of one or more restaurants
    RestaurantOwner,
    /// Official allowed to move complaints through the status workflow
    #[serde(rename = "FoodSafetyOfficeUser")]
    FoodSafetyOfficer,
}

impl Role {
    /// Wire representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Customer => "Customer",
            Self::RestaurantOwner => "RestaurantOwner",
            Self::FoodSafetyOfficer => "FoodSafetyOfficeUser",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role string is not recognised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown role: {0}")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Admin" => Ok(Self::Admin),
            "Customer" => Ok(Self::Customer),
            "RestaurantOwner" => Ok(Self::RestaurantOwner),
            "FoodSafetyOfficeUser" | "FoodSafetyOfficer" => Ok(Self::FoodSafetyOfficer),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}
