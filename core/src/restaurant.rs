//! The Restaurant aggregate and its optimistic-concurrency version.
//!
//! A restaurant exclusively owns its complaints. Stores persist the aggregate
//! as one document and use [`Version`] to detect concurrent writers: a save
//! carries the version that was loaded, and the store rejects it if the
//! persisted version has moved on.

use crate::complaint::ComplaintRecord;
use crate::types::{ComplaintId, RestaurantId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Revision number of a persisted aggregate.
///
/// A newly inserted aggregate is at [`Version::INITIAL`]; each successful save
/// moves it to [`Version::next`].
///
/// # Examples
///
/// ```
/// use complaint_desk_core::restaurant::Version;
///
/// let v0 = Version::INITIAL;
/// assert_eq!(v0.next(), Version::new(1));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// Version of a freshly inserted aggregate.
    pub const INITIAL: Self = Self(0);

    /// Create a new `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id and name of a restaurant, attached to complaint views.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantSummary {
    /// Restaurant id
    pub id: RestaurantId,
    /// Display name
    pub name: String,
}

/// Restaurant aggregate.
///
/// The `version` is bookkeeping owned by the store and is not part of the
/// persisted document.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    id: RestaurantId,
    name: String,
    owner: UserId,
    complaints: Vec<ComplaintRecord>,
    created_at: DateTime<Utc>,
    #[serde(skip)]
    version: Version,
}

impl Restaurant {
    /// Create a restaurant with no complaints at the initial version.
    #[must_use]
    pub fn new(
        id: RestaurantId,
        name: impl Into<String>,
        owner: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            owner,
            complaints: Vec::new(),
            created_at,
            version: Version::INITIAL,
        }
    }

    /// Restaurant id
    #[must_use]
    pub const fn id(&self) -> RestaurantId {
        self.id
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owner, the default recipient of complaint notifications
    #[must_use]
    pub const fn owner(&self) -> UserId {
        self.owner
    }

    /// Complaints in filing order
    #[must_use]
    pub fn complaints(&self) -> &[ComplaintRecord] {
        &self.complaints
    }

    /// When the restaurant was registered
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Version this copy was loaded at
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Stamp the version the copy was loaded at. Used by stores only.
    #[must_use]
    pub const fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Id and name
    #[must_use]
    pub fn summary(&self) -> RestaurantSummary {
        RestaurantSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }

    /// Find a complaint by id.
    #[must_use]
    pub fn complaint(&self, id: ComplaintId) -> Option<&ComplaintRecord> {
        self.complaints.iter().find(|c| c.id() == id)
    }

    /// Append a newly filed complaint.
    ///
    /// Returns `false` (and leaves the aggregate untouched) if the complaint
    /// belongs to another restaurant or its id is already present.
    pub fn add_complaint(&mut self, complaint: ComplaintRecord) -> bool {
        if complaint.restaurant_id() != self.id || self.complaint(complaint.id()).is_some() {
            return false;
        }
        self.complaints.push(complaint);
        true
    }

    /// Replace an existing complaint with a newer revision, keeping its position.
    ///
    /// Returns `false` if no complaint with that id exists.
    pub fn replace_complaint(&mut self, updated: ComplaintRecord) -> bool {
        match self.complaints.iter_mut().find(|c| c.id() == updated.id()) {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => false,
        }
    }
}
