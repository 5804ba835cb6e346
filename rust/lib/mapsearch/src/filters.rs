//! Member search filters.
//!
//! [`FilterSet`] is the committed, normalized form: a field that is `None`
//! means "no constraint", and no field ever holds its sentinel value, so two
//! logically equal filter sets are always `==`. [`FilterPatch`] is the raw
//! partial input a dialog or a shared link produces; it becomes a
//! `FilterSet` only through [`FilterSet::merged`].

use serde::{Deserialize, Deserializer, Serialize};

/// Lower bound of the age slider; an `age_min` equal to it is no constraint.
pub const DEFAULT_AGE_MIN: u32 = 18;

/// Upper bound of the age slider; an `age_max` equal to it is no constraint.
pub const DEFAULT_AGE_MAX: u32 = 120;

// ── Enumerations ────────────────────────────────────────────────────

/// Hosting status a member advertises. Discriminants are the API wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum HostingStatus {
    CanHost = 2,
    Maybe = 3,
    CantHost = 4,
}

/// Meetup status a member advertises. Discriminants are the API wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum MeetupStatus {
    WantsToMeetup = 2,
    OpenToMeetup = 3,
    DoesNotWantToMeetup = 4,
}

/// Sleeping arrangement a host offers. Discriminants are the API wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum SleepingArrangement {
    Private = 2,
    Common = 3,
    SharedRoom = 4,
}

impl HostingStatus {
    pub fn wire(self) -> i32 {
        self as i32
    }

    pub fn from_wire(v: i32) -> Option<Self> {
        match v {
            2 => Some(Self::CanHost),
            3 => Some(Self::Maybe),
            4 => Some(Self::CantHost),
            _ => None,
        }
    }
}

impl MeetupStatus {
    pub fn wire(self) -> i32 {
        self as i32
    }

    pub fn from_wire(v: i32) -> Option<Self> {
        match v {
            2 => Some(Self::WantsToMeetup),
            3 => Some(Self::OpenToMeetup),
            4 => Some(Self::DoesNotWantToMeetup),
            _ => None,
        }
    }
}

impl SleepingArrangement {
    pub fn wire(self) -> i32 {
        self as i32
    }

    pub fn from_wire(v: i32) -> Option<Self> {
        match v {
            2 => Some(Self::Private),
            3 => Some(Self::Common),
            4 => Some(Self::SharedRoom),
            _ => None,
        }
    }
}

/// "Last active within" recency bucket. Serialized as its number of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum LastActive {
    Any,
    LastWeek,
    LastMonth,
    LastThreeMonths,
    LastSixMonths,
    LastYear,
}

impl LastActive {
    pub fn days(self) -> u32 {
        match self {
            LastActive::Any => 0,
            LastActive::LastWeek => 7,
            LastActive::LastMonth => 31,
            LastActive::LastThreeMonths => 93,
            LastActive::LastSixMonths => 183,
            LastActive::LastYear => 365,
        }
    }

    pub fn from_days(days: u32) -> Option<Self> {
        match days {
            0 => Some(LastActive::Any),
            7 => Some(LastActive::LastWeek),
            31 => Some(LastActive::LastMonth),
            93 => Some(LastActive::LastThreeMonths),
            183 => Some(LastActive::LastSixMonths),
            365 => Some(LastActive::LastYear),
            _ => None,
        }
    }
}

impl TryFrom<u32> for LastActive {
    type Error = String;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        LastActive::from_days(days).ok_or_else(|| format!("unsupported lastActive bucket: {days}"))
    }
}

impl From<LastActive> for u32 {
    fn from(v: LastActive) -> Self {
        v.days()
    }
}

// ── FilterSet ───────────────────────────────────────────────────────

/// Committed filters. `None` everywhere is the unconstrained set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_kids: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_pets: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_last_min_requests: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drinking_allowed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smokes_at_home: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete_profile: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_references: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_strong_verification: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosting_status: Option<Vec<HostingStatus>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meetup_status: Option<Vec<MeetupStatus>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleeping_arrangement: Option<Vec<SleepingArrangement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_guests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active: Option<LastActive>,
}

impl FilterSet {
    /// True when at least one field constrains the search.
    pub fn has_active(&self) -> bool {
        *self != FilterSet::default()
    }

    /// Apply `patch` on top of `self`, collapsing every sentinel to absence.
    ///
    /// Fields not present in the patch keep their committed value.
    pub fn merged(&self, patch: &FilterPatch) -> FilterSet {
        let mut next = self.clone();

        if let Some(v) = patch.age_min {
            next.age_min = (v != DEFAULT_AGE_MIN).then_some(v);
        }
        if let Some(v) = patch.age_max {
            next.age_max = (v != DEFAULT_AGE_MAX).then_some(v);
        }
        if let Some(v) = patch.accepts_kids {
            next.accepts_kids = flag(v);
        }
        if let Some(v) = patch.accepts_pets {
            next.accepts_pets = flag(v);
        }
        if let Some(v) = patch.accepts_last_min_requests {
            next.accepts_last_min_requests = flag(v);
        }
        if let Some(v) = patch.complete_profile {
            next.complete_profile = flag(v);
        }
        if let Some(v) = patch.has_references {
            next.has_references = flag(v);
        }
        if let Some(v) = patch.has_strong_verification {
            next.has_strong_verification = flag(v);
        }
        // Tri-state: false is a real constraint, only null clears.
        if let Some(v) = patch.drinking_allowed {
            next.drinking_allowed = v;
        }
        if let Some(v) = patch.smokes_at_home {
            next.smokes_at_home = v;
        }
        if let Some(v) = &patch.hosting_status {
            next.hosting_status = selection(v);
        }
        if let Some(v) = &patch.meetup_status {
            next.meetup_status = selection(v);
        }
        if let Some(v) = &patch.sleeping_arrangement {
            next.sleeping_arrangement = selection(v);
        }
        if let Some(v) = patch.num_guests {
            next.num_guests = (v != 0).then_some(v);
        }
        if let Some(v) = patch.last_active {
            next.last_active = (v != LastActive::Any).then_some(v);
        }

        next
    }
}

fn flag(v: bool) -> Option<bool> {
    v.then_some(true)
}

/// Empty selection is no constraint; order and duplicates are not meaningful.
fn selection<T: Copy + Ord>(items: &[T]) -> Option<Vec<T>> {
    if items.is_empty() {
        return None;
    }
    let mut v = items.to_vec();
    v.sort();
    v.dedup();
    Some(v)
}

// ── FilterPatch ─────────────────────────────────────────────────────

/// Partial, un-normalized filter input.
///
/// `None` means "not part of this patch". The tri-state fields use a nested
/// option so a patch can carry "clear this" (`Some(None)`, JSON `null`)
/// separately from "leave it alone" (field missing).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_kids: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_pets: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_last_min_requests: Option<bool>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub drinking_allowed: Option<Option<bool>>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub smokes_at_home: Option<Option<bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete_profile: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_references: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_strong_verification: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosting_status: Option<Vec<HostingStatus>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meetup_status: Option<Vec<MeetupStatus>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleeping_arrangement: Option<Vec<SleepingArrangement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_guests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active: Option<LastActive>,
}

/// A field that is present in the input, even as `null`, is `Some`.
fn present<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

impl FilterPatch {
    /// A patch touching every field with its sentinel value.
    /// Applying it is equivalent to resetting the filters.
    pub fn sentinels() -> Self {
        Self {
            age_min: Some(DEFAULT_AGE_MIN),
            age_max: Some(DEFAULT_AGE_MAX),
            accepts_kids: Some(false),
            accepts_pets: Some(false),
            accepts_last_min_requests: Some(false),
            drinking_allowed: Some(None),
            smokes_at_home: Some(None),
            complete_profile: Some(false),
            has_references: Some(false),
            has_strong_verification: Some(false),
            hosting_status: Some(Vec::new()),
            meetup_status: Some(Vec::new()),
            sleeping_arrangement: Some(Vec::new()),
            num_guests: Some(0),
            last_active: Some(LastActive::Any),
        }
    }

    /// A patch touching every field, carrying the committed values and the
    /// sentinels where the committed set has no constraint.
    pub fn from_committed(f: &FilterSet) -> Self {
        Self {
            age_min: Some(f.age_min.unwrap_or(DEFAULT_AGE_MIN)),
            age_max: Some(f.age_max.unwrap_or(DEFAULT_AGE_MAX)),
            accepts_kids: Some(f.accepts_kids.unwrap_or(false)),
            accepts_pets: Some(f.accepts_pets.unwrap_or(false)),
            accepts_last_min_requests: Some(f.accepts_last_min_requests.unwrap_or(false)),
            drinking_allowed: Some(f.drinking_allowed),
            smokes_at_home: Some(f.smokes_at_home),
            complete_profile: Some(f.complete_profile.unwrap_or(false)),
            has_references: Some(f.has_references.unwrap_or(false)),
            has_strong_verification: Some(f.has_strong_verification.unwrap_or(false)),
            hosting_status: Some(f.hosting_status.clone().unwrap_or_default()),
            meetup_status: Some(f.meetup_status.clone().unwrap_or_default()),
            sleeping_arrangement: Some(f.sleeping_arrangement.clone().unwrap_or_default()),
            num_guests: Some(f.num_guests.unwrap_or(0)),
            last_active: Some(f.last_active.unwrap_or(LastActive::Any)),
        }
    }

    /// Shallow merge: every field present in `other` replaces ours.
    pub fn overlay(&mut self, other: FilterPatch) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            age_min,
            age_max,
            accepts_kids,
            accepts_pets,
            accepts_last_min_requests,
            drinking_allowed,
            smokes_at_home,
            complete_profile,
            has_references,
            has_strong_verification,
            hosting_status,
            meetup_status,
            sleeping_arrangement,
            num_guests,
            last_active,
        );
    }

    pub fn is_empty(&self) -> bool {
        *self == FilterPatch::default()
    }
}
