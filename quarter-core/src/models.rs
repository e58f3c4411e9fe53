use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::slot::SlotIter;

/// What a user is allowed to do. The set is closed; policy checks match on it
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Publishes availability windows.
    Provider,
    /// Books slots inside a provider's availability.
    Client,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Provider => "PROVIDER",
            UserRole::Client => "CLIENT",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROVIDER" => Ok(UserRole::Provider),
            "CLIENT" => Ok(UserRole::Client),
            other => Err(format!("unknown user role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub role: UserRole,
}

impl User {
    pub fn new(role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub role: UserRole,
}

/// An open window during which a provider accepts bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Availability {
    pub fn new(provider_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider_id,
            start,
            end,
        }
    }

    /// True if `[start, end)` lies entirely inside this window.
    pub fn covers(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start <= start && self.end >= end
    }

    pub fn slots(&self) -> SlotIter {
        SlotIter::new(self.start, self.end)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAvailability {
    pub provider_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Filter for availability listings. A window matches when it covers the
/// requested bounds, not when it merely intersects them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expand: bool,
}

/// A matched window expanded into its bookable slot starts.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilitySlots {
    pub availability_id: Uuid,
    pub provider_id: Uuid,
    pub slots: SlotIter,
}

impl From<&Availability> for AvailabilitySlots {
    fn from(availability: &Availability) -> Self {
        Self {
            availability_id: availability.id,
            provider_id: availability.provider_id,
            slots: availability.slots(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AvailabilityListing {
    Windows(Vec<Availability>),
    Slots(Vec<AvailabilitySlots>),
}

impl AvailabilityListing {
    pub fn len(&self) -> usize {
        match self {
            AvailabilityListing::Windows(w) => w.len(),
            AvailabilityListing::Slots(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lifecycle state of a reservation at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Expired,
}

/// One booked 15 minute slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub client_id: Uuid,
    pub provider_id: Uuid,
    pub reservation_time: DateTime<Utc>,
    pub expiration: DateTime<Utc>,
    pub confirmed: bool,
}

impl Reservation {
    /// A fresh, unconfirmed hold that lapses `hold` after `now`.
    pub fn new(
        client_id: Uuid,
        provider_id: Uuid,
        reservation_time: DateTime<Utc>,
        now: DateTime<Utc>,
        hold: TimeDelta,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            provider_id,
            reservation_time,
            expiration: now + hold,
            confirmed: false,
        }
    }

    /// A live reservation blocks its slot. Confirmed reservations stay live
    /// past their expiration.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.confirmed || self.expiration > now
    }

    /// Past expiration no field may change, confirmed or not.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration < now
    }

    pub fn status(&self, now: DateTime<Utc>) -> ReservationStatus {
        if self.confirmed {
            ReservationStatus::Confirmed
        } else if self.is_live(now) {
            ReservationStatus::Pending
        } else {
            ReservationStatus::Expired
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReservation {
    pub reservation_time: DateTime<Utc>,
    pub client_id: Uuid,
    pub provider_id: Uuid,
}

/// Mutable fields of a reservation. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReservationUpdate {
    pub confirmed: Option<bool>,
}

impl ReservationUpdate {
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_none()
    }

    pub fn apply(&self, reservation: &Reservation) -> Reservation {
        Reservation {
            confirmed: self.confirmed.unwrap_or(reservation.confirmed),
            ..reservation.clone()
        }
    }
}
