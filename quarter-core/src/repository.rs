use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Availability, Reservation, ReservationUpdate, User};

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;
pub type StoreResult<T> = Result<T, StoreError>;

/// Repository trait for user data access
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: &User) -> StoreResult<User>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
}

/// Provider-published availability windows
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Windows of `provider_id` with `start <= start` and `end >= end` for
    /// whichever bounds are given, ordered by window start.
    async fn find_covering(
        &self,
        provider_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Availability>>;

    async fn insert(&self, availability: &Availability) -> StoreResult<Availability>;
}

/// Reservations, keyed by id and by `(provider_id, reservation_time)`.
///
/// The ledger does not enforce the one-live-reservation rule itself; callers
/// serialize `find_live` + `insert` per slot through [`crate::lock::SlotLocks`].
#[async_trait]
pub trait ReservationLedger: Send + Sync {
    /// Reservations for the exact slot that are confirmed or expire after `now`.
    async fn find_live(
        &self,
        provider_id: Uuid,
        slot_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Reservation>>;

    async fn insert(&self, reservation: &Reservation) -> StoreResult<Reservation>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Reservation>>;

    /// Apply `update` and return the stored row, or `None` if the id is unknown.
    async fn update(&self, id: Uuid, update: &ReservationUpdate)
        -> StoreResult<Option<Reservation>>;
}
