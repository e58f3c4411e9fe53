//! In-memory collaborators, used by tests and by the `memory` storage backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Availability, Reservation, ReservationUpdate, User};
use crate::repository::{AvailabilityStore, ReservationLedger, StoreResult, UserRepository};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: &User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(format!("duplicate user id {}", user.id).into());
        }
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryAvailabilityStore {
    windows: RwLock<HashMap<Uuid, Vec<Availability>>>,
}

impl InMemoryAvailabilityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryAvailabilityStore {
    async fn find_covering(
        &self,
        provider_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Availability>> {
        let windows = self.windows.read().await;
        let mut found: Vec<Availability> = windows
            .get(&provider_id)
            .into_iter()
            .flatten()
            .filter(|w| start.map_or(true, |s| w.start <= s))
            .filter(|w| end.map_or(true, |e| w.end >= e))
            .cloned()
            .collect();
        found.sort_by_key(|w| w.start);
        Ok(found)
    }

    async fn insert(&self, availability: &Availability) -> StoreResult<Availability> {
        self.windows
            .write()
            .await
            .entry(availability.provider_id)
            .or_default()
            .push(availability.clone());
        Ok(availability.clone())
    }
}

#[derive(Default)]
pub struct InMemoryReservationLedger {
    reservations: RwLock<HashMap<Uuid, Reservation>>,
}

impl InMemoryReservationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored reservation for a slot, live or not.
    pub async fn all_for_slot(
        &self,
        provider_id: Uuid,
        slot_time: DateTime<Utc>,
    ) -> Vec<Reservation> {
        self.reservations
            .read()
            .await
            .values()
            .filter(|r| r.provider_id == provider_id && r.reservation_time == slot_time)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ReservationLedger for InMemoryReservationLedger {
    async fn find_live(
        &self,
        provider_id: Uuid,
        slot_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Reservation>> {
        Ok(self
            .reservations
            .read()
            .await
            .values()
            .filter(|r| {
                r.provider_id == provider_id && r.reservation_time == slot_time && r.is_live(now)
            })
            .cloned()
            .collect())
    }

    async fn insert(&self, reservation: &Reservation) -> StoreResult<Reservation> {
        let mut reservations = self.reservations.write().await;
        if reservations.contains_key(&reservation.id) {
            return Err(format!("duplicate reservation id {}", reservation.id).into());
        }
        reservations.insert(reservation.id, reservation.clone());
        Ok(reservation.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Reservation>> {
        Ok(self.reservations.read().await.get(&id).cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        update: &ReservationUpdate,
    ) -> StoreResult<Option<Reservation>> {
        let mut reservations = self.reservations.write().await;
        Ok(reservations.get_mut(&id).map(|r| {
            *r = update.apply(r);
            r.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn window(provider: Uuid, start: &str, end: &str) -> Availability {
        Availability::new(provider, at(start), at(end))
    }

    #[tokio::test]
    async fn test_find_covering_filters() {
        let store = InMemoryAvailabilityStore::new();
        let provider = Uuid::new_v4();
        let morning = window(provider, "2025-01-10T09:00:00Z", "2025-01-10T12:00:00Z");
        let evening = window(provider, "2025-01-10T17:00:00Z", "2025-01-10T18:00:00Z");
        store.insert(&evening).await.unwrap();
        store.insert(&morning).await.unwrap();
        store
            .insert(&window(Uuid::new_v4(), "2025-01-10T09:00:00Z", "2025-01-10T18:00:00Z"))
            .await
            .unwrap();

        let all = store.find_covering(provider, None, None).await.unwrap();
        assert_eq!(all, vec![morning.clone(), evening.clone()]);

        let covering = store
            .find_covering(
                provider,
                Some(at("2025-01-10T10:00:00Z")),
                Some(at("2025-01-10T10:15:00Z")),
            )
            .await
            .unwrap();
        assert_eq!(covering, vec![morning]);

        let straddling = store
            .find_covering(
                provider,
                Some(at("2025-01-10T11:45:00Z")),
                Some(at("2025-01-10T17:15:00Z")),
            )
            .await
            .unwrap();
        assert!(straddling.is_empty());
    }

    #[tokio::test]
    async fn test_find_live_skips_lapsed_holds() {
        let ledger = InMemoryReservationLedger::new();
        let provider = Uuid::new_v4();
        let slot = at("2025-01-10T09:00:00Z");
        let created = at("2025-01-08T09:00:00Z");

        let hold = Reservation::new(
            Uuid::new_v4(),
            provider,
            slot,
            created,
            TimeDelta::minutes(30),
        );
        ledger.insert(&hold).await.unwrap();

        assert_eq!(ledger.find_live(provider, slot, created).await.unwrap().len(), 1);
        let lapsed = created + TimeDelta::hours(1);
        assert!(ledger.find_live(provider, slot, lapsed).await.unwrap().is_empty());

        ledger
            .update(hold.id, &ReservationUpdate { confirmed: Some(true) })
            .await
            .unwrap();
        assert_eq!(ledger.find_live(provider, slot, lapsed).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let ledger = InMemoryReservationLedger::new();
        let updated = ledger
            .update(Uuid::new_v4(), &ReservationUpdate { confirmed: Some(true) })
            .await
            .unwrap();
        assert!(updated.is_none());
    }
}
