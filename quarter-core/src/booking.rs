use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::deadline::Deadline;
use crate::error::{CoreError, CoreResult};
use crate::lock::{InProcessSlotLocks, SlotKey, SlotLocks};
use crate::models::{
    Availability, AvailabilityListing, AvailabilityQuery, AvailabilitySlots, CreateUser,
    NewAvailability, NewReservation, Reservation, ReservationUpdate, User, UserRole,
};
use crate::repository::{AvailabilityStore, ReservationLedger, UserRepository};
use crate::slot::{is_quantized, slot_length};

const USERS: &str = "user repository";
const AVAILABILITY: &str = "availability store";
const LEDGER: &str = "reservation ledger";
const LOCKS: &str = "slot lock";

/// Time-based booking rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingPolicy {
    /// How far ahead of `now` a slot must start to be bookable.
    pub min_lead_time: TimeDelta,
    /// How long an unconfirmed reservation holds its slot.
    pub hold_duration: TimeDelta,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            min_lead_time: TimeDelta::hours(24),
            hold_duration: TimeDelta::minutes(30),
        }
    }
}

/// Booking orchestration over the user, availability and reservation
/// collaborators.
pub struct BookingService {
    users: Arc<dyn UserRepository>,
    availabilities: Arc<dyn AvailabilityStore>,
    ledger: Arc<dyn ReservationLedger>,
    locks: Arc<dyn SlotLocks>,
    clock: Arc<dyn Clock>,
    policy: BookingPolicy,
}

impl BookingService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        availabilities: Arc<dyn AvailabilityStore>,
        ledger: Arc<dyn ReservationLedger>,
    ) -> Self {
        Self {
            users,
            availabilities,
            ledger,
            locks: Arc::new(InProcessSlotLocks::new()),
            clock: Arc::new(SystemClock),
            policy: BookingPolicy::default(),
        }
    }

    pub fn with_locks(mut self, locks: Arc<dyn SlotLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: BookingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> BookingPolicy {
        self.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn create_user(&self, input: CreateUser, deadline: Deadline) -> CoreResult<User> {
        let user = deadline
            .run(USERS, self.users.insert(&User::new(input.role)))
            .await?;
        info!(user_id = %user.id, role = user.role.as_str(), "User created");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid, deadline: Deadline) -> CoreResult<User> {
        deadline
            .run(USERS, self.users.find_by_id(user_id))
            .await?
            .ok_or(CoreError::UserNotFound { user_id })
    }

    /// Publish an open window for a provider.
    #[instrument(skip(self, deadline), fields(provider_id = %input.provider_id))]
    pub async fn set_availability(
        &self,
        input: NewAvailability,
        deadline: Deadline,
    ) -> CoreResult<Availability> {
        let user = self.get_user(input.provider_id, deadline).await?;
        match user.role {
            UserRole::Provider => {}
            UserRole::Client => {
                debug!("Rejected availability from non-provider");
                return Err(CoreError::NotAProvider { user_id: user.id });
            }
        }

        ensure_aligned("start", input.start)?;
        ensure_aligned("end", input.end)?;
        if input.start >= input.end {
            return Err(CoreError::InvalidWindow {
                start: input.start,
                end: input.end,
            });
        }

        let availability = Availability::new(input.provider_id, input.start, input.end);
        let availability = deadline
            .run(AVAILABILITY, self.availabilities.insert(&availability))
            .await?;

        info!(
            availability_id = %availability.id,
            start = %availability.start,
            end = %availability.end,
            "Availability published"
        );
        Ok(availability)
    }

    pub async fn get_availabilities(
        &self,
        provider_id: Uuid,
        query: AvailabilityQuery,
        deadline: Deadline,
    ) -> CoreResult<AvailabilityListing> {
        let windows = deadline
            .run(
                AVAILABILITY,
                self.availabilities
                    .find_covering(provider_id, query.start, query.end),
            )
            .await?;

        if query.expand {
            Ok(AvailabilityListing::Slots(
                windows.iter().map(AvailabilitySlots::from).collect(),
            ))
        } else {
            Ok(AvailabilityListing::Windows(windows))
        }
    }

    /// Book a single slot. Checks run in a fixed order and the first failure
    /// is returned.
    #[instrument(
        skip(self, deadline),
        fields(
            provider_id = %input.provider_id,
            client_id = %input.client_id,
            reservation_time = %input.reservation_time,
        )
    )]
    pub async fn create_reservation(
        &self,
        input: NewReservation,
        deadline: Deadline,
    ) -> CoreResult<Reservation> {
        let slot = input.reservation_time;
        ensure_aligned("reservation_time", slot)?;

        let now = self.clock.now();
        if slot <= now {
            debug!("Rejected reservation in the past");
            return Err(CoreError::PastReservation {
                reservation_time: slot,
                now,
            });
        }
        if slot - self.policy.min_lead_time < now {
            debug!("Rejected reservation inside lead time");
            return Err(CoreError::InsufficientLeadTime {
                reservation_time: slot,
                earliest: now + self.policy.min_lead_time,
            });
        }

        let covering = deadline
            .run(
                AVAILABILITY,
                self.availabilities.find_covering(
                    input.provider_id,
                    Some(slot),
                    Some(slot + slot_length()),
                ),
            )
            .await?;
        if covering.is_empty() {
            debug!("Rejected reservation outside availability");
            return Err(CoreError::NoAvailabilityForSlot {
                provider_id: input.provider_id,
                reservation_time: slot,
            });
        }

        let key = SlotKey::new(input.provider_id, slot);
        let _guard = deadline.run(LOCKS, self.locks.acquire(key)).await?;

        // The live check and the new expiration share one instant.
        let now = self.clock.now();
        let live = deadline
            .run(LEDGER, self.ledger.find_live(input.provider_id, slot, now))
            .await?;
        if !live.is_empty() {
            debug!(existing = live.len(), "Rejected reservation for booked slot");
            return Err(CoreError::SlotAlreadyBooked {
                provider_id: input.provider_id,
                client_id: input.client_id,
                reservation_time: slot,
            });
        }

        let reservation = Reservation::new(
            input.client_id,
            input.provider_id,
            slot,
            now,
            self.policy.hold_duration,
        );
        let reservation = deadline
            .run(LEDGER, self.ledger.insert(&reservation))
            .await?;

        info!(
            reservation_id = %reservation.id,
            expiration = %reservation.expiration,
            "Reservation held"
        );
        Ok(reservation)
    }

    pub async fn get_reservation(
        &self,
        reservation_id: Uuid,
        deadline: Deadline,
    ) -> CoreResult<Reservation> {
        deadline
            .run(LEDGER, self.ledger.find_by_id(reservation_id))
            .await?
            .ok_or(CoreError::ReservationNotFound { reservation_id })
    }

    /// Apply a confirmation change. Expired reservations are read-only.
    #[instrument(skip(self, deadline))]
    pub async fn update_confirmation(
        &self,
        reservation_id: Uuid,
        update: ReservationUpdate,
        deadline: Deadline,
    ) -> CoreResult<Reservation> {
        let found = self.get_reservation(reservation_id, deadline).await?;

        // Shares the booking lock, and a lapsed hold is rejected below, so a
        // confirmation cannot revive a slot that was rebooked.
        let key = SlotKey::new(found.provider_id, found.reservation_time);
        let _guard = deadline.run(LOCKS, self.locks.acquire(key)).await?;

        let current = self.get_reservation(reservation_id, deadline).await?;
        let now = self.clock.now();
        check_updatable(&current, &update, now)?;

        if update.is_empty() || update.apply(&current) == current {
            return Ok(current);
        }

        let updated = deadline
            .run(LEDGER, self.ledger.update(reservation_id, &update))
            .await?
            .ok_or(CoreError::ReservationNotFound { reservation_id })?;

        info!(
            reservation_id = %updated.id,
            confirmed = updated.confirmed,
            "Reservation updated"
        );
        Ok(updated)
    }
}

fn ensure_aligned(field: &'static str, value: DateTime<Utc>) -> CoreResult<()> {
    if is_quantized(&value) {
        Ok(())
    } else {
        Err(CoreError::InvalidSlotAlignment { field, value })
    }
}

fn check_updatable(
    reservation: &Reservation,
    update: &ReservationUpdate,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if reservation.is_expired(now) {
        debug!(reservation_id = %reservation.id, "Rejected update of expired reservation");
        return Err(CoreError::ReservationExpired {
            reservation_id: reservation.id,
            expiration: reservation.expiration,
        });
    }
    // At `expiration == now` the hold no longer blocks the slot, so it may
    // already be rebooked.
    if update.confirmed == Some(true) && !reservation.is_live(now) {
        debug!(reservation_id = %reservation.id, "Rejected confirmation of lapsed hold");
        return Err(CoreError::ReservationExpired {
            reservation_id: reservation.id,
            expiration: reservation.expiration,
        });
    }
    if reservation.confirmed && update.confirmed == Some(false) {
        return Err(CoreError::ConfirmationIrreversible {
            reservation_id: reservation.id,
        });
    }
    Ok(())
}
