use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

/// Category of a [`CoreError`], used by the transport layer to pick a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Policy,
    Collaborator,
}

/// Why a collaborator call did not produce a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaboratorFailure {
    Timeout,
    Fault,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{field} is not a valid identifier: {value}")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("{field} {value} is not aligned to the 15 minute grid")]
    InvalidSlotAlignment {
        field: &'static str,
        value: DateTime<Utc>,
    },

    #[error("availability window must end after it starts ({start} .. {end})")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("user not found: {user_id}")]
    UserNotFound { user_id: Uuid },

    #[error("reservation not found: {reservation_id}")]
    ReservationNotFound { reservation_id: Uuid },

    #[error("slot {reservation_time} with provider {provider_id} is already booked")]
    SlotAlreadyBooked {
        provider_id: Uuid,
        client_id: Uuid,
        reservation_time: DateTime<Utc>,
    },

    #[error("reservation {reservation_id} expired at {expiration}")]
    ReservationExpired {
        reservation_id: Uuid,
        expiration: DateTime<Utc>,
    },

    #[error("reservation {reservation_id} is confirmed and cannot be unconfirmed")]
    ConfirmationIrreversible { reservation_id: Uuid },

    #[error("reservation time {reservation_time} is not in the future")]
    PastReservation {
        reservation_time: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error(
        "reservation time {reservation_time} is too soon, earliest bookable slot is {earliest}"
    )]
    InsufficientLeadTime {
        reservation_time: DateTime<Utc>,
        earliest: DateTime<Utc>,
    },

    #[error("provider {provider_id} has no availability covering {reservation_time}")]
    NoAvailabilityForSlot {
        provider_id: Uuid,
        reservation_time: DateTime<Utc>,
    },

    #[error("user {user_id} is not a provider")]
    NotAProvider { user_id: Uuid },

    #[error("{collaborator} unavailable")]
    CollaboratorUnavailable {
        collaborator: &'static str,
        failure: CollaboratorFailure,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidIdentifier { .. }
            | CoreError::InvalidSlotAlignment { .. }
            | CoreError::InvalidWindow { .. } => ErrorKind::Validation,
            CoreError::UserNotFound { .. } | CoreError::ReservationNotFound { .. } => {
                ErrorKind::NotFound
            }
            CoreError::SlotAlreadyBooked { .. }
            | CoreError::ReservationExpired { .. }
            | CoreError::ConfirmationIrreversible { .. } => ErrorKind::Conflict,
            CoreError::PastReservation { .. }
            | CoreError::InsufficientLeadTime { .. }
            | CoreError::NoAvailabilityForSlot { .. }
            | CoreError::NotAProvider { .. } => ErrorKind::Policy,
            CoreError::CollaboratorUnavailable { .. } => ErrorKind::Collaborator,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidIdentifier { .. } => "invalid_identifier",
            CoreError::InvalidSlotAlignment { .. } => "invalid_slot_alignment",
            CoreError::InvalidWindow { .. } => "invalid_window",
            CoreError::UserNotFound { .. } => "user_not_found",
            CoreError::ReservationNotFound { .. } => "reservation_not_found",
            CoreError::SlotAlreadyBooked { .. } => "slot_already_booked",
            CoreError::ReservationExpired { .. } => "reservation_expired",
            CoreError::ConfirmationIrreversible { .. } => "confirmation_irreversible",
            CoreError::PastReservation { .. } => "past_reservation",
            CoreError::InsufficientLeadTime { .. } => "insufficient_lead_time",
            CoreError::NoAvailabilityForSlot { .. } => "no_availability_for_slot",
            CoreError::NotAProvider { .. } => "not_a_provider",
            CoreError::CollaboratorUnavailable { .. } => "collaborator_unavailable",
        }
    }

    /// Only collaborator failures may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Collaborator
    }

    /// Structured detail for the caller. Never contains collaborator error text.
    pub fn details(&self) -> serde_json::Value {
        match self {
            CoreError::InvalidIdentifier { field, value } => {
                json!({ "field": field, "value": value })
            }
            CoreError::InvalidSlotAlignment { field, value } => {
                json!({ "field": field, "value": value })
            }
            CoreError::InvalidWindow { start, end } => json!({ "start": start, "end": end }),
            CoreError::UserNotFound { user_id } => json!({ "user_id": user_id }),
            CoreError::ReservationNotFound { reservation_id } => {
                json!({ "reservation_id": reservation_id })
            }
            CoreError::SlotAlreadyBooked {
                provider_id,
                client_id,
                reservation_time,
            } => json!({
                "provider_id": provider_id,
                "client_id": client_id,
                "reservation_time": reservation_time,
            }),
            CoreError::ReservationExpired {
                reservation_id,
                expiration,
            } => json!({ "reservation_id": reservation_id, "expiration": expiration }),
            CoreError::ConfirmationIrreversible { reservation_id } => {
                json!({ "reservation_id": reservation_id })
            }
            CoreError::PastReservation {
                reservation_time,
                now,
            } => json!({ "reservation_time": reservation_time, "now": now }),
            CoreError::InsufficientLeadTime {
                reservation_time,
                earliest,
            } => json!({ "reservation_time": reservation_time, "earliest": earliest }),
            CoreError::NoAvailabilityForSlot {
                provider_id,
                reservation_time,
            } => json!({ "provider_id": provider_id, "reservation_time": reservation_time }),
            CoreError::NotAProvider { user_id } => json!({ "user_id": user_id }),
            CoreError::CollaboratorUnavailable {
                collaborator,
                failure,
            } => json!({ "collaborator": collaborator, "failure": failure }),
        }
    }
}

/// Parse a caller-supplied identifier.
pub fn parse_id(field: &'static str, raw: &str) -> CoreResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| CoreError::InvalidIdentifier {
        field,
        value: raw.to_string(),
    })
}
