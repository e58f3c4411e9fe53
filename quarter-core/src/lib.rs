//! Booking rules for 15 minute appointments between providers and clients.

pub mod booking;
pub mod clock;
pub mod deadline;
pub mod error;
pub mod lock;
pub mod memory;
pub mod models;
pub mod repository;
pub mod slot;

pub use booking::{BookingPolicy, BookingService};
pub use clock::{Clock, ManualClock, SystemClock};
pub use deadline::Deadline;
pub use error::{parse_id, CollaboratorFailure, CoreError, CoreResult, ErrorKind};
pub use lock::{InProcessSlotLocks, SlotGuard, SlotKey, SlotLocks};
pub use slot::{is_quantized, quantize, SlotIter, SLOT_MINUTES};
