use anyhow::Context;
use quarter_core::memory::{
    InMemoryAvailabilityStore, InMemoryReservationLedger, InMemoryUserRepository,
};
use quarter_core::repository::{AvailabilityStore, ReservationLedger, UserRepository};
use quarter_core::{BookingService, Deadline};
use quarter_store::app_config::{Config, LockBackend, StorageBackend};
use quarter_store::{
    DbClient, PgAvailabilityStore, PgReservationLedger, PgUserRepository, RedisSlotLocks,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub booking: Arc<BookingService>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(booking: BookingService, request_timeout: Duration) -> Self {
        Self {
            booking: Arc::new(booking),
            request_timeout,
        }
    }

    /// Wire the collaborators selected by `config`.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let (users, availabilities, ledger): (
            Arc<dyn UserRepository>,
            Arc<dyn AvailabilityStore>,
            Arc<dyn ReservationLedger>,
        ) = match config.storage.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage, data is lost on restart");
                (
                    Arc::new(InMemoryUserRepository::new()),
                    Arc::new(InMemoryAvailabilityStore::new()),
                    Arc::new(InMemoryReservationLedger::new()),
                )
            }
            StorageBackend::Postgres => {
                let db_config = config
                    .database
                    .as_ref()
                    .context("[database] section is required for postgres storage")?;
                let db = DbClient::new(db_config)
                    .await
                    .context("Failed to connect to Postgres")?;
                db.migrate().await.context("Failed to run migrations")?;
                (
                    Arc::new(PgUserRepository::new(db.pool.clone())),
                    Arc::new(PgAvailabilityStore::new(db.pool.clone())),
                    Arc::new(PgReservationLedger::new(db.pool)),
                )
            }
        };

        let mut booking = BookingService::new(users, availabilities, ledger)
            .with_policy(config.booking.policy());

        if config.locks.backend == LockBackend::Redis {
            let redis_config = config
                .redis
                .as_ref()
                .context("[redis] section is required for redis locks")?;
            let ttl = Duration::from_millis(config.locks.ttl_ms);
            let locks =
                RedisSlotLocks::new(&redis_config.url, ttl).context("Invalid Redis URL")?;
            booking = booking.with_locks(Arc::new(locks));
        }

        Ok(Self::new(booking, config.booking.request_timeout()))
    }

    /// Deadline for the collaborator calls of one request.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.request_timeout)
    }
}
