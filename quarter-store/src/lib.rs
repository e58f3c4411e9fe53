pub mod app_config;
pub mod availability_repo;
pub mod database;
pub mod redis_repo;
pub mod reservation_repo;
pub mod user_repo;

pub use availability_repo::PgAvailabilityStore;
pub use database::DbClient;
pub use redis_repo::RedisSlotLocks;
pub use reservation_repo::PgReservationLedger;
pub use user_repo::PgUserRepository;
