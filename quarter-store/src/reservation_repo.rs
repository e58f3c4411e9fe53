use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quarter_core::models::{Reservation, ReservationUpdate};
use quarter_core::repository::{ReservationLedger, StoreResult};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgReservationLedger {
    pool: PgPool,
}

impl PgReservationLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    client_id: Uuid,
    provider_id: Uuid,
    reservation_time: DateTime<Utc>,
    expiration: DateTime<Utc>,
    confirmed: bool,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Reservation {
            id: row.id,
            client_id: row.client_id,
            provider_id: row.provider_id,
            reservation_time: row.reservation_time,
            expiration: row.expiration,
            confirmed: row.confirmed,
        }
    }
}

const COLUMNS: &str = "id, client_id, provider_id, reservation_time, expiration, confirmed";

#[async_trait]
impl ReservationLedger for PgReservationLedger {
    async fn find_live(
        &self,
        provider_id: Uuid,
        slot_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Reservation>> {
        // Exact slot equality is enough while every reservation is one grid slot long.
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM reservations
            WHERE provider_id = $1
              AND reservation_time = $2
              AND (confirmed OR expiration > $3)
            "#
        ))
        .bind(provider_id)
        .bind(slot_time)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Reservation::from).collect())
    }

    async fn insert(&self, reservation: &Reservation) -> StoreResult<Reservation> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            r#"
            INSERT INTO reservations
                (id, client_id, provider_id, reservation_time, expiration, confirmed)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(reservation.id)
        .bind(reservation.client_id)
        .bind(reservation.provider_id)
        .bind(reservation.reservation_time)
        .bind(reservation.expiration)
        .bind(reservation.confirmed)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Reservation::from))
    }

    async fn update(
        &self,
        id: Uuid,
        update: &ReservationUpdate,
    ) -> StoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            r#"
            UPDATE reservations
            SET confirmed = COALESCE($2, confirmed),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.confirmed)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Reservation::from))
    }
}
