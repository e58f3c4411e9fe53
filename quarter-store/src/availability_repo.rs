use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quarter_core::models::Availability;
use quarter_core::repository::{AvailabilityStore, StoreResult};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgAvailabilityStore {
    pool: PgPool,
}

impl PgAvailabilityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AvailabilityRow {
    id: Uuid,
    provider_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

impl From<AvailabilityRow> for Availability {
    fn from(row: AvailabilityRow) -> Self {
        Availability {
            id: row.id,
            provider_id: row.provider_id,
            start: row.start_time,
            end: row.end_time,
        }
    }
}

#[async_trait]
impl AvailabilityStore for PgAvailabilityStore {
    async fn find_covering(
        &self,
        provider_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Availability>> {
        let rows = sqlx::query_as::<_, AvailabilityRow>(
            r#"
            SELECT id, provider_id, start_time, end_time
            FROM availabilities
            WHERE provider_id = $1
              AND ($2::timestamptz IS NULL OR start_time <= $2)
              AND ($3::timestamptz IS NULL OR end_time >= $3)
            ORDER BY start_time
            "#,
        )
        .bind(provider_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Availability::from).collect())
    }

    async fn insert(&self, availability: &Availability) -> StoreResult<Availability> {
        let row = sqlx::query_as::<_, AvailabilityRow>(
            r#"
            INSERT INTO availabilities (id, provider_id, start_time, end_time)
            VALUES ($1, $2, $3, $4)
            RETURNING id, provider_id, start_time, end_time
            "#,
        )
        .bind(availability.id)
        .bind(availability.provider_id)
        .bind(availability.start)
        .bind(availability.end)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(availability_id = %row.id, "Availability stored");
        Ok(row.into())
    }
}
