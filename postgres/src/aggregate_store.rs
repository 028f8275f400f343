//! Restaurant aggregates in `PostgreSQL`.

use complaint_desk_core::restaurant::{Restaurant, Version};
use complaint_desk_core::store::{AggregateStore, StoreError};
use complaint_desk_core::types::{ComplaintId, RestaurantId, UserId};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

fn db_error(error: sqlx::Error) -> StoreError {
    StoreError::Database(error.to_string())
}

fn to_db_version(version: Version) -> Result<i64, StoreError> {
    i64::try_from(version.value())
        .map_err(|_| StoreError::Database(format!("version {version} does not fit in BIGINT")))
}

fn from_db_version(version: i64) -> Result<Version, StoreError> {
    u64::try_from(version)
        .map(Version::new)
        .map_err(|_| StoreError::Database(format!("negative version {version} in database")))
}

fn decode(row: &PgRow) -> Result<Restaurant, StoreError> {
    let document: serde_json::Value = row.try_get("document").map_err(db_error)?;
    let version: i64 = row.try_get("version").map_err(db_error)?;

    let restaurant: Restaurant = serde_json::from_value(document)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(restaurant.with_version(from_db_version(version)?))
}

fn encode(restaurant: &Restaurant) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(restaurant).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Record every complaint of `restaurant` in the complaint index.
///
/// Complaints never move between restaurants, so existing rows are left alone.
async fn index_complaints(
    conn: &mut PgConnection,
    restaurant: &Restaurant,
) -> Result<(), StoreError> {
    if restaurant.complaints().is_empty() {
        return Ok(());
    }

    let (complaint_ids, submitter_ids): (Vec<Uuid>, Vec<Uuid>) = restaurant
        .complaints()
        .iter()
        .map(|c| (*c.id().as_uuid(), *c.submitter().as_uuid()))
        .unzip();

    sqlx::query(
        r"
        INSERT INTO complaint_index (complaint_id, restaurant_id, submitter_id)
        SELECT t.complaint_id, $1, t.submitter_id
        FROM UNNEST($2::uuid[], $3::uuid[]) AS t(complaint_id, submitter_id)
        ON CONFLICT (complaint_id) DO NOTHING
        ",
    )
    .bind(restaurant.id().as_uuid())
    .bind(&complaint_ids)
    .bind(&submitter_ids)
    .execute(conn)
    .await
    .map_err(db_error)?;

    Ok(())
}

/// `PostgreSQL`-backed [`AggregateStore`].
///
/// Each save is one transaction: a conditional `UPDATE ... WHERE version = $expected`
/// on the document row followed by the complaint index insert. A concurrent
/// writer that committed first makes the `UPDATE` match zero rows, which is
/// reported as [`StoreError::ConcurrencyConflict`].
///
/// # Example
///
/// ```no_run
/// use complaint_desk_postgres::PostgresAggregateStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PostgresAggregateStore::connect("postgres://localhost/complaint_desk").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgresAggregateStore {
    pool: PgPool,
}

impl PostgresAggregateStore {
    /// Connect with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await.map_err(db_error)?;
        Ok(Self { pool })
    }

    /// Use an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_many(
        &self,
        query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<Vec<Restaurant>, StoreError> {
        let rows = query.fetch_all(&self.pool).await.map_err(db_error)?;
        rows.iter().map(decode).collect()
    }
}

impl AggregateStore for PostgresAggregateStore {
    fn insert(
        &self,
        restaurant: Restaurant,
    ) -> Pin<Box<dyn Future<Output = Result<Version, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let document = encode(&restaurant)?;
            let mut tx = self.pool.begin().await.map_err(db_error)?;

            let result = sqlx::query(
                r"
                INSERT INTO restaurants (id, owner_id, name, document, version, created_at)
                VALUES ($1, $2, $3, $4, 0, $5)
                ON CONFLICT (id) DO NOTHING
                ",
            )
            .bind(restaurant.id().as_uuid())
            .bind(restaurant.owner().as_uuid())
            .bind(restaurant.name())
            .bind(&document)
            .bind(restaurant.created_at())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

            if result.rows_affected() == 0 {
                return Err(StoreError::DuplicateAggregate(restaurant.id()));
            }

            index_complaints(&mut tx, &restaurant).await?;
            tx.commit().await.map_err(db_error)?;

            tracing::debug!(restaurant_id = %restaurant.id(), "Restaurant inserted");
            Ok(Version::INITIAL)
        })
    }

    fn load(
        &self,
        restaurant_id: RestaurantId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Restaurant>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let row = sqlx::query("SELECT document, version FROM restaurants WHERE id = $1")
                .bind(restaurant_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

            row.as_ref().map(decode).transpose()
        })
    }

    fn load_by_complaint(
        &self,
        complaint_id: ComplaintId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Restaurant>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT r.document, r.version
                FROM restaurants r
                JOIN complaint_index ci ON ci.restaurant_id = r.id
                WHERE ci.complaint_id = $1
                ",
            )
            .bind(complaint_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

            row.as_ref().map(decode).transpose()
        })
    }

    fn save(
        &self,
        restaurant: Restaurant,
    ) -> Pin<Box<dyn Future<Output = Result<Version, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let restaurant_id = restaurant.id();
            let expected = restaurant.version();
            let next = expected.next();
            let document = encode(&restaurant)?;

            let mut tx = self.pool.begin().await.map_err(db_error)?;

            let result = sqlx::query(
                r"
                UPDATE restaurants
                SET name = $2, document = $3, version = $4, updated_at = now()
                WHERE id = $1 AND version = $5
                ",
            )
            .bind(restaurant_id.as_uuid())
            .bind(restaurant.name())
            .bind(&document)
            .bind(to_db_version(next)?)
            .bind(to_db_version(expected)?)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

            if result.rows_affected() == 0 {
                let current: Option<(i64,)> =
                    sqlx::query_as("SELECT version FROM restaurants WHERE id = $1")
                        .bind(restaurant_id.as_uuid())
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(db_error)?;
                tx.rollback().await.map_err(db_error)?;

                return match current {
                    None => Err(StoreError::AggregateNotFound(restaurant_id)),
                    Some((actual,)) => {
                        let actual = from_db_version(actual)?;
                        tracing::debug!(
                            restaurant_id = %restaurant_id,
                            expected = %expected,
                            actual = %actual,
                            "Optimistic concurrency conflict"
                        );
                        Err(StoreError::ConcurrencyConflict {
                            restaurant_id,
                            expected,
                            actual,
                        })
                    },
                };
            }

            index_complaints(&mut tx, &restaurant).await?;
            tx.commit().await.map_err(db_error)?;

            tracing::debug!(restaurant_id = %restaurant_id, version = %next, "Restaurant saved");
            Ok(next)
        })
    }

    fn list(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Restaurant>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.fetch_many(sqlx::query(
                "SELECT document, version FROM restaurants ORDER BY created_at, id",
            ))
            .await
        })
    }

    fn list_by_submitter(
        &self,
        submitter: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Restaurant>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.fetch_many(
                sqlx::query(
                    r"
                    SELECT r.document, r.version
                    FROM restaurants r
                    WHERE EXISTS (
                        SELECT 1 FROM complaint_index ci
                        WHERE ci.restaurant_id = r.id AND ci.submitter_id = $1
                    )
                    ORDER BY r.created_at, r.id
                    ",
                )
                .bind(*submitter.as_uuid()),
            )
            .await
        })
    }

    fn ping(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
            Ok(())
        })
    }
}
