//! Notification queue in `PostgreSQL`.

use chrono::{DateTime, Utc};
use complaint_desk_core::notification::{
    Notification, NotificationEmitter, NotificationError, NotificationInbox, NotificationKind,
};
use complaint_desk_core::types::{NotificationId, UserId};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

const COLUMNS: &str = "id, recipient_id, message, kind, reference_id, is_read, created_at";

fn unavailable(error: sqlx::Error) -> NotificationError {
    NotificationError::Unavailable(error.to_string())
}

fn decode(row: &PgRow) -> Result<Notification, NotificationError> {
    let id: Uuid = row.try_get("id").map_err(unavailable)?;
    let recipient: Uuid = row.try_get("recipient_id").map_err(unavailable)?;
    let kind: String = row.try_get("kind").map_err(unavailable)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(unavailable)?;

    Ok(Notification {
        id: NotificationId::from_uuid(id),
        recipient: UserId::from_uuid(recipient),
        message: row.try_get("message").map_err(unavailable)?,
        kind: kind
            .parse::<NotificationKind>()
            .map_err(|e| NotificationError::Unavailable(e.to_string()))?,
        reference_id: row.try_get("reference_id").map_err(unavailable)?,
        is_read: row.try_get("is_read").map_err(unavailable)?,
        created_at,
    })
}

/// `PostgreSQL`-backed notification emitter and inbox.
#[derive(Clone, Debug)]
pub struct PostgresNotifications {
    pool: PgPool,
}

impl PostgresNotifications {
    /// Use an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl NotificationEmitter for PostgresNotifications {
    fn enqueue(
        &self,
        notification: Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO notifications
                    (id, recipient_id, message, kind, reference_id, is_read, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(notification.id.as_uuid())
            .bind(notification.recipient.as_uuid())
            .bind(&notification.message)
            .bind(notification.kind.as_str())
            .bind(notification.reference_id)
            .bind(notification.is_read)
            .bind(notification.created_at)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

            tracing::debug!(
                notification_id = %notification.id,
                recipient = %notification.recipient,
                kind = %notification.kind,
                "Notification queued"
            );
            Ok(())
        })
    }
}

impl NotificationInbox for PostgresNotifications {
    fn list_for(
        &self,
        recipient: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Notification>, NotificationError>> + Send + '_>>
    {
        Box::pin(async move {
            let sql = format!(
                "SELECT {COLUMNS} FROM notifications WHERE recipient_id = $1 ORDER BY created_at DESC, id"
            );
            let rows = sqlx::query(&sql)
                .bind(*recipient.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(unavailable)?;
            rows.iter().map(decode).collect()
        })
    }

    fn list_all(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Notification>, NotificationError>> + Send + '_>>
    {
        Box::pin(async move {
            let sql = format!("SELECT {COLUMNS} FROM notifications ORDER BY created_at DESC, id");
            let rows = sqlx::query(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(unavailable)?;
            rows.iter().map(decode).collect()
        })
    }

    fn mark_read(
        &self,
        id: NotificationId,
        recipient: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Notification, NotificationError>> + Send + '_>> {
        Box::pin(async move {
            let sql = format!(
                "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2 RETURNING {COLUMNS}"
            );
            let row = sqlx::query(&sql)
                .bind(*id.as_uuid())
                .bind(*recipient.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(unavailable)?;

            match row {
                Some(row) => decode(&row),
                None => Err(NotificationError::NotFound(id)),
            }
        })
    }
}
