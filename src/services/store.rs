use chrono::DateTime;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::models::ticket::Ticket;

/// Open the SQLite ticket store.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

/// Create the ticket table if it does not exist yet.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS waste_tickets (
            ticket_id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            area_name TEXT NOT NULL,
            lat REAL NOT NULL,
            lng REAL NOT NULL,
            waste_type TEXT NOT NULL,
            volume_level TEXT NOT NULL,
            estimated_weight_kg REAL NOT NULL,
            priority TEXT NOT NULL,
            near_sensitive_zone INTEGER NOT NULL,
            action TEXT NOT NULL,
            vehicle_type TEXT NOT NULL,
            requires_after_photo INTEGER NOT NULL,
            wall_time_seconds REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Persist one ticket. Tickets are insert-only; nothing updates them later.
pub async fn insert_ticket(pool: &SqlitePool, ticket: &Ticket) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO waste_tickets (
            ticket_id, created_at, area_name, lat, lng, waste_type, volume_level,
            estimated_weight_kg, priority, near_sensitive_zone, action, vehicle_type,
            requires_after_photo, wall_time_seconds
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(ticket.ticket_id.to_string())
    .bind(ticket.created_at.to_rfc3339())
    .bind(&ticket.area_name)
    .bind(ticket.lat)
    .bind(ticket.lng)
    .bind(ticket.waste_type.to_string())
    .bind(ticket.volume_level.to_string())
    .bind(ticket.estimated_weight_kg)
    .bind(ticket.priority.to_string())
    .bind(ticket.near_sensitive_zone)
    .bind(ticket.action.to_string())
    .bind(ticket.vehicle_type.to_string())
    .bind(ticket.requires_after_photo)
    .bind(ticket.wall_time_seconds)
    .execute(pool)
    .await?;
    Ok(())
}

/// All persisted tickets, newest first.
pub async fn list_tickets(pool: &SqlitePool) -> Result<Vec<Ticket>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT ticket_id, created_at, area_name, lat, lng, waste_type, volume_level,
               estimated_weight_kg, priority, near_sensitive_zone, action, vehicle_type,
               requires_after_photo, wall_time_seconds
        FROM waste_tickets
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(ticket_from_row).collect()
}

fn ticket_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Ticket, StoreError> {
    fn corrupt(field: &str, detail: impl std::fmt::Display) -> StoreError {
        StoreError::Corrupt(format!("{field}: {detail}"))
    }

    let ticket_id: String = row.try_get("ticket_id")?;
    let created_at: String = row.try_get("created_at")?;
    let waste_type: String = row.try_get("waste_type")?;
    let volume_level: String = row.try_get("volume_level")?;
    let priority: String = row.try_get("priority")?;
    let action: String = row.try_get("action")?;
    let vehicle_type: String = row.try_get("vehicle_type")?;

    Ok(Ticket {
        ticket_id: Uuid::parse_str(&ticket_id).map_err(|e| corrupt("ticket_id", e))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| corrupt("created_at", e))?,
        area_name: row.try_get("area_name")?,
        lat: row.try_get("lat")?,
        lng: row.try_get("lng")?,
        waste_type: waste_type.parse().map_err(|e| corrupt("waste_type", e))?,
        volume_level: volume_level.parse().map_err(|e| corrupt("volume_level", e))?,
        estimated_weight_kg: row.try_get("estimated_weight_kg")?,
        priority: priority.parse().map_err(|e| corrupt("priority", e))?,
        near_sensitive_zone: row.try_get("near_sensitive_zone")?,
        action: action.parse().map_err(|e| corrupt("action", e))?,
        vehicle_type: vehicle_type.parse().map_err(|e| corrupt("vehicle_type", e))?,
        requires_after_photo: row.try_get("requires_after_photo")?,
        wall_time_seconds: row.try_get("wall_time_seconds")?,
    })
}

/// A (lat, lng, intensity) triple for the density map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatPoint {
    pub lat: f64,
    pub lng: f64,
    pub weight: f64,
}

/// Coordinates and estimated weights of all persisted tickets.
pub async fn heat_points(pool: &SqlitePool) -> Result<Vec<HeatPoint>, StoreError> {
    let rows = sqlx::query("SELECT lat, lng, estimated_weight_kg FROM waste_tickets")
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| {
            Ok(HeatPoint {
                lat: row.try_get("lat")?,
                lng: row.try_get("lng")?,
                weight: row.try_get("estimated_weight_kg")?,
            })
        })
        .collect()
}

/// Write the success artifact: `{"ticket": {...}}`.
pub fn write_ticket_artifact(dir: &Path, ticket: &Ticket) -> Result<PathBuf, StoreError> {
    std::fs::create_dir_all(dir)?;
    let short_id = &ticket.ticket_id.to_string()[..8];
    let path = dir.join(format!("ticket_{short_id}.json"));
    let body = serde_json::to_string_pretty(&serde_json::json!({ "ticket": ticket }))?;
    std::fs::write(&path, body)?;
    Ok(path)
}

/// Write the failure artifact: `{"error": "..."}`. A failed extraction never
/// produces a partial ticket.
pub fn write_error_artifact(dir: &Path, message: &str) -> Result<PathBuf, StoreError> {
    std::fs::create_dir_all(dir)?;
    let short_id = &Uuid::new_v4().to_string()[..8];
    let path = dir.join(format!("error_{short_id}.json"));
    let body = serde_json::to_string_pretty(&serde_json::json!({ "error": message }))?;
    std::fs::write(&path, body)?;
    Ok(path)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize artifact: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("corrupt ticket row: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::{
        DispatchAction, Priority, TicketDraft, VehicleType, VolumeLevel, WasteType,
    };

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        pool
    }

    fn sample_ticket(area: &str, weight: f64) -> Ticket {
        Ticket::issue(
            TicketDraft {
                area_name: area.to_string(),
                lat: 11.0025,
                lng: 76.9548,
                waste_type: WasteType::Mixed,
                volume_level: VolumeLevel::Medium,
                estimated_weight_kg: weight,
                priority: Priority::P1,
                near_sensitive_zone: false,
                action: DispatchAction::AddToRoute,
                vehicle_type: VehicleType::Pickup,
                requires_after_photo: true,
            },
            1.5,
        )
    }

    #[tokio::test]
    async fn insert_and_list_round_trip() {
        let pool = memory_pool().await;
        let ticket = sample_ticket("Race Course", 42.0);

        insert_ticket(&pool, &ticket).await.unwrap();
        let tickets = list_tickets(&pool).await.unwrap();

        assert_eq!(tickets.len(), 1);
        let stored = &tickets[0];
        assert_eq!(stored.ticket_id, ticket.ticket_id);
        assert_eq!(stored.created_at, ticket.created_at);
        assert_eq!(stored.area_name, "Race Course");
        assert_eq!(stored.waste_type, WasteType::Mixed);
        assert_eq!(stored.vehicle_type, VehicleType::Pickup);
        assert!(stored.requires_after_photo);
        assert!((stored.estimated_weight_kg - 42.0).abs() < 1e-9);
        assert!((stored.wall_time_seconds - 1.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn heat_points_reflect_all_tickets() {
        let pool = memory_pool().await;
        insert_ticket(&pool, &sample_ticket("A", 10.0)).await.unwrap();
        insert_ticket(&pool, &sample_ticket("B", 20.0)).await.unwrap();

        let mut points = heat_points(&pool).await.unwrap();
        points.sort_by(|a, b| a.weight.partial_cmp(&b.weight).unwrap());

        assert_eq!(points.len(), 2);
        assert!((points[0].weight - 10.0).abs() < 1e-9);
        assert!((points[1].weight - 20.0).abs() < 1e-9);
        assert!((points[0].lat - 11.0025).abs() < 1e-9);
    }

    #[tokio::test]
    async fn duplicate_ticket_id_is_rejected() {
        let pool = memory_pool().await;
        let ticket = sample_ticket("A", 1.0);
        insert_ticket(&pool, &ticket).await.unwrap();
        assert!(insert_ticket(&pool, &ticket).await.is_err());
    }

    #[test]
    fn ticket_artifact_shape() {
        let dir = tempfile::tempdir().unwrap();
        let ticket = sample_ticket("Race Course", 12.0);

        let path = write_ticket_artifact(dir.path(), &ticket).unwrap();
        let body: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(body["ticket"]["area_name"], "Race Course");
        assert_eq!(body["ticket"]["waste_type"], "MIXED");
        assert!(body.get("error").is_none());
    }

    #[test]
    fn error_artifact_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_error_artifact(dir.path(), "model returned without calling waste_report")
            .unwrap();
        let body: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(body["error"], "model returned without calling waste_report");
        assert!(body.get("ticket").is_none());
    }
}
