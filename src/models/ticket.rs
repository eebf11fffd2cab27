use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Asia::Kolkata;
use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Waste categories the model may assign to a hotspot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WasteType {
    Organic,
    Plastic,
    EWaste,
    CDWaste,
    Mixed,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeLevel {
    Low,
    Medium,
    High,
}

/// Dispatch priority tier. P0 is most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    P0,
    P1,
    P2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchAction {
    DispatchNow,
    AddToRoute,
    Monitor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    ERickshaw,
    Pickup,
    Compactor,
    Other,
}

/// Argument set of the `waste_report` structured callback, exactly as the
/// model must supply it. Deserialization plus garde validation of this type
/// is the schema boundary — the model is an untrusted producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TicketDraft {
    #[garde(length(min = 1, max = 200))]
    pub area_name: String,

    #[garde(range(min = -90.0, max = 90.0))]
    pub lat: f64,

    #[garde(range(min = -180.0, max = 180.0))]
    pub lng: f64,

    #[garde(skip)]
    pub waste_type: WasteType,

    #[garde(skip)]
    pub volume_level: VolumeLevel,

    #[garde(range(min = 0.0))]
    pub estimated_weight_kg: f64,

    #[garde(skip)]
    pub priority: Priority,

    #[garde(skip)]
    pub near_sensitive_zone: bool,

    #[garde(skip)]
    pub action: DispatchAction,

    #[garde(skip)]
    pub vehicle_type: VehicleType,

    #[garde(skip)]
    pub requires_after_photo: bool,
}

/// A validated waste hotspot ticket produced by one extraction call.
///
/// Immutable once issued: the id and timestamp are minted at creation,
/// `wall_time_seconds` is measured by the extractor around the model call
/// (never supplied by the model), and nothing is updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: Uuid,
    pub created_at: DateTime<FixedOffset>,
    pub area_name: String,
    pub lat: f64,
    pub lng: f64,
    pub waste_type: WasteType,
    pub volume_level: VolumeLevel,
    pub estimated_weight_kg: f64,
    pub priority: Priority,
    pub near_sensitive_zone: bool,
    pub action: DispatchAction,
    pub vehicle_type: VehicleType,
    pub requires_after_photo: bool,
    pub wall_time_seconds: f64,
}

impl Ticket {
    /// Mint a ticket from validated callback arguments. Timestamps are fixed
    /// to IST regardless of where the service runs.
    pub fn issue(draft: TicketDraft, wall_time_seconds: f64) -> Self {
        Self {
            ticket_id: Uuid::new_v4(),
            created_at: Utc::now().with_timezone(&Kolkata).fixed_offset(),
            area_name: draft.area_name,
            lat: draft.lat,
            lng: draft.lng,
            waste_type: draft.waste_type,
            volume_level: draft.volume_level,
            estimated_weight_kg: draft.estimated_weight_kg,
            priority: draft.priority,
            near_sensitive_zone: draft.near_sensitive_zone,
            action: draft.action,
            vehicle_type: draft.vehicle_type,
            requires_after_photo: draft.requires_after_photo,
            wall_time_seconds,
        }
    }
}
