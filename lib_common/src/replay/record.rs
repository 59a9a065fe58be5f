//! # Outbound Records
//!
//! Everything a session sends to its consumer. Each record is serialized as
//! one JSON object tagged by `type`:
//!
//! ```json
//! {"type":"info","message":"connected"}
//! {"type":"prediction","data":{"predictions":[{"driver":"Lando Norris","predicted_seconds":77.1}],"mae_seconds":0.4}}
//! {"type":"telemetry","driver":"VER","lap_number":12,"position":1,"position_from_start_km":40.2,"speed_kmh":281.0}
//! {"type":"error","message":"..."}
//! ```
//!
//! Absent optional values are written as `null`.

use serde::{Deserialize, Serialize};

/// One telemetry point as published to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub driver: String,
    pub lap_number: Option<u32>,
    /// Live rank; `None` until the driver has started a lap.
    pub position: Option<u32>,
    #[serde(rename = "position_from_start_km")]
    pub cumulative_distance_km: f64,
    pub speed_kmh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedLap {
    #[serde(rename = "driver")]
    pub driver_name: String,
    pub predicted_seconds: f64,
}

/// The one-shot forecast sent before telemetry, fastest driver first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictionSet {
    pub predictions: Vec<PredictedLap>,
    #[serde(rename = "mae_seconds")]
    pub mean_absolute_error_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Info { message: String },
    Prediction { data: PredictionSet },
    Telemetry(TelemetryRecord),
    Error { message: String },
}

impl ServerMessage {
    pub fn connected() -> Self {
        ServerMessage::Info {
            message: "connected".to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
