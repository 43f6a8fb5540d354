//! Battery-level ingestion.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use axum::extract::{rejection::JsonRejection, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};
use crate::http::handlers::invalid_body;
use crate::http::response::{success, Message};
use crate::http::server::AppState;
use crate::unix_now;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryReading {
    pub level: f64,
    pub received_at: u64,
}

/// The most recent reading; older ones are not kept.
#[derive(Default)]
pub struct TelemetryLog {
    battery: ArcSwapOption<BatteryReading>,
}

impl TelemetryLog {
    pub fn record_battery(&self, level: f64) -> BatteryReading {
        let reading = BatteryReading {
            level,
            received_at: unix_now(),
        };
        self.battery.store(Some(Arc::new(reading)));
        reading
    }

    pub fn battery(&self) -> Option<BatteryReading> {
        self.battery.load().as_deref().copied()
    }
}

#[derive(Debug, Deserialize)]
pub struct BatteryReport {
    pub level: Option<f64>,
}

pub async fn report_battery(
    State(state): State<AppState>,
    payload: Result<Json<BatteryReport>, JsonRejection>,
) -> GatewayResult<Response> {
    let Json(report) = payload.map_err(invalid_body)?;

    let level = report
        .level
        .ok_or_else(|| GatewayError::Validation("Missing level field".into()))?;
    if !(0.0..=100.0).contains(&level) {
        return Err(GatewayError::Validation(
            "Battery level must be between 0 and 100".into(),
        ));
    }

    state.telemetry.record_battery(level);
    tracing::debug!(level, "Battery level reported");

    Ok(success(
        StatusCode::OK,
        Message {
            message: "Battery level received".into(),
        },
    ))
}

pub async fn latest_battery(State(state): State<AppState>) -> GatewayResult<Response> {
    state
        .telemetry
        .battery()
        .map(|reading| success(StatusCode::OK, reading))
        .ok_or_else(|| GatewayError::NotFound("No battery level reported yet".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_latest_reading() {
        let log = TelemetryLog::default();
        assert!(log.battery().is_none());
        log.record_battery(80.0);
        log.record_battery(42.5);
        assert_eq!(log.battery().map(|r| r.level), Some(42.5));
    }
}
