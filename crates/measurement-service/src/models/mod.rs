use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of measurement taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasurementType {
    Height,
    Weight,
}

impl MeasurementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementType::Height => "HEIGHT",
            MeasurementType::Weight => "WEIGHT",
        }
    }
}

impl FromStr for MeasurementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HEIGHT" => Ok(MeasurementType::Height),
            "WEIGHT" => Ok(MeasurementType::Weight),
            _ => Err(format!("Invalid measurement type: {}", s)),
        }
    }
}

/// A stored measurement of a target.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub measurement_type: MeasurementType,
    pub ts: DateTime<Utc>,
    pub value: f32,
    pub uuid: Uuid,
    pub target_uuid: Uuid,
}

/// Measurement row (maps to measurements table)
#[derive(Debug, Clone, FromRow)]
pub struct MeasurementRow {
    pub measurement_type: String,
    pub measurement_date: DateTime<Utc>,
    pub measurement_value: f32,
    pub measurement_uuid: Uuid,
    pub target_uuid: Uuid,
}

impl TryFrom<MeasurementRow> for Measurement {
    type Error = String;

    fn try_from(row: MeasurementRow) -> Result<Self, Self::Error> {
        Ok(Measurement {
            measurement_type: row.measurement_type.parse()?,
            ts: row.measurement_date,
            value: row.measurement_value,
            uuid: row.measurement_uuid,
            target_uuid: row.target_uuid,
        })
    }
}

/// Body of `PUT /api/v1/measurement/:uuid`.
///
/// `type` stays a string here so an unknown value is a 400 from the
/// service rather than a body rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct MeasurementRequest {
    #[serde(rename = "type")]
    pub measurement_type: String,
    pub ts: DateTime<Utc>,
    pub value: f32,
    pub target_uuid: Uuid,
}

/// Measurement as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementResponse {
    #[serde(rename = "type")]
    pub measurement_type: MeasurementType,
    pub ts: DateTime<Utc>,
    pub value: f32,
    pub uuid: Uuid,
    pub target_uuid: Uuid,
}

impl From<Measurement> for MeasurementResponse {
    fn from(m: Measurement) -> Self {
        MeasurementResponse {
            measurement_type: m.measurement_type,
            ts: m.ts,
            value: m.value,
            uuid: m.uuid,
            target_uuid: m.target_uuid,
        }
    }
}

/// Query for `GET /api/v1/measurements`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "target-uuid")]
    pub target_uuid: Uuid,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_measurement_type_parsing() {
        assert_eq!(
            "HEIGHT".parse::<MeasurementType>().unwrap(),
            MeasurementType::Height
        );
        assert_eq!(
            "WEIGHT".parse::<MeasurementType>().unwrap(),
            MeasurementType::Weight
        );
        assert!("height".parse::<MeasurementType>().is_err());
        assert!("TEMPERATURE".parse::<MeasurementType>().is_err());
        assert_eq!(MeasurementType::Weight.as_str(), "WEIGHT");
    }

    #[test]
    fn test_request_deserializes_type_field() {
        let request: MeasurementRequest = serde_json::from_value(json!({
            "type": "HEIGHT",
            "ts": "2019-03-25T20:53:00Z",
            "value": 61.5,
            "target_uuid": "00000000-0000-0000-0000-000000001000"
        }))
        .unwrap();

        assert_eq!(request.measurement_type, "HEIGHT");
        assert_eq!(request.value, 61.5);
        assert_eq!(request.ts.timestamp(), 1_553_547_180);
    }

    #[test]
    fn test_response_serializes_type_field() {
        let response = MeasurementResponse {
            measurement_type: MeasurementType::Weight,
            ts: DateTime::from_timestamp(1_553_547_180, 0).unwrap(),
            value: 4.25,
            uuid: Uuid::nil(),
            target_uuid: Uuid::nil(),
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], "WEIGHT");
        assert_eq!(value["ts"], "2019-03-25T20:53:00Z");
        assert_eq!(value["value"], 4.25);
    }

    #[test]
    fn test_list_query_uses_hyphenated_key() {
        let query: ListQuery = serde_json::from_value(json!({
            "target-uuid": "00000000-0000-0000-0000-000000001000"
        }))
        .unwrap();
        assert_eq!(query.target_uuid.as_u128(), 0x1000);
    }

    #[test]
    fn test_row_with_unknown_type_fails_conversion() {
        let row = MeasurementRow {
            measurement_type: "LENGTH".to_string(),
            measurement_date: Utc::now(),
            measurement_value: 1.0,
            measurement_uuid: Uuid::nil(),
            target_uuid: Uuid::nil(),
        };
        assert!(Measurement::try_from(row).is_err());
    }
}
