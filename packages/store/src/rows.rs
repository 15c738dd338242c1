//! Store rows and their normalization into domain records.
//!
//! Row types mirror the store's snake_case column names. Identifiers may be
//! text, uuid, or integer columns; numeric columns may arrive as JSON numbers
//! or as strings (Postgres `numeric`); timestamps may be full RFC 3339
//! values or bare dates. Everything is normalized here so the rest of the
//! workspace only sees the domain types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use civic_map_domain_models::{
    Area, AreaRef, AreaRiskSnapshot, BuildingAgePoint, Facility, FacilityInspection,
    FacilityTypeMeta, LngLat, Mission, NewTicket, NoiseMeasurement, Ticket, TicketEvent,
    TicketReceipt, TicketStatus,
};
use civic_map_spatial::{geometry_from_geojson, point_from_geojson};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Columns selected for areas when geometry is needed.
pub const AREA_COLUMNS_FULL: &str =
    "id,name,code,county,geom,population_total,gender_ratio,weighted_avg_age";

/// Columns selected for area lists.
pub const AREA_COLUMNS_LITE: &str =
    "id,name,code,county,population_total,gender_ratio,weighted_avg_age";

/// Facility columns.
pub const FACILITY_COLUMNS: &str = "id,area_id,type,name,geom,health_grade,last_inspection_at";

/// Ticket columns.
pub const TICKET_COLUMNS: &str =
    "id,area_id,facility_id,geom,status,type,severity,sla_due_at,created_at,description,photo_urls";

/// Parses a store timestamp.
///
/// Accepts RFC 3339, the Postgres text form (`2024-01-01 08:00:00+08`),
/// naive date-times (taken as UTC), and bare dates (midnight UTC).
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Some(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(at) = DateTime::parse_from_str(s, format) {
            return Some(at.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(s, format) {
            return Some(at.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

/// Reads a number that may be encoded as a JSON number or a string.
#[must_use]
pub fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

fn opt_number(value: Option<&Value>) -> Option<f64> {
    value.and_then(number)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn opt_count<T: TryFrom<u64>>(value: Option<&Value>) -> Option<T> {
    opt_number(value)
        .filter(|n| *n >= 0.0)
        .and_then(|n| T::try_from(n.round() as u64).ok())
}

fn opt_timestamp(value: Option<&String>) -> Option<DateTime<Utc>> {
    value.and_then(|s| {
        let parsed = parse_timestamp(s);
        if parsed.is_none() {
            log::debug!("ignoring unparsable timestamp {s:?}");
        }
        parsed
    })
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected id, got {other}"))),
    }
}

fn de_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!("expected id, got {other}"))),
    }
}

/// A row of `areas`.
#[derive(Debug, Clone, Deserialize)]
pub struct AreaRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub geom: Option<Value>,
    #[serde(default)]
    pub population_total: Option<Value>,
    #[serde(default)]
    pub gender_ratio: Option<Value>,
    #[serde(default)]
    pub weighted_avg_age: Option<Value>,
}

impl From<AreaRow> for Area {
    fn from(row: AreaRow) -> Self {
        let geometry = row.geom.as_ref().and_then(|g| {
            let parsed = geometry_from_geojson(g);
            if parsed.is_none() && !g.is_null() {
                log::debug!("area {} has no polygonal geometry", row.id);
            }
            parsed
        });
        Self {
            geometry,
            county: row.county.map(|c| c.trim().to_string()).unwrap_or_default(),
            population_total: opt_count(row.population_total.as_ref()),
            gender_ratio: opt_number(row.gender_ratio.as_ref()),
            weighted_avg_age: opt_number(row.weighted_avg_age.as_ref()),
            risk_score: None,
            id: row.id,
            name: row.name,
            code: row.code,
        }
    }
}

/// A row returned by the `find_area_by_point` procedure.
#[derive(Debug, Clone, Deserialize)]
pub struct AreaRefRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub county: Option<String>,
}

impl From<AreaRefRow> for AreaRef {
    fn from(row: AreaRefRow) -> Self {
        Self {
            id: row.id,
            county: row.county.unwrap_or_default(),
        }
    }
}

/// A row of `facilities`.
#[derive(Debug, Clone, Deserialize)]
pub struct FacilityRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub area_id: Option<String>,
    #[serde(rename = "type")]
    pub facility_type: String,
    pub name: String,
    #[serde(default)]
    pub geom: Option<Value>,
    #[serde(default)]
    pub health_grade: Option<String>,
    #[serde(default)]
    pub last_inspection_at: Option<String>,
}

impl From<FacilityRow> for Facility {
    fn from(row: FacilityRow) -> Self {
        Self {
            coords: row.geom.as_ref().and_then(point_from_geojson),
            grade: row
                .health_grade
                .as_deref()
                .and_then(|g| g.trim().to_uppercase().parse().ok()),
            last_inspection: opt_timestamp(row.last_inspection_at.as_ref()),
            type_label: None,
            type_emoji: None,
            type_icon_name: None,
            incidents_past_year: None,
            latest_inspection_notes: None,
            id: row.id,
            area_id: row.area_id,
            facility_type: row.facility_type,
            name: row.name,
        }
    }
}

/// A row of `tickets`.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub area_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub facility_id: Option<String>,
    #[serde(default)]
    pub geom: Option<Value>,
    pub status: String,
    #[serde(rename = "type")]
    pub ticket_type: String,
    #[serde(default)]
    pub severity: Option<Value>,
    #[serde(default)]
    pub sla_due_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub photo_urls: Option<Vec<String>>,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Self {
            coords: row.geom.as_ref().and_then(point_from_geojson),
            status: TicketStatus::parse_lenient(&row.status),
            severity: opt_count(row.severity.as_ref()),
            sla_due_at: opt_timestamp(row.sla_due_at.as_ref()),
            created_at: opt_timestamp(row.created_at.as_ref()),
            photo_urls: row.photo_urls.unwrap_or_default(),
            id: row.id,
            area_id: row.area_id,
            facility_id: row.facility_id,
            ticket_type: row.ticket_type,
            description: row.description,
        }
    }
}

/// A row of `ticket_events`.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketEventRow {
    #[serde(deserialize_with = "de_id")]
    pub ticket_id: String,
    pub event_type: String,
    pub created_at: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl TicketEventRow {
    /// Normalizes the row. Rows with an unparsable timestamp are dropped.
    #[must_use]
    pub fn into_event(self) -> Option<TicketEvent> {
        let Some(created_at) = parse_timestamp(&self.created_at) else {
            log::warn!(
                "dropping event {} of ticket {}: bad timestamp {:?}",
                self.event_type,
                self.ticket_id,
                self.created_at
            );
            return None;
        };
        Some(TicketEvent {
            ticket_id: self.ticket_id,
            event_type: self.event_type,
            created_at,
            data: self.data.filter(|d| !d.is_null()),
        })
    }
}

/// A row of `facility_inspections`.
#[derive(Debug, Clone, Deserialize)]
pub struct InspectionRow {
    #[serde(deserialize_with = "de_id")]
    pub facility_id: String,
    pub inspected_at: String,
    #[serde(default)]
    pub incident_count_last_year: Option<Value>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl InspectionRow {
    /// Normalizes the row. Rows with an unparsable date are dropped.
    #[must_use]
    pub fn into_inspection(self) -> Option<FacilityInspection> {
        let inspected_at = parse_timestamp(&self.inspected_at)?;
        Some(FacilityInspection {
            facility_id: self.facility_id,
            inspected_at,
            incident_count_last_year: opt_count(self.incident_count_last_year.as_ref()),
            notes: self.notes,
        })
    }
}

/// A row of `area_risk_snapshots`.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskSnapshotRow {
    #[serde(deserialize_with = "de_id")]
    pub area_id: String,
    pub risk_score: Value,
    pub computed_at: String,
}

impl RiskSnapshotRow {
    /// Normalizes the row. Rows without a usable score or time are dropped.
    #[must_use]
    pub fn into_snapshot(self) -> Option<AreaRiskSnapshot> {
        Some(AreaRiskSnapshot {
            risk_score: number(&self.risk_score)?,
            computed_at: parse_timestamp(&self.computed_at)?,
            area_id: self.area_id,
        })
    }
}

/// A row of `facility_type_meta`.
#[derive(Debug, Clone, Deserialize)]
pub struct FacilityTypeRow {
    #[serde(rename = "type")]
    pub facility_type: String,
    #[serde(default)]
    pub label_zh: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub icon_name: Option<String>,
}

impl From<FacilityTypeRow> for FacilityTypeMeta {
    fn from(row: FacilityTypeRow) -> Self {
        Self {
            label: row
                .label_zh
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| row.facility_type.clone()),
            facility_type: row.facility_type,
            emoji: row.emoji,
            icon_name: row.icon_name,
        }
    }
}

/// A row of `building_ages`.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildingAgeRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub geom: Option<Value>,
    #[serde(default)]
    pub age_years: Option<Value>,
}

impl BuildingAgeRow {
    /// Normalizes the row. Rows without a location or age are dropped.
    #[must_use]
    pub fn into_point(self) -> Option<BuildingAgePoint> {
        Some(BuildingAgePoint {
            coords: self.geom.as_ref().and_then(point_from_geojson)?,
            age_years: opt_number(self.age_years.as_ref())?,
            name: self.name.unwrap_or_default(),
            id: self.id,
        })
    }
}

/// A row of `noise_measurements`.
#[derive(Debug, Clone, Deserialize)]
pub struct NoiseRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub geom: Option<Value>,
    #[serde(default)]
    pub morning: Option<Value>,
    #[serde(default)]
    pub afternoon: Option<Value>,
    #[serde(default)]
    pub night: Option<Value>,
}

impl NoiseRow {
    /// Normalizes the row. Stations without a location or with a missing
    /// reading are dropped.
    #[must_use]
    pub fn into_measurement(self) -> Option<NoiseMeasurement> {
        Some(NoiseMeasurement {
            coords: self.geom.as_ref().and_then(point_from_geojson)?,
            morning: opt_number(self.morning.as_ref())?,
            afternoon: opt_number(self.afternoon.as_ref())?,
            night: opt_number(self.night.as_ref())?,
            name: self.name.unwrap_or_default(),
            id: self.id,
        })
    }
}

/// A row of `missions`.
#[derive(Debug, Clone, Deserialize)]
pub struct MissionRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub area_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub facility_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub mission_type: Option<String>,
    pub status: String,
    #[serde(default)]
    pub due_at: Option<String>,
}

impl From<MissionRow> for Mission {
    fn from(row: MissionRow) -> Self {
        Self {
            due_at: opt_timestamp(row.due_at.as_ref()),
            id: row.id,
            area_id: row.area_id,
            facility_id: row.facility_id,
            title: row.title,
            description: row.description,
            mission_type: row.mission_type,
            status: row.status,
        }
    }
}

/// A row of `store_capabilities`.
#[derive(Debug, Clone, Deserialize)]
pub struct CapabilityRow {
    pub feature: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

const fn enabled_by_default() -> bool {
    true
}

/// The `id,status` projection returned by a ticket insert.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub status: String,
}

impl From<ReceiptRow> for TicketReceipt {
    fn from(row: ReceiptRow) -> Self {
        Self {
            id: row.id,
            status: row.status,
        }
    }
}

/// Extended well-known text for a WGS84 point, accepted by `PostGIS`
/// geometry input.
#[must_use]
pub fn point_ewkt(point: LngLat) -> String {
    format!("SRID=4326;POINT({} {})", point.lng, point.lat)
}

/// The `tickets` row inserted for a citizen report.
#[must_use]
pub fn new_ticket_row(ticket: &NewTicket) -> Value {
    serde_json::json!({
        "facility_id": ticket.facility_id,
        "area_id": ticket.area_id,
        "geom": ticket.coordinates.map(point_ewkt),
        "source": "citizen",
        "type": ticket.issue_type,
        "severity": ticket.severity.value(),
        "status": TicketStatus::Open.as_ref(),
        "description": ticket.description,
        "photo_urls": Vec::<String>::new(),
    })
}

#[cfg(test)]
mod tests {
    use civic_map_domain_models::{AreaGeometry, HealthGrade, SeverityLevel};
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_timestamp_forms() {
        let expected = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(parse_timestamp("2024-01-01"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01 08:00:00+08"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T08:00:00+08:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01 00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn reads_numeric_strings() {
        assert_eq!(number(&json!("42.5")), Some(42.5));
        assert_eq!(number(&json!(7)), Some(7.0));
        assert_eq!(number(&json!(null)), None);
        assert_eq!(number(&json!("n/a")), None);
    }

    #[test]
    fn normalizes_area_row() {
        let row: AreaRow = serde_json::from_value(json!({
            "id": 12,
            "name": "Xitun",
            "code": "66000060001",
            "county": " Taichung ",
            "geom": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]},
            "population_total": "4210",
            "gender_ratio": 96.4,
            "weighted_avg_age": null
        }))
        .unwrap();
        let area = Area::from(row);
        assert_eq!(area.id, "12");
        assert_eq!(area.county, "Taichung");
        assert_eq!(area.population_total, Some(4210));
        assert_eq!(area.gender_ratio, Some(96.4));
        assert_eq!(area.weighted_avg_age, None);
        assert!(matches!(area.geometry, Some(AreaGeometry::Polygon(_))));
    }

    #[test]
    fn lite_area_row_has_no_geometry() {
        let row: AreaRow =
            serde_json::from_value(json!({"id": "a", "name": "A", "county": null})).unwrap();
        let area = Area::from(row);
        assert_eq!(area.geometry, None);
        assert!(area.county.is_empty());
    }

    #[test]
    fn normalizes_facility_and_ticket_rows() {
        let facility = Facility::from(
            serde_json::from_value::<FacilityRow>(json!({
                "id": "f1",
                "area_id": null,
                "type": "park",
                "name": "Central Park",
                "geom": {"type": "Point", "coordinates": [120.6, 24.1]},
                "health_grade": "a",
                "last_inspection_at": "2024-03-01"
            }))
            .unwrap(),
        );
        assert_eq!(facility.coords, Some(LngLat::new(120.6, 24.1)));
        assert_eq!(facility.grade, Some(HealthGrade::A));
        assert!(facility.last_inspection.is_some());

        let ticket = Ticket::from(
            serde_json::from_value::<TicketRow>(json!({
                "id": "t1",
                "facility_id": "f1",
                "status": "escalated",
                "type": "streetlight",
                "severity": 3,
                "sla_due_at": "2024-01-01T00:00:00+00:00",
                "photo_urls": null
            }))
            .unwrap(),
        );
        assert_eq!(ticket.status, TicketStatus::Unknown);
        assert_eq!(ticket.severity, Some(3));
        assert!(ticket.photo_urls.is_empty());
        assert_eq!(ticket.coords, None);
    }

    #[test]
    fn drops_incomplete_points() {
        let row: NoiseRow = serde_json::from_value(json!({
            "id": 1,
            "geom": {"type": "Point", "coordinates": [120.0, 24.0]},
            "morning": 60,
            "afternoon": "62.5"
        }))
        .unwrap();
        assert_eq!(row.into_measurement(), None);

        let row: BuildingAgeRow = serde_json::from_value(json!({
            "id": 1,
            "geom": {"type": "Point", "coordinates": [120.0, 24.0]},
            "age_years": "35"
        }))
        .unwrap();
        assert_eq!(row.into_point().map(|p| p.age_years), Some(35.0));
    }

    #[test]
    fn facility_type_label_falls_back_to_key() {
        let meta = FacilityTypeMeta::from(
            serde_json::from_value::<FacilityTypeRow>(json!({"type": "cctv", "label_zh": ""}))
                .unwrap(),
        );
        assert_eq!(meta.label, "cctv");
    }

    #[test]
    fn builds_citizen_ticket_row() {
        let row = new_ticket_row(&NewTicket {
            facility_id: Some("f1".to_string()),
            area_id: None,
            issue_type: "pothole".to_string(),
            severity: SeverityLevel::High,
            description: "deep hole".to_string(),
            coordinates: Some(LngLat::new(120.5, 24.25)),
        });
        assert_eq!(row["severity"], json!(3));
        assert_eq!(row["status"], json!("open"));
        assert_eq!(row["source"], json!("citizen"));
        assert_eq!(row["photo_urls"], json!([]));
        assert_eq!(row["area_id"], json!(null));
        assert_eq!(row["geom"], json!("SRID=4326;POINT(120.5 24.25)"));
    }
}
