//! Facility list conversion.
//!
//! Input rows are `type,name,lat,lon,<ignored>,description...`, one facility
//! per row after a header. Every facility is inserted with grade `A` and an
//! inspection timestamp of the time the script runs.

use std::fmt::Write as _;
use std::io::Read;

use civic_map_database::villages::quote_literal;

use crate::SeedError;

/// Source type names and the facility type each maps to.
pub const FACILITY_TYPE_MAP: &[(&str, &str)] = &[
    ("park", "park"),
    ("toilet", "public_toilet"),
    ("bridge", "bridge"),
    ("bike", "bike_station"),
    ("dangerous", "hazardous_factory"),
    ("police", "police_station"),
    ("camera", "cctv"),
    ("light", "street_light"),
    ("sidework", "road"),
    ("wifi_hotspot", "wifi_hotspot"),
];

/// Maps a source type name to a facility type, ignoring case and
/// surrounding whitespace.
#[must_use]
pub fn map_facility_type(raw: &str) -> Option<&'static str> {
    let key = raw.trim().to_lowercase();
    FACILITY_TYPE_MAP
        .iter()
        .find(|(from, _)| *from == key)
        .map(|(_, to)| *to)
}

/// Generated script plus what was left out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilitiesSql {
    pub sql: String,
    pub inserted: usize,
    pub skipped: usize,
}

/// Converts a facility CSV into `INSERT` statements.
///
/// Rows with an unknown type or unparseable coordinates are logged and
/// skipped.
///
/// # Errors
///
/// Returns [`SeedError::Csv`] if the input is not readable CSV.
pub fn facilities_sql<R: Read>(input: R) -> Result<FacilitiesSql, SeedError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let mut out = FacilitiesSql {
        sql: String::new(),
        inserted: 0,
        skipped: 0,
    };

    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let line = i + 2;
        let field = |n: usize| record.get(n).unwrap_or("").trim();

        let Some(facility_type) = map_facility_type(field(0)) else {
            log::warn!("Unknown facility type {:?} on line {line}, skipping", field(0));
            out.skipped += 1;
            continue;
        };

        let (Ok(lat), Ok(lon)) = (field(2).parse::<f64>(), field(3).parse::<f64>()) else {
            log::warn!(
                "Bad coordinates ({:?}, {:?}) on line {line}, skipping",
                field(2),
                field(3)
            );
            out.skipped += 1;
            continue;
        };

        let description = record.iter().skip(5).collect::<Vec<_>>().join(",");

        let _ = write!(
            out.sql,
            "INSERT INTO public.facilities (type, name, geom, health_grade, last_inspection_at, description)\n\
             VALUES (\n  {},\n  {},\n  ST_SetSRID(ST_MakePoint({lon}, {lat}), 4326),\n  'A',\n  now(),\n  {}\n);\n\n",
            quote_literal(facility_type),
            quote_literal(field(1)),
            quote_literal(description.trim()),
        );
        out.inserted += 1;
    }

    log::info!(
        "Converted {} facilities, skipped {}",
        out.inserted,
        out.skipped
    );
    Ok(out)
}
