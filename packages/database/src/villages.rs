//! Village boundary upserts.
//!
//! Villages are keyed by their official code. Re-importing a boundary file
//! replaces the name, county, village name, and geometry of every code it
//! contains and leaves other areas alone.

use std::fmt::Write as _;

use switchy_database::{Database, DatabaseValue};

use crate::DbError;
use crate::progress::ProgressCallback;

/// One village boundary ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct VillageRecord {
    /// Official village code, unique across the island.
    pub code: String,
    /// Display name: county, town, and village concatenated.
    pub name: String,
    /// County the village belongs to.
    pub county: String,
    /// Bare village name, the key population updates match on.
    pub village: String,
    /// `GeoJSON` geometry (polygon or multipolygon).
    pub geometry: serde_json::Value,
}

const UPSERT_VILLAGE: &str = "INSERT INTO areas (name, code, county, village, geom, level)
     VALUES ($1, $2, $3, $4, ST_SetSRID(ST_Multi(ST_GeomFromGeoJSON($5)), 4326), 'village')
     ON CONFLICT (code) DO UPDATE SET
         name = EXCLUDED.name,
         county = EXCLUDED.county,
         village = EXCLUDED.village,
         geom = EXCLUDED.geom,
         level = 'village'";

/// Upserts villages in a single transaction.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError`] on the first failing statement. Nothing from the
/// batch is committed in that case.
pub async fn upsert_villages(
    db: &dyn Database,
    villages: &[VillageRecord],
    progress: &dyn ProgressCallback,
) -> Result<u64, DbError> {
    progress.set_total(villages.len() as u64);
    let mut written = 0u64;

    let txn = db.begin_transaction().await?;
    for village in villages {
        written += txn
            .exec_raw_params(
                UPSERT_VILLAGE,
                &[
                    DatabaseValue::String(village.name.clone()),
                    DatabaseValue::String(village.code.clone()),
                    DatabaseValue::String(village.county.clone()),
                    DatabaseValue::String(village.village.clone()),
                    DatabaseValue::String(village.geometry.to_string()),
                ],
            )
            .await?;
        progress.inc(1);
    }
    txn.commit().await?;

    progress.finish(format!("{written} villages upserted"));
    log::info!("Upserted {written} villages");
    Ok(written)
}

/// Renders the upsert of all villages as one transactional SQL script
/// with inline literals, for applying by hand.
#[must_use]
pub fn upsert_villages_sql(villages: &[VillageRecord]) -> String {
    let mut sql = String::from("BEGIN;\n\n");
    for v in villages {
        let _ = write!(
            sql,
            "INSERT INTO public.areas (name, code, county, village, geom, level)\n\
             VALUES ({}, {}, {}, {}, ST_SetSRID(ST_Multi(ST_GeomFromGeoJSON({})), 4326), 'village')\n\
             ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name, county = EXCLUDED.county, \
             village = EXCLUDED.village, geom = EXCLUDED.geom, level = 'village';\n\n",
            quote_literal(&v.name),
            quote_literal(&v.code),
            quote_literal(&v.county),
            quote_literal(&v.village),
            quote_literal(&v.geometry.to_string()),
        );
    }
    sql.push_str("COMMIT;\n");
    sql
}

/// Quotes a SQL string literal, doubling embedded single quotes.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
