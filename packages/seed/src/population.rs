//! Village population summary conversion.
//!
//! Each row updates the demographic columns of the village with that name
//! in the given county.

use std::fmt::Write as _;
use std::io::Read;

use civic_map_database::villages::quote_literal;
use serde::Deserialize;

use crate::SeedError;

/// Name of the summary row that totals the whole county.
pub const TOTAL_ROW_NAME: &str = "總計";

#[derive(Debug, Deserialize)]
struct PopulationRow {
    #[serde(default)]
    name: String,
    #[serde(default)]
    gender_ratio: String,
    #[serde(default)]
    total_population: String,
    #[serde(default)]
    age_average: String,
}

/// Converts a population summary CSV into `UPDATE` statements for the
/// villages of `county`.
///
/// Rows without a name and the county total row are skipped. Empty or
/// non-numeric values are written as `NULL`.
///
/// # Errors
///
/// Returns [`SeedError::Csv`] if the input is not readable CSV.
pub fn population_sql<R: Read>(input: R, county: &str) -> Result<String, SeedError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut sql = String::new();
    let mut updates = 0usize;

    for row in reader.deserialize::<PopulationRow>() {
        let row = row?;
        let name = row.name.trim();
        if name.is_empty() || name == TOTAL_ROW_NAME {
            continue;
        }

        let _ = write!(
            sql,
            "UPDATE public.areas\n\
             SET gender_ratio = {},\n    \
                 population_total = {},\n    \
                 weighted_avg_age = {}\n\
             WHERE county = {}\n  \
               AND village = {};\n\n",
            number_or_null(&row.gender_ratio, name, "gender_ratio"),
            number_or_null(&row.total_population, name, "total_population"),
            number_or_null(&row.age_average, name, "age_average"),
            quote_literal(county),
            quote_literal(name),
        );
        updates += 1;
    }

    log::info!("Generated {updates} population updates for {county}");
    Ok(sql)
}

fn number_or_null(raw: &str, village: &str, column: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "NULL".to_string();
    }
    match raw.replace(',', "").parse::<f64>() {
        Ok(n) if n.is_finite() => n.to_string(),
        _ => {
            log::warn!("Non-numeric {column} {raw:?} for {village}, writing NULL");
            "NULL".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "name,gender_ratio,total_population,age_average\n\
                       東區里, 96.5 ,4210,41.2\n\
                       ,100,1,1\n\
                       總計,98,400000,40\n\
                       北區里,,3100,\n";

    #[test]
    fn updates_each_village() {
        let sql = population_sql(CSV.as_bytes(), "新竹市").unwrap();
        assert_eq!(sql.matches("UPDATE public.areas").count(), 2);
        assert!(sql.contains("SET gender_ratio = 96.5,"));
        assert!(sql.contains("population_total = 4210,"));
        assert!(sql.contains("WHERE county = '新竹市'"));
        assert!(sql.contains("AND village = '東區里';"));
        assert!(!sql.contains("總計"));
    }

    #[test]
    fn empty_values_become_null() {
        let sql = population_sql(CSV.as_bytes(), "新竹市").unwrap();
        let north = sql.split("\n\n").find(|s| s.contains("北區里")).unwrap();
        assert!(north.contains("gender_ratio = NULL"));
        assert!(north.contains("population_total = 3100"));
        assert!(north.contains("weighted_avg_age = NULL"));
    }

    #[test]
    fn thousands_separators_are_accepted() {
        assert_eq!(number_or_null("1,234", "x", "total_population"), "1234");
        assert_eq!(number_or_null("n/a", "x", "total_population"), "NULL");
    }
}
