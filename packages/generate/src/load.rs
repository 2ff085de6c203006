//! Reads previously exported tables back into entities.
//!
//! Used when a single stage runs on its own and needs the upstream tables
//! of an earlier run.

use std::path::Path;
use std::str::FromStr as _;

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use streetlights_entity_models::{Neighborhood, StreetLight, Supplier, Wattage};
use streetlights_spatial::wkt::{point_from_wkt, polygon_from_wkt};

use crate::export::{NeighborhoodRow, StreetLightRow, SupplierRow, Table};
use crate::{DATE_FORMAT, GenerateError, Stage, TIMESTAMP_FORMAT};

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, GenerateError> {
    if !path.exists() {
        return Err(GenerateError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    log::info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn wkt_error(stage: Stage, source: streetlights_spatial::SpatialError) -> GenerateError {
    GenerateError::Spatial { stage, source }
}

fn parse_date(id: &str, value: &str) -> Result<NaiveDate, GenerateError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| GenerateError::Parse(format!("{id}: bad date '{value}': {e}")))
}

fn parse_timestamp(id: &str, value: &str) -> Result<NaiveDateTime, GenerateError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|e| GenerateError::Parse(format!("{id}: bad timestamp '{value}': {e}")))
}

impl NeighborhoodRow {
    /// Converts the row back into an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the boundary WKT does not parse.
    pub fn into_neighborhood(self) -> Result<Neighborhood, GenerateError> {
        let boundary =
            polygon_from_wkt(&self.boundary_wkt).map_err(|e| wkt_error(Stage::Neighborhoods, e))?;
        Ok(Neighborhood {
            id: self.neighborhood_id,
            name: self.name,
            population: self.population,
            boundary,
        })
    }
}

impl StreetLightRow {
    /// Converts the row back into an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the location, wattage, or a date does not parse.
    pub fn into_street_light(self) -> Result<StreetLight, GenerateError> {
        let location =
            point_from_wkt(&self.location_wkt).map_err(|e| wkt_error(Stage::StreetLights, e))?;
        let wattage = Wattage::from_str(&self.wattage.to_string()).map_err(|_| {
            GenerateError::Parse(format!("{}: unsupported wattage {}", self.light_id, self.wattage))
        })?;
        Ok(StreetLight {
            installation_date: parse_date(&self.light_id, &self.installation_date)?,
            last_maintenance: parse_timestamp(&self.light_id, &self.last_maintenance)?,
            id: self.light_id,
            location,
            status: self.status,
            wattage,
            neighborhood_id: self.neighborhood_id,
        })
    }
}

impl SupplierRow {
    /// Converts the row back into an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the location WKT does not parse.
    pub fn into_supplier(self) -> Result<Supplier, GenerateError> {
        let location =
            point_from_wkt(&self.location_wkt).map_err(|e| wkt_error(Stage::Suppliers, e))?;
        Ok(Supplier {
            id: self.supplier_id,
            name: self.name,
            contact_phone: self.contact_phone,
            contact_email: self.contact_email,
            location,
            service_radius_km: self.service_radius_km,
            avg_response_hours: self.avg_response_hours,
            specialization: self.specialization,
        })
    }
}

/// Loads `<prefix>neighborhoods.csv` from `dir`.
///
/// # Errors
///
/// Returns [`GenerateError::MissingInput`] if the file does not exist, or a
/// CSV/parse error for malformed rows.
pub fn neighborhoods(dir: &Path, prefix: &str) -> Result<Vec<Neighborhood>, GenerateError> {
    read_rows::<NeighborhoodRow>(&Table::Neighborhoods.path(dir, prefix))?
        .into_iter()
        .map(NeighborhoodRow::into_neighborhood)
        .collect()
}

/// Loads `<prefix>street_lights.csv` from `dir`.
///
/// # Errors
///
/// Returns [`GenerateError::MissingInput`] if the file does not exist, or a
/// CSV/parse error for malformed rows.
pub fn street_lights(dir: &Path, prefix: &str) -> Result<Vec<StreetLight>, GenerateError> {
    read_rows::<StreetLightRow>(&Table::StreetLights.path(dir, prefix))?
        .into_iter()
        .map(StreetLightRow::into_street_light)
        .collect()
}

/// Loads `<prefix>suppliers.csv` from `dir`.
///
/// # Errors
///
/// Returns [`GenerateError::MissingInput`] if the file does not exist, or a
/// CSV/parse error for malformed rows.
pub fn suppliers(dir: &Path, prefix: &str) -> Result<Vec<Supplier>, GenerateError> {
    read_rows::<SupplierRow>(&Table::Suppliers.path(dir, prefix))?
        .into_iter()
        .map(SupplierRow::into_supplier)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use geo::{Point, polygon};
    use streetlights_entity_models::LightStatus;

    use super::*;
    use crate::export::DatasetWriter;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "streetlights_load_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = temp_dir("missing");
        let err = street_lights(&dir, "").unwrap_err();
        match err {
            GenerateError::MissingInput { path } => {
                assert!(path.ends_with("street_lights.csv"), "{}", path.display());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reads_back_what_was_exported() {
        let dir = temp_dir("readback");
        let nbhd = Neighborhood {
            id: "NBH-001".to_string(),
            name: "Domlur".to_string(),
            population: 90_000,
            boundary: polygon![
                (x: 77.61, y: 12.95),
                (x: 77.64, y: 12.95),
                (x: 77.64, y: 12.97),
                (x: 77.61, y: 12.97),
                (x: 77.61, y: 12.95),
            ],
        };
        let light = StreetLight {
            id: "SL-0001".to_string(),
            location: Point::new(77.625_431, 12.961_002),
            status: LightStatus::MaintenanceRequired,
            wattage: Wattage::W200,
            installation_date: NaiveDate::from_ymd_opt(2019, 7, 2).unwrap(),
            last_maintenance: NaiveDate::from_ymd_opt(2024, 2, 11)
                .unwrap()
                .and_hms_opt(14, 5, 9)
                .unwrap(),
            neighborhood_id: "NBH-001".to_string(),
        };

        let mut writer = DatasetWriter::new(&dir, "t_").unwrap();
        writer
            .stage(Table::Neighborhoods, std::iter::once(NeighborhoodRow::from(&nbhd)))
            .unwrap();
        writer
            .stage(Table::StreetLights, std::iter::once(StreetLightRow::from(&light)))
            .unwrap();
        writer.commit(None).unwrap();

        assert_eq!(neighborhoods(&dir, "t_").unwrap(), vec![nbhd]);
        assert_eq!(street_lights(&dir, "t_").unwrap(), vec![light]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn bad_timestamp_is_a_parse_error() {
        let row = StreetLightRow {
            light_id: "SL-0009".to_string(),
            location_wkt: "POINT(77.600000 12.900000)".to_string(),
            status: LightStatus::Operational,
            wattage: 100,
            installation_date: "2020-01-01".to_string(),
            last_maintenance: "yesterday".to_string(),
            neighborhood_id: "NBH-001".to_string(),
        };
        assert!(matches!(row.into_street_light(), Err(GenerateError::Parse(_))));
    }
}
