//! CSV export with staged, all-or-nothing commits.
//!
//! Each table is serialized into memory, hashed, and written to a hidden
//! `.<file>.tmp` next to its final location. [`DatasetWriter::commit`]
//! removes the previous manifest, renames every staged file into place,
//! and writes the new manifest last, so a manifest on disk always
//! describes the files next to it.
//! Dropping an uncommitted writer removes whatever it staged, so a failed
//! run never leaves a half-written dataset behind.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use streetlights_entity_models::{
    DemographicsEnrichment, GridZone, IssueType, LightStatus, MaintenanceRequest, Neighborhood,
    PowerGridEnrichment, Season, Specialization, StreetLight, Supplier, UrbanClassification,
    WeatherEnrichment,
};
use streetlights_spatial::wkt::{point_to_wkt, polygon_to_wkt};
use strum_macros::{AsRefStr, Display};

use crate::{DATE_FORMAT, GenerateError, TIMESTAMP_FORMAT};

/// Output tables, named after their file stems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    Neighborhoods,
    StreetLights,
    Suppliers,
    MaintenanceRequests,
    WeatherEnrichment,
    DemographicsEnrichment,
    PowerGridEnrichment,
}

impl Table {
    /// Returns all variants in write order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Neighborhoods,
            Self::StreetLights,
            Self::Suppliers,
            Self::MaintenanceRequests,
            Self::WeatherEnrichment,
            Self::DemographicsEnrichment,
            Self::PowerGridEnrichment,
        ]
    }

    /// File name for this table, e.g. `sample_street_lights.csv`.
    #[must_use]
    pub fn file_name(self, prefix: &str) -> String {
        format!("{prefix}{self}.csv")
    }

    /// Full path of this table inside `dir`.
    #[must_use]
    pub fn path(self, dir: &Path, prefix: &str) -> PathBuf {
        dir.join(self.file_name(prefix))
    }

    /// Tables whose rows reference this table's ids or geometry.
    #[must_use]
    pub const fn downstream(self) -> &'static [Self] {
        match self {
            Self::Neighborhoods => &[
                Self::StreetLights,
                Self::MaintenanceRequests,
                Self::WeatherEnrichment,
                Self::DemographicsEnrichment,
                Self::PowerGridEnrichment,
            ],
            Self::StreetLights => &[
                Self::MaintenanceRequests,
                Self::WeatherEnrichment,
                Self::PowerGridEnrichment,
            ],
            Self::Suppliers
            | Self::MaintenanceRequests
            | Self::WeatherEnrichment
            | Self::DemographicsEnrichment
            | Self::PowerGridEnrichment => &[],
        }
    }
}

/// Path of the manifest for the dataset with `prefix` inside `dir`.
#[must_use]
pub fn manifest_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{prefix}manifest.json"))
}

/// A serde row with a fixed column order.
pub trait CsvRow: Serialize {
    /// Column names in serialization order.
    const HEADER: &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborhoodRow {
    pub neighborhood_id: String,
    pub name: String,
    pub population: u32,
    pub boundary_wkt: String,
}

impl CsvRow for NeighborhoodRow {
    const HEADER: &'static [&'static str] = &["neighborhood_id", "name", "population", "boundary_wkt"];
}

impl From<&Neighborhood> for NeighborhoodRow {
    fn from(n: &Neighborhood) -> Self {
        Self {
            neighborhood_id: n.id.clone(),
            name: n.name.clone(),
            population: n.population,
            boundary_wkt: polygon_to_wkt(&n.boundary),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreetLightRow {
    pub light_id: String,
    pub location_wkt: String,
    pub status: LightStatus,
    pub wattage: u16,
    pub installation_date: String,
    pub last_maintenance: String,
    pub neighborhood_id: String,
}

impl CsvRow for StreetLightRow {
    const HEADER: &'static [&'static str] = &[
        "light_id",
        "location_wkt",
        "status",
        "wattage",
        "installation_date",
        "last_maintenance",
        "neighborhood_id",
    ];
}

impl From<&StreetLight> for StreetLightRow {
    fn from(l: &StreetLight) -> Self {
        Self {
            light_id: l.id.clone(),
            location_wkt: point_to_wkt(l.location),
            status: l.status,
            wattage: l.wattage.watts(),
            installation_date: l.installation_date.format(DATE_FORMAT).to_string(),
            last_maintenance: l.last_maintenance.format(TIMESTAMP_FORMAT).to_string(),
            neighborhood_id: l.neighborhood_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierRow {
    pub supplier_id: String,
    pub name: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub location_wkt: String,
    pub service_radius_km: f64,
    pub avg_response_hours: f64,
    pub specialization: Specialization,
}

impl CsvRow for SupplierRow {
    const HEADER: &'static [&'static str] = &[
        "supplier_id",
        "name",
        "contact_phone",
        "contact_email",
        "location_wkt",
        "service_radius_km",
        "avg_response_hours",
        "specialization",
    ];
}

impl From<&Supplier> for SupplierRow {
    fn from(s: &Supplier) -> Self {
        Self {
            supplier_id: s.id.clone(),
            name: s.name.clone(),
            contact_phone: s.contact_phone.clone(),
            contact_email: s.contact_email.clone(),
            location_wkt: point_to_wkt(s.location),
            service_radius_km: s.service_radius_km,
            avg_response_hours: s.avg_response_hours,
            specialization: s.specialization,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRequestRow {
    pub request_id: String,
    pub light_id: String,
    pub reported_at: String,
    /// Empty while the request is open.
    pub resolved_at: Option<String>,
    pub issue_type: IssueType,
    pub description: String,
}

impl CsvRow for MaintenanceRequestRow {
    const HEADER: &'static [&'static str] = &[
        "request_id",
        "light_id",
        "reported_at",
        "resolved_at",
        "issue_type",
        "description",
    ];
}

impl From<&MaintenanceRequest> for MaintenanceRequestRow {
    fn from(r: &MaintenanceRequest) -> Self {
        Self {
            request_id: r.id.clone(),
            light_id: r.light_id.clone(),
            reported_at: r.reported_at.format(TIMESTAMP_FORMAT).to_string(),
            resolved_at: r
                .resolved_at
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
            issue_type: r.issue_type,
            description: r.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRow {
    pub light_id: String,
    pub season: Season,
    pub avg_temperature_c: f64,
    pub rainfall_mm: f64,
    pub failure_risk_score: f64,
    pub predicted_failure_date: String,
}

impl CsvRow for WeatherRow {
    const HEADER: &'static [&'static str] = &[
        "light_id",
        "season",
        "avg_temperature_c",
        "rainfall_mm",
        "failure_risk_score",
        "predicted_failure_date",
    ];
}

impl From<&WeatherEnrichment> for WeatherRow {
    fn from(w: &WeatherEnrichment) -> Self {
        Self {
            light_id: w.light_id.clone(),
            season: w.season,
            avg_temperature_c: w.avg_temperature_c,
            rainfall_mm: w.rainfall_mm,
            failure_risk_score: w.failure_risk_score,
            predicted_failure_date: w.predicted_failure_date.format(DATE_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicsRow {
    pub neighborhood_id: String,
    pub population_density: f64,
    pub urban_classification: UrbanClassification,
}

impl CsvRow for DemographicsRow {
    const HEADER: &'static [&'static str] =
        &["neighborhood_id", "population_density", "urban_classification"];
}

impl From<&DemographicsEnrichment> for DemographicsRow {
    fn from(d: &DemographicsEnrichment) -> Self {
        Self {
            neighborhood_id: d.neighborhood_id.clone(),
            population_density: d.population_density,
            urban_classification: d.urban_classification,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerGridRow {
    pub light_id: String,
    pub grid_zone: GridZone,
    pub avg_load_percent: f64,
    pub outage_history_count: u32,
}

impl CsvRow for PowerGridRow {
    const HEADER: &'static [&'static str] = &[
        "light_id",
        "grid_zone",
        "avg_load_percent",
        "outage_history_count",
    ];
}

impl From<&PowerGridEnrichment> for PowerGridRow {
    fn from(p: &PowerGridEnrichment) -> Self {
        Self {
            light_id: p.light_id.clone(),
            grid_zone: p.grid_zone,
            avg_load_percent: p.avg_load_percent,
            outage_history_count: p.outage_history_count,
        }
    }
}

/// Serializes rows into CSV bytes, header first.
///
/// The header is written explicitly so an empty table still carries it.
///
/// # Errors
///
/// Returns a CSV error if a row fails to serialize.
pub fn to_csv_bytes<T: CsvRow>(rows: impl IntoIterator<Item = T>) -> Result<(Vec<u8>, usize), GenerateError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(T::HEADER)?;

    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| GenerateError::Io(e.into_error()))?;
    Ok((bytes, count))
}

/// One file entry in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub table: String,
    pub file: String,
    pub rows: usize,
    pub sha256: String,
}

/// Description of a committed dataset, written as `<prefix>manifest.json`.
///
/// Holds nothing time-dependent beyond the configured reference time, so
/// seeded runs produce an identical manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub profile: String,
    pub seed: Option<u64>,
    pub reference_time: String,
    pub files: Vec<ManifestFile>,
}

struct StagedFile {
    table: Table,
    tmp: PathBuf,
    path: PathBuf,
    rows: usize,
    sha256: String,
}

/// Stages table files and commits them together.
pub struct DatasetWriter {
    dir: PathBuf,
    prefix: String,
    staged: Vec<StagedFile>,
    committed: bool,
}

impl DatasetWriter {
    /// Creates the output directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn new(dir: &Path, prefix: &str) -> Result<Self, GenerateError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
            staged: Vec::new(),
            committed: false,
        })
    }

    /// Serializes `rows` and stages them as `table`.
    ///
    /// # Errors
    ///
    /// Returns a CSV or I/O error; anything already staged is removed when
    /// the writer is dropped.
    pub fn stage<T: CsvRow>(
        &mut self,
        table: Table,
        rows: impl IntoIterator<Item = T>,
    ) -> Result<(), GenerateError> {
        let (bytes, count) = to_csv_bytes(rows)?;
        let file_name = table.file_name(&self.prefix);
        let tmp = self.dir.join(format!(".{file_name}.tmp"));
        std::fs::write(&tmp, &bytes)?;

        log::debug!("Staged {count} rows for {file_name}");
        self.staged.push(StagedFile {
            table,
            tmp,
            path: self.dir.join(&file_name),
            rows: count,
            sha256: hex::encode(Sha256::digest(&bytes)),
        });
        Ok(())
    }

    /// Manifest entries for everything staged so far.
    #[must_use]
    pub fn manifest_files(&self) -> Vec<ManifestFile> {
        self.staged
            .iter()
            .map(|f| ManifestFile {
                table: f.table.to_string(),
                file: f.table.file_name(&self.prefix),
                rows: f.rows,
                sha256: f.sha256.clone(),
            })
            .collect()
    }

    /// Removes any existing manifest, renames every staged file into
    /// place, then writes `manifest` if given. Returns the final paths.
    ///
    /// A commit without a manifest (a partial rewrite) therefore leaves the
    /// directory with no manifest at all.
    ///
    /// # Errors
    ///
    /// Returns an I/O or JSON error. If a rename fails, files renamed
    /// before it stay in place and no manifest is present.
    pub fn commit(mut self, manifest: Option<&Manifest>) -> Result<Vec<PathBuf>, GenerateError> {
        let manifest_file = manifest_path(&self.dir, &self.prefix);
        match std::fs::remove_file(&manifest_file) {
            Ok(()) => log::debug!("Removed previous {}", manifest_file.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut paths = Vec::with_capacity(self.staged.len() + 1);
        for file in &self.staged {
            std::fs::rename(&file.tmp, &file.path)?;
            log::info!("Wrote {} ({} rows)", file.path.display(), file.rows);
            paths.push(file.path.clone());
        }
        self.committed = true;

        if let Some(manifest) = manifest {
            let tmp = self.dir.join(format!(".{}manifest.json.tmp", self.prefix));
            std::fs::write(&tmp, serde_json::to_string_pretty(manifest)?)?;
            std::fs::rename(&tmp, &manifest_file)?;
            log::info!("Wrote {}", manifest_file.display());
            paths.push(manifest_file);
        }
        Ok(paths)
    }
}

impl Drop for DatasetWriter {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for file in &self.staged {
            match std::fs::remove_file(&file.tmp) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove staged {}: {e}", file.tmp.display()),
            }
        }
        if !self.staged.is_empty() {
            log::warn!("Discarded {} staged files", self.staged.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "streetlights_export_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn request(resolved: bool) -> MaintenanceRequest {
        let reported = NaiveDate::from_ymd_opt(2025, 3, 4)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        MaintenanceRequest {
            id: "REQ-0001".to_string(),
            light_id: "SL-0001".to_string(),
            reported_at: reported,
            resolved_at: resolved.then(|| reported + chrono::Duration::hours(30)),
            issue_type: IssueType::PowerSupply,
            description: "Fuse blown at the distribution box, after rain.".to_string(),
        }
    }

    #[test]
    fn headers_and_null_encoding() {
        let (bytes, count) =
            to_csv_bytes([request(true), request(false)].iter().map(MaintenanceRequestRow::from))
                .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(count, 2);
        assert_eq!(
            lines[0],
            "request_id,light_id,reported_at,resolved_at,issue_type,description"
        );
        assert_eq!(
            lines[1],
            "REQ-0001,SL-0001,2025-03-04 09:30:00,2025-03-05 15:30:00,power_supply,\"Fuse blown at the distribution box, after rain.\""
        );
        assert_eq!(
            lines[2],
            "REQ-0001,SL-0001,2025-03-04 09:30:00,,power_supply,\"Fuse blown at the distribution box, after rain.\""
        );
    }

    #[test]
    fn empty_table_still_has_header() {
        let (bytes, count) = to_csv_bytes(std::iter::empty::<PowerGridRow>()).unwrap();
        assert_eq!(count, 0);
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "light_id,grid_zone,avg_load_percent,outage_history_count\n"
        );
    }

    #[test]
    fn dropped_writer_leaves_nothing_behind() {
        let dir = temp_dir("drop");
        {
            let mut writer = DatasetWriter::new(&dir, "").unwrap();
            writer
                .stage(Table::MaintenanceRequests, [request(true)].iter().map(MaintenanceRequestRow::from))
                .unwrap();
            assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);
        }
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn failed_rename_leaves_no_manifest() {
        let dir = temp_dir("failed_rename");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(manifest_path(&dir, ""), "{}").unwrap();

        let blocked = Table::PowerGridEnrichment.path(&dir, "");
        std::fs::create_dir_all(blocked.join("occupied")).unwrap();

        let mut writer = DatasetWriter::new(&dir, "").unwrap();
        writer
            .stage(Table::MaintenanceRequests, [request(true)].iter().map(MaintenanceRequestRow::from))
            .unwrap();
        writer
            .stage(Table::PowerGridEnrichment, std::iter::empty::<PowerGridRow>())
            .unwrap();
        let manifest = Manifest {
            profile: "full".to_string(),
            seed: Some(2),
            reference_time: "2025-06-01 00:00:00".to_string(),
            files: writer.manifest_files(),
        };

        assert!(writer.commit(Some(&manifest)).is_err());
        assert!(!manifest_path(&dir, "").exists());
        assert!(!dir.join(".power_grid_enrichment.csv.tmp").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn commit_without_manifest_removes_the_old_one() {
        let dir = temp_dir("partial");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(manifest_path(&dir, "sample_"), "{}").unwrap();

        let mut writer = DatasetWriter::new(&dir, "sample_").unwrap();
        writer
            .stage(Table::MaintenanceRequests, [request(false)].iter().map(MaintenanceRequestRow::from))
            .unwrap();
        let paths = writer.commit(None).unwrap();

        assert_eq!(paths, vec![dir.join("sample_maintenance_requests.csv")]);
        assert!(!manifest_path(&dir, "sample_").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn upstream_tables_list_their_dependents() {
        assert!(Table::Neighborhoods.downstream().contains(&Table::StreetLights));
        assert!(Table::StreetLights.downstream().contains(&Table::PowerGridEnrichment));
        assert!(!Table::StreetLights.downstream().contains(&Table::DemographicsEnrichment));
        assert!(Table::Suppliers.downstream().is_empty());
    }

    #[test]
    fn commit_renames_and_writes_manifest() {
        let dir = temp_dir("commit");
        let mut writer = DatasetWriter::new(&dir, "sample_").unwrap();
        writer
            .stage(Table::MaintenanceRequests, [request(false)].iter().map(MaintenanceRequestRow::from))
            .unwrap();

        let manifest = Manifest {
            profile: "sample".to_string(),
            seed: Some(1),
            reference_time: "2025-06-01 00:00:00".to_string(),
            files: writer.manifest_files(),
        };
        let paths = writer.commit(Some(&manifest)).unwrap();

        assert_eq!(paths.len(), 2);
        let csv_path = dir.join("sample_maintenance_requests.csv");
        assert!(csv_path.exists());
        assert!(!dir.join(".sample_maintenance_requests.csv.tmp").exists());

        let written: Manifest = serde_json::from_str(
            &std::fs::read_to_string(dir.join("sample_manifest.json")).unwrap(),
        )
        .unwrap();
        let bytes = std::fs::read(&csv_path).unwrap();
        assert_eq!(written.files[0].sha256, hex::encode(Sha256::digest(&bytes)));
        assert_eq!(written.files[0].rows, 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
