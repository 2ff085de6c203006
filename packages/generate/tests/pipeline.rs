use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use geo::Contains as _;
use streetlights_generate::export::{self, Manifest, Table};
use streetlights_generate::progress::NullProgress;
use streetlights_generate::{GenerateError, GeneratorConfig, Stage, load, pipeline};

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "streetlights_pipeline_{name}_{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn small_config(seed: u64) -> GeneratorConfig {
    let mut config = GeneratorConfig::profile("full").unwrap();
    config.seed = Some(seed);
    config.reference_time = NaiveDate::from_ymd_opt(2025, 6, 15)
        .unwrap()
        .and_hms_opt(0, 0, 0);
    config.counts.neighborhoods = 5;
    config.counts.street_lights = 50;
    config.counts.suppliers = 4;
    config.counts.maintenance_requests = 100;
    config
}

fn read_all(dir: &Path, prefix: &str) -> Vec<(Table, Vec<u8>)> {
    Table::all()
        .iter()
        .map(|t| (*t, std::fs::read(t.path(dir, prefix)).unwrap()))
        .collect()
}

#[test]
fn small_dataset_is_consistent() {
    let dir = temp_dir("consistent");
    let summary = pipeline::run_all(small_config(42), &dir, &NullProgress).unwrap();
    assert_eq!(summary.neighborhoods, 5);
    assert_eq!(summary.street_lights, 50);
    assert_eq!(summary.weather_rows, 150);

    let nbhds = load::neighborhoods(&dir, "").unwrap();
    let lights = load::street_lights(&dir, "").unwrap();

    let names: BTreeSet<&str> = nbhds.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names.len(), 5);

    let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
    for light in &lights {
        let nbhd = nbhds
            .iter()
            .find(|n| n.id == light.neighborhood_id)
            .unwrap();
        assert!(
            nbhd.boundary.contains(&light.location),
            "{} not inside {} after reading back",
            light.id,
            nbhd.id
        );
        assert!(light.installation_date <= today);
    }

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn same_seed_gives_identical_bytes() {
    let first = temp_dir("seed_a");
    let second = temp_dir("seed_b");
    pipeline::run_all(small_config(42), &first, &NullProgress).unwrap();
    pipeline::run_all(small_config(42), &second, &NullProgress).unwrap();

    assert_eq!(read_all(&first, ""), read_all(&second, ""));
    assert_eq!(
        std::fs::read(first.join("manifest.json")).unwrap(),
        std::fs::read(second.join("manifest.json")).unwrap()
    );

    std::fs::remove_dir_all(&first).unwrap();
    std::fs::remove_dir_all(&second).unwrap();
}

#[test]
fn different_seeds_give_different_output() {
    let first = temp_dir("diff_a");
    let second = temp_dir("diff_b");
    pipeline::run_all(small_config(1), &first, &NullProgress).unwrap();
    pipeline::run_all(small_config(2), &second, &NullProgress).unwrap();

    let lights = |dir: &Path| std::fs::read(Table::StreetLights.path(dir, "")).unwrap();
    assert_ne!(lights(&first), lights(&second));

    std::fs::remove_dir_all(&first).unwrap();
    std::fs::remove_dir_all(&second).unwrap();
}

#[test]
fn unseeded_runs_differ() {
    let first = temp_dir("unseeded_a");
    let second = temp_dir("unseeded_b");
    let unseeded = || {
        let mut config = small_config(0);
        config.seed = None;
        config
    };
    pipeline::run_all(unseeded(), &first, &NullProgress).unwrap();
    pipeline::run_all(unseeded(), &second, &NullProgress).unwrap();

    let lights = |dir: &Path| std::fs::read(Table::StreetLights.path(dir, "")).unwrap();
    assert_ne!(lights(&first), lights(&second));

    std::fs::remove_dir_all(&first).unwrap();
    std::fs::remove_dir_all(&second).unwrap();
}

#[test]
fn single_stage_rerun_drops_the_full_run_manifest() {
    let dir = temp_dir("rerun");
    pipeline::run_all(small_config(1), &dir, &NullProgress).unwrap();
    let manifest = export::manifest_path(&dir, "");
    assert!(manifest.exists());

    pipeline::run_neighborhoods(small_config(2), &dir).unwrap();
    assert!(!manifest.exists());
    assert!(Table::StreetLights.path(&dir, "").exists());

    pipeline::run_all(small_config(3), &dir, &NullProgress).unwrap();
    assert!(manifest.exists());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn sample_profile_writes_prefixed_files_and_manifest() {
    let dir = temp_dir("sample");
    let mut config = GeneratorConfig::profile("sample").unwrap();
    config.seed = Some(7);
    pipeline::run_all(config, &dir, &NullProgress).unwrap();

    for table in Table::all() {
        assert!(
            table.path(&dir, "sample_").exists(),
            "missing {}",
            table.file_name("sample_")
        );
    }

    let manifest: Manifest =
        serde_json::from_str(&std::fs::read_to_string(dir.join("sample_manifest.json")).unwrap())
            .unwrap();
    assert_eq!(manifest.profile, "sample");
    assert_eq!(manifest.seed, Some(7));
    assert_eq!(manifest.files.len(), Table::all().len());
    let lights = manifest
        .files
        .iter()
        .find(|f| f.table == "street_lights")
        .unwrap();
    assert_eq!(lights.rows, 10);

    let staged: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(staged.is_empty());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn single_stages_chain_through_files() {
    let dir = temp_dir("stages");
    let config = small_config(5);

    let err = pipeline::run_street_lights(config.clone(), &dir).unwrap_err();
    assert!(matches!(err, GenerateError::MissingInput { .. }), "{err}");

    pipeline::run_neighborhoods(config.clone(), &dir).unwrap();
    pipeline::run_street_lights(config.clone(), &dir).unwrap();
    pipeline::run_suppliers(config.clone(), &dir).unwrap();
    pipeline::run_maintenance(config.clone(), &dir).unwrap();
    let summary = pipeline::run_enrichment(config, &dir).unwrap();
    assert_eq!(summary.power_grid_rows, 50);
    assert_eq!(summary.demographics_rows, 5);

    let report = pipeline::run_report(&dir, "").unwrap();
    assert_eq!(report.total_lights, 50);
    assert_eq!(
        report.within_near + report.within_far + report.beyond_far,
        50
    );
    let per_neighborhood: usize = report.neighborhoods.iter().map(|n| n.light_count).sum();
    assert_eq!(per_neighborhood, 50);
    assert!(report.neighborhoods.iter().all(|n| n.light_count == n.lights_inside));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn invalid_config_writes_nothing() {
    let dir = temp_dir("invalid");
    let mut config = small_config(3);
    config.counts.suppliers = 0;

    let err = pipeline::run_all(config, &dir, &NullProgress).unwrap_err();
    match err {
        GenerateError::StageFailed { stage, source } => {
            assert_eq!(stage, Stage::Configuration);
            assert!(matches!(*source, GenerateError::Config(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.exists());
}
