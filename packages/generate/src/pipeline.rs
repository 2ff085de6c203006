//! Stage orchestration for full and single-stage runs.
//!
//! A full run generates every table in referential order, validates the
//! complete dataset, and commits all files together. Single-stage runs
//! read their upstream tables from the output directory, generate one
//! table (or the three enrichment tables), validate it against those
//! inputs, and commit only what they produced.

use std::path::{Path, PathBuf};

use crate::export::{
    DatasetWriter, DemographicsRow, Manifest, MaintenanceRequestRow, NeighborhoodRow,
    PowerGridRow, StreetLightRow, SupplierRow, Table, WeatherRow,
};
use crate::progress::{NullProgress, ProgressCallback};
use crate::report::CoverageReport;
use crate::summary::RunSummary;
use crate::{GenerateError, GeneratorConfig, PipelineContext, Stage, TIMESTAMP_FORMAT, load, validate};

/// Runs `f` as `stage`, attributing any failure to it.
fn run_stage<T>(
    stage: Stage,
    progress: &dyn ProgressCallback,
    f: impl FnOnce() -> Result<T, GenerateError>,
) -> Result<T, GenerateError> {
    progress.set_message(format!("Running {stage}"));
    log::debug!("Starting stage {stage}");

    let result = f().map_err(|e| {
        log::error!("Stage {stage} failed: {e}");
        GenerateError::StageFailed {
            stage,
            source: Box::new(e),
        }
    });

    progress.inc(1);
    result
}

/// Stages the given tables from `ctx` into `writer`.
fn stage_tables(
    writer: &mut DatasetWriter,
    ctx: &PipelineContext,
    tables: &[Table],
) -> Result<(), GenerateError> {
    for table in tables {
        match table {
            Table::Neighborhoods => {
                writer.stage(*table, ctx.neighborhoods.iter().map(NeighborhoodRow::from))?;
            }
            Table::StreetLights => {
                writer.stage(*table, ctx.street_lights.iter().map(StreetLightRow::from))?;
            }
            Table::Suppliers => {
                writer.stage(*table, ctx.suppliers.iter().map(SupplierRow::from))?;
            }
            Table::MaintenanceRequests => {
                let rows = ctx.maintenance_requests.iter().map(MaintenanceRequestRow::from);
                writer.stage(*table, rows)?;
            }
            Table::WeatherEnrichment => {
                writer.stage(*table, ctx.weather.iter().map(WeatherRow::from))?;
            }
            Table::DemographicsEnrichment => {
                writer.stage(*table, ctx.demographics.iter().map(DemographicsRow::from))?;
            }
            Table::PowerGridEnrichment => {
                writer.stage(*table, ctx.power_grid.iter().map(PowerGridRow::from))?;
            }
        }
    }
    Ok(())
}

/// Writes `tables` to `dir`, with a manifest when `with_manifest` is set.
fn export(
    ctx: &PipelineContext,
    dir: &Path,
    tables: &[Table],
    with_manifest: bool,
) -> Result<Vec<PathBuf>, GenerateError> {
    let config = ctx.config();
    let mut writer = DatasetWriter::new(dir, &config.file_prefix)?;
    stage_tables(&mut writer, ctx, tables)?;

    let manifest = with_manifest.then(|| Manifest {
        profile: config.name.clone(),
        seed: config.seed,
        reference_time: ctx.reference_time().format(TIMESTAMP_FORMAT).to_string(),
        files: writer.manifest_files(),
    });
    writer.commit(manifest.as_ref())
}

/// Generates, validates, and writes the complete dataset.
///
/// # Errors
///
/// Returns [`GenerateError::Config`] if the configuration is rejected, or
/// [`GenerateError::StageFailed`] naming the first stage that failed. No
/// output file is replaced unless every stage succeeds.
pub fn run_all(
    config: GeneratorConfig,
    output_dir: &Path,
    progress: &dyn ProgressCallback,
) -> Result<RunSummary, GenerateError> {
    progress.set_total(8);

    let mut ctx = run_stage(Stage::Configuration, progress, || PipelineContext::new(config))?;
    log::info!(
        "Generating '{}' dataset into {}",
        ctx.config().name,
        output_dir.display()
    );

    run_stage(Stage::Neighborhoods, progress, || ctx.generate_neighborhoods())?;
    run_stage(Stage::StreetLights, progress, || ctx.generate_street_lights())?;
    run_stage(Stage::Suppliers, progress, || {
        ctx.generate_suppliers();
        Ok(())
    })?;
    run_stage(Stage::Maintenance, progress, || ctx.generate_maintenance())?;
    run_stage(Stage::Enrichment, progress, || ctx.generate_enrichment())?;
    run_stage(Stage::Validation, progress, || validate::dataset(&ctx))?;
    run_stage(Stage::Export, progress, || {
        export(&ctx, output_dir, Table::all(), true)
    })?;

    let summary = RunSummary::from_context(&ctx);
    progress.finish(format!(
        "Wrote {} street lights and {} requests",
        summary.street_lights, summary.maintenance_requests
    ));
    summary.log();
    Ok(summary)
}

/// Generates and writes only the neighborhoods table.
///
/// # Errors
///
/// Returns a configuration, stage, or export error.
pub fn run_neighborhoods(
    config: GeneratorConfig,
    output_dir: &Path,
) -> Result<RunSummary, GenerateError> {
    let mut ctx = PipelineContext::new(config)?;
    run_stage(Stage::Neighborhoods, &NullProgress, || {
        ctx.generate_neighborhoods()?;
        validate::neighborhoods(&ctx.neighborhoods)
    })?;
    finish_single(&ctx, output_dir, &[Table::Neighborhoods])
}

/// Generates street lights inside the neighborhoods already on disk.
///
/// # Errors
///
/// Returns [`GenerateError::MissingInput`] if the neighborhoods table has
/// not been generated yet, or a stage or export error.
pub fn run_street_lights(
    config: GeneratorConfig,
    output_dir: &Path,
) -> Result<RunSummary, GenerateError> {
    let mut ctx = PipelineContext::new(config)?;
    ctx.neighborhoods = load::neighborhoods(output_dir, &ctx.config().file_prefix)?;
    run_stage(Stage::StreetLights, &NullProgress, || {
        ctx.generate_street_lights()?;
        validate::street_lights(&ctx.street_lights, &ctx.neighborhoods, ctx.reference_time())
    })?;
    finish_single(&ctx, output_dir, &[Table::StreetLights])
}

/// Generates and writes only the suppliers table.
///
/// # Errors
///
/// Returns a configuration, stage, or export error.
pub fn run_suppliers(config: GeneratorConfig, output_dir: &Path) -> Result<RunSummary, GenerateError> {
    let mut ctx = PipelineContext::new(config)?;
    run_stage(Stage::Suppliers, &NullProgress, || {
        ctx.generate_suppliers();
        validate::suppliers(&ctx.suppliers, &ctx.config().region)
    })?;
    finish_single(&ctx, output_dir, &[Table::Suppliers])
}

/// Generates maintenance history for the street lights already on disk.
///
/// # Errors
///
/// Returns [`GenerateError::MissingInput`] if the street lights table has
/// not been generated yet, or a stage or export error.
pub fn run_maintenance(
    config: GeneratorConfig,
    output_dir: &Path,
) -> Result<RunSummary, GenerateError> {
    let mut ctx = PipelineContext::new(config)?;
    ctx.street_lights = load::street_lights(output_dir, &ctx.config().file_prefix)?;
    run_stage(Stage::Maintenance, &NullProgress, || {
        ctx.generate_maintenance()?;
        validate::maintenance(
            &ctx.maintenance_requests,
            &ctx.street_lights,
            ctx.reference_time(),
        )
    })?;
    finish_single(&ctx, output_dir, &[Table::MaintenanceRequests])
}

/// Generates the three enrichment tables from the neighborhoods and street
/// lights already on disk.
///
/// # Errors
///
/// Returns [`GenerateError::MissingInput`] if either upstream table is
/// missing, or a stage or export error.
pub fn run_enrichment(
    config: GeneratorConfig,
    output_dir: &Path,
) -> Result<RunSummary, GenerateError> {
    let mut ctx = PipelineContext::new(config)?;
    let prefix = ctx.config().file_prefix.clone();
    ctx.neighborhoods = load::neighborhoods(output_dir, &prefix)?;
    ctx.street_lights = load::street_lights(output_dir, &prefix)?;
    run_stage(Stage::Enrichment, &NullProgress, || {
        ctx.generate_enrichment()?;
        validate::weather(&ctx.weather, &ctx.street_lights)?;
        validate::demographics(&ctx.demographics, &ctx.neighborhoods)?;
        validate::power_grid(&ctx.power_grid, &ctx.street_lights)
    })?;
    finish_single(
        &ctx,
        output_dir,
        &[
            Table::WeatherEnrichment,
            Table::DemographicsEnrichment,
            Table::PowerGridEnrichment,
        ],
    )
}

/// Commits a single-stage run. The previous manifest is removed by the
/// commit, since it no longer describes the files on disk.
fn finish_single(
    ctx: &PipelineContext,
    output_dir: &Path,
    tables: &[Table],
) -> Result<RunSummary, GenerateError> {
    run_stage(Stage::Export, &NullProgress, || {
        export(ctx, output_dir, tables, false)
    })?;

    let prefix = &ctx.config().file_prefix;
    for table in tables {
        let stale: Vec<String> = table
            .downstream()
            .iter()
            .filter(|t| !tables.contains(t) && t.path(output_dir, prefix).exists())
            .map(|t| t.file_name(prefix))
            .collect();
        if !stale.is_empty() {
            log::warn!(
                "Regenerated {table}; {} now reference the previous rows, rerun those stages",
                stale.join(", ")
            );
        }
    }

    let summary = RunSummary::from_context(ctx);
    summary.log();
    Ok(summary)
}

/// Builds the supplier coverage report for the dataset in `dir`.
///
/// # Errors
///
/// Returns [`GenerateError::MissingInput`] if a required table is missing,
/// or a CSV/parse error for malformed rows.
pub fn run_report(dir: &Path, prefix: &str) -> Result<CoverageReport, GenerateError> {
    let neighborhoods = load::neighborhoods(dir, prefix)?;
    let lights = load::street_lights(dir, prefix)?;
    let suppliers = load::suppliers(dir, prefix)?;
    Ok(CoverageReport::build(&neighborhoods, &lights, &suppliers))
}
