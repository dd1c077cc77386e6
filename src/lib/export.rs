use crate::catalog::{self, CapabilityFlags, Catalog};
use crate::config::ExportConfig;
use crate::dump::{build_dump_args, DumpExecutor, DumpOutcome, ExportJob};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::{error, info, warn};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("valid filename pattern"));

/// A database whose dump did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedExport {
    pub database: String,
    /// `None` when the dump process could not be run at all.
    pub exit_code: Option<i32>,
}

/// What a single run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub export_dir: PathBuf,
    pub timestamp: String,
    pub exported: Vec<PathBuf>,
    pub failed: Vec<FailedExport>,
}

impl ExportReport {
    fn new(export_dir: &Path, timestamp: String) -> ExportReport {
        ExportReport {
            export_dir: export_dir.to_path_buf(),
            timestamp,
            exported: vec![],
            failed: vec![],
        }
    }

    pub fn attempted(&self) -> usize {
        self.exported.len() + self.failed.len()
    }
}

pub fn prepare_export_dir(path: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }

    if let Err(err) = builder.create(path) {
        if !path.is_dir() {
            return Err(err).with_context(|| {
                format!("Failed to create export directory: {}", path.display())
            });
        }
    }

    Ok(())
}

pub fn run_timestamp(now: &DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

pub fn sanitize_name(database: &str) -> String {
    UNSAFE_FILENAME_CHARS.replace_all(database, "_").into_owned()
}

pub fn target_path(export_dir: &Path, timestamp: &str, safe_name: &str) -> PathBuf {
    export_dir.join(format!("{}_{}.sql", timestamp, safe_name))
}

pub fn plan_job(
    config: &ExportConfig,
    flags: &CapabilityFlags,
    timestamp: &str,
    database: &str,
) -> ExportJob {
    let safe_name = sanitize_name(database);
    let target_path = target_path(&config.export_dir, timestamp, &safe_name);
    let args = build_dump_args(config, flags, database, &target_path);

    ExportJob {
        database: database.to_string(),
        safe_name,
        target_path,
        args,
    }
}

// Removes the file only when it exists and is empty, returns whether it did
pub fn remove_empty_artifact(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() == 0 => {
            fs::remove_file(path)?;
            Ok(true)
        }
        Ok(_) => Ok(false),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

pub async fn run(
    config: &ExportConfig,
    catalog: &mut dyn Catalog,
    executor: &dyn DumpExecutor,
    now: DateTime<Local>,
) -> Result<ExportReport> {
    let flags = catalog::detect_capabilities(catalog).await;

    let databases = catalog
        .list_databases()
        .await
        .context("Couldn't list databases")?;

    let timestamp = run_timestamp(&now);
    let mut report = ExportReport::new(&config.export_dir, timestamp);

    if databases.is_empty() {
        info!("No user databases found.");
        return Ok(report);
    }

    if !flags.event_scheduler_enabled {
        info!("Note: event_scheduler is OFF; skipping --events in dumps.");
    }
    if !flags.supports_routine_library_catalog {
        info!("Note: information_schema.LIBRARIES not found; skipping --routines to avoid client/server mismatch.");
    }

    for database in databases.iter() {
        let job = plan_job(config, &flags, &report.timestamp, database);

        info!(
            "Exporting database '{}' to '{}' ...",
            job.database,
            job.target_path.display()
        );

        let outcome = match executor.run(&job).await {
            Ok(o) => o,
            Err(err) => {
                discard_empty_artifact(&job.target_path);
                error!("Failed to export '{}': {:?}", job.database, err);
                report.failed.push(FailedExport {
                    database: job.database,
                    exit_code: None,
                });
                continue;
            }
        };

        if !outcome.success() {
            discard_empty_artifact(&job.target_path);
            error!("{}", failure_message(&job.database, &outcome));
            report.failed.push(FailedExport {
                database: job.database,
                exit_code: Some(outcome.exit_code),
            });
            continue;
        }

        info!("Done: {}", job.target_path.display());
        report.exported.push(job.target_path);
    }

    info!(
        "All exports completed. Files are in: {}",
        report.export_dir.display()
    );

    Ok(report)
}

pub fn failure_message(database: &str, outcome: &DumpOutcome) -> String {
    let mut message = format!(
        "Failed to export '{}'. Exit code: {}",
        database, outcome.exit_code
    );

    if !outcome.output.is_empty() {
        message.push('\n');
        message.push_str(&outcome.output.join("\n"));
    }

    message
}

fn discard_empty_artifact(path: &Path) {
    if let Err(err) = remove_empty_artifact(path) {
        warn!("Couldn't remove empty file {}: {}", path.display(), err);
    }
}
