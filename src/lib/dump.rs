use crate::catalog::CapabilityFlags;
use crate::config::ExportConfig;
use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// One database's worth of work for the dump utility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    pub database: String,
    pub safe_name: String,
    pub target_path: PathBuf,
    pub args: Vec<String>,
}

/// Exit status and captured stdout/stderr lines of a single dump run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpOutcome {
    pub exit_code: i32,
    pub output: Vec<String>,
}

impl DumpOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

// DumpExecutor runs the external dump utility for a prepared job
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DumpExecutor {
    async fn run(&self, job: &ExportJob) -> Result<DumpOutcome>;
}

pub struct MysqldumpExecutor {
    program: PathBuf,
}

impl MysqldumpExecutor {
    // Resolves the binary through PATH, falling back to the bare name so the
    // spawn itself reports a missing binary
    pub fn locate(binary: &str) -> MysqldumpExecutor {
        let program = match which::which(binary) {
            Ok(p) => p,
            Err(err) => {
                debug!("{} not resolved through PATH: {}", binary, err);
                PathBuf::from(binary)
            }
        };

        MysqldumpExecutor { program }
    }

    #[cfg(test)]
    pub(crate) fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl DumpExecutor for MysqldumpExecutor {
    async fn run(&self, job: &ExportJob) -> Result<DumpOutcome> {
        let res = Command::new(&self.program)
            .args(&job.args)
            .stdin(Stdio::null())
            .output()
            .await;

        let res = match res {
            Ok(r) => r,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(DumpOutcome {
                    exit_code: 127,
                    output: vec![format!("{}: command not found", self.program.display())],
                })
            }
            Err(err) if err.kind() == ErrorKind::PermissionDenied => {
                return Ok(DumpOutcome {
                    exit_code: 126,
                    output: vec![format!("{}: permission denied", self.program.display())],
                })
            }
            Err(err) => return Err(err.into()),
        };

        let mut output: Vec<String> = String::from_utf8_lossy(&res.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        output.extend(
            String::from_utf8_lossy(&res.stderr)
                .lines()
                .map(str::to_string),
        );

        // Killed by a signal, no exit code to report
        let exit_code = res.status.code().unwrap_or(-1);

        Ok(DumpOutcome { exit_code, output })
    }
}

pub fn build_dump_args(
    config: &ExportConfig,
    flags: &CapabilityFlags,
    database: &str,
    target_path: &Path,
) -> Vec<String> {
    let mut args = vec![
        format!("--host={}", config.host),
        format!("--port={}", config.port),
        format!("--user={}", config.user),
        "--single-transaction".to_string(),
        "--quick".to_string(),
    ];

    if flags.supports_routine_library_catalog {
        args.push("--routines".to_string());
    }

    args.push("--triggers".to_string());

    if flags.event_scheduler_enabled {
        args.push("--events".to_string());
    }

    args.extend([
        "--hex-blob".to_string(),
        "--set-gtid-purged=OFF".to_string(),
        "--add-drop-table".to_string(),
        format!("--default-character-set={}", config.charset),
        // --single-transaction already gives a consistent view
        "--skip-lock-tables".to_string(),
        "--databases".to_string(),
        database.to_string(),
        format!("--result-file={}", target_path.display()),
    ]);

    args
}
