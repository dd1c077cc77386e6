use anyhow::{bail, Context, Result};
use log::LevelFilter;
use mariadump::config::{
    default_export_dir, ExportConfig, DEFAULT_CHARSET, DEFAULT_DUMP_BINARY, DEFAULT_HOST,
    DEFAULT_PORT, DEFAULT_USER,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::{env, fs};

fn non_empty_var(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => None,
    }
}

pub fn host() -> String {
    non_empty_var("DUMP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string())
}

pub fn port() -> Result<u16> {
    match non_empty_var("DUMP_PORT") {
        Some(v) => v
            .parse::<u16>()
            .with_context(|| format!("DUMP_PORT is not a valid port: {}", v)),
        None => Ok(DEFAULT_PORT),
    }
}

pub fn user() -> String {
    non_empty_var("DUMP_USER").unwrap_or_else(|| DEFAULT_USER.to_string())
}

pub fn password() -> String {
    non_empty_var("DUMP_PASSWORD").unwrap_or_default()
}

pub fn charset() -> String {
    non_empty_var("DUMP_CHARSET").unwrap_or_else(|| DEFAULT_CHARSET.to_string())
}

pub fn dump_binary() -> String {
    non_empty_var("DUMP_BINARY").unwrap_or_else(|| DEFAULT_DUMP_BINARY.to_string())
}

// Defaults to an `exported` folder next to the executable
pub fn export_dir() -> PathBuf {
    if let Some(v) = non_empty_var("DUMP_EXPORT_DIR") {
        return PathBuf::from(v);
    }

    default_export_dir()
}

pub fn config_file() -> String {
    non_empty_var("DUMP_CONFIG_FILE").unwrap_or_else(|| "./mariadump.toml".to_string())
}

pub fn log_level() -> LevelFilter {
    if let Some(v) = non_empty_var("DUMP_LOG_LEVEL") {
        if let Ok(level) = v.parse::<LevelFilter>() {
            return level;
        }
    }

    LevelFilter::Info
}

pub fn from_env() -> Result<ExportConfig> {
    Ok(ExportConfig {
        host: host(),
        port: port()?,
        user: user(),
        password: password(),
        charset: charset(),
        export_dir: export_dir(),
        dump_binary: dump_binary(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectConfig {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    charset: Option<String>,
    export_dir: Option<PathBuf>,
    dump_binary: Option<String>,
}

impl ProjectConfig {
    fn apply(self, mut config: ExportConfig) -> ExportConfig {
        if let Some(v) = self.host {
            config.host = v;
        }
        if let Some(v) = self.port {
            config.port = v;
        }
        if let Some(v) = self.user {
            config.user = v;
        }
        if let Some(v) = self.password {
            config.password = v;
        }
        if let Some(v) = self.charset {
            config.charset = v;
        }
        if let Some(v) = self.export_dir {
            config.export_dir = v;
        }
        if let Some(v) = self.dump_binary {
            config.dump_binary = v;
        }

        config
    }
}

pub fn load_config_file(file_path: &Path, project_name: &str) -> Result<ExportConfig> {
    if !file_path.is_file() {
        bail!("{} don't exist", file_path.display());
    }

    let contents = fs::read_to_string(file_path)?;
    let mut projects: HashMap<String, ProjectConfig> = toml::from_str(contents.as_str())
        .with_context(|| format!("couldn't parse {}", file_path.display()))?;

    match projects.remove(project_name) {
        Some(project) => Ok(project.apply(from_env()?)),
        None => bail!("didn't find config for {}", project_name),
    }
}
