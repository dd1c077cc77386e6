use sqlx::mysql::MySqlConnectOptions;
use std::env;
use std::path::PathBuf;

// Schemas owned by the server itself, plus the stock `test` schema
pub const SYSTEM_SCHEMAS: [&str; 5] = [
    "information_schema",
    "mysql",
    "performance_schema",
    "sys",
    "test",
];

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_CHARSET: &str = "utf8mb4";
pub const DEFAULT_DUMP_BINARY: &str = "mysqldump";

/// Everything a run needs to know about the server and where to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Only used for the catalog connection, never handed to the dump process.
    pub password: String,
    pub charset: String,
    pub export_dir: PathBuf,
    pub dump_binary: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            charset: DEFAULT_CHARSET.to_string(),
            export_dir: default_export_dir(),
            dump_binary: DEFAULT_DUMP_BINARY.to_string(),
        }
    }
}

// An `exported` folder next to the executable
pub fn default_export_dir() -> PathBuf {
    match env::current_exe() {
        Ok(exe) => match exe.parent() {
            Some(dir) => dir.join("exported"),
            None => PathBuf::from("./exported"),
        },
        Err(..) => PathBuf::from("./exported"),
    }
}

impl ExportConfig {
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .charset(&self.charset);

        if self.password.is_empty() {
            return options;
        }

        options.password(&self.password)
    }
}
