pub mod catalog;
pub mod config;
pub mod dump;
pub mod export;

pub use catalog::CapabilityFlags;
pub use config::ExportConfig;
pub use export::{ExportReport, FailedExport};

pub async fn export_databases(config: ExportConfig) -> anyhow::Result<ExportReport> {
    export::prepare_export_dir(&config.export_dir)?;

    let mut catalog = catalog::new(&config).await?;
    let executor = dump::MysqldumpExecutor::locate(&config.dump_binary);

    export::run(
        &config,
        catalog.as_mut(),
        &executor,
        chrono::Local::now(),
    )
    .await
}
