use clap::{crate_description, crate_version, Arg, ArgAction, Command};
use log::{error, info};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::path::PathBuf;

mod config;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    TermLogger::init(
        config::log_level(),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("Failed to initialize logger");

    let matches = Command::new("mariadump")
        .about(crate_description!())
        .version(format!("v{}", crate_version!()))
        .name("mariadump")
        .arg(
            Arg::new("project")
                .short('p')
                .long("project")
                .help("The project in mariadump.toml to use")
                .action(ArgAction::Set)
                .num_args(1),
        )
        .get_matches();

    let export_config = match matches.get_one::<String>("project") {
        Some(project) => {
            let file = PathBuf::from(config::config_file());
            config::load_config_file(&file, project)
        }
        None => config::from_env(),
    };

    let export_config = match export_config {
        Ok(c) => c,
        Err(err) => {
            error!("Failed to load config: {:?}", err);
            std::process::exit(1);
        }
    };

    match mariadump::export_databases(export_config).await {
        Err(err) => {
            error!("{:?}", err);
            std::process::exit(1);
        }
        Ok(report) => {
            // Individual failures are reported above and never change the exit status
            if !report.failed.is_empty() {
                info!(
                    "{} of {} exports failed",
                    report.failed.len(),
                    report.attempted()
                );
            }
        }
    };
}
