use anyhow::Result;
use bootimg_efi::bootimg::{self, BootAction};
use bootimg_efi::config::{AppConfig, CONFIG_FILE};
use clap::{Parser, Subcommand};
use log::{error, info};

#[derive(Parser)]
#[command(name = "bootimg-efi")]
#[command(about = "Build EFI boot partitions for GRUB2 and systemd-boot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Boot(BootAction),

    /// Generate configuration file (.bootimg-efi.toml) in current directory
    Genconfig {
        /// Force overwrite existing configuration file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logger, default info level, display file line number and time
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            let level_style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "[{} {level_style}{}{level_style:#} {}:{}] {level_style}{}{level_style:#}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    let cli = Cli::parse();

    // Try to load configuration file
    let app_config = if std::path::Path::new(CONFIG_FILE).exists() {
        match AppConfig::load_from_file(CONFIG_FILE) {
            Ok(cfg) => {
                let abs_path = std::fs::canonicalize(CONFIG_FILE)
                    .unwrap_or_else(|_| std::path::PathBuf::from(CONFIG_FILE));
                info!("Using configuration file: {}", abs_path.display());
                cfg
            }
            Err(e) => {
                error!("Failed to load configuration file: {}, using defaults", e);
                AppConfig::default()
            }
        }
    } else {
        AppConfig::default()
    };

    match cli.command {
        Commands::Boot(action) => {
            let settings = app_config.plugin.unwrap_or_default();
            bootimg::run(action, &settings, &app_config.vars)?;
        }

        Commands::Genconfig { force } => {
            if let Err(e) = AppConfig::generate_config_file(force) {
                error!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
