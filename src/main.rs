use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};
use slash::api::{ApiClient, ChatApi};
use slash::audio;
use slash::core::config::{load_config, resolve};
use slash::core::session::{FileSessionStore, MemorySessionStore, SessionStore};
use slash::core::state::App;
use slash::tui;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "slash", about = "Terminal client for the Slash messaging service")]
struct Args {
    /// API base URL (overrides SLASH_API_BASE and the config file)
    #[arg(long)]
    api_base: Option<String>,

    /// Config file to use instead of ~/.slash/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level for slash.log
    #[arg(long, default_value_t, value_enum)]
    log_level: LogLevel,

    /// Keep the session in memory only; nothing is written to ~/.slash
    #[arg(long)]
    no_persist: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    #[default]
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the API server is reachable and exit
    Status,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to slash.log in current directory
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create("slash.log") {
        let _ = WriteLogger::init(args.log_level.into(), log_config, log_file);
    }

    let file_config = load_config(args.config.as_deref()).map_err(std::io::Error::other)?;
    let config = resolve(&file_config, args.api_base.as_deref());
    log::info!("Slash starting up against {}", config.api_base);

    let api = Arc::new(ApiClient::new(config.api_base.clone()));

    if let Some(Commands::Status) = args.command {
        return match api.status().await {
            Ok(status) => {
                println!("{} is up: {}", config.api_base, status);
                Ok(())
            }
            Err(e) => Err(std::io::Error::other(e.to_string())),
        };
    }

    let store: Arc<dyn SessionStore> = if args.no_persist {
        Arc::new(MemorySessionStore::new())
    } else {
        Arc::new(FileSessionStore::default_location()?)
    };

    let app = App::new(config, api, store, audio::default_device());
    tui::run(app)
}
