mod host;
mod logging;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use reelsync_core::config::AppConfig;
use reelsync_core::store::ApiKeys;
use reelsync_runtime::{Runtime, RuntimeError};

#[derive(Parser)]
#[command(name = "reelsync")]
#[command(about = "Scrobble streaming-site playback to Trakt", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Don't write a log file.
    #[arg(long, global = true)]
    no_log_file: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the browser host protocol on stdin/stdout
    Run {
        /// Print the pipeline event log to stderr when input closes
        #[arg(long)]
        events: bool,
    },
    /// Link a Trakt account with the device flow
    Auth,
    /// Store API credentials; omitted flags keep their saved value
    Keys {
        #[arg(long)]
        client_id: Option<String>,
        #[arg(long)]
        client_secret: Option<String>,
        #[arg(long)]
        tmdb_api_key: Option<String>,
    },
    /// Show how a page title is parsed
    Parse {
        title: String,
    },
    /// Parse and resolve a page title against the catalog
    Resolve {
        title: String,
        /// Release year hint
        #[arg(long)]
        year: Option<u16>,
    },
    /// Pin a title to a catalog id, slug or URL
    Correct {
        /// Title exactly as detected
        title: String,
        /// Trakt id, slug, or show/movie URL
        #[arg(required_unless_present = "remove")]
        target: Option<String>,
        /// Drop the correction instead
        #[arg(long)]
        remove: bool,
    },
    /// Print the last now-playing record
    NowPlaying,
    /// Forget the Trakt access token
    Logout,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_dir = if cli.no_log_file {
        None
    } else {
        AppConfig::data_dir().filter(|dir| std::fs::create_dir_all(dir).is_ok())
    };
    let _guard = logging::init(log_dir.as_deref());

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<(), RuntimeError> {
    // Parsing needs no store or credentials.
    if let Commands::Parse { title } = &command {
        let parsed = reelsync_parse::parse(title).map_err(|e| RuntimeError::Parse(e.to_string()))?;
        print_json(&parsed);
        return Ok(());
    }

    let runtime = Runtime::new()?;
    runtime.sync_credentials().await?;

    match command {
        Commands::Parse { .. } => Ok(()),
        Commands::Run { events } => {
            let _sync = runtime.spawn_credential_sync().await?;
            tracing::info!("Serving host protocol on stdin");
            let result = host::serve(&runtime).await;
            if events {
                for (at, event) in runtime.event_snapshot() {
                    match serde_json::to_string(&serde_json::json!({ "at": at, "event": event })) {
                        Ok(line) => eprintln!("{line}"),
                        Err(e) => tracing::warn!(error = %e, "Failed to encode event"),
                    }
                }
            }
            result
        }
        Commands::Auth => {
            let token = runtime
                .authorize(|code| {
                    eprintln!(
                        "Open {} and enter the code {}",
                        code.verification_url, code.user_code
                    );
                })
                .await?;
            eprintln!(
                "Authorized{}",
                token
                    .scope
                    .map(|scope| format!(" (scope: {scope})"))
                    .unwrap_or_default()
            );
            Ok(())
        }
        Commands::Keys {
            client_id,
            client_secret,
            tmdb_api_key,
        } => {
            let keys = runtime
                .update_api_keys(ApiKeys {
                    client_id,
                    client_secret,
                    tmdb_api_key,
                })
                .await?;
            let mask = |v: &Option<String>| if v.is_some() { "set" } else { "missing" };
            eprintln!(
                "client_id: {}, client_secret: {}, tmdb_api_key: {}",
                mask(&keys.client_id),
                mask(&keys.client_secret),
                mask(&keys.tmdb_api_key)
            );
            Ok(())
        }
        Commands::Resolve { title, year } => {
            match runtime.resolve_title(&title, year).await? {
                Some(resolved) => print_json(&resolved),
                None => eprintln!("No catalog match for {title:?}"),
            }
            Ok(())
        }
        Commands::Correct {
            title,
            target,
            remove,
        } => {
            if remove {
                if runtime.remove_correction(&title).await? {
                    eprintln!("Removed correction for {title:?}");
                } else {
                    eprintln!("No correction for {title:?}");
                }
                return Ok(());
            }
            let target = target.unwrap_or_default();
            let item = runtime.set_correction(&title, &target).await?;
            eprintln!("{title:?} now resolves to {} ({})", item.title, item.kind);
            Ok(())
        }
        Commands::NowPlaying => {
            match runtime.now_playing().await? {
                Some(record) => print_json(&record),
                None => eprintln!("Nothing played yet"),
            }
            Ok(())
        }
        Commands::Logout => {
            runtime.logout().await?;
            eprintln!("Logged out");
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => tracing::warn!(error = %e, "Failed to encode output"),
    }
}
