mod ban_commands;
mod builtins;
mod config_commands;
mod console;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    anyhow::Context as _,
    clap::{Parser, Subcommand},
    courier_channels::{AccessStore, JsonFileStore, MemoryStore},
    courier_config::CourierConfig,
    courier_router::Router,
    tokio::{
        io::{AsyncBufReadExt, BufReader},
        task::JoinSet,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use console::{ConsoleClient, LineDefaults};

#[derive(Parser)]
#[command(name = "courier", about = "Courier, a chat-bot message router")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery).
    #[arg(long, global = true, env = "COURIER_CONFIG")]
    config: Option<PathBuf>,

    /// Default command prefix (overrides config value).
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// JSON store file (overrides config value; in-memory when unset).
    #[arg(long, global = true, env = "COURIER_STORE")]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read events from stdin and route them (default).
    Run {
        /// Sender id for plain-text input lines.
        #[arg(long, default_value = "console-user")]
        user: String,
        /// Thread id for plain-text input lines.
        #[arg(long, default_value = "console")]
        thread: String,
        /// Users reported as thread admins by the console client.
        #[arg(long = "thread-admin")]
        thread_admins: Vec<String>,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
    /// Ban management on the store file.
    Bans {
        #[command(subcommand)]
        action: ban_commands::BanAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Load the config from `explicit` or the standard locations.
pub(crate) fn load_settings(explicit: Option<&Path>) -> anyhow::Result<CourierConfig> {
    match explicit {
        Some(path) => courier_config::load_config(path),
        None => Ok(courier_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "courier starting");

    match cli.command {
        None => {
            run(&cli, "console-user".into(), "console".into(), Vec::new()).await
        },
        Some(Commands::Run {
            ref user,
            ref thread,
            ref thread_admins,
        }) => run(&cli, user.clone(), thread.clone(), thread_admins.clone()).await,
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
        Some(Commands::Bans { action }) => {
            let config = load_settings(cli.config.as_deref())?;
            let path = cli
                .store
                .or(config.store.path)
                .context("no store file configured (use --store or store.path)")?;
            ban_commands::handle_bans(action, &path).await
        },
    }
}

async fn run(
    cli: &Cli,
    sender_id: String,
    thread_id: String,
    thread_admins: Vec<String>,
) -> anyhow::Result<()> {
    let mut config = load_settings(cli.config.as_deref())?;
    if let Some(prefix) = &cli.prefix {
        config.prefix = prefix.clone();
    }

    let validation = courier_config::validate(&config);
    for diagnostic in &validation.diagnostics {
        warn!(%diagnostic, "config");
    }
    if validation.has_errors() {
        anyhow::bail!("invalid configuration, run `courier config check` for details");
    }

    let store: Arc<dyn AccessStore> = match cli.store.as_ref().or(config.store.path.as_ref()) {
        Some(path) => {
            info!(path = %path.display(), "using JSON store");
            Arc::new(JsonFileStore::open(path).await?)
        },
        None => {
            info!("using in-memory store");
            Arc::new(MemoryStore::new())
        },
    };

    let client = Arc::new(ConsoleClient::new(thread_admins));
    let sweep_interval = config.replies.sweep_interval();
    let router = Arc::new(Router::new(
        client.clone(),
        store,
        builtins::registry()?,
        config,
    ));

    let cancel = CancellationToken::new();
    let sweeper = router
        .correlator()
        .spawn_sweeper(sweep_interval, cancel.clone());

    let defaults = LineDefaults {
        sender_id,
        thread_id,
    };
    info!(
        prefix = %router.config().prefix,
        commands = router.registry().len(),
        "reading events from stdin"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = JoinSet::new();
    let mut seq: u64 = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                seq += 1;
                let event = match console::parse_line(&line, &defaults, seq) {
                    Ok(Some(event)) => event,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(error = %e, "skipping input line");
                        continue;
                    },
                };
                client.observe(&event);
                let router = Arc::clone(&router);
                in_flight.spawn(async move {
                    let thread_id = event.thread_id.clone();
                    match router.handle_event(event).await {
                        Ok(dispatch) => debug!(thread_id, ?dispatch, "event handled"),
                        Err(e) => error!(thread_id, error = %e, "event handling failed"),
                    }
                });
            },
        }
        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    cancel.cancel();
    sweeper.await?;
    info!("courier stopped");
    Ok(())
}
