mod doctor_commands;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    chorus_config::{ChorusConfig, Credentials},
    chorus_gateway::{AppState, StartDefaults},
    chorus_generation::OpenRouterGenerator,
    chorus_kick::{KickClient, KickDelivery},
    chorus_session::SessionDeps,
    chorus_stream::WebSocketTransport,
    chorus_supervisor::{ChannelSupervisor, SupervisorSettings},
};

#[derive(Parser)]
#[command(name = "chorus", about = "chorus: Kick chat bot channel supervisor")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching the standard locations.
    #[arg(long, global = true, env = "CHORUS_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the control surface (default when no subcommand is provided).
    Serve,
    /// Validate config and credentials without starting anything.
    Doctor,
}

fn init_telemetry(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load config, apply env overrides, then CLI overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<(ChorusConfig, Option<PathBuf>)> {
    let (mut config, path) = chorus_config::discover_and_load(cli.config.as_deref())?;
    chorus_config::apply_env_overrides(&mut config)?;
    if let Some(bind) = &cli.bind {
        config.server.bind.clone_from(bind);
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok((config, path))
}

async fn serve(cli: &Cli) -> anyhow::Result<()> {
    let (config, path) = resolve_config(cli)?;
    if let Some(path) = &path {
        info!(path = %path.display(), "loaded config");
    }

    let result = chorus_config::validate(&config);
    for diagnostic in &result.diagnostics {
        warn!(%diagnostic, "config");
    }
    if result.has_errors() {
        anyhow::bail!(
            "invalid configuration ({} error(s)), run `chorus doctor` for details",
            result.errors().count()
        );
    }

    let credentials = Arc::new(Credentials::load(&config.credentials)?);
    info!(
        accounts = credentials.accounts.len(),
        proxies = credentials.proxies.len(),
        "credentials loaded"
    );

    let kick = Arc::new(KickClient::new(&config.kick).context("building kick client")?);
    let generator = OpenRouterGenerator::new(
        &config.generation,
        config.session.message_collection_interval(),
    )
    .context("building generation client")?;

    let deps = SessionDeps {
        resolver: Arc::clone(&kick) as _,
        transport: Arc::new(WebSocketTransport::new(config.kick.websocket_url.as_str())),
        generator: Arc::new(generator),
        delivery: Arc::new(KickDelivery::new(&config.kick)),
        credentials,
    };
    let supervisor = ChannelSupervisor::new(kick, deps, SupervisorSettings {
        live_check_interval: config.supervisor.live_check_interval(),
        collection_interval: config.session.message_collection_interval(),
        keepalive_interval: config.session.keepalive_interval(),
    });

    let app = chorus_gateway::build_app(AppState {
        supervisor: supervisor.clone(),
        defaults: StartDefaults {
            messages_per_minute: config.session.default_messages_per_minute,
            sender_count: config.session.default_sender_count,
        },
    });

    let addr = tokio::net::lookup_host((config.server.bind.as_str(), config.server.port))
        .await?
        .next()
        .with_context(|| format!("cannot resolve bind address {}", config.server.bind))?;

    chorus_gateway::serve(addr, app, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        info!("shutdown requested");
    })
    .await?;

    info!(channels = supervisor.len(), "stopping managed channels");
    supervisor.shutdown().await;
    info!("chorus stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!(version = env!("CARGO_PKG_VERSION"), "chorus starting");

    match cli.command {
        None | Some(Commands::Serve) => serve(&cli).await,
        Some(Commands::Doctor) => doctor_commands::handle_doctor(cli.config.as_deref()),
    }
}
