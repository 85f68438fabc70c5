use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use matchmate_api::{
    daily_refresh, spawn_ledger_maintenance, AppState, ClientConfig, FacadeConfig, FeatureSet,
    HttpRecommendationClient, RecommendationFacade, RefreshScheduler, RestApi, ServiceConfig,
    TokioRefreshScheduler, DEFAULT_REFRESH_CRON,
};
use matchmate_storage::{InMemoryProfileStore, RecommendationLedger};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FeatureSetArg {
    Standard,
    Extended,
}

impl From<FeatureSetArg> for FeatureSet {
    fn from(arg: FeatureSetArg) -> Self {
        match arg {
            FeatureSetArg::Standard => FeatureSet::Standard,
            FeatureSetArg::Extended => FeatureSet::Extended,
        }
    }
}

/// Roommate recommendation service with a local fallback
#[derive(Parser, Debug)]
#[command(name = "matchmate")]
#[command(about = "Roommate recommendations from an AI service, with local scoring as fallback", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "MATCHMATE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// HTTP API port
    #[arg(long, env = "MATCHMATE_PORT", default_value_t = 8080)]
    port: u16,

    /// Base URL of the AI recommendation service; local scoring only when unset
    #[arg(long, env = "AI_SERVICE_URL")]
    ai_service_url: Option<String>,

    /// Timeout for AI recommendation requests, in seconds
    #[arg(long, env = "AI_SERVICE_TIMEOUT", default_value_t = 30)]
    ai_timeout_secs: u64,

    /// Results returned when a request does not ask for a count
    #[arg(long, default_value_t = 5)]
    default_limit: usize,

    /// Fields that make up the feature vector
    #[arg(long, value_enum, default_value = "standard")]
    feature_set: FeatureSetArg,

    /// JSON snapshot of users and profiles to serve
    #[arg(long, env = "MATCHMATE_PROFILES")]
    profiles: Option<PathBuf>,

    /// File the recommendation ledger is persisted to
    #[arg(long, env = "MATCHMATE_LEDGER")]
    ledger: Option<PathBuf>,

    /// Seconds between ledger purges and writes
    #[arg(long, env = "MATCHMATE_LEDGER_FLUSH_SECS", default_value_t = 30)]
    ledger_flush_secs: u64,

    /// Daily refresh schedule, `M H * * *` in UTC
    #[arg(long, default_value = DEFAULT_REFRESH_CRON)]
    refresh_cron: String,

    /// Schedule the daily refresh for every user with a completed profile
    #[arg(long)]
    schedule_refresh: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            host: self.host.clone(),
            port: self.port,
            ai: self.ai_service_url.as_ref().map(|url| {
                ClientConfig::new(url.as_str()).with_timeout(Duration::from_secs(self.ai_timeout_secs))
            }),
            facade: FacadeConfig {
                default_limit: self.default_limit,
            },
            feature_set: self.feature_set.into(),
            profiles_path: self.profiles.clone(),
            ledger_path: self.ledger.clone(),
            ledger_flush_interval: Duration::from_secs(self.ledger_flush_secs.max(1)),
            refresh_cron: self.refresh_cron.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = args.service_config();
    info!("Starting matchmate v{}", env!("CARGO_PKG_VERSION"));
    info!("HTTP API: {}:{}", config.host, config.port);

    let encoder = config.feature_set.encoder();
    let store = Arc::new(InMemoryProfileStore::with_registry(encoder.registry().clone()));
    if let Some(path) = &config.profiles_path {
        let count = store.load_snapshot(path)?;
        info!("Loaded {} users from {:?}", count, path);
    }

    let ledger = Arc::new(match &config.ledger_path {
        Some(path) => RecommendationLedger::open(path)?,
        None => RecommendationLedger::new(),
    });
    let purged = ledger.purge_expired();
    if purged > 0 {
        info!("Purged {} expired recommendations", purged);
    }

    let maintenance =
        spawn_ledger_maintenance(ledger.clone(), &Handle::current(), config.ledger_flush_interval);

    let mut facade = RecommendationFacade::new(store.clone(), encoder, config.facade.clone())
        .with_ledger(ledger.clone());
    match &config.ai {
        Some(client_config) => {
            info!("AI service: {}", client_config.base_url);
            facade = facade.with_service(Arc::new(HttpRecommendationClient::new(client_config.clone())?));
        }
        None => warn!("No AI service configured, serving local recommendations only"),
    }
    let facade = Arc::new(facade);

    let scheduler = Arc::new(TokioRefreshScheduler::new(Handle::current()));
    if args.schedule_refresh {
        for user_id in store.usable_user_ids() {
            scheduler.schedule_recurring(&user_id, &config.refresh_cron, daily_refresh(facade.clone()))?;
        }
        info!("Scheduled daily refresh for {} users", scheduler.len());
    }

    let state = Arc::new(AppState {
        facade,
        ledger: ledger.clone(),
        scheduler,
        refresh_cron: config.refresh_cron.clone(),
    });

    let host = config.host.clone();
    let port = config.port;
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on {}:{}", host, port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(state, host, port).await {
                tracing::error!("HTTP server error: {}", e);
            }
        })
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    maintenance.abort();
    ledger.flush()?;
    Ok(())
}
