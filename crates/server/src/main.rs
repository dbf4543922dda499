use clap::Parser;
use snpwizard_core::config;
use snpwizard_server::api::create_router;
use snpwizard_server::api::handlers::AppState;
use snpwizard_server::api::metrics;
use snpwizard_server::reference::{ReferenceSource, SharedReference};
use snpwizard_server::store::postgres::PgVariantStore;
use sqlx::postgres::PgConnectOptions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snpwizard-server", about = "Mouse SNP wizard search service")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// PostgreSQL connection URL; overrides the POSTGRES_* settings
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[arg(long, env = "POSTGRES_HOST", default_value = "localhost")]
    pg_host: String,

    #[arg(long, env = "POSTGRES_PORT", default_value_t = 5432)]
    pg_port: u16,

    #[arg(long, env = "POSTGRES_USER", default_value = "postgres")]
    pg_user: String,

    #[arg(long, env = "POSTGRES_PASSWORD", hide_env_values = true)]
    pg_password: Option<String>,

    #[arg(long, env = "POSTGRES_DB", default_value = "snps")]
    pg_database: String,

    /// Maximum pooled database connections
    #[arg(long, default_value_t = config::DEFAULT_MAX_CONNECTIONS)]
    max_connections: u32,

    /// Connection attempts at startup before giving up
    #[arg(long, default_value_t = config::DEFAULT_CONNECT_ATTEMPTS)]
    connect_attempts: u32,

    /// Statement timeout of count queries in milliseconds (0 = none)
    #[arg(long, default_value_t = config::DEFAULT_COUNT_TIMEOUT_MS)]
    count_timeout_ms: u64,

    /// Statement timeout of page and export queries in milliseconds (0 = none)
    #[arg(long, default_value_t = config::DEFAULT_PAGE_TIMEOUT_MS)]
    page_timeout_ms: u64,

    /// JSON array of strain names
    #[arg(long, default_value = config::DEFAULT_STRAINS_FILE)]
    strains_file: PathBuf,

    /// JSON array of strain display-order entries
    #[arg(long, default_value = config::DEFAULT_STRAIN_ORDER_FILE)]
    strain_order_file: PathBuf,

    /// Graceful shutdown timeout in seconds
    #[arg(long, default_value_t = config::DEFAULT_SHUTDOWN_TIMEOUT_SECS)]
    shutdown_timeout: u64,
}

impl Args {
    fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        if let Some(ref url) = self.database_url {
            return url.parse();
        }
        let mut options = PgConnectOptions::new()
            .host(&self.pg_host)
            .port(self.pg_port)
            .username(&self.pg_user)
            .database(&self.pg_database);
        if let Some(ref password) = self.pg_password {
            options = options.password(password);
        }
        Ok(options)
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(
                    "snpwizard_server=info"
                        .parse()
                        .expect("valid directive literal"),
                )
                .add_directive(
                    "snpwizard_core=info"
                        .parse()
                        .expect("valid directive literal"),
                ),
        )
        .init();

    let args = Args::parse();

    if args.port == 0 {
        eprintln!("Error: port must be > 0");
        std::process::exit(1);
    }
    if args.max_connections == 0 {
        eprintln!("Error: max_connections must be > 0");
        std::process::exit(1);
    }

    let options = args.connect_options()?;
    let store = PgVariantStore::connect(options, args.max_connections, args.connect_attempts).await?;

    let reference_source = ReferenceSource {
        strains_file: args.strains_file.clone(),
        order_file: args.strain_order_file.clone(),
    };
    let reference = SharedReference::new(reference_source.load(&store).await?);

    let admin_key = std::env::var("SNPWIZARD_ADMIN_KEY").ok();
    if admin_key.is_some() {
        tracing::info!("Admin key authentication enabled");
    } else {
        tracing::info!("No admin key set, /admin/reload is unauthenticated");
    }

    let prometheus_handle =
        metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    let state = AppState {
        store: Arc::new(store.clone()),
        reference: reference.clone(),
        reference_source,
        prometheus_handle,
        count_timeout: millis(args.count_timeout_ms),
        page_timeout: millis(args.page_timeout_ms),
        admin_key,
        start_time: Instant::now(),
    };

    let app = create_router(state);
    let addr = format!("0.0.0.0:{}", args.port);

    {
        let data = reference.current();
        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            port = args.port,
            max_connections = args.max_connections,
            count_timeout_ms = args.count_timeout_ms,
            page_timeout_ms = args.page_timeout_ms,
            strains = data.strains.names().len(),
            consequences = data.consequences.len(),
            tables = data.tables.len(),
            "snpwizard ready"
        );
    }

    // Spawn metrics background task
    let metrics_store = store.clone();
    let metrics_reference = reference.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(15));
        loop {
            interval.tick().await;
            metrics::update_reference_metrics(&metrics_reference);
            metrics::update_pool_metrics(metrics_store.pool_stats());
        }
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    tracing::info!("All requests drained, closing database pool...");
    if tokio::time::timeout(Duration::from_secs(args.shutdown_timeout), store.close())
        .await
        .is_err()
    {
        tracing::error!(
            "Shutdown timeout ({}s) exceeded while closing the pool",
            args.shutdown_timeout
        );
    }

    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }

    tracing::info!("Shutting down gracefully, draining in-flight requests...");
}
