use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser};
use oauth_token_proxy::{
    ClientRegistry, DEFAULT_SECRET_PREFIX, EnvSecretStore, HttpTokenUrls, MemoryTokenUrls,
    ProxyConfig, ProxyError, RouteMode, TokenProxy,
};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    name = "oauth-token-proxy",
    version,
    about = "Proxy browser OAuth token requests to per-client upstream token endpoints."
)]
#[command(group(ArgGroup::new("registry").required(true).args(["registry_file", "registry_url"])))]
struct Cli {
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "PORT", default_value_t = 8787)]
    port: u16,

    /// JSON file of the form {"token_urls": {"<client_id>": "<url>"}}
    #[arg(long, env = "REGISTRY_FILE")]
    registry_file: Option<PathBuf>,

    /// Key-value service queried as GET <url>/<client_id>
    #[arg(long, env = "REGISTRY_URL")]
    registry_url: Option<String>,

    /// Client secrets are read from the environment variable <prefix><client_id>
    #[arg(long, env = "SECRET_PREFIX", default_value = DEFAULT_SECRET_PREFIX)]
    secret_prefix: String,

    #[arg(long, default_value_t = RouteMode::Single)]
    route_mode: RouteMode,

    /// Ignore the ?basic flag and always send credentials in the body
    #[arg(long)]
    no_basic: bool,

    #[arg(long)]
    upstream_timeout_secs: Option<u64>,

    /// Origin advertised in the usage text
    #[arg(long, env = "PUBLIC_URL")]
    public_url: Option<String>,

    #[arg(long)]
    user_agent: Option<String>,

    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), ProxyError> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    let secrets = EnvSecretStore::with_prefix(cli.secret_prefix.clone())?;
    let registry = match &cli.registry_file {
        Some(path) => {
            let urls = MemoryTokenUrls::load(path)?;
            tracing::info!(path = %path.display(), clients = urls.len(), "loaded token url registry");
            ClientRegistry::new(urls, secrets)
        }
        // clap guarantees one of the two sources is present
        None => {
            let url = cli.registry_url.as_deref().unwrap_or_default();
            ClientRegistry::new(HttpTokenUrls::new(url)?, secrets)
        }
    };

    let proxy = TokenProxy::new(build_config(&cli), registry)?;
    let listener = TcpListener::bind((cli.host.as_str(), cli.port)).await?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %listener.local_addr()?,
        route_mode = %cli.route_mode,
        "token proxy listening"
    );

    proxy
        .serve_with_shutdown(listener, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to install ctrl-c handler");
            }
        })
        .await
}

fn build_config(cli: &Cli) -> ProxyConfig {
    let mut config = ProxyConfig::new()
        .with_route_mode(cli.route_mode)
        .with_basic_auth(!cli.no_basic);
    if let Some(secs) = cli.upstream_timeout_secs {
        config = config.with_upstream_timeout(Duration::from_secs(secs));
    }
    if let Some(public_url) = &cli.public_url {
        config = config.with_public_url(public_url.clone());
    }
    if let Some(user_agent) = &cli.user_agent {
        config = config.with_user_agent(user_agent.clone());
    }
    config
}
