use anyhow::{anyhow, Context};
use clap::Parser;
use kasasagi::cache::{CacheStore, EvictionService, EvictionSweeper};
use kasasagi::config::Config;
use kasasagi::markers::MarkerCompositor;
use kasasagi::pipeline::Pipeline;
use kasasagi::request_coalescing::RequestCoalescer;
use kasasagi::server::ImageServer;
use kasasagi::storage;
use pingora_core::server::configuration::Opt;
use pingora_core::server::Server;
use pingora_core::services::background::background_service;
use std::path::PathBuf;
use std::sync::Arc;

/// Kasasagi - on-demand image crop/resize server built with Cloudflare's Pingora
#[derive(Parser, Debug)]
#[command(name = "kasasagi")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Daemon mode
    #[arg(short = 'd', long)]
    daemon: bool,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("kasasagi: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?;
    config
        .validate()
        .map_err(|e| anyhow!(e))
        .context("invalid configuration")?;

    kasasagi::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow!(e))
        .context("failed to initialize logging")?;

    tracing::info!(
        config_file = %args.config.display(),
        server_address = %config.server.address,
        server_port = config.server.port,
        object_store = config.storage.use_object_store,
        cache_dir = %config.cache.dir,
        "Configuration loaded successfully"
    );

    if args.test {
        tracing::info!("Configuration test passed");
        return Ok(());
    }

    // Backend connectivity and cache directory checks need a runtime before
    // pingora starts its own
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build setup runtime")?;
    let (backend, cache) = runtime.block_on(async {
        let backend = storage::from_config(&config.storage)
            .await
            .context("failed to initialize storage backend")?;
        let cache = CacheStore::new(&config.cache.dir);
        cache
            .ensure_dir()
            .await
            .context("failed to prepare cache directory")?;
        anyhow::Ok((backend, cache))
    })?;
    drop(runtime);

    let compositor =
        MarkerCompositor::from_config(&config.markers).context("failed to load marker assets")?;

    let mut pipeline = Pipeline::new(backend, cache, Arc::new(compositor));
    if config.cache.coalesce_requests {
        pipeline = pipeline.with_coalescing(RequestCoalescer::new());
    }
    let pipeline = Arc::new(pipeline);

    let opt = Opt {
        daemon: args.daemon,
        ..Default::default()
    };
    let mut server = Server::new(Some(opt)).context("failed to create Pingora server")?;
    server.bootstrap();

    let image_server = ImageServer::new(&config.server, pipeline);
    let mut http_service = pingora_proxy::http_proxy_service(&server.configuration, image_server);
    let listen_addr = config.server.listen_addr();
    http_service.add_tcp(&listen_addr);
    http_service.threads = Some(config.server.threads);
    server.add_service(http_service);

    if config.cache.eviction_enabled() {
        let sweeper = EvictionSweeper::from_config(&config.cache);
        server.add_service(background_service(
            "cache eviction",
            EvictionService::new(sweeper),
        ));
    } else {
        tracing::info!("Cache eviction disabled (ttl_hours = 0)");
    }

    tracing::info!(address = %listen_addr, "Starting Kasasagi image server");

    // Blocks until shutdown
    server.run_forever();
}
