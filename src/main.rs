use std::sync::Arc;

use clap::Parser;

use rust_caching_proxy::config::{AppState, Config, DEFAULT_CONFIG_PATH};
use rust_caching_proxy::{logger, server};

/// Forward HTTP caching proxy
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Address to listen on (overrides server.host)
    hostname: Option<String>,

    /// Port to listen on (overrides server.port)
    port: Option<u16>,

    /// Config file path, without extension
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let cfg = Config::load_from(&args.config)?.with_listen_overrides(args.hostname, args.port);

    // Build the Tokio runtime, sizing worker threads from the config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    logger::init(&cfg)?;

    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr)?;

    let state = Arc::new(AppState::new(&cfg));
    server::start_signal_handler(Arc::clone(&state.shutdown));

    logger::log_server_start(&addr, &cfg);
    server::run(listener, state).await;
    Ok(())
}
