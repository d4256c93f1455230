use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use frontdoor::{logger, server, Config, Gateway, GatewayError, Server, ServerOptions};

/// Path-prefix HTTP gateway: proxies configured prefixes, serves files otherwise
#[derive(Debug, Parser)]
#[command(name = "frontdoor", version, about)]
struct Cli {
    /// Configuration file (default: ./config.toml if present)
    #[arg(short, long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("frontdoor: {err}");
            return ExitCode::FAILURE;
        }
    };

    logger::init(&cfg);

    // Worker threads follow `server.workers`, defaulting to one per core
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = match runtime_builder.build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("frontdoor: failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cfg)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            eprintln!("frontdoor: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: Config) -> Result<(), GatewayError> {
    let addr = cfg.get_socket_addr()?;
    let gateway = Arc::new(Gateway::new(&cfg)?);

    let handle = Server::start(addr, Arc::clone(&gateway), ServerOptions::from_config(&cfg))?;
    logger::log_server_start(&handle.local_addr(), &cfg, gateway.routes());

    let signal = server::shutdown_signal().await;
    tracing::info!("{signal} received, shutting down");

    handle.shutdown(cfg.performance.shutdown_grace()).await;
    Ok(())
}
