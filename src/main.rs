use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::Notify;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod server;

use error::ServerError;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::log_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), ServerError> {
    let cfg = config::Config::load()?;
    logger::init(&cfg).map_err(ServerError::Logging)?;

    // One thread: connections are served strictly one after another
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), ServerError> {
    let addr = cfg.socket_addr()?;
    let state = Arc::new(config::AppState::new(cfg)?);

    let tls = state
        .config
        .tls
        .as_ref()
        .map(server::tls::load_acceptor)
        .transpose()?;

    let listener =
        server::create_listener(addr).map_err(|source| ServerError::Bind { addr, source })?;

    logger::log_server_start(&addr, &state.config);

    let shutdown = Arc::new(Notify::new());
    server::signal::start_signal_handler(Arc::clone(&shutdown));

    server::run(listener, state, tls, shutdown).await;

    logger::log_shutdown();
    Ok(())
}
