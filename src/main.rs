use pairplay::{
    common::{BoxError, Config},
    server::Server,
};
use tracing_subscriber::EnvFilter;

fn load_config() -> Result<Config, BoxError> {
    let mut cfg = match std::env::args().nth(1) {
        Some(path) => Config::from_json_file(&path)?,
        None => Config::default(),
    };
    if let Ok(addr) = std::env::var("PAIRPLAY_ADDR") {
        cfg.addr = addr;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = load_config()?;
    tracing::info!(threads = cfg.threads, addr = %cfg.addr, "starting");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cfg.threads)
        .enable_all()
        .build()?;
    rt.block_on(async move { Server::new(cfg).run().await })
}
