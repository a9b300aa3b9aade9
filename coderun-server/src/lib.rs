#![deny(clippy::all)]

pub mod config;
pub mod errors;
pub mod routes;

use crate::config::Config;

use coderun_judger::Runner;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tracing::info;

pub struct App {
    pub runner: Runner,
    pub admission: Semaphore,
    pub max_concurrency: usize,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        info!("initializing runner");
        let runner = Runner::new(config.executor.clone())?;
        let max_concurrency = config.server.max_concurrency;
        Ok(Self {
            runner,
            admission: Semaphore::new(max_concurrency),
            max_concurrency,
        })
    }
}

pub async fn run() -> Result<()> {
    let config = Config::global();

    let app = Arc::new(App::new(config)?);
    let routes = routes::routes(app);

    let host: IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("invalid host: {}", config.server.host))?;
    let addr = SocketAddr::new(host, config.server.port);

    info!("server is listening {}", addr);
    warp::serve(routes).run(addr).await;

    Ok(())
}
