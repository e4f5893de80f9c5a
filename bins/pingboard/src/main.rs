mod module;
mod prober;
mod scheduler;
mod web;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use pb_core::cfg::{self, AppId};
use pb_core::gate::ApiGate;
use pb_core::logx;
use pb_core::store::JobStore;

use crate::module::{Module, ModuleCtx};
use crate::scheduler::Scheduler;
use crate::web::WebServer;

const APP: AppId = AppId {
    qualifier: "com",
    organization: "local",
    application: env!("CARGO_PKG_NAME"), // <- no literal; comes from crate name
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = cfg::load_or_init(&APP).context("config")?;
    logx::init(&cfg.log_level);

    info!("{} boot", APP.application);

    let addr: SocketAddr = cfg
        .http_addr
        .parse()
        .with_context(|| format!("bad http_addr {:?}", cfg.http_addr))?;
    let max_probes = match cfg.max_concurrent_probes {
        0 => num_cpus::get(),
        n => n,
    };
    info!("tick={}ms probes<={} listen={}", cfg.tick_ms, max_probes, addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let ctx = ModuleCtx {
        store: JobStore::new(),
        gate: ApiGate::new(Duration::from_millis(cfg.rate_limit_ms)),
        cfg: cfg.clone(),
        shutdown: shutdown_rx,
    };

    let modules: Vec<Box<dyn Module>> = vec![
        Box::new(Scheduler::new(cfg.tick_ms, max_probes)),
        Box::new(WebServer::new(addr)),
    ];

    let mut tasks = Vec::new();
    for m in modules {
        info!("starting {}", m.name());
        tasks.push(m.spawn(ctx.clone()));
    }

    tokio::signal::ctrl_c().await.context("ctrl-c")?;
    info!("shutdown requested");
    let _ = shutdown_tx.send(true);

    for t in tasks {
        if let Err(e) = t.await? {
            warn!("module exited with error: {e}");
        }
    }
    Ok(())
}
