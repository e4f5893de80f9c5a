use pb_core::{cfg::Config, gate::ApiGate, store::JobStore};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct ModuleCtx {
    pub store: JobStore,
    pub gate: ApiGate,
    pub cfg: Config,
    pub shutdown: tokio::sync::watch::Receiver<bool>,
}

pub trait Module: Send + 'static {
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, ctx: ModuleCtx) -> JoinHandle<anyhow::Result<()>>;
}
