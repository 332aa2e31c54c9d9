use tracing_subscriber::{
    EnvFilter, Registry, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

use crate::error::{Error, Result};

/// Keeps the installed filter adjustable after configuration is resolved.
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    pub fn enable_debug(&self) -> Result<()> {
        self.filter
            .modify(|filter| *filter = EnvFilter::new("debug"))
            .map_err(|e| Error::internal(format!("failed to raise log level: {}", e)))
    }
}

pub fn init_logging() -> LogHandle {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(env_filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    LogHandle { filter: handle }
}
