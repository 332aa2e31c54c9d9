pub mod broker;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod lifecycle;
pub mod logging;
pub mod registry;
pub mod settings;
mod signals;


pub use self::config::{CONFIG_FILE, ResolvedConfig};
pub use error::{Error, Result};
pub use lifecycle::{MonitoredService, RunOutcome, ServiceContext, ServiceHandle, ShutdownHooks};
pub use registry::OptionRegistry;
pub use settings::AppSettings;
