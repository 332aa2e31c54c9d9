//! Real OS signals reach every listener in the process, so these run in their
//! own test binary rather than next to the unit tests.
#![cfg(unix)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use flower_core::config::{PartialConfig, merge};
use flower_core::{
    AppSettings, MonitoredService, OptionRegistry, Result, RunOutcome, ServiceContext,
    ServiceHandle,
};
use nix::sys::signal::{Signal, raise};

struct Idle {
    stops: Arc<AtomicUsize>,
}

impl MonitoredService for Idle {
    async fn start(&self) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

fn context() -> ServiceContext {
    let registry = OptionRegistry::flower().unwrap();
    let config = merge(&registry, PartialConfig::default(), PartialConfig::default()).unwrap();
    let settings = AppSettings::from_config(&config).unwrap();
    ServiceContext::new(config, settings, None)
}

#[tokio::test]
async fn sigterm_terminates_and_stops_once() {
    let stops = Arc::new(AtomicUsize::new(0));
    let handle = ServiceHandle::construct(context(), |_| {
        Ok(Idle {
            stops: Arc::clone(&stops),
        })
    })
    .unwrap();
    let hooks = handle.register_shutdown_hooks().unwrap();

    raise(Signal::SIGTERM).unwrap();
    // A second signal while shutting down is only logged.
    raise(Signal::SIGTERM).unwrap();

    let outcome = handle.run(&hooks).await.unwrap();
    assert_eq!(outcome, RunOutcome::Terminated);
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    drop(hooks);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}
