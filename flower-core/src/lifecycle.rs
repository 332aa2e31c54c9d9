//! Start/stop lifecycle of the monitored service.
//!
//! ```text
//! Uninitialized --construct--> Constructed --run--> Running --stop--> Stopped
//!                                   |                                  ^
//!                                   +--------------stop----------------+
//! ```
//!
//! `stop` may be reached from three places: the end of [`ServiceHandle::run`],
//! the exit-time hook (dropping [`ShutdownHooks`]) and explicit calls. An
//! atomic check-and-set makes sure the service's own `stop` runs once.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::ResolvedConfig;
use crate::error::{Error, Result};
use crate::settings::AppSettings;
use crate::signals;

/// The long-running component bootstrapped by this crate.
pub trait MonitoredService: Send + Sync + 'static {
    /// Runs the service until it finishes or fails.
    fn start(&self) -> impl Future<Output = Result<()>> + Send;

    /// Asks the service to stop. Must not block.
    ///
    /// When termination is requested, the `start` future is dropped right
    /// after this call; in-flight work is not drained.
    fn stop(&self);

    /// Names of the tasks or routes the service knows about, for diagnostics.
    fn registered_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Everything a service factory receives.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    pub config: Arc<ResolvedConfig>,
    pub settings: AppSettings,
    pub broker: Option<String>,
}

impl ServiceContext {
    pub fn new(config: ResolvedConfig, settings: AppSettings, broker: Option<String>) -> Self {
        Self {
            config: Arc::new(config),
            settings,
            broker,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LifecycleState {
    #[default]
    Uninitialized = 0,
    Constructed = 1,
    Running = 2,
    Stopped = 3,
}

impl From<u8> for LifecycleState {
    fn from(value: u8) -> Self {
        match value {
            1 => LifecycleState::Constructed,
            2 => LifecycleState::Running,
            3 => LifecycleState::Stopped,
            _ => LifecycleState::Uninitialized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The service returned on its own.
    Completed,
    /// A termination signal was observed.
    Terminated,
    /// The user interrupted the process.
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TerminationCause {
    Signal = 1,
    Interrupt = 2,
}

impl From<TerminationCause> for RunOutcome {
    fn from(cause: TerminationCause) -> Self {
        match cause {
            TerminationCause::Signal => RunOutcome::Terminated,
            TerminationCause::Interrupt => RunOutcome::Interrupted,
        }
    }
}

/// Termination request shared between the signal listener and the main flow.
///
/// Requesting is a single atomic store plus a wake-up; the first cause wins.
#[derive(Debug, Default)]
pub struct Termination {
    cause: AtomicU8,
    notify: Notify,
}

impl Termination {
    pub fn request(&self, cause: TerminationCause) {
        if self
            .cause
            .compare_exchange(0, cause as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.notify.notify_one();
        }
    }

    pub fn requested(&self) -> Option<TerminationCause> {
        match self.cause.load(Ordering::Acquire) {
            1 => Some(TerminationCause::Signal),
            2 => Some(TerminationCause::Interrupt),
            _ => None,
        }
    }

    pub async fn wait(&self) -> TerminationCause {
        loop {
            if let Some(cause) = self.requested() {
                return cause;
            }
            self.notify.notified().await;
        }
    }
}

struct Inner<S> {
    service: S,
    state: AtomicU8,
    stopped: AtomicBool,
}

/// Shared handle to a constructed service.
pub struct ServiceHandle<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for ServiceHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: MonitoredService> ServiceHandle<S> {
    pub fn construct<F>(context: ServiceContext, factory: F) -> Result<Self>
    where
        F: FnOnce(ServiceContext) -> Result<S>,
    {
        let service = factory(context)?;
        info!("Monitored service constructed");

        Ok(Self {
            inner: Arc::new(Inner {
                service,
                state: AtomicU8::new(LifecycleState::Constructed as u8),
                stopped: AtomicBool::new(false),
            }),
        })
    }

    pub fn service(&self) -> &S {
        &self.inner.service
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from(self.inner.state.load(Ordering::Acquire))
    }

    /// Stops the service. Returns `false` when it was already stopped.
    pub fn stop(&self) -> bool {
        if self
            .inner
            .stopped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.inner
            .state
            .store(LifecycleState::Stopped as u8, Ordering::Release);
        info!("Stopping monitored service");
        self.inner.service.stop();
        true
    }

    /// Installs the exit-time hook and the signal listener.
    ///
    /// Must be called from within a tokio runtime. Keep the returned value
    /// alive for as long as the service runs: dropping it stops the service.
    pub fn register_shutdown_hooks(&self) -> Result<ShutdownHooks<S>> {
        let termination = Arc::new(Termination::default());
        let listener = signals::spawn_listener(Arc::clone(&termination))?;

        Ok(ShutdownHooks {
            handle: self.clone(),
            termination,
            listener,
        })
    }

    /// Runs the service until it returns, fails or termination is requested.
    ///
    /// The service is stopped before this returns, whatever the outcome.
    /// Termination requests are reported as `Ok`; service failures are
    /// propagated.
    pub async fn run(&self, hooks: &ShutdownHooks<S>) -> Result<RunOutcome> {
        self.inner
            .state
            .compare_exchange(
                LifecycleState::Constructed as u8,
                LifecycleState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|current| {
                Error::lifecycle(format!(
                    "service cannot run from state {:?}",
                    LifecycleState::from(current)
                ))
            })?;

        let result = tokio::select! {
            biased;
            cause = hooks.termination.wait() => Ok(RunOutcome::from(cause)),
            res = self.inner.service.start() => res.map(|()| RunOutcome::Completed),
        };

        if let Err(e) = &result {
            error!("Monitored service failed: {}", e);
        }
        self.stop();

        result
    }
}

/// Shutdown registrations for one service handle.
///
/// Dropping this value is the exit-time hook: it runs on normal return,
/// on early `?` returns and while unwinding.
pub struct ShutdownHooks<S: MonitoredService> {
    handle: ServiceHandle<S>,
    termination: Arc<Termination>,
    listener: JoinHandle<()>,
}

impl<S: MonitoredService> ShutdownHooks<S> {
    /// Requests termination as if a termination signal had been received.
    pub fn request_termination(&self) {
        self.termination.request(TerminationCause::Signal);
    }

    pub fn termination(&self) -> Arc<Termination> {
        Arc::clone(&self.termination)
    }
}

impl<S: MonitoredService> Drop for ShutdownHooks<S> {
    fn drop(&mut self) {
        self.listener.abort();
        self.handle.stop();
    }
}
