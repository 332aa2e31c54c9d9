use axum::{Router, extract::State, response::Json, routing::get};
use flower_core::{Error, MonitoredService, Result, ServiceContext};
use serde_json::json;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::watch};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[derive(Clone, Debug)]
pub struct AppState {
    pub context: ServiceContext,
}

/// HTTP shell of the dashboard, driven by the lifecycle manager.
pub struct Dashboard {
    state: Arc<AppState>,
    shutdown: watch::Sender<bool>,
}

impl Dashboard {
    pub fn new(context: ServiceContext) -> Result<Self> {
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            state: Arc::new(AppState { context }),
            shutdown,
        })
    }

    fn bind_address(&self) -> String {
        let config = &self.state.context.config;
        let host = if config.address.is_empty() {
            "0.0.0.0"
        } else {
            config.address.as_str()
        };
        format!("{}:{}", host, config.port)
    }
}

impl MonitoredService for Dashboard {
    async fn start(&self) -> Result<()> {
        if self.state.context.config.is_secure() {
            return Err(Error::service(
                "certfile/keyfile are set but the built-in server does not terminate TLS",
            ));
        }

        let address = self.bind_address();
        let listener = TcpListener::bind(&address).await?;
        info!("Dashboard listening on {}", listener.local_addr()?);

        let app = create_app(Arc::clone(&self.state));
        let mut shutdown = self.shutdown.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await?;

        info!("Dashboard stopped");
        Ok(())
    }

    fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    fn registered_names(&self) -> Vec<String> {
        let mount = self.state.context.settings.mount_path();
        vec![format!("{}/healthcheck", mount)]
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    let mount = state.context.settings.mount_path();
    let routes = Router::new()
        .route("/healthcheck", get(health_check))
        .with_state(state);

    let app = if mount.is_empty() {
        routes
    } else {
        Router::new().nest(&mount, routes)
    };

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "broker_configured": state.context.broker.is_some()
    }))
}
