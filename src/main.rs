//! Pomodoro Timer - A state-managed HTTP daemon for a focus/break timer
//!
//! This is the main entry point for the pomodoro-timer application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use pomodoro_timer::{
    api::create_router,
    config::Config,
    services::{
        DesktopNotifier, DisabledTaskService, HttpTaskService, JsonFileStore, KeyValueStore,
        Notifier, TaskService,
    },
    state::AppState,
    tasks::countdown_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("pomodoro_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting pomodoro-timer v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, store={}",
          config.host, config.port, config.store.display());

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(config.store.clone()));

    let task_service: Arc<dyn TaskService> = match &config.task_service {
        Some(url) => {
            info!("Reporting task progress to {}", url);
            Arc::new(HttpTaskService::new(url)?)
        }
        None => {
            info!("No task service configured, task updates are disabled");
            Arc::new(DisabledTaskService)
        }
    };

    let notifier: Option<Arc<dyn Notifier>> = if config.desktop_notifications {
        Some(Arc::new(DesktopNotifier))
    } else {
        None
    };

    // Create application state, restoring persisted settings
    let state = Arc::new(AppState::new(
        config.host.clone(),
        config.port,
        store,
        task_service,
        notifier,
    ));

    // Start the countdown background task
    let countdown_state = Arc::clone(&state);
    tokio::spawn(async move {
        countdown_task(countdown_state).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /timer/start        - Start the countdown");
    info!("  POST /timer/pause        - Pause the countdown");
    info!("  POST /timer/reset        - Reset the current phase");
    info!("  POST /timer/reset-cycles - Start a new set of cycles");
    info!("  POST /timer/complete     - End the current phase now");
    info!("  GET  /settings           - Current settings");
    info!("  PUT  /settings           - Update settings");
    info!("  POST /task               - Select or clear the associated task");
    info!("  GET  /status             - Timer status");
    info!("  GET  /events             - Server-sent event stream");
    info!("  GET  /health             - Health check");

    // Serve until a shutdown signal arrives
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
