use std::sync::Arc;

use roster_common::{Error, Result};
use roster_config::AppConfig;
use roster_db::{EmployeeRepository, EmployeeStore};
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// The HTTP server: binds the configured address and serves the API until
/// Ctrl+C or SIGTERM.
pub struct GatewayServer {
    config: AppConfig,
    employees: Option<Arc<dyn EmployeeRepository>>,
}

impl GatewayServer {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            employees: None,
        }
    }

    /// Serve from an already opened repository instead of opening the
    /// configured database in `run`.
    pub fn with_repository(mut self, employees: Arc<dyn EmployeeRepository>) -> Self {
        self.employees = Some(employees);
        self
    }

    pub async fn run(self) -> Result<()> {
        let addr = self.config.server.addr();

        let employees = match self.employees {
            Some(employees) => employees,
            None => Arc::new(open_store(&self.config)?),
        };

        let state = Arc::new(AppState::new(employees));
        let app = build_router(state);

        let listener = TcpListener::bind(&addr).await?;
        info!("Roster gateway listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Gateway(format!("server error: {e}")))?;

        info!("Roster gateway stopped");
        Ok(())
    }
}

/// Open the configured database, creating its parent directory first, and
/// apply pending migrations.
pub fn open_store(config: &AppConfig) -> Result<EmployeeStore> {
    let db_path = &config.database.path;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::Database(format!(
                "failed to create data directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    let store = EmployeeStore::open(db_path, &config.database.migrations_dir)?;
    info!("employee store opened at {}", db_path.display());
    Ok(store)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining connections");
}
