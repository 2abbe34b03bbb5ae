//! Auth service runtime
//!
//! [`ServerHandle`] owns the full lifecycle: metrics recorder, database and
//! migrations, default admin seeding, REST API and graceful shutdown.

use std::sync::{Arc, OnceLock};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use crate::application::AuthService;
use crate::config::{AdminConfig, AppConfig};
use crate::domain::{CreateUserDto, DomainResult, UserDirectory, UserRecord, ADMIN_ROLE};
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{init_database, LogMailer, UserRepository};
use crate::interfaces::http::create_api_router;
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
    /// Seed the admin account when no users exist (default: true).
    pub create_default_admin: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            create_default_admin: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running auth service.
///
/// ```rust,no_run
/// use warehouse_auth::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub auth_service: Arc<AuthService>,
    pub config: AppConfig,
    /// Port the API is listening on
    pub port: u16,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

/// The global recorder can be installed once per process; later starts reuse it.
fn prometheus_handle() -> PrometheusHandle {
    static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("Prometheus metrics recorder installed");
                handle
            }
            Err(e) => {
                warn!(error = %e, "Metrics recorder not installed, /metrics will stay empty");
                PrometheusBuilder::new().build_recorder().handle()
            }
        })
        .clone()
}

impl ServerHandle {
    /// Start the service:
    /// 1. install the Prometheus recorder
    /// 2. connect to the database and run migrations
    /// 3. seed the admin account (if enabled)
    /// 4. serve the REST API with Swagger UI
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;
        info!("Starting warehouse-auth...");

        let prometheus_handle = prometheus_handle();

        // ── Database ───────────────────────────────────────────
        let db = init_database(&app_cfg.database_config()).await?;

        if opts.auto_migrate {
            info!("Running database migrations...");
            Migrator::up(&db, None).await?;
            info!("Migrations completed");
        }

        let repository = Arc::new(
            UserRepository::new(db.clone())
                .with_policies(app_cfg.password_policy(), app_cfg.lockout_policy()),
        );

        if opts.create_default_admin {
            if let Err(e) = seed_default_admin(&repository, &app_cfg.admin).await {
                error!(error = %e, "Failed to create default admin");
            }
        }

        // ── Services ───────────────────────────────────────────
        let jwt_config = app_cfg.jwt_config();
        info!(issuer = %jwt_config.issuer, audience = %jwt_config.audience, "JWT configured");

        let mailer = Arc::new(LogMailer::new(app_cfg.mail.from.clone()));
        let auth_service = Arc::new(
            AuthService::new(repository, mailer, jwt_config)
                .with_confirmation_subject(app_cfg.mail.subject.clone()),
        );

        // ── REST API server ────────────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let router = create_api_router(auth_service.clone(), Some(db.clone()), prometheus_handle);

        let addr = app_cfg.server.address();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();
        info!("REST API listening on http://{}", addr);
        info!("Swagger UI available at http://{}/docs/", addr);

        let api_shutdown = shutdown.signal();
        let api_server = axum::serve(listener, router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("REST API received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        Ok(Self {
            auth_service,
            config: app_cfg,
            port,
            db,
            shutdown,
            api_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Trigger shutdown on SIGTERM / SIGINT.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Send the shutdown signal without waiting.
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the API to drain, bounded by the configured shutdown timeout.
    pub async fn wait(self) {
        let timeout = std::time::Duration::from_secs(self.shutdown.timeout_secs());

        match tokio::time::timeout(timeout, self.api_task).await {
            Ok(Ok(())) => info!("REST API server stopped"),
            Ok(Err(e)) => error!("REST API task panicked: {}", e),
            Err(_) => warn!(timeout_secs = timeout.as_secs(), "Shutdown timed out, abandoning in-flight requests"),
        }

        if let Err(e) = self.db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("Database connection closed");
        }

        info!("warehouse-auth shutdown complete");
    }

    pub async fn shutdown(self) {
        info!("Shutting down warehouse-auth...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Create a confirmed `Admin` account if the directory has no users.
///
/// Returns whether an account was created.
pub async fn seed_default_admin(repository: &UserRepository, admin: &AdminConfig) -> DomainResult<bool> {
    if repository.count().await? > 0 {
        return Ok(false);
    }

    info!("Creating default admin user...");
    let user = repository
        .create(CreateUserDto {
            username: admin.username.clone(),
            email: admin.email.clone(),
            full_name: Some("Administrator".to_string()),
            avatar: None,
            address: None,
            birthday: None,
            phone_number: None,
            password: admin.password.clone(),
        })
        .await?;

    if let Err(e) = finish_admin(repository, &user).await {
        if let Err(delete_err) = repository.delete(&user).await {
            error!(user_id = %user.id, error = %delete_err, "Rollback of default admin failed");
        }
        return Err(e);
    }

    info!(user_id = %user.id, email = %user.email, "Default admin created");
    warn!("Please change the default admin password");
    Ok(true)
}

async fn finish_admin(repository: &UserRepository, user: &UserRecord) -> DomainResult<()> {
    repository.confirm_email(&user.id).await?;
    repository.assign_role(user, ADMIN_ROLE).await
}

/// Initialize tracing from the logging config. Call once at startup.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
