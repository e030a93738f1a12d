//! Rolegate server - main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};
use actix_web::{App, HttpServer, web};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use rolegate_lib::api::{self, ApiDoc};
use rolegate_lib::auth::AdminKey;
use rolegate_lib::config::{Config, ProfileStoreKind};
use rolegate_lib::db::{DbPool, PgProfileStore};
use rolegate_lib::middleware;
use rolegate_lib::services::{
    AuthEventBroadcaster, IdentityGateway, MemoryProfileStore, ProfileService, ProfileStore,
};

/// Perform health check (for Docker healthcheck).
async fn health_check() -> bool {
    // Simple check - just verify we can load config
    Config::from_env().is_ok()
}

/// Build the configured profile store, running migrations for PostgreSQL.
async fn open_profile_store(config: &Config) -> Result<Arc<dyn ProfileStore>, String> {
    match config.profile_store {
        ProfileStoreKind::Memory => {
            warn!("Using the in-memory profile store - profiles are lost on restart");
            Ok(Arc::new(MemoryProfileStore::new()))
        }
        ProfileStoreKind::Postgres => {
            let pool = DbPool::new(config)
                .await
                .map_err(|e| format!("Failed to connect to database: {}", e))?;
            pool.run_migrations()
                .await
                .map_err(|e| format!("Failed to run migrations: {}", e))?;
            Ok(Arc::new(PgProfileStore::new(pool)))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Check for --health-check flag (used by Docker HEALTHCHECK)
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        if health_check().await {
            std::process::exit(0);
        } else {
            std::process::exit(1);
        }
    }

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL and ROLEGATE_SESSION_SECRET must be set");
            error!("  - In production, Google or Twilio credentials must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Rolegate Server");
    info!("  Environment: {}", config.environment);
    info!("  Profile store: {}", config.profile_store);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let store = match open_profile_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let events = AuthEventBroadcaster::new();
    let gateway = match IdentityGateway::from_config(&config, events.clone()) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!("Failed to initialize identity providers: {}", e);
            std::process::exit(1);
        }
    };
    if !gateway.google_enabled() && !gateway.phone_enabled() {
        warn!("No sign-in method configured (set GOOGLE_* or TWILIO_* variables)");
    }

    let profiles = ProfileService::new(store, events);
    let admin_key = AdminKey::new(config.admin_key.clone());
    if !admin_key.is_configured() {
        info!("ROLEGATE_ADMIN_KEY not set - role changes require an admin session");
    }

    let bind_address = config.bind_address();
    let is_development = config.is_development();

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!(
            "Starting server at http://{} ({} workers)",
            bind_address, cpus
        );
        cpus
    };

    let config = web::Data::new(config);
    let admin_key = web::Data::new(admin_key);
    let gateway = web::Data::new(gateway);
    let profiles = web::Data::new(profiles);

    HttpServer::new(move || {
        let admin_header = HeaderName::from_static("x-admin-key");

        let cors = if is_development {
            // The development UI runs on its own port and sends cookies
            Cors::default()
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
                .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE, admin_header])
                .supports_credentials()
                .max_age(3600)
        } else {
            // Same-origin only in production
            Cors::default()
                .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
                .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE, admin_header])
                .max_age(3600)
        };

        let mut app = App::new()
            .wrap(cors)
            .wrap(middleware::RequestLogger)
            .app_data(config.clone())
            .app_data(admin_key.clone())
            .app_data(gateway.clone())
            .app_data(profiles.clone())
            .service(web::scope("/api/v1").configure(api::configure_api));

        if is_development {
            app = app.service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
            );
        }

        app
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run()
    .await
}
