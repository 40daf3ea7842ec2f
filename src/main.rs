use actix_web::{web, App, HttpServer, middleware::Compress};
use actix_cors::Cors;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use quill::openapi::ApiDoc;
use quill::repo::Repo;
use quill::settings::Settings;
use quill::{config, security_headers, AppState};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;
use tracing_actix_web::TracingLogger;

#[cfg(not(any(feature = "inmem-store", feature = "postgres-store")))]
compile_error!("enable one of the `inmem-store` or `postgres-store` features");

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds to reduce manual setup overhead.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    // Structured logging initialisation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let settings = Settings::from_env()?;
    info!("Bootstrapping quill comment service");
    info!("Frontend URL: {}", settings.frontend_url.as_deref().unwrap_or("<unset>"));

    let repo = build_repo(&settings).await?;
    let state = AppState::new(repo, settings.page_limits);
    let openapi = ApiDoc::openapi();

    let frontend = settings.frontend_url.clone();
    let hsts = settings.enable_hsts;
    let server = HttpServer::new(move || {
        let cors = {
            let mut c = Cors::default()
                // local dev frontends
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allow_any_header()
                .allowed_methods(["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .supports_credentials()
                .max_age(3600);
            if let Some(front) = frontend.as_deref() {
                c = c.allowed_origin(front);
            }
            c
        };

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(security_headers(hsts))
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", openapi.clone()))
    })
    .bind(settings.bind_addr)?;

    info!("Listening on http://{}", settings.bind_addr);

    server.run().await?;
    Ok(())
}

#[cfg(feature = "postgres-store")]
async fn build_repo(settings: &Settings) -> anyhow::Result<Arc<dyn Repo>> {
    use quill::repo::pg::PgRepo;
    use sqlx::postgres::PgPoolOptions;

    let db_url = settings
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for postgres-store"))?;
    let pool = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .acquire_timeout(std::time::Duration::from_secs(settings.db_acquire_timeout_seconds))
        .connect(db_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Using Postgres repository backend (migrations applied)");
    Ok(Arc::new(PgRepo::new(pool)))
}

#[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
async fn build_repo(settings: &Settings) -> anyhow::Result<Arc<dyn Repo>> {
    use quill::repo::inmem::InMemRepo;

    let repo = match settings.data_dir.as_deref() {
        Some(dir) => {
            info!("Using in-memory repository backend (snapshot dir {})", dir.display());
            InMemRepo::with_snapshot_dir(dir)
        }
        None => {
            info!("Using in-memory repository backend (volatile)");
            InMemRepo::new()
        }
    };
    Ok(Arc::new(repo))
}
