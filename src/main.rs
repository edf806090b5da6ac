use anyhow::Result;
use axum::{extract::Request, ServiceExt};
use pace::api::routes::create_app;
use pace::config::{run_migrations, AppConfig, CatalogSeeder, DatabaseConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    // RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let db_config = DatabaseConfig::from_env()?;
    let pool = db_config.create_pool().await?;
    run_migrations(&pool).await?;
    info!("Database migrations applied");

    if config.seed_catalog {
        CatalogSeeder::new(pool.clone()).seed_all().await?;
    }

    let address = config.server_address();
    let app = create_app(pool, config);

    let listener = TcpListener::bind(&address).await?;
    info!("Pace server starting on http://{}", address);
    info!("Health check available at http://{}/health", address);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;

    Ok(())
}
