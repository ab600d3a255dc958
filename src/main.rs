use std::sync::Arc;

use log::{info, warn};
use recipe_api::{
    actions::PgStore, memory::MemoryStore, routes, store::DynStore, AppState, Config,
    RECIPE_IMAGE_DIR,
};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;

    let store: DynStore = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Connected to Postgres");
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL is not set, data is kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    tokio::fs::create_dir_all(config.media_root.join(RECIPE_IMAGE_DIR)).await?;

    let address = config.bind_address;
    let state = AppState::new(store, config);

    let (bound, server) =
        warp::serve(routes(state)).try_bind_with_graceful_shutdown(address, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {e}");
            }
        })?;
    info!("Listening on {bound}");

    server.await;
    info!("Server stopped");
    Ok(())
}
