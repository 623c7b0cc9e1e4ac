use std::{path::Path, sync::Arc};

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reelpick::{
    api::{create_router, AppState},
    config::Config,
    db::{create_pool, Cache},
    models::Region,
    services::{
        catalog::{
            client::{ResilientClient, RetryPolicy, ReqwestTransport, Transport},
            omdb::OMDB_KEY_PARAM,
            tmdb::TMDB_KEY_PARAM,
            OmdbRatings, TmdbCatalog,
        },
        discovery::SeededRandom,
        CatalogApi, HistoryLedger, RatingsApi,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reelpick=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let default_region = Region::parse(&config.default_region)?;

    let pool = create_pool(&config.database_url)
        .await
        .context("Failed to open history database")?;
    let history = HistoryLedger::new(pool);

    if let Some(path) = &config.legacy_history_path {
        let imported = history.import_legacy_file(Path::new(path)).await?;
        tracing::info!(path = %path, imported, "Legacy history import checked");
    }

    let cache = Cache::new();
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new()?);
    let policy = RetryPolicy::with_max_attempts(config.max_fetch_attempts);

    let catalog: Arc<dyn CatalogApi> = Arc::new(TmdbCatalog::new(
        ResilientClient::new(
            transport.clone(),
            &config.tmdb_api_url,
            TMDB_KEY_PARAM,
            &config.tmdb_api_key,
            policy,
        ),
        cache.clone(),
    ));

    let ratings = config.omdb_api_key.as_ref().map(|key| {
        Arc::new(OmdbRatings::new(
            ResilientClient::new(
                transport.clone(),
                &config.omdb_api_url,
                OMDB_KEY_PARAM,
                key,
                policy,
            ),
            cache.clone(),
        )) as Arc<dyn RatingsApi>
    });
    if ratings.is_none() {
        tracing::warn!("OMDB_API_KEY not set, ratings lookups disabled");
    }

    let state = AppState::new(
        catalog,
        ratings,
        history,
        cache,
        Arc::new(SeededRandom::from_entropy()),
        default_region,
    );
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(addr = %addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
