use std::{process, sync::Arc};

use snipbin::{
    application::{pastes::PasteService, repos::PastesRepo, repository::PasteRepository},
    cache::TtlCache,
    config,
    infra::{
        clients::{HttpClassifier, HttpSlugGen},
        db::PostgresPastes,
        error::InfraError,
        http::{self, AppState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &InfraError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), InfraError> {
    let (_cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or(InfraError::MissingDatabaseUrl)?;

    let pool =
        PostgresPastes::connect(database_url, settings.database.max_connections.get()).await?;
    PostgresPastes::run_migrations(&pool).await?;

    let db = Arc::new(PostgresPastes::new(pool));

    let cache = Arc::new(TtlCache::new(settings.cache.refresh_on_get));
    let sweeper = cache.spawn_sweeper(settings.cache.sweep_interval);

    let store: Arc<dyn PastesRepo> = db.clone();
    let repo = Arc::new(PasteRepository::new(
        store,
        cache,
        settings.cache.default_ttl,
    ));

    let classifier = HttpClassifier::new(&settings.classifier)?;
    let sluggen = HttpSlugGen::new(&settings.sluggen)?;

    let pastes = Arc::new(PasteService::new(
        repo,
        Arc::new(classifier),
        Arc::new(sluggen),
    ));

    let router = http::build_router(AppState {
        pastes,
        db: db.clone(),
    });

    let listener = tokio::net::TcpListener::bind(settings.server.addr).await?;
    info!(addr = %settings.server.addr, "listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(http::shutdown_signal())
        .await?;

    info!("http server stopped; draining background tasks");
    if tokio::time::timeout(settings.server.graceful_shutdown, sweeper.shutdown())
        .await
        .is_err()
    {
        error!("cache sweeper did not stop within the shutdown window");
    }

    Ok(())
}
