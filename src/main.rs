use anyhow::{Context, Result};
use axum::middleware::from_fn;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod analytics;
mod auth;
mod components;
mod config;
mod controllers;
mod crypto;
mod db_ops;
mod errors;
mod extractors;
mod htmx;
mod list_view;
mod live;
mod middleware;
mod models;
mod notify;
mod pw;
mod records;
mod routes;
mod session;
mod theme;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "habits=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env()?;
    let db = create_pg_pool(&config.database_url).await?;
    sqlx::migrate!()
        .run(&db)
        .await
        .context("database migrations to run")?;

    let addr = config.listen_addr;
    let state = models::AppState {
        db,
        config: Arc::new(config),
        live: Arc::new(live::LiveHub::default()),
        notifier: Arc::new(notify::LogNotifier::default()),
    };
    let app = routes::get_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn(middleware::html_headers)),
        )
        .with_state(state);

    tracing::info!(%addr, "listening");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .context("server to keep running")?;

    Ok(())
}

async fn create_pg_pool(db_url: &str) -> Result<sqlx::Pool<sqlx::Postgres>> {
    PgPoolOptions::new()
        // Postgres default max connections is 100, and we'll take 'em
        // https://www.postgresql.org/docs/current/runtime-config-connection.html
        .max_connections(80)
        .connect(db_url)
        .await
        .context("pool to be able to connect")
}
