mod auth;
mod clubs;
mod dashboard;
mod dates;
mod error;
mod events;
mod payments;
mod processor;
mod settings;
mod sqlite;
mod users;

use std::sync::Arc;

use anyhow::Result;
use auth::{Authenticator, HeaderAuthenticator};
use processor::{stripe::StripeClient, PaymentProcessor};
use settings::{Settings, SiteSettings};

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    middleware,
    routing::{delete, get, patch, post},
    serve, Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tokio::{net::TcpListener, signal, time::Instant};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    db: SqlitePool,
    processor: Arc<dyn PaymentProcessor>,
    authenticator: Arc<dyn Authenticator>,
    site: SiteSettings,
}

async fn home() -> Json<Value> {
    Json(json!({ "message": "ClubSphere Server is running!" }))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "timestamp": Utc::now(),
            })),
        ),
        Err(err) => {
            tracing::error!("Health check failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "database": "disconnected",
                    "error": err.to_string(),
                })),
            )
        }
    }
}

async fn endpoint_not_found(method: Method, uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "Endpoint not found",
            "path": uri.path(),
            "method": method.as_str(),
        })),
    )
}

fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/users", post(users::create_user).get(users::get_users))
        .route(
            "/users/{email}/role",
            get(users::get_user_role).patch(users::update_user_role),
        )
        .route("/clubs", get(clubs::get_clubs).post(clubs::create_club))
        .route("/clubs/{id}", get(clubs::get_club_by_id))
        .route("/clubs/{id}/status", patch(clubs::update_club_status))
        .route("/my-clubs", get(clubs::get_my_clubs))
        .route("/events", get(events::get_events).post(events::create_event))
        .route("/events/upcoming", get(events::get_upcoming_events))
        .route(
            "/events/{id}",
            patch(events::update_event).delete(events::delete_event),
        )
        .route(
            "/event-registrations",
            post(events::registrations::register_for_event)
                .get(events::registrations::get_event_registrations),
        )
        .route("/club-members", get(clubs::memberships::get_club_members))
        .route(
            "/club-members/{id}/expire",
            patch(clubs::memberships::expire_membership),
        )
        .route(
            "/club-members/{id}",
            delete(clubs::memberships::delete_membership),
        )
        .route(
            "/payment-checkout-session",
            post(payments::create_event_checkout),
        )
        .route("/payment-success", patch(payments::confirm_event_payment))
        .route(
            "/payment-club-membership",
            post(payments::create_membership_checkout),
        )
        .route(
            "/club-membership-payment-success",
            patch(payments::confirm_membership_payment),
        )
        .route("/payments", get(payments::get_payments))
        .route("/admin-overview", get(dashboard::admin_overview))
        .route("/club-manager-overview", get(dashboard::club_manager_overview))
        .route("/member-overview", get(dashboard::member_overview))
        .route("/member/my-clubs", get(dashboard::get_member_clubs))
        .route("/member/my-events", get(dashboard::get_member_events))
        .route("/member/my-payments", get(dashboard::get_member_payments))
        .fallback(endpoint_not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::attach_identity,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Served when the store could not be opened at startup.
fn degraded_app(error: &anyhow::Error) -> Router {
    let reason = format!("{:#}", error);
    let home_reason = reason.clone();

    Router::new()
        .route(
            "/",
            get(move || async move {
                Json(json!({
                    "message": "ClubSphere Server (Development Mode)",
                    "warning": "Database connection failed",
                    "error": home_reason,
                }))
            }),
        )
        .route(
            "/health",
            get(move || async move {
                Json(json!({
                    "status": "degraded",
                    "database": "disconnected",
                    "message": reason,
                }))
            }),
        )
        .fallback(endpoint_not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let start = Instant::now();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = Settings::load()?;

    let app = match sqlite::create_pool(&settings.sqlite).await {
        Ok(db) => {
            info!("Connected to {}", settings.sqlite.url);
            if settings.stripe.secret_key.is_empty() {
                tracing::warn!("No Stripe secret key configured; checkout calls will fail");
            }
            let processor = StripeClient::new(reqwest::Client::new(), settings.stripe.clone());
            create_app(AppState {
                db,
                processor: Arc::new(processor),
                authenticator: Arc::new(HeaderAuthenticator),
                site: settings.site.clone(),
            })
        }
        Err(err) => {
            tracing::warn!("Database unavailable, starting in degraded mode: {:#}", err);
            degraded_app(&err)
        }
    };

    let listener = TcpListener::bind(format!("0.0.0.0:{}", settings.server.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    let shutdown = async move {
        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(err) => {
                    tracing::error!("Failed to install SIGTERM handler: {}", err);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = signal::ctrl_c() => {},
            _ = terminate => {},
        }
        info!("Shutting down gracefully after {:?}", start.elapsed());
    };

    serve(listener, app).with_graceful_shutdown(shutdown).await?;

    Ok(())
}
