//! Harmonia server binary.

use std::sync::Arc;

use secrecy::ExposeSecret;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use harmonia::adapters::auth::{ClerkConfig, ClerkDirectoryClient, ClerkIdentityVerifier};
use harmonia::adapters::http::{build_router, AppState, HttpSettings};
use harmonia::adapters::postgres::{PostgresAppointmentRepository, PostgresBillingStore};
use harmonia::adapters::stripe::{StripeConfig, StripePaymentProvider};
use harmonia::application::handlers::{
    PaymentCheckoutSettings, ProviderOnboardingSettings, SubscriptionCheckoutSettings,
};
use harmonia::application::{AuthorizationGate, BillingStateReconciler};
use harmonia::config::{AppConfig, LogFormat, ServerConfig};
use harmonia::domain::billing::WebhookVerifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        e
    })?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "Starting harmonia"
    );

    // Database
    let pool = config
        .database
        .pool_options()
        .connect(config.database.url.expose_secret())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Migrations applied");
    }

    // Outbound clients
    let http_client = reqwest::Client::builder()
        .timeout(config.auth.upstream_timeout())
        .build()?;

    let mut clerk = ClerkConfig::new(config.auth.issuer_url.clone())
        .with_cache_duration(config.auth.jwks_cache_ttl());
    if let Some(audience) = &config.auth.audience {
        clerk = clerk.with_audience(audience.clone());
    }
    let gate = AuthorizationGate::new(
        Arc::new(ClerkIdentityVerifier::new(clerk, http_client.clone())),
        Arc::new(ClerkDirectoryClient::new(
            config.auth.directory_url.clone(),
            config.auth.secret_key.clone(),
            http_client.clone(),
        )),
        config.auth.upstream_timeout(),
    );

    let payments = Arc::new(StripePaymentProvider::new(
        StripeConfig::new(config.payment.stripe_api_key.clone())
            .with_base_url(config.payment.api_base_url.clone()),
        http_client,
    ));

    // Stores
    let appointments = Arc::new(PostgresAppointmentRepository::new(pool.clone()));
    let billing = Arc::new(PostgresBillingStore::new(pool));

    let verifier = WebhookVerifier::new(config.payment.stripe_webhook_secret.expose_secret().clone())
        .with_tolerance(config.payment.webhook_tolerance_secs);

    let state = AppState {
        gate,
        appointments,
        billing: billing.clone(),
        subscriptions: billing.clone(),
        payments,
        reconciler: Arc::new(BillingStateReconciler::new(verifier, billing)),
        payment_checkout: PaymentCheckoutSettings {
            default_currency: config.payment.default_currency.clone(),
            platform_fee_percent: config.payment.platform_fee_percent,
        },
        subscription_checkout: SubscriptionCheckoutSettings {
            success_url: config.payment.checkout_success_url.clone(),
            cancel_url: config.payment.checkout_cancel_url.clone(),
        },
        provider_onboarding: ProviderOnboardingSettings {
            country: config.payment.connect_country.clone(),
            refresh_url: config.payment.onboarding_refresh_url.clone(),
            return_url: config.payment.onboarding_return_url.clone(),
        },
    };

    let app = build_router(
        state,
        &HttpSettings {
            request_timeout: config.server.request_timeout(),
            cors_origins: config.server.cors_origins_list(),
        },
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Listening");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let _ = shutdown_tx.send(true);
            })
            .await
    });

    let grace = config.server.shutdown_grace();
    tokio::select! {
        result = &mut server => result??,
        _ = async {
            if shutdown_rx.wait_for(|stopping| *stopping).await.is_err() {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed, dropping in-flight requests");
            server.abort();
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    match server.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
