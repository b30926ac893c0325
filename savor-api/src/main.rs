use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use savor_api::{app, middleware::JwtIdentity, AppState};
use savor_catalog::PricingEngine;
use savor_core::{IdentityProvider, PaymentProcessor};
use savor_order::{
    MockPaymentProcessor, OrderBuilder, OrderManager, OrderRepository, PaymentOrchestrator, PaymentRepository,
    WebhookVerifier,
};
use savor_store::app_config::{Config, IdentitySource};
use savor_store::{
    AuthServiceIdentity, DbClient, HttpCatalogClient, HttpRestaurantDirectory, InMemoryOrderRepository,
    InMemoryPaymentRepository, StoreOrderRepository, StorePaymentRepository, StripeProcessor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "savor_api=debug,savor_order=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Savor order service on port {}", config.server.port);

    let mut business_rules = config.business_rules.clone();

    // Storage
    let orders: Arc<dyn OrderRepository>;
    let payments: Arc<dyn PaymentRepository>;
    match &config.database.url {
        Some(url) => {
            let db = DbClient::new(url).await.context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            business_rules = db
                .fetch_business_rules(business_rules)
                .await
                .context("Failed to load business rules")?;
            orders = Arc::new(StoreOrderRepository::new(db.pool.clone()));
            payments = Arc::new(StorePaymentRepository::new(db.pool.clone()));
        }
        None => {
            tracing::warn!("No database configured, orders are kept in memory");
            orders = Arc::new(InMemoryOrderRepository::new());
            payments = Arc::new(InMemoryPaymentRepository::new());
        }
    }
    tracing::info!(
        delivery_fee = business_rules.delivery_fee,
        tax_rate = business_rules.tax_rate,
        "Pricing policy loaded"
    );

    // Collaborators
    let http = reqwest::Client::new();

    let identity: Arc<dyn IdentityProvider> = match config.auth.identity_source {
        IdentitySource::Token => Arc::new(JwtIdentity::new(&config.auth.jwt_secret)),
        IdentitySource::AuthService => Arc::new(AuthServiceIdentity::new(http.clone(), &config.services.auth_url)),
    };

    let processor: Arc<dyn PaymentProcessor> = match &config.payments.stripe_secret_key {
        Some(key) => Arc::new(StripeProcessor::new(
            http.clone(),
            &config.payments.stripe_api_base,
            key.clone(),
        )),
        None => {
            tracing::warn!("No Stripe key configured, using the mock payment processor");
            Arc::new(MockPaymentProcessor)
        }
    };

    let catalog = Arc::new(HttpCatalogClient::new(http.clone(), &config.services.menu_url));
    let restaurants = Arc::new(HttpRestaurantDirectory::new(http, &config.services.restaurant_url));

    let app_state = AppState {
        identity,
        restaurants,
        order_builder: Arc::new(OrderBuilder::new(
            catalog,
            orders.clone(),
            PricingEngine::new(business_rules.pricing_policy()),
        )),
        order_manager: Arc::new(OrderManager::new(orders.clone())),
        payment_orchestrator: Arc::new(PaymentOrchestrator::new(
            processor,
            orders,
            payments,
            config.payments.currency.clone(),
        )),
        webhook_verifier: Arc::new(WebhookVerifier::new(
            config.payments.webhook_secret.clone(),
            config.payments.webhook_tolerance_seconds,
        )),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
