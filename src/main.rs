#![allow(dead_code)]
#![allow(unused_variables)]

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    error_handling::HandleErrorLayer,
    http::header::{AUTHORIZATION, CONTENT_TYPE},
    http::Method,
    routing::{delete, get, patch, post},
    BoxError, Router,
};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower::{buffer::BufferLayer, limit::RateLimitLayer, ServiceBuilder};
use tower_http::cors::{Any, CorsLayer};

use crate::{
    app::{env::Envy, errors::DefaultApiError},
    broker::{
        client::{Broker, BrokerConfig},
        consumer::TransactionConsumer,
        metrics::{InMemoryMetrics, MetricsSink, PublisherMetrics},
        publisher::TransactionPublisher,
    },
    transactions::{repo::PgTransactionRepo, service::TransactionService},
    webhooks::signature::SignatureVerifier,
};

mod app;
mod broker;
mod money;
mod transactions;
mod webhooks;

pub struct AppState {
    pub envy: Arc<Envy>,
    pub transaction_service: TransactionService,
    pub signature_verifier: Arc<SignatureVerifier>,
    pub broker: Arc<Broker>,
    pub publisher: Arc<TransactionPublisher>,
    pub consumer_metrics: Arc<InMemoryMetrics>,
    pub publisher_metrics: Arc<PublisherMetrics>,
}

#[tokio::main]
async fn main() {
    // tracing
    tracing_subscriber::fmt::init();

    // environment
    let app_env = env::var("APP_ENV").unwrap_or("development".to_string());
    let _ = dotenvy::from_filename(format!(".env.{}", app_env));
    let envy = match envy::from_env::<Envy>() {
        Ok(config) => config,
        Err(e) => panic!("{:#?}", e),
    };

    // properties
    let port = envy.port.to_owned().unwrap_or(3000);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::POST, Method::GET, Method::PATCH, Method::DELETE]);

    let pool = PgPoolOptions::new()
        .max_connections(50)
        .idle_timeout(Some(Duration::from_secs(60)))
        .connect(&envy.database_url)
        .await
        .expect("failed to connect to database");

    println!("connected to db");

    // a failed broker connect degrades the publish path to 503 instead of
    // aborting; the consumer keeps retrying and can upgrade the handle
    let broker = Arc::new(Broker::new(BrokerConfig::new(&envy.nats_url)));
    match broker.connect().await {
        Ok(_) => println!("connected to broker"),
        Err(e) => tracing::error!(%e, "broker unavailable at startup"),
    }

    let repo = PgTransactionRepo::new(pool.clone());
    let transaction_service = TransactionService::new(Arc::new(repo));

    let signature_verifier = Arc::new(SignatureVerifier::new(
        &envy.webhook_current_signing_key,
        envy.webhook_next_signing_key.as_deref(),
    ));

    let consumer_metrics = Arc::new(InMemoryMetrics::new());
    let publisher_metrics = Arc::new(PublisherMetrics::new());
    let publisher = Arc::new(TransactionPublisher::new(broker.clone()));

    // consumer task
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = TransactionConsumer::new(
        transaction_service.clone(),
        consumer_metrics.clone() as Arc<dyn MetricsSink>,
    );
    let consumer_broker = broker.clone();
    tokio::spawn(async move {
        consumer.run(consumer_broker, shutdown_rx).await;
    });

    let state = AppState {
        envy: Arc::new(envy),
        transaction_service,
        signature_verifier,
        broker,
        publisher,
        consumer_metrics,
        publisher_metrics,
    };

    // app
    let app = Router::new()
        .route("/", get(app::controller::get_root))
        .route("/health", get(app::controller::get_health))
        .route("/metrics", get(app::controller::get_metrics))
        // webhooks
        .route(
            "/webhooks/transactions",
            post(webhooks::controller::receive_transaction),
        )
        // transactions
        .route(
            "/transactions",
            post(transactions::controller::create_transaction),
        )
        .route(
            "/transactions",
            get(transactions::controller::get_transactions),
        )
        .route(
            "/transactions/publish",
            post(transactions::controller::publish_transaction),
        )
        .route(
            "/transactions/:id",
            get(transactions::controller::get_transaction_by_id),
        )
        .route(
            "/transactions/:id",
            patch(transactions::controller::edit_transaction_by_id),
        )
        .route(
            "/transactions/:id",
            delete(transactions::controller::delete_transaction_by_id),
        )
        .route(
            "/transactions/transaction/:transaction_id",
            get(transactions::controller::get_transaction_by_transaction_id),
        )
        .route(
            "/transactions/company/:external_company_id",
            get(transactions::controller::get_transactions_by_company),
        )
        // layers
        .layer(cors)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|err: BoxError| async move {
                    DefaultApiError::InternalServerError.value()
                }))
                .layer(BufferLayer::new(1024))
                .layer(RateLimitLayer::new(5, Duration::from_secs(1))),
        )
        .with_state(Arc::new(state));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("shutting down");
        })
        .await
        .unwrap();

    // stop the consumer loop and allow an in-flight delivery to finish
    let _ = shutdown_tx.send(true);
    tokio::time::sleep(Duration::from_secs(2)).await;
    println!("consumer stopped");
}
