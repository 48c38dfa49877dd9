pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod startup;
pub mod utils;
pub mod validation;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::ports::TransactionRepository;
use crate::services::TransactionOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TransactionOrchestrator>,
    pub repository: Arc<dyn TransactionRepository>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn TransactionRepository>,
        gateway: gateway::ProviderGateway,
    ) -> Self {
        Self {
            orchestrator: Arc::new(TransactionOrchestrator::new(repository.clone(), gateway)),
            repository,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/pay", post(handlers::transactions::pay))
        .route("/api/disburse", post(handlers::transactions::disburse))
        .route("/api/transactions", get(handlers::transactions::list_transactions))
        .route(
            "/api/transactions/:id",
            get(handlers::transactions::get_transaction),
        )
        .layer(axum::middleware::from_fn(
            middleware::request_logger_middleware,
        ))
        .with_state(state)
}
