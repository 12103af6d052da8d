//! omni-keyd daemon
//!
//! Account manager: stores sealed private keys and signs payloads for the
//! gateway's clients.

use alloy_primitives::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use omni_chains::ChainRegistry;
use omni_keystore::{
    AccountInfo, AccountSelector, AccountSummary, KeyStore, KeyStoreError, MemoryStore, Sealer,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// omni-keyd command line arguments
#[derive(Debug, Parser)]
#[clap(name = "omni-keyd", about = "omni-keyd - account manager")]
struct Cli {
    /// Host and port to listen on
    #[clap(long, short = 'L', default_value = "0.0.0.0:8661")]
    listen: String,

    /// Master key sealing stored private keys; empty disables sealing
    #[clap(long, default_value = "")]
    master_key: String,

    /// Log level
    #[clap(long, default_value = "info")]
    log_level: String,
}

type SharedKeyStore = Arc<KeyStore<MemoryStore>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountRequest {
    chain_type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    private_key: Option<Bytes>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    address: String,
    name: Option<String>,
    public_key: Bytes,
}

impl From<AccountInfo> for AccountResponse {
    fn from(info: AccountInfo) -> Self {
        Self { address: info.address, name: info.name, public_key: info.public_key.into() }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAccountsQuery {
    #[serde(default)]
    name_prefix: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest {
    chain_type: String,
    #[serde(flatten)]
    selector: AccountSelector,
    data: Bytes,
}

#[derive(Debug, Serialize, Deserialize)]
struct SignResponse {
    signature: Bytes,
}

struct ApiError(KeyStoreError);

impl From<KeyStoreError> for ApiError {
    fn from(err: KeyStoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            KeyStoreError::UnknownChain(_) | KeyStoreError::SelectorRequired => {
                StatusCode::BAD_REQUEST
            }
            KeyStoreError::AccountNotFound => StatusCode::NOT_FOUND,
            KeyStoreError::Key(_) => StatusCode::BAD_REQUEST,
            KeyStoreError::Seal(_) | KeyStoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

fn routes(keystore: SharedKeyStore) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/accounts", post(create_account).get(list_accounts))
        .route("/api/v1/accounts/find", get(find_account))
        .route("/api/v1/sign", post(sign))
        .with_state(keystore)
}

async fn health() -> &'static str {
    "ok"
}

async fn create_account(
    State(keystore): State<SharedKeyStore>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let info = keystore.create_account(
        &request.chain_type,
        request.name,
        request.private_key.as_deref().map(|v| &**v),
    )?;
    Ok(Json(info.into()))
}

async fn list_accounts(
    State(keystore): State<SharedKeyStore>,
    Query(query): Query<ListAccountsQuery>,
) -> Result<Json<Vec<AccountSummary>>, ApiError> {
    Ok(Json(keystore.list_accounts(&query.name_prefix)?))
}

async fn find_account(
    State(keystore): State<SharedKeyStore>,
    Query(selector): Query<AccountSelector>,
) -> Result<Json<AccountResponse>, ApiError> {
    let info = keystore.get_account(&selector)?.ok_or(KeyStoreError::AccountNotFound)?;
    Ok(Json(info.into()))
}

async fn sign(
    State(keystore): State<SharedKeyStore>,
    Json(request): Json<SignRequest>,
) -> Result<Json<SignResponse>, ApiError> {
    let signature = keystore.sign(&request.chain_type, &request.selector, &request.data)?;
    Ok(Json(SignResponse { signature: signature.into() }))
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level)?;

    let keystore = Arc::new(KeyStore::new(
        ChainRegistry::default(),
        MemoryStore::new(),
        Sealer::new(cli.master_key.as_bytes()),
    ));
    if cli.master_key.is_empty() {
        tracing::warn!("No master key configured, stored keys are not sealed");
    }

    let app = routes(keystore);
    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(level: &str) -> eyre::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to initialize tracing: {}", e))?;

    Ok(())
}
