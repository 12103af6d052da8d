//! HTTP facade
//!
//! Thin REST dispatch over the chain router. `ListBlocks` streams NDJSON;
//! everything else is plain JSON request/response. Unexpected panics become
//! 500 responses instead of killing the process.

use crate::adapter::{
    ChainAdapter, CreateTransferRequest, ListBlocksRequest, SendRequest, SignTransactionRequest,
};
use crate::router::ChainRouter;
use alloy_primitives::B256;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use omni_model::{ChainInfo, Currency, FinalityStatus, GatewayError, SignedTransaction};
use serde::Deserialize;
use std::any::Any;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as CorsAny, CorsLayer};
use tracing::error;

const NDJSON: &str = "application/x-ndjson";

/// Facade error: a gateway error with its HTTP mapping.
#[derive(Debug)]
pub struct ApiError(GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GatewayError::InvalidArgument(_) | GatewayError::OutOfRange(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Unimplemented(_) => StatusCode::NOT_IMPLEMENTED,
            GatewayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({
            "code": self.0.code(),
            "error": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListBlocksQuery {
    start: u64,
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    min_finality: Option<FinalityStatus>,
}

/// REST facade over the router.
#[derive(Clone)]
pub struct GatewayApi {
    router: Arc<ChainRouter>,
}

impl GatewayApi {
    pub fn new(router: Arc<ChainRouter>) -> Self {
        Self { router }
    }

    pub fn routes(self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route("/api/v1/chains", get(list_chains))
            .route("/api/v1/chains/:chain_id", get(get_chain))
            .route("/api/v1/chains/:chain_id/blocks", get(list_blocks))
            .route("/api/v1/chains/:chain_id/blocks/:block_id", get(get_block))
            .route("/api/v1/chains/:chain_id/currencies/:currency_id", get(get_currency))
            .route("/api/v1/chains/:chain_id/transfers", post(create_transfer))
            .route("/api/v1/chains/:chain_id/transactions/sign", post(sign_transaction))
            .route("/api/v1/chains/:chain_id/transactions/combine", post(combine_transaction))
            .route("/api/v1/chains/:chain_id/transactions/send", post(send_transaction))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(CorsLayer::new().allow_origin(CorsAny).allow_methods(CorsAny).allow_headers(CorsAny))
            .with_state(self)
    }

    fn adapter(&self, chain_id: &str) -> Result<Arc<dyn ChainAdapter>, ApiError> {
        Ok(self.router.get(chain_id)?.clone())
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "request handler panicked");
    ApiError(GatewayError::internal("internal error")).into_response()
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "omnigate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn metrics() -> Result<Response, ApiError> {
    let encoder = prometheus::TextEncoder::new();
    let body = encoder
        .encode_to_string(&prometheus::gather())
        .map_err(|err| ApiError(GatewayError::internal(err)))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response())
}

async fn list_chains(State(api): State<GatewayApi>) -> Result<Json<Vec<ChainInfo>>, ApiError> {
    Ok(Json(api.router.list_chains().await?))
}

async fn get_chain(
    State(api): State<GatewayApi>,
    Path(chain_id): Path<String>,
) -> Result<Json<ChainInfo>, ApiError> {
    Ok(Json(api.adapter(&chain_id)?.get_chain().await?))
}

async fn get_block(
    State(api): State<GatewayApi>,
    Path((chain_id, block_id)): Path<(String, String)>,
) -> Result<Json<omni_model::Block>, ApiError> {
    let id: B256 = block_id
        .parse()
        .map_err(|_| GatewayError::InvalidArgument(format!("invalid block id: {block_id}")))?;
    Ok(Json(api.adapter(&chain_id)?.get_block(id).await?))
}

async fn list_blocks(
    State(api): State<GatewayApi>,
    Path(chain_id): Path<String>,
    Query(query): Query<ListBlocksQuery>,
) -> Result<Response, ApiError> {
    let adapter = api.adapter(&chain_id)?;
    let request = ListBlocksRequest {
        start_number: query.start,
        count: query.count,
        min_finality: query.min_finality.unwrap_or_default(),
    };

    let (tx, mut rx) = mpsc::channel(16);
    let task = tokio::spawn(async move { adapter.list_blocks(request, tx).await });

    // The first element decides between an error response and a stream.
    match rx.recv().await {
        None => {
            task.await.map_err(|err| ApiError(GatewayError::internal(err)))??;
            Ok(([(header::CONTENT_TYPE, NDJSON)], String::new()).into_response())
        }
        Some(first) => {
            // Errors after the first block can only end the stream; log them.
            tokio::spawn(async move {
                if let Ok(Err(err)) = task.await {
                    error!(error = %err, "block stream aborted");
                }
            });
            let stream = tokio_stream::once(first).chain(ReceiverStream::new(rx)).map(|block| {
                let line = serde_json::to_string(&block).unwrap_or_else(|err| {
                    error!(error = %err, "failed to serialize block");
                    String::new()
                });
                Ok::<_, Infallible>(format!("{line}\n"))
            });
            Ok((
                [(header::CONTENT_TYPE, NDJSON)],
                Body::from_stream(stream),
            )
                .into_response())
        }
    }
}

async fn get_currency(
    State(api): State<GatewayApi>,
    Path((chain_id, currency_id)): Path<(String, String)>,
) -> Result<Json<Currency>, ApiError> {
    Ok(Json(api.adapter(&chain_id)?.get_currency(&currency_id).await?))
}

async fn create_transfer(
    State(api): State<GatewayApi>,
    Path(chain_id): Path<String>,
    Json(request): Json<CreateTransferRequest>,
) -> Result<Json<omni_model::TransactionIntent>, ApiError> {
    Ok(Json(api.adapter(&chain_id)?.create_transfer(request).await?))
}

async fn sign_transaction(
    State(api): State<GatewayApi>,
    Path(chain_id): Path<String>,
    Json(request): Json<SignTransactionRequest>,
) -> Result<Json<SignedTransaction>, ApiError> {
    Ok(Json(api.adapter(&chain_id)?.sign_transaction(request).await?))
}

async fn combine_transaction(
    State(api): State<GatewayApi>,
    Path(chain_id): Path<String>,
    Json(signed): Json<SignedTransaction>,
) -> Result<Json<SignedTransaction>, ApiError> {
    Ok(Json(api.adapter(&chain_id)?.combine_transaction(signed).await?))
}

async fn send_transaction(
    State(api): State<GatewayApi>,
    Path(chain_id): Path<String>,
    Json(request): Json<SendRequest>,
) -> Result<Json<crate::adapter::SendResponse>, ApiError> {
    Ok(Json(api.adapter(&chain_id)?.send(request).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SendResponse;
    use alloy_primitives::{Bytes, U256};
    use axum::body::to_bytes;
    use axum::http::Request;
    use omni_model::{
        Block, BlockHeader, ChainId, ChainService, CurrencyAmount, TransactionIntent,
    };
    use tower::ServiceExt;

    struct TestAdapter {
        chain: ChainId,
    }

    impl TestAdapter {
        fn block(number: u64) -> Block {
            Block {
                header: BlockHeader {
                    id: Bytes::from(vec![number as u8; 32]),
                    number,
                    parent_id: Bytes::from(vec![0u8; 32]),
                    timestamp: 1_700_000_000,
                    finality: FinalityStatus::Finalized,
                },
                transactions: vec![],
            }
        }

        fn intent() -> TransactionIntent {
            TransactionIntent {
                id: Bytes::from(vec![1u8; 32]),
                payload_to_sign: Bytes::from(vec![1u8; 32]),
                signature_type: "secp256k1".to_string(),
                raw_data: Bytes::from(vec![2u8; 8]),
                estimated_fee: U256::from(21_000u64),
            }
        }
    }

    #[async_trait::async_trait]
    impl ChainAdapter for TestAdapter {
        fn chain_id(&self) -> &ChainId {
            &self.chain
        }

        async fn get_chain(&self) -> Result<ChainInfo, GatewayError> {
            Ok(ChainInfo {
                id: self.chain.clone(),
                bip44_id: 60,
                testnet: false,
                finalized_height: 20,
                ms_per_block: 3000,
                supported_services: vec![ChainService::Block],
            })
        }

        async fn get_block(&self, _id: B256) -> Result<Block, GatewayError> {
            Ok(Self::block(7))
        }

        async fn list_blocks(
            &self,
            request: ListBlocksRequest,
            tx: mpsc::Sender<Block>,
        ) -> Result<(), GatewayError> {
            if request.start_number >= 100 {
                return Err(GatewayError::block_out_of_range());
            }
            for number in request.start_number..request.start_number + 2 {
                tx.send(Self::block(number)).await.map_err(GatewayError::internal)?;
            }
            Ok(())
        }

        async fn get_currency(&self, id: &str) -> Result<Currency, GatewayError> {
            Ok(Currency { id: id.to_string(), symbol: "TEST".to_string(), decimals: 18 })
        }

        async fn create_transfer(
            &self,
            request: CreateTransferRequest,
        ) -> Result<TransactionIntent, GatewayError> {
            let _: CurrencyAmount = request.amount;
            Ok(Self::intent())
        }

        async fn sign_transaction(
            &self,
            request: SignTransactionRequest,
        ) -> Result<SignedTransaction, GatewayError> {
            Ok(SignedTransaction {
                intent: request.intent,
                signatures: vec![Bytes::from(vec![3u8; 65])],
            })
        }

        async fn combine_transaction(
            &self,
            signed: SignedTransaction,
        ) -> Result<SignedTransaction, GatewayError> {
            Ok(signed)
        }

        async fn send(&self, request: SendRequest) -> Result<SendResponse, GatewayError> {
            Ok(SendResponse { id: request.intent.id })
        }
    }

    fn test_app() -> Router {
        let mut router = ChainRouter::new();
        router.insert(Arc::new(TestAdapter { chain: ChainId::new("TEST", "MAINNET") }));
        GatewayApi::new(Arc::new(router)).routes()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_list_chains() {
        let response = test_app()
            .oneshot(Request::builder().uri("/api/v1/chains").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let chains: Vec<ChainInfo> =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].id.chain_type, "TEST");
    }

    #[tokio::test]
    async fn test_unknown_chain_is_not_found() {
        let response = test_app()
            .oneshot(Request::builder().uri("/api/v1/chains/NOPE").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(response).await.contains("NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_list_blocks_streams_ndjson() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/chains/TEST/blocks?start=5&count=2&minFinality=FINALIZED")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Block = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.header.number, 5);
    }

    #[tokio::test]
    async fn test_list_blocks_out_of_range() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/chains/TEST/blocks?start=200")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("OUT_OF_RANGE"));
    }

    #[tokio::test]
    async fn test_create_transfer_round_trip() {
        let request = CreateTransferRequest {
            from: "0xaaaa".to_string(),
            to: "0xbbbb".to_string(),
            amount: CurrencyAmount { currency_id: "TEST".to_string(), value: U256::from(5) },
        };
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/chains/TEST/transfers")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_string(&request).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let intent: TransactionIntent =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(intent.signature_type, "secp256k1");
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("omnigate"));
    }
}
