//! JSON-RPC 2.0 over HTTP

use crate::call::{RawCall, RpcBatch, RpcClient};
use crate::error::RpcClientError;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a [Value],
}

impl<'a> JsonRpcRequest<'a> {
    fn new(id: u64, call: &'a RawCall) -> Self {
        Self { jsonrpc: "2.0", id, method: &call.method, params: &call.params }
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    id: Option<u64>,
    result: Option<Box<RawValue>>,
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

impl From<JsonRpcErrorObject> for RpcClientError {
    fn from(err: JsonRpcErrorObject) -> Self {
        Self::Rpc { code: err.code, message: err.message }
    }
}

/// Plain HTTP JSON-RPC connection to one endpoint.
#[derive(Debug, Clone)]
pub struct HttpRpcClient {
    http: reqwest::Client,
    url: String,
}

impl HttpRpcClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post<B: Serialize, R: serde::de::DeserializeOwned>(
        &self,
        body: &B,
    ) -> Result<R, RpcClientError> {
        let response = self.http.post(&self.url).json(body).send().await?;
        Ok(response.error_for_status()?.json().await?)
    }
}

#[async_trait::async_trait]
impl RpcClient for HttpRpcClient {
    async fn call_raw(&self, call: &mut RawCall) -> Result<(), RpcClientError> {
        let response: JsonRpcResponse = self.post(&JsonRpcRequest::new(1, call)).await?;
        if let Some(err) = response.error {
            return Err(err.into());
        }
        call.result = Some(response.result.ok_or(RpcClientError::NoResult)?);
        Ok(())
    }

    async fn batch_call(&self, batch: &mut RpcBatch) -> Result<(), RpcClientError> {
        if batch.is_empty() {
            return Ok(());
        }
        let requests: Vec<JsonRpcRequest<'_>> = batch
            .calls
            .iter()
            .enumerate()
            .map(|(id, call)| JsonRpcRequest::new(id as u64, call))
            .collect();
        let responses: Vec<JsonRpcResponse> = self.post(&requests).await?;
        apply_batch_responses(batch, responses);
        Ok(())
    }
}

/// Associate responses to batch elements by the id assigned at marshal time.
fn apply_batch_responses(batch: &mut RpcBatch, responses: Vec<JsonRpcResponse>) {
    for response in responses {
        let Some(index) = response.id.map(|id| id as usize) else { continue };
        let Some(call) = batch.calls.get_mut(index) else { continue };
        match (response.error, response.result) {
            (Some(err), _) => call.error = Some(err.into()),
            (None, Some(result)) => call.result = Some(result),
            (None, None) => call.error = Some(RpcClientError::NoResult),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::RpcCall;
    use crate::hexnum;

    #[test]
    fn test_request_envelope() {
        let call = RawCall::new("eth_blockNumber", vec![]);
        let body = serde_json::to_value(JsonRpcRequest::new(1, &call)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "eth_blockNumber", "params": []})
        );
    }

    #[test]
    fn test_apply_batch_responses_by_id() {
        let mut batch = RpcBatch::new();
        let first = batch.push(RpcCall::with_convert("eth_blockNumber", vec![], |raw: String| {
            hexnum::parse_u64(&raw)
        }));
        let second = batch.push(RpcCall::<String>::new("eth_chainId", vec![]));

        // Out-of-order response array, matched back by id.
        let responses: Vec<JsonRpcResponse> = serde_json::from_str(
            r#"[{"id":1,"result":"chain"},{"id":0,"result":"0x2a"}]"#,
        )
        .unwrap();
        apply_batch_responses(&mut batch, responses);

        assert_eq!(first.resolve(&mut batch).unwrap(), 42);
        assert_eq!(second.resolve(&mut batch).unwrap(), "chain");
    }

    #[test]
    fn test_apply_batch_responses_element_error() {
        let mut batch = RpcBatch::new();
        let slot = batch.push(RpcCall::<String>::new("eth_chainId", vec![]));
        let missing = batch.push(RpcCall::<String>::new("eth_chainId", vec![]));

        let responses: Vec<JsonRpcResponse> = serde_json::from_str(
            r#"[{"id":0,"error":{"code":-32000,"message":"oops"}},{"id":1}]"#,
        )
        .unwrap();
        apply_batch_responses(&mut batch, responses);

        assert!(matches!(slot.resolve(&mut batch), Err(RpcClientError::Rpc { code: -32000, .. })));
        assert!(matches!(missing.resolve(&mut batch), Err(RpcClientError::NoResult)));
    }
}
