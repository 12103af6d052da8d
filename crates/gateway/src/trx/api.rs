//! Tron HTTP wallet API
//!
//! Transaction construction and broadcast go through the native HTTP API
//! rather than the JSON-RPC surface. `visible: true` selects base58
//! addresses in requests and responses.

use omni_model::GatewayError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct CreateTransactionRequest {
    pub owner_address: String,
    pub to_address: String,
    pub amount: u64,
    pub visible: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionResponse {
    #[serde(default, rename = "txID")]
    pub tx_id: String,
    #[serde(default)]
    pub raw_data: Option<Box<RawValue>>,
    #[serde(default)]
    pub raw_data_hex: Option<String>,
    #[serde(default, alias = "Error")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TriggerConstantContractRequest {
    pub owner_address: String,
    pub contract_address: String,
    pub data: String,
    pub visible: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct TronResultFlag {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Display for TronResultFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            self.code.as_deref().unwrap_or("UNKNOWN"),
            self.message.as_deref().unwrap_or("")
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct TriggerConstantContractResponse {
    #[serde(default)]
    pub result: TronResultFlag,
    #[serde(default)]
    pub energy_used: u64,
}

#[derive(Debug, Serialize)]
pub struct TriggerSmartContractRequest {
    pub owner_address: String,
    pub contract_address: String,
    pub fee_limit: u64,
    pub call_value: u64,
    pub data: String,
    pub visible: bool,
}

#[derive(Debug, Deserialize)]
pub struct TronRawTransaction {
    #[serde(default, rename = "txID")]
    pub tx_id: String,
    #[serde(default)]
    pub raw_data: Option<Box<RawValue>>,
    #[serde(default)]
    pub raw_data_hex: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TriggerSmartContractResponse {
    #[serde(default)]
    pub result: TronResultFlag,
    #[serde(default)]
    pub transaction: Option<TronRawTransaction>,
}

#[derive(Debug, Serialize)]
pub struct BroadcastTransactionRequest {
    pub visible: bool,
    pub raw_data: Box<RawValue>,
    pub signature: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BroadcastTransactionResponse {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChainParameter {
    pub key: String,
    #[serde(default)]
    pub value: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct GetChainParametersResponse {
    #[serde(default, rename = "chainParameter")]
    pub chain_parameter: Vec<ChainParameter>,
}

/// Client for the `/wallet` HTTP API of one Tron node.
pub struct TronHttpApi {
    http: reqwest::Client,
    base_url: String,
}

impl TronHttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http: reqwest::Client::new(), base_url }
    }

    async fn post<Req, Res>(&self, path: &str, request: &Req) -> Result<Res, GatewayError>
    where
        Req: Serialize + fmt::Debug,
        Res: DeserializeOwned,
    {
        debug!(path, request = ?request, "tron api request");
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(request)
            .send()
            .await
            .map_err(|err| GatewayError::unavailable(format!("tron api: {err}")))?
            .error_for_status()
            .map_err(|err| GatewayError::unavailable(format!("tron api: {err}")))?;
        response
            .json()
            .await
            .map_err(|err| GatewayError::internal(format!("tron api decode: {err}")))
    }

    pub async fn create_transaction(
        &self,
        request: &CreateTransactionRequest,
    ) -> Result<CreateTransactionResponse, GatewayError> {
        self.post("/wallet/createtransaction", request).await
    }

    pub async fn trigger_constant_contract(
        &self,
        request: &TriggerConstantContractRequest,
    ) -> Result<TriggerConstantContractResponse, GatewayError> {
        self.post("/wallet/triggerconstantcontract", request).await
    }

    pub async fn trigger_smart_contract(
        &self,
        request: &TriggerSmartContractRequest,
    ) -> Result<TriggerSmartContractResponse, GatewayError> {
        self.post("/wallet/triggersmartcontract", request).await
    }

    pub async fn broadcast_transaction(
        &self,
        request: &BroadcastTransactionRequest,
    ) -> Result<BroadcastTransactionResponse, GatewayError> {
        self.post("/wallet/broadcasttransaction", request).await
    }

    pub async fn get_chain_parameters(&self) -> Result<GetChainParametersResponse, GatewayError> {
        self.post("/wallet/getchainparameters", &serde_json::json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_transaction_response_shape() {
        let raw = r#"{
            "txID": "8a6a2e0b07b5ff1f0b4d3459fcbc8c3a4a5c5a2a8b8d3b0b8e0c8c3a4a5c5a2a",
            "raw_data": {"contract": []},
            "raw_data_hex": "0a02aabb",
            "visible": true
        }"#;
        let response: CreateTransactionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.raw_data_hex.as_deref(), Some("0a02aabb"));
        assert!(response.error.is_none());
        assert!(response.raw_data.is_some());

        let failed: CreateTransactionResponse =
            serde_json::from_str(r#"{"Error": "Contract validate error"}"#).unwrap();
        assert_eq!(failed.error.as_deref(), Some("Contract validate error"));
    }

    #[test]
    fn test_trigger_response_shapes() {
        let raw = r#"{
            "result": {"result": true},
            "energy_used": 13045,
            "constant_result": ["00"]
        }"#;
        let response: TriggerConstantContractResponse = serde_json::from_str(raw).unwrap();
        assert!(response.result.result);
        assert_eq!(response.energy_used, 13045);

        let raw = r#"{
            "result": {"result": true},
            "transaction": {"txID": "ab", "raw_data": {}, "raw_data_hex": "0a"}
        }"#;
        let response: TriggerSmartContractResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.transaction.unwrap().tx_id, "ab");

        let failed: TriggerSmartContractResponse = serde_json::from_str(
            r#"{"result": {"result": false, "code": "CONTRACT_VALIDATE_ERROR", "message": "abc"}}"#,
        )
        .unwrap();
        assert!(!failed.result.result);
        assert_eq!(failed.result.to_string(), "CONTRACT_VALIDATE_ERROR: abc");
    }

    #[test]
    fn test_chain_parameters_shape() {
        let raw = r#"{"chainParameter": [
            {"key": "getTransactionFee", "value": 1000},
            {"key": "getEnergyFee", "value": 420},
            {"key": "getWitnessPayPerBlock"}
        ]}"#;
        let response: GetChainParametersResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.chain_parameter.len(), 3);
        assert_eq!(response.chain_parameter[0].value, Some(1000));
        assert_eq!(response.chain_parameter[2].value, None);
    }
}
