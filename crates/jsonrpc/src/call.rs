//! Typed calls and batches

use crate::error::RpcClientError;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use serde_json::Value;

/// Untyped JSON-RPC request with its response slots.
///
/// After a successful transport round trip exactly one of `result` and
/// `error` is populated.
#[derive(Debug, Default)]
pub struct RawCall {
    pub method: String,
    pub params: Vec<Value>,
    pub result: Option<Box<RawValue>>,
    pub error: Option<RpcClientError>,
}

impl RawCall {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self { method: method.into(), params, result: None, error: None }
    }
}

/// JSON-RPC transport: a single connection or a balanced pool of them.
#[async_trait::async_trait]
pub trait RpcClient: Send + Sync {
    /// Execute one call, populating `call.result` or failing.
    async fn call_raw(&self, call: &mut RawCall) -> Result<(), RpcClientError>;

    /// Execute every element of `batch` in one wire request. Transport
    /// success with per-element failures is still `Ok`; inspect each
    /// element through its [`BatchSlot`].
    async fn batch_call(&self, batch: &mut RpcBatch) -> Result<(), RpcClientError>;
}

type DecodeFn<T> = Box<dyn FnOnce(&RawValue) -> Result<T, RpcClientError> + Send>;

/// A JSON-RPC request with a typed, deferred decode stage.
pub struct RpcCall<T> {
    raw: RawCall,
    decode: DecodeFn<T>,
}

impl<T: DeserializeOwned + Send + 'static> RpcCall<T> {
    /// Call whose result decodes directly into `T`.
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            raw: RawCall::new(method, params),
            decode: Box::new(|raw| Ok(serde_json::from_str(raw.get())?)),
        }
    }
}

impl<T: Send + 'static> RpcCall<T> {
    /// Call decoded in two stages: the wire shape `R`, then a conversion
    /// into `T`. The conversion runs at resolve time, not on the wire.
    pub fn with_convert<R, F>(method: impl Into<String>, params: Vec<Value>, convert: F) -> Self
    where
        R: DeserializeOwned,
        F: FnOnce(R) -> Result<T, RpcClientError> + Send + 'static,
    {
        Self {
            raw: RawCall::new(method, params),
            decode: Box::new(move |raw| convert(serde_json::from_str(raw.get())?)),
        }
    }

    /// Execute standalone over `client` and decode the result.
    pub async fn call<C>(mut self, client: &C) -> Result<T, RpcClientError>
    where
        C: RpcClient + ?Sized,
    {
        client.call_raw(&mut self.raw).await?;
        if let Some(err) = self.raw.error.take() {
            return Err(err);
        }
        let result = self.raw.result.take().ok_or(RpcClientError::NoResult)?;
        (self.decode)(&result)
    }
}

/// Handle to one element of a batch; resolves after the batch ran.
pub struct BatchSlot<T> {
    index: usize,
    decode: DecodeFn<T>,
}

impl<T> BatchSlot<T> {
    /// Take this element's outcome out of the batch and run the deferred
    /// decode. Errors are isolated per element.
    pub fn resolve(self, batch: &mut RpcBatch) -> Result<T, RpcClientError> {
        let call = &mut batch.calls[self.index];
        if let Some(err) = call.error.take() {
            return Err(err);
        }
        let result = call.result.take().ok_or(RpcClientError::NoResult)?;
        (self.decode)(&result)
    }
}

/// Ordered list of calls sharing one wire request.
///
/// Element order is preserved across the round trip; responses are matched
/// back by the request ids assigned at marshal time.
#[derive(Debug, Default)]
pub struct RpcBatch {
    pub calls: Vec<RawCall>,
}

impl RpcBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a typed call, returning the slot that later resolves it.
    pub fn push<T>(&mut self, call: RpcCall<T>) -> BatchSlot<T> {
        let index = self.calls.len();
        self.calls.push(call.raw);
        BatchSlot { index, decode: call.decode }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Execute the whole batch over `client`.
    pub async fn call<C>(&mut self, client: &C) -> Result<(), RpcClientError>
    where
        C: RpcClient + ?Sized,
    {
        client.batch_call(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hexnum;
    use serde_json::json;

    /// Client with canned per-method responses, mirroring a well-behaved
    /// JSON-RPC server.
    struct CannedClient;

    #[async_trait::async_trait]
    impl RpcClient for CannedClient {
        async fn call_raw(&self, call: &mut RawCall) -> Result<(), RpcClientError> {
            match call.method.as_str() {
                "eth_blockNumber" => {
                    call.result = Some(RawValue::from_string("\"0x10\"".into())?);
                }
                "eth_chainId" => {
                    call.result = Some(RawValue::from_string("\"0x1\"".into())?);
                }
                _ => {
                    return Err(RpcClientError::Rpc {
                        code: -32601,
                        message: "method not found".into(),
                    })
                }
            }
            Ok(())
        }

        async fn batch_call(&self, batch: &mut RpcBatch) -> Result<(), RpcClientError> {
            for call in &mut batch.calls {
                match call.method.as_str() {
                    "eth_blockNumber" => {
                        call.result = Some(RawValue::from_string("\"0x10\"".into())?);
                    }
                    "fails" => {
                        call.error = Some(RpcClientError::Rpc {
                            code: -32000,
                            message: "element failed".into(),
                        });
                    }
                    _ => {} // left empty: no result, no error
                }
            }
            Ok(())
        }
    }

    fn block_number_call() -> RpcCall<u64> {
        RpcCall::with_convert("eth_blockNumber", vec![], |raw: String| hexnum::parse_u64(&raw))
    }

    #[tokio::test]
    async fn test_single_call_with_convert() {
        let n = block_number_call().call(&CannedClient).await.unwrap();
        assert_eq!(n, 0x10);
    }

    #[tokio::test]
    async fn test_single_call_rpc_error() {
        let err = RpcCall::<String>::new("nope", vec![json!([])]).call(&CannedClient).await;
        assert!(matches!(err, Err(RpcClientError::Rpc { code: -32601, .. })));
    }

    #[tokio::test]
    async fn test_batch_isolates_element_errors() {
        let mut batch = RpcBatch::new();
        let ok = batch.push(block_number_call());
        let failed = batch.push(RpcCall::<String>::new("fails", vec![]));
        let missing = batch.push(RpcCall::<String>::new("silent", vec![]));
        assert_eq!(batch.len(), 3);

        batch.call(&CannedClient).await.unwrap();

        assert_eq!(ok.resolve(&mut batch).unwrap(), 0x10);
        assert!(matches!(
            failed.resolve(&mut batch),
            Err(RpcClientError::Rpc { code: -32000, .. })
        ));
        assert!(matches!(missing.resolve(&mut batch), Err(RpcClientError::NoResult)));
    }

    #[tokio::test]
    async fn test_decode_error_is_per_element() {
        let mut batch = RpcBatch::new();
        // Result decodes as a string but the convert stage expects hex.
        let bad = batch.push(RpcCall::with_convert("eth_blockNumber", vec![], |raw: String| {
            hexnum::parse_u64(&format!("{raw}zz"))
        }));
        let good = batch.push(block_number_call());

        batch.call(&CannedClient).await.unwrap();

        assert!(bad.resolve(&mut batch).is_err());
        assert_eq!(good.resolve(&mut batch).unwrap(), 0x10);
    }
}
