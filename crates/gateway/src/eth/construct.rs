//! Transfer construction, signing and broadcast

use crate::adapter::{CreateTransferRequest, SendRequest, SendResponse, SignTransactionRequest};
use crate::eth::calls::{self, CallRequest, PENDING_TAG};
use crate::eth::erc20;
use crate::eth::tx::{LegacyTransaction, TRANSFER_GAS};
use crate::eth::EthAdapter;
use alloy_primitives::{Bytes, U256};
use omni_model::{GatewayError, SignedTransaction, TransactionIntent};
use tracing::debug;

impl EthAdapter {
    pub(crate) async fn create_transfer_impl(
        &self,
        request: CreateTransferRequest,
    ) -> Result<TransactionIntent, GatewayError> {
        let from = (self.ext.address_from_string)(&request.from)?;
        let to = (self.ext.address_from_string)(&request.to)?;
        let currency = self.currencies.parse_chain_currency(&request.amount.currency_id)?;
        let amount = request.amount.value;

        let nonce = calls::transaction_count(from, PENDING_TAG)
            .call(&self.client)
            .await
            .map_err(|err| GatewayError::internal(format!("failed to get nonce: {err}")))?;
        let gas_price = calls::gas_price()
            .call(&self.client)
            .await
            .map_err(|err| GatewayError::internal(format!("failed to get gas price: {err}")))?;
        debug!(nonce, gas_price = %gas_price, "transfer inputs");

        let tx = if currency.is_native() {
            LegacyTransaction {
                nonce,
                gas_price,
                gas_limit: TRANSFER_GAS,
                to: Some(to),
                value: amount,
                data: Bytes::new(),
                chain_id: self.chain_ref,
            }
        } else if currency.is_fungible() {
            let token = (self.ext.address_from_string)(&currency.address)?;
            let data = erc20::encode_transfer(to, amount);
            debug!(from = %from, token = %token, "estimating gas");
            let gas_limit = calls::estimate_gas(&CallRequest {
                from: Some(from),
                to: Some(token),
                data: Some(data.clone().into()),
                ..Default::default()
            })
            .call(&self.client)
            .await
            .map_err(|err| GatewayError::internal(format!("failed to estimate gas: {err}")))?;
            LegacyTransaction {
                nonce,
                gas_price,
                gas_limit,
                to: Some(token),
                value: U256::ZERO,
                data: data.into(),
                chain_id: self.chain_ref,
            }
        } else {
            return Err(GatewayError::invalid_currency(&request.amount.currency_id));
        };

        let digest = tx.signing_hash();
        debug!(tx_id = %digest, gas = tx.gas_limit, "transfer constructed");

        let estimated_fee = U256::from(tx.gas_limit) * tx.gas_price;
        Ok(TransactionIntent {
            id: Bytes::copy_from_slice(digest.as_slice()),
            payload_to_sign: Bytes::copy_from_slice(digest.as_slice()),
            signature_type: self.descriptor.signature_type.to_string(),
            raw_data: tx.encode_unsigned().into(),
            estimated_fee,
        })
    }

    pub(crate) fn sign_impl(
        &self,
        request: SignTransactionRequest,
    ) -> Result<SignedTransaction, GatewayError> {
        let signature = (self.descriptor.sign)(&request.intent.payload_to_sign, &request.private_key)
            .map_err(|err| GatewayError::internal(format!("failed to sign tx: {err}")))?;
        Ok(SignedTransaction { intent: request.intent, signatures: vec![signature.into()] })
    }

    pub(crate) async fn send_impl(&self, request: SendRequest) -> Result<SendResponse, GatewayError> {
        let tx = LegacyTransaction::decode_unsigned(&request.intent.raw_data)
            .map_err(|err| GatewayError::internal(format!("failed to decode raw tx: {err}")))?;
        let signature = request
            .signatures
            .first()
            .ok_or_else(|| GatewayError::InvalidArgument("a signature is required".to_string()))?;
        let signed = tx.apply_signature(signature)?;

        debug!(bytes = signed.len(), "broadcasting raw transaction");
        let id = calls::send_raw_transaction(&signed)
            .call(&self.client)
            .await
            .map_err(|err| GatewayError::internal(format!("failed to send tx: {err}")))?;
        Ok(SendResponse { id: Bytes::copy_from_slice(id.as_slice()) })
    }
}
