//! Sui JSON-RPC client implementation.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use client_blockchain_core::{
    ChainClient, CoinObject, CoinType, ExecutedTransaction, ObjectId, ObjectKind, OwnedObject,
    ParseError, SignedTransaction, SuiAddress, TransactionDigest, TransactionRecord,
    TransportError,
};

use crate::config::SuiConfig;
use crate::core::error::{Result, SuiError};
use crate::core::types::{
    JsonRpcRequest, JsonRpcResponse, Page, RpcCoin, RpcNormalizedStruct, RpcObjectResponse,
    RpcTransactionResponse,
};
use crate::utils::conversion::{
    coin_from_rpc, gas_used, object_from_rpc, owner_address, parse_u64, struct_tag_parts,
};

/// Page size requested from paginated endpoints.
const PAGE_LIMIT: u64 = 50;

/// Sui full node client.
///
/// Implements [`ChainClient`] over the node's JSON-RPC API. Constructed
/// explicitly by the caller; nothing in the library creates one implicitly.
pub struct SuiRpcClient {
    /// Sui configuration
    config: SuiConfig,

    /// HTTP client
    http_client: reqwest::Client,

    /// JSON-RPC request id counter
    next_id: AtomicU64,
}

impl SuiRpcClient {
    /// Create a new Sui RPC client.
    ///
    /// # Arguments
    ///
    /// * `config` - Sui-specific configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid.
    pub fn new(config: SuiConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            http_client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &SuiConfig {
        &self.config
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        tracing::debug!(method, url = self.config.rpc_url(), "Sui RPC request");

        let response = self
            .http_client
            .post(self.config.rpc_url())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SuiError::Network(format!(
                "{} failed with status {}: {}",
                method, status, error_text
            )));
        }

        let body: JsonRpcResponse<T> = response
            .json()
            .await
            .map_err(|e| SuiError::Serialization(format!("{method} response: {e}")))?;

        if let Some(error) = body.error {
            return Err(SuiError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        body.result
            .ok_or_else(|| SuiError::Serialization(format!("{method} returned no result")))
    }

    /// Drain a cursor-paginated endpoint whose cursor is the third parameter.
    async fn paginate<T: DeserializeOwned>(
        &self,
        method: &str,
        leading_params: Vec<Value>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut cursor = Value::Null;

        loop {
            let mut params = leading_params.clone();
            params.push(cursor);
            params.push(json!(PAGE_LIMIT));

            let page: Page<T> = self.call(method, Value::Array(params)).await?;
            items.extend(page.data);

            match page.next_cursor {
                Some(next) if page.has_next_page => cursor = next,
                _ => break,
            }
        }

        Ok(items)
    }

    async fn fetch_object(&self, object_id: ObjectId) -> Result<OwnedObject> {
        let response: RpcObjectResponse = self
            .call(
                "sui_getObject",
                json!([
                    object_id.to_hex(),
                    {
                        "showType": true,
                        "showOwner": true,
                        "showPreviousTransaction": true,
                        "showContent": true
                    }
                ]),
            )
            .await?;

        match response.data {
            Some(data) => object_from_rpc(data),
            None => Err(SuiError::ObjectNotFound(object_id.to_hex())),
        }
    }
}

#[async_trait]
impl ChainClient for SuiRpcClient {
    async fn get_coins(
        &self,
        owner: SuiAddress,
        coin_type: &CoinType,
    ) -> std::result::Result<Vec<CoinObject>, TransportError> {
        let coins: Vec<RpcCoin> = self
            .paginate(
                "suix_getCoins",
                vec![json!(owner.to_hex()), json!(coin_type.as_str())],
            )
            .await?;

        let coins = coins
            .into_iter()
            .map(coin_from_rpc)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(%owner, %coin_type, count = coins.len(), "Fetched coins");
        Ok(coins)
    }

    async fn get_owned_objects(
        &self,
        owner: SuiAddress,
    ) -> std::result::Result<Vec<OwnedObject>, TransportError> {
        let responses: Vec<RpcObjectResponse> = self
            .paginate(
                "suix_getOwnedObjects",
                vec![
                    json!(owner.to_hex()),
                    json!({
                        "filter": null,
                        "options": {
                            "showType": true,
                            "showOwner": true,
                            "showPreviousTransaction": true,
                            "showContent": true
                        }
                    }),
                ],
            )
            .await?;

        let objects = responses
            .into_iter()
            .filter_map(|response| response.data)
            .map(object_from_rpc)
            .collect::<Result<Vec<_>>>()?;

        Ok(objects)
    }

    async fn get_object(
        &self,
        object_id: ObjectId,
    ) -> std::result::Result<OwnedObject, TransportError> {
        self.fetch_object(object_id).await.map_err(|e| match e {
            SuiError::ObjectNotFound(_) => TransportError::ObjectNotFound(object_id),
            other => other.into(),
        })
    }

    async fn is_transferable(
        &self,
        object_id: ObjectId,
    ) -> std::result::Result<bool, TransportError> {
        let object = self.get_object(object_id).await?;
        let type_tag = match &object.kind {
            // Coins always carry `store`.
            ObjectKind::Coin { .. } => return Ok(true),
            ObjectKind::Other { type_tag } => type_tag.clone(),
        };

        let (package, module, name) = struct_tag_parts(&type_tag).ok_or_else(|| {
            TransportError::SerializationError(format!("Unparseable object type {type_tag}"))
        })?;

        let normalized: RpcNormalizedStruct = self
            .call(
                "sui_getNormalizedMoveStruct",
                json!([package.to_hex(), module, name]),
            )
            .await?;

        Ok(normalized
            .abilities
            .abilities
            .iter()
            .any(|ability| ability == "Store"))
    }

    async fn reference_gas_price(&self) -> std::result::Result<u64, TransportError> {
        let price: Value = self.call("suix_getReferenceGasPrice", json!([])).await?;
        let price = match &price {
            Value::String(s) => parse_u64("reference gas price", s)?,
            Value::Number(n) => n.as_u64().ok_or_else(|| {
                TransportError::SerializationError(format!("Invalid gas price {n}"))
            })?,
            other => {
                return Err(TransportError::SerializationError(format!(
                    "Invalid gas price {other}"
                )));
            }
        };
        Ok(price)
    }

    async fn submit_transaction(
        &self,
        transaction: SignedTransaction,
    ) -> std::result::Result<ExecutedTransaction, TransportError> {
        let tx_bytes = transaction
            .data
            .to_bytes()
            .map_err(|e| TransportError::SerializationError(e.to_string()))?;
        let signatures: Vec<String> = transaction
            .signatures
            .iter()
            .map(|s| STANDARD.encode(s.as_bytes()))
            .collect();

        let response: RpcTransactionResponse = self
            .call(
                "sui_executeTransactionBlock",
                json!([
                    STANDARD.encode(&tx_bytes),
                    signatures,
                    { "showEffects": true },
                    "WaitForLocalExecution"
                ]),
            )
            .await?;

        let digest: TransactionDigest = response
            .digest
            .parse()
            .map_err(|e: ParseError| {
                TransportError::SerializationError(e.to_string())
            })?;

        let effects = response.effects.ok_or_else(|| {
            TransportError::SerializationError(format!("Transaction {digest} returned no effects"))
        })?;

        if effects.status.status != "success" {
            let reason = effects
                .status
                .error
                .unwrap_or_else(|| "unknown execution failure".to_string());
            return Err(SuiError::TransactionFailed(reason).into());
        }

        let created = effects
            .created
            .iter()
            .filter_map(|object| {
                let id = object.reference.object_id.parse().ok()?;
                let owner = owner_address(&object.owner)?;
                Some((id, owner))
            })
            .collect();

        tracing::info!(%digest, "Transaction executed");

        Ok(ExecutedTransaction {
            digest,
            gas_used: gas_used(&effects.gas_used)?,
            created,
        })
    }

    async fn get_transaction(
        &self,
        digest: TransactionDigest,
    ) -> std::result::Result<TransactionRecord, TransportError> {
        let response: RpcTransactionResponse = self
            .call(
                "sui_getTransactionBlock",
                json!([digest.to_string(), { "showRawInput": true }]),
            )
            .await?;

        let raw = response
            .raw_transaction
            .ok_or(TransportError::TransactionNotFound(digest))?;
        let bytes = STANDARD
            .decode(raw)
            .map_err(|e| TransportError::SerializationError(e.to_string()))?;
        let signed = SignedTransaction::from_envelope_bytes(&bytes)
            .map_err(|e| TransportError::SerializationError(e.to_string()))?;

        Ok(TransactionRecord {
            digest,
            sender: signed.data.sender(),
            data: signed.data,
        })
    }

    fn network(&self) -> &str {
        self.config.network.as_ref()
    }
}
