//! JSON-RPC wire types.
//!
//! Only the fields this workspace reads are modelled. Numeric values the node
//! sends as strings (balances, versions, gas costs) stay strings here and are
//! parsed in [`crate::utils::conversion`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Envelope
// ============================================================================

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// Cursor-paginated result.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub next_cursor: Option<Value>,
    pub has_next_page: bool,
}

// ============================================================================
// Coins and Objects
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcCoin {
    pub coin_type: String,
    pub coin_object_id: String,
    pub version: String,
    pub digest: String,
    pub balance: String,
    pub previous_transaction: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcObjectResponse {
    pub data: Option<RpcObjectData>,
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcObjectData {
    pub object_id: String,
    pub version: String,
    pub digest: String,
    #[serde(rename = "type")]
    pub object_type: Option<String>,
    pub owner: Option<Value>,
    pub previous_transaction: Option<String>,
    pub content: Option<RpcObjectContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcObjectContent {
    pub data_type: String,
    #[serde(default)]
    pub fields: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcStructAbilities {
    pub abilities: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcNormalizedStruct {
    pub abilities: RpcStructAbilities,
}

// ============================================================================
// Transactions
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransactionResponse {
    pub digest: String,
    pub effects: Option<RpcEffects>,
    pub raw_transaction: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcEffects {
    pub status: RpcExecutionStatus,
    pub gas_used: RpcGasCostSummary,
    #[serde(default)]
    pub created: Vec<RpcOwnedObjectRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcExecutionStatus {
    pub status: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcGasCostSummary {
    pub computation_cost: String,
    pub storage_cost: String,
    pub storage_rebate: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcOwnedObjectRef {
    pub owner: Value,
    pub reference: RpcObjectRef,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcObjectRef {
    pub object_id: String,
    pub version: Value,
    pub digest: String,
}
