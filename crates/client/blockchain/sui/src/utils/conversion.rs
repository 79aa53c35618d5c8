//! Conversions from JSON-RPC wire types to the chain model.
//!
//! ## Conversion Categories
//!
//! 1. **Numbers**: decimal strings → `u64`
//! 2. **Identifiers**: hex ids and base58 digests → typed identifiers
//! 3. **Objects**: RPC coins/objects → `CoinObject` / `OwnedObject`

use std::str::FromStr;

use client_blockchain_core::{
    CoinObject, CoinType, Digest, ObjectId, ObjectKind, ObjectRef, OwnedObject, SuiAddress,
};
use serde_json::Value;

use crate::core::error::SuiError;
use crate::core::types::{RpcCoin, RpcGasCostSummary, RpcObjectData};

// ============================================================================
// Scalars
// ============================================================================

pub fn parse_u64(field: &str, value: &str) -> Result<u64, SuiError> {
    value
        .parse::<u64>()
        .map_err(|e| SuiError::Serialization(format!("Invalid {field} {value:?}: {e}")))
}

/// Versions arrive either as JSON numbers or as decimal strings.
pub fn version_from_value(value: &Value) -> Result<u64, SuiError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| SuiError::Serialization(format!("Invalid version {n}"))),
        Value::String(s) => parse_u64("version", s),
        other => Err(SuiError::Serialization(format!("Invalid version {other}"))),
    }
}

fn parse<T>(field: &str, value: &str) -> Result<T, SuiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| SuiError::Serialization(format!("Invalid {field} {value:?}: {e}")))
}

// ============================================================================
// Objects
// ============================================================================

/// Address of an `{"AddressOwner": "0x…"}` owner; `None` for shared,
/// immutable or object-owned objects.
pub fn owner_address(owner: &Value) -> Option<SuiAddress> {
    owner
        .get("AddressOwner")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
}

pub fn coin_from_rpc(coin: RpcCoin) -> Result<CoinObject, SuiError> {
    Ok(CoinObject {
        object_id: parse::<ObjectId>("object id", &coin.coin_object_id)?,
        coin_type: parse::<CoinType>("coin type", &coin.coin_type)?,
        balance: parse_u64("balance", &coin.balance)?,
        version: parse_u64("version", &coin.version)?,
        digest: parse::<Digest>("digest", &coin.digest)?,
        previous_transaction: parse::<Digest>("previous transaction", &coin.previous_transaction)?,
    })
}

pub fn object_from_rpc(data: RpcObjectData) -> Result<OwnedObject, SuiError> {
    let object_id = parse::<ObjectId>("object id", &data.object_id)?;
    let object_type = data
        .object_type
        .ok_or_else(|| SuiError::Serialization(format!("Object {object_id} has no type")))?;

    let kind = match CoinType::from_coin_object_type(&object_type) {
        Some(coin_type) => {
            let balance = data
                .content
                .as_ref()
                .and_then(|c| c.fields.get("balance"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    SuiError::Serialization(format!("Coin {object_id} has no balance field"))
                })?;
            ObjectKind::Coin {
                coin_type,
                balance: parse_u64("balance", balance)?,
            }
        }
        None => ObjectKind::Other {
            type_tag: object_type,
        },
    };

    let owner = data
        .owner
        .as_ref()
        .and_then(owner_address)
        .ok_or_else(|| SuiError::Serialization(format!("Object {object_id} is not address-owned")))?;

    let previous_transaction = match data.previous_transaction {
        Some(digest) => parse::<Digest>("previous transaction", &digest)?,
        None => Digest::default(),
    };

    Ok(OwnedObject {
        object_ref: ObjectRef::new(
            object_id,
            parse_u64("version", &data.version)?,
            parse::<Digest>("digest", &data.digest)?,
        ),
        kind,
        owner,
        previous_transaction,
    })
}

/// Split a struct tag `0xpkg::module::Name<…>` into package, module and name.
pub fn struct_tag_parts(type_tag: &str) -> Option<(ObjectId, &str, &str)> {
    let base = type_tag.split('<').next()?;
    let mut parts = base.splitn(3, "::");
    let package = parts.next()?.parse().ok()?;
    let module = parts.next()?;
    let name = parts.next()?;
    if module.is_empty() || name.is_empty() {
        return None;
    }
    Some((package, module, name))
}

/// Net gas charged: computation plus storage minus rebate.
pub fn gas_used(summary: &RpcGasCostSummary) -> Result<u64, SuiError> {
    let computation = parse_u64("computation cost", &summary.computation_cost)?;
    let storage = parse_u64("storage cost", &summary.storage_cost)?;
    let rebate = parse_u64("storage rebate", &summary.storage_rebate)?;
    Ok(computation.saturating_add(storage).saturating_sub(rebate))
}
