//! Coin selection for funding transactions.
//!
//! The planner is synchronous and works on an in-memory snapshot taken by
//! [`crate::inventory::CoinInventory`]. It never queries the chain.
//!
//! # Selection Rule
//!
//! 1. A coin whose balance equals the requested amount is used as is.
//! 2. Otherwise coins are sorted by balance, largest first (fetch order breaks
//!    ties), and accumulated until the running sum covers the request.
//!
//! The first selected coin is the *primary*: the others are merged into it and
//! the requested amount is split off it, so the sender keeps at most one
//! change coin per coin type.

use std::cmp::Reverse;

use client_blockchain_core::{CoinObject, CoinType, ObjectId};

use crate::config::DustPolicy;
use crate::error::{Result, ZkSendError};

// ============================================================================
// Planned Transfers
// ============================================================================

/// Coins selected to produce exactly `exact_amount` of one coin type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTransfer {
    pub coin_type: CoinType,
    pub exact_amount: u64,
    /// Selected coins, primary first.
    pub source_coins: Vec<CoinObject>,
    /// Sum of `source_coins` balances.
    pub selected_total: u64,
}

impl PlannedTransfer {
    pub fn primary(&self) -> Option<&CoinObject> {
        self.source_coins.first()
    }

    /// Coins merged into the primary.
    pub fn merged(&self) -> &[CoinObject] {
        self.source_coins.get(1..).unwrap_or_default()
    }

    /// Amount left in the primary after the split.
    pub fn change(&self) -> u64 {
        self.selected_total - self.exact_amount
    }

    pub fn needs_merge(&self) -> bool {
        self.source_coins.len() > 1
    }

    pub fn needs_split(&self) -> bool {
        self.change() > 0
    }

    pub fn source_ids(&self) -> Vec<ObjectId> {
        self.source_coins.iter().map(|c| c.object_id).collect()
    }
}

/// Select coins of `coin_type` from `available` covering `requested`.
///
/// Coins of other types in `available` are ignored.
///
/// # Errors
///
/// Returns `InsufficientFunds` carrying the available total when the coins
/// cannot cover the request.
pub fn plan(
    requested: u64,
    coin_type: &CoinType,
    available: &[CoinObject],
) -> Result<PlannedTransfer> {
    let candidates: Vec<&CoinObject> = available
        .iter()
        .filter(|coin| &coin.coin_type == coin_type)
        .collect();
    let available_total = candidates
        .iter()
        .fold(0u64, |total, coin| total.saturating_add(coin.balance));

    if requested == 0 {
        return Ok(PlannedTransfer {
            coin_type: coin_type.clone(),
            exact_amount: 0,
            source_coins: Vec::new(),
            selected_total: 0,
        });
    }

    if let Some(exact) = candidates.iter().find(|coin| coin.balance == requested) {
        tracing::debug!(%coin_type, requested, coin = %exact.object_id, "Exact coin match");
        return Ok(PlannedTransfer {
            coin_type: coin_type.clone(),
            exact_amount: requested,
            source_coins: vec![(*exact).clone()],
            selected_total: requested,
        });
    }

    let mut sorted = candidates;
    sorted.sort_by_key(|coin| Reverse(coin.balance));

    let mut selected = Vec::new();
    let mut running: u128 = 0;
    for coin in sorted {
        if running >= u128::from(requested) {
            break;
        }
        running += u128::from(coin.balance);
        selected.push(coin.clone());
    }

    if running < u128::from(requested) {
        return Err(ZkSendError::InsufficientFunds {
            coin_type: coin_type.clone(),
            requested,
            available: available_total,
        });
    }

    let selected_total = u64::try_from(running).map_err(|_| ZkSendError::AmountOverflow {
        coin_type: coin_type.clone(),
    })?;

    tracing::debug!(
        %coin_type,
        requested,
        selected = selected.len(),
        selected_total,
        "Coins selected"
    );

    Ok(PlannedTransfer {
        coin_type: coin_type.clone(),
        exact_amount: requested,
        source_coins: selected,
        selected_total,
    })
}

// ============================================================================
// Gas
// ============================================================================

/// SUI selection for a funding transaction.
///
/// The selected coins become the gas payment. Claimable SUI and the claim gas
/// reservation are split off the merged gas coin; the funding budget is paid
/// from what remains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasPlan {
    /// Gas payment coins, gas coin first, dust last.
    pub payment: Vec<CoinObject>,
    /// Claimable SUI amount.
    pub claimable: u64,
    /// Gas reserved for the claim transaction.
    pub reserve: u64,
    /// Budget of the funding transaction itself.
    pub budget: u64,
}

impl GasPlan {
    pub fn gas_coin(&self) -> Option<&CoinObject> {
        self.payment.first()
    }

    pub fn payment_total(&self) -> u64 {
        self.payment
            .iter()
            .fold(0u64, |total, coin| total.saturating_add(coin.balance))
    }
}

/// Select SUI coins for `claimable` plus the gas reservation and budget.
///
/// # Errors
///
/// - `InsufficientFunds` when the coins cannot cover `claimable` alone
/// - `InsufficientGas` when they cover `claimable` but not the reservation on top
/// - `AmountOverflow` when the required total does not fit in u64
pub fn plan_gas(
    claimable: u64,
    reserve: u64,
    budget: u64,
    available: &[CoinObject],
    dust: DustPolicy,
) -> Result<GasPlan> {
    let sui = CoinType::sui();
    let overflow = || ZkSendError::AmountOverflow {
        coin_type: CoinType::sui(),
    };
    let required = claimable
        .checked_add(reserve)
        .and_then(|total| total.checked_add(budget))
        .ok_or_else(overflow)?;

    let planned = plan(required, &sui, available).map_err(|error| match error {
        ZkSendError::InsufficientFunds { available, .. } if available >= claimable => {
            ZkSendError::InsufficientGas {
                required,
                available,
            }
        }
        ZkSendError::InsufficientFunds { available, .. } => ZkSendError::InsufficientFunds {
            coin_type: CoinType::sui(),
            requested: claimable,
            available,
        },
        other => other,
    })?;

    let mut payment = planned.source_coins;
    if let DustPolicy::SmashIntoGas { below } = dust {
        let dust_coins: Vec<CoinObject> = available
            .iter()
            .filter(|coin| coin.coin_type == sui && coin.balance < below)
            .filter(|coin| payment.iter().all(|p| p.object_id != coin.object_id))
            .cloned()
            .collect();
        if !dust_coins.is_empty() {
            tracing::debug!(count = dust_coins.len(), below, "Smashing dust coins into gas");
        }
        payment.extend(dust_coins);
    }

    Ok(GasPlan {
        payment,
        claimable,
        reserve,
        budget,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_blockchain_core::Digest;
    use proptest::prelude::*;

    fn coin(seed: u8, coin_type: &CoinType, balance: u64) -> CoinObject {
        CoinObject {
            object_id: ObjectId::new([seed; 32]),
            coin_type: coin_type.clone(),
            balance,
            version: 1,
            digest: Digest::default(),
            previous_transaction: Digest::default(),
        }
    }

    fn coin_x() -> CoinType {
        "0xabc::x::X".parse().unwrap()
    }

    #[test]
    fn test_greedy_selection_with_split() {
        let x = coin_x();
        let coins = [coin(1, &x, 30), coin(2, &x, 100), coin(3, &x, 50)];
        let planned = plan(120, &x, &coins).unwrap();

        assert_eq!(planned.source_ids(), vec![coins[1].object_id, coins[2].object_id]);
        assert_eq!(planned.selected_total, 150);
        assert_eq!(planned.change(), 30);
        assert!(planned.needs_merge());
        assert!(planned.needs_split());
    }

    #[test]
    fn test_exact_coin_needs_no_operations() {
        let x = coin_x();
        let coins = [coin(1, &x, 100), coin(2, &x, 40)];
        let planned = plan(40, &x, &coins).unwrap();

        assert_eq!(planned.source_ids(), vec![coins[1].object_id]);
        assert!(!planned.needs_merge());
        assert!(!planned.needs_split());
    }

    #[test]
    fn test_ties_keep_fetch_order() {
        let x = coin_x();
        let coins = [coin(1, &x, 10), coin(2, &x, 10), coin(3, &x, 10)];
        let planned = plan(15, &x, &coins).unwrap();
        assert_eq!(planned.source_ids(), vec![coins[0].object_id, coins[1].object_id]);
    }

    #[test]
    fn test_insufficient_funds_reports_available() {
        let x = coin_x();
        let y: CoinType = "0xdef::y::Y".parse().unwrap();
        let coins = [coin(1, &x, 10)];

        let error = plan(1, &y, &coins).unwrap_err();
        assert!(matches!(
            error,
            ZkSendError::InsufficientFunds { requested: 1, available: 0, .. }
        ));

        let error = plan(25, &x, &coins).unwrap_err();
        assert_eq!(error.shortfall(), Some(15));
    }

    #[test]
    fn test_gas_reservation_is_a_hard_requirement() {
        let sui = CoinType::sui();
        let coins = [coin(1, &sui, 1_000), coin(2, &sui, 500)];

        let plan = plan_gas(1_000, 300, 100, &coins, DustPolicy::Keep).unwrap();
        assert_eq!(plan.payment.len(), 2);

        let error = plan_gas(1_400, 300, 100, &coins, DustPolicy::Keep).unwrap_err();
        assert!(matches!(
            error,
            ZkSendError::InsufficientGas { required: 1_800, available: 1_500 }
        ));

        let error = plan_gas(2_000, 300, 100, &coins, DustPolicy::Keep).unwrap_err();
        assert!(matches!(
            error,
            ZkSendError::InsufficientFunds { requested: 2_000, available: 1_500, .. }
        ));
    }

    #[test]
    fn test_dust_is_smashed_into_gas() {
        let sui = CoinType::sui();
        let coins = [coin(1, &sui, 10_000), coin(2, &sui, 3), coin(3, &sui, 700)];

        let keep = plan_gas(0, 1_000, 1_000, &coins, DustPolicy::Keep).unwrap();
        assert_eq!(keep.payment.len(), 1);

        let smash = plan_gas(0, 1_000, 1_000, &coins, DustPolicy::SmashIntoGas { below: 100 }).unwrap();
        assert_eq!(smash.payment.len(), 2);
        assert_eq!(smash.payment[1].balance, 3);
        assert_eq!(smash.payment_total(), 10_003);
    }

    proptest! {
        #[test]
        fn prop_selection_is_exact_and_minimal(
            balances in proptest::collection::vec(1u64..1_000_000, 1..24),
            fraction in 0.0f64..1.0,
        ) {
            let x = coin_x();
            let coins: Vec<CoinObject> = balances
                .iter()
                .enumerate()
                .map(|(i, b)| coin(i as u8, &x, *b))
                .collect();
            let total: u64 = balances.iter().sum();
            let requested = ((total as f64 * fraction) as u64).clamp(1, total);

            let planned = plan(requested, &x, &coins).unwrap();
            prop_assert_eq!(planned.selected_total - planned.change(), requested);
            prop_assert_eq!(
                planned.source_coins.iter().map(|c| c.balance).sum::<u64>(),
                planned.selected_total
            );

            // No smaller number of coins can cover the request.
            let mut sorted = balances.clone();
            sorted.sort_unstable_by(|a, b| b.cmp(a));
            let fewer = planned.source_coins.len() - 1;
            prop_assert!(sorted.iter().take(fewer).sum::<u64>() < requested);
        }

        #[test]
        fn prop_shortfall_is_exact(
            balances in proptest::collection::vec(1u64..1_000, 0..16),
            extra in 1u64..1_000,
        ) {
            let x = coin_x();
            let coins: Vec<CoinObject> = balances
                .iter()
                .enumerate()
                .map(|(i, b)| coin(i as u8, &x, *b))
                .collect();
            let total: u64 = balances.iter().sum();

            let error = plan(total + extra, &x, &coins).unwrap_err();
            prop_assert_eq!(error.shortfall(), Some(extra));
        }
    }
}
