//! Funding instructions and their lowering into a programmable transaction.
//!
//! Instructions are ordered deterministically:
//!
//! ```text
//! merges          coin type order, gas coin last
//! splits          same order
//! coin transfers  sorted by (coin type, amount)
//! object transfers  insertion order
//! gas transfer    always last
//! ```
//!
//! The final gas transfer is what the claim side looks for to tell the gas
//! reservation apart from claimable SUI (see [`gas_reserve_transfer`]).

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;

use client_blockchain_core::{
    Argument, CallArg, Command, CoinType, ObjectId, ObjectRef, ProgrammableTransaction,
    ProgrammableTransactionBuilder, SuiAddress, TransactionData,
};

use crate::error::{Result, ZkSendError};
use crate::planner::{GasPlan, PlannedTransfer};

// ============================================================================
// Instructions
// ============================================================================

/// Where a transferred coin comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoinSource {
    /// The whole coin object is transferred.
    Whole(ObjectId),
    /// A coin split off this object in an earlier `Split`.
    Split(ObjectId),
}

/// One step of a funding transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Merge `merged` into `primary`. For the gas coin type this is done by
    /// the chain when it smashes the gas payment.
    Merge {
        coin_type: CoinType,
        primary: ObjectId,
        merged: Vec<ObjectId>,
    },
    Split {
        coin_type: CoinType,
        source: ObjectId,
        amounts: Vec<u64>,
    },
    TransferCoin {
        coin_type: CoinType,
        amount: u64,
        source: CoinSource,
    },
    TransferObject {
        object_id: ObjectId,
    },
    /// Claim gas reservation, split off the gas coin.
    TransferGas {
        amount: u64,
    },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merge {
                coin_type,
                primary,
                merged,
            } => write!(f, "merge {} {coin_type} coin(s) into {primary}", merged.len()),
            Self::Split {
                coin_type,
                source,
                amounts,
            } => write!(f, "split {amounts:?} {coin_type} from {source}"),
            Self::TransferCoin {
                coin_type,
                amount,
                source: CoinSource::Whole(id),
            } => write!(f, "transfer {amount} {coin_type} (coin {id})"),
            Self::TransferCoin {
                coin_type, amount, ..
            } => write!(f, "transfer {amount} {coin_type}"),
            Self::TransferObject { object_id } => write!(f, "transfer object {object_id}"),
            Self::TransferGas { amount } => write!(f, "transfer {amount} MIST claim gas"),
        }
    }
}

/// Coins selected for one non-gas coin type and the claims carved from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinPlan {
    pub planned: PlannedTransfer,
    /// Individual claim amounts; they sum to `planned.exact_amount`.
    pub amounts: Vec<u64>,
}

// ============================================================================
// Funding Plan
// ============================================================================

/// Ordered funding instructions plus everything needed to lower them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingPlan {
    pub sender: SuiAddress,
    /// Ephemeral link address.
    pub recipient: SuiAddress,
    pub instructions: Vec<Instruction>,
    pub gas_payment: Vec<ObjectRef>,
    pub gas_price: u64,
    pub gas_budget: u64,
    pub gas_reserve: u64,
    /// References of every non-gas object input.
    inputs: HashMap<ObjectId, ObjectRef>,
}

impl FundingPlan {
    /// Order the operations of all coin plans, object transfers and the gas plan.
    ///
    /// # Arguments
    ///
    /// * `coin_plans` - Non-gas coin plans
    /// * `gas` - SUI plan (payment, reservation, budget)
    /// * `sui_amounts` - Claimable SUI amounts
    /// * `objects` - Claimable objects in insertion order
    pub fn assemble(
        sender: SuiAddress,
        recipient: SuiAddress,
        coin_plans: &[CoinPlan],
        gas: &GasPlan,
        sui_amounts: &[u64],
        objects: &[ObjectRef],
        gas_price: u64,
    ) -> Result<Self> {
        let mut merges = Vec::new();
        let mut splits = Vec::new();
        let mut transfers: Vec<(CoinType, u64, CoinSource)> = Vec::new();
        let mut inputs = HashMap::new();

        let mut ordered: Vec<&CoinPlan> = coin_plans.iter().collect();
        ordered.sort_by(|a, b| a.planned.coin_type.cmp(&b.planned.coin_type));

        for plan in ordered {
            let planned = &plan.planned;
            let Some(primary) = planned.primary() else {
                continue;
            };
            for coin in &planned.source_coins {
                inputs.insert(coin.object_id, coin.object_ref());
            }

            if planned.needs_merge() {
                merges.push(Instruction::Merge {
                    coin_type: planned.coin_type.clone(),
                    primary: primary.object_id,
                    merged: planned.merged().iter().map(|c| c.object_id).collect(),
                });
            }

            let mut amounts = plan.amounts.clone();
            amounts.sort_unstable();

            // Without change the primary itself carries the largest claim.
            if !planned.needs_split() {
                if let Some(last) = amounts.pop() {
                    transfers.push((
                        planned.coin_type.clone(),
                        last,
                        CoinSource::Whole(primary.object_id),
                    ));
                }
            }

            if !amounts.is_empty() {
                for amount in &amounts {
                    transfers.push((
                        planned.coin_type.clone(),
                        *amount,
                        CoinSource::Split(primary.object_id),
                    ));
                }
                splits.push(Instruction::Split {
                    coin_type: planned.coin_type.clone(),
                    source: primary.object_id,
                    amounts,
                });
            }
        }

        let sui = CoinType::sui();
        let gas_coin = gas.gas_coin().ok_or(ZkSendError::InsufficientGas {
            required: gas.budget,
            available: 0,
        })?;

        if gas.payment.len() > 1 {
            merges.push(Instruction::Merge {
                coin_type: sui.clone(),
                primary: gas_coin.object_id,
                merged: gas.payment[1..].iter().map(|c| c.object_id).collect(),
            });
        }

        let mut gas_amounts = sui_amounts.to_vec();
        gas_amounts.sort_unstable();
        for amount in &gas_amounts {
            transfers.push((sui.clone(), *amount, CoinSource::Split(gas_coin.object_id)));
        }
        if gas.reserve > 0 {
            gas_amounts.push(gas.reserve);
        }
        if !gas_amounts.is_empty() {
            splits.push(Instruction::Split {
                coin_type: sui.clone(),
                source: gas_coin.object_id,
                amounts: gas_amounts,
            });
        }

        transfers.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));

        let mut instructions = merges;
        instructions.extend(splits);
        instructions.extend(
            transfers
                .into_iter()
                .map(|(coin_type, amount, source)| Instruction::TransferCoin {
                    coin_type,
                    amount,
                    source,
                }),
        );
        for object_ref in objects {
            inputs.insert(object_ref.object_id, *object_ref);
            instructions.push(Instruction::TransferObject {
                object_id: object_ref.object_id,
            });
        }
        if gas.reserve > 0 {
            instructions.push(Instruction::TransferGas {
                amount: gas.reserve,
            });
        }

        Ok(Self {
            sender,
            recipient,
            instructions,
            gas_payment: gas.payment.iter().map(|c| c.object_ref()).collect(),
            gas_price,
            gas_budget: gas.budget,
            gas_reserve: gas.reserve,
            inputs,
        })
    }

    fn gas_coin(&self) -> Option<ObjectId> {
        self.gas_payment.first().map(|r| r.object_id)
    }

    fn argument(
        &self,
        builder: &mut ProgrammableTransactionBuilder,
        object_id: ObjectId,
    ) -> Result<Argument> {
        if Some(object_id) == self.gas_coin() {
            return Ok(Argument::GasCoin);
        }
        let object_ref = self.inputs.get(&object_id).ok_or_else(|| {
            ZkSendError::Transaction(format!("no object reference for {object_id}"))
        })?;
        Ok(builder.object(*object_ref)?)
    }

    /// Lower the instructions into commands, in order.
    pub fn to_programmable(&self) -> Result<ProgrammableTransaction> {
        let mut builder = ProgrammableTransactionBuilder::new();
        let mut split_outputs: SplitOutputs = Vec::new();
        for instruction in &self.instructions {
            match instruction {
                Instruction::Merge { coin_type, .. } if coin_type.is_gas() => {}
                Instruction::Merge {
                    primary, merged, ..
                } => {
                    let primary = self.argument(&mut builder, *primary)?;
                    let merged = merged
                        .iter()
                        .map(|id| self.argument(&mut builder, *id))
                        .collect::<Result<Vec<_>>>()?;
                    builder.merge_coins(primary, merged)?;
                }
                Instruction::Split {
                    source, amounts, ..
                } => {
                    let coin = self.argument(&mut builder, *source)?;
                    let results = builder.split_coins(coin, amounts)?;
                    split_outputs.push((*source, amounts.iter().copied().zip(results).collect()));
                }
                Instruction::TransferCoin {
                    source: CoinSource::Whole(id),
                    ..
                } => {
                    let coin = self.argument(&mut builder, *id)?;
                    builder.transfer_objects(vec![coin], self.recipient)?;
                }
                Instruction::TransferCoin {
                    source: CoinSource::Split(id),
                    amount,
                    ..
                } => {
                    let coin = take_split(&mut split_outputs, *id, *amount)?;
                    builder.transfer_objects(vec![coin], self.recipient)?;
                }
                Instruction::TransferObject { object_id } => {
                    let object = self.argument(&mut builder, *object_id)?;
                    builder.transfer_objects(vec![object], self.recipient)?;
                }
                Instruction::TransferGas { amount } => {
                    let gas_coin = self.gas_coin().ok_or_else(|| {
                        ZkSendError::Transaction("funding plan has no gas payment".into())
                    })?;
                    let coin = take_split(&mut split_outputs, gas_coin, *amount)?;
                    builder.transfer_objects(vec![coin], self.recipient)?;
                }
            }
        }

        Ok(builder.finish())
    }

    pub fn to_transaction_data(&self) -> Result<TransactionData> {
        Ok(TransactionData::new_programmable(
            self.sender,
            self.gas_payment.clone(),
            self.to_programmable()?,
            self.gas_budget,
            self.gas_price,
        ))
    }
}

type SplitOutputs = Vec<(ObjectId, Vec<(u64, Argument)>)>;

/// Take an unused coin of `amount` split off `source`.
fn take_split(outputs: &mut SplitOutputs, source: ObjectId, amount: u64) -> Result<Argument> {
    outputs
        .iter_mut()
        .filter(|(id, _)| *id == source)
        .find_map(|(_, coins)| {
            let position = coins.iter().position(|(a, _)| *a == amount)?;
            Some(coins.remove(position).1)
        })
        .ok_or_else(|| {
            ZkSendError::Transaction(format!("no split of {amount} from {source} left to transfer"))
        })
}

// ============================================================================
// Claim Side
// ============================================================================

/// Amount and recipient of the final gas-reserve transfer of a funding transaction.
///
/// Matches a last command of the form `TransferObjects([split of GasCoin], recipient)`.
pub fn gas_reserve_transfer(pt: &ProgrammableTransaction) -> Option<(u64, SuiAddress)> {
    let Command::TransferObjects(objects, recipient) = pt.commands.last()? else {
        return None;
    };
    let [Argument::NestedResult(split, index)] = objects.as_slice() else {
        return None;
    };
    let Command::SplitCoins(Argument::GasCoin, amounts) = pt.commands.get(usize::from(*split))?
    else {
        return None;
    };

    let amount = pure_value::<u64>(pt, *amounts.get(usize::from(*index))?)?;
    let recipient = pure_value::<SuiAddress>(pt, *recipient)?;
    Some((amount, recipient))
}

fn pure_value<T: DeserializeOwned>(pt: &ProgrammableTransaction, argument: Argument) -> Option<T> {
    let Argument::Input(index) = argument else {
        return None;
    };
    let CallArg::Pure(bytes) = pt.inputs.get(usize::from(index))? else {
        return None;
    };
    bcs::from_bytes(bytes).ok()
}
