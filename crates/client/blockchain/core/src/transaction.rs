//! Programmable transaction model.
//!
//! Mirrors the chain's BCS layout for the commands this workspace emits
//! (coin merges, coin splits and object transfers), so that transaction bytes
//! can be signed locally and submitted through any [`crate::ChainClient`].
//!
//! # Layout
//!
//! ```text
//! TransactionData::V1
//!   ├── kind: ProgrammableTransaction { inputs, commands }
//!   ├── sender
//!   ├── gas_data { payment, owner, price, budget }
//!   └── expiration
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::crypto::blake2b256;
use crate::types::{Digest, ObjectId, ObjectRef, SuiAddress, TransactionDigest};

/// Intent prefix for user transactions (scope, version, app id).
pub const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

/// Domain separator hashed in front of transaction bytes to form the digest.
const TRANSACTION_DIGEST_SALT: &[u8] = b"TransactionData::";

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("BCS encoding failed: {0}")]
    Encoding(String),

    #[error("BCS decoding failed: {0}")]
    Decoding(String),

    #[error("Too many {0} in one transaction (limit {limit})", limit = u16::MAX)]
    TooMany(&'static str),
}

// ============================================================================
// Arguments and Commands
// ============================================================================

/// Reference to a value available to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Argument {
    /// The merged gas payment coin.
    GasCoin,
    /// Transaction input by index.
    Input(u16),
    /// Single result of a previous command.
    Result(u16),
    /// One element of a previous command's result vector.
    NestedResult(u16, u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectArg {
    ImmOrOwnedObject(ObjectRef),
}

/// Transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallArg {
    /// BCS-encoded pure value.
    Pure(Vec<u8>),
    Object(ObjectArg),
}

/// Move call. Not emitted by this workspace; present to keep command tags aligned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammableMoveCall {
    pub package: ObjectId,
    pub module: String,
    pub function: String,
    /// Canonical type tag strings.
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    MoveCall(Box<ProgrammableMoveCall>),
    TransferObjects(Vec<Argument>, Argument),
    SplitCoins(Argument, Vec<Argument>),
    MergeCoins(Argument, Vec<Argument>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammableTransaction {
    pub inputs: Vec<CallArg>,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    ProgrammableTransaction(ProgrammableTransaction),
}

// ============================================================================
// Transaction Data
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasData {
    pub payment: Vec<ObjectRef>,
    pub owner: SuiAddress,
    pub price: u64,
    pub budget: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionExpiration {
    None,
    Epoch(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum VersionedTransactionData {
    V1(TransactionData),
}

/// Unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionData {
    pub kind: TransactionKind,
    pub sender: SuiAddress,
    pub gas_data: GasData,
    pub expiration: TransactionExpiration,
}

impl TransactionData {
    pub fn new_programmable(
        sender: SuiAddress,
        gas_payment: Vec<ObjectRef>,
        pt: ProgrammableTransaction,
        gas_budget: u64,
        gas_price: u64,
    ) -> Self {
        Self {
            kind: TransactionKind::ProgrammableTransaction(pt),
            sender,
            gas_data: GasData {
                payment: gas_payment,
                owner: sender,
                price: gas_price,
                budget: gas_budget,
            },
            expiration: TransactionExpiration::None,
        }
    }

    pub fn sender(&self) -> SuiAddress {
        self.sender
    }

    pub fn programmable(&self) -> &ProgrammableTransaction {
        match &self.kind {
            TransactionKind::ProgrammableTransaction(pt) => pt,
        }
    }

    /// BCS bytes of the versioned transaction.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        bcs::to_bytes(&VersionedTransactionData::V1(self.clone()))
            .map_err(|e| TransactionError::Encoding(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let VersionedTransactionData::V1(data) =
            bcs::from_bytes(bytes).map_err(|e| TransactionError::Decoding(e.to_string()))?;
        Ok(data)
    }

    /// Message that signers sign: intent prefix followed by the transaction bytes.
    pub fn signing_message(&self) -> Result<Vec<u8>, TransactionError> {
        let mut message = TRANSACTION_INTENT.to_vec();
        message.extend(self.to_bytes()?);
        Ok(message)
    }

    pub fn digest(&self) -> Result<TransactionDigest, TransactionError> {
        let bytes = self.to_bytes()?;
        Ok(Digest::new(blake2b256(&[TRANSACTION_DIGEST_SALT, &bytes])))
    }
}

// ============================================================================
// Signed Transactions
// ============================================================================

/// Serialized signature: scheme flag, signature bytes, public key bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSignature(pub Vec<u8>);

impl UserSignature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Intent {
    scope: u8,
    version: u8,
    app_id: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct IntentMessage {
    intent: Intent,
    value: VersionedTransactionData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SenderSignedTransaction {
    intent_message: IntentMessage,
    tx_signatures: Vec<UserSignature>,
}

/// Transaction together with the signatures authorizing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub data: TransactionData,
    pub signatures: Vec<UserSignature>,
}

impl SignedTransaction {
    pub fn new(data: TransactionData, signatures: Vec<UserSignature>) -> Self {
        Self { data, signatures }
    }

    pub fn digest(&self) -> Result<TransactionDigest, TransactionError> {
        self.data.digest()
    }

    /// Encode as the chain's `SenderSignedData` envelope.
    pub fn to_envelope_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let envelope = vec![SenderSignedTransaction {
            intent_message: IntentMessage {
                intent: Intent {
                    scope: TRANSACTION_INTENT[0],
                    version: TRANSACTION_INTENT[1],
                    app_id: TRANSACTION_INTENT[2],
                },
                value: VersionedTransactionData::V1(self.data.clone()),
            },
            tx_signatures: self.signatures.clone(),
        }];
        bcs::to_bytes(&envelope).map_err(|e| TransactionError::Encoding(e.to_string()))
    }

    pub fn from_envelope_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut envelope: Vec<SenderSignedTransaction> =
            bcs::from_bytes(bytes).map_err(|e| TransactionError::Decoding(e.to_string()))?;

        if envelope.len() != 1 {
            return Err(TransactionError::Decoding(format!(
                "expected exactly one signed transaction, got {}",
                envelope.len()
            )));
        }

        let signed = envelope.remove(0);
        let VersionedTransactionData::V1(data) = signed.intent_message.value;
        Ok(Self::new(data, signed.tx_signatures))
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Incremental builder for [`ProgrammableTransaction`].
///
/// Object inputs are deduplicated by object id and pure inputs by their bytes,
/// so identical call sequences always produce identical transactions.
#[derive(Debug, Default)]
pub struct ProgrammableTransactionBuilder {
    inputs: Vec<CallArg>,
    commands: Vec<Command>,
    objects: HashMap<ObjectId, u16>,
    pures: HashMap<Vec<u8>, u16>,
}

impl ProgrammableTransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pure<T: Serialize>(&mut self, value: &T) -> Result<Argument, TransactionError> {
        let bytes = bcs::to_bytes(value).map_err(|e| TransactionError::Encoding(e.to_string()))?;
        if let Some(index) = self.pures.get(&bytes) {
            return Ok(Argument::Input(*index));
        }

        let index = self.next_input_index()?;
        self.pures.insert(bytes.clone(), index);
        self.inputs.push(CallArg::Pure(bytes));
        Ok(Argument::Input(index))
    }

    pub fn object(&mut self, object_ref: ObjectRef) -> Result<Argument, TransactionError> {
        if let Some(index) = self.objects.get(&object_ref.object_id) {
            return Ok(Argument::Input(*index));
        }

        let index = self.next_input_index()?;
        self.objects.insert(object_ref.object_id, index);
        self.inputs
            .push(CallArg::Object(ObjectArg::ImmOrOwnedObject(object_ref)));
        Ok(Argument::Input(index))
    }

    pub fn command(&mut self, command: Command) -> Result<Argument, TransactionError> {
        let index =
            u16::try_from(self.commands.len()).map_err(|_| TransactionError::TooMany("commands"))?;
        self.commands.push(command);
        Ok(Argument::Result(index))
    }

    pub fn merge_coins(
        &mut self,
        primary: Argument,
        coins: Vec<Argument>,
    ) -> Result<(), TransactionError> {
        self.command(Command::MergeCoins(primary, coins))?;
        Ok(())
    }

    /// Split `amounts` off `coin`, returning one argument per new coin.
    pub fn split_coins(
        &mut self,
        coin: Argument,
        amounts: &[u64],
    ) -> Result<Vec<Argument>, TransactionError> {
        let amount_args = amounts
            .iter()
            .map(|amount| self.pure(amount))
            .collect::<Result<Vec<_>, _>>()?;

        let index =
            u16::try_from(self.commands.len()).map_err(|_| TransactionError::TooMany("commands"))?;
        self.command(Command::SplitCoins(coin, amount_args))?;

        (0..amounts.len())
            .map(|i| {
                u16::try_from(i)
                    .map(|nested| Argument::NestedResult(index, nested))
                    .map_err(|_| TransactionError::TooMany("split amounts"))
            })
            .collect()
    }

    pub fn transfer_objects(
        &mut self,
        objects: Vec<Argument>,
        recipient: SuiAddress,
    ) -> Result<(), TransactionError> {
        let recipient = self.pure(&recipient)?;
        self.command(Command::TransferObjects(objects, recipient))?;
        Ok(())
    }

    pub fn finish(self) -> ProgrammableTransaction {
        ProgrammableTransaction {
            inputs: self.inputs,
            commands: self.commands,
        }
    }

    fn next_input_index(&self) -> Result<u16, TransactionError> {
        u16::try_from(self.inputs.len()).map_err(|_| TransactionError::TooMany("inputs"))
    }
}
