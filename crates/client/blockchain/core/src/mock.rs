//! Mock chain client for testing.
//!
//! Keeps owned objects in memory and executes the subset of programmable
//! transactions this workspace emits. Execution is all-or-nothing: commands
//! run against a copy of the object table which only replaces the real one
//! once every command succeeded.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::crypto::{blake2b256, verify_transaction_signature};
use crate::traits::{ChainClient, ExecutedTransaction, TransactionRecord, TransportError};
use crate::transaction::{Argument, CallArg, Command, ObjectArg, SignedTransaction};
use crate::types::{
    CoinObject, CoinType, Digest, ObjectId, ObjectKind, ObjectRef, OwnedObject, SuiAddress,
    TransactionDigest,
};

const DEFAULT_GAS_PRICE: u64 = 1_000;
const DEFAULT_GAS_CHARGE: u64 = 1_000_000;

/// Digest recorded as the previous transaction of objects seeded by tests.
pub const GENESIS_DIGEST: TransactionDigest = Digest::new([0u8; 32]);

#[derive(Debug, Clone)]
struct MockObject {
    object: OwnedObject,
    transferable: bool,
    /// Insertion sequence, used to keep query results in a stable order.
    seq: u64,
}

#[derive(Debug, Default)]
struct MockState {
    objects: HashMap<ObjectId, MockObject>,
    transactions: HashMap<TransactionDigest, TransactionRecord>,
    next_seq: u64,
    gas_price: u64,
    gas_charge: u64,
}

impl MockState {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn sorted_objects(&self) -> Vec<&MockObject> {
        let mut objects: Vec<&MockObject> = self.objects.values().collect();
        objects.sort_by_key(|o| o.seq);
        objects
    }
}

/// Mock chain client for testing without network.
#[derive(Debug, Clone)]
pub struct MockChainClient {
    state: Arc<Mutex<MockState>>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                gas_price: DEFAULT_GAS_PRICE,
                gas_charge: DEFAULT_GAS_CHARGE,
                ..MockState::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_gas_price(&self, price: u64) {
        self.state().gas_price = price;
    }

    /// Flat amount charged to the gas coin by every executed transaction
    /// (capped at the transaction's budget).
    pub fn set_gas_charge(&self, charge: u64) {
        self.state().gas_charge = charge;
    }

    /// Seed a coin owned by `owner`.
    pub fn add_coin(&self, owner: SuiAddress, coin_type: CoinType, balance: u64) -> CoinObject {
        let mut state = self.state();
        let seq = state.next_seq();
        let object_id = ObjectId::new(blake2b256(&[b"mock-object", &seq.to_le_bytes()]));
        let coin = CoinObject {
            object_id,
            coin_type,
            balance,
            version: 1,
            digest: object_digest(&object_id, 1),
            previous_transaction: GENESIS_DIGEST,
        };
        let object = OwnedObject {
            object_ref: coin.object_ref(),
            kind: ObjectKind::Coin {
                coin_type: coin.coin_type.clone(),
                balance,
            },
            owner,
            previous_transaction: GENESIS_DIGEST,
        };
        state.objects.insert(
            object_id,
            MockObject {
                object,
                transferable: true,
                seq,
            },
        );
        coin
    }

    /// Seed a non-coin object owned by `owner`.
    pub fn add_object(&self, owner: SuiAddress, type_tag: &str, transferable: bool) -> OwnedObject {
        let mut state = self.state();
        let seq = state.next_seq();
        let object_id = ObjectId::new(blake2b256(&[b"mock-object", &seq.to_le_bytes()]));
        let object = OwnedObject {
            object_ref: ObjectRef::new(object_id, 1, object_digest(&object_id, 1)),
            kind: ObjectKind::Other {
                type_tag: type_tag.to_string(),
            },
            owner,
            previous_transaction: GENESIS_DIGEST,
        };
        state.objects.insert(
            object_id,
            MockObject {
                object: object.clone(),
                transferable,
                seq,
            },
        );
        object
    }

    /// Simulate a concurrent writer touching the object.
    pub fn bump_version(&self, object_id: ObjectId) {
        if let Some(entry) = self.state().objects.get_mut(&object_id) {
            let version = entry.object.object_ref.version + 1;
            entry.object.object_ref.version = version;
            entry.object.object_ref.digest = object_digest(&object_id, version);
        }
    }

    /// Total balance of `coin_type` held by `owner`.
    pub fn balance_of(&self, owner: SuiAddress, coin_type: &CoinType) -> u64 {
        self.state()
            .objects
            .values()
            .filter(|o| o.object.owner == owner && o.object.coin_type() == Some(coin_type))
            .filter_map(|o| o.object.as_coin())
            .map(|c| c.balance)
            .sum()
    }

    /// Objects owned by `owner`, in creation order.
    pub fn objects_of(&self, owner: SuiAddress) -> Vec<OwnedObject> {
        self.state()
            .sorted_objects()
            .into_iter()
            .filter(|o| o.object.owner == owner)
            .map(|o| o.object.clone())
            .collect()
    }

    /// Coins of `coin_type` owned by `owner`, in creation order.
    pub fn coins_of(&self, owner: SuiAddress, coin_type: &CoinType) -> Vec<CoinObject> {
        self.objects_of(owner)
            .into_iter()
            .filter(|o| o.coin_type() == Some(coin_type))
            .filter_map(|o| o.as_coin())
            .collect()
    }

    pub fn transaction_count(&self) -> usize {
        self.state().transactions.len()
    }
}

impl Default for MockChainClient {
    fn default() -> Self {
        Self::new()
    }
}

fn object_digest(object_id: &ObjectId, version: u64) -> Digest {
    Digest::new(blake2b256(&[object_id.as_bytes(), &version.to_le_bytes()]))
}

fn failed(reason: impl Into<String>) -> TransportError {
    TransportError::TransactionFailed(reason.into())
}

// ============================================================================
// Execution
// ============================================================================

#[derive(Debug, Clone)]
enum Value {
    Object(ObjectId),
    Pure(Vec<u8>),
}

/// Working state of one transaction.
struct Execution {
    objects: HashMap<ObjectId, MockObject>,
    sender: SuiAddress,
    gas_coin: ObjectId,
    inputs: Vec<Value>,
    results: Vec<Vec<Value>>,
    digest: TransactionDigest,
    created: Vec<ObjectId>,
    /// Created coins that have not been transferred or merged yet.
    dangling: HashSet<ObjectId>,
    touched: HashSet<ObjectId>,
    next_seq: u64,
}

impl Execution {
    fn resolve(&self, argument: Argument) -> Result<Value, TransportError> {
        match argument {
            Argument::GasCoin => Ok(Value::Object(self.gas_coin)),
            Argument::Input(index) => self
                .inputs
                .get(usize::from(index))
                .cloned()
                .ok_or_else(|| failed(format!("input {index} out of bounds"))),
            Argument::Result(index) => match self.results.get(usize::from(index)) {
                Some(values) if values.len() == 1 => Ok(values[0].clone()),
                Some(values) => Err(failed(format!(
                    "result {index} has {} values, expected exactly one",
                    values.len()
                ))),
                None => Err(failed(format!("result {index} out of bounds"))),
            },
            Argument::NestedResult(index, nested) => self
                .results
                .get(usize::from(index))
                .and_then(|values| values.get(usize::from(nested)))
                .cloned()
                .ok_or_else(|| failed(format!("nested result ({index}, {nested}) out of bounds"))),
        }
    }

    fn resolve_object(&self, argument: Argument) -> Result<ObjectId, TransportError> {
        match self.resolve(argument)? {
            Value::Object(id) => Ok(id),
            Value::Pure(_) => Err(failed(format!("{argument:?} is not an object"))),
        }
    }

    fn resolve_pure<T: serde::de::DeserializeOwned>(
        &self,
        argument: Argument,
    ) -> Result<T, TransportError> {
        match self.resolve(argument)? {
            Value::Pure(bytes) => bcs::from_bytes(&bytes)
                .map_err(|e| failed(format!("invalid pure argument {argument:?}: {e}"))),
            Value::Object(_) => Err(failed(format!("{argument:?} is not a pure value"))),
        }
    }

    fn coin_mut(&mut self, object_id: ObjectId) -> Result<(&CoinType, &mut u64), TransportError> {
        let entry = self
            .objects
            .get_mut(&object_id)
            .ok_or_else(|| failed(format!("object {object_id} no longer exists")))?;
        match &mut entry.object.kind {
            ObjectKind::Coin { coin_type, balance } => Ok((coin_type, balance)),
            ObjectKind::Other { type_tag } => {
                Err(failed(format!("object {object_id} of type {type_tag} is not a coin")))
            }
        }
    }

    fn run(&mut self, command: &Command) -> Result<Vec<Value>, TransportError> {
        match command {
            Command::MergeCoins(target, sources) => {
                let target = self.resolve_object(*target)?;
                let (target_type, _) = self.coin_mut(target)?;
                let target_type = target_type.clone();

                let mut total = 0u64;
                for source in sources {
                    let source = self.resolve_object(*source)?;
                    if source == target || source == self.gas_coin {
                        return Err(failed(format!("cannot merge {source} into {target}")));
                    }
                    let (source_type, balance) = self.coin_mut(source)?;
                    if *source_type != target_type {
                        return Err(failed(format!(
                            "cannot merge {source_type} into {target_type}"
                        )));
                    }
                    total = total
                        .checked_add(*balance)
                        .ok_or_else(|| failed("merge overflow"))?;
                    self.objects.remove(&source);
                    self.dangling.remove(&source);
                    self.touched.remove(&source);
                }

                let (_, balance) = self.coin_mut(target)?;
                *balance = balance
                    .checked_add(total)
                    .ok_or_else(|| failed("merge overflow"))?;
                self.touched.insert(target);
                Ok(vec![])
            }
            Command::SplitCoins(coin, amounts) => {
                let coin = self.resolve_object(*coin)?;
                let amounts = amounts
                    .iter()
                    .map(|a| self.resolve_pure::<u64>(*a))
                    .collect::<Result<Vec<_>, _>>()?;

                let (coin_type, balance) = self.coin_mut(coin)?;
                let coin_type = coin_type.clone();
                let requested: u64 = amounts
                    .iter()
                    .try_fold(0u64, |acc, a| acc.checked_add(*a))
                    .ok_or_else(|| failed("split overflow"))?;
                if requested > *balance {
                    return Err(failed(format!(
                        "insufficient coin balance: {} < {}",
                        balance, requested
                    )));
                }
                *balance -= requested;
                self.touched.insert(coin);

                let mut values = Vec::with_capacity(amounts.len());
                for amount in amounts {
                    let id = self.create_coin(coin_type.clone(), amount);
                    values.push(Value::Object(id));
                }
                Ok(values)
            }
            Command::TransferObjects(objects, recipient) => {
                let recipient: SuiAddress = self.resolve_pure(*recipient)?;
                for object in objects {
                    let object_id = self.resolve_object(*object)?;
                    let entry = self
                        .objects
                        .get_mut(&object_id)
                        .ok_or_else(|| failed(format!("object {object_id} no longer exists")))?;
                    if !entry.transferable {
                        return Err(failed(format!("object {object_id} has no public transfer")));
                    }
                    entry.object.owner = recipient;
                    self.dangling.remove(&object_id);
                    self.touched.insert(object_id);
                }
                Ok(vec![])
            }
            Command::MoveCall(call) => Err(failed(format!(
                "move calls are not supported by the mock chain ({}::{})",
                call.module, call.function
            ))),
        }
    }

    fn create_coin(&mut self, coin_type: CoinType, balance: u64) -> ObjectId {
        self.next_seq += 1;
        let object_id = ObjectId::new(blake2b256(&[
            self.digest.as_bytes(),
            &(self.created.len() as u64).to_le_bytes(),
        ]));
        self.objects.insert(
            object_id,
            MockObject {
                object: OwnedObject {
                    object_ref: ObjectRef::new(object_id, 0, Digest::default()),
                    kind: ObjectKind::Coin { coin_type, balance },
                    owner: self.sender,
                    previous_transaction: self.digest,
                },
                transferable: true,
                seq: self.next_seq,
            },
        );
        self.created.push(object_id);
        self.dangling.insert(object_id);
        self.touched.insert(object_id);
        object_id
    }
}

fn check_owned(
    objects: &HashMap<ObjectId, MockObject>,
    object_ref: &ObjectRef,
    sender: SuiAddress,
) -> Result<(), TransportError> {
    let entry = objects.get(&object_ref.object_id).ok_or_else(|| {
        TransportError::VersionConflict(format!(
            "object {} is no longer available",
            object_ref.object_id
        ))
    })?;

    let current = &entry.object.object_ref;
    if current.version != object_ref.version || current.digest != object_ref.digest {
        return Err(TransportError::VersionConflict(format!(
            "object {} is at version {}, transaction references version {}",
            object_ref.object_id, current.version, object_ref.version
        )));
    }

    if entry.object.owner != sender {
        return Err(failed(format!(
            "object {} is not owned by {}",
            object_ref.object_id, sender
        )));
    }

    Ok(())
}

fn execute(
    state: &mut MockState,
    transaction: &SignedTransaction,
) -> Result<ExecutedTransaction, TransportError> {
    let data = &transaction.data;
    let sender = data.sender();

    let signature = transaction
        .signatures
        .first()
        .ok_or_else(|| failed("transaction is not signed"))?;
    verify_transaction_signature(data, signature).map_err(|e| failed(e.to_string()))?;

    let digest = data
        .digest()
        .map_err(|e| TransportError::SerializationError(e.to_string()))?;
    if state.transactions.contains_key(&digest) {
        return Err(failed(format!("transaction {digest} already executed")));
    }

    // Gas payment: every coin must be a current SUI coin of the sender.
    let payment = &data.gas_data.payment;
    let (gas_ref, smashed) = payment
        .split_first()
        .ok_or_else(|| failed("transaction has no gas payment"))?;

    let mut objects = state.objects.clone();
    let mut gas_balance = 0u64;
    for object_ref in payment {
        check_owned(&objects, object_ref, sender)?;
        let coin = objects
            .get(&object_ref.object_id)
            .filter(|o| o.object.is_gas_coin())
            .and_then(|o| o.object.as_coin())
            .ok_or_else(|| failed(format!("gas object {} is not a SUI coin", object_ref.object_id)))?;
        gas_balance = gas_balance
            .checked_add(coin.balance)
            .ok_or_else(|| failed("gas overflow"))?;
    }
    if gas_balance < data.gas_data.budget {
        return Err(failed(format!(
            "gas balance {} is below budget {}",
            gas_balance, data.gas_data.budget
        )));
    }

    let mut touched: HashSet<ObjectId> = HashSet::new();
    for object_ref in smashed {
        objects.remove(&object_ref.object_id);
    }
    if let Some(ObjectKind::Coin { balance, .. }) =
        objects.get_mut(&gas_ref.object_id).map(|o| &mut o.object.kind)
    {
        *balance = gas_balance;
    }
    touched.insert(gas_ref.object_id);

    // Inputs.
    let pt = data.programmable();
    let mut inputs = Vec::with_capacity(pt.inputs.len());
    for input in &pt.inputs {
        match input {
            CallArg::Pure(bytes) => inputs.push(Value::Pure(bytes.clone())),
            CallArg::Object(ObjectArg::ImmOrOwnedObject(object_ref)) => {
                if payment.iter().any(|p| p.object_id == object_ref.object_id) {
                    return Err(failed(format!(
                        "gas object {} used as an input",
                        object_ref.object_id
                    )));
                }
                check_owned(&objects, object_ref, sender)?;
                touched.insert(object_ref.object_id);
                inputs.push(Value::Object(object_ref.object_id));
            }
        }
    }

    let mut execution = Execution {
        objects,
        sender,
        gas_coin: gas_ref.object_id,
        inputs,
        results: Vec::with_capacity(pt.commands.len()),
        digest,
        created: Vec::new(),
        dangling: HashSet::new(),
        touched,
        next_seq: state.next_seq,
    };

    for command in &pt.commands {
        let values = execution.run(command)?;
        execution.results.push(values);
    }

    if let Some(id) = execution.dangling.iter().next() {
        return Err(failed(format!("created coin {id} was neither transferred nor merged")));
    }

    // Charge gas after execution, wherever the gas coin ended up.
    let charge = state.gas_charge.min(data.gas_data.budget);
    if let Some(ObjectKind::Coin { balance, .. }) = execution
        .objects
        .get_mut(&execution.gas_coin)
        .map(|o| &mut o.object.kind)
    {
        *balance = balance.saturating_sub(charge);
    }

    // Commit with a fresh lamport version for every touched object.
    let lamport = execution
        .touched
        .iter()
        .filter_map(|id| state.objects.get(id))
        .map(|o| o.object.object_ref.version)
        .max()
        .unwrap_or(0)
        + 1;

    let mut created = Vec::with_capacity(execution.created.len());
    for id in &execution.touched {
        if let Some(entry) = execution.objects.get_mut(id) {
            entry.object.object_ref.version = lamport;
            entry.object.object_ref.digest = object_digest(id, lamport);
            entry.object.previous_transaction = digest;
        }
    }
    for id in &execution.created {
        if let Some(entry) = execution.objects.get(id) {
            created.push((*id, entry.object.owner));
        }
    }

    state.objects = execution.objects;
    state.next_seq = execution.next_seq;
    state.transactions.insert(
        digest,
        TransactionRecord {
            digest,
            sender,
            data: data.clone(),
        },
    );

    tracing::debug!(%digest, %sender, created = created.len(), "Mock transaction executed");

    Ok(ExecutedTransaction {
        digest,
        gas_used: charge,
        created,
    })
}

// ============================================================================
// ChainClient
// ============================================================================

#[async_trait]
impl ChainClient for MockChainClient {
    async fn get_coins(
        &self,
        owner: SuiAddress,
        coin_type: &CoinType,
    ) -> Result<Vec<CoinObject>, TransportError> {
        Ok(self.coins_of(owner, coin_type))
    }

    async fn get_owned_objects(&self, owner: SuiAddress) -> Result<Vec<OwnedObject>, TransportError> {
        Ok(self.objects_of(owner))
    }

    async fn get_object(&self, object_id: ObjectId) -> Result<OwnedObject, TransportError> {
        self.state()
            .objects
            .get(&object_id)
            .map(|o| o.object.clone())
            .ok_or(TransportError::ObjectNotFound(object_id))
    }

    async fn is_transferable(&self, object_id: ObjectId) -> Result<bool, TransportError> {
        self.state()
            .objects
            .get(&object_id)
            .map(|o| o.transferable)
            .ok_or(TransportError::ObjectNotFound(object_id))
    }

    async fn reference_gas_price(&self) -> Result<u64, TransportError> {
        Ok(self.state().gas_price)
    }

    async fn submit_transaction(
        &self,
        transaction: SignedTransaction,
    ) -> Result<ExecutedTransaction, TransportError> {
        execute(&mut self.state(), &transaction)
    }

    async fn get_transaction(
        &self,
        digest: TransactionDigest,
    ) -> Result<TransactionRecord, TransportError> {
        self.state()
            .transactions
            .get(&digest)
            .cloned()
            .ok_or(TransportError::TransactionNotFound(digest))
    }

    fn network(&self) -> &str {
        "localnet"
    }
}
