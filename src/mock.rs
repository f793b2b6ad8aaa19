use crate::client::{Block, CallArg, ContractCaller, Signature, VerifiedContract};
use crate::error::CallError;
use alloy::primitives::{Address, Bytes, B256, I256, U256};
use alloy::sol_types::SolValue;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// A recorded call made against a [`MockCaller`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub address: Address,
    pub signature: String,
    pub args: Vec<CallArg>,
    pub block: Option<Block>,
}

/// Scripted, call-counting [`ContractCaller`] for tests and offline use.
///
/// Responses are queued per `(address, signature)`; the last queued response
/// repeats once the queue is drained. Unscripted calls revert.
#[derive(Debug, Default)]
pub struct MockCaller {
    responses: Mutex<HashMap<(Address, String), Vec<Result<Bytes, CallError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
    deployed: Mutex<HashSet<Address>>,
    verified: Mutex<HashMap<Address, VerifiedContract>>,
    exists_calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockCaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `delay` first, so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond(self, address: Address, signature: &str, response: Result<Bytes, CallError>) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((address, signature.to_string()))
            .or_default()
            .push(response);
        self
    }

    pub fn respond_string(self, address: Address, signature: &str, value: &str) -> Self {
        self.respond(address, signature, Ok(value.to_string().abi_encode().into()))
    }

    pub fn respond_bytes32(self, address: Address, signature: &str, value: &str) -> Self {
        self.respond(address, signature, Ok(B256::right_padding_from(value.as_bytes()).abi_encode().into()))
    }

    pub fn respond_uint(self, address: Address, signature: &str, value: U256) -> Self {
        self.respond(address, signature, Ok(value.abi_encode().into()))
    }

    pub fn respond_int(self, address: Address, signature: &str, value: I256) -> Self {
        self.respond(address, signature, Ok(value.abi_encode().into()))
    }

    pub fn respond_error(self, address: Address, signature: &str, error: CallError) -> Self {
        self.respond(address, signature, Err(error))
    }

    pub fn deploy(self, address: Address) -> Self {
        self.deployed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address);
        self
    }

    pub fn verify(self, contract: VerifiedContract) -> Self {
        self.deployed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(contract.address);
        self.verified
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(contract.address, contract);
        self
    }

    /// Total number of `call` invocations.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of `call` invocations for one signature on one address.
    pub fn calls_to(&self, address: Address, signature: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| c.address == address && c.signature == signature)
            .count()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn exists_count(&self) -> usize {
        self.exists_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ContractCaller for MockCaller {
    async fn call(
        &self,
        address: Address,
        signature: &Signature,
        args: &[CallArg],
        block: Option<Block>,
    ) -> Result<Bytes, CallError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                address,
                signature: signature.text().to_string(),
                args: args.to_vec(),
                block,
            });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        match responses.get_mut(&(address, signature.text().to_string())) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) if queue.len() == 1 => queue[0].clone(),
            _ => Err(CallError::Revert(format!("no mock response for {signature}"))),
        }
    }

    async fn exists(&self, address: Address) -> Result<bool, CallError> {
        self.exists_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .deployed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&address))
    }

    async fn verified_contract(
        &self,
        address: Address,
    ) -> Result<Option<VerifiedContract>, CallError> {
        Ok(self
            .verified
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&address)
            .cloned())
    }
}
