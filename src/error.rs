use alloy::primitives::Address;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure reported by a [`ContractCaller`](crate::ContractCaller).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("execution reverted: {0}")]
    Revert(String),

    #[error("no contract deployed at {0}")]
    NotFound(Address),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("cannot encode call: {0}")]
    InvalidSignature(String),
}

impl CallError {
    /// Transport failures say nothing about the contract and may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, CallError::Transport(_))
    }
}

/// Unified error type for token resolution.
///
/// `Clone` because one in-flight resolution is broadcast to every waiter.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("contract {0} is not verified")]
    ContractNotVerified(Address),

    #[error("contract {0} does not exist")]
    ContractNonexistent(Address),

    #[error(
        "unable to fetch `{method}` for {address} on {network}. If the contract is verified, \
         check whether it has a strangely named `{method}` method and add it to the candidate list"
    )]
    NonStandardErc20 {
        method: &'static str,
        address: Address,
        network: String,
    },

    #[error(transparent)]
    Call(#[from] CallError),

    #[error("failed to decode `{signature}` return data: {reason}")]
    Decode { signature: String, reason: String },

    #[error("token {address} reports {decimals} decimals, scale does not fit in 256 bits")]
    InvalidDecimals { address: Address, decimals: u8 },

    #[error("no price available for {address} at block {block:?}")]
    PriceUnavailable { address: Address, block: Option<u64> },

    #[error("blocking accessor called from inside a current-thread runtime, await the async form instead")]
    BlockingInAsyncContext,

    #[error("failed to start blocking runtime: {0}")]
    Runtime(String),
}
