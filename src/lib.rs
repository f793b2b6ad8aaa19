pub mod address;
pub mod balance;
pub mod blocking;
pub mod client;
pub mod config;
pub mod contract;
pub mod erc20;
pub mod error;
pub mod memo;
pub mod mock;
pub mod oracle;
pub mod price;
pub mod probe;
pub mod registry;
pub mod resolver;
pub mod utils;

#[cfg(feature = "rpc")]
pub mod contracts_rpc;
#[cfg(feature = "rpc")]
pub use contracts_rpc::{connect, create_fallback_provider, AlloyContractCaller};

// Errors
pub use error::{CallError, Error, Result};

// Addresses
pub use address::{normalize, IntoAddress, NATIVE_CURRENCY};

// Call client
pub use client::{Block, CallArg, ContractCaller, Decode, Signature, VerifiedContract};
pub use mock::MockCaller;

// Handles
pub use balance::BalanceQuantity;
pub use contract::{ContractHandle, ContractStatus, HandleContext, Mode};
pub use erc20::Erc20;
pub use registry::HandleRegistry;

// Prices
pub use oracle::{OracleFeedMap, OraclePriceCache};
pub use price::{NoPriceSource, PriceSource};

pub use config::ResolverConfig;
pub use resolver::TokenResolver;
