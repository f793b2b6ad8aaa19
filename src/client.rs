use crate::error::CallError;
use alloy::dyn_abi::{DynSolValue, JsonAbiExt};
use alloy::json_abi::Function;
use alloy::primitives::{Address, Bytes, Selector, U256};
use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;

/// Historical block height. `None` wherever a block is optional means latest.
pub type Block = u64;

/// How the return data of a call is turned into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decode {
    /// ABI-encoded dynamic `string`
    Utf8String,
    /// `bytes32` holding right-padded ASCII
    Bytes32String,
    /// `uint256` (smaller uints share the same word layout)
    Uint,
    /// `int256`
    Int,
}

/// A remote call signature in `name(args)(returns)` form plus its decode strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    text: Cow<'static, str>,
    decode: Decode,
}

impl Signature {
    pub const fn new(text: &'static str, decode: Decode) -> Self {
        Self {
            text: Cow::Borrowed(text),
            decode,
        }
    }

    pub fn owned(text: String, decode: Decode) -> Self {
        Self {
            text: Cow::Owned(text),
            decode,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn decode(&self) -> Decode {
        self.decode
    }

    /// The parsed ABI item. Tuple-typed arguments are supported.
    pub fn abi(&self) -> Result<Function, CallError> {
        Function::parse(&self.text)
            .map_err(|e| CallError::InvalidSignature(format!("{}: {}", self.text, e)))
    }

    pub fn selector(&self) -> Result<Selector, CallError> {
        Ok(self.abi()?.selector())
    }

    /// Calldata: selector followed by the ABI-encoded arguments.
    pub fn encode_call(&self, args: &[CallArg]) -> Result<Bytes, CallError> {
        let values: Vec<DynSolValue> = args.iter().copied().map(DynSolValue::from).collect();
        self.abi()?
            .abi_encode_input(&values)
            .map(Bytes::from)
            .map_err(|e| CallError::InvalidSignature(format!("{}: {}", self.text, e)))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Static call arguments. Only what the token accessors need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallArg {
    Address(Address),
    Uint(U256),
}

impl From<CallArg> for DynSolValue {
    fn from(arg: CallArg) -> Self {
        match arg {
            CallArg::Address(address) => DynSolValue::Address(address),
            CallArg::Uint(value) => DynSolValue::Uint(value, 256),
        }
    }
}

/// Descriptor of a contract whose source is verified on an explorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedContract {
    pub address: Address,
    /// Contract name from the verified build
    pub name: String,
    /// Function signatures exposed by the verified ABI
    pub functions: Vec<String>,
}

/// Remote contract access used by every handle.
///
/// ABI transport, chain selection and explorer lookups live behind this trait.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    /// Execute a read-only call and return the raw return data.
    async fn call(
        &self,
        address: Address,
        signature: &Signature,
        args: &[CallArg],
        block: Option<Block>,
    ) -> Result<Bytes, CallError>;

    /// Whether any code is deployed at `address`.
    async fn exists(&self, address: Address) -> Result<bool, CallError>;

    /// Verified source descriptor, if the backing explorer knows one.
    async fn verified_contract(
        &self,
        _address: Address,
    ) -> Result<Option<VerifiedContract>, CallError> {
        Ok(None)
    }
}
