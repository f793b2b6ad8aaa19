use crate::client::{Block, CallArg, ContractCaller, Decode, Signature};
use crate::error::{CallError, Error, Result};
use alloy::hex;
use alloy::primitives::{Address, Bytes, I256, U256};
use alloy::sol_types::SolValue;
use log::{debug, trace};

pub const SYMBOL_SIGNATURES: &[Signature] = &[
    Signature::new("symbol()(string)", Decode::Utf8String),
    Signature::new("SYMBOL()(string)", Decode::Utf8String),
    Signature::new("getSymbol()(string)", Decode::Utf8String),
];

/// Tried after every string variant fails (MKR and other early tokens).
pub const SYMBOL_BYTES32_SIGNATURES: &[Signature] =
    &[Signature::new("symbol()(bytes32)", Decode::Bytes32String)];

pub const NAME_SIGNATURES: &[Signature] = &[
    Signature::new("name()(string)", Decode::Utf8String),
    Signature::new("NAME()(string)", Decode::Utf8String),
    Signature::new("getName()(string)", Decode::Utf8String),
];

pub const NAME_BYTES32_SIGNATURES: &[Signature] =
    &[Signature::new("name()(bytes32)", Decode::Bytes32String)];

pub const DECIMALS_SIGNATURES: &[Signature] = &[
    Signature::new("decimals()(uint256)", Decode::Uint),
    Signature::new("DECIMALS()(uint256)", Decode::Uint),
    Signature::new("getDecimals()(uint256)", Decode::Uint),
    Signature::new("_decimals()(uint256)", Decode::Uint),
];

pub const TOTAL_SUPPLY: Signature = Signature::new("totalSupply()(uint256)", Decode::Uint);
pub const BALANCE_OF: Signature = Signature::new("balanceOf(address)(uint256)", Decode::Uint);

/// A decoded return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Uint(U256),
    Int(I256),
}

impl Value {
    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_uint(self) -> Option<U256> {
        match self {
            Value::Uint(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_int(self) -> Option<I256> {
        match self {
            Value::Int(value) => Some(value),
            _ => None,
        }
    }
}

/// Decode return data according to the signature's strategy.
pub fn decode(signature: &Signature, data: &[u8]) -> Result<Value> {
    let fail = |reason: String| Error::Decode {
        signature: signature.text().to_string(),
        reason,
    };
    if data.is_empty() {
        return Err(fail("empty return data".to_string()));
    }
    match signature.decode() {
        Decode::Utf8String => String::abi_decode(data)
            .map(Value::Text)
            .map_err(|e| fail(e.to_string())),
        Decode::Bytes32String => {
            if data.len() < 32 {
                return Err(fail(format!("expected 32 bytes, got {}", data.len())));
            }
            bytes32_to_string(&data[..32]).map(Value::Text).map_err(fail)
        }
        Decode::Uint => U256::abi_decode(data)
            .map(Value::Uint)
            .map_err(|e| fail(e.to_string())),
        Decode::Int => I256::abi_decode(data)
            .map(Value::Int)
            .map_err(|e| fail(e.to_string())),
    }
}

/// Interpret a right-padded `bytes32` as text.
///
/// Trailing zero nibbles are stripped and the hex re-padded to an even length
/// before decoding, so a final character ending in `0` (e.g. `p` = 0x70) survives.
pub fn bytes32_to_string(word: &[u8]) -> std::result::Result<String, String> {
    let mut encoded = hex::encode(word);
    let trimmed = encoded.trim_end_matches('0').len();
    encoded.truncate(trimmed);
    if encoded.len() % 2 != 0 {
        encoded.push('0');
    }
    let raw = hex::decode(&encoded).map_err(|e| e.to_string())?;
    String::from_utf8(raw).map_err(|e| e.to_string())
}

/// Issue a single call and decode it.
pub async fn call_and_decode(
    client: &dyn ContractCaller,
    address: Address,
    signature: &Signature,
    args: &[CallArg],
    block: Option<Block>,
) -> Result<Value> {
    let data: Bytes = client.call(address, signature, args, block).await?;
    decode(signature, &data)
}

/// Try each candidate in order and return the first usable value.
///
/// Reverts, missing contracts, empty or undecodable data and empty strings
/// move on to the next candidate. Transport failures abort the probe.
pub async fn probe(
    client: &dyn ContractCaller,
    address: Address,
    candidates: &[Signature],
    block: Option<Block>,
) -> Result<Option<Value>> {
    for signature in candidates {
        trace!("Probing {} on {}", signature, address);
        match call_and_decode(client, address, signature, &[], block).await {
            Ok(Value::Text(text)) if text.is_empty() => {
                debug!("{} on {} returned an empty string", signature, address);
            }
            Ok(value) => return Ok(Some(value)),
            Err(Error::Call(e)) if e.is_transient() => return Err(Error::Call(e)),
            Err(Error::Call(CallError::Revert(reason))) => {
                debug!("{} on {} reverted: {}", signature, address, reason);
            }
            Err(e) => {
                debug!("{} on {} failed: {}", signature, address, e);
            }
        }
    }
    Ok(None)
}

/// Probe the primary candidates, then the fallback encodings.
pub async fn probe_with_fallback(
    client: &dyn ContractCaller,
    address: Address,
    primary: &[Signature],
    fallback: &[Signature],
    block: Option<Block>,
) -> Result<Option<Value>> {
    if let Some(value) = probe(client, address, primary, block).await? {
        return Ok(Some(value));
    }
    probe(client, address, fallback, block).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockCaller;
    use alloy::primitives::address;

    const TOKEN: Address = address!("0x9f8F72aA9304c8B593d555F12eF6589cC3A579A2");

    #[test]
    fn test_bytes32_to_string_trims_padding() {
        let mut word = [0u8; 32];
        word[..3].copy_from_slice(b"MKR");
        assert_eq!(bytes32_to_string(&word).unwrap(), "MKR");
    }

    #[test]
    fn test_bytes32_to_string_keeps_trailing_zero_nibble() {
        // 'p' is 0x70, its low nibble is stripped with the padding and restored
        let mut word = [0u8; 32];
        word[..4].copy_from_slice(b"swap");
        assert_eq!(bytes32_to_string(&word).unwrap(), "swap");
    }

    #[tokio::test]
    async fn test_probe_stops_at_first_success() {
        let client = MockCaller::new()
            .respond_error(TOKEN, "symbol()(string)", CallError::Revert("nope".into()))
            .respond_string(TOKEN, "SYMBOL()(string)", "MKR")
            .respond_string(TOKEN, "getSymbol()(string)", "WRONG");

        let value = probe(&client, TOKEN, SYMBOL_SIGNATURES, None).await.unwrap();
        assert_eq!(value, Some(Value::Text("MKR".to_string())));

        let attempted: Vec<String> = client.calls().into_iter().map(|c| c.signature).collect();
        assert_eq!(attempted, vec!["symbol()(string)", "SYMBOL()(string)"]);
    }

    #[tokio::test]
    async fn test_probe_skips_undecodable_and_empty() {
        let client = MockCaller::new()
            .respond(TOKEN, "symbol()(string)", Ok(Bytes::new()))
            .respond_string(TOKEN, "SYMBOL()(string)", "")
            .respond_string(TOKEN, "getSymbol()(string)", "OK");

        let value = probe(&client, TOKEN, SYMBOL_SIGNATURES, None).await.unwrap();
        assert_eq!(value, Some(Value::Text("OK".to_string())));
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_probe_falls_back_to_bytes32() {
        let client = MockCaller::new().respond_bytes32(TOKEN, "symbol()(bytes32)", "MKR");

        let value = probe_with_fallback(
            &client,
            TOKEN,
            SYMBOL_SIGNATURES,
            SYMBOL_BYTES32_SIGNATURES,
            None,
        )
        .await
        .unwrap();
        assert_eq!(value, Some(Value::Text("MKR".to_string())));
        assert_eq!(client.call_count(), 4);
    }

    #[tokio::test]
    async fn test_probe_exhausted_returns_none() {
        let client = MockCaller::new();
        let value = probe(&client, TOKEN, DECIMALS_SIGNATURES, Some(100)).await.unwrap();
        assert!(value.is_none());
        assert!(client.calls().iter().all(|c| c.block == Some(100)));
    }

    #[tokio::test]
    async fn test_probe_propagates_transport_errors() {
        let client = MockCaller::new()
            .respond_error(TOKEN, "symbol()(string)", CallError::Transport("timeout".into()))
            .respond_string(TOKEN, "SYMBOL()(string)", "MKR");

        let err = probe(&client, TOKEN, SYMBOL_SIGNATURES, None).await.unwrap_err();
        assert!(matches!(err, Error::Call(CallError::Transport(_))));
        assert_eq!(client.call_count(), 1);
    }
}
