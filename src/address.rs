use crate::error::{Error, Result};
use alloy::primitives::{address, Address};
use std::str::FromStr;

/// Pseudo-address used across the ecosystem for the chain's native currency.
pub const NATIVE_CURRENCY: Address = address!("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

pub const NATIVE_SYMBOL: &str = "ETH";
pub const NATIVE_NAME: &str = "Ethereum";
pub const NATIVE_DECIMALS: u8 = 18;

/// Parse a raw hex address in any casing into its canonical form.
pub fn normalize(raw: &str) -> Result<Address> {
    let trimmed = raw.trim();
    Address::from_str(trimmed).map_err(|_| Error::InvalidAddress(trimmed.to_string()))
}

/// Anything that can be turned into a normalized [`Address`].
pub trait IntoAddress {
    fn into_address(self) -> Result<Address>;
}

impl IntoAddress for Address {
    fn into_address(self) -> Result<Address> {
        Ok(self)
    }
}

impl IntoAddress for &Address {
    fn into_address(self) -> Result<Address> {
        Ok(*self)
    }
}

impl IntoAddress for &str {
    fn into_address(self) -> Result<Address> {
        normalize(self)
    }
}

impl IntoAddress for String {
    fn into_address(self) -> Result<Address> {
        normalize(&self)
    }
}

impl IntoAddress for &String {
    fn into_address(self) -> Result<Address> {
        normalize(self)
    }
}
