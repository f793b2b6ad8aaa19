use crate::address::{IntoAddress, NATIVE_CURRENCY, NATIVE_DECIMALS, NATIVE_NAME, NATIVE_SYMBOL};
use crate::blocking;
use crate::client::{Block, CallArg, ContractCaller, Signature};
use crate::contract::{ContractHandle, HandleContext, Mode};
use crate::error::{Error, Result};
use crate::memo::Memo;
use crate::probe::{
    call_and_decode, probe, probe_with_fallback, Value, BALANCE_OF, DECIMALS_SIGNATURES,
    NAME_BYTES32_SIGNATURES, NAME_SIGNATURES, SYMBOL_BYTES32_SIGNATURES, SYMBOL_SIGNATURES,
    TOTAL_SUPPLY,
};
use crate::utils::{scale_for, u256_to_f64};
use alloy::primitives::{Address, U256};
use log::debug;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

fn non_standard(method: &'static str, address: Address, network: &str) -> Error {
    Error::NonStandardErc20 {
        method,
        address,
        network: network.to_string(),
    }
}

async fn fetch_text(
    client: Arc<dyn ContractCaller>,
    address: Address,
    network: String,
    method: &'static str,
    primary: &'static [Signature],
    fallback: &'static [Signature],
) -> Result<String> {
    debug!("Probing `{}` for {} on {}", method, address, network);
    probe_with_fallback(client.as_ref(), address, primary, fallback, None)
        .await?
        .and_then(Value::into_text)
        .ok_or_else(|| non_standard(method, address, &network))
}

async fn fetch_decimals(
    client: &dyn ContractCaller,
    address: Address,
    network: &str,
    block: Option<Block>,
) -> Result<u8> {
    let raw = probe(client, address, DECIMALS_SIGNATURES, block)
        .await?
        .and_then(Value::into_uint)
        .ok_or_else(|| non_standard("decimals", address, network))?;
    if raw > U256::from(u8::MAX) {
        return Err(Error::Decode {
            signature: "decimals()".to_string(),
            reason: format!("{raw} does not fit in u8"),
        });
    }
    Ok(raw.to::<u8>())
}

fn checked_scale(address: Address, decimals: u8) -> Result<U256> {
    scale_for(decimals).ok_or(Error::InvalidDecimals { address, decimals })
}

/// Handle for one ERC20-like token.
///
/// Symbol, name, decimals and scale are resolved at most once per handle.
/// Block-parameterized reads always go to the chain.
pub struct Erc20 {
    base: ContractHandle,
    symbol: Memo<String>,
    name: Memo<String>,
    decimals: Memo<u8>,
    scale: Memo<U256>,
}

impl Erc20 {
    pub fn new(address: Address, mode: Mode, ctx: Arc<HandleContext>) -> Self {
        Self {
            base: ContractHandle::new(address, mode, ctx),
            symbol: Memo::new(),
            name: Memo::new(),
            decimals: Memo::new(),
            scale: Memo::new(),
        }
    }

    fn is_native(&self) -> bool {
        self.address() == NATIVE_CURRENCY
    }

    fn client(&self) -> Arc<dyn ContractCaller> {
        self.context().client.clone()
    }

    fn network(&self) -> &str {
        &self.context().network
    }

    /// Symbol already in cache, if any. Never touches the chain.
    pub fn cached_symbol(&self) -> Option<String> {
        if self.is_native() {
            return Some(NATIVE_SYMBOL.to_string());
        }
        self.symbol.peek()
    }

    pub async fn symbol(&self) -> Result<String> {
        if self.is_native() {
            return Ok(NATIVE_SYMBOL.to_string());
        }
        let fetch = fetch_text(
            self.client(),
            self.address(),
            self.network().to_string(),
            "symbol",
            SYMBOL_SIGNATURES,
            SYMBOL_BYTES32_SIGNATURES,
        );
        self.symbol.get_or_try_init(|| fetch).await
    }

    pub fn symbol_blocking(&self) -> Result<String> {
        blocking::block_on(self.symbol())
    }

    pub async fn name(&self) -> Result<String> {
        if self.is_native() {
            return Ok(NATIVE_NAME.to_string());
        }
        let fetch = fetch_text(
            self.client(),
            self.address(),
            self.network().to_string(),
            "name",
            NAME_SIGNATURES,
            NAME_BYTES32_SIGNATURES,
        );
        self.name.get_or_try_init(|| fetch).await
    }

    pub fn name_blocking(&self) -> Result<String> {
        blocking::block_on(self.name())
    }

    pub async fn decimals(&self) -> Result<u8> {
        if self.is_native() {
            return Ok(NATIVE_DECIMALS);
        }
        let client = self.client();
        let address = self.address();
        let network = self.network().to_string();
        self.decimals
            .get_or_try_init(|| async move {
                fetch_decimals(client.as_ref(), address, &network, None).await
            })
            .await
    }

    pub fn decimals_blocking(&self) -> Result<u8> {
        blocking::block_on(self.decimals())
    }

    /// Decimals as reported at `block`. Not cached.
    pub async fn decimals_at(&self, block: Option<Block>) -> Result<u8> {
        if self.is_native() {
            return Ok(NATIVE_DECIMALS);
        }
        fetch_decimals(self.client().as_ref(), self.address(), self.network(), block).await
    }

    pub fn decimals_at_blocking(&self, block: Option<Block>) -> Result<u8> {
        blocking::block_on(self.decimals_at(block))
    }

    /// `10^decimals`.
    pub async fn scale(&self) -> Result<U256> {
        if let Some(scale) = self.scale.peek() {
            return Ok(scale);
        }
        let decimals = self.decimals().await?;
        let address = self.address();
        self.scale
            .get_or_try_init(|| async move { checked_scale(address, decimals) })
            .await
    }

    pub fn scale_blocking(&self) -> Result<U256> {
        blocking::block_on(self.scale())
    }

    /// `10^decimals` at `block`. Not cached.
    pub async fn scale_at(&self, block: Option<Block>) -> Result<U256> {
        let decimals = self.decimals_at(block).await?;
        checked_scale(self.address(), decimals)
    }

    pub fn scale_at_blocking(&self, block: Option<Block>) -> Result<U256> {
        blocking::block_on(self.scale_at(block))
    }

    async fn read_uint(
        &self,
        signature: &Signature,
        args: &[CallArg],
        block: Option<Block>,
    ) -> Result<U256> {
        call_and_decode(self.client().as_ref(), self.address(), signature, args, block)
            .await?
            .into_uint()
            .ok_or_else(|| Error::Decode {
                signature: signature.text().to_string(),
                reason: "expected an unsigned integer".to_string(),
            })
    }

    pub async fn total_supply(&self, block: Option<Block>) -> Result<U256> {
        self.read_uint(&TOTAL_SUPPLY, &[], block).await
    }

    pub fn total_supply_blocking(&self, block: Option<Block>) -> Result<U256> {
        blocking::block_on(self.total_supply(block))
    }

    pub async fn total_supply_readable(&self, block: Option<Block>) -> Result<f64> {
        let (supply, scale) = tokio::try_join!(self.total_supply(block), self.scale())?;
        Ok(u256_to_f64(supply) / u256_to_f64(scale))
    }

    pub fn total_supply_readable_blocking(&self, block: Option<Block>) -> Result<f64> {
        blocking::block_on(self.total_supply_readable(block))
    }

    pub async fn balance_of(&self, holder: impl IntoAddress, block: Option<Block>) -> Result<U256> {
        let holder = holder.into_address()?;
        self.read_uint(&BALANCE_OF, &[CallArg::Address(holder)], block)
            .await
    }

    pub fn balance_of_blocking(&self, holder: impl IntoAddress, block: Option<Block>) -> Result<U256> {
        blocking::block_on(self.balance_of(holder, block))
    }

    pub async fn balance_of_readable(
        &self,
        holder: impl IntoAddress,
        block: Option<Block>,
    ) -> Result<f64> {
        let (balance, scale) = tokio::try_join!(self.balance_of(holder, block), self.scale())?;
        Ok(u256_to_f64(balance) / u256_to_f64(scale))
    }

    pub fn balance_of_readable_blocking(
        &self,
        holder: impl IntoAddress,
        block: Option<Block>,
    ) -> Result<f64> {
        blocking::block_on(self.balance_of_readable(holder, block))
    }

    /// Price from the resolver's price source, `None` when no source has one.
    pub async fn try_price(&self, block: Option<Block>) -> Result<Option<f64>> {
        self.context().prices.price(self.address(), block).await
    }

    pub fn try_price_blocking(&self, block: Option<Block>) -> Result<Option<f64>> {
        blocking::block_on(self.try_price(block))
    }

    pub async fn price(&self, block: Option<Block>) -> Result<f64> {
        self.try_price(block).await?.ok_or(Error::PriceUnavailable {
            address: self.address(),
            block,
        })
    }

    pub fn price_blocking(&self, block: Option<Block>) -> Result<f64> {
        blocking::block_on(self.price(block))
    }
}

impl Deref for Erc20 {
    type Target = ContractHandle;

    fn deref(&self) -> &ContractHandle {
        &self.base
    }
}

impl PartialEq for Erc20 {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for Erc20 {}

impl PartialEq<Address> for Erc20 {
    fn eq(&self, other: &Address) -> bool {
        self.address() == *other
    }
}

impl Hash for Erc20 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl fmt::Display for Erc20 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cached_symbol() {
            Some(symbol) => write!(f, "{} ({})", symbol, self.address()),
            None => write!(f, "{}", self.address()),
        }
    }
}

impl fmt::Debug for Erc20 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Erc20")
            .field("address", &self.address())
            .field("mode", &self.mode())
            .field("symbol", &self.symbol)
            .field("decimals", &self.decimals)
            .finish()
    }
}
