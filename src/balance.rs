use crate::blocking;
use crate::client::Block;
use crate::contract::Mode;
use crate::erc20::Erc20;
use crate::error::Result;
use crate::utils::u256_to_f64;
use alloy::primitives::U256;
use std::fmt;
use std::sync::Arc;

/// A raw token balance at an optional block.
///
/// Built fresh per query and never registered; only the token behind it is shared.
#[derive(Clone)]
pub struct BalanceQuantity {
    balance: U256,
    token: Arc<Erc20>,
    block: Option<Block>,
    mode: Mode,
}

impl BalanceQuantity {
    pub fn new(balance: U256, token: Arc<Erc20>, block: Option<Block>, mode: Mode) -> Self {
        Self {
            balance,
            token,
            block,
            mode,
        }
    }

    pub fn balance(&self) -> U256 {
        self.balance
    }

    pub fn token(&self) -> &Arc<Erc20> {
        &self.token
    }

    pub fn block(&self) -> Option<Block> {
        self.block
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// `balance / 10^decimals`. Zero balances skip the decimals lookup.
    pub async fn readable(&self) -> Result<f64> {
        if self.balance.is_zero() {
            return Ok(0.0);
        }
        let scale = self.token.scale().await?;
        Ok(u256_to_f64(self.balance) / u256_to_f64(scale))
    }

    pub fn readable_blocking(&self) -> Result<f64> {
        blocking::block_on(self.readable())
    }

    /// Readable balance times the token price at the balance's block.
    ///
    /// Scale and price are fetched concurrently.
    pub async fn value_in_currency(&self) -> Result<f64> {
        if self.balance.is_zero() {
            return Ok(0.0);
        }
        let (readable, price) = tokio::try_join!(self.readable(), self.token.price(self.block))?;
        Ok(readable * price)
    }

    pub fn value_in_currency_blocking(&self) -> Result<f64> {
        blocking::block_on(self.value_in_currency())
    }
}

impl PartialEq<U256> for BalanceQuantity {
    fn eq(&self, other: &U256) -> bool {
        self.balance == *other
    }
}

impl fmt::Display for BalanceQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.balance)
    }
}

impl fmt::Debug for BalanceQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BalanceQuantity")
            .field("balance", &self.balance)
            .field("token", &self.token.address())
            .field("block", &self.block)
            .field("mode", &self.mode)
            .finish()
    }
}
