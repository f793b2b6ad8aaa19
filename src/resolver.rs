use crate::address::IntoAddress;
use crate::balance::BalanceQuantity;
use crate::blocking;
use crate::client::{Block, ContractCaller};
use crate::config::ResolverConfig;
use crate::contract::{ContractHandle, HandleContext, Mode};
use crate::erc20::Erc20;
use crate::error::Result;
use crate::oracle::{OracleFeedMap, OraclePriceCache};
use crate::price::PriceSource;
use crate::registry::HandleRegistry;
use alloy::primitives::U256;
use std::sync::Arc;

/// Entry point: one identity registry per handle kind over shared collaborators.
///
/// The convenience accessors create missing handles in the mode matching the
/// calling convention (`Async` for the async form, `Blocking` for the
/// `_blocking` form). An existing handle keeps the mode it was created with.
pub struct TokenResolver {
    ctx: Arc<HandleContext>,
    config: ResolverConfig,
    contracts: HandleRegistry<ContractHandle>,
    tokens: HandleRegistry<Erc20>,
    oracle: Arc<OraclePriceCache>,
}

impl TokenResolver {
    /// Resolver whose token prices come from the oracle cache alone.
    ///
    /// Mainnet (chain id 1) gets the built-in feed table, other chains none.
    pub fn new(client: Arc<dyn ContractCaller>, config: ResolverConfig) -> Self {
        let feeds = if config.chain_id == 1 {
            OracleFeedMap::mainnet()
        } else {
            Arc::new(OracleFeedMap::default())
        };
        Self::with_sources(client, config, feeds, None)
    }

    /// Resolver with an explicit feed table and, optionally, a price router
    /// that takes precedence over the oracle cache for token prices.
    pub fn with_sources(
        client: Arc<dyn ContractCaller>,
        config: ResolverConfig,
        feeds: Arc<OracleFeedMap>,
        prices: Option<Arc<dyn PriceSource>>,
    ) -> Self {
        let oracle = Arc::new(OraclePriceCache::from_config(feeds, client.clone(), &config));
        let prices = prices.unwrap_or_else(|| oracle.clone() as Arc<dyn PriceSource>);
        let ctx = Arc::new(HandleContext::new(
            client,
            prices,
            config.chain_id,
            config.network.clone(),
        ));
        Self {
            ctx,
            contracts: HandleRegistry::new(config.chain_id),
            tokens: HandleRegistry::new(config.chain_id),
            oracle,
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn oracle(&self) -> &Arc<OraclePriceCache> {
        &self.oracle
    }

    pub fn tokens(&self) -> &HandleRegistry<Erc20> {
        &self.tokens
    }

    pub fn contracts(&self) -> &HandleRegistry<ContractHandle> {
        &self.contracts
    }

    /// The shared token handle for `raw`.
    pub fn token(&self, raw: impl IntoAddress, mode: Mode) -> Result<Arc<Erc20>> {
        self.tokens
            .get_or_create(raw, |address| Erc20::new(address, mode, self.ctx.clone()))
    }

    /// The shared contract handle for `raw`.
    pub fn contract(&self, raw: impl IntoAddress, mode: Mode) -> Result<Arc<ContractHandle>> {
        self.contracts
            .get_or_create(raw, |address| ContractHandle::new(address, mode, self.ctx.clone()))
    }

    /// A fresh balance value; only the token behind it is registered.
    pub fn balance(
        &self,
        token: impl IntoAddress,
        balance: U256,
        block: Option<Block>,
        mode: Mode,
    ) -> Result<BalanceQuantity> {
        let token = self.token(token, mode)?;
        Ok(BalanceQuantity::new(balance, token, block, mode))
    }

    pub async fn symbol(&self, token: impl IntoAddress) -> Result<String> {
        self.token(token, Mode::Async)?.symbol().await
    }

    pub fn symbol_blocking(&self, token: impl IntoAddress) -> Result<String> {
        self.token(token, Mode::Blocking)?.symbol_blocking()
    }

    pub async fn name(&self, token: impl IntoAddress) -> Result<String> {
        self.token(token, Mode::Async)?.name().await
    }

    pub fn name_blocking(&self, token: impl IntoAddress) -> Result<String> {
        self.token(token, Mode::Blocking)?.name_blocking()
    }

    /// Cached decimals for `None`, a fresh read at the block otherwise.
    pub async fn decimals(&self, token: impl IntoAddress, block: Option<Block>) -> Result<u8> {
        let token = self.token(token, Mode::Async)?;
        match block {
            None => token.decimals().await,
            Some(_) => token.decimals_at(block).await,
        }
    }

    pub fn decimals_blocking(&self, token: impl IntoAddress, block: Option<Block>) -> Result<u8> {
        let token = self.token(token, Mode::Blocking)?;
        blocking::block_on(async move {
            match block {
                None => token.decimals().await,
                Some(_) => token.decimals_at(block).await,
            }
        })
    }

    /// Cached scale for `None`, a fresh read at the block otherwise.
    pub async fn scale(&self, token: impl IntoAddress, block: Option<Block>) -> Result<U256> {
        let token = self.token(token, Mode::Async)?;
        match block {
            None => token.scale().await,
            Some(_) => token.scale_at(block).await,
        }
    }

    pub fn scale_blocking(&self, token: impl IntoAddress, block: Option<Block>) -> Result<U256> {
        let token = self.token(token, Mode::Blocking)?;
        blocking::block_on(async move {
            match block {
                None => token.scale().await,
                Some(_) => token.scale_at(block).await,
            }
        })
    }

    pub async fn total_supply(&self, token: impl IntoAddress, block: Option<Block>) -> Result<U256> {
        self.token(token, Mode::Async)?.total_supply(block).await
    }

    pub fn total_supply_blocking(
        &self,
        token: impl IntoAddress,
        block: Option<Block>,
    ) -> Result<U256> {
        self.token(token, Mode::Blocking)?.total_supply_blocking(block)
    }

    pub async fn balance_of(
        &self,
        token: impl IntoAddress,
        holder: impl IntoAddress,
        block: Option<Block>,
    ) -> Result<U256> {
        self.token(token, Mode::Async)?.balance_of(holder, block).await
    }

    pub fn balance_of_blocking(
        &self,
        token: impl IntoAddress,
        holder: impl IntoAddress,
        block: Option<Block>,
    ) -> Result<U256> {
        self.token(token, Mode::Blocking)?.balance_of_blocking(holder, block)
    }

    pub async fn price(&self, token: impl IntoAddress, block: Option<Block>) -> Result<f64> {
        self.token(token, Mode::Async)?.price(block).await
    }

    pub fn price_blocking(&self, token: impl IntoAddress, block: Option<Block>) -> Result<f64> {
        self.token(token, Mode::Blocking)?.price_blocking(block)
    }

    /// Oracle feed price. `Err` only for a malformed address.
    pub async fn oracle_price(
        &self,
        asset: impl IntoAddress,
        block: Option<Block>,
    ) -> Result<Option<f64>> {
        let asset = asset.into_address()?;
        Ok(self.oracle.get_price(asset, block).await)
    }

    pub fn oracle_price_blocking(
        &self,
        asset: impl IntoAddress,
        block: Option<Block>,
    ) -> Result<Option<f64>> {
        let asset = asset.into_address()?;
        self.oracle.get_price_blocking(asset, block)
    }
}

impl std::fmt::Debug for TokenResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResolver")
            .field("config", &self.config)
            .field("tokens", &self.tokens)
            .field("contracts", &self.contracts)
            .finish()
    }
}
