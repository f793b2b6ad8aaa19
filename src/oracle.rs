use crate::blocking;
use crate::client::{Block, ContractCaller, Decode, Signature};
use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use crate::price::PriceSource;
use crate::probe::call_and_decode;
use crate::utils::i256_to_f64;
use alloy::primitives::{address, Address};
use async_trait::async_trait;
use log::{debug, warn};
use moka::future::Cache;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

/// Chainlink aggregators report USD prices with 8 decimals.
pub const ORACLE_ANSWER_SCALE: f64 = 1e8;

pub const LATEST_ANSWER: Signature = Signature::new("latestAnswer()(int256)", Decode::Int);

// Asset -> Chainlink aggregator on Ethereum mainnet.
//
// Several assets point at one feed: EURS/EURT/sEUR share the EUR
// feed, hFIL/renFIL the FIL feed and sBTC/renBTC the WBTC feed. These wrapped
// variants have no oracle of their own; revalidate if the pegs or the
// aggregator deployments change.
pub const MAINNET_FEEDS: &[(Address, Address)] = &[
    (address!("0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"), address!("0xF4030086522a5bEEa4988F8cA5B36dbC97BeE88c")), // wbtc
    (address!("0x514910771AF9Ca656af840dff83E8264EcF986CA"), address!("0x2c1d072e956AFFC0D435Cb7AC38EF18d24d9127c")), // link
    (address!("0x584bC13c7D411c00c01A62e8019472dE68768430"), address!("0xBFC189aC214E6A4a35EBC281ad15669619b75534")), // hegic
    (address!("0x7Fc66500c84A76Ad7e9c93437bFc5Ac33E2DDaE9"), address!("0x547a514d5e3769680Ce22B2361c10Ea13619e8a9")), // aave
    (address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"), address!("0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419")), // weth
    (address!("0xc00e94Cb662C3520282E6f5717214004A7f26888"), address!("0xdbd020CAeF83eFd542f4De03e3cF0C28A4428bd5")), // comp
    (address!("0xdB25f211AB05b1c97D595516F45794528a807ad8"), address!("0xb49f677943BC038e9857d61E7d053CaA2C1734C1")), // eurs
    (address!("0xC581b735A1688071A1746c968e0798D642EDE491"), address!("0xb49f677943BC038e9857d61E7d053CaA2C1734C1")), // eurt
    (address!("0xD71eCFF9342A5Ced620049e616c5035F1dB98620"), address!("0xb49f677943BC038e9857d61E7d053CaA2C1734C1")), // seur
    (address!("0x5555f75e3d5278082200Fb451D1b6bA946D8e13b"), address!("0xBcE206caE7f0ec07b545EddE332A47C2F75bbeb3")), // ibjpy
    (address!("0xFAFdF0C4c1CB09d430Bf88c75D88BB46DAe09967"), address!("0x77F9710E7d0A19669A13c055F62cd80d313dF022")), // ibaud
    (address!("0x69681f8fde45345C3870BCD5eaf4A05a60E7D227"), address!("0x5c0Ab2d9b5a7ed9f470386e82BB36A3613cDd4b5")), // ibgbp
    (address!("0x1CC481cE2BD2EC7Bf67d1Be64d4878b16078F309"), address!("0x449d117117838fFA61263B61dA6301AA2a88B13A")), // ibchf
    (address!("0x0bc529c00C6401aEF6D220BE8C6Ea1667F6Ad93e"), address!("0xA027702dbb89fbd58938e4324ac03B58d812b0E1")), // yfi
    (address!("0x9AFb950948c2370975fb91a441F36FDC02737cD4"), address!("0x1A31D42149e82Eb99777f903C08A2E41A00085d3")), // hfil
    (address!("0x5CAF29fD8efbe4ED0cfc43A8a211B276E9889583"), address!("0x1A31D42149e82Eb99777f903C08A2E41A00085d3")), // renfil
    (address!("0x95dFDC8161832e4fF7816aC4B6367CE201538253"), address!("0x01435677fb11763550905594a16b645847c1d0f3")), // ibkrw
    (address!("0xfE18be6b3Bd88A2D2A7f928d00292E7a9963CfC6"), address!("0xF4030086522a5bEEa4988F8cA5B36dbC97BeE88c")), // sbtc
    (address!("0xEB4C2781e4ebA804CE9a9803C67d0893436bB27D"), address!("0xF4030086522a5bEEa4988F8cA5B36dbC97BeE88c")), // renbtc
];

static MAINNET: LazyLock<Arc<OracleFeedMap>> =
    LazyLock::new(|| Arc::new(OracleFeedMap::new(MAINNET_FEEDS.iter().copied())));

/// Immutable asset -> oracle mapping.
#[derive(Debug, Clone, Default)]
pub struct OracleFeedMap {
    feeds: HashMap<Address, Address>,
}

impl OracleFeedMap {
    pub fn new(feeds: impl IntoIterator<Item = (Address, Address)>) -> Self {
        Self {
            feeds: feeds.into_iter().collect(),
        }
    }

    /// The Ethereum mainnet table, built once per process.
    pub fn mainnet() -> Arc<OracleFeedMap> {
        MAINNET.clone()
    }

    pub fn feed(&self, asset: &Address) -> Option<Address> {
        self.feeds.get(asset).copied()
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn assets(&self) -> impl Iterator<Item = &Address> {
        self.feeds.keys()
    }

    /// Assets priced by `oracle`.
    pub fn assets_for(&self, oracle: &Address) -> Vec<Address> {
        self.feeds
            .iter()
            .filter(|(_, feed)| *feed == oracle)
            .map(|(asset, _)| *asset)
            .collect()
    }
}

/// Read an aggregator's latest answer and convert it to a float price.
pub async fn read_latest_answer(
    client: &dyn ContractCaller,
    oracle: Address,
    block: Option<Block>,
) -> Result<f64> {
    let answer = call_and_decode(client, oracle, &LATEST_ANSWER, &[], block)
        .await?
        .into_int()
        .ok_or_else(|| Error::Decode {
            signature: LATEST_ANSWER.text().to_string(),
            reason: "expected a signed integer".to_string(),
        })?;
    Ok(i256_to_f64(answer) / ORACLE_ANSWER_SCALE)
}

/// Best-effort oracle prices behind a short TTL cache.
///
/// Every failure resolves to `None`. Definite answers, including reverts and
/// undecodable data, are reused for the TTL keyed by `(asset, block)`;
/// transport failures are not cached. Concurrent misses on one key share a
/// single read.
pub struct OraclePriceCache {
    feeds: Arc<OracleFeedMap>,
    client: Arc<dyn ContractCaller>,
    cache: Cache<(Address, Option<Block>), Option<f64>>,
    chain_id: u64,
}

impl OraclePriceCache {
    pub fn new(
        feeds: Arc<OracleFeedMap>,
        client: Arc<dyn ContractCaller>,
        ttl: Duration,
        capacity: u64,
        chain_id: u64,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self {
            feeds,
            client,
            cache,
            chain_id,
        }
    }

    pub fn from_config(
        feeds: Arc<OracleFeedMap>,
        client: Arc<dyn ContractCaller>,
        config: &ResolverConfig,
    ) -> Self {
        Self::new(
            feeds,
            client,
            config.oracle_ttl(),
            config.oracle_cache_capacity,
            config.chain_id,
        )
    }

    pub fn feeds(&self) -> &Arc<OracleFeedMap> {
        &self.feeds
    }

    pub async fn get_price(&self, asset: Address, block: Option<Block>) -> Option<f64> {
        let Some(oracle) = self.feeds.feed(&asset) else {
            debug!("[Chain {}] No oracle feed for {}", self.chain_id, asset);
            return None;
        };

        let client = self.client.clone();
        let chain_id = self.chain_id;
        let result = self
            .cache
            .try_get_with((asset, block), async move {
                debug!("[Chain {}] Reading oracle {} for {} at {:?}", chain_id, oracle, asset, block);
                match read_latest_answer(client.as_ref(), oracle, block).await {
                    Ok(price) => Ok(Some(price)),
                    Err(Error::Call(e)) if e.is_transient() => Err(e),
                    Err(e) => {
                        warn!("[Chain {}] Oracle {} failed for {}: {}", chain_id, oracle, asset, e);
                        Ok(None)
                    }
                }
            })
            .await;

        match result {
            Ok(price) => price,
            Err(e) => {
                warn!("[Chain {}] Oracle {} unreachable for {}: {}", self.chain_id, oracle, asset, e);
                None
            }
        }
    }

    pub fn get_price_blocking(&self, asset: Address, block: Option<Block>) -> Result<Option<f64>> {
        blocking::block_on(async { Ok(self.get_price(asset, block).await) })
    }
}

#[async_trait]
impl PriceSource for OraclePriceCache {
    async fn price(&self, asset: Address, block: Option<Block>) -> Result<Option<f64>> {
        Ok(self.get_price(asset, block).await)
    }
}

impl std::fmt::Debug for OraclePriceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OraclePriceCache")
            .field("feeds", &self.feeds.len())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallError;
    use crate::mock::MockCaller;
    use alloy::primitives::{Bytes, I256};

    const WBTC: Address = address!("0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599");
    const BTC_FEED: Address = address!("0xF4030086522a5bEEa4988F8cA5B36dbC97BeE88c");
    const EUR_FEED: Address = address!("0xb49f677943BC038e9857d61E7d053CaA2C1734C1");
    const UNLISTED: Address = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");

    fn answer(value: i64) -> I256 {
        I256::try_from(value).unwrap()
    }

    fn cache(client: MockCaller, ttl: Duration) -> (OraclePriceCache, Arc<MockCaller>) {
        let client = Arc::new(client);
        let cache = OraclePriceCache::new(OracleFeedMap::mainnet(), client.clone(), ttl, 100, 1);
        (cache, client)
    }

    #[test]
    fn test_mainnet_table_shares_feeds() {
        let feeds = OracleFeedMap::mainnet();
        assert_eq!(feeds.len(), 19);
        assert_eq!(feeds.assets_for(&EUR_FEED).len(), 3);
        assert_eq!(feeds.assets_for(&BTC_FEED).len(), 3);
        assert!(Arc::ptr_eq(&feeds, &OracleFeedMap::mainnet()));
    }

    #[tokio::test]
    async fn test_price_is_scaled() {
        let (cache, _) = cache(
            MockCaller::new().respond_int(BTC_FEED, "latestAnswer()(int256)", answer(3_000_000_000_000)),
            Duration::from_secs(600),
        );
        assert_eq!(cache.get_price(WBTC, None).await, Some(30_000.0));
    }

    #[tokio::test]
    async fn test_repeat_within_ttl_hits_cache() {
        let (cache, client) = cache(
            MockCaller::new().respond_int(BTC_FEED, "latestAnswer()(int256)", answer(100_000_000)),
            Duration::from_secs(600),
        );
        assert_eq!(cache.get_price(WBTC, Some(12)).await, Some(1.0));
        assert_eq!(cache.get_price(WBTC, Some(12)).await, Some(1.0));
        assert_eq!(client.call_count(), 1);

        // a different block is a different key
        cache.get_price(WBTC, Some(13)).await;
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refreshed() {
        let (cache, client) = cache(
            MockCaller::new().respond_int(BTC_FEED, "latestAnswer()(int256)", answer(100_000_000)),
            Duration::from_millis(100),
        );
        cache.get_price(WBTC, Some(12)).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        cache.get_price(WBTC, Some(12)).await;
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unlisted_asset_is_none() {
        let (cache, client) = cache(MockCaller::new(), Duration::from_secs(600));
        assert_eq!(cache.get_price(UNLISTED, None).await, None);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_decode_failure_is_cached_as_none() {
        let (cache, client) = cache(
            MockCaller::new().respond(BTC_FEED, "latestAnswer()(int256)", Ok(Bytes::new())),
            Duration::from_secs(600),
        );
        assert_eq!(cache.get_price(WBTC, None).await, None);
        assert_eq!(cache.get_price(WBTC, None).await, None);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_none_but_not_cached() {
        let (cache, client) = cache(
            MockCaller::new()
                .respond_error(BTC_FEED, "latestAnswer()(int256)", CallError::Transport("503".into()))
                .respond_int(BTC_FEED, "latestAnswer()(int256)", answer(200_000_000)),
            Duration::from_secs(600),
        );
        assert_eq!(cache.get_price(WBTC, None).await, None);
        assert_eq!(cache.get_price(WBTC, None).await, Some(2.0));
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_read() {
        let (cache, client) = cache(
            MockCaller::new()
                .with_delay(Duration::from_millis(20))
                .respond_int(BTC_FEED, "latestAnswer()(int256)", answer(100_000_000)),
            Duration::from_secs(600),
        );
        let (a, b) = tokio::join!(cache.get_price(WBTC, None), cache.get_price(WBTC, None));
        assert_eq!(a, Some(1.0));
        assert_eq!(b, Some(1.0));
        assert_eq!(client.call_count(), 1);
    }
}
