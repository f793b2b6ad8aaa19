use crate::blocking;
use crate::client::{Block, ContractCaller, Decode, Signature, VerifiedContract};
use crate::error::{CallError, Error, Result};
use crate::memo::Memo;
use crate::price::PriceSource;
use crate::probe::{probe, Value};
use alloy::primitives::Address;
use log::debug;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Calling convention a handle was first created for.
///
/// Both conventions are always available on every handle; the mode records
/// which one the creator intended and is inherited by derived values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Blocking,
    Async,
}

/// Collaborators shared by every handle of one resolver.
pub struct HandleContext {
    pub client: Arc<dyn ContractCaller>,
    pub prices: Arc<dyn PriceSource>,
    pub chain_id: u64,
    pub network: String,
}

impl HandleContext {
    pub fn new(
        client: Arc<dyn ContractCaller>,
        prices: Arc<dyn PriceSource>,
        chain_id: u64,
        network: impl Into<String>,
    ) -> Self {
        Self {
            client,
            prices,
            chain_id,
            network: network.into(),
        }
    }
}

impl fmt::Debug for HandleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleContext")
            .field("chain_id", &self.chain_id)
            .field("network", &self.network)
            .finish()
    }
}

/// Outcome of resolving a verified-contract descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractStatus {
    Verified(Arc<VerifiedContract>),
    /// Code is deployed but no verified source is known.
    Unverified,
    Nonexistent,
}

async fn resolve_status(client: &dyn ContractCaller, address: Address) -> Result<ContractStatus> {
    match client.verified_contract(address).await {
        Ok(Some(contract)) => return Ok(ContractStatus::Verified(Arc::new(contract))),
        Ok(None) => {}
        Err(CallError::NotFound(_)) => return Ok(ContractStatus::Nonexistent),
        Err(e) => return Err(e.into()),
    }
    match client.exists(address).await {
        Ok(true) => Ok(ContractStatus::Unverified),
        Ok(false) | Err(CallError::NotFound(_)) => Ok(ContractStatus::Nonexistent),
        Err(e) => Err(e.into()),
    }
}

/// In-memory proxy for one on-chain contract.
pub struct ContractHandle {
    address: Address,
    mode: Mode,
    ctx: Arc<HandleContext>,
    status: Memo<ContractStatus>,
    build_name: Memo<String>,
}

impl ContractHandle {
    pub fn new(address: Address, mode: Mode, ctx: Arc<HandleContext>) -> Self {
        Self {
            address,
            mode,
            ctx,
            status: Memo::new(),
            build_name: Memo::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn context(&self) -> &Arc<HandleContext> {
        &self.ctx
    }

    /// Verified, unverified or nonexistent. Negative outcomes are cached too.
    pub async fn status(&self) -> Result<ContractStatus> {
        let client = self.ctx.client.clone();
        let address = self.address;
        self.status
            .get_or_try_init(|| async move {
                debug!("Resolving contract status for {}", address);
                resolve_status(client.as_ref(), address).await
            })
            .await
    }

    pub fn status_blocking(&self) -> Result<ContractStatus> {
        blocking::block_on(self.status())
    }

    /// The verified descriptor, or why there is none.
    pub async fn contract(&self) -> Result<Arc<VerifiedContract>> {
        match self.status().await? {
            ContractStatus::Verified(contract) => Ok(contract),
            ContractStatus::Unverified => Err(Error::ContractNotVerified(self.address)),
            ContractStatus::Nonexistent => Err(Error::ContractNonexistent(self.address)),
        }
    }

    pub fn contract_blocking(&self) -> Result<Arc<VerifiedContract>> {
        blocking::block_on(self.contract())
    }

    /// `Some(true)` when verified, `Some(false)` when deployed but unverified,
    /// `None` when nothing is deployed.
    pub async fn is_cached(&self) -> Result<Option<bool>> {
        Ok(match self.status().await? {
            ContractStatus::Verified(_) => Some(true),
            ContractStatus::Unverified => Some(false),
            ContractStatus::Nonexistent => None,
        })
    }

    pub fn is_cached_blocking(&self) -> Result<Option<bool>> {
        blocking::block_on(self.is_cached())
    }

    /// Contract name of the verified build.
    pub async fn build_name(&self) -> Result<String> {
        let client = self.ctx.client.clone();
        let address = self.address;
        self.build_name
            .get_or_try_init(|| async move {
                match resolve_status(client.as_ref(), address).await? {
                    ContractStatus::Verified(contract) => Ok(contract.name.clone()),
                    ContractStatus::Unverified => Err(Error::ContractNotVerified(address)),
                    ContractStatus::Nonexistent => Err(Error::ContractNonexistent(address)),
                }
            })
            .await
    }

    pub fn build_name_blocking(&self) -> Result<String> {
        blocking::block_on(self.build_name())
    }

    /// Whether calling `method` (e.g. `"getReserves()"`) succeeds with non-empty data.
    pub async fn has_method(&self, method: &str, block: Option<Block>) -> Result<bool> {
        let signature = Signature::owned(method.to_string(), Decode::Uint);
        match self.ctx.client.call(self.address, &signature, &[], block).await {
            Ok(data) => Ok(!data.is_empty()),
            Err(e) if e.is_transient() => Err(e.into()),
            Err(_) => Ok(false),
        }
    }

    pub fn has_method_blocking(&self, method: &str, block: Option<Block>) -> Result<bool> {
        blocking::block_on(self.has_method(method, block))
    }

    /// Call `signature` and return its decoded response, `None` when it fails.
    pub async fn method_response(
        &self,
        signature: Signature,
        block: Option<Block>,
    ) -> Result<Option<Value>> {
        probe(self.ctx.client.as_ref(), self.address, &[signature], block).await
    }

    pub fn method_response_blocking(
        &self,
        signature: Signature,
        block: Option<Block>,
    ) -> Result<Option<Value>> {
        blocking::block_on(self.method_response(signature, block))
    }
}

impl PartialEq for ContractHandle {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for ContractHandle {}

impl PartialEq<Address> for ContractHandle {
    fn eq(&self, other: &Address) -> bool {
        self.address == *other
    }
}

impl Hash for ContractHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl fmt::Display for ContractHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

impl fmt::Debug for ContractHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractHandle")
            .field("address", &self.address)
            .field("mode", &self.mode)
            .field("status", &self.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockCaller;
    use crate::price::NoPriceSource;
    use alloy::primitives::{address, U256};

    const DAI: Address = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");

    fn handle(client: MockCaller) -> (ContractHandle, Arc<MockCaller>) {
        let client = Arc::new(client);
        let ctx = Arc::new(HandleContext::new(
            client.clone(),
            Arc::new(NoPriceSource),
            1,
            "Mainnet",
        ));
        (ContractHandle::new(DAI, Mode::Async, ctx), client)
    }

    #[tokio::test]
    async fn test_verified_contract() {
        let (contract, client) = handle(MockCaller::new().verify(VerifiedContract {
            address: DAI,
            name: "Vault".to_string(),
            functions: vec!["pricePerShare()".to_string()],
        }));

        assert_eq!(contract.is_cached().await.unwrap(), Some(true));
        assert_eq!(contract.contract().await.unwrap().name, "Vault");
        assert_eq!(contract.build_name().await.unwrap(), "Vault");
        assert_eq!(contract.build_name().await.unwrap(), "Vault");
        // status resolved once, build name once
        assert_eq!(client.exists_count(), 0);
    }

    #[tokio::test]
    async fn test_unverified_and_nonexistent_are_distinguished() {
        let (unverified, client) = handle(MockCaller::new().deploy(DAI));
        assert!(matches!(
            unverified.contract().await,
            Err(Error::ContractNotVerified(a)) if a == DAI
        ));
        assert_eq!(unverified.is_cached().await.unwrap(), Some(false));
        assert_eq!(client.exists_count(), 1);

        let (missing, client) = handle(MockCaller::new());
        assert!(matches!(
            missing.contract().await,
            Err(Error::ContractNonexistent(a)) if a == DAI
        ));
        assert_eq!(missing.is_cached().await.unwrap(), None);
        assert!(matches!(
            missing.build_name().await,
            Err(Error::ContractNonexistent(_))
        ));
        // the negative status is cached, build_name resolves on its own
        assert_eq!(client.exists_count(), 2);
    }

    #[tokio::test]
    async fn test_has_method() {
        let (contract, _) = handle(
            MockCaller::new().respond_uint(DAI, "pricePerShare()", U256::from(1u8)),
        );
        assert!(contract.has_method("pricePerShare()", None).await.unwrap());
        assert!(!contract.has_method("getPricePerFullShare()", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_equality_by_address() {
        let (a, _) = handle(MockCaller::new());
        let (b, _) = handle(MockCaller::new());
        assert_eq!(a, b);
        assert_eq!(a, DAI);
        assert_eq!(a.to_string(), "0x6B175474E89094C44Da98b954EedeAC495271d0F");
    }
}
