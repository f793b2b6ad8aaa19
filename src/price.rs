use crate::client::Block;
use crate::error::Result;
use alloy::primitives::Address;
use async_trait::async_trait;

/// Higher-level price lookup consumed by token handles.
///
/// Implementors route between pricing strategies. `Ok(None)` means no source
/// could price the asset; `Err` is reserved for failures worth retrying.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn price(&self, asset: Address, block: Option<Block>) -> Result<Option<f64>>;
}

/// A source that never has a price. Useful when only metadata is needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPriceSource;

#[async_trait]
impl PriceSource for NoPriceSource {
    async fn price(&self, _asset: Address, _block: Option<Block>) -> Result<Option<f64>> {
        Ok(None)
    }
}
