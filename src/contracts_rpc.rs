//! JSON-RPC backed [`ContractCaller`].
//! Only compiled when the `rpc` feature is enabled.

use crate::client::{Block, CallArg, ContractCaller, Signature};
use crate::error::CallError;
use alloy::eips::BlockId;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::Http;
use alloy::transports::layers::FallbackLayer;
use alloy::transports::{RpcError, TransportError};
use anyhow::anyhow;
use async_trait::async_trait;
use log::debug;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tower::ServiceBuilder;
use url::Url;

/// Create an RPC provider with fallback layer across multiple RPC URLs.
pub fn create_fallback_provider(
    rpc_urls: &[String],
) -> anyhow::Result<impl Provider + Clone + 'static> {
    let rpc_len = NonZeroUsize::new(rpc_urls.len()).ok_or_else(|| anyhow!("no RPC URLs given"))?;
    let fallback_layer = FallbackLayer::default().with_active_transport_count(rpc_len);

    let transports = rpc_urls
        .iter()
        .map(|url| Url::parse(url).map(Http::new))
        .collect::<Result<Vec<_>, _>>()?;

    let transport = ServiceBuilder::new()
        .layer(fallback_layer)
        .service(transports);
    let client = RpcClient::builder().transport(transport, false);
    Ok(ProviderBuilder::new().connect_client(client))
}

/// Connect to `rpc_urls` and wrap the provider as a shared caller.
pub fn connect(rpc_urls: &[String], chain_id: u64) -> anyhow::Result<Arc<dyn ContractCaller>> {
    let provider = create_fallback_provider(rpc_urls)?;
    Ok(Arc::new(AlloyContractCaller::new(Arc::new(provider), chain_id)))
}

/// `eth_call` / `eth_getCode` over any alloy provider.
///
/// Verified-source lookups are not available over plain JSON-RPC, so
/// [`ContractCaller::verified_contract`] keeps its `None` default.
pub struct AlloyContractCaller<P> {
    provider: Arc<P>,
    chain_id: u64,
}

impl<P> AlloyContractCaller<P> {
    pub fn new(provider: Arc<P>, chain_id: u64) -> Self {
        Self { provider, chain_id }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }
}

/// Only execution reverts are final. Rate limits, overload and any other
/// node-side error response are transport problems and may succeed on retry.
fn classify(error: TransportError) -> CallError {
    match error {
        RpcError::ErrorResp(payload) if payload.is_retry_err() => {
            CallError::Transport(payload.to_string())
        }
        RpcError::ErrorResp(payload)
            if payload.as_revert_data().is_some()
                || payload.message.to_ascii_lowercase().contains("revert") =>
        {
            CallError::Revert(payload.message.to_string())
        }
        other => CallError::Transport(other.to_string()),
    }
}

#[async_trait]
impl<P> ContractCaller for AlloyContractCaller<P>
where
    P: Provider + Send + Sync + 'static,
{
    async fn call(
        &self,
        address: Address,
        signature: &Signature,
        args: &[CallArg],
        block: Option<Block>,
    ) -> Result<Bytes, CallError> {
        debug!(
            "[Chain {}] eth_call {} on {} at {:?}",
            self.chain_id, signature, address, block
        );
        let tx = TransactionRequest::default()
            .with_to(address)
            .with_input(signature.encode_call(args)?);
        let block_id = block.map(BlockId::number).unwrap_or_else(BlockId::latest);
        self.provider
            .call(tx)
            .block(block_id)
            .await
            .map_err(classify)
    }

    async fn exists(&self, address: Address) -> Result<bool, CallError> {
        let code = self
            .provider
            .get_code_at(address)
            .await
            .map_err(classify)?;
        Ok(!code.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::rpc::json_rpc::ErrorPayload;

    #[test]
    fn test_fallback_provider_rejects_bad_input() {
        assert!(create_fallback_provider(&[]).is_err());
        assert!(create_fallback_provider(&["not a url".to_string()]).is_err());
    }

    fn error_response(code: i64, message: &'static str) -> TransportError {
        RpcError::ErrorResp(ErrorPayload {
            code,
            message: message.into(),
            data: None,
        })
    }

    #[test]
    fn test_revert_is_not_transient() {
        let revert = classify(error_response(3, "execution reverted"));
        assert_eq!(revert, CallError::Revert("execution reverted".to_string()));
        assert!(!revert.is_transient());

        let transport = classify(RpcError::NullResp);
        assert!(transport.is_transient());
    }

    #[test]
    fn test_rate_limits_are_transient() {
        assert!(classify(error_response(-32005, "limit exceeded")).is_transient());
        assert!(classify(error_response(429, "Too Many Requests")).is_transient());
        assert!(classify(error_response(-32000, "header not found")).is_transient());
    }

    #[test]
    fn test_unknown_error_responses_are_transient() {
        let err = classify(error_response(-32000, "missing trie node"));
        assert!(matches!(err, CallError::Transport(_)));
    }
}
