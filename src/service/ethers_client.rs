//! ethers-rs 适配器
//!
//! `Wallet` / `TokenContract` 的生产实现：
//! - `EthersWallet`：本地私钥签名（`SignerMiddleware<Provider<Http>, LocalWallet>`）
//! - `EthersTokenContract`：`abigen!` 生成的 ERC-20 绑定
//!
//! 所有 ethers 错误都在这里转成 `ChainError`，revert 数据尽量解码出 reason。

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::{
    abi::{self, ParamType, Token},
    contract::{abigen, ContractError},
    middleware::SignerMiddleware,
    providers::{Http, Middleware, MiddlewareError, PendingTransaction, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, TransactionReceipt, H256, U256},
};
use serde_json::json;

use crate::{
    config::NetworkConfig,
    error::ChainError,
    service::chain_client::{TokenContract, TransferReceipt, Wallet},
};

abigen!(
    Erc20Token,
    r#"[
        function name() view returns (string)
        function symbol() view returns (string)
        function decimals() view returns (uint8)
        function balanceOf(address owner) view returns (uint256)
        function transfer(address to, uint256 amount) returns (bool)
    ]"#,
);

/// Error(string) 的函数选择器
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// 本地私钥签名的客户端
pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// ERC-20 合约（绑定到某个 Middleware / 签名者）
pub struct EthersTokenContract<M: Middleware> {
    client: Arc<M>,
    contract: Erc20Token<M>,
    confirmations: usize,
}

impl<M: Middleware + 'static> EthersTokenContract<M> {
    pub fn new(address: Address, client: Arc<M>, confirmations: usize) -> Self {
        Self {
            contract: Erc20Token::new(address, client.clone()),
            client,
            confirmations,
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> TokenContract for EthersTokenContract<M> {
    fn address(&self) -> Address {
        self.contract.address()
    }

    async fn balance_of(&self, owner: Address) -> Result<U256, ChainError> {
        self.contract
            .balance_of(owner)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn decimals(&self) -> Result<u8, ChainError> {
        self.contract.decimals().call().await.map_err(contract_error)
    }

    async fn symbol(&self) -> Result<String, ChainError> {
        self.contract.symbol().call().await.map_err(contract_error)
    }

    async fn name(&self) -> Result<String, ChainError> {
        self.contract.name().call().await.map_err(contract_error)
    }

    async fn estimate_transfer_gas(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<U256, ChainError> {
        self.contract
            .transfer(to, amount)
            .from(from)
            .estimate_gas()
            .await
            .map_err(contract_error)
    }

    async fn transfer(&self, to: Address, amount: U256) -> Result<H256, ChainError> {
        let call = self.contract.transfer(to, amount);
        let pending = call.send().await.map_err(contract_error)?;
        Ok(*pending)
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<Option<TransferReceipt>, ChainError> {
        let receipt = PendingTransaction::new(tx_hash, self.client.provider())
            .confirmations(self.confirmations)
            .await
            .map_err(rpc_error)?;

        Ok(receipt.map(to_transfer_receipt))
    }
}

/// 私钥钱包
///
/// 账户固定为私钥对应地址；网络切换请求直接转发给 RPC 节点。
pub struct EthersWallet {
    client: Arc<SignerClient>,
    confirmations: usize,
}

impl EthersWallet {
    pub fn from_private_key(network: &NetworkConfig, private_key: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(network.rpc_url.as_str())
            .with_context(|| format!("Failed to create RPC provider for {}", network.rpc_url))?;

        let signer = private_key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .context("Invalid private key")?
            .with_chain_id(network.chain_id);

        tracing::info!(
            address = ?signer.address(),
            chain_id = network.chain_id,
            rpc = %network.rpc_url,
            "Signer wallet loaded"
        );

        Ok(Self {
            client: Arc::new(SignerMiddleware::new(provider, signer)),
            confirmations: network.confirmations,
        })
    }

    pub fn address(&self) -> Address {
        self.client.address()
    }
}

#[async_trait]
impl Wallet for EthersWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(vec![self.client.address()])
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.client
            .get_chainid()
            .await
            .map(|id| id.as_u64())
            .map_err(rpc_error)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ChainError> {
        self.client
            .provider()
            .request::<_, serde_json::Value>(
                "wallet_switchEthereumChain",
                [json!({ "chainId": format!("{:#x}", chain_id) })],
            )
            .await
            .map(|_| ())
            .map_err(rpc_error)
    }

    async fn add_chain(&self, network: &NetworkConfig) -> Result<(), ChainError> {
        self.client
            .provider()
            .request::<_, serde_json::Value>("wallet_addEthereumChain", [add_chain_params(network)])
            .await
            .map(|_| ())
            .map_err(rpc_error)
    }

    fn token_contract(&self, token: Address) -> Arc<dyn TokenContract> {
        Arc::new(EthersTokenContract::new(
            token,
            self.client.clone(),
            self.confirmations,
        ))
    }
}

/// EIP-3085 参数
fn add_chain_params(network: &NetworkConfig) -> serde_json::Value {
    json!({
        "chainId": format!("{:#x}", network.chain_id),
        "chainName": network.chain_name,
        "nativeCurrency": {
            "name": network.native_currency.name,
            "symbol": network.native_currency.symbol,
            "decimals": network.native_currency.decimals,
        },
        "rpcUrls": [network.rpc_url],
        "blockExplorerUrls": [network.block_explorer],
    })
}

fn to_transfer_receipt(receipt: TransactionReceipt) -> TransferReceipt {
    TransferReceipt {
        transaction_hash: receipt.transaction_hash,
        gas_used: receipt.gas_used.unwrap_or_default(),
        block_number: receipt.block_number.map(|b| b.as_u64()),
        status: receipt.status.map(|s| s.as_u64()),
    }
}

fn contract_error<M: Middleware>(e: ContractError<M>) -> ChainError {
    if let Some(data) = e.as_revert() {
        return ChainError::call_exception(
            e.to_string(),
            decode_revert_reason(data),
            Some(data.to_string()),
        );
    }
    if let Some(inner) = e.as_middleware_error() {
        if let Some(resp) = inner.as_error_response() {
            return ChainError::new(format!("{} (code {})", resp.message, resp.code));
        }
    }
    ChainError::new(e.to_string())
}

fn rpc_error<E: MiddlewareError>(e: E) -> ChainError {
    match e.as_error_response() {
        Some(resp) => {
            let message = format!("{} (code {})", resp.message, resp.code);
            match resp.as_revert_data() {
                Some(data) => ChainError::call_exception(
                    message,
                    decode_revert_reason(&data),
                    Some(data.to_string()),
                ),
                None => ChainError::new(message),
            }
        }
        None => ChainError::new(e.to_string()),
    }
}

/// 解码 `Error(string)` revert 数据
fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let payload = data.strip_prefix(&ERROR_STRING_SELECTOR[..])?;
    match abi::decode(&[ParamType::String], payload).ok()?.into_iter().next()? {
        Token::String(reason) => Some(reason),
        _ => None,
    }
}
