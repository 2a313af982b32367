//! 链交互抽象
//!
//! - `Wallet`：浏览器钱包 / 签名者能力（请求账户、链ID、切换网络、签名发送）
//! - `TokenContract`：ERC-20 合约读写能力（余额、精度、转账、等待回执）
//!
//! 生产实现见 `ethers_client`，测试使用脚本化的 mock。

use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

use crate::{config::NetworkConfig, error::ChainError};

/// 交易回执（只保留流水线需要的字段）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transaction_hash: H256,
    pub gas_used: U256,
    pub block_number: Option<u64>,
    /// 1 = success, 0 = reverted
    pub status: Option<u64>,
}

impl TransferReceipt {
    pub fn is_reverted(&self) -> bool {
        self.status == Some(0)
    }
}

/// ERC-20 合约能力
#[async_trait]
pub trait TokenContract: Send + Sync {
    /// 合约地址
    fn address(&self) -> Address;

    async fn balance_of(&self, owner: Address) -> Result<U256, ChainError>;

    async fn decimals(&self) -> Result<u8, ChainError>;

    /// 可选方法，仅用于诊断
    async fn symbol(&self) -> Result<String, ChainError>;

    /// 可选方法，仅用于诊断
    async fn name(&self) -> Result<String, ChainError>;

    async fn estimate_transfer_gas(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<U256, ChainError>;

    /// 签名并发送 `transfer(to, amount)`，返回交易哈希
    async fn transfer(&self, to: Address, amount: U256) -> Result<H256, ChainError>;

    /// 阻塞等待交易上链；节点返回空回执时为 `Ok(None)`
    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<Option<TransferReceipt>, ChainError>;
}

/// 钱包能力
#[async_trait]
pub trait Wallet: Send + Sync {
    /// 请求连接并返回授权账户（第一个为当前账户）
    async fn request_accounts(&self) -> Result<Vec<Address>, ChainError>;

    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// wallet_switchEthereumChain
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ChainError>;

    /// wallet_addEthereumChain
    async fn add_chain(&self, network: &NetworkConfig) -> Result<(), ChainError>;

    /// 将代币合约绑定到当前签名者
    fn token_contract(&self, token: Address) -> Arc<dyn TokenContract>;
}
