//! 链会话管理
//!
//! 显式状态机：
//! ```text
//! Disconnected -> Connecting -> Connected
//!                            -> NetworkMismatch
//! (any) --reset_session()--> Disconnected
//! ```
//! 不自动重试、不自动切换网络；失败直接返回给调用方。

use std::{fmt, sync::Arc};

use ethers::types::Address;

use crate::{
    config::NetworkConfig,
    error::{ChainError, TransferError},
    service::chain_client::{TokenContract, Wallet},
};

/// 钱包未添加目标链时 wallet_switchEthereumChain 返回的错误码
const UNRECOGNIZED_CHAIN_CODE: &str = "4902";

/// 已连接的会话句柄
///
/// 账户、链ID 和绑定到签名者的代币合约；校验器和执行器只读。
#[derive(Clone)]
pub struct ChainSession {
    account: Address,
    chain_id: u64,
    contract: Arc<dyn TokenContract>,
}

impl ChainSession {
    pub fn account(&self) -> Address {
        self.account
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn contract(&self) -> &dyn TokenContract {
        self.contract.as_ref()
    }
}

impl fmt::Debug for ChainSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainSession")
            .field("account", &self.account)
            .field("chain_id", &self.chain_id)
            .field("token", &self.contract.address())
            .finish()
    }
}

/// 会话状态
#[derive(Debug, Clone)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected(ChainSession),
    NetworkMismatch { expected: u64, actual: u64 },
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected(_))
    }
}

/// 会话管理器：独占 Session 句柄
pub struct SessionManager {
    wallet: Option<Arc<dyn Wallet>>,
    network: NetworkConfig,
    token: Address,
    state: SessionState,
}

impl SessionManager {
    pub fn new(wallet: Arc<dyn Wallet>, network: NetworkConfig, token: Address) -> Self {
        Self {
            wallet: Some(wallet),
            network,
            token,
            state: SessionState::Disconnected,
        }
    }

    /// 没有可用钱包（例如未安装 MetaMask）
    pub fn without_wallet(network: NetworkConfig, token: Address) -> Self {
        Self {
            wallet: None,
            network,
            token,
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// 确保存在网络正确的会话
    pub async fn ensure_session(&mut self) -> Result<ChainSession, TransferError> {
        if let SessionState::Connected(session) = &self.state {
            return Ok(session.clone());
        }

        let wallet = self.wallet.clone().ok_or_else(|| {
            TransferError::WalletUnavailable("MetaMask is not installed".to_string())
        })?;

        self.state = SessionState::Connecting;
        tracing::info!(chain_id = self.network.chain_id, "Connecting to wallet...");

        match self.connect(wallet.as_ref()).await {
            Ok(session) => {
                tracing::info!(
                    account = ?session.account,
                    chain_id = session.chain_id,
                    "✅ Wallet session established"
                );
                self.state = SessionState::Connected(session.clone());
                Ok(session)
            }
            Err(TransferError::NetworkMismatch {
                expected_chain_id,
                expected_name,
                actual_chain_id,
            }) => {
                tracing::warn!(
                    expected = expected_chain_id,
                    actual = actual_chain_id,
                    "Wallet is connected to the wrong network"
                );
                self.state = SessionState::NetworkMismatch {
                    expected: expected_chain_id,
                    actual: actual_chain_id,
                };
                Err(TransferError::NetworkMismatch {
                    expected_chain_id,
                    expected_name,
                    actual_chain_id,
                })
            }
            Err(e) => {
                tracing::error!(error = %e, "Wallet connection failed");
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    async fn connect(&self, wallet: &dyn Wallet) -> Result<ChainSession, TransferError> {
        let accounts = wallet.request_accounts().await.map_err(connection_error)?;
        let account = accounts.first().copied().ok_or_else(|| {
            TransferError::WalletUnavailable("No wallet account available".to_string())
        })?;

        let chain_id = wallet.chain_id().await.map_err(connection_error)?;
        if chain_id != self.network.chain_id {
            return Err(TransferError::NetworkMismatch {
                expected_chain_id: self.network.chain_id,
                expected_name: self.network.chain_name.clone(),
                actual_chain_id: chain_id,
            });
        }

        Ok(ChainSession {
            account,
            chain_id,
            contract: wallet.token_contract(self.token),
        })
    }

    /// 丢弃当前会话（钱包账户或网络变化后必须调用）
    pub fn reset_session(&mut self) {
        if !matches!(self.state, SessionState::Disconnected) {
            tracing::info!("Session reset");
        }
        self.state = SessionState::Disconnected;
    }

    /// 请求钱包切换到目标网络；钱包未添加该网络时先添加
    ///
    /// 由调用方决定何时触发，`ensure_session` 不会自动调用。
    pub async fn switch_network(&mut self) -> Result<(), TransferError> {
        let wallet = self.wallet.clone().ok_or_else(|| {
            TransferError::WalletUnavailable("MetaMask is not installed".to_string())
        })?;

        let chain_id = self.network.chain_id;
        if let Err(e) = wallet.switch_chain(chain_id).await {
            if !is_unrecognized_chain(&e) {
                return Err(connection_error(e));
            }
            tracing::info!(chain_id, "Chain unknown to wallet, adding network");
            wallet
                .add_chain(&self.network)
                .await
                .map_err(connection_error)?;
        }

        self.reset_session();
        Ok(())
    }
}

fn connection_error(e: ChainError) -> TransferError {
    if e.is_user_rejection() {
        TransferError::Chain(e)
    } else {
        tracing::warn!(error = %e, "Wallet request failed");
        TransferError::WalletConnection(e)
    }
}

fn is_unrecognized_chain(e: &ChainError) -> bool {
    e.message.contains(UNRECOGNIZED_CHAIN_CODE)
        || e.message.to_lowercase().contains("unrecognized chain")
}
