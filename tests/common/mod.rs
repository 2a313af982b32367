//! 测试辅助模块
//! 脚本化的钱包 / 代币合约 mock，记录每一次调用

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    str::FromStr,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use rust_decimal::Decimal;
use tokenpay::{
    config::{NativeCurrency, NetworkConfig, TokenConfig},
    error::ChainError,
    service::{
        unit_converter, SessionManager, TokenContract, TransferExecutor, TransferReceipt, Wallet,
    },
    utils::AddressValidator,
};

pub const BSC_CHAIN_ID: u64 = 56;
pub const TOKEN: &str = "0x046b82988a7113FCAd568B7102c7b823f4411385";
pub const SENDER: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const RECIPIENT: &str = "0x301a9B960F8bbD74609c51868d6bD1a27Ed2D7b2";
/// 校验和错误（正确形式为 0x742D35cc6634c0532925a3b844bc9E7595F0BEb6）
pub const BAD_CHECKSUM: &str = "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb6";

pub fn tx_hash() -> H256 {
    H256::repeat_byte(0x42)
}

pub fn addr(s: &str) -> Address {
    AddressValidator::parse(s).unwrap()
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// 人类可读金额 -> 最小单位
pub fn units(amount: &str, decimals: u8) -> U256 {
    unit_converter::to_smallest_unit(dec(amount), decimals).unwrap()
}

pub fn bsc() -> NetworkConfig {
    NetworkConfig {
        chain_id: BSC_CHAIN_ID,
        chain_name: "BSC Mainnet".into(),
        rpc_url: "https://bsc-dataseed.binance.org/".into(),
        native_currency: NativeCurrency {
            name: "BNB".into(),
            symbol: "BNB".into(),
            decimals: 18,
        },
        block_explorer: "https://bscscan.com".into(),
        confirmations: 1,
    }
}

pub fn dan() -> TokenConfig {
    TokenConfig {
        contract_address: TOKEN.into(),
        recipient_address: RECIPIENT.into(),
        symbol: "DAN".into(),
        default_decimals: 18,
    }
}

pub fn success_receipt() -> TransferReceipt {
    TransferReceipt {
        transaction_hash: tx_hash(),
        gas_used: U256::from(51_234u64),
        block_number: Some(40_000_000),
        status: Some(1),
    }
}

// ============ TokenContract mock ============

pub struct MockToken {
    address: Address,
    balance: Result<U256, ChainError>,
    /// 依次消费；用完后回到 `balance`
    balance_script: Mutex<VecDeque<Result<U256, ChainError>>>,
    decimals: Result<u8, ChainError>,
    gas: Result<U256, ChainError>,
    send: Result<H256, ChainError>,
    receipt: Result<Option<TransferReceipt>, ChainError>,
    calls: Mutex<Vec<&'static str>>,
    transfers: Mutex<Vec<(Address, U256)>>,
}

impl MockToken {
    pub fn new() -> Self {
        Self {
            address: addr(TOKEN),
            balance: Ok(units("100", 18)),
            balance_script: Mutex::new(VecDeque::new()),
            decimals: Ok(18),
            gas: Ok(U256::from(60_000u64)),
            send: Ok(tx_hash()),
            receipt: Ok(Some(success_receipt())),
            calls: Mutex::new(Vec::new()),
            transfers: Mutex::new(Vec::new()),
        }
    }

    pub fn with_balance(mut self, raw: U256) -> Self {
        self.balance = Ok(raw);
        self
    }

    pub fn with_balance_error(mut self, e: ChainError) -> Self {
        self.balance = Err(e);
        self
    }

    pub fn then_balance(self, result: Result<U256, ChainError>) -> Self {
        self.balance_script.lock().unwrap().push_back(result);
        self
    }

    pub fn with_decimals(mut self, result: Result<u8, ChainError>) -> Self {
        self.decimals = result;
        self
    }

    pub fn with_gas(mut self, result: Result<U256, ChainError>) -> Self {
        self.gas = result;
        self
    }

    pub fn with_send(mut self, result: Result<H256, ChainError>) -> Self {
        self.send = result;
        self
    }

    pub fn with_receipt(mut self, result: Result<Option<TransferReceipt>, ChainError>) -> Self {
        self.receipt = result;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    pub fn transfers(&self) -> Vec<(Address, U256)> {
        self.transfers.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl TokenContract for MockToken {
    fn address(&self) -> Address {
        self.address
    }

    async fn balance_of(&self, _owner: Address) -> Result<U256, ChainError> {
        self.record("balance_of");
        let scripted = self.balance_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.balance.clone())
    }

    async fn decimals(&self) -> Result<u8, ChainError> {
        self.record("decimals");
        self.decimals.clone()
    }

    async fn symbol(&self) -> Result<String, ChainError> {
        self.record("symbol");
        Ok("DAN".into())
    }

    async fn name(&self) -> Result<String, ChainError> {
        self.record("name");
        Err(ChainError::new("execution reverted"))
    }

    async fn estimate_transfer_gas(
        &self,
        _from: Address,
        _to: Address,
        _amount: U256,
    ) -> Result<U256, ChainError> {
        self.record("estimate_transfer_gas");
        self.gas.clone()
    }

    async fn transfer(&self, to: Address, amount: U256) -> Result<H256, ChainError> {
        self.record("transfer");
        self.transfers.lock().unwrap().push((to, amount));
        self.send.clone()
    }

    async fn wait_for_receipt(&self, _tx_hash: H256) -> Result<Option<TransferReceipt>, ChainError> {
        self.record("wait_for_receipt");
        self.receipt.clone()
    }
}

// ============ Wallet mock ============

pub struct MockWallet {
    accounts: Result<Vec<Address>, ChainError>,
    chain_id: Mutex<u64>,
    known_chains: Mutex<Vec<u64>>,
    token: Arc<MockToken>,
    calls: Mutex<Vec<&'static str>>,
}

impl MockWallet {
    pub fn new(token: Arc<MockToken>) -> Self {
        Self {
            accounts: Ok(vec![addr(SENDER)]),
            chain_id: Mutex::new(BSC_CHAIN_ID),
            known_chains: Mutex::new(vec![1, BSC_CHAIN_ID]),
            token,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_chain(self, chain_id: u64) -> Self {
        *self.chain_id.lock().unwrap() = chain_id;
        self
    }

    pub fn with_accounts(mut self, result: Result<Vec<Address>, ChainError>) -> Self {
        self.accounts = result;
        self
    }

    pub fn with_known_chains(self, chains: Vec<u64>) -> Self {
        *self.known_chains.lock().unwrap() = chains;
        self
    }

    pub fn current_chain(&self) -> u64 {
        *self.chain_id.lock().unwrap()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Wallet for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, ChainError> {
        self.record("request_accounts");
        self.accounts.clone()
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.record("chain_id");
        Ok(self.current_chain())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ChainError> {
        self.record("switch_chain");
        if !self.known_chains.lock().unwrap().contains(&chain_id) {
            return Err(ChainError::new(format!(
                "Unrecognized chain ID \"{:#x}\". Try adding the chain using wallet_addEthereumChain first. (code 4902)",
                chain_id
            )));
        }
        *self.chain_id.lock().unwrap() = chain_id;
        Ok(())
    }

    async fn add_chain(&self, network: &NetworkConfig) -> Result<(), ChainError> {
        self.record("add_chain");
        self.known_chains.lock().unwrap().push(network.chain_id);
        *self.chain_id.lock().unwrap() = network.chain_id;
        Ok(())
    }

    fn token_contract(&self, _token: Address) -> Arc<dyn TokenContract> {
        self.token.clone()
    }
}

// ============ 组装 ============

pub fn session_manager(wallet: Arc<MockWallet>) -> SessionManager {
    SessionManager::new(wallet, bsc(), addr(TOKEN))
}

pub fn executor(wallet: Arc<MockWallet>) -> TransferExecutor {
    TransferExecutor::new(session_manager(wallet), &dan())
}

/// 默认场景：BSC、余额 100 DAN、一切正常
pub fn setup(token: MockToken) -> (Arc<MockToken>, Arc<MockWallet>, TransferExecutor) {
    let token = Arc::new(token);
    let wallet = Arc::new(MockWallet::new(token.clone()));
    let executor = executor(wallet.clone());
    (token, wallet, executor)
}
