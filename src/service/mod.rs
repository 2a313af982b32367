// 转账流水线（叶子 -> 根）
pub mod chain_client;
pub mod failure_classifier;
pub mod preflight_validator;
pub mod session_manager;
pub mod transfer_executor;
pub mod unit_converter;

// 外围能力
pub mod contract_probe;
pub mod ethers_client; // ethers-rs 生产实现
pub mod pricing;

pub use chain_client::{TokenContract, TransferReceipt, Wallet};
pub use failure_classifier::{Classification, FailureReason};
pub use preflight_validator::PreflightValidator;
pub use session_manager::{ChainSession, SessionManager, SessionState};
pub use transfer_executor::TransferExecutor;
