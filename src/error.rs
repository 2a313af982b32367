//! 转账流水线错误类型
//!
//! - `ConversionError`：人类可读金额 <-> 最小单位转换失败
//! - `ChainError`：钱包 / RPC 返回的原始错误（交给分类器处理）
//! - `TransferError`：按阶段划分的流水线错误

use ethers::types::H256;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    domain::AddressField,
    service::{
        failure_classifier::{self, FailureReason},
        unit_converter::format_amount,
    },
};

/// 单位转换错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("Amount must not be negative: {0}")]
    Negative(Decimal),

    #[error("Amount must be greater than zero")]
    NotPositive,

    #[error("Amount is not a finite decimal number: {0}")]
    Malformed(String),

    #[error("Amount {amount} has more fractional digits than the token supports ({decimals})")]
    ExcessPrecision { amount: Decimal, decimals: u32 },

    #[error("Amount overflows the token's integer range")]
    Overflow,
}

/// 钱包 / RPC 层原始错误
///
/// 外部钱包和节点不提供稳定的结构化错误码，分类依赖 `message` 子串匹配；
/// RPC 适配器识别出 revert 时会设置 `call_exception` 并尽量带上 reason / data。
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ChainError {
    pub message: String,
    pub call_exception: bool,
    pub reason: Option<String>,
    pub data: Option<String>,
}

impl ChainError {
    pub const CALL_EXCEPTION: &'static str = "CALL_EXCEPTION";

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// 合约调用异常（revert）
    pub fn call_exception(
        message: impl Into<String>,
        reason: Option<String>,
        data: Option<String>,
    ) -> Self {
        Self {
            message: message.into(),
            call_exception: true,
            reason: reason.filter(|r| !r.is_empty()),
            data: data.filter(|d| !d.is_empty() && d != "0x"),
        }
    }

    pub fn is_call_exception(&self) -> bool {
        self.call_exception || self.message.contains(Self::CALL_EXCEPTION)
    }

    pub fn is_user_rejection(&self) -> bool {
        self.message.to_lowercase().contains("user rejected")
    }
}

/// 转账流水线错误（按阶段）
#[derive(Debug, Clone, Error)]
pub enum TransferError {
    // === 连接阶段 ===
    #[error("{0}")]
    WalletUnavailable(String),

    /// 钱包 / 节点连接失败；原始错误只进日志
    #[error("Wallet connection failed")]
    WalletConnection(#[source] ChainError),

    #[error("Please switch to {expected_name}")]
    NetworkMismatch {
        expected_chain_id: u64,
        expected_name: String,
        actual_chain_id: u64,
    },

    // === 校验阶段 ===
    #[error("Invalid {field} address")]
    InvalidAddress { field: AddressField },

    #[error("From address {from} does not match the connected wallet account {account}")]
    AccountMismatch { from: String, account: String },

    #[error(transparent)]
    InvalidAmount(#[from] ConversionError),

    #[error(
        "Insufficient balance. Required: {} {}, Available: {} {}",
        .required.normalize(),
        .symbol,
        format_amount(.available),
        .symbol
    )]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
        symbol: String,
    },

    #[error("Token contract not accessible")]
    ContractUnreachable(#[source] ChainError),

    // === 执行阶段 ===
    #[error("Transaction receipt not available for {tx_hash:?}")]
    ReceiptUnavailable { tx_hash: H256 },

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl TransferError {
    /// 失败类别
    pub fn reason(&self) -> FailureReason {
        failure_classifier::classify(self).reason
    }

    /// 可直接展示给用户的消息（不含原始 RPC 细节）
    pub fn user_message(&self) -> String {
        failure_classifier::classify(self).message
    }
}
