//! 失败分类器
//!
//! 把钱包 / RPC 的原始错误映射到有限的用户可读类别。
//! 纯函数、全覆盖：任何错误都恰好落到一个类别。
//!
//! 外部钱包和节点没有稳定的结构化错误码，这里保留子串匹配规则表，
//! 新类别直接往 `MESSAGE_RULES` 里加。

use serde::{Deserialize, Serialize};

use crate::error::{ChainError, TransferError};

/// 失败类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    // 连接阶段
    WalletUnavailable,
    NetworkMismatch,
    // 校验阶段
    InvalidAddress,
    InvalidAmount,
    InsufficientBalance,
    ContractUnreachable,
    // 执行阶段
    InsufficientFunds,
    UserCancelled,
    GasFailure,
    ContractRevert,
    ReceiptUnavailable,
    Unknown,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::WalletUnavailable => "wallet_unavailable",
            FailureReason::NetworkMismatch => "network_mismatch",
            FailureReason::InvalidAddress => "invalid_address",
            FailureReason::InvalidAmount => "invalid_amount",
            FailureReason::InsufficientBalance => "insufficient_balance",
            FailureReason::ContractUnreachable => "contract_unreachable",
            FailureReason::InsufficientFunds => "insufficient_funds",
            FailureReason::UserCancelled => "user_cancelled",
            FailureReason::GasFailure => "gas_failure",
            FailureReason::ContractRevert => "contract_revert",
            FailureReason::ReceiptUnavailable => "receipt_unavailable",
            FailureReason::Unknown => "unknown",
        }
    }
}

/// 分类结果：类别 + 可直接展示的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub reason: FailureReason,
    pub message: String,
}

impl Classification {
    fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

struct MessageRule {
    /// 小写子串
    needle: &'static str,
    reason: FailureReason,
    message: &'static str,
}

/// 按顺序匹配，先命中者生效
const MESSAGE_RULES: &[MessageRule] = &[
    MessageRule {
        needle: "insufficient funds",
        reason: FailureReason::InsufficientFunds,
        message: "Insufficient balance for transaction",
    },
    MessageRule {
        needle: "user rejected",
        reason: FailureReason::UserCancelled,
        message: "Transaction cancelled by user",
    },
    MessageRule {
        needle: "gas",
        reason: FailureReason::GasFailure,
        message: "Gas estimation failed or out of gas",
    },
];

const GENERIC_REVERT_MESSAGE: &str = "Contract call failed - the contract may not support this function or the network connection failed";

/// 原始链错误分类
pub fn classify_chain_error(error: &ChainError) -> Classification {
    let lowered = error.message.to_lowercase();

    if let Some(rule) = MESSAGE_RULES
        .iter()
        .find(|rule| lowered.contains(rule.needle))
    {
        return Classification::new(rule.reason, rule.message);
    }

    if error.is_call_exception() {
        let message = match (&error.reason, &error.data) {
            (Some(reason), _) => format!("Contract call failed: {}", reason),
            (None, Some(data)) => format!("Contract call failed with data: {}", data),
            (None, None) => GENERIC_REVERT_MESSAGE.to_string(),
        };
        return Classification::new(FailureReason::ContractRevert, message);
    }

    Classification::new(FailureReason::Unknown, error.message.clone())
}

/// 流水线错误分类
pub fn classify(error: &TransferError) -> Classification {
    match error {
        TransferError::WalletUnavailable(_) | TransferError::WalletConnection(_) => {
            Classification::new(FailureReason::WalletUnavailable, error.to_string())
        }
        TransferError::NetworkMismatch { .. } => {
            Classification::new(FailureReason::NetworkMismatch, error.to_string())
        }
        TransferError::InvalidAddress { .. } | TransferError::AccountMismatch { .. } => {
            Classification::new(FailureReason::InvalidAddress, error.to_string())
        }
        TransferError::InvalidAmount(_) => {
            Classification::new(FailureReason::InvalidAmount, error.to_string())
        }
        TransferError::InsufficientBalance { .. } => {
            Classification::new(FailureReason::InsufficientBalance, error.to_string())
        }
        TransferError::ContractUnreachable(_) => {
            Classification::new(FailureReason::ContractUnreachable, error.to_string())
        }
        TransferError::ReceiptUnavailable { .. } => Classification::new(
            FailureReason::ReceiptUnavailable,
            "Transaction receipt not available",
        ),
        TransferError::Chain(e) => classify_chain_error(e),
    }
}
