//! 转账请求与结果模型

use std::fmt;

use ethers::types::{H256, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConversionError, TransferError},
    service::{
        failure_classifier::{self, Classification, FailureReason},
        unit_converter,
    },
};

/// 地址字段（用于指明哪个地址不合法）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressField {
    From,
    To,
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressField::From => write!(f, "from"),
            AddressField::To => write!(f, "to"),
        }
    }
}

/// 转账请求
///
/// `amount` 始终是人类可读单位（例如 12.5 DAN），不是链上最小单位。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_address: String,
    pub to_address: String,
    pub amount: Decimal,
}

impl TransferRequest {
    pub fn new(
        from_address: impl Into<String>,
        to_address: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            from_address: from_address.into(),
            to_address: to_address.into(),
            amount,
        }
    }

    /// 从文本金额构建请求（边界输入）
    pub fn parse(
        from_address: impl Into<String>,
        to_address: impl Into<String>,
        amount: &str,
    ) -> Result<Self, ConversionError> {
        let amount = unit_converter::parse_amount(amount)?;
        Ok(Self::new(from_address, to_address, amount))
    }
}

/// 转账结果：成功或失败，二者只有一个
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferOutcome {
    Success {
        transaction_hash: H256,
        gas_used: U256,
    },
    Failure {
        reason: FailureReason,
        message: String,
    },
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success { .. })
    }

    pub fn transaction_hash(&self) -> Option<H256> {
        match self {
            TransferOutcome::Success {
                transaction_hash, ..
            } => Some(*transaction_hash),
            TransferOutcome::Failure { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            TransferOutcome::Success { .. } => None,
            TransferOutcome::Failure { reason, .. } => Some(*reason),
        }
    }
}

impl From<Classification> for TransferOutcome {
    fn from(c: Classification) -> Self {
        TransferOutcome::Failure {
            reason: c.reason,
            message: c.message,
        }
    }
}

/// 预检结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
            reason: None,
        }
    }

    pub fn invalid(error: &TransferError) -> Self {
        let c = failure_classifier::classify(error);
        Self {
            valid: false,
            error: Some(c.message),
            reason: Some(c.reason),
        }
    }
}

impl From<Result<(), TransferError>> for ValidationResult {
    fn from(result: Result<(), TransferError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::invalid(&e),
        }
    }
}
