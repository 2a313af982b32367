//! 转账预检
//!
//! 在任何资金移动之前执行的只读校验，按顺序短路：
//! 1. from / to 地址格式（含 EIP-55 校验和），from 必须是会话账户
//! 2. 金额为正
//! 3. 余额充足（按最小单位比较）
//! 4. 合约可达（再次只读调用 balanceOf）
//!
//! 只做只读 RPC 调用，可重复调用。

use ethers::types::{Address, U256};

use crate::{
    domain::{AddressField, TransferRequest, ValidationResult},
    error::{ConversionError, TransferError},
    service::{
        session_manager::ChainSession,
        unit_converter::{self, DecimalsCache},
    },
    utils::AddressValidator,
};

/// 通过预检的转账参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckedTransfer {
    pub from: Address,
    pub to: Address,
    /// 转账金额（最小单位）
    pub amount_raw: U256,
}

/// 预检器
#[derive(Debug, Clone)]
pub struct PreflightValidator {
    symbol: String,
}

impl PreflightValidator {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// 完整预检，返回第一个失败
    pub async fn check(
        &self,
        session: &ChainSession,
        request: &TransferRequest,
        decimals: &DecimalsCache,
    ) -> Result<CheckedTransfer, TransferError> {
        // 1. 地址格式
        let from = parse_address(&request.from_address, AddressField::From)?;
        let to = parse_address(&request.to_address, AddressField::To)?;

        // 签名者就是会话账户
        if from != session.account() {
            return Err(TransferError::AccountMismatch {
                from: request.from_address.clone(),
                account: AddressValidator::to_checksum(&session.account()),
            });
        }

        // 2. 金额
        if request.amount.is_sign_negative() && !request.amount.is_zero() {
            return Err(ConversionError::Negative(request.amount).into());
        }
        if request.amount.is_zero() {
            return Err(ConversionError::NotPositive.into());
        }

        // 3. 余额
        let contract = session.contract();
        let balance_raw = contract
            .balance_of(from)
            .await
            .map_err(TransferError::ContractUnreachable)?;
        let token_decimals = decimals.resolve(contract).await;
        let amount_raw = unit_converter::to_smallest_unit(request.amount, token_decimals)?;

        tracing::debug!(
            from = ?from,
            balance_raw = %balance_raw,
            amount_raw = %amount_raw,
            decimals = token_decimals,
            "Balance fetched"
        );

        if balance_raw < amount_raw {
            return Err(TransferError::InsufficientBalance {
                required: request.amount,
                available: unit_converter::from_smallest_unit_saturating(
                    balance_raw,
                    token_decimals,
                ),
                symbol: self.symbol.clone(),
            });
        }

        // 4. 合约可达
        contract
            .balance_of(from)
            .await
            .map_err(TransferError::ContractUnreachable)?;

        Ok(CheckedTransfer {
            from,
            to,
            amount_raw,
        })
    }

    /// 预检并转换为 `ValidationResult`
    pub async fn validate(
        &self,
        session: &ChainSession,
        request: &TransferRequest,
        decimals: &DecimalsCache,
    ) -> ValidationResult {
        match self.check(session, request, decimals).await {
            Ok(_) => ValidationResult::ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Preflight validation failed");
                ValidationResult::invalid(&e)
            }
        }
    }
}

fn parse_address(text: &str, field: AddressField) -> Result<Address, TransferError> {
    AddressValidator::parse(text).ok_or(TransferError::InvalidAddress { field })
}
