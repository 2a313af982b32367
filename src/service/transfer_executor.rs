//! 转账执行器
//!
//! 流水线：会话 -> 预检（含单位转换）-> Gas 估算（仅诊断）-> 发送 -> 等待回执。
//! 任一阶段失败立即短路，返回结构化的 `TransferOutcome::Failure`，不会产生部分转账。
//!
//! 并发约束：`transfer` 需要 `&mut self`，同一会话同一时刻只有一笔在途转账。

use ethers::types::H256;
use rust_decimal::Decimal;

use crate::{
    config::TokenConfig,
    domain::{TransferOutcome, TransferRequest, ValidationResult},
    error::{ChainError, TransferError},
    service::{
        chain_client::TransferReceipt,
        failure_classifier,
        preflight_validator::{CheckedTransfer, PreflightValidator},
        session_manager::SessionManager,
        unit_converter::{self, DecimalsCache},
    },
};

/// 转账执行器
pub struct TransferExecutor {
    sessions: SessionManager,
    validator: PreflightValidator,
    default_decimals: u8,
}

impl TransferExecutor {
    pub fn new(sessions: SessionManager, token: &TokenConfig) -> Self {
        Self {
            sessions,
            validator: PreflightValidator::new(token.symbol.clone()),
            default_decimals: token.default_decimals,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// 钱包账户或网络变化后由调用方重置 / 切换网络
    pub fn sessions_mut(&mut self) -> &mut SessionManager {
        &mut self.sessions
    }

    pub fn symbol(&self) -> &str {
        self.validator.symbol()
    }

    /// 只读预检（提交前给调用方反馈）
    pub async fn validate(&mut self, request: &TransferRequest) -> ValidationResult {
        let session = match self.sessions.ensure_session().await {
            Ok(session) => session,
            Err(e) => return ValidationResult::invalid(&e),
        };
        let decimals = DecimalsCache::new(self.default_decimals);
        self.validator.validate(&session, request, &decimals).await
    }

    /// 执行转账，日志上下文为 "Direct Transfer (...)"
    pub async fn transfer(&mut self, request: &TransferRequest) -> TransferOutcome {
        let context = format!(
            "Direct Transfer ({} {} to {})",
            request.amount.normalize(),
            self.symbol(),
            request.to_address
        );
        self.transfer_with_context(request, &context).await
    }

    /// 执行转账，每一步日志都带上 `context`
    pub async fn transfer_with_context(
        &mut self,
        request: &TransferRequest,
        context: &str,
    ) -> TransferOutcome {
        match self.run(request, context).await {
            Ok(receipt) => TransferOutcome::Success {
                transaction_hash: receipt.transaction_hash,
                gas_used: receipt.gas_used,
            },
            Err(e) => {
                let classification = failure_classifier::classify(&e);
                tracing::error!(
                    context = %context,
                    reason = classification.reason.as_str(),
                    error = ?e,
                    "❌ Transfer failed: {}",
                    classification.message
                );
                classification.into()
            }
        }
    }

    async fn run(
        &mut self,
        request: &TransferRequest,
        context: &str,
    ) -> Result<TransferReceipt, TransferError> {
        let session = self.sessions.ensure_session().await?;
        let contract = session.contract();
        let decimals = DecimalsCache::new(self.default_decimals);

        tracing::info!(context = %context, "Validating transfer...");
        let CheckedTransfer {
            from,
            to,
            amount_raw,
            ..
        } = self.validator.check(&session, request, &decimals).await?;
        tracing::info!(
            context = %context,
            amount = %request.amount,
            amount_raw = %amount_raw,
            "Amount converted"
        );

        // Gas 估算只用于诊断，失败不阻塞提交
        match contract.estimate_transfer_gas(from, to, amount_raw).await {
            Ok(gas) => tracing::info!(context = %context, gas = %gas, "Estimated gas"),
            Err(e) => tracing::warn!(
                context = %context,
                error = %e,
                "⚠️ Gas estimation failed, submitting anyway"
            ),
        }

        tracing::info!(context = %context, from = ?from, to = ?to, "Initiating transaction...");
        let tx_hash = contract.transfer(to, amount_raw).await?;

        tracing::info!(
            context = %context,
            tx_hash = ?tx_hash,
            "Transaction sent, waiting for confirmation..."
        );
        let receipt = contract
            .wait_for_receipt(tx_hash)
            .await?
            .ok_or(TransferError::ReceiptUnavailable { tx_hash })?;

        if receipt.is_reverted() {
            return Err(reverted(tx_hash).into());
        }

        tracing::info!(
            context = %context,
            tx_hash = ?receipt.transaction_hash,
            gas_used = %receipt.gas_used,
            block = ?receipt.block_number,
            "✅ Transaction confirmed - {:?}",
            receipt.transaction_hash
        );
        Ok(receipt)
    }

    /// 当前会话账户的人类可读余额（运营展示用）
    pub async fn balance(&mut self) -> Result<Decimal, TransferError> {
        let session = self.sessions.ensure_session().await?;
        let contract = session.contract();
        let raw = contract
            .balance_of(session.account())
            .await
            .map_err(TransferError::ContractUnreachable)?;
        let decimals = DecimalsCache::new(self.default_decimals)
            .resolve(contract)
            .await;
        Ok(unit_converter::from_smallest_unit_saturating(raw, decimals))
    }
}

fn reverted(tx_hash: H256) -> ChainError {
    ChainError::call_exception(
        format!("transaction {:?} reverted (status 0)", tx_hash),
        Some("execution reverted".to_string()),
        None,
    )
}
