//! 购买记录模型
//!
//! 转账成功后产出的对账记录，由存储层持久化，运营人员对账后把 `is_received` 置为 true。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transfer::{TransferOutcome, TransferRequest};
use crate::utils::address_validator::short_address;

/// 买家联系方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseContact {
    pub email: Option<String>,
    pub phone_number: String,
}

/// 购买记录（transactions 表的一行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub id: Uuid,
    pub wallet_address: String,
    pub email: Option<String>,
    pub phone_number: String,
    pub transaction_hash: String,
    /// 实际发送的代币数量（人类可读单位）
    pub token_amount: Decimal,
    /// 对应的法币金额
    pub fiat_amount: Decimal,
    pub is_received: bool,
    pub created_at: DateTime<Utc>,
}

impl PurchaseRecord {
    /// 仅在转账成功时生成记录；`is_received` 初始为 false
    pub fn from_success(
        outcome: &TransferOutcome,
        request: &TransferRequest,
        contact: &PurchaseContact,
        fiat_amount: Decimal,
    ) -> Option<Self> {
        let tx_hash = outcome.transaction_hash()?;

        Some(Self {
            id: Uuid::new_v4(),
            wallet_address: request.from_address.clone(),
            email: contact
                .email
                .as_ref()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            phone_number: contact.phone_number.trim().to_string(),
            transaction_hash: format!("{:?}", tx_hash),
            token_amount: request.amount,
            fiat_amount,
            is_received: false,
            created_at: Utc::now(),
        })
    }

    /// 运营列表中展示的短地址
    pub fn display_wallet(&self) -> String {
        short_address(&self.wallet_address)
    }

    /// 区块浏览器链接
    pub fn explorer_url(&self, block_explorer: &str) -> String {
        format!(
            "{}/tx/{}",
            block_explorer.trim_end_matches('/'),
            self.transaction_hash
        )
    }
}
