//! Domain 模块
//!
//! 转账请求 / 结果 / 购买记录等领域模型

pub mod purchase;
pub mod transfer;

// 重新导出常用类型
pub use purchase::{PurchaseContact, PurchaseRecord};
pub use transfer::{AddressField, TransferOutcome, TransferRequest, ValidationResult};
