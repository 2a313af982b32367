//! tokenpay - 固定价格 ERC-20 代币支付
//!
//! 把"从钱包 A 向地址 B 支付 X 个代币 T"变成一笔经过预检、提交、确认
//! （或干净失败）的链上交易，并产出供人工对账的购买记录。

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod repository;
pub mod service;
pub mod utils;

pub use error::{ChainError, ConversionError, TransferError};

