//! 代币合约诊断
//!
//! 查询 symbol / name / decimals，任何一项失败都不算错误，只记录日志。

use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::service::{chain_client::TokenContract, unit_converter};

/// 诊断结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractProbe {
    pub address: Address,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub decimals: u8,
}

impl ContractProbe {
    /// symbol() 和 name() 都失败时，合约很可能不是 ERC-20 或节点不可达
    pub fn looks_like_erc20(&self) -> bool {
        self.symbol.is_some() || self.name.is_some()
    }
}

pub async fn probe_contract(contract: &dyn TokenContract, default_decimals: u8) -> ContractProbe {
    let address = contract.address();

    let symbol = match contract.symbol().await {
        Ok(symbol) => Some(symbol),
        Err(e) => {
            tracing::warn!(token = ?address, error = %e, "Could not get token symbol");
            None
        }
    };

    let name = match contract.name().await {
        Ok(name) => Some(name),
        Err(e) => {
            tracing::warn!(token = ?address, error = %e, "Could not get token name");
            None
        }
    };

    let decimals = unit_converter::resolve_decimals(contract, default_decimals).await;

    tracing::info!(
        token = ?address,
        symbol = symbol.as_deref().unwrap_or("-"),
        name = name.as_deref().unwrap_or("-"),
        decimals,
        "Token contract probed"
    );

    ContractProbe {
        address,
        symbol,
        name,
        decimals,
    }
}
