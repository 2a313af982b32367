//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::address_validator::AddressValidator;

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub token: TokenConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// 目标网络配置（默认 BSC Mainnet）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_url: String,
    pub native_currency: NativeCurrency,
    pub block_explorer: String,
    /// 等待回执时要求的确认数
    #[serde(default = "default_confirmations")]
    pub confirmations: usize,
}

/// 原生币信息（用于 wallet_addEthereumChain）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// 代币与收款方配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub contract_address: String,
    pub recipient_address: String,
    pub symbol: String,
    /// decimals() 查询失败时使用的精度
    pub default_decimals: u8,
}

/// 定价配置：固定法币金额
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    pub fiat_amount: Decimal,
    pub fiat_currency: String,
    /// 1 USD ≈ thb_per_usd THB
    pub thb_per_usd: Decimal,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub enable_file_logging: bool,
    pub log_file_path: Option<String>,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

fn default_confirmations() -> usize {
    1
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: env_parse("CHAIN_ID").unwrap_or(56),
            chain_name: env_or("CHAIN_NAME", "BSC Mainnet"),
            rpc_url: env_or("RPC_URL", "https://bsc-dataseed.binance.org/"),
            native_currency: NativeCurrency {
                name: "BNB".into(),
                symbol: "BNB".into(),
                decimals: 18,
            },
            block_explorer: env_or("BLOCK_EXPLORER", "https://bscscan.com"),
            confirmations: env_parse("TX_CONFIRMATIONS").unwrap_or_else(default_confirmations),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            contract_address: env_or(
                "TOKEN_ADDRESS",
                "0x046b82988a7113FCAd568B7102c7b823f4411385",
            ),
            recipient_address: env_or(
                "RECIPIENT_ADDRESS",
                "0x301a9B960F8bbD74609c51868d6bD1a27Ed2D7b2",
            ),
            symbol: env_or("TOKEN_SYMBOL", "DAN"),
            default_decimals: env_parse("TOKEN_DEFAULT_DECIMALS").unwrap_or(18),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            fiat_amount: env_parse("FIAT_AMOUNT").unwrap_or_else(|| Decimal::from(200)),
            fiat_currency: env_or("FIAT_CURRENCY", "THB"),
            thb_per_usd: env_parse("THB_PER_USD").unwrap_or_else(|| Decimal::from(35)),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: env_or("LOG_LEVEL", "info"),
            format: env_or("LOG_FORMAT", "text"),
            enable_file_logging: std::env::var("LOG_FILE_ENABLED")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
            log_file_path: std::env::var("LOG_FILE_PATH").ok(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL").ok(),
            max_connections: env_parse("DB_MAX_CONNS").unwrap_or(5),
            min_connections: env_parse("DB_MIN_CONNS").unwrap_or(1),
            acquire_timeout_secs: env_parse("DB_ACQ_TIMEOUT_SECS").unwrap_or(5),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            network: NetworkConfig::default(),
            token: TokenConfig::default(),
            pricing: PricingConfig::default(),
            logging: LoggingConfig::default(),
            database: DatabaseConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) if path.as_ref().exists() => Self::from_file(path),
            _ => Self::from_env(),
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if self.network.chain_id == 0 {
            anyhow::bail!("CHAIN_ID must be non-zero");
        }

        if !AddressValidator::is_valid_evm_address(&self.token.contract_address) {
            anyhow::bail!(
                "TOKEN_ADDRESS is not a valid address: {}",
                self.token.contract_address
            );
        }
        if !AddressValidator::is_valid_evm_address(&self.token.recipient_address) {
            anyhow::bail!(
                "RECIPIENT_ADDRESS is not a valid address: {}",
                self.token.recipient_address
            );
        }

        if self.pricing.fiat_amount <= Decimal::ZERO || self.pricing.thb_per_usd <= Decimal::ZERO {
            anyhow::bail!("FIAT_AMOUNT and THB_PER_USD must be positive");
        }

        // 验证日志级别
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        // 验证日志格式
        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        if let Some(url) = &self.database.url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                anyhow::bail!("DATABASE_URL must start with postgres:// or postgresql://");
            }
        }

        Ok(())
    }
}
