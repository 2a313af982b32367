//! tokenpay 主入口
//!
//! 用法：
//!   tokenpay pay [AMOUNT]          支付 AMOUNT 个代币到配置的收款地址
//!                                  （省略时按 TOKEN_PRICE_USD 与固定法币金额报价）
//!   tokenpay validate AMOUNT       只做预检
//!   tokenpay probe                 合约诊断（symbol / name / decimals）
//!   tokenpay list [LIMIT]          最近的购买记录（需要 DATABASE_URL）
//!   tokenpay mark-received ID      标记已收到（需要 DATABASE_URL）

use std::{str::FromStr, sync::Arc};

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use tokenpay::{
    config::Config,
    domain::{PurchaseContact, PurchaseRecord, TransferRequest},
    infrastructure::{db, logging},
    repository::{PgPurchaseRepository, PurchaseRepository},
    service::{
        contract_probe, ethers_client::EthersWallet, pricing, unit_converter, SessionManager,
        TransferExecutor, Wallet,
    },
    utils::AddressValidator,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载环境变量与配置
    dotenvy::dotenv().ok();
    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;
    config.validate()?;

    // 2. 初始化日志（guard 持有到进程退出）；配置不可用时回退到默认配置
    let _log_guard = match logging::init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging config rejected ({:#}), using defaults", e);
            logging::init_default_logging()
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("pay");

    match command {
        "pay" => pay(&config, args.get(1).map(String::as_str)).await,
        "validate" => {
            let amount = args.get(1).context("Usage: tokenpay validate AMOUNT")?;
            validate(&config, amount).await
        }
        "probe" => probe(&config).await,
        "list" => {
            let limit = match args.get(1) {
                Some(s) => s.parse().context("LIMIT must be an integer")?,
                None => 50,
            };
            list(&config, limit).await
        }
        "mark-received" => {
            let id = args.get(1).context("Usage: tokenpay mark-received ID")?;
            mark_received(&config, Uuid::parse_str(id).context("Invalid record id")?).await
        }
        other => bail!("Unknown command: {}", other),
    }
}

fn load_wallet(config: &Config) -> Result<Arc<EthersWallet>> {
    let private_key = std::env::var("PRIVATE_KEY").context("PRIVATE_KEY must be set")?;
    Ok(Arc::new(EthersWallet::from_private_key(
        &config.network,
        &private_key,
    )?))
}

fn build_executor(config: &Config, wallet: Arc<EthersWallet>) -> Result<TransferExecutor> {
    let token = AddressValidator::parse(&config.token.contract_address)
        .context("Invalid token contract address")?;
    let sessions = SessionManager::new(wallet, config.network.clone(), token);
    Ok(TransferExecutor::new(sessions, &config.token))
}

async fn resolve_amount(config: &Config, wallet: &EthersWallet, arg: Option<&str>) -> Result<Decimal> {
    if let Some(text) = arg {
        return Ok(unit_converter::parse_amount(text)?);
    }

    let price = std::env::var("TOKEN_PRICE_USD")
        .context("AMOUNT argument or TOKEN_PRICE_USD is required")?;
    let price = Decimal::from_str(price.trim()).context("TOKEN_PRICE_USD is not a decimal")?;

    let token = AddressValidator::parse(&config.token.contract_address)
        .context("Invalid token contract address")?;
    let contract = wallet.token_contract(token);
    let decimals = unit_converter::resolve_decimals(contract.as_ref(), config.token.default_decimals).await;
    let quote = pricing::quote(&config.pricing, price, decimals)?;

    tracing::info!(
        fiat = %quote.fiat_amount,
        currency = %config.pricing.fiat_currency,
        usd = %quote.usd_amount.round_dp(2),
        token_price_usd = %quote.token_price_usd,
        token_amount = %quote.token_amount,
        "Quote computed"
    );
    Ok(quote.token_amount)
}

async fn pay(config: &Config, amount_arg: Option<&str>) -> Result<()> {
    let wallet = load_wallet(config)?;
    let amount = resolve_amount(config, &wallet, amount_arg).await?;
    let from = AddressValidator::to_checksum(&wallet.address());

    let mut executor = build_executor(config, wallet)?;
    let request = TransferRequest::new(from, config.token.recipient_address.clone(), amount);

    let outcome = executor.transfer(&request).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if let Some(reason) = outcome.failure_reason() {
        bail!("Transfer failed: {}", reason.as_str());
    }

    let contact = PurchaseContact {
        email: std::env::var("BUYER_EMAIL").ok(),
        phone_number: std::env::var("BUYER_PHONE").unwrap_or_default(),
    };
    let Some(record) =
        PurchaseRecord::from_success(&outcome, &request, &contact, config.pricing.fiat_amount)
    else {
        return Ok(());
    };

    if config.database.url.is_none() {
        tracing::warn!(
            tx_hash = %record.transaction_hash,
            "DATABASE_URL not set, purchase not recorded"
        );
        return Ok(());
    }

    let pool = db::init_pool(&config.database).await?;
    db::run_migrations(&pool).await?;
    PgPurchaseRepository::new(pool).insert(&record).await?;
    println!("{}", record.explorer_url(&config.network.block_explorer));
    Ok(())
}

async fn validate(config: &Config, amount: &str) -> Result<()> {
    let wallet = load_wallet(config)?;
    let from = AddressValidator::to_checksum(&wallet.address());
    let mut executor = build_executor(config, wallet)?;

    let request = TransferRequest::parse(from, config.token.recipient_address.clone(), amount)?;
    let result = executor.validate(&request).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn probe(config: &Config) -> Result<()> {
    let wallet = load_wallet(config)?;
    let token = AddressValidator::parse(&config.token.contract_address)
        .context("Invalid token contract address")?;
    let contract = wallet.token_contract(token);

    let probe = contract_probe::probe_contract(contract.as_ref(), config.token.default_decimals).await;
    if !probe.looks_like_erc20() {
        tracing::warn!(token = ?token, "⚠️ Contract did not answer symbol() or name()");
    }
    println!("{}", serde_json::to_string_pretty(&probe)?);
    Ok(())
}

async fn list(config: &Config, limit: i64) -> Result<()> {
    let pool = db::init_pool(&config.database).await?;
    let repo = PgPurchaseRepository::new(pool);

    for r in repo.list_recent(limit).await? {
        println!(
            "{}  {}  {}  {} {}  {} {}  {}  {}",
            r.id,
            r.created_at.format("%Y-%m-%d %H:%M"),
            r.display_wallet(),
            unit_converter::format_amount(&r.token_amount),
            config.token.symbol,
            r.fiat_amount,
            config.pricing.fiat_currency,
            if r.is_received { "received" } else { "pending" },
            r.explorer_url(&config.network.block_explorer),
        );
    }
    Ok(())
}

async fn mark_received(config: &Config, id: Uuid) -> Result<()> {
    let pool = db::init_pool(&config.database).await?;
    if !PgPurchaseRepository::new(pool).mark_received(id).await? {
        bail!("No purchase record with id {}", id);
    }
    tracing::info!(%id, "✅ Purchase marked as received");
    Ok(())
}
