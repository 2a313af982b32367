//! 固定法币价格换算
//!
//! 价格源本身在外部；这里只负责把固定的 THB 金额换算成 USD，
//! 再按调用方给出的代币 USD 单价算出需要支付的代币数量。

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{config::PricingConfig, error::ConversionError};

/// 一笔固定价格购买的报价
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub fiat_amount: Decimal,
    pub usd_amount: Decimal,
    pub token_price_usd: Decimal,
    pub token_amount: Decimal,
}

/// 固定法币金额折合的 USD
pub fn fiat_amount_usd(pricing: &PricingConfig) -> Result<Decimal, ConversionError> {
    if pricing.thb_per_usd <= Decimal::ZERO {
        return Err(ConversionError::NotPositive);
    }
    pricing
        .fiat_amount
        .checked_div(pricing.thb_per_usd)
        .ok_or(ConversionError::Overflow)
}

/// 按代币 USD 单价计算支付数量
///
/// 向上取整到代币精度，收款方不会少收。
pub fn quote(
    pricing: &PricingConfig,
    token_price_usd: Decimal,
    token_decimals: u8,
) -> Result<Quote, ConversionError> {
    if token_price_usd <= Decimal::ZERO {
        return Err(ConversionError::NotPositive);
    }

    let usd_amount = fiat_amount_usd(pricing)?;
    let exact = usd_amount
        .checked_div(token_price_usd)
        .ok_or(ConversionError::Overflow)?;
    // Decimal 最多 28 位小数
    let dp = u32::from(token_decimals).min(28);
    let token_amount = exact
        .round_dp_with_strategy(dp, RoundingStrategy::AwayFromZero)
        .normalize();

    Ok(Quote {
        fiat_amount: pricing.fiat_amount,
        usd_amount,
        token_price_usd,
        token_amount,
    })
}
