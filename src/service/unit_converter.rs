//! 金额单位转换
//!
//! 人类可读金额（`Decimal`）与链上最小单位（`U256`）之间的精确转换。
//! 全程整数运算，不经过浮点数。

use ethers::types::U256;
use rust_decimal::{Decimal, RoundingStrategy};
use tokio::sync::OnceCell;

use crate::{error::ConversionError, service::chain_client::TokenContract};

/// decimals() 查询失败时的默认精度
pub const DEFAULT_DECIMALS: u8 = 18;

/// `Decimal` 最多支持 28 位小数
const MAX_DECIMAL_SCALE: u32 = 28;

/// 展示用最多保留的小数位
const DISPLAY_FRACTION_DIGITS: u32 = 4;

/// 解析边界输入的金额文本
pub fn parse_amount(text: &str) -> Result<Decimal, ConversionError> {
    let trimmed = text.trim();
    let amount = Decimal::from_str_exact(trimmed)
        .map_err(|_| ConversionError::Malformed(trimmed.to_string()))?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ConversionError::Negative(amount));
    }

    Ok(amount.normalize())
}

/// 人类可读金额 -> 最小单位
///
/// 小数位超过 `decimals` 时报错而不是截断，避免少付。
pub fn to_smallest_unit(amount: Decimal, decimals: u8) -> Result<U256, ConversionError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ConversionError::Negative(amount));
    }

    let amount = amount.normalize();
    let scale = amount.scale();
    let decimals = u32::from(decimals);
    if scale > decimals {
        return Err(ConversionError::ExcessPrecision { amount, decimals });
    }

    let mantissa = U256::from(amount.mantissa().unsigned_abs());
    let factor = U256::from(10u8)
        .checked_pow(U256::from(decimals - scale))
        .ok_or(ConversionError::Overflow)?;

    mantissa
        .checked_mul(factor)
        .ok_or(ConversionError::Overflow)
}

/// 最小单位 -> 人类可读金额
///
/// 超出 `Decimal` 表示范围的低位会被截断（只影响分辨率以下的位数）。
pub fn from_smallest_unit(raw: U256, decimals: u8) -> Result<Decimal, ConversionError> {
    let max_mantissa = U256::from(Decimal::MAX.mantissa().unsigned_abs());
    let mut raw = raw;
    let mut scale = u32::from(decimals);

    while scale > MAX_DECIMAL_SCALE || raw > max_mantissa {
        if scale == 0 {
            return Err(ConversionError::Overflow);
        }
        raw /= U256::from(10u8);
        scale -= 1;
    }

    let mantissa = i128::try_from(raw.as_u128()).map_err(|_| ConversionError::Overflow)?;
    Decimal::try_from_i128_with_scale(mantissa, scale)
        .map(|d| d.normalize())
        .map_err(|_| ConversionError::Overflow)
}

/// 最小单位 -> 人类可读金额（仅展示用），超出 `Decimal` 范围时饱和到 `Decimal::MAX`
pub fn from_smallest_unit_saturating(raw: U256, decimals: u8) -> Decimal {
    from_smallest_unit(raw, decimals).unwrap_or(Decimal::MAX)
}

/// 展示格式：千分位分隔，最多 4 位小数（en-US 风格）
pub fn format_amount(amount: &Decimal) -> String {
    let rounded = amount
        .round_dp_with_strategy(DISPLAY_FRACTION_DIGITS, RoundingStrategy::MidpointAwayFromZero)
        .normalize();

    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut out = String::with_capacity(text.len() + int_part.len() / 3 + 1);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// 查询合约精度，失败时回退到 `fallback` 并告警
pub async fn resolve_decimals(contract: &dyn TokenContract, fallback: u8) -> u8 {
    match contract.decimals().await {
        Ok(decimals) => {
            tracing::debug!(token = ?contract.address(), decimals, "Token decimals resolved");
            decimals
        }
        Err(e) => {
            tracing::warn!(
                token = ?contract.address(),
                fallback,
                error = %e,
                "⚠️ Failed to get decimals from contract, using default {}. Non-standard tokens may be mispriced",
                fallback
            );
            fallback
        }
    }
}

/// 单次请求内的精度缓存：同一请求只查询一次 decimals()
#[derive(Debug)]
pub struct DecimalsCache {
    cell: OnceCell<u8>,
    fallback: u8,
}

impl DecimalsCache {
    pub fn new(fallback: u8) -> Self {
        Self {
            cell: OnceCell::new(),
            fallback,
        }
    }

    pub async fn resolve(&self, contract: &dyn TokenContract) -> u8 {
        *self
            .cell
            .get_or_init(|| resolve_decimals(contract, self.fallback))
            .await
    }
}

impl Default for DecimalsCache {
    fn default() -> Self {
        Self::new(DEFAULT_DECIMALS)
    }
}
