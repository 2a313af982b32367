//! 地址验证模块
//!
//! EVM 地址格式校验（EIP-55 Checksum）

use std::str::FromStr;

use ethers::types::Address;

/// 地址验证器
pub struct AddressValidator;

impl AddressValidator {
    /// 验证EVM地址
    ///
    /// - `0x` 前缀 + 40 个十六进制字符
    /// - 全小写或全大写：不做 checksum 校验
    /// - 大小写混合：必须满足 EIP-55 checksum
    pub fn is_valid_evm_address(address: &str) -> bool {
        // 1. 基本格式检查
        let Some(hex_part) = address.strip_prefix("0x") else {
            return false;
        };

        if hex_part.len() != 40 {
            return false;
        }

        // 2. 验证hex字符
        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }

        // 3. EIP-55 Checksum验证（仅大小写混合时）
        let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
        if has_upper && has_lower {
            return Self::verify_eip55_checksum(hex_part);
        }

        true
    }

    /// 解析为 ethers `Address`，格式不合法时返回 None
    pub fn parse(address: &str) -> Option<Address> {
        if !Self::is_valid_evm_address(address) {
            return None;
        }
        Address::from_str(address).ok()
    }

    /// 生成 EIP-55 格式的地址字符串
    pub fn to_checksum(address: &Address) -> String {
        let lower = hex::encode(address.as_bytes());
        let hash = Self::keccak(&lower);

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, ch) in lower.chars().enumerate() {
            if ch.is_ascii_alphabetic() && Self::nibble(&hash, i) >= 8 {
                out.push(ch.to_ascii_uppercase());
            } else {
                out.push(ch);
            }
        }
        out
    }

    /// 验证EIP-55 Checksum
    /// https://eips.ethereum.org/EIPS/eip-55
    fn verify_eip55_checksum(hex_part: &str) -> bool {
        let hash = Self::keccak(&hex_part.to_lowercase());

        hex_part.chars().enumerate().all(|(i, ch)| {
            if ch.is_ascii_alphabetic() {
                let should_be_uppercase = Self::nibble(&hash, i) >= 8;
                ch.is_ascii_uppercase() == should_be_uppercase
            } else {
                true
            }
        })
    }

    fn keccak(input: &str) -> [u8; 32] {
        use sha3::{Digest, Keccak256};

        let mut hasher = Keccak256::new();
        hasher.update(input.as_bytes());
        hasher.finalize().into()
    }

    fn nibble(hash: &[u8; 32], i: usize) -> u8 {
        let hash_byte = hash[i / 2];
        if i % 2 == 0 {
            hash_byte >> 4
        } else {
            hash_byte & 0x0f
        }
    }
}

/// 列表展示用的短地址：`0x1234...abcd`
pub fn short_address(address: &str) -> String {
    if address.is_empty() {
        return "-".to_string();
    }
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}
