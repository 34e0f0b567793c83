// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Amount parsing, formatting and validation
//!
//! Users type whole-unit decimals ("1.5"); contracts see base units scaled by
//! the asset's decimals. Every range check runs on the scaled value.

use ethers::types::U256;
use ethers::utils::{format_units as ethers_format_units, parse_units as ethers_parse_units};

use crate::error::BridgeError;

/// Parse a non-negative decimal string into base units
pub fn parse_units(input: &str, decimals: u8) -> Result<U256, BridgeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(BridgeError::InvalidAmount("amount is empty".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(BridgeError::InvalidAmount(format!(
            "{} is negative",
            trimmed
        )));
    }

    let parsed = ethers_parse_units(trimmed, decimals as u32)
        .map_err(|e| BridgeError::InvalidAmount(format!("{}: {}", trimmed, e)))?;
    Ok(parsed.into())
}

/// Base units back to a decimal string without trailing zeros
pub fn format_units(amount: U256, decimals: u8) -> String {
    let formatted = match ethers_format_units(amount, decimals as u32) {
        Ok(s) => s,
        Err(_) => return amount.to_string(),
    };
    if !formatted.contains('.') {
        return formatted;
    }
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

pub fn ensure_positive(amount: U256) -> Result<(), BridgeError> {
    if amount.is_zero() {
        return Err(BridgeError::InvalidAmount(
            "amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// `0 < amount <= ceiling`, the range a confidential integer of `bits` can hold
pub fn ensure_confidential(amount: U256, ceiling: U256, bits: u32) -> Result<(), BridgeError> {
    ensure_positive(amount)?;
    if amount > ceiling {
        return Err(BridgeError::AmountOutOfRange { amount, bits });
    }
    Ok(())
}
