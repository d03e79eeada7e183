use crate::{
    config::find_network,
    error::{AppError, Result},
    types::{Address, WEI_PER_ETH, Wei},
};

/// Shortens an address to `0x74...f44e`. Zero addresses read as "None".
pub fn format_address(address: Option<&Address>, length: usize) -> String {
    let Some(address) = address else {
        return "None".to_string();
    };
    if address.is_zero() {
        return "None".to_string();
    }

    let value = address.as_str();
    if value.len() < length * 2 + 3 {
        return value.to_string();
    }
    format!("{}...{}", &value[..length], &value[value.len() - length..])
}

/// Formats a wei amount as ether, truncated to `decimals` fractional digits.
pub fn format_eth(value: Option<Wei>, decimals: usize) -> String {
    let Some(value) = value else {
        return "0".to_string();
    };

    let whole = value / WEI_PER_ETH;
    let fraction = value % WEI_PER_ETH;
    if fraction == 0 {
        return format!("{whole}.0");
    }

    let digits = format!("{fraction:018}");
    let trimmed = digits.trim_end_matches('0');
    let shown = &trimmed[..trimmed.len().min(decimals.max(1))];
    format!("{whole}.{shown}")
}

/// Parses a decimal ether string ("0.01") into wei.
pub fn parse_eth(value: &str) -> Result<Wei> {
    let invalid = || AppError::Validation(format!("Invalid ether amount '{value}'"));

    let (whole, fraction) = value.trim().split_once('.').unwrap_or((value.trim(), ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if fraction.len() > 18 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole: Wei = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let fraction: Wei = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<18}").parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(WEI_PER_ETH)
        .and_then(|wei| wei.checked_add(fraction))
        .ok_or_else(invalid)
}

pub fn network_name(chain_id: u64) -> &'static str {
    find_network(chain_id)
        .map(|network| network.name)
        .unwrap_or("Unknown Network")
}

pub fn explorer_url(chain_id: u64, address: &Address) -> Option<String> {
    find_network(chain_id).map(|network| format!("{}/address/{}", network.block_explorer, address))
}

pub fn tx_explorer_url(chain_id: u64, tx_hash: &str) -> Option<String> {
    find_network(chain_id).map(|network| format!("{}/tx/{}", network.block_explorer, tx_hash))
}
