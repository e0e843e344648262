//! Amount conversions. Integer arithmetic only; no floats touch money.

use crate::invoice::InvoiceError;

pub const SATS_PER_BTC: u64 = 100_000_000;
pub const MAX_MONEY_SATS: u64 = 21_000_000 * SATS_PER_BTC;

/// "0.001" -> 100_000. At most eight fractional digits, no sign, no exponent.
pub fn btc_str_to_sats(value: &str) -> Result<u64, InvoiceError> {
    let invalid = || InvoiceError::InvalidAmount(value.to_string());
    let value_trimmed = value.trim();
    if value_trimmed.is_empty() {
        return Err(invalid());
    }

    let (whole, frac) = match value_trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value_trimmed, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if frac.len() > 8
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let whole_sats = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u64>()
            .ok()
            .and_then(|w| w.checked_mul(SATS_PER_BTC))
            .ok_or_else(invalid)?
    };
    let frac_sats = if frac.is_empty() {
        0
    } else {
        format!("{:0<8}", frac).parse::<u64>().map_err(|_| invalid())?
    };

    let sats = whole_sats.checked_add(frac_sats).ok_or_else(invalid)?;
    if sats > MAX_MONEY_SATS {
        return Err(invalid());
    }
    Ok(sats)
}

/// 100_000 -> "0.00100000"
pub fn sats_to_btc_string(sats: u64) -> String {
    format!("{}.{:08}", sats / SATS_PER_BTC, sats % SATS_PER_BTC)
}

/// Millisatoshis to satoshis, rounding up so a payment never underpays.
pub fn msat_to_sats(msat: u64) -> u64 {
    msat / 1000 + u64::from(msat % 1000 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_btc_str_to_sats() {
        assert_eq!(btc_str_to_sats("0.001").unwrap(), 100_000);
        assert_eq!(btc_str_to_sats("1").unwrap(), SATS_PER_BTC);
        assert_eq!(btc_str_to_sats("1.").unwrap(), SATS_PER_BTC);
        assert_eq!(btc_str_to_sats(".5").unwrap(), 50_000_000);
        assert_eq!(btc_str_to_sats("0.00000001").unwrap(), 1);
        assert_eq!(btc_str_to_sats("20999999.99999999").unwrap(), MAX_MONEY_SATS - 1);
    }

    #[test]
    fn test_btc_str_rejects() {
        for bad in ["", ".", "-1", "1e3", "0.000000001", "abc", "21000001", "1,5"] {
            assert!(btc_str_to_sats(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_formatting() {
        assert_eq!(sats_to_btc_string(100_000), "0.00100000");
        assert_eq!(sats_to_btc_string(150_000_000), "1.50000000");
        assert_eq!(sats_to_btc_string(1), "0.00000001");
    }

    #[test]
    fn test_msat_rounds_up() {
        assert_eq!(msat_to_sats(0), 0);
        assert_eq!(msat_to_sats(1), 1);
        assert_eq!(msat_to_sats(1000), 1);
        assert_eq!(msat_to_sats(1001), 2);
        assert_eq!(msat_to_sats(250_000_000), 250_000);
    }
}
