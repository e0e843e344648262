//! BIP21 `bitcoin:` URIs, parsed and built.

use super::{DecodedInvoice, InvoiceError};
use crate::units::{btc_str_to_sats, sats_to_btc_string};
use bitcoin::address::NetworkUnchecked;
use bitcoin::Address;
use std::collections::HashSet;

pub(super) const SCHEME: &str = "bitcoin:";

fn invalid(msg: impl Into<String>) -> InvoiceError {
    InvoiceError::InvalidInvoice(msg.into())
}

/// Accepts a full URI or a bare address.
pub(super) fn parse(raw: &str) -> Result<DecodedInvoice, InvoiceError> {
    let body = match raw.get(..SCHEME.len()) {
        Some(head) if head.eq_ignore_ascii_case(SCHEME) => &raw[SCHEME.len()..],
        _ => raw,
    };
    let (address, query) = match body.split_once('?') {
        Some((a, q)) => (a, Some(q)),
        None => (body, None),
    };
    if address.is_empty() {
        return Err(invalid("missing address"));
    }
    address
        .parse::<Address<NetworkUnchecked>>()
        .map_err(|e| invalid(format!("address {}: {}", address, e)))?;

    let mut amount_sats = None;
    let mut label = None;
    let mut message = None;
    let mut seen = HashSet::new();

    for pair in query.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = key.to_ascii_lowercase();
        if !seen.insert(key.clone()) {
            return Err(invalid(format!("duplicate parameter '{}'", key)));
        }
        match key.as_str() {
            "amount" => amount_sats = Some(btc_str_to_sats(&percent_decode(value)?)?),
            "label" => label = Some(percent_decode(value)?),
            "message" => message = Some(percent_decode(value)?),
            k if k.starts_with("req-") => {
                return Err(invalid(format!("required parameter '{}' not understood", k)));
            }
            _ => {}
        }
    }

    Ok(DecodedInvoice::OnChain { address: address.to_string(), amount_sats, label, message })
}

/// `bitcoin:<address>[?amount=..&label=..&message=..]`. A zero amount is
/// left out so the payer is asked for one.
pub fn bip21_uri(address: &str, amount_sats: Option<u64>, label: Option<&str>, message: Option<&str>) -> String {
    let mut uri = format!("{}{}", SCHEME, address);
    let mut query = Vec::new();
    if let Some(amount) = amount_sats.filter(|&sats| sats > 0) {
        query.push(format!("amount={}", sats_to_btc_string(amount)));
    }
    if let Some(label) = label {
        query.push(format!("label={}", percent_encode(label)));
    }
    if let Some(message) = message {
        query.push(format!("message={}", percent_encode(message)));
    }
    if !query.is_empty() {
        uri.push('?');
        uri.push_str(&query.join("&"));
    }
    uri
}

pub fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for &b in value.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

pub fn percent_decode(value: &str) -> Result<String, InvoiceError> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| invalid(format!("bad escape in '{}'", value)))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| invalid(format!("'{}' is not UTF-8", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu";

    #[test]
    fn test_parse_full_uri() {
        let uri = format!("bitcoin:{}?amount=0.001&label=Coffee%20Shop&message=Thanks%21", ADDR);
        assert_eq!(
            parse(&uri).unwrap(),
            DecodedInvoice::OnChain {
                address: ADDR.into(),
                amount_sats: Some(100_000),
                label: Some("Coffee Shop".into()),
                message: Some("Thanks!".into()),
            }
        );
    }

    #[test]
    fn test_parse_rejections() {
        assert!(parse("bitcoin:").is_err());
        assert!(parse("bitcoin:notanaddress").is_err());
        assert!(parse(&format!("bitcoin:{}?amount=1&amount=2", ADDR)).is_err());
        assert!(parse(&format!("bitcoin:{}?req-somethingnew=1", ADDR)).is_err());
        assert!(matches!(
            parse(&format!("bitcoin:{}?amount=0.123456789", ADDR)),
            Err(InvoiceError::InvalidAmount(_))
        ));
        assert!(parse(&format!("bitcoin:{}?label=%ZZ", ADDR)).is_err());
    }

    #[test]
    fn test_unknown_optional_params_ignored() {
        let decoded = parse(&format!("bitcoin:{}?lightning=lnbc1xyz&pj=https://x", ADDR)).unwrap();
        assert!(matches!(decoded, DecodedInvoice::OnChain { amount_sats: None, .. }));
    }

    #[test]
    fn test_build_uri() {
        assert_eq!(bip21_uri(ADDR, None, None, None), format!("bitcoin:{}", ADDR));
        assert_eq!(bip21_uri(ADDR, Some(0), None, None), format!("bitcoin:{}", ADDR));
        assert_eq!(bip21_uri(ADDR, Some(0), Some("Tip"), None), format!("bitcoin:{}?label=Tip", ADDR));
        assert_eq!(
            bip21_uri(ADDR, Some(100_000), Some("Coffee Shop"), None),
            format!("bitcoin:{}?amount=0.00100000&label=Coffee%20Shop", ADDR)
        );
    }

    #[test]
    fn test_build_then_parse() {
        let uri = bip21_uri(ADDR, Some(2_500), Some("née & co"), Some("a=b"));
        let DecodedInvoice::OnChain { amount_sats, label, message, .. } = parse(&uri).unwrap() else {
            panic!("expected on-chain");
        };
        assert_eq!(amount_sats, Some(2_500));
        assert_eq!(label.as_deref(), Some("née & co"));
        assert_eq!(message.as_deref(), Some("a=b"));
    }
}
