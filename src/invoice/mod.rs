//! Invoice classification and decoding.
//!
//! `classify` sniffs the scheme or prefix without touching the network;
//! `decode` turns the raw string into a [`DecodedInvoice`]. Only BOLT11 is
//! accepted on the Lightning side; LNURL and BOLT12 are recognised and
//! reported as unsupported rather than malformed.

mod bip21;
mod bolt11;

pub use bip21::{bip21_uri, percent_decode, percent_encode};

use crate::error::ErrorKind;
use crate::types::Network;
use bitcoin::address::NetworkUnchecked;
use bitcoin::Address;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvoiceError {
    #[error("Invalid invoice: {0}")]
    InvalidInvoice(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unsupported invoice type: {0}")]
    Unsupported(String),
}

impl InvoiceError {
    pub fn kind(&self) -> ErrorKind { ErrorKind::Format }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "spec", rename_all = "snake_case")]
pub enum InvoiceType {
    OnChain,
    Lightning,
    /// Recognised but not payable here, e.g. `lnurl` or `bolt12`.
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecodedInvoice {
    OnChain {
        address: String,
        amount_sats: Option<u64>,
        label: Option<String>,
        message: Option<String>,
    },
    Lightning {
        amount_msat: Option<u64>,
        description: Option<String>,
        network: Network,
        payment_hash: String,
        invoice: String,
    },
}

const LIGHTNING_SCHEME: &str = "lightning:";
const BOLT11_PREFIXES: [&str; 5] = ["lnbcrt", "lntbs", "lnbc", "lntb", "lnsb"];

/// Strip a leading `lightning:` (any case) if present.
fn strip_lightning_scheme(raw: &str) -> &str {
    match raw.get(..LIGHTNING_SCHEME.len()) {
        Some(head) if head.eq_ignore_ascii_case(LIGHTNING_SCHEME) => &raw[LIGHTNING_SCHEME.len()..],
        _ => raw,
    }
}

pub fn classify(raw: &str) -> Result<InvoiceType, InvoiceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InvoiceError::InvalidInvoice("empty input".into()));
    }
    let lower = trimmed.to_ascii_lowercase();

    if lower.starts_with(bip21::SCHEME) {
        return Ok(InvoiceType::OnChain);
    }

    let body = strip_lightning_scheme(&lower);
    if body.starts_with("lnurl") {
        return Ok(InvoiceType::Unsupported("lnurl".into()));
    }
    if body.starts_with("lno") {
        return Ok(InvoiceType::Unsupported("bolt12".into()));
    }
    if BOLT11_PREFIXES.iter().any(|p| body.starts_with(p)) {
        return Ok(InvoiceType::Lightning);
    }

    if trimmed.parse::<Address<NetworkUnchecked>>().is_ok() {
        return Ok(InvoiceType::OnChain);
    }

    Err(InvoiceError::InvalidInvoice("unrecognised payment request".into()))
}

pub fn decode(raw: &str, invoice_type: &InvoiceType) -> Result<DecodedInvoice, InvoiceError> {
    let trimmed = raw.trim();
    match invoice_type {
        InvoiceType::OnChain => bip21::parse(trimmed),
        InvoiceType::Lightning => bolt11::parse(strip_lightning_scheme(trimmed)),
        InvoiceType::Unsupported(spec) => Err(InvoiceError::Unsupported(spec.clone())),
    }
}

/// `classify` then `decode`.
pub fn parse(raw: &str) -> Result<DecodedInvoice, InvoiceError> {
    let invoice_type = classify(raw)?;
    decode(raw, &invoice_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_schemes() {
        assert_eq!(classify("bitcoin:bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu").unwrap(), InvoiceType::OnChain);
        assert_eq!(classify("  BITCOIN:BC1QCR8TE4KR609GCAWUTMRZA0J4XV80JY8Z306FYU ").unwrap(), InvoiceType::OnChain);
        assert_eq!(classify("lnbc2500u1pvjluezpp5").unwrap(), InvoiceType::Lightning);
        assert_eq!(classify("lightning:LNTB1500n1p").unwrap(), InvoiceType::Lightning);
        assert_eq!(classify("lnbcrt10u1p").unwrap(), InvoiceType::Lightning);
    }

    #[test]
    fn test_classify_unsupported() {
        assert_eq!(classify("LNURL1DP68GURN8GHJ7").unwrap(), InvoiceType::Unsupported("lnurl".into()));
        assert_eq!(classify("lightning:lnurl1dp68").unwrap(), InvoiceType::Unsupported("lnurl".into()));
        assert_eq!(classify("lno1qcp4256ypq").unwrap(), InvoiceType::Unsupported("bolt12".into()));
    }

    #[test]
    fn test_classify_bare_address_and_garbage() {
        assert_eq!(classify("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2").unwrap(), InvoiceType::OnChain);
        assert!(matches!(classify("hello world"), Err(InvoiceError::InvalidInvoice(_))));
        assert!(matches!(classify("   "), Err(InvoiceError::InvalidInvoice(_))));
    }

    #[test]
    fn test_decode_unsupported_is_not_a_parse_failure() {
        let err = parse("lno1qcp4256ypq").unwrap_err();
        assert_eq!(err, InvoiceError::Unsupported("bolt12".into()));
    }

    #[test]
    fn test_decode_wrong_type() {
        let err = decode("lnbc2500u1pvjluezpp5", &InvoiceType::OnChain).unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidInvoice(_)));
    }
}
