//! Backup material sniffing for wallet import.

use crate::xkey::{self, KeyKind};
use bip39::Mnemonic;
use serde::Serialize;

/// Characters that only show up in output descriptors.
const DESCRIPTOR_SYMBOLS: [char; 10] = ['[', ']', '(', ')', ',', '\'', '/', ':', '_', '*'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupMaterial { Mnemonic, Xpub, Xprv, Descriptor }

impl BackupMaterial {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupMaterial::Mnemonic => "mnemonic",
            BackupMaterial::Xpub => "xpub",
            BackupMaterial::Xprv => "xprv",
            BackupMaterial::Descriptor => "descriptor",
        }
    }

    /// Classify pasted import text. Extended keys must fully decode
    /// (checksum included) to count.
    pub fn detect(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if xkey::is_extended_key(input) {
            return xkey::decode(input).ok().map(|key| match key.kind() {
                KeyKind::Public => BackupMaterial::Xpub,
                KeyKind::Private => BackupMaterial::Xprv,
            });
        }
        if input.contains('(') && input.chars().any(|c| DESCRIPTOR_SYMBOLS.contains(&c)) {
            return Some(BackupMaterial::Descriptor);
        }
        Mnemonic::parse_normalized(input).ok().map(|_| BackupMaterial::Mnemonic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        let words = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        assert_eq!(BackupMaterial::detect(words), Some(BackupMaterial::Mnemonic));
        assert_eq!(
            BackupMaterial::detect("xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8"),
            Some(BackupMaterial::Xpub)
        );
        assert_eq!(BackupMaterial::detect("wpkh([73c5da0a/84'/0'/0']xpub/0/*)"), Some(BackupMaterial::Descriptor));
        assert_eq!(BackupMaterial::detect("hello world"), None);
        assert_eq!(BackupMaterial::detect("   "), None);
    }
}
