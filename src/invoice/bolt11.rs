use super::{DecodedInvoice, InvoiceError};
use crate::types::Network;
use lightning_invoice::{Bolt11Invoice, Bolt11InvoiceDescription, Currency};
use std::str::FromStr;

fn network_for(currency: Currency) -> Result<Network, InvoiceError> {
    match currency {
        Currency::Bitcoin => Ok(Network::Bitcoin),
        Currency::BitcoinTestnet | Currency::Signet => Ok(Network::Testnet),
        other => Err(InvoiceError::Unsupported(format!("lightning invoice for {:?}", other))),
    }
}

pub(super) fn parse(raw: &str) -> Result<DecodedInvoice, InvoiceError> {
    let invoice = Bolt11Invoice::from_str(raw)
        .map_err(|e| InvoiceError::InvalidInvoice(format!("bolt11: {}", e)))?;

    let network = network_for(invoice.currency())?;
    let description = match invoice.description() {
        Bolt11InvoiceDescription::Direct(d) => Some(d.to_string()).filter(|d| !d.is_empty()),
        Bolt11InvoiceDescription::Hash(_) => None,
    };

    Ok(DecodedInvoice::Lightning {
        amount_msat: invoice.amount_milli_satoshis(),
        description,
        network,
        payment_hash: invoice.payment_hash().to_string(),
        invoice: raw.to_string(),
    })
}
