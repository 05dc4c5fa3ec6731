use chrono::NaiveDateTime;
use reckon_core::Money;

use crate::error::ReceiptError;
use crate::grouper::{group_lines, GroupedLines};
use crate::types::{
    ParsedReceipt, PaymentMethod, RawLine, RawReceipt, ReceiptWarning, RowSection,
};

// e.g. `X-1234` or `EFT`
re!(re_card_payment, r"^(?:X-(\d{4})|EFT)");
// e.g. `POS  012  TRANS  3456   18:39  04/08/2020`
re!(re_footer_time, r"POS\s{2}\d{3}\s{2}TRANS\s{2}\d{4}\s{3}(.+)");

const FOOTER_TIME_FORMAT: &str = "%H:%M  %d/%m/%Y";

/// Build a [`ParsedReceipt`] from a sectioned receipt response.
///
/// Fails when the declared total is unreadable or the item rows contain a
/// grouping the parser does not know. A missing card/EFT payment row is not
/// fatal: `amount_paid` falls back to the declared total and the receipt
/// carries [`ReceiptWarning::UnknownPaymentMethod`].
pub fn parse_receipt(raw: &RawReceipt) -> Result<ParsedReceipt, ReceiptError> {
    let declared_total = Money::parse(&raw.total)
        .map_err(|source| ReceiptError::MalformedAmount { field: "total", source })?;

    let GroupedLines { items, mut warnings } = group_lines(&raw.items)?;

    let (paid_with, amount_paid) = match find_card_payment(&raw.payments, &mut warnings) {
        Some(found) => found,
        None => {
            tracing::warn!(total = %declared_total, "unsupported payment method, using declared total");
            warnings.push(ReceiptWarning::UnknownPaymentMethod);
            (PaymentMethod::Unknown, declared_total)
        }
    };

    let transaction_time = raw.footer.as_deref().and_then(parse_footer_time);

    Ok(ParsedReceipt {
        items,
        declared_total,
        amount_paid,
        paid_with,
        transaction_time,
        warnings,
    })
}

/// First payment row paid by card or EFT, skipping rows whose amount
/// cannot be read.
fn find_card_payment(
    payments: &[RawLine],
    warnings: &mut Vec<ReceiptWarning>,
) -> Option<(PaymentMethod, Money)> {
    for (index, row) in payments.iter().enumerate() {
        let Some(caps) = re_card_payment().captures(&row.description) else {
            continue;
        };
        let method = match caps.get(1) {
            Some(suffix) => PaymentMethod::Card { suffix: suffix.as_str().to_string() },
            None => PaymentMethod::Eft,
        };
        match Money::parse(&row.amount) {
            Ok(amount) => return Some((method, amount)),
            Err(_) => {
                tracing::warn!(row = index, text = %row.amount, "skipping malformed payment row");
                warnings.push(ReceiptWarning::MalformedRow {
                    section: RowSection::Payments,
                    index,
                    text: row.amount.clone(),
                });
            }
        }
    }
    None
}

fn parse_footer_time(footer: &str) -> Option<NaiveDateTime> {
    let c = re_footer_time().captures(footer)?;
    NaiveDateTime::parse_from_str(c.get(1)?.as_str().trim(), FOOTER_TIME_FORMAT).ok()
}
