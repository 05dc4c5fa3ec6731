use std::str::FromStr;

use reckon_core::Money;
use rust_decimal::Decimal;

use crate::error::ReceiptError;
use crate::types::{PurchaseItem, PurchaseMeasure, RawLine, ReceiptWarning, RowSection};

// e.g. `Qty 2 @ $6.00 each`
re!(re_quantity, r"^Qty (\d+) @ \$\d+\.\d+ each");
// e.g. `0.716 kg NET @ $4.00/kg`
re!(re_weighted, r"^(\d+\.\d+) kg NET @ \$\d+\.\d+/kg");
// e.g. `PRICE REDUCED BY $3.15 each`
re!(re_price_reduced, r"^PRICE REDUCED BY \$\d+\.\d+(?: each|/kg)");

/// Items resolved from the item section, plus the rows that were dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedLines {
    pub items: Vec<PurchaseItem>,
    pub warnings: Vec<ReceiptWarning>,
}

/// Walk the item rows left to right and fold multi-row entries into single
/// purchases.
///
/// A row with its own amount is a purchase (or, when negative, a standalone
/// discount that is dropped). A row with an empty amount only names the
/// product; the row after it says how it was sold:
///
/// * `Qty n @ $p each`: `n` units at that row's amount, less an immediately
///   following negative row if there is one.
/// * `x kg NET @ $p/kg`: `x` kilograms at that row's amount.
///
/// A description-only `PRICE REDUCED BY ...` row annotates the purchase
/// before it and is stepped over on its own.
pub fn group_lines(lines: &[RawLine]) -> Result<GroupedLines, ReceiptError> {
    let mut items = Vec::new();
    let mut warnings = Vec::new();
    let mut skip_until = 0;

    for (i, line) in lines.iter().enumerate() {
        if i < skip_until {
            continue;
        }

        if line.has_amount() {
            skip_until = i + 1;
            match Money::parse(&line.amount) {
                Ok(amount) if amount.is_negative() => {
                    tracing::debug!(row = i, %amount, "dropping standalone discount row");
                }
                Ok(amount) => push_item(
                    &mut items,
                    &mut warnings,
                    i,
                    PurchaseItem::single(&line.description, amount),
                ),
                Err(_) => warnings.push(malformed(i, &line.amount)),
            }
            continue;
        }

        let Some(next) = lines.get(i + 1) else {
            if re_price_reduced().is_match(&line.description) {
                break;
            }
            return Err(unrecognized(i, line));
        };

        if let Some(caps) = re_quantity().captures(&next.description) {
            skip_until = i + 2;

            let discount = lines
                .get(i + 2)
                .filter(|row| row.has_amount())
                .and_then(|row| Money::parse(&row.amount).ok())
                .filter(|amount| amount.is_negative());
            if discount.is_some() {
                skip_until += 1;
            }

            let Some(quantity) = caps[1].parse::<u32>().ok().filter(|n| *n > 0) else {
                warnings.push(malformed(i + 1, &next.description));
                continue;
            };
            let Ok(amount) = Money::parse(&next.amount) else {
                warnings.push(malformed(i + 1, &next.amount));
                continue;
            };

            let item = PurchaseItem {
                description: line.description.clone(),
                amount: amount + discount.unwrap_or_else(Money::zero),
                measure: PurchaseMeasure::Count(quantity),
            };
            push_item(&mut items, &mut warnings, i, item);
        } else if let Some(caps) = re_weighted().captures(&next.description) {
            skip_until = i + 2;

            let weight = Decimal::from_str(&caps[1]).ok().filter(|kg| *kg > Decimal::ZERO);
            let Some(weight) = weight else {
                warnings.push(malformed(i + 1, &next.description));
                continue;
            };
            let Ok(amount) = Money::parse(&next.amount) else {
                warnings.push(malformed(i + 1, &next.amount));
                continue;
            };

            let item = PurchaseItem {
                description: line.description.clone(),
                amount,
                measure: PurchaseMeasure::Weight(weight),
            };
            push_item(&mut items, &mut warnings, i, item);
        } else if re_price_reduced().is_match(&line.description) {
            // Only this row; the next one is a purchase of its own.
            skip_until = i + 1;
        } else {
            return Err(unrecognized(i, line));
        }
    }

    Ok(GroupedLines { items, warnings })
}

fn push_item(
    items: &mut Vec<PurchaseItem>,
    warnings: &mut Vec<ReceiptWarning>,
    index: usize,
    item: PurchaseItem,
) {
    if item.amount.is_negative() || item.amount.is_zero() {
        tracing::warn!(row = index, amount = %item.amount, "dropping non-positive receipt item");
        warnings.push(ReceiptWarning::NonPositiveAmount {
            index,
            amount: item.amount,
        });
    } else {
        items.push(item);
    }
}

fn malformed(index: usize, text: &str) -> ReceiptWarning {
    tracing::warn!(row = index, text, "skipping malformed receipt row");
    ReceiptWarning::MalformedRow {
        section: RowSection::Items,
        index,
        text: text.to_string(),
    }
}

fn unrecognized(index: usize, line: &RawLine) -> ReceiptError {
    ReceiptError::UnrecognizedReceiptPattern {
        index,
        description: line.description.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(pairs: &[(&str, &str)]) -> Vec<RawLine> {
        pairs.iter().map(|(d, a)| RawLine::new(d, a)).collect()
    }

    fn money(s: &str) -> Money {
        Money::parse(s).unwrap()
    }

    // ── Single rows ───────────────────────────────────────────────────────────

    #[test]
    fn single_rows_become_one_item_each() {
        let lines = rows(&[("Milk 2L", "3.10"), ("#Cadbury Bar Twirl 39g", "2.00")]);
        let grouped = group_lines(&lines).unwrap();
        assert_eq!(
            grouped.items,
            vec![
                PurchaseItem::single("Milk 2L", money("3.10")),
                PurchaseItem::single("#Cadbury Bar Twirl 39g", money("2.00")),
            ]
        );
        assert!(grouped.items.iter().all(|i| i.quantity() == Some(1) && i.weight().is_none()));
        assert!(grouped.warnings.is_empty());
    }

    #[test]
    fn standalone_discount_is_dropped() {
        let lines = rows(&[("Milk 2L", "3.10"), ("Member discount", "-0.50"), ("Eggs", "5.00")]);
        let grouped = group_lines(&lines).unwrap();
        assert_eq!(grouped.items.len(), 2);
        assert_eq!(grouped.items[1].description, "Eggs");
        assert!(grouped.warnings.is_empty());
    }

    #[test]
    fn empty_input_gives_no_items() {
        let grouped = group_lines(&[]).unwrap();
        assert!(grouped.items.is_empty());
    }

    // ── Quantity groups ───────────────────────────────────────────────────────

    #[test]
    fn quantity_group() {
        let lines = rows(&[("Bread", ""), ("Qty 2 @ $3.00 each", "6.00")]);
        let grouped = group_lines(&lines).unwrap();
        assert_eq!(grouped.items.len(), 1);
        let item = &grouped.items[0];
        assert_eq!(item.description, "Bread");
        assert_eq!(item.amount, money("6.00"));
        assert_eq!(item.measure, PurchaseMeasure::Count(2));
    }

    #[test]
    fn quantity_group_absorbs_following_discount() {
        let lines = rows(&[("Bread", ""), ("Qty 2 @ $3.00 each", "6.00"), ("", "-1.00")]);
        let grouped = group_lines(&lines).unwrap();
        assert_eq!(grouped.items.len(), 1);
        assert_eq!(grouped.items[0].amount, money("5.00"));
        assert_eq!(grouped.items[0].quantity(), Some(2));
    }

    #[test]
    fn quantity_group_leaves_positive_third_row_alone() {
        let lines = rows(&[("Bread", ""), ("Qty 2 @ $3.00 each", "6.00"), ("Milk 2L", "3.10")]);
        let grouped = group_lines(&lines).unwrap();
        assert_eq!(grouped.items.len(), 2);
        assert_eq!(grouped.items[0].amount, money("6.00"));
        assert_eq!(grouped.items[1].description, "Milk 2L");
    }

    #[test]
    fn discounted_group_followed_by_more_items() {
        let lines = rows(&[
            ("Bread", ""),
            ("Qty 3 @ $2.00 each", "6.00"),
            ("Multi-buy", "-1.50"),
            ("Eggs", "5.00"),
        ]);
        let grouped = group_lines(&lines).unwrap();
        assert_eq!(grouped.items.len(), 2);
        assert_eq!(grouped.items[0].amount, money("4.50"));
        assert_eq!(grouped.items[1].description, "Eggs");
    }

    #[test]
    fn discount_that_zeroes_group_is_not_emitted() {
        let lines = rows(&[("Bread", ""), ("Qty 2 @ $3.00 each", "6.00"), ("", "-6.00")]);
        let grouped = group_lines(&lines).unwrap();
        assert!(grouped.items.is_empty());
        assert!(matches!(
            grouped.warnings.as_slice(),
            [ReceiptWarning::NonPositiveAmount { index: 0, .. }]
        ));
    }

    // ── Weighted groups ───────────────────────────────────────────────────────

    #[test]
    fn weighted_group() {
        let lines = rows(&[("Apples", ""), ("0.716 kg NET @ $4.00/kg", "2.86")]);
        let grouped = group_lines(&lines).unwrap();
        assert_eq!(grouped.items.len(), 1);
        let item = &grouped.items[0];
        assert_eq!(item.description, "Apples");
        assert_eq!(item.amount, money("2.86"));
        assert_eq!(item.weight(), Some(Decimal::new(716, 3)));
        assert_eq!(item.quantity(), None);
    }

    #[test]
    fn weighted_group_does_not_absorb_discount() {
        let lines = rows(&[("Apples", ""), ("0.716 kg NET @ $4.00/kg", "2.86"), ("", "-0.50")]);
        let grouped = group_lines(&lines).unwrap();
        assert_eq!(grouped.items.len(), 1);
        assert_eq!(grouped.items[0].amount, money("2.86"));
    }

    // ── Price-reduced annotations ─────────────────────────────────────────────

    #[test]
    fn price_reduced_annotation_is_skipped() {
        let lines = rows(&[
            ("Chicken Breast", "9.00"),
            ("PRICE REDUCED BY $3.15 each", ""),
            ("Milk 2L", "3.10"),
        ]);
        let grouped = group_lines(&lines).unwrap();
        assert_eq!(grouped.items.len(), 2);
        assert_eq!(grouped.items[1].description, "Milk 2L");
    }

    #[test]
    fn price_reduced_before_a_group_keeps_the_group() {
        let lines = rows(&[
            ("PRICE REDUCED BY $1.00/kg", ""),
            ("Apples", ""),
            ("0.716 kg NET @ $4.00/kg", "2.86"),
        ]);
        let grouped = group_lines(&lines).unwrap();
        assert_eq!(grouped.items.len(), 1);
        assert_eq!(grouped.items[0].description, "Apples");
    }

    #[test]
    fn trailing_price_reduced_ends_cleanly() {
        let lines = rows(&[("Chicken Breast", "9.00"), ("PRICE REDUCED BY $3.15 each", "")]);
        let grouped = group_lines(&lines).unwrap();
        assert_eq!(grouped.items.len(), 1);
    }

    // ── Unrecognized and malformed ────────────────────────────────────────────

    #[test]
    fn unknown_continuation_is_an_error() {
        let lines = rows(&[("Milk 2L", "3.10"), ("Bread", ""), ("Something odd", "1.00")]);
        match group_lines(&lines) {
            Err(ReceiptError::UnrecognizedReceiptPattern { index, description }) => {
                assert_eq!(index, 1);
                assert_eq!(description, "Bread");
            }
            other => panic!("expected unrecognized pattern, got {other:?}"),
        }
    }

    #[test]
    fn trailing_description_only_row_is_an_error() {
        let lines = rows(&[("Milk 2L", "3.10"), ("Bread", "")]);
        assert!(matches!(
            group_lines(&lines),
            Err(ReceiptError::UnrecognizedReceiptPattern { index: 1, .. })
        ));
    }

    #[test]
    fn malformed_row_is_skipped_with_warning() {
        let lines = rows(&[("Milk 2L", "N/A"), ("Eggs", "5.00")]);
        let grouped = group_lines(&lines).unwrap();
        assert_eq!(grouped.items, vec![PurchaseItem::single("Eggs", money("5.00"))]);
        assert_eq!(
            grouped.warnings,
            vec![ReceiptWarning::MalformedRow {
                section: RowSection::Items,
                index: 0,
                text: "N/A".to_string()
            }]
        );
    }

    #[test]
    fn malformed_group_amount_consumes_group() {
        let lines = rows(&[("Bread", ""), ("Qty 2 @ $3.00 each", "??"), ("Eggs", "5.00")]);
        let grouped = group_lines(&lines).unwrap();
        assert_eq!(grouped.items.len(), 1);
        assert_eq!(grouped.items[0].description, "Eggs");
        assert!(matches!(
            grouped.warnings.as_slice(),
            [ReceiptWarning::MalformedRow { index: 1, .. }]
        ));
    }

    #[test]
    fn zero_amount_row_is_not_emitted() {
        let lines = rows(&[("Bag", "0.00"), ("Eggs", "5.00")]);
        let grouped = group_lines(&lines).unwrap();
        assert_eq!(grouped.items.len(), 1);
        assert!(matches!(
            grouped.warnings.as_slice(),
            [ReceiptWarning::NonPositiveAmount { index: 0, .. }]
        ));
    }

    // ── Properties ────────────────────────────────────────────────────────────

    #[test]
    fn output_never_longer_than_input() {
        let lines = rows(&[
            ("Bread", ""),
            ("Qty 2 @ $3.00 each", "6.00"),
            ("", "-1.00"),
            ("Apples", ""),
            ("0.716 kg NET @ $4.00/kg", "2.86"),
            ("PRICE REDUCED BY $0.50/kg", ""),
            ("Milk 2L", "3.10"),
        ]);
        let grouped = group_lines(&lines).unwrap();
        assert!(grouped.items.len() <= lines.len());
        let names: Vec<_> = grouped.items.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(names, vec!["Bread", "Apples", "Milk 2L"]);
    }

    #[test]
    fn grouping_is_deterministic() {
        let lines = rows(&[("Bread", ""), ("Qty 2 @ $3.00 each", "6.00"), ("", "-1.00")]);
        assert_eq!(group_lines(&lines).unwrap(), group_lines(&lines).unwrap());
    }
}
