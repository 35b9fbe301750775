//! Order book walker.
//!
//! Simulates consuming a depth snapshot level by level to find how much
//! output a given input quantity buys. Fees are not applied here.

use rust_decimal::Decimal;

use crate::types::{FillResult, OrderBookSnapshot, OrderLevel};

/// Walk `snapshot` with `input_quantity`.
///
/// Non-inverted legs consume asks at rate `price`; inverted legs consume
/// bids at rate `1 / price`. Each level absorbs up to `price × quantity` of
/// input. If the book runs out first the partial output is returned with
/// `fully_filled = false`. Output that would overflow `Decimal` stops the
/// walk the same way, keeping what was accumulated before that level.
pub fn walk(snapshot: &OrderBookSnapshot, input_quantity: Decimal, inverted: bool) -> FillResult {
    if inverted {
        walk_levels(&snapshot.bids, input_quantity, |price| Decimal::ONE.checked_div(price))
    } else {
        walk_levels(&snapshot.asks, input_quantity, Some)
    }
}

/// Total input the relevant side of the book can absorb.
pub fn book_capacity(snapshot: &OrderBookSnapshot, inverted: bool) -> Decimal {
    let levels = if inverted { &snapshot.bids } else { &snapshot.asks };
    levels
        .iter()
        .filter(|l| is_usable(l))
        .map(OrderLevel::value)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

fn is_usable(level: &OrderLevel) -> bool {
    level.price > Decimal::ZERO && level.quantity > Decimal::ZERO
}

fn walk_levels(
    levels: &[OrderLevel],
    input_quantity: Decimal,
    rate: impl Fn(Decimal) -> Option<Decimal>,
) -> FillResult {
    let mut remaining = input_quantity;
    let mut output = Decimal::ZERO;
    let mut overflowed = false;

    for level in levels.iter().filter(|l| is_usable(l)) {
        if remaining <= Decimal::ZERO {
            break;
        }

        let consumed = remaining.min(level.value());
        let gained = rate(level.price)
            .and_then(|r| consumed.checked_mul(r))
            .and_then(|g| output.checked_add(g));
        match gained {
            Some(total) => output = total,
            None => {
                overflowed = true;
                break;
            }
        }
        remaining -= consumed;
    }

    FillResult {
        output_quantity: output,
        fully_filled: !overflowed && remaining <= Decimal::ZERO,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
