//! Product scoring and ranking
//!
//! Each analyzed product gets a composite score out of 10:
//! - Price band: up to 5 points, cheaper is better
//! - Rating band: up to 3 points
//! - Shipping bonus: up to 2 points for free or fast delivery
//!
//! Scores map to quality tiers and the ranked head of the list gets
//! explicit rank numbers.

use std::cmp::Ordering;

use crate::types::{ProductRecord, Tier};

/// Points awarded for the price band
pub fn price_points(price: f64) -> f64 {
    if price < 200.0 {
        5.0
    } else if price < 300.0 {
        4.0
    } else if price < 400.0 {
        3.0
    } else if price < 500.0 {
        2.0
    } else {
        1.0
    }
}

/// Points awarded for the rating band
pub fn rating_points(rating: f64) -> f64 {
    if rating >= 4.5 {
        3.0
    } else if rating >= 4.0 {
        2.5
    } else if rating >= 3.0 {
        2.0
    } else if rating >= 2.0 {
        1.0
    } else if rating > 0.0 {
        0.5
    } else {
        0.0
    }
}

/// Bonus points for the shipping label
///
/// Free shipping outranks fast shipping when the label mentions both.
pub fn shipping_points(label: &str) -> f64 {
    let lower = label.to_lowercase();
    if lower.contains("gratuite") || lower.contains("free") {
        2.0
    } else if lower.contains("express") || lower.contains("24h") {
        1.0
    } else {
        0.0
    }
}

/// Composite score for a record, rounded to one decimal place
pub fn score(record: &ProductRecord) -> f64 {
    let total = price_points(record.price)
        + rating_points(record.rating)
        + shipping_points(&record.shipping);
    (total * 10.0).round() / 10.0
}

/// Quality tier for a score
pub fn tier_for(score: f64) -> Tier {
    if score >= 8.0 {
        Tier::Excellent
    } else if score >= 6.0 {
        Tier::Good
    } else if score >= 4.0 {
        Tier::Fair
    } else {
        Tier::Poor
    }
}

/// Score and tier every record in place
pub fn apply(records: &mut [ProductRecord]) {
    for record in records.iter_mut() {
        record.score = score(record);
        record.tier = tier_for(record.score);
    }
}

/// Sort records by descending score and number the top `n`
///
/// The sort is stable, so equal scores keep their discovery order.
pub fn rank_top(records: &mut [ProductRecord], n: usize) {
    records.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    for (i, record) in records.iter_mut().take(n).enumerate() {
        record.rank = (i + 1) as u32;
    }
}
