use crate::pricing::types::{AdjustmentType, PriceAdjustment};

/// Applies one adjustment: the percentage change or fixed amount, never below zero, then
/// the optional `[min_price, max_price]` clamp, then rounding to the nearest `round_to`.
pub fn apply_adjustment(price: f64, adjustment: &PriceAdjustment) -> f64 {
    let mut adjusted = match adjustment.adjustment_type {
        AdjustmentType::Percentage | AdjustmentType::Markdown => {
            price - price * adjustment.value / 100.0
        }
        AdjustmentType::Markup => price + price * adjustment.value / 100.0,
        AdjustmentType::Fixed => price - adjustment.value,
    }
    .max(0.0);

    if let Some(min_price) = adjustment.min_price {
        adjusted = adjusted.max(min_price);
    }
    if let Some(max_price) = adjustment.max_price {
        adjusted = adjusted.min(max_price);
    }
    if let Some(step) = adjustment.round_to.filter(|step| *step > 0.0) {
        adjusted = (adjusted / step).round() * step;
    }

    adjusted
}

/// Each adjustment operates on the output of the previous one.
pub fn apply_adjustments(price: f64, adjustments: &[PriceAdjustment]) -> f64 {
    adjustments.iter().fold(price, apply_adjustment)
}
