//! Per-item pipeline: dynamic, tier, rules, rounding, derived fields, in that order.

use std::collections::BTreeMap;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::{Customer, PricingContext, PricingItem};
use crate::errors::PricingError;
use crate::pricing::condition::ConditionSubject;
use crate::pricing::dynamic::{apply_dynamic_pricing, select_config, MarketSignals};
use crate::pricing::result::PricedItem;
use crate::pricing::rules::{apply_rules, select_rules};
use crate::pricing::tier::{find_tier, tier_info};
use crate::pricing::types::{
    DynamicPricingConfig, MarketData, PricingAnalytics, PricingOptions, PricingRule, RoundingMode,
    TierPricing,
};

/// Read-only view over everything one calculation consults. Built per call from the
/// calculator's catalogs plus the per-call lists.
#[derive(Clone, Debug)]
pub struct PricingSnapshot<'a> {
    pub rules: Vec<&'a PricingRule>,
    pub tier_pricing: Vec<&'a TierPricing>,
    pub dynamic_configs: &'a [DynamicPricingConfig],
    pub market_data: &'a BTreeMap<String, MarketData>,
    pub analytics: &'a BTreeMap<String, PricingAnalytics>,
}

/// Structural validation of a batch. Any failure aborts the whole calculation.
pub fn validate_items(items: &[PricingItem]) -> Result<(), PricingError> {
    if items.is_empty() {
        return Err(PricingError::EmptyItems);
    }

    for (index, item) in items.iter().enumerate() {
        if item.id.trim().is_empty() {
            return Err(PricingError::BlankItemId { index });
        }
        if !item.base_price.is_finite() {
            return Err(PricingError::NonFiniteBasePrice { item_id: item.id.clone() });
        }
        if item.base_price < 0.0 {
            return Err(PricingError::NegativeBasePrice {
                item_id: item.id.clone(),
                base_price: item.base_price,
            });
        }
        if item.quantity == 0 {
            return Err(PricingError::NonPositiveQuantity { item_id: item.id.clone() });
        }
    }

    Ok(())
}

/// Rounds in decimal arithmetic so the result is an exact multiple of `10^-precision`
/// before converting back.
pub fn round_price(value: f64, mode: RoundingMode, precision: u32) -> f64 {
    let strategy = match mode {
        RoundingMode::Round => RoundingStrategy::MidpointAwayFromZero,
        RoundingMode::Floor => RoundingStrategy::ToNegativeInfinity,
        RoundingMode::Ceil => RoundingStrategy::ToPositiveInfinity,
    };

    Decimal::from_f64(value)
        .map(|decimal| decimal.round_dp_with_strategy(precision, strategy))
        .and_then(|decimal| decimal.to_f64())
        .unwrap_or(value)
}

pub fn price_item(
    item: &PricingItem,
    customer: &Customer,
    context: &PricingContext,
    snapshot: &PricingSnapshot<'_>,
    options: &PricingOptions,
) -> Result<PricedItem, PricingError> {
    let subject = ConditionSubject::new(item, customer, context);
    let original_price = item.base_price;
    let mut price = original_price;

    if let Some(config) = select_config(snapshot.dynamic_configs) {
        let signals = MarketSignals {
            market_data: snapshot.market_data.get(&item.id),
            analytics: snapshot.analytics.get(&item.id),
        };
        price = apply_dynamic_pricing(config, &subject, signals);
    }
    let dynamic_adjustment = price - original_price;

    let mut tier = None;
    if options.calculate_tiers {
        if let Some(matched) =
            find_tier(snapshot.tier_pricing.iter().copied(), item, context.timestamp)
        {
            let info = tier_info(&matched, item, price);
            price = info.tier_price;
            tier = Some(info);
        }
    }

    let base_price = price;
    let selected = select_rules(snapshot.rules.iter().copied(), &subject);
    let (adjusted, applied_rules) = apply_rules(base_price, &selected);

    let final_price = round_price(adjusted, options.rounding_mode, options.rounding_precision);
    if !final_price.is_finite() {
        return Err(PricingError::ItemPricingFailed {
            item_id: item.id.clone(),
            reason: format!("final price {final_price} is not finite"),
        });
    }

    let quantity = f64::from(item.quantity);
    let savings = original_price - final_price;
    let savings_percent =
        if original_price == 0.0 { 0.0 } else { savings / original_price * 100.0 };
    let cost = item.cost_price.filter(|cost| *cost > 0.0);
    let margin = cost
        .filter(|_| final_price > 0.0)
        .map(|cost| (final_price - cost) / final_price * 100.0);
    let markup = cost.map(|cost| (final_price - cost) / cost * 100.0);

    Ok(PricedItem {
        item_id: item.id.clone(),
        name: item.name.clone(),
        category: item.category.clone(),
        quantity: item.quantity,
        original_price,
        base_price,
        final_price,
        unit_price: final_price,
        total_price: final_price * quantity,
        savings,
        savings_percent,
        dynamic_adjustment,
        applied_rules,
        tier_info: tier,
        bundle_info: None,
        margin,
        markup,
    })
}
