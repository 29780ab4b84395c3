//! Quantity-tier resolution.
//!
//! Selection is "first match wins": configs are scanned in order and, inside a config,
//! tiers are scanned in list order. The first tier whose range contains the quantity is
//! taken even if a later tier or config would be cheaper. Ranges are expected not to
//! overlap; this is not a best-price search.

use chrono::{DateTime, Utc};

use crate::domain::PricingItem;
use crate::pricing::result::{NextTier, TierInfo};
use crate::pricing::types::{PriceTier, TierPricing};

#[derive(Clone, Copy, Debug)]
pub struct TierMatch<'a> {
    pub config: &'a TierPricing,
    pub index: usize,
    pub tier: &'a PriceTier,
}

pub fn find_tier<'a, I>(configs: I, item: &PricingItem, at: DateTime<Utc>) -> Option<TierMatch<'a>>
where
    I: IntoIterator<Item = &'a TierPricing>,
{
    configs
        .into_iter()
        .filter(|config| config.is_valid_at(at) && applies_to(config, item))
        .find_map(|config| {
            config
                .tiers
                .iter()
                .enumerate()
                .find(|(_, tier)| tier.contains(item.quantity))
                .map(|(index, tier)| TierMatch { config, index, tier })
        })
}

/// Fixed price, else percent off the base price, else the explicit price, else unchanged.
pub fn tier_price(tier: &PriceTier, base_price: f64, current_price: f64) -> f64 {
    if let Some(fixed_price) = tier.fixed_price {
        fixed_price
    } else if let Some(discount) = tier.discount {
        base_price - base_price * discount / 100.0
    } else if let Some(price) = tier.price {
        price
    } else {
        current_price
    }
}

pub fn tier_info(matched: &TierMatch<'_>, item: &PricingItem, current_price: f64) -> TierInfo {
    let price = tier_price(matched.tier, item.base_price, current_price);

    let next_tier = matched
        .config
        .tiers
        .iter()
        .skip(matched.index + 1)
        .find(|tier| tier.min_quantity > item.quantity)
        .map(|tier| NextTier {
            min_quantity: tier.min_quantity,
            tier_price: tier_price(tier, item.base_price, current_price),
            quantity_needed: tier.min_quantity - item.quantity,
        });

    TierInfo {
        tier_pricing_id: matched.config.id.clone(),
        tier_pricing_name: matched.config.name.clone(),
        tier_index: matched.index,
        min_quantity: matched.tier.min_quantity,
        max_quantity: matched.tier.max_quantity,
        tier_price: price,
        next_tier,
    }
}

fn applies_to(config: &TierPricing, item: &PricingItem) -> bool {
    config.applicable_items.is_empty()
        || config.applicable_items.iter().any(|reference| item.is_referenced_by(reference))
}
