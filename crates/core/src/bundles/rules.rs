use std::cmp::Reverse;

use tracing::debug;

use crate::bundles::types::{
    Bundle, BundlePricing, BundleRule, BundleRuleAction, BundleRuleCondition,
};

pub fn condition_holds(condition: &BundleRuleCondition, bundle: &Bundle) -> bool {
    match condition {
        BundleRuleCondition::Category { category } => {
            bundle.items.iter().any(|item| item.category == *category)
        }
        BundleRuleCondition::PriceRange { min, max } => {
            let total = bundle.item_total();
            min.map(|min| total >= min).unwrap_or(true)
                && max.map(|max| total <= max).unwrap_or(true)
        }
        BundleRuleCondition::QuantityRange { min, max } => {
            let quantity: u32 = bundle.items.iter().map(|item| item.quantity).sum();
            min.map(|min| quantity >= min).unwrap_or(true)
                && max.map(|max| quantity <= max).unwrap_or(true)
        }
    }
}

/// Applies every active rule whose conditions all hold, highest priority first, and reprices
/// the bundle. Later rules overwrite the pricing set by earlier ones. Returns the ids of the
/// rules that fired.
pub fn apply_bundle_rules<'a, I>(bundle: &mut Bundle, rules: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a BundleRule>,
{
    let mut ordered: Vec<&BundleRule> = rules.into_iter().filter(|rule| rule.active).collect();
    ordered.sort_by_key(|rule| Reverse(rule.priority));

    let mut fired = Vec::new();
    for rule in ordered {
        if !rule.conditions.iter().all(|condition| condition_holds(condition, bundle)) {
            continue;
        }
        for action in &rule.actions {
            bundle.pricing = match action {
                BundleRuleAction::SetDiscount { percent } => BundlePricing::percentage(*percent),
                BundleRuleAction::SetFixedPrice { price } => BundlePricing::fixed(*price),
            };
        }
        bundle.reprice();
        debug!(
            event_name = "bundles.rule.applied",
            bundle_id = %bundle.id,
            rule_id = %rule.id,
            bundle_price = bundle.bundle_price,
            "bundle rule applied"
        );
        fired.push(rule.id.clone());
    }
    fired
}
