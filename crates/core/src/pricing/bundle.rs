//! Order-level bundle matching over already priced items.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::bundles::types::Bundle;
use crate::pricing::result::{BundleInfo, PricedItem};

/// A bundle some of whose items are in the order, but fewer than `min_items`.
#[derive(Clone, Debug, PartialEq)]
pub struct PartialBundleMatch {
    pub bundle_id: String,
    pub bundle_name: String,
    pub matched_items: Vec<String>,
    pub missing_items: Vec<String>,
    pub items_needed: usize,
    pub potential_savings: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BundleMatches {
    pub applied: Vec<BundleInfo>,
    pub partial: Vec<PartialBundleMatch>,
}

/// Bundle-level conditions are carried on the record but not enforced.
fn bundle_conditions_hold(bundle: &Bundle) -> bool {
    if !bundle.conditions.is_empty() {
        debug!(
            event_name = "pricing.bundle.conditions_skipped",
            bundle_id = %bundle.id,
            conditions = bundle.conditions.len(),
            "bundle conditions are not enforced"
        );
    }
    true
}

/// Every available bundle is checked independently, so several bundles may apply to the
/// same order.
pub fn match_bundles<'a, I>(bundles: I, priced: &[PricedItem], at: DateTime<Utc>) -> BundleMatches
where
    I: IntoIterator<Item = &'a Bundle>,
{
    let mut matches = BundleMatches::default();

    for bundle in bundles {
        if !bundle.is_available_at(at) || !bundle_conditions_hold(bundle) {
            continue;
        }

        let matched: Vec<&PricedItem> =
            priced.iter().filter(|item| bundle.contains_item(&item.item_id)).collect();
        let required = bundle.min_items.max(1);

        if matched.len() < required {
            if !matched.is_empty() {
                matches.partial.push(PartialBundleMatch {
                    bundle_id: bundle.id.clone(),
                    bundle_name: bundle.name.clone(),
                    matched_items: matched.iter().map(|item| item.item_id.clone()).collect(),
                    missing_items: bundle
                        .items
                        .iter()
                        .filter(|line| !matched.iter().any(|item| item.item_id == line.item_id))
                        .map(|line| line.item_id.clone())
                        .collect(),
                    items_needed: required - matched.len(),
                    potential_savings: bundle.savings.max(0.0),
                });
            }
            continue;
        }

        let original_price: f64 =
            matched.iter().map(|item| item.original_price * f64::from(item.quantity)).sum();
        let items_price: f64 = matched.iter().map(|item| item.total_price).sum();
        let bundle_price = bundle.pricing.price_for(items_price);

        matches.applied.push(BundleInfo {
            bundle_id: bundle.id.clone(),
            bundle_name: bundle.name.clone(),
            matched_items: matched.iter().map(|item| item.item_id.clone()).collect(),
            original_price,
            items_price,
            bundle_price,
            bundle_savings: original_price - bundle_price,
            discount: (items_price - bundle_price).max(0.0),
        });
    }

    matches
}
