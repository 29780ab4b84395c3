//! Cart-to-bundle match scoring and recommendation ranking.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::bundles::types::{Bundle, BundleRecommendation, BundleRecommendationKind};
use crate::domain::{Customer, PricingItem};

/// Supplies extra candidates (cross-sell, upsell) next to catalog matches.
pub trait RecommendationSource {
    fn name(&self) -> &str;

    fn candidates(
        &self,
        cart: &[PricingItem],
        customer: &Customer,
        bundles: &[Bundle],
    ) -> Vec<BundleRecommendation>;
}

/// Fraction of the bundle's items present in the cart, capped at 1.
pub fn match_score(bundle: &Bundle, cart: &[PricingItem]) -> f64 {
    if bundle.items.is_empty() {
        return 0.0;
    }

    let in_cart: BTreeSet<&str> = cart.iter().map(|item| item.id.as_str()).collect();
    let present = bundle.items.iter().filter(|item| in_cart.contains(item.item_id.as_str())).count();

    (present as f64 / bundle.items.len() as f64).min(1.0)
}

pub fn catalog_recommendations<'a, I>(
    bundles: I,
    cart: &[PricingItem],
    threshold: f64,
) -> Vec<BundleRecommendation>
where
    I: IntoIterator<Item = &'a Bundle>,
{
    bundles
        .into_iter()
        .filter_map(|bundle| {
            let score = match_score(bundle, cart);
            if score <= threshold {
                return None;
            }

            let missing_items: Vec<String> = bundle
                .items
                .iter()
                .filter(|item| !cart.iter().any(|line| line.id == item.item_id))
                .map(|item| item.item_id.clone())
                .collect();
            let reason = if missing_items.is_empty() {
                format!("cart already contains every item of {}", bundle.name)
            } else {
                format!("add {} more item(s) to complete {}", missing_items.len(), bundle.name)
            };

            Some(BundleRecommendation {
                bundle_id: bundle.id.clone(),
                bundle_name: bundle.name.clone(),
                kind: BundleRecommendationKind::CatalogMatch,
                original_price: bundle.original_price,
                bundle_price: bundle.bundle_price,
                savings: bundle.savings,
                confidence: score,
                priority: (score * 10.0).floor() as i32,
                missing_items,
                reason,
            })
        })
        .collect()
}

/// Priority descending, then confidence descending. Stable for full ties.
pub fn rank_recommendations(recommendations: &mut [BundleRecommendation]) {
    recommendations.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal))
    });
}
