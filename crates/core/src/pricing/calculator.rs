use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::bundles::types::Bundle;
use crate::domain::{Customer, PricingContext, PricingItem};
use crate::errors::PricingError;
use crate::pricing::bundle::{match_bundles, BundleMatches, PartialBundleMatch};
use crate::pricing::pipeline::{price_item, validate_items, PricingSnapshot};
use crate::pricing::result::{
    PricedItem, PricingRecommendation, PricingResult, RecommendationKind,
};
use crate::pricing::types::{
    DynamicPricingConfig, MarketData, PricingAnalytics, PricingOptions, PricingRule, TierPricing,
};

/// One pricing request. Per-call rules, bundles and tier configs are consulted after the
/// calculator's own catalogs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingInput {
    pub items: Vec<PricingItem>,
    #[serde(default)]
    pub customer: Customer,
    #[serde(default)]
    pub context: PricingContext,
    #[serde(default)]
    pub rules: Vec<PricingRule>,
    #[serde(default)]
    pub bundles: Vec<Bundle>,
    #[serde(default)]
    pub tier_pricing: Vec<TierPricing>,
    /// Falls back to the calculator's options when absent.
    #[serde(default)]
    pub options: Option<PricingOptions>,
}

impl PricingInput {
    pub fn new(items: Vec<PricingItem>, context: PricingContext) -> Self {
        Self { items, context, ..Self::default() }
    }
}

/// Seam for callers that only need to price requests.
pub trait PricingEngine: Send + Sync {
    fn calculate(&self, input: &PricingInput) -> Result<PricingResult, PricingError>;
}

impl PricingEngine for Calculator {
    fn calculate(&self, input: &PricingInput) -> Result<PricingResult, PricingError> {
        Calculator::calculate(self, input)
    }
}

/// Holds the long-lived pricing catalogs. `calculate` only reads them; populate through the
/// `add_*`/`update_*` methods before pricing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Calculator {
    options: PricingOptions,
    rules: Vec<PricingRule>,
    bundles: Vec<Bundle>,
    tier_pricing: Vec<TierPricing>,
    dynamic_configs: Vec<DynamicPricingConfig>,
    market_data: BTreeMap<String, MarketData>,
    analytics: BTreeMap<String, PricingAnalytics>,
}

impl Calculator {
    pub fn new(options: PricingOptions) -> Self {
        Self { options, ..Self::default() }
    }

    pub fn options(&self) -> &PricingOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: PricingOptions) {
        self.options = options;
    }

    pub fn add_rule(&mut self, rule: PricingRule) {
        self.rules.push(rule);
    }

    pub fn add_bundle(&mut self, bundle: Bundle) {
        self.bundles.push(bundle);
    }

    pub fn add_tier_pricing(&mut self, tier_pricing: TierPricing) {
        self.tier_pricing.push(tier_pricing);
    }

    pub fn add_dynamic_config(&mut self, config: DynamicPricingConfig) {
        self.dynamic_configs.push(config);
    }

    pub fn update_market_data(&mut self, item_id: impl Into<String>, market_data: MarketData) {
        self.market_data.insert(item_id.into(), market_data);
    }

    pub fn update_analytics(&mut self, item_id: impl Into<String>, analytics: PricingAnalytics) {
        self.analytics.insert(item_id.into(), analytics);
    }

    pub fn rules(&self) -> &[PricingRule] {
        &self.rules
    }

    pub fn bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    pub fn tier_pricing(&self) -> &[TierPricing] {
        &self.tier_pricing
    }

    pub fn dynamic_configs(&self) -> &[DynamicPricingConfig] {
        &self.dynamic_configs
    }

    pub fn market_data(&self, item_id: &str) -> Option<&MarketData> {
        self.market_data.get(item_id)
    }

    pub fn analytics(&self, item_id: &str) -> Option<&PricingAnalytics> {
        self.analytics.get(item_id)
    }

    /// Prices every item, then applies bundles and aggregates.
    ///
    /// Structural input problems abort with `Err`. Items that fail individually are left out
    /// of `items` and reported in `errors`, so callers must also check `is_valid`.
    pub fn calculate(&self, input: &PricingInput) -> Result<PricingResult, PricingError> {
        if let Err(error) = validate_items(&input.items) {
            warn!(
                event_name = "pricing.calculate.rejected",
                error_class = error.error_class(),
                error = %error,
                "pricing input rejected"
            );
            return Err(error);
        }

        let options = input.options.as_ref().unwrap_or(&self.options);
        let snapshot = PricingSnapshot {
            rules: self.rules.iter().chain(&input.rules).collect(),
            tier_pricing: self.tier_pricing.iter().chain(&input.tier_pricing).collect(),
            dynamic_configs: &self.dynamic_configs,
            market_data: &self.market_data,
            analytics: &self.analytics,
        };

        let mut items = Vec::with_capacity(input.items.len());
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for item in &input.items {
            match price_item(item, &input.customer, &input.context, &snapshot, options) {
                Ok(priced) => {
                    if let Some(cost) = item.cost_price.filter(|cost| *cost > 0.0) {
                        if priced.final_price < cost {
                            warnings.push(format!(
                                "item {} final price {:.2} is below cost price {:.2}",
                                item.id, priced.final_price, cost
                            ));
                        }
                    }
                    items.push(priced);
                }
                Err(error) => {
                    warn!(
                        event_name = "pricing.item.failed",
                        item_id = %item.id,
                        error_class = error.error_class(),
                        error = %error,
                        "item pricing failed"
                    );
                    errors.push(error.to_string());
                }
            }
        }

        let matches = if options.calculate_bundles {
            match_bundles(
                self.bundles.iter().chain(&input.bundles),
                &items,
                input.context.timestamp,
            )
        } else {
            BundleMatches::default()
        };

        for info in &matches.applied {
            for item in items
                .iter_mut()
                .filter(|item| item.bundle_info.is_none() && info.matched_items.contains(&item.item_id))
            {
                item.bundle_info = Some(info.clone());
            }
        }

        let subtotal: f64 = items.iter().map(|item| item.total_price).sum();
        let total_discount: f64 = matches.applied.iter().map(|info| info.discount).sum();
        let item_savings: f64 =
            items.iter().map(|item| item.savings * f64::from(item.quantity)).sum();
        let total_savings = item_savings + total_discount;
        let grand_total = (subtotal - total_discount).max(0.0);

        let recommendations = if options.include_recommendations {
            recommendations(&items, &matches.partial)
        } else {
            Vec::new()
        };

        info!(
            event_name = "pricing.calculate.completed",
            items = items.len(),
            failed_items = errors.len(),
            bundles = matches.applied.len(),
            subtotal,
            grand_total,
            "pricing calculation completed"
        );

        Ok(PricingResult {
            is_valid: errors.is_empty(),
            items,
            subtotal,
            total_savings,
            total_discount,
            grand_total,
            currency: input.context.currency.clone(),
            applied_bundles: matches.applied,
            recommendations,
            errors,
            warnings,
            calculated_at: input.context.timestamp,
        })
    }
}

fn recommendations(items: &[PricedItem], partial: &[PartialBundleMatch]) -> Vec<PricingRecommendation> {
    let tier_upsells = items.iter().filter_map(|item| {
        let tier = item.tier_info.as_ref()?;
        let next = tier.next_tier.as_ref().filter(|next| next.tier_price < tier.tier_price)?;
        Some(PricingRecommendation {
            kind: RecommendationKind::TierUpsell,
            target_id: item.item_id.clone(),
            message: format!(
                "buy {} more of {} to reach {:.2} per unit",
                next.quantity_needed, item.item_id, next.tier_price
            ),
            potential_savings: (tier.tier_price - next.tier_price) * f64::from(next.min_quantity),
        })
    });

    let completions = partial.iter().map(|bundle| PricingRecommendation {
        kind: RecommendationKind::BundleCompletion,
        target_id: bundle.bundle_id.clone(),
        message: format!(
            "add {} of [{}] to complete {}",
            bundle.items_needed,
            bundle.missing_items.join(", "),
            bundle.bundle_name
        ),
        potential_savings: bundle.potential_savings,
    });

    tier_upsells.chain(completions).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Calculator, PricingEngine, PricingInput};
    use crate::bundles::types::{Bundle, BundleItem, BundlePricing};
    use crate::domain::{PricingContext, PricingItem};
    use crate::errors::PricingError;
    use crate::pricing::result::RecommendationKind;
    use crate::pricing::types::{
        PriceAdjustment, PriceTier, PricingOptions, PricingRule, TierPricing,
    };

    fn context() -> PricingContext {
        PricingContext::new(Utc.with_ymd_and_hms(2026, 5, 4, 11, 0, 0).unwrap())
    }

    #[test]
    fn percentage_rule_prices_a_bulk_line() {
        let mut calculator = Calculator::default();
        calculator.add_rule(
            PricingRule::new("spring", 1).with_adjustment(PriceAdjustment::percentage(10.0)),
        );
        let input = PricingInput::new(vec![PricingItem::new("sku1", "tools", 100.0, 12)], context());

        let result = calculator.calculate(&input).expect("result");

        let item = &result.items[0];
        assert_eq!(item.final_price, 90.0);
        assert_eq!(item.total_price, 1_080.0);
        assert_eq!(item.savings, 10.0);
        assert_eq!(item.applied_rules.len(), 1);
        assert_eq!(result.subtotal, 1_080.0);
        assert_eq!(result.total_savings, 120.0);
        assert_eq!(result.grand_total, 1_080.0);
        assert!(result.is_valid);
        assert_eq!(result.currency, "USD");
        assert_eq!(result.calculated_at, input.context.timestamp);
    }

    #[test]
    fn invalid_batches_abort() {
        let calculator = Calculator::default();
        let engine: &dyn PricingEngine = &calculator;
        let input = PricingInput::new(Vec::new(), context());

        assert_eq!(engine.calculate(&input), Err(PricingError::EmptyItems));
    }

    #[test]
    fn per_call_rules_run_after_catalog_rules_of_equal_priority() {
        let mut calculator = Calculator::default();
        calculator.add_rule(PricingRule::new("catalog", 1).with_adjustment(PriceAdjustment::fixed(10.0)));
        let mut input = PricingInput::new(vec![PricingItem::new("sku1", "tools", 100.0, 1)], context());
        input.rules.push(PricingRule::new("per-call", 1).with_adjustment(PriceAdjustment::percentage(50.0)));

        let result = calculator.calculate(&input).expect("result");

        let ids: Vec<&str> =
            result.items[0].applied_rules.iter().map(|rule| rule.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["catalog", "per-call"]);
        assert_eq!(result.items[0].final_price, 45.0);
        assert_eq!(calculator.rules().len(), 1);
    }

    #[test]
    fn bundle_discount_reduces_the_grand_total() {
        let mut calculator = Calculator::default();
        calculator.add_bundle(Bundle::new(
            "pair",
            "Pair",
            vec![BundleItem::new("a", "x", 30.0), BundleItem::new("b", "x", 20.0)],
            BundlePricing::fixed(40.0),
        ));
        let input = PricingInput::new(
            vec![PricingItem::new("a", "x", 30.0, 1), PricingItem::new("b", "x", 20.0, 1)],
            context(),
        );

        let result = calculator.calculate(&input).expect("result");

        assert_eq!(result.subtotal, 50.0);
        assert_eq!(result.total_discount, 10.0);
        assert_eq!(result.total_savings, 10.0);
        assert_eq!(result.grand_total, 40.0);
        assert_eq!(result.applied_bundles.len(), 1);
        assert!(result.items.iter().all(|item| item.bundle_info.is_some()));

        let options = PricingOptions { calculate_bundles: false, ..PricingOptions::default() };
        let input = PricingInput { options: Some(options), ..input };
        let result = calculator.calculate(&input).expect("result");
        assert_eq!(result.grand_total, 50.0);
        assert!(result.applied_bundles.is_empty());
    }

    #[test]
    fn below_cost_prices_produce_warnings() {
        let mut calculator = Calculator::default();
        calculator.add_rule(PricingRule::new("clearance", 1).with_adjustment(PriceAdjustment::percentage(60.0)));
        let item = PricingItem::new("sku1", "tools", 100.0, 1).with_cost_price(50.0);
        let input = PricingInput::new(vec![item], context());

        let result = calculator.calculate(&input).expect("result");

        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("sku1"));
        assert_eq!(result.items[0].margin, Some(-25.0));
    }

    #[test]
    fn recommendations_cover_tiers_and_bundles() {
        let mut calculator = Calculator::new(PricingOptions {
            include_recommendations: true,
            ..PricingOptions::default()
        });
        calculator.add_tier_pricing(TierPricing::new(
            "volume",
            vec![
                PriceTier { min_quantity: 1, max_quantity: 9, ..PriceTier::default() },
                PriceTier { min_quantity: 10, fixed_price: Some(8.0), ..PriceTier::default() },
            ],
        ));
        calculator.add_bundle(Bundle::new(
            "starter",
            "Starter",
            vec![BundleItem::new("pen", "office", 10.0), BundleItem::new("pad", "office", 5.0)],
            BundlePricing::percentage(20.0),
        ));
        let input = PricingInput::new(vec![PricingItem::new("pen", "office", 10.0, 4)], context());

        let result = calculator.calculate(&input).expect("result");

        let kinds: Vec<RecommendationKind> =
            result.recommendations.iter().map(|recommendation| recommendation.kind).collect();
        assert_eq!(kinds, vec![RecommendationKind::TierUpsell, RecommendationKind::BundleCompletion]);
        assert!(result.recommendations[0].message.contains("6 more"));
        assert_eq!(result.recommendations[0].potential_savings, 20.0);
        assert_eq!(result.recommendations[1].target_id, "starter");
    }
}
