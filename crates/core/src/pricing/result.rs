//! Output records of a calculation. Built once per `Calculator::calculate` call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry per applied rule, carrying the rule's net effect on the running price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedPricingRule {
    pub rule_id: String,
    pub rule_name: String,
    pub priority: i32,
    pub price_before: f64,
    pub price_after: f64,
    /// `price_after - price_before`
    pub adjustment: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NextTier {
    pub min_quantity: u32,
    pub tier_price: f64,
    pub quantity_needed: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierInfo {
    pub tier_pricing_id: String,
    pub tier_pricing_name: String,
    pub tier_index: usize,
    pub min_quantity: u32,
    pub max_quantity: u32,
    pub tier_price: f64,
    pub next_tier: Option<NextTier>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleInfo {
    pub bundle_id: String,
    pub bundle_name: String,
    pub matched_items: Vec<String>,
    /// Sum of matched items' original price times quantity.
    pub original_price: f64,
    /// Sum of matched items' final price times quantity.
    pub items_price: f64,
    pub bundle_price: f64,
    /// `original_price - bundle_price`
    pub bundle_savings: f64,
    /// Amount taken off the order total: `max(0, items_price - bundle_price)`.
    pub discount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricedItem {
    pub item_id: String,
    pub name: String,
    pub category: String,
    pub quantity: u32,
    /// The input base price.
    pub original_price: f64,
    /// Price entering rule application, after the dynamic and tier stages.
    pub base_price: f64,
    pub final_price: f64,
    pub unit_price: f64,
    pub total_price: f64,
    pub savings: f64,
    pub savings_percent: f64,
    pub dynamic_adjustment: f64,
    pub applied_rules: Vec<AppliedPricingRule>,
    pub tier_info: Option<TierInfo>,
    pub bundle_info: Option<BundleInfo>,
    pub margin: Option<f64>,
    pub markup: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    TierUpsell,
    BundleCompletion,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingRecommendation {
    pub kind: RecommendationKind,
    pub target_id: String,
    pub message: String,
    pub potential_savings: f64,
}

/// Callers must check both the `Err` of `calculate` and `is_valid`/`errors` before
/// trusting `items` and `grand_total`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub items: Vec<PricedItem>,
    pub subtotal: f64,
    pub total_savings: f64,
    pub total_discount: f64,
    pub grand_total: f64,
    pub currency: String,
    pub applied_bundles: Vec<BundleInfo>,
    pub recommendations: Vec<PricingRecommendation>,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub calculated_at: DateTime<Utc>,
}
