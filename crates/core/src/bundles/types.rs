//! Bundle catalog records, templates and rules, plus the report types produced by
//! recommendation and optimization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pricing::types::{within_window, PricingCondition};

fn default_true() -> bool {
    true
}

fn default_quantity() -> u32 {
    1
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundlePricingType {
    /// The bundle sells for `value`.
    Fixed,
    /// `value` percent off the items total.
    Percentage,
    /// The items total, unchanged.
    #[default]
    Sum,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BundlePricing {
    #[serde(rename = "type")]
    pub pricing_type: BundlePricingType,
    #[serde(default)]
    pub value: f64,
}

impl BundlePricing {
    pub fn fixed(price: f64) -> Self {
        Self { pricing_type: BundlePricingType::Fixed, value: price }
    }

    pub fn percentage(percent: f64) -> Self {
        Self { pricing_type: BundlePricingType::Percentage, value: percent }
    }

    pub fn sum() -> Self {
        Self::default()
    }

    pub fn price_for(&self, items_total: f64) -> f64 {
        match self.pricing_type {
            BundlePricingType::Fixed => self.value,
            BundlePricingType::Percentage => {
                (items_total - items_total * self.value / 100.0).max(0.0)
            }
            BundlePricingType::Sum => items_total,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleItem {
    pub item_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default = "default_true")]
    pub required: bool,
}

impl BundleItem {
    pub fn new(item_id: impl Into<String>, category: impl Into<String>, unit_price: f64) -> Self {
        Self {
            item_id: item_id.into(),
            name: String::new(),
            category: category.into(),
            unit_price,
            quantity: 1,
            required: true,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub items: Vec<BundleItem>,
    #[serde(default)]
    pub required_categories: Vec<String>,
    /// How many listed items an order must contain for the bundle to apply.
    #[serde(default)]
    pub min_items: usize,
    #[serde(default)]
    pub pricing: BundlePricing,
    /// Carried for callers; not enforced when matching.
    #[serde(default)]
    pub conditions: Vec<PricingCondition>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub original_price: f64,
    #[serde(default)]
    pub bundle_price: f64,
    #[serde(default)]
    pub savings: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Bundle {
    /// Builds an active bundle whose `min_items` equals its item count, priced immediately.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        items: Vec<BundleItem>,
        pricing: BundlePricing,
    ) -> Self {
        let mut bundle = Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            min_items: items.len(),
            items,
            required_categories: Vec::new(),
            pricing,
            conditions: Vec::new(),
            active: true,
            valid_from: None,
            valid_until: None,
            priority: 0,
            tags: Vec::new(),
            original_price: 0.0,
            bundle_price: 0.0,
            savings: 0.0,
            created_at: None,
        };
        bundle.reprice();
        bundle
    }

    pub fn is_available_at(&self, at: DateTime<Utc>) -> bool {
        self.active && within_window(self.valid_from, self.valid_until, at)
    }

    pub fn contains_item(&self, item_id: &str) -> bool {
        self.items.iter().any(|item| item.item_id == item_id)
    }

    /// Display total: every required item plus enough optional items, in list order, to
    /// reach `min_items`.
    pub fn item_total(&self) -> f64 {
        let required = self.items.iter().filter(|item| item.required);
        let optional_needed = self.min_items.saturating_sub(required.clone().count());
        required
            .chain(self.items.iter().filter(|item| !item.required).take(optional_needed))
            .map(BundleItem::line_total)
            .sum()
    }

    /// Recomputes `original_price`, `bundle_price` and `savings` from the items and pricing.
    pub fn reprice(&mut self) {
        self.original_price = self.item_total();
        self.bundle_price = self.pricing.price_for(self.original_price);
        self.savings = self.original_price - self.bundle_price;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleAnalytics {
    pub views: u64,
    pub cart_adds: u64,
    pub purchases: u64,
    pub revenue: f64,
    /// 0.0 - 1.0
    pub conversion_rate: f64,
    /// 0.0 - 1.0
    pub return_rate: f64,
    /// 0.0 - 5.0
    pub satisfaction: f64,
    pub updated_at: Option<DateTime<Utc>>,
}

/// `max_items == 0` leaves the item count unbounded above.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConstraints {
    pub min_items: usize,
    pub max_items: usize,
    pub required_categories: Vec<String>,
    pub excluded_categories: Vec<String>,
}

impl BundleConstraints {
    /// First violated constraint, if any.
    pub fn violation(&self, items: &[BundleItem]) -> Option<String> {
        if items.len() < self.min_items {
            return Some(format!("needs at least {} items, got {}", self.min_items, items.len()));
        }
        if self.max_items > 0 && items.len() > self.max_items {
            return Some(format!("allows at most {} items, got {}", self.max_items, items.len()));
        }
        if let Some(missing) = self
            .required_categories
            .iter()
            .find(|category| !items.iter().any(|item| &item.category == *category))
        {
            return Some(format!("required category {missing} is missing"));
        }
        if let Some(excluded) = items
            .iter()
            .find(|item| self.excluded_categories.iter().any(|category| *category == item.category))
        {
            return Some(format!(
                "item {} is in excluded category {}",
                excluded.item_id, excluded.category
            ));
        }
        None
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleTemplate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub constraints: BundleConstraints,
    #[serde(default)]
    pub default_pricing: BundlePricing,
    #[serde(default)]
    pub rules: Vec<BundleRule>,
}

/// Predicates over the bundle's own items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BundleRuleCondition {
    /// Some item is in `category`.
    Category { category: String },
    /// The items total lies within the bounds.
    PriceRange {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// The summed item quantity lies within the bounds.
    QuantityRange {
        #[serde(default)]
        min: Option<u32>,
        #[serde(default)]
        max: Option<u32>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BundleRuleAction {
    SetDiscount { percent: f64 },
    SetFixedPrice { price: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleRule {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub conditions: Vec<BundleRuleCondition>,
    #[serde(default)]
    pub actions: Vec<BundleRuleAction>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateBundleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub items: Vec<BundleItem>,
    #[serde(default)]
    pub pricing: BundlePricing,
    /// Defaults to the number of items.
    #[serde(default)]
    pub min_items: Option<usize>,
    #[serde(default)]
    pub required_categories: Vec<String>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleCustomizations {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Percent discount replacing the template's default pricing.
    pub discount: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleRecommendationKind {
    CatalogMatch,
    CrossSell,
    Upsell,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleRecommendation {
    pub bundle_id: String,
    pub bundle_name: String,
    pub kind: BundleRecommendationKind,
    pub original_price: f64,
    pub bundle_price: f64,
    pub savings: f64,
    pub confidence: f64,
    pub priority: i32,
    /// Bundle item ids not yet in the cart.
    pub missing_items: Vec<String>,
    pub reason: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl PerformanceRating {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Self::Excellent
        } else if score >= 0.6 {
            Self::Good
        } else if score >= 0.4 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundlePerformance {
    pub bundle_id: String,
    /// cart adds / views
    pub cart_add_rate: f64,
    /// purchases / cart adds
    pub purchase_rate: f64,
    pub average_order_value: f64,
    pub conversion_rate: f64,
    pub return_rate: f64,
    pub satisfaction: f64,
    pub performance_score: f64,
    pub rating: PerformanceRating,
    pub insights: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementKind {
    IncreaseDiscount,
    TrimItems,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleImprovement {
    pub kind: ImprovementKind,
    pub description: String,
    pub impact: f64,
    pub confidence: f64,
}

/// Linear estimates derived from the price change; not a demand model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationMetrics {
    pub price_change_percent: f64,
    pub expected_conversion_lift: f64,
    pub expected_revenue_lift: f64,
    pub heuristic: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleOptimization {
    pub bundle_id: String,
    pub performance_score: f64,
    pub original: Bundle,
    pub optimized: Bundle,
    pub improvements: Vec<BundleImprovement>,
    pub metrics: OptimizationMetrics,
}

/// Tunables for recommendation and optimization, loaded from the `[bundles]` config section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleSettings {
    pub recommendation_threshold: f64,
    pub optimization_threshold: f64,
    pub low_conversion_threshold: f64,
    pub high_return_rate: f64,
    pub discount_step: f64,
    pub max_discount: f64,
    pub revenue_target: f64,
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self {
            recommendation_threshold: 0.5,
            optimization_threshold: 0.7,
            low_conversion_threshold: 0.1,
            high_return_rate: 0.15,
            discount_step: 5.0,
            max_discount: 50.0,
            revenue_target: 10_000.0,
        }
    }
}
