//! Rule, tier and dynamic-pricing configuration records consumed by the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Half-open validity check `[valid_from, valid_until)`; a missing bound is unbounded.
pub fn within_window(
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    at: DateTime<Utc>,
) -> bool {
    valid_from.map(|from| at >= from).unwrap_or(true)
        && valid_until.map(|until| at < until).unwrap_or(true)
}

/// What a condition inspects. Unrecognised names are kept as `Other` and never match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionType {
    Quantity,
    Amount,
    Inventory,
    /// Hour of day (0-23) of the context timestamp.
    Time,
    CustomerType,
    CustomerTier,
    Category,
    Brand,
    Other(String),
}

impl From<String> for ConditionType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "quantity" => Self::Quantity,
            "amount" => Self::Amount,
            "inventory" => Self::Inventory,
            "time" => Self::Time,
            "customer_type" => Self::CustomerType,
            "customer_tier" => Self::CustomerTier,
            "category" => Self::Category,
            "brand" => Self::Brand,
            _ => Self::Other(value),
        }
    }
}

impl From<ConditionType> for String {
    fn from(value: ConditionType) -> Self {
        match value {
            ConditionType::Quantity => "quantity".to_string(),
            ConditionType::Amount => "amount".to_string(),
            ConditionType::Inventory => "inventory".to_string(),
            ConditionType::Time => "time".to_string(),
            ConditionType::CustomerType => "customer_type".to_string(),
            ConditionType::CustomerTier => "customer_tier".to_string(),
            ConditionType::Category => "category".to_string(),
            ConditionType::Brand => "brand".to_string(),
            ConditionType::Other(name) => name,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[serde(rename = ">", alias = "gt")]
    GreaterThan,
    #[serde(rename = "<", alias = "lt")]
    LessThan,
    #[serde(rename = ">=", alias = "gte")]
    GreaterOrEqual,
    #[serde(rename = "<=", alias = "lte")]
    LessOrEqual,
    #[serde(rename = "=", alias = "==", alias = "eq")]
    Equal,
    #[serde(rename = "!=", alias = "ne")]
    NotEqual,
    #[serde(rename = "in")]
    In,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl From<f64> for ConditionValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<String>> for ConditionValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// How a condition's result combines with the next condition in the list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionLogic {
    #[default]
    And,
    Or,
}

impl From<String> for ConditionLogic {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("or") {
            Self::Or
        } else {
            Self::And
        }
    }
}

impl From<ConditionLogic> for String {
    fn from(value: ConditionLogic) -> Self {
        match value {
            ConditionLogic::And => "AND".to_string(),
            ConditionLogic::Or => "OR".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingCondition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub operator: ConditionOperator,
    pub value: ConditionValue,
    #[serde(default)]
    pub logic: ConditionLogic,
}

impl PricingCondition {
    pub fn new(
        condition_type: ConditionType,
        operator: ConditionOperator,
        value: impl Into<ConditionValue>,
    ) -> Self {
        Self { condition_type, operator, value: value.into(), logic: ConditionLogic::And }
    }

    pub fn or(mut self) -> Self {
        self.logic = ConditionLogic::Or;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Percentage,
    Fixed,
    Markup,
    Markdown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceAdjustment {
    #[serde(rename = "type")]
    pub adjustment_type: AdjustmentType,
    pub value: f64,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub round_to: Option<f64>,
}

impl PriceAdjustment {
    pub fn new(adjustment_type: AdjustmentType, value: f64) -> Self {
        Self { adjustment_type, value, min_price: None, max_price: None, round_to: None }
    }

    pub fn percentage(value: f64) -> Self {
        Self::new(AdjustmentType::Percentage, value)
    }

    pub fn fixed(value: f64) -> Self {
        Self::new(AdjustmentType::Fixed, value)
    }

    pub fn markup(value: f64) -> Self {
        Self::new(AdjustmentType::Markup, value)
    }

    pub fn markdown(value: f64) -> Self {
        Self::new(AdjustmentType::Markdown, value)
    }

    pub fn with_min_price(mut self, min_price: f64) -> Self {
        self.min_price = Some(min_price);
        self
    }

    pub fn with_max_price(mut self, max_price: f64) -> Self {
        self.max_price = Some(max_price);
        self
    }

    pub fn with_round_to(mut self, round_to: f64) -> Self {
        self.round_to = Some(round_to);
        self
    }
}

/// A conditional, prioritized price change. Items and customers are referenced by id,
/// category or segment only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub conditions: Vec<PricingCondition>,
    #[serde(default)]
    pub adjustments: Vec<PriceAdjustment>,
    #[serde(default)]
    pub applicable_items: Vec<String>,
    #[serde(default)]
    pub excluded_items: Vec<String>,
    #[serde(default)]
    pub customer_segments: Vec<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
}

impl PricingRule {
    pub fn new(id: impl Into<String>, priority: i32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            priority,
            valid_from: None,
            valid_until: None,
            active: true,
            conditions: Vec::new(),
            adjustments: Vec::new(),
            applicable_items: Vec::new(),
            excluded_items: Vec::new(),
            customer_segments: Vec::new(),
            channels: Vec::new(),
            regions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: PricingCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_adjustment(mut self, adjustment: PriceAdjustment) -> Self {
        self.adjustments.push(adjustment);
        self
    }

    pub fn with_validity(
        mut self,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = valid_from;
        self.valid_until = valid_until;
        self
    }

    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.active && within_window(self.valid_from, self.valid_until, at)
    }
}

/// One quantity range. `max_quantity == 0` leaves the range open-ended.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceTier {
    pub min_quantity: u32,
    pub max_quantity: u32,
    pub price: Option<f64>,
    /// Percent off the item's base price.
    pub discount: Option<f64>,
    pub fixed_price: Option<f64>,
}

impl PriceTier {
    pub fn contains(&self, quantity: u32) -> bool {
        quantity >= self.min_quantity && (self.max_quantity == 0 || quantity <= self.max_quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierPricing {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    /// Item ids or categories this config covers; empty covers every item.
    #[serde(default)]
    pub applicable_items: Vec<String>,
    pub tiers: Vec<PriceTier>,
}

impl TierPricing {
    pub fn new(id: impl Into<String>, tiers: Vec<PriceTier>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            active: true,
            valid_from: None,
            valid_until: None,
            applicable_items: Vec::new(),
            tiers,
        }
    }

    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.active && within_window(self.valid_from, self.valid_until, at)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorType {
    Demand,
    Inventory,
    Competition,
    Time,
    Weather,
    Event,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingFactor {
    #[serde(rename = "type")]
    pub factor_type: FactorType,
    pub weight: f64,
    /// Percent of base price contributed when the factor fires.
    pub impact: f64,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl PricingFactor {
    pub fn new(factor_type: FactorType, weight: f64, impact: f64) -> Self {
        Self { factor_type, weight, impact, active: true }
    }
}

/// Adjustments applied after the factor blend when every condition holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicRule {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub conditions: Vec<PricingCondition>,
    #[serde(default)]
    pub adjustments: Vec<PriceAdjustment>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicPricingConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub factors: Vec<PricingFactor>,
    #[serde(default)]
    pub rules: Vec<DynamicRule>,
    #[serde(default)]
    pub price_floor: Option<f64>,
    #[serde(default)]
    pub price_ceiling: Option<f64>,
    /// Maximum percent the price may move away from the base price.
    #[serde(default)]
    pub max_price_change: Option<f64>,
}

impl DynamicPricingConfig {
    pub fn new(id: impl Into<String>, factors: Vec<PricingFactor>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            active: true,
            factors,
            rules: Vec::new(),
            price_floor: None,
            price_ceiling: None,
            max_price_change: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandLevel {
    High,
    Normal,
    Low,
}

impl DemandLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "normal" | "medium" => Some(Self::Normal),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Already-resolved market snapshot for one item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketData {
    pub demand_level: Option<DemandLevel>,
    pub competitor_price: Option<f64>,
    pub market_average_price: Option<f64>,
    pub inventory_level: Option<u32>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingAnalytics {
    pub views: u64,
    pub purchases: u64,
    pub revenue: f64,
    pub conversion_rate: f64,
    /// 0.0 - 1.0
    pub demand_score: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoundingMode {
    #[default]
    Round,
    Floor,
    Ceil,
}

impl From<String> for RoundingMode {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl From<RoundingMode> for String {
    fn from(value: RoundingMode) -> Self {
        match value {
            RoundingMode::Round => "round".to_string(),
            RoundingMode::Floor => "floor".to_string(),
            RoundingMode::Ceil => "ceil".to_string(),
        }
    }
}

impl std::str::FromStr for RoundingMode {
    type Err = std::convert::Infallible;

    /// Unrecognised modes fall back to `Round`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.trim().to_ascii_lowercase().as_str() {
            "floor" => Self::Floor,
            "ceil" | "ceiling" => Self::Ceil,
            _ => Self::Round,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingOptions {
    pub calculate_tiers: bool,
    pub calculate_bundles: bool,
    pub include_recommendations: bool,
    pub rounding_mode: RoundingMode,
    pub rounding_precision: u32,
}

impl Default for PricingOptions {
    fn default() -> Self {
        Self {
            calculate_tiers: true,
            calculate_bundles: true,
            include_recommendations: false,
            rounding_mode: RoundingMode::Round,
            rounding_precision: 2,
        }
    }
}
