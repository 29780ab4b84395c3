//! Pricing resolution: per-item pipeline (dynamic, tier, rules, rounding) followed by
//! order-level bundle matching and aggregation.

pub mod adjustment;
pub mod bundle;
pub mod calculator;
pub mod condition;
pub mod dynamic;
pub mod pipeline;
pub mod result;
pub mod rules;
pub mod tier;
pub mod types;

pub use calculator::{Calculator, PricingEngine, PricingInput};
pub use result::{
    AppliedPricingRule, BundleInfo, NextTier, PricedItem, PricingRecommendation, PricingResult,
    RecommendationKind, TierInfo,
};
pub use types::{
    AdjustmentType, ConditionLogic, ConditionOperator, ConditionType, ConditionValue,
    DemandLevel, DynamicPricingConfig, DynamicRule, FactorType, MarketData, PriceAdjustment,
    PriceTier, PricingAnalytics, PricingCondition, PricingFactor, PricingOptions, PricingRule,
    RoundingMode, TierPricing,
};
