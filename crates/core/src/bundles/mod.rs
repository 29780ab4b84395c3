//! Bundle lifecycle: creation from items or templates, rule-driven repricing, cart
//! recommendations and heuristic optimization.

pub mod manager;
pub mod performance;
pub mod recommend;
pub mod rules;
pub mod types;

pub use manager::{BundleManager, BundleResult};
pub use recommend::RecommendationSource;
pub use types::{
    Bundle, BundleAnalytics, BundleConstraints, BundleCustomizations, BundleItem,
    BundleOptimization, BundlePerformance, BundlePricing, BundlePricingType, BundleRecommendation,
    BundleRule, BundleSettings, BundleTemplate, CreateBundleRequest,
};
