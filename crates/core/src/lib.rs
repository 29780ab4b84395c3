pub mod bundles;
pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;

pub use bundles::{
    Bundle, BundleAnalytics, BundleItem, BundleManager, BundleOptimization, BundlePerformance,
    BundlePricing, BundleRecommendation, BundleSettings, BundleTemplate, CreateBundleRequest,
    RecommendationSource,
};
pub use config::{EngineConfig, LoadOptions};
pub use domain::{Customer, PricingContext, PricingItem};
pub use errors::{BundleError, PricingError};
pub use pricing::{
    Calculator, PricingEngine, PricingInput, PricingOptions, PricingResult, PricingRule,
};
