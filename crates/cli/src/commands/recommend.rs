use std::path::Path;

use priceflow_core::bundles::types::{Bundle, BundleRecommendation};
use priceflow_core::bundles::BundleManager;
use priceflow_core::config::EngineConfig;
use priceflow_core::domain::{Customer, PricingItem};
use serde::{Deserialize, Serialize};

use crate::commands::{read_input, CommandResult};

pub const COMMAND: &str = "recommend";

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub bundles: Vec<Bundle>,
    pub cart: Vec<PricingItem>,
    #[serde(default)]
    pub customer: Customer,
}

#[derive(Debug, Serialize)]
pub struct RecommendReport {
    pub cart_items: usize,
    pub recommendations: Vec<BundleRecommendation>,
}

pub fn run(config: &EngineConfig, input_path: &Path) -> CommandResult {
    let request: RecommendRequest = match read_input(COMMAND, input_path) {
        Ok(request) => request,
        Err(failure) => return failure,
    };

    let mut manager = BundleManager::new(config.bundles.clone());
    for bundle in request.bundles {
        manager.add_bundle(bundle);
    }

    let recommendations = manager.generate_bundle_recommendations(&request.cart, &request.customer);
    CommandResult::payload(
        COMMAND,
        &RecommendReport { cart_items: request.cart.len(), recommendations },
    )
}
