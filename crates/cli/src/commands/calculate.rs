use std::collections::BTreeMap;
use std::path::Path;

use priceflow_core::bundles::types::Bundle;
use priceflow_core::config::EngineConfig;
use priceflow_core::pricing::types::{
    DynamicPricingConfig, MarketData, PricingAnalytics, PricingRule, TierPricing,
};
use priceflow_core::pricing::{Calculator, PricingEngine, PricingInput};
use serde::Deserialize;
use tracing::info;

use crate::commands::{read_input, CommandResult, EXIT_ENGINE};

pub const COMMAND: &str = "calculate";

/// Catalogs loaded into the calculator, plus the request to price.
#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    #[serde(default)]
    pub rules: Vec<PricingRule>,
    #[serde(default)]
    pub bundles: Vec<Bundle>,
    #[serde(default)]
    pub tier_pricing: Vec<TierPricing>,
    #[serde(default)]
    pub dynamic_configs: Vec<DynamicPricingConfig>,
    #[serde(default)]
    pub market_data: BTreeMap<String, MarketData>,
    #[serde(default)]
    pub analytics: BTreeMap<String, PricingAnalytics>,
    pub input: PricingInput,
}

impl CalculateRequest {
    fn into_parts(self, config: &EngineConfig) -> (Calculator, PricingInput) {
        let mut calculator = Calculator::new(config.pricing.clone());
        self.rules.into_iter().for_each(|rule| calculator.add_rule(rule));
        self.bundles.into_iter().for_each(|bundle| calculator.add_bundle(bundle));
        self.tier_pricing.into_iter().for_each(|tiers| calculator.add_tier_pricing(tiers));
        self.dynamic_configs.into_iter().for_each(|dynamic| calculator.add_dynamic_config(dynamic));
        for (item_id, market_data) in self.market_data {
            calculator.update_market_data(item_id, market_data);
        }
        for (item_id, analytics) in self.analytics {
            calculator.update_analytics(item_id, analytics);
        }
        (calculator, self.input)
    }
}

pub fn run(config: &EngineConfig, input_path: &Path) -> CommandResult {
    let request: CalculateRequest = match read_input(COMMAND, input_path) {
        Ok(request) => request,
        Err(failure) => return failure,
    };
    let (calculator, input) = request.into_parts(config);

    evaluate(&calculator, &input)
}

fn evaluate(engine: &dyn PricingEngine, input: &PricingInput) -> CommandResult {
    match engine.calculate(input) {
        Ok(result) => {
            info!(
                event_name = "cli.calculate.completed",
                items = result.items.len(),
                is_valid = result.is_valid,
                "calculate command completed"
            );
            CommandResult::payload(COMMAND, &result)
        }
        Err(error) => {
            CommandResult::failure(COMMAND, error.error_class(), error.to_string(), EXIT_ENGINE)
        }
    }
}
