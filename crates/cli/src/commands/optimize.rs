use std::path::Path;

use priceflow_core::bundles::types::{
    Bundle, BundleAnalytics, BundleOptimization, BundlePerformance,
};
use priceflow_core::bundles::BundleManager;
use priceflow_core::config::EngineConfig;
use priceflow_core::errors::BundleError;
use serde::{Deserialize, Serialize};

use crate::commands::{read_input, CommandResult, EXIT_ENGINE};

pub const COMMAND: &str = "optimize";

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    pub bundle: Bundle,
    pub analytics: BundleAnalytics,
}

#[derive(Debug, Serialize)]
pub struct OptimizeReport {
    pub performance: BundlePerformance,
    pub optimization: BundleOptimization,
}

pub fn run(config: &EngineConfig, input_path: &Path) -> CommandResult {
    let request: OptimizeRequest = match read_input(COMMAND, input_path) {
        Ok(request) => request,
        Err(failure) => return failure,
    };

    match optimize(config, request) {
        Ok(report) => CommandResult::payload(COMMAND, &report),
        Err(error) => {
            CommandResult::failure(COMMAND, error.error_class(), error.to_string(), EXIT_ENGINE)
        }
    }
}

fn optimize(config: &EngineConfig, request: OptimizeRequest) -> Result<OptimizeReport, BundleError> {
    let bundle_id = request.bundle.id.clone();
    let mut manager = BundleManager::new(config.bundles.clone());
    manager.add_bundle(request.bundle);
    manager.update_bundle_analytics(&bundle_id, request.analytics);

    Ok(OptimizeReport {
        performance: manager.analyze_bundle_performance(&bundle_id)?,
        optimization: manager.optimize_bundle(&bundle_id)?,
    })
}
