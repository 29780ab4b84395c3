use std::env;
use std::fs;
use std::path::Path;

use priceflow_core::config::{resolve_config_path, EngineConfig, LogFormat};
use serde::Serialize;
use toml::Value;

use crate::commands::CommandResult;

pub const COMMAND: &str = "config";

#[derive(Debug, Serialize)]
pub struct ConfigReport {
    pub precedence: &'static str,
    pub config_file: Option<String>,
    pub entries: Vec<ConfigEntry>,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: String,
    pub source: String,
}

pub fn run(config: &EngineConfig, explicit_path: Option<&Path>) -> CommandResult {
    let config_file_path = resolve_config_path(explicit_path);
    let config_file_doc = config_file_path.as_deref().and_then(load_config_file_doc);
    let sources = SourceLookup { doc: config_file_doc.as_ref(), path: config_file_path.as_deref() };

    let pricing = &config.pricing;
    let bundles = &config.bundles;
    let entries = vec![
        sources.entry(
            "pricing.calculate_tiers",
            &["PRICEFLOW_PRICING_CALCULATE_TIERS"],
            pricing.calculate_tiers.to_string(),
        ),
        sources.entry(
            "pricing.calculate_bundles",
            &["PRICEFLOW_PRICING_CALCULATE_BUNDLES"],
            pricing.calculate_bundles.to_string(),
        ),
        sources.entry(
            "pricing.include_recommendations",
            &["PRICEFLOW_PRICING_INCLUDE_RECOMMENDATIONS"],
            pricing.include_recommendations.to_string(),
        ),
        sources.entry(
            "pricing.rounding_mode",
            &["PRICEFLOW_PRICING_ROUNDING_MODE"],
            String::from(pricing.rounding_mode),
        ),
        sources.entry(
            "pricing.rounding_precision",
            &["PRICEFLOW_PRICING_ROUNDING_PRECISION"],
            pricing.rounding_precision.to_string(),
        ),
        sources.entry(
            "bundles.recommendation_threshold",
            &["PRICEFLOW_BUNDLES_RECOMMENDATION_THRESHOLD"],
            bundles.recommendation_threshold.to_string(),
        ),
        sources.entry(
            "bundles.optimization_threshold",
            &["PRICEFLOW_BUNDLES_OPTIMIZATION_THRESHOLD"],
            bundles.optimization_threshold.to_string(),
        ),
        sources.entry(
            "bundles.low_conversion_threshold",
            &["PRICEFLOW_BUNDLES_LOW_CONVERSION_THRESHOLD"],
            bundles.low_conversion_threshold.to_string(),
        ),
        sources.entry(
            "bundles.high_return_rate",
            &["PRICEFLOW_BUNDLES_HIGH_RETURN_RATE"],
            bundles.high_return_rate.to_string(),
        ),
        sources.entry(
            "bundles.discount_step",
            &["PRICEFLOW_BUNDLES_DISCOUNT_STEP"],
            bundles.discount_step.to_string(),
        ),
        sources.entry(
            "bundles.max_discount",
            &["PRICEFLOW_BUNDLES_MAX_DISCOUNT"],
            bundles.max_discount.to_string(),
        ),
        sources.entry(
            "bundles.revenue_target",
            &["PRICEFLOW_BUNDLES_REVENUE_TARGET"],
            bundles.revenue_target.to_string(),
        ),
        sources.entry(
            "logging.level",
            &["PRICEFLOW_LOGGING_LEVEL", "PRICEFLOW_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        sources.entry(
            "logging.format",
            &["PRICEFLOW_LOGGING_FORMAT", "PRICEFLOW_LOG_FORMAT"],
            log_format_name(config.logging.format).to_string(),
        ),
    ];

    CommandResult::payload(
        COMMAND,
        &ConfigReport {
            precedence: "env > file > default",
            config_file: config_file_path.map(|path| path.display().to_string()),
            entries,
        },
    )
}

struct SourceLookup<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

impl SourceLookup<'_> {
    fn entry(&self, key: &'static str, env_keys: &[&str], value: String) -> ConfigEntry {
        ConfigEntry { key, value, source: self.source(key, env_keys) }
    }

    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env_is_set(key)) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

/// Blank values count as unset, as in the loader.
fn env_is_set(key: &str) -> bool {
    env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false)
}

fn load_config_file_doc(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn log_format_name(format: LogFormat) -> &'static str {
    match format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    }
}

#[cfg(test)]
mod tests {
    use super::contains_path;

    #[test]
    fn contains_path_walks_nested_tables() {
        let doc: toml::Value = "[bundles]\ndiscount_step = 2.5\n".parse().expect("valid toml");

        assert!(contains_path(&doc, "bundles.discount_step"));
        assert!(!contains_path(&doc, "bundles.max_discount"));
        assert!(!contains_path(&doc, "pricing.rounding_mode"));
    }
}
