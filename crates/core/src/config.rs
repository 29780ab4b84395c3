use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bundles::types::BundleSettings;
use crate::pricing::types::{PricingOptions, RoundingMode};

pub const CONFIG_FILE_NAME: &str = "priceflow.toml";
pub const NESTED_CONFIG_FILE: &str = "config/priceflow.toml";

const MAX_ROUNDING_PRECISION: u32 = 10;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineConfig {
    pub pricing: PricingOptions,
    pub bundles: BundleSettings,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub rounding_mode: Option<RoundingMode>,
    pub rounding_precision: Option<u32>,
    pub include_recommendations: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } | Self::MissingConfigFile(_) => "config_io",
            Self::ParseFile { .. }
            | Self::MissingEnvInterpolation { .. }
            | Self::UnterminatedInterpolation => "config_parse",
            Self::InvalidEnvOverride { .. } | Self::Validation(_) => "config_validation",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl EngineConfig {
    /// Defaults, then the config file, then `PRICEFLOW_*` variables, then `overrides`.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(pricing) = patch.pricing {
            if let Some(calculate_tiers) = pricing.calculate_tiers {
                self.pricing.calculate_tiers = calculate_tiers;
            }
            if let Some(calculate_bundles) = pricing.calculate_bundles {
                self.pricing.calculate_bundles = calculate_bundles;
            }
            if let Some(include_recommendations) = pricing.include_recommendations {
                self.pricing.include_recommendations = include_recommendations;
            }
            if let Some(rounding_mode) = pricing.rounding_mode {
                self.pricing.rounding_mode = rounding_mode;
            }
            if let Some(rounding_precision) = pricing.rounding_precision {
                self.pricing.rounding_precision = rounding_precision;
            }
        }

        if let Some(bundles) = patch.bundles {
            let settings = &mut self.bundles;
            let fields = [
                (bundles.recommendation_threshold, &mut settings.recommendation_threshold),
                (bundles.optimization_threshold, &mut settings.optimization_threshold),
                (bundles.low_conversion_threshold, &mut settings.low_conversion_threshold),
                (bundles.high_return_rate, &mut settings.high_return_rate),
                (bundles.discount_step, &mut settings.discount_step),
                (bundles.max_discount, &mut settings.max_discount),
                (bundles.revenue_target, &mut settings.revenue_target),
            ];
            for (value, target) in fields {
                if let Some(value) = value {
                    *target = value;
                }
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PRICEFLOW_PRICING_CALCULATE_TIERS") {
            self.pricing.calculate_tiers = parse_bool("PRICEFLOW_PRICING_CALCULATE_TIERS", &value)?;
        }
        if let Some(value) = read_env("PRICEFLOW_PRICING_CALCULATE_BUNDLES") {
            self.pricing.calculate_bundles =
                parse_bool("PRICEFLOW_PRICING_CALCULATE_BUNDLES", &value)?;
        }
        if let Some(value) = read_env("PRICEFLOW_PRICING_INCLUDE_RECOMMENDATIONS") {
            self.pricing.include_recommendations =
                parse_bool("PRICEFLOW_PRICING_INCLUDE_RECOMMENDATIONS", &value)?;
        }
        if let Some(value) = read_env("PRICEFLOW_PRICING_ROUNDING_MODE") {
            self.pricing.rounding_mode = RoundingMode::from(value);
        }
        if let Some(value) = read_env("PRICEFLOW_PRICING_ROUNDING_PRECISION") {
            self.pricing.rounding_precision =
                parse_u32("PRICEFLOW_PRICING_ROUNDING_PRECISION", &value)?;
        }

        let settings = &mut self.bundles;
        let bundle_fields = [
            ("PRICEFLOW_BUNDLES_RECOMMENDATION_THRESHOLD", &mut settings.recommendation_threshold),
            ("PRICEFLOW_BUNDLES_OPTIMIZATION_THRESHOLD", &mut settings.optimization_threshold),
            ("PRICEFLOW_BUNDLES_LOW_CONVERSION_THRESHOLD", &mut settings.low_conversion_threshold),
            ("PRICEFLOW_BUNDLES_HIGH_RETURN_RATE", &mut settings.high_return_rate),
            ("PRICEFLOW_BUNDLES_DISCOUNT_STEP", &mut settings.discount_step),
            ("PRICEFLOW_BUNDLES_MAX_DISCOUNT", &mut settings.max_discount),
            ("PRICEFLOW_BUNDLES_REVENUE_TARGET", &mut settings.revenue_target),
        ];
        for (key, target) in bundle_fields {
            if let Some(value) = read_env(key) {
                *target = parse_f64(key, &value)?;
            }
        }

        let log_level =
            read_env("PRICEFLOW_LOGGING_LEVEL").or_else(|| read_env("PRICEFLOW_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PRICEFLOW_LOGGING_FORMAT").or_else(|| read_env("PRICEFLOW_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(rounding_mode) = overrides.rounding_mode {
            self.pricing.rounding_mode = rounding_mode;
        }
        if let Some(rounding_precision) = overrides.rounding_precision {
            self.pricing.rounding_precision = rounding_precision;
        }
        if let Some(include_recommendations) = overrides.include_recommendations {
            self.pricing.include_recommendations = include_recommendations;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pricing(&self.pricing)?;
        validate_bundles(&self.bundles)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The file `load` would read: an explicit path if it exists, else `priceflow.toml`, else
/// `config/priceflow.toml`.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(CONFIG_FILE_NAME), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_pricing(pricing: &PricingOptions) -> Result<(), ConfigError> {
    if pricing.rounding_precision > MAX_ROUNDING_PRECISION {
        return Err(ConfigError::Validation(format!(
            "pricing.rounding_precision must be in range 0..={MAX_ROUNDING_PRECISION}"
        )));
    }
    Ok(())
}

fn validate_bundles(bundles: &BundleSettings) -> Result<(), ConfigError> {
    let fractions = [
        ("bundles.recommendation_threshold", bundles.recommendation_threshold),
        ("bundles.optimization_threshold", bundles.optimization_threshold),
        ("bundles.low_conversion_threshold", bundles.low_conversion_threshold),
        ("bundles.high_return_rate", bundles.high_return_rate),
    ];
    for (key, value) in fractions {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::Validation(format!("{key} must be in range 0.0..=1.0")));
        }
    }

    if !(bundles.discount_step > 0.0 && bundles.discount_step <= 100.0) {
        return Err(ConfigError::Validation(
            "bundles.discount_step must be greater than 0 and at most 100".to_string(),
        ));
    }
    if !(bundles.max_discount > 0.0 && bundles.max_discount <= 100.0) {
        return Err(ConfigError::Validation(
            "bundles.max_discount must be greater than 0 and at most 100".to_string(),
        ));
    }
    if !(bundles.revenue_target > 0.0 && bundles.revenue_target.is_finite()) {
        return Err(ConfigError::Validation(
            "bundles.revenue_target must be a positive amount".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    pricing: Option<PricingPatch>,
    bundles: Option<BundlesPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    calculate_tiers: Option<bool>,
    calculate_bundles: Option<bool>,
    include_recommendations: Option<bool>,
    rounding_mode: Option<RoundingMode>,
    rounding_precision: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct BundlesPatch {
    recommendation_threshold: Option<f64>,
    optimization_threshold: Option<f64>,
    low_conversion_threshold: Option<f64>,
    high_return_rate: Option<f64>,
    discount_step: Option<f64>,
    max_discount: Option<f64>,
    revenue_target: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{ConfigError, ConfigOverrides, EngineConfig, LoadOptions, LogFormat};
    use crate::pricing::types::RoundingMode;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn write_config(dir: &TempDir, contents: &str) -> Result<std::path::PathBuf, String> {
        let path = dir.path().join("priceflow.toml");
        fs::write(&path, contents).map_err(|err| err.to_string())?;
        Ok(path)
    }

    #[test]
    fn defaults_match_engine_behaviour() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = EngineConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.pricing.rounding_precision == 2, "default precision should be 2")?;
        ensure(config.pricing.calculate_tiers, "tiers should be on by default")?;
        ensure(!config.pricing.include_recommendations, "recommendations should be off")?;
        ensure(config.bundles.recommendation_threshold == 0.5, "threshold should be 0.5")?;
        ensure(config.bundles.optimization_threshold == 0.7, "optimization threshold is 0.7")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logs by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_PRICEFLOW_PRECISION", "3");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[pricing]
rounding_mode = "floor"
rounding_precision = ${TEST_PRICEFLOW_PRECISION}

[bundles]
revenue_target = 25000.0
"#,
            )?;

            let config =
                EngineConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.pricing.rounding_precision == 3, "precision should come from env")?;
            ensure(config.pricing.rounding_mode == RoundingMode::Floor, "mode should be floor")?;
            ensure(config.bundles.revenue_target == 25_000.0, "revenue target should be read")?;
            Ok(())
        })();

        clear_vars(&["TEST_PRICEFLOW_PRECISION"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(&dir, "[logging]\nlevel = \"${PRICEFLOW_TEST_UNSET_VAR}\"\n")?;

        match EngineConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }) {
            Err(ConfigError::MissingEnvInterpolation { var }) => {
                ensure(var == "PRICEFLOW_TEST_UNSET_VAR", "error should name the variable")
            }
            other => Err(format!("expected interpolation failure, got {other:?}")),
        }
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRICEFLOW_LOG_LEVEL", "warn");
        env::set_var("PRICEFLOW_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = EngineConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["PRICEFLOW_LOG_LEVEL", "PRICEFLOW_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRICEFLOW_PRICING_ROUNDING_MODE", "ceil");
        env::set_var("PRICEFLOW_BUNDLES_DISCOUNT_STEP", "7.5");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[pricing]
rounding_mode = "floor"
rounding_precision = 4

[bundles]
discount_step = 2.0

[logging]
level = "warn"
"#,
            )?;

            let config = EngineConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    rounding_precision: Some(1),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.pricing.rounding_precision == 1, "override precision should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.pricing.rounding_mode == RoundingMode::Ceil, "env mode should win")?;
            ensure(config.bundles.discount_step == 7.5, "env discount step should win")?;
            Ok(())
        })();

        clear_vars(&["PRICEFLOW_PRICING_ROUNDING_MODE", "PRICEFLOW_BUNDLES_DISCOUNT_STEP"]);
        result
    }

    #[test]
    fn malformed_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRICEFLOW_PRICING_CALCULATE_TIERS", "sometimes");

        let result = match EngineConfig::load(LoadOptions::default()) {
            Err(error @ ConfigError::InvalidEnvOverride { .. }) => {
                ensure(error.error_class() == "config_validation", "class should be validation")
            }
            other => Err(format!("expected invalid override, got {other:?}")),
        };

        clear_vars(&["PRICEFLOW_PRICING_CALCULATE_TIERS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRICEFLOW_BUNDLES_RECOMMENDATION_THRESHOLD", "1.5");

        let result = (|| -> Result<(), String> {
            let error = match EngineConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("recommendation_threshold")
            );
            ensure(has_message, "validation failure should name the offending key")
        })();

        clear_vars(&["PRICEFLOW_BUNDLES_RECOMMENDATION_THRESHOLD"]);
        result
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let missing = dir.path().join("absent.toml");
        let result = EngineConfig::load(LoadOptions {
            config_path: Some(missing),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should fail",
        )
    }
}
