use thiserror::Error;

/// Batch-level failures of `Calculator::calculate`, plus the per-item failure kind that is
/// reported through `PricingResult::errors` instead of aborting.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PricingError {
    #[error("pricing input must contain at least one item")]
    EmptyItems,
    #[error("item at position {index} has a blank identifier")]
    BlankItemId { index: usize },
    #[error("item {item_id} has negative base price {base_price}")]
    NegativeBasePrice { item_id: String, base_price: f64 },
    #[error("item {item_id} has a non-finite base price")]
    NonFiniteBasePrice { item_id: String },
    #[error("item {item_id} must have a positive quantity")]
    NonPositiveQuantity { item_id: String },
    #[error("item {item_id} could not be priced: {reason}")]
    ItemPricingFailed { item_id: String, reason: String },
}

impl PricingError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::ItemPricingFailed { .. } => "item_pricing",
            Self::EmptyItems
            | Self::BlankItemId { .. }
            | Self::NegativeBasePrice { .. }
            | Self::NonFiniteBasePrice { .. }
            | Self::NonPositiveQuantity { .. } => "input_validation",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum BundleError {
    #[error("bundle must contain at least one item")]
    EmptyItems,
    #[error("bundle template not found: {template_id}")]
    TemplateNotFound { template_id: String },
    #[error("items do not satisfy template {template_id}: {reason}")]
    ConstraintViolation { template_id: String, reason: String },
    #[error("bundle not found: {bundle_id}")]
    BundleNotFound { bundle_id: String },
    #[error("no analytics recorded for bundle {bundle_id}")]
    AnalyticsNotFound { bundle_id: String },
    #[error("mix-and-match bundle requires between 1 and {eligible} items, got {required}")]
    InvalidMixAndMatch { required: usize, eligible: usize },
    #[error("only {qualifying} items reach minimum support {min_support}; a bundle needs at least 2")]
    InsufficientFrequencyData { qualifying: usize, min_support: f64 },
}

impl BundleError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::TemplateNotFound { .. }
            | Self::BundleNotFound { .. }
            | Self::AnalyticsNotFound { .. } => "not_found",
            Self::EmptyItems
            | Self::ConstraintViolation { .. }
            | Self::InvalidMixAndMatch { .. }
            | Self::InsufficientFrequencyData { .. } => "input_validation",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{BundleError, PricingError};

    #[test]
    fn validation_errors_name_the_offending_item() {
        let error =
            PricingError::NegativeBasePrice { item_id: "sku-7".to_owned(), base_price: -1.5 };

        assert_eq!(error.to_string(), "item sku-7 has negative base price -1.5");
        assert_eq!(error.error_class(), "input_validation");
    }

    #[test]
    fn item_failures_have_their_own_class() {
        let error = PricingError::ItemPricingFailed {
            item_id: "sku-1".to_owned(),
            reason: "final price is not finite".to_owned(),
        };

        assert_eq!(error.error_class(), "item_pricing");
        assert!(error.to_string().contains("sku-1"));
    }

    #[test]
    fn lookup_failures_map_to_not_found() {
        let error = BundleError::TemplateNotFound { template_id: "tpl-1".to_owned() };
        assert_eq!(error.error_class(), "not_found");

        let error = BundleError::EmptyItems;
        assert_eq!(error.error_class(), "input_validation");
    }
}
