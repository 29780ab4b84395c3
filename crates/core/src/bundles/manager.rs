use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::bundles::performance::{analyze_performance, optimize};
use crate::bundles::recommend::{catalog_recommendations, rank_recommendations, RecommendationSource};
use crate::bundles::rules::apply_bundle_rules;
use crate::bundles::types::{
    Bundle, BundleAnalytics, BundleCustomizations, BundleItem, BundleOptimization,
    BundlePerformance, BundlePricing, BundleRecommendation, BundleRule, BundleSettings,
    BundleTemplate, CreateBundleRequest,
};
use crate::domain::{Customer, PricingItem};
use crate::errors::BundleError;

pub type BundleResult<T> = Result<T, BundleError>;

pub const FREQUENCY_BUNDLE_TAG: &str = "frequently_bought_together";
pub const MIX_AND_MATCH_TAG: &str = "mix_and_match";

/// Long-lived bundle catalog. Mutators take `&mut self`; callers sharing a manager across
/// threads wrap it in their own lock.
pub struct BundleManager {
    settings: BundleSettings,
    bundles: Vec<Bundle>,
    templates: BTreeMap<String, BundleTemplate>,
    rules: Vec<BundleRule>,
    analytics: BTreeMap<String, BundleAnalytics>,
    sources: Vec<Box<dyn RecommendationSource + Send + Sync>>,
}

impl Default for BundleManager {
    fn default() -> Self {
        Self::new(BundleSettings::default())
    }
}

impl BundleManager {
    pub fn new(settings: BundleSettings) -> Self {
        Self {
            settings,
            bundles: Vec::new(),
            templates: BTreeMap::new(),
            rules: Vec::new(),
            analytics: BTreeMap::new(),
            sources: Vec::new(),
        }
    }

    pub fn settings(&self) -> &BundleSettings {
        &self.settings
    }

    pub fn register_source(&mut self, source: Box<dyn RecommendationSource + Send + Sync>) {
        self.sources.push(source);
    }

    pub fn create_bundle(&mut self, request: CreateBundleRequest) -> BundleResult<Bundle> {
        let bundle = self.build_bundle(request)?;
        Ok(self.store(bundle))
    }

    pub fn create_bundle_from_template(
        &mut self,
        template_id: &str,
        items: Vec<BundleItem>,
        customizations: BundleCustomizations,
    ) -> BundleResult<Bundle> {
        let template = self
            .templates
            .get(template_id)
            .cloned()
            .ok_or_else(|| BundleError::TemplateNotFound { template_id: template_id.to_string() })?;

        if let Some(reason) = template.constraints.violation(&items) {
            return Err(BundleError::ConstraintViolation {
                template_id: template_id.to_string(),
                reason,
            });
        }

        let mut bundle = self.build_bundle(CreateBundleRequest {
            name: template.name.clone(),
            description: template.description.clone(),
            items,
            pricing: template.default_pricing.clone(),
            required_categories: template.constraints.required_categories.clone(),
            ..CreateBundleRequest::default()
        })?;

        if let Some(name) = customizations.name {
            bundle.name = name;
        }
        if let Some(description) = customizations.description {
            bundle.description = description;
        }
        if let Some(discount) = customizations.discount {
            bundle.pricing = BundlePricing::percentage(discount);
        }
        bundle.reprice();
        apply_bundle_rules(&mut bundle, &template.rules);
        bundle.tags.push(format!("template:{template_id}"));

        Ok(self.store(bundle))
    }

    /// Any `required` of the `eligible` items qualify for the bundle price.
    pub fn create_mix_and_match_bundle(
        &mut self,
        name: &str,
        eligible: Vec<BundleItem>,
        required: usize,
        pricing: BundlePricing,
    ) -> BundleResult<Bundle> {
        if required == 0 || required > eligible.len() {
            return Err(BundleError::InvalidMixAndMatch { required, eligible: eligible.len() });
        }

        let mut bundle = self.build_bundle(CreateBundleRequest {
            name: name.to_string(),
            description: format!("any {required} of {} items", eligible.len()),
            items: eligible.into_iter().map(BundleItem::optional).collect(),
            pricing,
            min_items: Some(required),
            ..CreateBundleRequest::default()
        })?;
        bundle.tags.push(MIX_AND_MATCH_TAG.to_string());

        Ok(self.store(bundle))
    }

    /// Bundles the catalog items that appear together most often in `orders`. An item's
    /// support is the fraction of orders containing it.
    pub fn create_frequency_bundle(
        &mut self,
        name: &str,
        orders: &[Vec<String>],
        catalog: &[BundleItem],
        min_support: f64,
        max_items: usize,
        discount: f64,
    ) -> BundleResult<Bundle> {
        let order_sets: Vec<BTreeSet<&str>> = orders
            .iter()
            .map(|order| order.iter().map(String::as_str).collect())
            .collect();

        let mut supported: Vec<(f64, &BundleItem)> = catalog
            .iter()
            .map(|item| (support(&order_sets, &item.item_id), item))
            .filter(|(support, _)| *support >= min_support && *support > 0.0)
            .collect();
        supported.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.item_id.cmp(&b.1.item_id))
        });
        supported.truncate(max_items);

        if supported.len() < 2 {
            return Err(BundleError::InsufficientFrequencyData {
                qualifying: supported.len(),
                min_support,
            });
        }

        let mut bundle = self.build_bundle(CreateBundleRequest {
            name: name.to_string(),
            description: format!("items bought together in at least {:.0}% of orders", min_support * 100.0),
            items: supported.into_iter().map(|(_, item)| item.clone()).collect(),
            pricing: BundlePricing::percentage(discount),
            ..CreateBundleRequest::default()
        })?;
        bundle.tags.push(FREQUENCY_BUNDLE_TAG.to_string());

        Ok(self.store(bundle))
    }

    /// Adds a prebuilt bundle, replacing any bundle with the same id.
    pub fn add_bundle(&mut self, mut bundle: Bundle) {
        bundle.reprice();
        self.bundles.retain(|existing| existing.id != bundle.id);
        self.bundles.push(bundle);
    }

    pub fn add_bundle_template(&mut self, template: BundleTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn add_bundle_rule(&mut self, rule: BundleRule) {
        self.rules.push(rule);
    }

    pub fn update_bundle_analytics(&mut self, bundle_id: &str, analytics: BundleAnalytics) {
        self.analytics.insert(bundle_id.to_string(), analytics);
    }

    pub fn generate_bundle_recommendations(
        &self,
        cart: &[PricingItem],
        customer: &Customer,
    ) -> Vec<BundleRecommendation> {
        let mut recommendations = catalog_recommendations(
            self.get_active_bundles(),
            cart,
            self.settings.recommendation_threshold,
        );
        for source in &self.sources {
            let candidates = source.candidates(cart, customer, &self.bundles);
            debug!(
                event_name = "bundles.recommendations.source",
                source = source.name(),
                candidates = candidates.len(),
                "recommendation source consulted"
            );
            recommendations.extend(candidates);
        }
        rank_recommendations(&mut recommendations);

        debug!(
            event_name = "bundles.recommendations.generated",
            cart_items = cart.len(),
            recommendations = recommendations.len(),
            "bundle recommendations generated"
        );
        recommendations
    }

    pub fn analyze_bundle_performance(&self, bundle_id: &str) -> BundleResult<BundlePerformance> {
        let (_, analytics) = self.bundle_with_analytics(bundle_id)?;
        Ok(analyze_performance(bundle_id, analytics, &self.settings))
    }

    /// Proposes a revised bundle. The stored bundle is left untouched.
    pub fn optimize_bundle(&self, bundle_id: &str) -> BundleResult<BundleOptimization> {
        let (bundle, analytics) = self.bundle_with_analytics(bundle_id)?;
        let optimization = optimize(bundle, analytics, &self.settings);

        info!(
            event_name = "bundles.bundle.optimized",
            bundle_id,
            performance_score = optimization.performance_score,
            improvements = optimization.improvements.len(),
            "bundle optimization computed"
        );
        Ok(optimization)
    }

    pub fn get_bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    pub fn get_bundle(&self, bundle_id: &str) -> Option<&Bundle> {
        self.bundles.iter().find(|bundle| bundle.id == bundle_id)
    }

    pub fn get_bundle_analytics(&self, bundle_id: &str) -> Option<&BundleAnalytics> {
        self.analytics.get(bundle_id)
    }

    pub fn get_active_bundles(&self) -> Vec<&Bundle> {
        self.active_bundles_at(Utc::now())
    }

    pub fn active_bundles_at(&self, at: DateTime<Utc>) -> Vec<&Bundle> {
        self.bundles.iter().filter(|bundle| bundle.is_available_at(at)).collect()
    }

    /// Drops every bundle and its analytics. Templates and rules are kept.
    pub fn clear_bundles(&mut self) {
        self.bundles.clear();
        self.analytics.clear();
    }

    fn build_bundle(&self, request: CreateBundleRequest) -> BundleResult<Bundle> {
        if request.items.is_empty() {
            return Err(BundleError::EmptyItems);
        }

        let mut bundle =
            Bundle::new(Uuid::new_v4().to_string(), request.name, request.items, request.pricing);
        bundle.description = request.description;
        if let Some(min_items) = request.min_items {
            bundle.min_items = min_items;
        }
        bundle.required_categories = request.required_categories;
        bundle.valid_from = request.valid_from;
        bundle.valid_until = request.valid_until;
        bundle.priority = request.priority;
        bundle.tags = request.tags;
        bundle.created_at = Some(Utc::now());
        bundle.reprice();

        apply_bundle_rules(&mut bundle, &self.rules);
        Ok(bundle)
    }

    fn store(&mut self, bundle: Bundle) -> Bundle {
        info!(
            event_name = "bundles.bundle.created",
            bundle_id = %bundle.id,
            items = bundle.items.len(),
            bundle_price = bundle.bundle_price,
            "bundle created"
        );
        self.bundles.push(bundle.clone());
        bundle
    }

    fn bundle_with_analytics(&self, bundle_id: &str) -> BundleResult<(&Bundle, &BundleAnalytics)> {
        let bundle = self
            .get_bundle(bundle_id)
            .ok_or_else(|| BundleError::BundleNotFound { bundle_id: bundle_id.to_string() })?;
        let analytics = self
            .analytics
            .get(bundle_id)
            .ok_or_else(|| BundleError::AnalyticsNotFound { bundle_id: bundle_id.to_string() })?;
        Ok((bundle, analytics))
    }
}

fn support(orders: &[BTreeSet<&str>], item_id: &str) -> f64 {
    if orders.is_empty() {
        return 0.0;
    }
    let hits = orders.iter().filter(|order| order.contains(item_id)).count();
    hits as f64 / orders.len() as f64
}
