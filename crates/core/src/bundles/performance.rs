//! Weighted performance scoring and heuristic optimization of a single bundle.

use crate::bundles::types::{
    Bundle, BundleAnalytics, BundleImprovement, BundleOptimization, BundlePerformance,
    BundlePricing, BundlePricingType, BundleSettings, ImprovementKind, OptimizationMetrics,
    PerformanceRating,
};

const CONVERSION_WEIGHT: f64 = 0.4;
const REVENUE_WEIGHT: f64 = 0.3;
const SATISFACTION_WEIGHT: f64 = 0.2;
const RETENTION_WEIGHT: f64 = 0.1;
const SATISFACTION_SCALE: f64 = 5.0;

const CONVERSION_LIFT_PER_PERCENT: f64 = 0.5;
const REVENUE_LIFT_PER_PERCENT: f64 = 0.3;

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// `conversion*0.4 + revenue*0.3 + satisfaction*0.2 + (1 - return rate)*0.1`, each term
/// normalized to `[0, 1]`.
pub fn performance_score(analytics: &BundleAnalytics, settings: &BundleSettings) -> f64 {
    let conversion = analytics.conversion_rate.clamp(0.0, 1.0);
    let revenue = ratio(analytics.revenue, settings.revenue_target).clamp(0.0, 1.0);
    let satisfaction = (analytics.satisfaction / SATISFACTION_SCALE).clamp(0.0, 1.0);
    let retention = 1.0 - analytics.return_rate.clamp(0.0, 1.0);

    conversion * CONVERSION_WEIGHT
        + revenue * REVENUE_WEIGHT
        + satisfaction * SATISFACTION_WEIGHT
        + retention * RETENTION_WEIGHT
}

pub fn analyze_performance(
    bundle_id: &str,
    analytics: &BundleAnalytics,
    settings: &BundleSettings,
) -> BundlePerformance {
    let cart_add_rate = ratio(analytics.cart_adds as f64, analytics.views as f64);
    let purchase_rate = ratio(analytics.purchases as f64, analytics.cart_adds as f64);
    let average_order_value = ratio(analytics.revenue, analytics.purchases as f64);
    let performance_score = performance_score(analytics, settings);

    let mut insights = Vec::new();
    if analytics.views == 0 {
        insights.push("no views recorded yet".to_string());
    } else if cart_add_rate < 0.05 {
        insights.push(format!(
            "only {:.1}% of viewers add the bundle to their cart",
            cart_add_rate * 100.0
        ));
    }
    if analytics.cart_adds > 0 && purchase_rate < 0.3 {
        insights.push(format!("{:.1}% of cart adds end in a purchase", purchase_rate * 100.0));
    }
    if analytics.conversion_rate < settings.low_conversion_threshold {
        insights.push(format!(
            "conversion rate {:.1}% is below the {:.1}% target",
            analytics.conversion_rate * 100.0,
            settings.low_conversion_threshold * 100.0
        ));
    }
    if analytics.return_rate > settings.high_return_rate {
        insights.push(format!(
            "return rate {:.1}% exceeds the {:.1}% limit",
            analytics.return_rate * 100.0,
            settings.high_return_rate * 100.0
        ));
    }
    if analytics.satisfaction >= 4.0 {
        insights.push("customers rate the bundle highly".to_string());
    }
    if insights.is_empty() {
        insights.push("performance is within expected ranges".to_string());
    }

    BundlePerformance {
        bundle_id: bundle_id.to_string(),
        cart_add_rate,
        purchase_rate,
        average_order_value,
        conversion_rate: analytics.conversion_rate,
        return_rate: analytics.return_rate,
        satisfaction: analytics.satisfaction,
        performance_score,
        rating: PerformanceRating::from_score(performance_score),
        insights,
    }
}

/// Builds a candidate revision of `bundle`. The input is cloned, never modified.
pub fn optimize(
    bundle: &Bundle,
    analytics: &BundleAnalytics,
    settings: &BundleSettings,
) -> BundleOptimization {
    let score = performance_score(analytics, settings);
    let mut optimized = bundle.clone();
    let mut improvements = Vec::new();

    if score < settings.optimization_threshold {
        if analytics.conversion_rate < settings.low_conversion_threshold {
            if let Some(description) = increase_discount(&mut optimized, settings) {
                improvements.push(BundleImprovement {
                    kind: ImprovementKind::IncreaseDiscount,
                    description,
                    impact: settings.discount_step / 100.0,
                    confidence: 0.6,
                });
            }
        }

        if analytics.return_rate > settings.high_return_rate && optimized.items.len() > 1 {
            if let Some(removed) = optimized.items.pop() {
                optimized.min_items = optimized.min_items.min(optimized.items.len());
                optimized.reprice();
                improvements.push(BundleImprovement {
                    kind: ImprovementKind::TrimItems,
                    description: format!(
                        "remove {} to address a {:.1}% return rate",
                        removed.item_id,
                        analytics.return_rate * 100.0
                    ),
                    impact: analytics.return_rate - settings.high_return_rate,
                    confidence: 0.5,
                });
            }
        }
    }

    let metrics = optimization_metrics(bundle, &optimized);

    BundleOptimization {
        bundle_id: bundle.id.clone(),
        performance_score: score,
        original: bundle.clone(),
        optimized,
        improvements,
        metrics,
    }
}

fn increase_discount(bundle: &mut Bundle, settings: &BundleSettings) -> Option<String> {
    let pricing = &bundle.pricing;
    let next = match pricing.pricing_type {
        BundlePricingType::Percentage => {
            let percent = (pricing.value + settings.discount_step).min(settings.max_discount);
            (percent > pricing.value).then(|| BundlePricing::percentage(percent))
        }
        BundlePricingType::Sum => {
            let percent = settings.discount_step.min(settings.max_discount);
            (percent > 0.0).then(|| BundlePricing::percentage(percent))
        }
        BundlePricingType::Fixed => {
            let lowest = bundle.original_price * (1.0 - settings.max_discount / 100.0);
            let price = (pricing.value * (1.0 - settings.discount_step / 100.0)).max(lowest);
            (price < pricing.value).then(|| BundlePricing::fixed(price))
        }
    }?;

    let before = bundle.bundle_price;
    bundle.pricing = next;
    bundle.reprice();
    Some(format!(
        "lower the bundle price from {before:.2} to {:.2} to lift conversion",
        bundle.bundle_price
    ))
}

fn optimization_metrics(original: &Bundle, optimized: &Bundle) -> OptimizationMetrics {
    let price_change_percent =
        ratio(optimized.bundle_price - original.bundle_price, original.bundle_price) * 100.0;
    let magnitude = price_change_percent.abs();
    let expected_conversion_lift =
        if price_change_percent < 0.0 { magnitude * CONVERSION_LIFT_PER_PERCENT } else { 0.0 };

    OptimizationMetrics {
        price_change_percent,
        expected_conversion_lift,
        expected_revenue_lift: magnitude * REVENUE_LIFT_PER_PERCENT,
        heuristic: true,
    }
}
