//! Market-responsive pricing: a weighted blend of factor impacts on the base price,
//! followed by dynamic rules, floor/ceiling clamps and the maximum-change clamp.

use crate::pricing::adjustment::apply_adjustments;
use crate::pricing::condition::{evaluate_conditions, ConditionSubject};
use crate::pricing::types::{
    DemandLevel, DynamicPricingConfig, FactorType, MarketData, PricingAnalytics, PricingFactor,
};

const SCARCE_INVENTORY: u32 = 10;
const SURPLUS_INVENTORY: u32 = 100;
const PEAK_HOURS: std::ops::RangeInclusive<u32> = 18..=22;
const HIGH_DEMAND_SCORE: f64 = 0.7;
const LOW_DEMAND_SCORE: f64 = 0.3;

/// Market signals known for the item being priced.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarketSignals<'a> {
    pub market_data: Option<&'a MarketData>,
    pub analytics: Option<&'a PricingAnalytics>,
}

/// Only the first active config is ever applied. Additional active configs are not
/// blended in; keep it that way unless the selection semantics are changed on purpose.
pub fn select_config(configs: &[DynamicPricingConfig]) -> Option<&DynamicPricingConfig> {
    configs.iter().find(|config| config.active)
}

pub fn apply_dynamic_pricing(
    config: &DynamicPricingConfig,
    subject: &ConditionSubject<'_>,
    signals: MarketSignals<'_>,
) -> f64 {
    let base_price = subject.item.base_price;

    let delta: f64 = config
        .factors
        .iter()
        .filter(|factor| factor.active)
        .map(|factor| base_price * factor_impact(factor, subject, signals) * factor.weight / 100.0)
        .sum();
    let mut price = base_price + delta;

    for rule in &config.rules {
        if evaluate_conditions(&rule.conditions, subject) {
            price = apply_adjustments(price, &rule.adjustments);
        }
    }

    if let Some(floor) = config.price_floor {
        price = price.max(floor);
    }
    if let Some(ceiling) = config.price_ceiling {
        price = price.min(ceiling);
    }

    if let Some(max_change) = config.max_price_change {
        if base_price > 0.0 {
            let change_percent = (price - base_price) / base_price * 100.0;
            if change_percent.abs() > max_change {
                price = base_price + base_price * max_change.copysign(change_percent) / 100.0;
            }
        }
    }

    price
}

/// Signed impact of one factor: `+impact`, `-impact` or zero when the factor does not fire.
pub fn factor_impact(
    factor: &PricingFactor,
    subject: &ConditionSubject<'_>,
    signals: MarketSignals<'_>,
) -> f64 {
    let direction = match factor.factor_type {
        FactorType::Demand => match demand_level(subject, signals) {
            Some(DemandLevel::High) => 1.0,
            Some(DemandLevel::Low) => -1.0,
            Some(DemandLevel::Normal) | None => 0.0,
        },
        FactorType::Inventory => {
            let level = subject
                .item
                .inventory_level
                .or_else(|| signals.market_data.and_then(|data| data.inventory_level));
            match level {
                Some(level) if level < SCARCE_INVENTORY => 1.0,
                Some(level) if level > SURPLUS_INVENTORY => -1.0,
                _ => 0.0,
            }
        }
        FactorType::Competition => {
            let prices = signals
                .market_data
                .and_then(|data| data.competitor_price.zip(data.market_average_price));
            match prices {
                Some((competitor, average)) if competitor > average => -1.0,
                Some((competitor, average)) if competitor < average => 1.0,
                _ => 0.0,
            }
        }
        FactorType::Time => {
            if PEAK_HOURS.contains(&subject.context.hour()) {
                1.0
            } else {
                0.0
            }
        }
        FactorType::Weather => {
            let bad_weather = subject
                .context
                .attribute("weather")
                .map(|weather| {
                    weather.eq_ignore_ascii_case("rain") || weather.eq_ignore_ascii_case("snow")
                })
                .unwrap_or(false);
            if bad_weather {
                1.0
            } else {
                0.0
            }
        }
        FactorType::Event => {
            if subject.context.has_event() {
                1.0
            } else {
                0.0
            }
        }
    };

    direction * factor.impact
}

/// Market data wins, then the context's `demand` attribute, then the analytics demand score.
fn demand_level(subject: &ConditionSubject<'_>, signals: MarketSignals<'_>) -> Option<DemandLevel> {
    if let Some(level) = signals.market_data.and_then(|data| data.demand_level) {
        return Some(level);
    }
    if let Some(level) = subject.context.attribute("demand").and_then(DemandLevel::parse) {
        return Some(level);
    }

    signals.analytics.map(|analytics| {
        if analytics.demand_score >= HIGH_DEMAND_SCORE {
            DemandLevel::High
        } else if analytics.demand_score <= LOW_DEMAND_SCORE {
            DemandLevel::Low
        } else {
            DemandLevel::Normal
        }
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{apply_dynamic_pricing, select_config, MarketSignals};
    use crate::domain::{Customer, PricingContext, PricingItem};
    use crate::pricing::condition::ConditionSubject;
    use crate::pricing::types::{
        ConditionOperator, ConditionType, DemandLevel, DynamicPricingConfig, DynamicRule,
        FactorType, MarketData, PricingAnalytics, PricingCondition, PricingFactor,
        PriceAdjustment,
    };

    fn midday() -> PricingContext {
        PricingContext::new(Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap())
    }

    fn evening() -> PricingContext {
        PricingContext::new(Utc.with_ymd_and_hms(2026, 6, 1, 20, 0, 0).unwrap())
    }

    #[test]
    fn weighted_factors_blend_into_price_delta() {
        let item = PricingItem::new("sku1", "umbrellas", 100.0, 1).with_inventory_level(5);
        let customer = Customer::default();
        let context = evening().with_attribute("weather", "rain");
        let subject = ConditionSubject::new(&item, &customer, &context);

        let config = DynamicPricingConfig::new(
            "surge",
            vec![
                PricingFactor::new(FactorType::Inventory, 1.0, 10.0),
                PricingFactor::new(FactorType::Weather, 0.5, 10.0),
                PricingFactor::new(FactorType::Time, 1.0, 2.0),
                PricingFactor::new(FactorType::Event, 1.0, 50.0),
            ],
        );

        // +10 (scarcity) +5 (rain at half weight) +2 (peak hours), no event.
        let price = apply_dynamic_pricing(&config, &subject, MarketSignals::default());
        assert!((price - 117.0).abs() < 1e-9);
    }

    #[test]
    fn inactive_factors_are_ignored() {
        let item = PricingItem::new("sku1", "umbrellas", 100.0, 1).with_inventory_level(500);
        let customer = Customer::default();
        let context = midday();
        let subject = ConditionSubject::new(&item, &customer, &context);

        let mut glut = PricingFactor::new(FactorType::Inventory, 1.0, 10.0);
        glut.active = false;
        let config = DynamicPricingConfig::new("glut", vec![glut]);

        assert_eq!(apply_dynamic_pricing(&config, &subject, MarketSignals::default()), 100.0);
    }

    #[test]
    fn demand_and_competition_read_market_data() {
        let item = PricingItem::new("sku1", "tv", 200.0, 1);
        let customer = Customer::default();
        let context = midday();
        let subject = ConditionSubject::new(&item, &customer, &context);
        let market = MarketData {
            demand_level: Some(DemandLevel::Low),
            competitor_price: Some(210.0),
            market_average_price: Some(200.0),
            ..MarketData::default()
        };

        let config = DynamicPricingConfig::new(
            "market",
            vec![
                PricingFactor::new(FactorType::Demand, 1.0, 5.0),
                PricingFactor::new(FactorType::Competition, 1.0, 5.0),
            ],
        );

        let signals = MarketSignals { market_data: Some(&market), analytics: None };
        let price = apply_dynamic_pricing(&config, &subject, signals);
        assert!((price - 180.0).abs() < 1e-9);
    }

    #[test]
    fn cheaper_competitors_and_snow_raise_the_price() {
        let item = PricingItem::new("sku1", "boots", 100.0, 1);
        let customer = Customer::default();
        let context = midday().with_attribute("weather", "Snow");
        let subject = ConditionSubject::new(&item, &customer, &context);
        let market = MarketData {
            competitor_price: Some(90.0),
            market_average_price: Some(100.0),
            ..MarketData::default()
        };

        let config = DynamicPricingConfig::new(
            "winter",
            vec![
                PricingFactor::new(FactorType::Competition, 1.0, 4.0),
                PricingFactor::new(FactorType::Weather, 1.0, 6.0),
            ],
        );

        let signals = MarketSignals { market_data: Some(&market), analytics: None };
        assert!((apply_dynamic_pricing(&config, &subject, signals) - 110.0).abs() < 1e-9);
    }

    #[test]
    fn demand_falls_back_to_analytics_score() {
        let item = PricingItem::new("sku1", "tv", 100.0, 1);
        let customer = Customer::default();
        let context = midday();
        let subject = ConditionSubject::new(&item, &customer, &context);
        let analytics = PricingAnalytics { demand_score: 0.9, ..PricingAnalytics::default() };

        let config = DynamicPricingConfig::new(
            "demand",
            vec![PricingFactor::new(FactorType::Demand, 1.0, 8.0)],
        );
        let signals = MarketSignals { market_data: None, analytics: Some(&analytics) };

        assert!((apply_dynamic_pricing(&config, &subject, signals) - 108.0).abs() < 1e-9);
    }

    #[test]
    fn max_price_change_clamps_the_change_not_the_value() {
        let item = PricingItem::new("sku1", "tickets", 100.0, 1);
        let customer = Customer::default();
        let context = midday().with_event("final");
        let subject = ConditionSubject::new(&item, &customer, &context);

        let mut config = DynamicPricingConfig::new(
            "event",
            vec![PricingFactor::new(FactorType::Event, 1.0, 40.0)],
        );
        config.max_price_change = Some(15.0);
        let price = apply_dynamic_pricing(&config, &subject, MarketSignals::default());
        assert!((price - 115.0).abs() < 1e-9);

        let item = PricingItem::new("sku2", "tickets", 100.0, 1).with_inventory_level(1000);
        let context = midday();
        let subject = ConditionSubject::new(&item, &customer, &context);
        let mut config = DynamicPricingConfig::new(
            "glut",
            vec![PricingFactor::new(FactorType::Inventory, 1.0, 40.0)],
        );
        config.max_price_change = Some(15.0);
        let price = apply_dynamic_pricing(&config, &subject, MarketSignals::default());
        assert!((price - 85.0).abs() < 1e-9);
    }

    #[test]
    fn dynamic_rules_and_floor_apply_after_blend() {
        let item = PricingItem::new("sku1", "bread", 10.0, 12);
        let customer = Customer::default();
        let context = midday();
        let subject = ConditionSubject::new(&item, &customer, &context);

        let mut config = DynamicPricingConfig::new("bulk", Vec::new());
        config.rules.push(DynamicRule {
            id: "bulk-markdown".to_string(),
            conditions: vec![PricingCondition::new(
                ConditionType::Quantity,
                ConditionOperator::GreaterThan,
                10.0,
            )],
            adjustments: vec![PriceAdjustment::markdown(50.0)],
        });
        config.price_floor = Some(7.5);

        assert_eq!(apply_dynamic_pricing(&config, &subject, MarketSignals::default()), 7.5);
    }

    #[test]
    fn first_active_config_wins() {
        let mut inactive = DynamicPricingConfig::new("a", Vec::new());
        inactive.active = false;
        let configs = vec![
            inactive,
            DynamicPricingConfig::new("b", Vec::new()),
            DynamicPricingConfig::new("c", Vec::new()),
        ];

        assert_eq!(select_config(&configs).map(|config| config.id.as_str()), Some("b"));
    }
}
