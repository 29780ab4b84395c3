//! Rule selection and priority-ordered application.

use std::cmp::Reverse;

use tracing::debug;

use crate::pricing::adjustment::apply_adjustments;
use crate::pricing::condition::{evaluate_conditions, ConditionSubject};
use crate::pricing::result::AppliedPricingRule;
use crate::pricing::types::PricingRule;

pub fn rule_applies(rule: &PricingRule, subject: &ConditionSubject<'_>) -> bool {
    let item = subject.item;
    let customer = subject.customer;
    let context = subject.context;

    if !rule.is_valid_at(context.timestamp) {
        return false;
    }
    if !rule.applicable_items.is_empty()
        && !rule.applicable_items.iter().any(|reference| item.is_referenced_by(reference))
    {
        return false;
    }
    if rule.excluded_items.iter().any(|reference| item.is_referenced_by(reference)) {
        return false;
    }
    if !rule.customer_segments.is_empty()
        && !rule.customer_segments.iter().any(|segment| {
            (!customer.segment.is_empty() && *segment == customer.segment)
                || (!customer.customer_type.is_empty() && *segment == customer.customer_type)
        })
    {
        return false;
    }
    if !rule.channels.is_empty() && !rule.channels.contains(&context.channel) {
        return false;
    }
    if !rule.regions.is_empty() && !rule.regions.contains(&context.region) {
        return false;
    }

    evaluate_conditions(&rule.conditions, subject)
}

/// Applicable rules ordered by priority, highest first. Equal priorities keep input order.
pub fn select_rules<'a, I>(rules: I, subject: &ConditionSubject<'_>) -> Vec<&'a PricingRule>
where
    I: IntoIterator<Item = &'a PricingRule>,
{
    let mut selected: Vec<&PricingRule> =
        rules.into_iter().filter(|rule| rule_applies(rule, subject)).collect();
    selected.sort_by_key(|rule| Reverse(rule.priority));
    selected
}

/// Runs each rule's adjustment chain on the running price and records one entry per rule.
pub fn apply_rules(price: f64, rules: &[&PricingRule]) -> (f64, Vec<AppliedPricingRule>) {
    let mut running = price;
    let mut applied = Vec::with_capacity(rules.len());

    for rule in rules {
        let price_before = running;
        running = apply_adjustments(running, &rule.adjustments);
        debug!(
            event_name = "pricing.rule.applied",
            rule_id = %rule.id,
            priority = rule.priority,
            price_before,
            price_after = running,
            "pricing rule applied"
        );
        applied.push(AppliedPricingRule {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            priority: rule.priority,
            price_before,
            price_after: running,
            adjustment: running - price_before,
        });
    }

    (running, applied)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{apply_rules, rule_applies, select_rules};
    use crate::domain::{Customer, PricingContext, PricingItem};
    use crate::pricing::condition::ConditionSubject;
    use crate::pricing::types::{PriceAdjustment, PricingRule};

    fn context() -> PricingContext {
        PricingContext::new(Utc.with_ymd_and_hms(2026, 4, 10, 10, 0, 0).unwrap())
            .with_channel("web")
            .with_region("eu")
    }

    #[test]
    fn higher_priority_rule_applies_first() {
        let item = PricingItem::new("sku1", "electronics", 100.0, 1);
        let customer = Customer::default();
        let context = context();
        let subject = ConditionSubject::new(&item, &customer, &context);

        let rules = vec![
            PricingRule::new("low", 5).with_adjustment(PriceAdjustment::fixed(10.0)),
            PricingRule::new("high", 10).with_adjustment(PriceAdjustment::percentage(50.0)),
        ];

        let selected = select_rules(&rules, &subject);
        let (price, applied) = apply_rules(item.base_price, &selected);

        assert_eq!(applied[0].rule_id, "high");
        assert_eq!(applied[0].price_before, 100.0);
        assert_eq!(applied[1].rule_id, "low");
        assert_eq!(applied[1].price_before, 50.0);
        assert_eq!(price, 40.0);
    }

    #[test]
    fn equal_priorities_keep_input_order() {
        let item = PricingItem::new("sku1", "electronics", 100.0, 1);
        let customer = Customer::default();
        let context = context();
        let subject = ConditionSubject::new(&item, &customer, &context);

        let rules = vec![PricingRule::new("first", 1), PricingRule::new("second", 1)];
        let ids: Vec<_> =
            select_rules(&rules, &subject).iter().map(|rule| rule.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn applicability_filters_gate_rules() {
        let item = PricingItem::new("sku1", "electronics", 100.0, 1);
        let customer = Customer::new("c1").with_segment("vip");
        let context = context();
        let subject = ConditionSubject::new(&item, &customer, &context);

        let mut by_category = PricingRule::new("cat", 1);
        by_category.applicable_items = vec!["electronics".to_string()];
        assert!(rule_applies(&by_category, &subject));

        let mut excluded = PricingRule::new("excl", 1);
        excluded.excluded_items = vec!["sku1".to_string()];
        assert!(!rule_applies(&excluded, &subject));
        excluded.excluded_items = vec!["electronics".to_string()];
        assert!(!rule_applies(&excluded, &subject));

        let mut segment = PricingRule::new("seg", 1);
        segment.customer_segments = vec!["vip".to_string()];
        assert!(rule_applies(&segment, &subject));
        segment.customer_segments = vec!["wholesale".to_string()];
        assert!(!rule_applies(&segment, &subject));

        let mut channel = PricingRule::new("chan", 1);
        channel.channels = vec!["store".to_string()];
        assert!(!rule_applies(&channel, &subject));

        let mut region = PricingRule::new("region", 1);
        region.regions = vec!["eu".to_string(), "us".to_string()];
        assert!(rule_applies(&region, &subject));
    }

    #[test]
    fn inactive_and_out_of_window_rules_are_skipped() {
        let item = PricingItem::new("sku1", "electronics", 100.0, 1);
        let customer = Customer::default();
        let context = context();
        let subject = ConditionSubject::new(&item, &customer, &context);

        let mut inactive = PricingRule::new("off", 1);
        inactive.active = false;
        assert!(!rule_applies(&inactive, &subject));

        let ended = PricingRule::new("ended", 1)
            .with_validity(None, Some(context.timestamp - Duration::hours(1)));
        assert!(!rule_applies(&ended, &subject));

        let ends_now = PricingRule::new("ends-now", 1).with_validity(None, Some(context.timestamp));
        assert!(!rule_applies(&ends_now, &subject));

        let started = PricingRule::new("started", 1).with_validity(Some(context.timestamp), None);
        assert!(rule_applies(&started, &subject));
    }
}
