//! Condition evaluation: a flat list of predicates combined strictly left to right.
//! There is no operator precedence and no grouping.

use crate::domain::{Customer, PricingContext, PricingItem};
use crate::pricing::types::{
    ConditionLogic, ConditionOperator, ConditionType, ConditionValue, PricingCondition,
};

const NUMERIC_TOLERANCE: f64 = 1e-9;

/// The item/customer/context triple a condition is evaluated against.
#[derive(Clone, Copy, Debug)]
pub struct ConditionSubject<'a> {
    pub item: &'a PricingItem,
    pub customer: &'a Customer,
    pub context: &'a PricingContext,
}

impl<'a> ConditionSubject<'a> {
    pub fn new(item: &'a PricingItem, customer: &'a Customer, context: &'a PricingContext) -> Self {
        Self { item, customer, context }
    }
}

pub fn evaluate_condition(condition: &PricingCondition, subject: &ConditionSubject<'_>) -> bool {
    match &condition.condition_type {
        ConditionType::Quantity => compare_number(f64::from(subject.item.quantity), condition),
        ConditionType::Amount => compare_number(subject.item.line_amount(), condition),
        ConditionType::Inventory => subject
            .item
            .inventory_level
            .map(|level| compare_number(f64::from(level), condition))
            .unwrap_or(false),
        ConditionType::Time => compare_number(f64::from(subject.context.hour()), condition),
        ConditionType::CustomerType => compare_text(&subject.customer.customer_type, condition),
        ConditionType::CustomerTier => compare_text(&subject.customer.tier, condition),
        ConditionType::Category => compare_text(&subject.item.category, condition),
        ConditionType::Brand => compare_text(&subject.item.brand, condition),
        ConditionType::Other(_) => false,
    }
}

/// `result = c[0]`, then each next result is folded in with the *previous* condition's
/// logic. An empty list holds unconditionally.
pub fn evaluate_conditions(conditions: &[PricingCondition], subject: &ConditionSubject<'_>) -> bool {
    let mut conditions = conditions.iter();
    let Some(first) = conditions.next() else {
        return true;
    };

    let mut result = evaluate_condition(first, subject);
    let mut logic = first.logic;
    for condition in conditions {
        let current = evaluate_condition(condition, subject);
        result = match logic {
            ConditionLogic::Or => result || current,
            ConditionLogic::And => result && current,
        };
        logic = condition.logic;
    }

    result
}

fn compare_number(actual: f64, condition: &PricingCondition) -> bool {
    let ConditionValue::Number(expected) = condition.value else {
        return false;
    };

    match condition.operator {
        ConditionOperator::GreaterThan => actual > expected,
        ConditionOperator::LessThan => actual < expected,
        ConditionOperator::GreaterOrEqual => actual >= expected,
        ConditionOperator::LessOrEqual => actual <= expected,
        ConditionOperator::Equal => (actual - expected).abs() < NUMERIC_TOLERANCE,
        ConditionOperator::NotEqual => (actual - expected).abs() >= NUMERIC_TOLERANCE,
        ConditionOperator::In => false,
    }
}

fn compare_text(actual: &str, condition: &PricingCondition) -> bool {
    match (condition.operator, &condition.value) {
        (ConditionOperator::Equal, ConditionValue::Text(expected)) => actual == expected,
        (ConditionOperator::NotEqual, ConditionValue::Text(expected)) => actual != expected,
        (ConditionOperator::In, ConditionValue::List(candidates)) => {
            candidates.iter().any(|candidate| candidate == actual)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{evaluate_condition, evaluate_conditions, ConditionSubject};
    use crate::domain::{Customer, PricingContext, PricingItem};
    use crate::pricing::types::{ConditionOperator, ConditionType, PricingCondition};

    fn context() -> PricingContext {
        PricingContext::new(Utc.with_ymd_and_hms(2026, 5, 4, 19, 0, 0).unwrap())
    }

    fn quantity_at_least(value: f64) -> PricingCondition {
        PricingCondition::new(ConditionType::Quantity, ConditionOperator::GreaterOrEqual, value)
    }

    fn category_is(value: &str) -> PricingCondition {
        PricingCondition::new(ConditionType::Category, ConditionOperator::Equal, value)
    }

    #[test]
    fn and_chain_requires_every_condition() {
        let item = PricingItem::new("sku1", "electronics", 50.0, 3);
        let customer = Customer::default();
        let context = context();
        let subject = ConditionSubject::new(&item, &customer, &context);

        let conditions = vec![quantity_at_least(5.0), category_is("electronics")];
        assert!(!evaluate_conditions(&conditions, &subject));

        let conditions = vec![quantity_at_least(5.0).or(), category_is("electronics")];
        assert!(evaluate_conditions(&conditions, &subject));
    }

    #[test]
    fn combination_is_left_to_right_without_precedence() {
        let item = PricingItem::new("sku1", "electronics", 50.0, 3);
        let customer = Customer::default();
        let context = context();
        let subject = ConditionSubject::new(&item, &customer, &context);

        // (true OR false) AND false == false, even though `true OR (false AND false)` is true.
        let conditions =
            vec![category_is("electronics").or(), quantity_at_least(5.0), category_is("garden")];
        assert!(!evaluate_conditions(&conditions, &subject));
    }

    #[test]
    fn empty_condition_list_holds() {
        let item = PricingItem::new("sku1", "electronics", 50.0, 1);
        let customer = Customer::default();
        let context = context();

        assert!(evaluate_conditions(&[], &ConditionSubject::new(&item, &customer, &context)));
    }

    #[test]
    fn type_mismatch_evaluates_false() {
        let item = PricingItem::new("sku1", "electronics", 50.0, 10);
        let customer = Customer::default();
        let context = context();
        let subject = ConditionSubject::new(&item, &customer, &context);

        let quantity_as_text =
            PricingCondition::new(ConditionType::Quantity, ConditionOperator::Equal, "10");
        assert!(!evaluate_condition(&quantity_as_text, &subject));

        let category_greater =
            PricingCondition::new(ConditionType::Category, ConditionOperator::GreaterThan, 1.0);
        assert!(!evaluate_condition(&category_greater, &subject));

        let unknown = PricingCondition::new(
            ConditionType::Other("loyalty".to_string()),
            ConditionOperator::Equal,
            1.0,
        );
        assert!(!evaluate_condition(&unknown, &subject));
    }

    #[test]
    fn text_conditions_support_membership() {
        let item = PricingItem::new("sku1", "toys", 20.0, 1).with_brand("acme");
        let customer = Customer::new("c1").with_type("wholesale").with_tier("gold");
        let context = context();
        let subject = ConditionSubject::new(&item, &customer, &context);

        let tier_in = PricingCondition::new(
            ConditionType::CustomerTier,
            ConditionOperator::In,
            vec!["gold".to_string(), "platinum".to_string()],
        );
        assert!(evaluate_condition(&tier_in, &subject));

        let not_retail =
            PricingCondition::new(ConditionType::CustomerType, ConditionOperator::NotEqual, "retail");
        assert!(evaluate_condition(&not_retail, &subject));

        let brand = PricingCondition::new(ConditionType::Brand, ConditionOperator::Equal, "acme");
        assert!(evaluate_condition(&brand, &subject));
    }

    #[test]
    fn numeric_conditions_cover_amount_inventory_and_time() {
        let item = PricingItem::new("sku1", "toys", 20.0, 5).with_inventory_level(4);
        let customer = Customer::default();
        let context = context();
        let subject = ConditionSubject::new(&item, &customer, &context);

        let amount = PricingCondition::new(ConditionType::Amount, ConditionOperator::Equal, 100.0);
        assert!(evaluate_condition(&amount, &subject));

        let low_stock =
            PricingCondition::new(ConditionType::Inventory, ConditionOperator::LessThan, 10.0);
        assert!(evaluate_condition(&low_stock, &subject));

        let evening = PricingCondition::new(ConditionType::Time, ConditionOperator::GreaterOrEqual, 18.0);
        assert!(evaluate_condition(&evening, &subject));

        let untracked = PricingItem::new("sku2", "toys", 20.0, 5);
        let subject = ConditionSubject::new(&untracked, &customer, &context);
        assert!(!evaluate_condition(&low_stock, &subject));
    }
}
