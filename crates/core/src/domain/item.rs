use serde::{Deserialize, Serialize};

/// A catalog line to price. The engine never mutates it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub brand: String,
    pub quantity: u32,
    pub base_price: f64,
    #[serde(default)]
    pub cost_price: Option<f64>,
    #[serde(default)]
    pub inventory_level: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PricingItem {
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        base_price: f64,
        quantity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            category: category.into(),
            subcategory: String::new(),
            brand: String::new(),
            quantity,
            base_price,
            cost_price: None,
            inventory_level: None,
            tags: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    pub fn with_cost_price(mut self, cost_price: f64) -> Self {
        self.cost_price = Some(cost_price);
        self
    }

    pub fn with_inventory_level(mut self, inventory_level: u32) -> Self {
        self.inventory_level = Some(inventory_level);
        self
    }

    /// Base price times quantity, the value `amount` conditions compare against.
    pub fn line_amount(&self) -> f64 {
        self.base_price * f64::from(self.quantity)
    }

    /// True when `reference` names this item by id or by category.
    pub fn is_referenced_by(&self, reference: &str) -> bool {
        self.id == reference || (!self.category.is_empty() && self.category == reference)
    }
}
