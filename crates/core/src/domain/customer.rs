use serde::{Deserialize, Serialize};

/// Read-only customer profile used for rule and condition matching.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    pub id: String,
    pub customer_type: String,
    pub tier: String,
    pub segment: String,
    pub region: String,
    pub channel: String,
    pub total_spent: f64,
    pub order_count: u32,
}

impl Customer {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    pub fn with_type(mut self, customer_type: impl Into<String>) -> Self {
        self.customer_type = customer_type.into();
        self
    }

    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = tier.into();
        self
    }

    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = segment.into();
        self
    }
}
