//! Input records supplied by the checkout flow for one pricing request.

pub mod context;
pub mod customer;
pub mod item;

pub use context::PricingContext;
pub use customer::Customer;
pub use item::PricingItem;
