pub mod card_brands;
pub mod charge_statuses;
pub mod payment_methods;
