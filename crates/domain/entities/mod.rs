pub mod charges;
pub mod customers;
pub mod idempotency_keys;
pub mod payment_details;
