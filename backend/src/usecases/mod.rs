pub mod charges;
pub mod create_charge;
pub mod idempotency;

#[cfg(test)]
pub(crate) mod fixtures;
