pub mod charges;
pub mod customers;
