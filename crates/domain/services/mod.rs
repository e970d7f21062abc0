pub mod id_generator;
pub mod payment_details;
