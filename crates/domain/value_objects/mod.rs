pub mod charges;
pub mod enums;
pub mod money;
pub mod payment_details;
pub mod timestamps;
