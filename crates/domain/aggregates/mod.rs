pub mod charge;
