pub mod errors;
pub mod features;
pub mod market;
pub mod ports;
