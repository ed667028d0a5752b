pub mod cache;
pub mod coingecko;
pub mod mock;
pub mod source;
pub mod yahoo;
