pub mod ml;
pub mod pipeline;
