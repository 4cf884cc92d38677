pub mod builder;
pub mod time_range;
