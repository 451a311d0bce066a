pub mod pipeline;
pub mod pool;
pub mod providers;
pub mod rules;
pub mod value;
