pub mod cycle;
pub mod dag;
pub mod visualize;
