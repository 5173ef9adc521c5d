pub mod base;
pub mod reward;
pub mod task;
pub mod wrappers;
