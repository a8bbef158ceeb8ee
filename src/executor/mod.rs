pub mod actions;
pub mod host;
