pub mod countdown;
pub mod dedup;
pub mod engine;
pub mod state;
