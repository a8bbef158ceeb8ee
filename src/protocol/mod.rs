pub mod channel;
pub mod delivery;
pub mod local;
pub mod message;
