pub mod capture;
pub mod crop;
pub mod traits;
pub mod types;
