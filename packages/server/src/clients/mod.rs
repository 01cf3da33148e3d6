pub mod geocoding;
pub mod recognition;
