pub mod dedup;
pub mod geo;
pub mod jwt;
