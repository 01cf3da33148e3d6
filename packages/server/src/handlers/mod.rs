pub mod archive;
pub mod callback;
pub mod location;
pub mod map;
pub mod upload;
