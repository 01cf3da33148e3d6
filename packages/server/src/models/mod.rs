pub mod archive;
pub mod callback;
pub mod location;
pub mod map;
pub mod shared;
pub mod upload;
