pub mod archive;
pub mod callback;
pub mod deletion;
pub mod query;
pub mod retry;
pub mod upload;
pub mod users;
