//! Application services sitting between the HTTP layer and the tenant store.

pub mod error;
pub mod repos;
pub mod shell;
