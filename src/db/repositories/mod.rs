pub mod memory_repository;
pub mod state_repository;

pub use memory_repository::*;
pub use state_repository::*;
