pub mod dynamodb;
pub mod error;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod todo_repository;
pub mod user_repository;

pub use dynamodb::*;
pub use error::*;
pub use memory::*;
pub use models::*;
pub use repositories::*;
pub use todo_repository::*;
pub use user_repository::*;
