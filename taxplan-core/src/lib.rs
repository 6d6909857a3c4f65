pub mod calculations;
pub mod db;
pub mod models;
pub mod planner;
pub mod wallet;

pub use db::repository::{PlannerRepository, RepositoryError};
pub use models::*;
