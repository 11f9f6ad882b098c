pub mod db;
pub mod errors;
pub mod task;
pub mod user;
