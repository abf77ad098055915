// loyalty-core/src/lib.rs

pub mod db;
pub mod repositories;
pub mod rules;
pub mod services;
pub mod tasks;

pub use db::Database;
pub use loyalty_common::error::Error;
