pub mod config;
pub mod postgres;
pub mod store;

pub use config::*;
pub use postgres::*;
pub use store::*;
