pub mod account;
pub mod client;
pub mod profile;
pub mod provider;
pub mod service;

pub use account::*;
pub use client::*;
pub use profile::*;
pub use provider::*;
pub use service::*;
