pub mod catalog;
pub mod ledger;
pub mod messaging;

pub use catalog::*;
pub use ledger::*;
pub use messaging::*;
