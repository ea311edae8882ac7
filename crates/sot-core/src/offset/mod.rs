mod anchor;
mod cache;
#[cfg(feature = "debug-tools")]
mod dump;
mod scanner;
mod signature;
mod table;

pub use anchor::*;
pub use cache::*;
#[cfg(feature = "debug-tools")]
pub use dump::*;
pub use scanner::*;
pub use signature::*;
pub use table::*;
