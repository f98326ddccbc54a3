pub mod export;
pub mod filter;

pub use export::*;
pub use filter::*;
