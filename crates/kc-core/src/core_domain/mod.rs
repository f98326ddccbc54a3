mod access;
mod align;
mod analysis;
mod classify;
mod error;
mod guide;
mod interview;
mod partition;
mod ports;
mod reconcile;
mod record;
mod status;
mod types;
mod version;

pub use access::*;
pub use align::*;
pub use analysis::*;
pub use classify::*;
pub use error::*;
pub use guide::*;
pub use interview::*;
pub use partition::*;
pub use ports::*;
pub use reconcile::*;
pub use record::*;
pub use status::*;
pub use types::*;
pub use version::*;
