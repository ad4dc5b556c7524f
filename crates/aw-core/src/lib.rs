pub mod alerts;
pub mod analysis;
pub mod error;
pub mod events;
pub mod store;
pub mod themes;
pub mod throttle;
pub mod watch;

pub use crate::error::WatchError;
pub use crate::store::Store;
pub use crate::watch::AgentWatch;
