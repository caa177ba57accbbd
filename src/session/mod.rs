pub mod registry;
pub mod state;

pub use registry::{SessionHandle, SessionRegistry};
pub use state::{PlaybackState, Session};
