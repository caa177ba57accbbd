pub mod banner;
pub mod errors;
pub mod host;
pub mod http;
pub mod logger;
pub mod types;

pub use errors::*;
pub use host::*;
pub use http::*;
pub use types::*;
