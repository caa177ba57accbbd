pub mod common;
pub mod configs;
pub mod dispatch;
pub mod gateway;
pub mod locator;
pub mod node;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
