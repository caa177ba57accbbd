use std::{sync::Arc, time::Instant};

use crate::{
    common::host::ServerInfo,
    configs::Config,
    dispatch::Dispatcher,
    gateway::{GatewayBridge, GatewayCommand},
};

/// Top-level application state shared by every request.
pub struct AppState {
    pub config: Config,
    pub dispatcher: Dispatcher,
    pub bridge: Arc<GatewayBridge>,
    /// Voice commands waiting for the gateway adapter.
    pub gateway_commands: flume::Receiver<GatewayCommand>,
    pub server_info: ServerInfo,
    pub started: Instant,
}

impl AppState {
    pub fn uptime_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}
