use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// When set, POST requests must carry exactly this `botId`.
    #[serde(default)]
    pub bot_id: Option<String>,
}

/// Identity the audio node sees for this bot.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BotConfig {
    #[serde(default)]
    pub user_id: u64,
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bot_id: None,
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            user_id: 0,
            client_name: default_client_name(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_client_name() -> String {
    format!("tunedeck/{}", env!("CARGO_PKG_VERSION"))
}

/// Ingress for a gateway adapter forwarding raw dispatches over `/gateway`.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GatewayConfig {
    /// Value the adapter must send in `Authorization`. The route is not
    /// mounted when unset.
    #[serde(default)]
    pub password: Option<String>,
}
