use serde::{Deserialize, Serialize};

/// Connection settings for the Lavalink-compatible audio node.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NodeConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default)]
    pub secure: bool,
    /// Prefix applied to free-text queries, e.g. `ytmsearch`.
    #[serde(default = "default_search_prefix")]
    pub search_prefix: String,
}

impl NodeConfig {
    pub fn rest_base(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    pub fn websocket_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}/v4/websocket", scheme, self.host, self.port)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            host: default_host(),
            port: default_port(),
            password: default_password(),
            secure: false,
            search_prefix: default_search_prefix(),
        }
    }
}

fn default_name() -> String {
    "main".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    2333
}

fn default_password() -> String {
    "youshallnotpass".to_string()
}

fn default_search_prefix() -> String {
    "ytmsearch".to_string()
}
