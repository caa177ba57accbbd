use serde::{Deserialize, Serialize};

use crate::{common::types::AnyResult, configs::*};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    /// Reads `config.toml`, then `config.default.toml`, then falls back to
    /// built-in defaults. `PORT` overrides `server.port`.
    pub fn load() -> AnyResult<Self> {
        let candidates = ["config.toml", "config.default.toml"];
        let mut config = match candidates
            .iter()
            .find(|path| std::path::Path::new(path).exists())
        {
            Some(path) => {
                println!("Loading configuration from: {}", path);
                let config_str = std::fs::read_to_string(path)?;
                Self::parse(&config_str)?
            }
            None => {
                println!("No config.toml found, using defaults");
                Self::default()
            }
        };

        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|e| format!("invalid PORT value {:?}: {}", port, e))?;
        }

        Ok(config)
    }

    pub fn parse(config_str: &str) -> AnyResult<Self> {
        Ok(toml::from_str(config_str)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.node.port, 2333);
        assert_eq!(config.node.search_prefix, "ytmsearch");
        assert_eq!(config.player.stop_grace_ms, 5000);
        assert!(config.server.bot_id.is_none());
        assert!(config.gateway.password.is_none());
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_partial_config() {
        let config = Config::parse(
            r#"
                [server]
                port = 8080
                bot_id = "1234"

                [bot]
                user_id = 987654321

                [node]
                name = "GlaceYT"
                host = "lava.example.net"
                port = 8262
                password = "glaceyt"
                secure = true

                [player]
                stop_grace_ms = 2500

                [gateway]
                password = "bridge-secret"

                [logging]
                level = "debug"

                [logging.file]
                path = "logs/tunedeck.log"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.bot_id.as_deref(), Some("1234"));
        assert_eq!(config.bot.user_id, 987654321);
        assert_eq!(config.node.rest_base(), "https://lava.example.net:8262");
        assert_eq!(
            config.node.websocket_url(),
            "wss://lava.example.net:8262/v4/websocket"
        );
        assert_eq!(config.player.stop_grace().as_millis(), 2500);
        assert_eq!(config.gateway.password.as_deref(), Some("bridge-secret"));

        let logging = config.logging.unwrap();
        assert_eq!(logging.level.as_deref(), Some("debug"));
        assert_eq!(logging.file.unwrap().max_lines, 10_000);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        assert!(Config::parse("[server]\nport = \"not a port\"").is_err());
    }
}
