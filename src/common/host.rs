use std::net::IpAddr;

use serde::Serialize;
use sysinfo::{Networks, System};

/// Host details reported by `/health` and `/info`.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub hostname: String,
    pub platform: &'static str,
    /// Non-loopback IPv4 addresses of this machine.
    pub addresses: Vec<String>,
    pub localhost: &'static str,
}

impl ServerInfo {
    pub fn collect() -> Self {
        let networks = Networks::new_with_refreshed_list();
        let mut addresses: Vec<String> = networks
            .iter()
            .flat_map(|(_, data)| data.ip_networks().iter().map(|net| net.addr))
            .filter(|addr| matches!(addr, IpAddr::V4(v4) if !v4.is_loopback()))
            .map(|addr| addr.to_string())
            .collect();
        addresses.sort();
        addresses.dedup();

        Self {
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            platform: std::env::consts::OS,
            addresses,
            localhost: "127.0.0.1",
        }
    }

    /// Every URL a client could use to reach the API, local ones first.
    pub fn api_urls(&self, port: u16) -> Vec<String> {
        let mut urls = vec![
            format!("http://localhost:{port}"),
            format!("http://127.0.0.1:{port}"),
        ];
        urls.extend(self.external_urls(port));
        urls
    }

    pub fn external_urls(&self, port: u16) -> Vec<String> {
        self.addresses
            .iter()
            .map(|addr| format!("http://{addr}:{port}"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_urls_local_first() {
        let info = ServerInfo {
            hostname: "box".into(),
            platform: "linux",
            addresses: vec!["192.168.1.20".into()],
            localhost: "127.0.0.1",
        };

        let urls = info.api_urls(3000);
        assert_eq!(urls[0], "http://localhost:3000");
        assert_eq!(urls[1], "http://127.0.0.1:3000");
        assert_eq!(urls[2], "http://192.168.1.20:3000");
        assert_eq!(info.external_urls(3000), vec!["http://192.168.1.20:3000"]);
    }
}
