use crate::common::host::ServerInfo;

const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";

macro_rules! env_or {
    ($key:literal, $default:literal) => {
        option_env!($key).unwrap_or($default)
    };
}

/// Routes printed at startup, with a short description each.
pub const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("GET", "/health", "Health check"),
    ("GET", "/info", "Server information"),
    ("POST", "/play", "Play music"),
    ("POST", "/pause", "Pause playback"),
    ("POST", "/resume", "Resume playback"),
    ("POST", "/skip", "Skip current song"),
    ("POST", "/stop", "Stop playback"),
    ("POST", "/status", "Player status"),
];

pub struct BannerInfo {
    pub version: &'static str,
    pub branch: &'static str,
    pub commit_short: &'static str,
    pub profile: &'static str,
}

impl Default for BannerInfo {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            branch: env_or!("GIT_BRANCH", "unknown"),
            commit_short: env_or!("GIT_COMMIT_SHORT", "unknown"),
            profile: if cfg!(debug_assertions) {
                "debug"
            } else {
                "release"
            },
        }
    }
}

pub fn print_banner(info: &BannerInfo, server: &ServerInfo, port: u16) {
    println!();
    println!("{GREEN}  _                        _           _    {RESET}");
    println!("{GREEN} | |_ _   _ _ __   ___  __| | ___  ___| | __{RESET}");
    println!("{GREEN} | __| | | | '_ \\ / _ \\/ _` |/ _ \\/ __| |/ /{RESET}");
    println!("{GREEN} | |_| |_| | | | |  __/ (_| |  __/ (__|   < {RESET}");
    println!("{GREEN}  \\__|\\__,_|_| |_|\\___|\\__,_|\\___|\\___|_|\\_\\{RESET}");
    println!("{DIM}============================================{RESET}");
    println!();

    print_row("Version", info.version, CYAN);
    print_row("Branch", info.branch, RESET);
    print_row("Commit", info.commit_short, RESET);
    print_row("Profile", info.profile, YELLOW);
    print_row("Port", &port.to_string(), RESET);
    print_row("Hostname", &server.hostname, RESET);
    print_row("Platform", server.platform, RESET);

    println!();
    println!("  {BOLD}Available API URLs{RESET}");
    for url in server.api_urls(port) {
        println!("    {CYAN}{url}{RESET}");
    }

    println!();
    println!("  {BOLD}API Endpoints{RESET}");
    for (method, path, description) in ENDPOINTS {
        println!("    {method:<5} {path:<8} {DIM}- {description}{RESET}");
    }
    println!();
}

fn print_row(label: &str, value: &str, color: &str) {
    println!("  {BOLD}{label:<14}{RESET}{color}{value}{RESET}");
}
