//! Startup banner and URL display

use super::config::{AppConfig, is_all_interfaces};
use super::constants::APP_NAME;

// Label width: "Call ingestion:" is 15 chars, pad to 17 for alignment
const W: usize = 17;

/// Print the startup banner with endpoint URLs
pub fn print_banner(config: &AppConfig, data_dir: &str) {
    let host = config.server.host.as_str();
    let port = config.server.port;

    // Use localhost for display when binding to all interfaces
    let display_host = if is_all_interfaces(host) {
        "localhost"
    } else {
        host
    };
    let base_url = format!("http://{}:{}", display_host, port);

    println!();
    println!(
        "  \x1b[1m\x1b[36m{}\x1b[0m \x1b[90mv{}\x1b[0m",
        APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!(
        "  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m \x1b[36mPOST {}/api/v1/calls\x1b[0m",
        "Call ingestion:", base_url
    );
    println!(
        "  \x1b[33m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m \x1b[36m{}/api/v1/calls/{{call_id}}/trace\x1b[0m",
        "Trace view:", base_url
    );

    if host == "127.0.0.1" || host == "localhost" {
        println!(
            "  \x1b[90m➜  {:<W$} use --host 0.0.0.0 to expose\x1b[0m",
            "Network:"
        );
    }

    println!(
        "  \x1b[90m➜  {:<W$} {} (x{})\x1b[0m",
        "Costs in:", config.pricing.currency, config.pricing.exchange_rate
    );
    println!("  \x1b[90m➜  {:<W$} {}\x1b[0m", "Data:", data_dir);

    println!();
}
