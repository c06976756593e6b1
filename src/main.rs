/* src/main.rs */

mod config;
mod domain;
mod lookup;
mod mcp_server;
mod pihole;
mod prompts;
mod tools;

use crate::config::AppConfig;
use crate::lookup::{RegistryWhoisClient, UdpDnsClient};
use crate::mcp_server::PiHoleMcp;
use crate::pihole::PiHoleClient;
use crate::tools::Registry;
use dotenvy::dotenv;
use fancy_log::{LogLevel, log, set_log_level};
use lazy_motd::lazy_motd;
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // --- Initialization ---
    dotenv().ok();
    let level = env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase();
    let log_level = match level.as_str() {
        "debug" => LogLevel::Debug,
        "warn" => LogLevel::Warn,
        "error" => LogLevel::Error,
        _ => LogLevel::Info,
    };
    set_log_level(log_level);
    lazy_motd!();

    // --- Load Config ---
    let config = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            log(LogLevel::Error, &format!("Failed to load config: {}", e));
            return Err(e.into());
        }
    };

    // --- Connect to Pi-hole ---
    log(
        LogLevel::Info,
        &format!("Authenticating with Pi-hole at {}", config.pihole_url),
    );
    let pihole = match PiHoleClient::open(
        &config.pihole_url,
        &config.pihole_password,
        config.request_timeout,
        config.tls_insecure,
    )
    .await
    {
        Ok(client) => Arc::new(client),
        Err(e) => {
            log(LogLevel::Error, &format!("Failed to create Pi-hole client: {}", e));
            if e.status() == Some(401) {
                log(LogLevel::Error, "Pi-hole rejected the password; check PIHOLE_PASSWORD.");
            }
            return Err(e.into());
        }
    };
    log(
        LogLevel::Info,
        &format!("Pi-hole session established for {}", pihole.base_url()),
    );

    // --- Initialize Services ---
    let dns = Arc::new(UdpDnsClient::new(
        config.dns_server.clone(),
        config.request_timeout,
    ));
    let whois = match RegistryWhoisClient::connect(config.request_timeout).await {
        Ok(client) => Arc::new(client),
        Err(e) => {
            log(LogLevel::Error, &format!("Failed to create WHOIS client: {}", e));
            return Err(e.into());
        }
    };
    let server = PiHoleMcp::new(Registry::new(pihole, dns, whois));

    // --- Start MCP Server ---
    let bind_addr = config.bind_addr();
    log(
        LogLevel::Info,
        &format!("Pi-hole MCP server starting on {}", bind_addr),
    );

    mcp_server::run_server(&bind_addr, server).await?;

    Ok(())
}
