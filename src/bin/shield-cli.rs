use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;
use std::net::IpAddr;

#[derive(Parser)]
#[command(name = "shield-cli")]
#[command(about = "Management CLI for request-shield", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, env = "SHIELD_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show shield status and attack metrics
    Status,
    /// Always allow an address
    Allow { ip: IpAddr },
    /// Remove an address from the whitelist
    Unallow { ip: IpAddr },
    /// Always deny an address
    Deny { ip: IpAddr },
    /// Remove an address from the blacklist
    Undeny { ip: IpAddr },
    /// Show the reputation record of an address
    Reputation { ip: IpAddr },
    /// Ask for a decision on a request
    Check {
        ip: String,
        #[arg(long, default_value = "/")]
        path: String,
        #[arg(long, default_value = "shield-cli")]
        user_agent: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let (method, path, body) = match cli.command {
        Commands::Status => (Method::GET, "/admin/status".to_string(), None),
        Commands::Allow { ip } => (Method::POST, format!("/admin/whitelist/{}", ip), None),
        Commands::Unallow { ip } => (Method::DELETE, format!("/admin/whitelist/{}", ip), None),
        Commands::Deny { ip } => (Method::POST, format!("/admin/blacklist/{}", ip), None),
        Commands::Undeny { ip } => (Method::DELETE, format!("/admin/blacklist/{}", ip), None),
        Commands::Reputation { ip } => (Method::GET, format!("/admin/reputation/{}", ip), None),
        Commands::Check { ip, path, user_agent } => (
            Method::POST,
            "/v1/validate".to_string(),
            Some(serde_json::json!({
                "ip": ip,
                "path": path,
                "method": "GET",
                "userAgent": user_agent,
                "headers": { "accept": "*/*", "user-agent": user_agent },
            })),
        ),
    };

    let mut request = client
        .request(method, format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers);
    if let Some(body) = body {
        request = request.json(&body);
    }

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: shield returned status {}", status);
        if let Ok(text) = res.text().await {
            if !text.is_empty() {
                eprintln!("Response: {}", text);
            }
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
