//! Survey dialer server
//!
//! Runs the campaign dispatch loop against a real control plane. Optionally
//! seeds and activates a campaign from a lead list file with one
//! `phone_number,display_name` pair per line.
//!
//! ```bash
//! cargo run --example survey_dialer_server -- \
//!     --control-url wss://telephony.example.com \
//!     --api-key KEY --api-secret SECRET --sip-trunk-id ST_trunk \
//!     --database ./campaigns.db \
//!     --campaign-name pilot --leads-file ./leads.txt
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use autodial_dial_engine::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "survey_dialer_server")]
#[command(about = "Outbound survey campaign dialer")]
struct Args {
    /// Control plane base URL (http, https, ws or wss)
    #[arg(long, default_value = "http://127.0.0.1:7880")]
    control_url: String,

    /// Control plane API key
    #[arg(long)]
    api_key: String,

    /// Control plane API secret
    #[arg(long)]
    api_secret: String,

    /// Outbound SIP trunk id
    #[arg(long)]
    sip_trunk_id: String,

    /// Name of the conversational agent to dispatch into calls
    #[arg(long, default_value = "survey-agent")]
    agent_name: String,

    /// Sqlite database path; omit for an in-memory database
    #[arg(long)]
    database: Option<String>,

    /// Optional campaign to create and activate on startup
    #[arg(long)]
    campaign_name: Option<String>,

    /// Lead list file for the seeded campaign: `phone,name` per line
    #[arg(long)]
    leads_file: Option<String>,

    /// Retry budget for the seeded campaign
    #[arg(long, default_value_t = 3)]
    max_retries: i64,

    /// Seconds between retries for the seeded campaign
    #[arg(long, default_value_t = 180)]
    retry_interval_secs: i64,
}

fn read_leads(path: &str) -> Result<Vec<NewLead>> {
    let mut leads = Vec::new();
    for line in std::fs::read_to_string(path)?.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (phone, name) = match line.split_once(',') {
            Some((phone, name)) => (phone.trim(), name.trim()),
            None => (line, ""),
        };
        leads.push(NewLead {
            phone_number: phone.to_string(),
            display_name: name.to_string(),
        });
    }
    Ok(leads)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut config = DialerConfig::default();
    config.general.agent_name = args.agent_name.clone();
    config.database.database_path = args.database.clone();
    config.telephony = ControlPlaneConfig {
        url: args.control_url.clone(),
        api_key: args.api_key.clone(),
        api_secret: args.api_secret.clone(),
        sip_trunk_id: args.sip_trunk_id.clone(),
    };

    let mut server = DialerServerBuilder::new().with_config(config).build().await?;
    server.start().await?;

    if let Some(name) = &args.campaign_name {
        let leads = match &args.leads_file {
            Some(path) => read_leads(path)?,
            None => Vec::new(),
        };
        let admin = server.admin_api();
        let campaign = admin
            .create_campaign(
                NewCampaign {
                    name: name.clone(),
                    max_retries: args.max_retries,
                    retry_interval_secs: args.retry_interval_secs,
                },
                leads,
            )
            .await?;
        admin.activate_campaign(campaign.id).await?;
        info!("🚀 Campaign '{}' activated", name);
    }

    info!("Press Ctrl+C to stop");
    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {}
    }

    server.stop().await?;
    Ok(())
}
