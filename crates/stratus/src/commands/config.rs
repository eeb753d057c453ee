//! Config command - validates settings without serving.

use anyhow::Result;
use clap::Args;

use super::ConsoleArgs;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub console: ConsoleArgs,

    /// Output as JSON (for scripting)
    #[arg(long)]
    pub json: bool,
}

/// Run the config command. Secrets are never printed.
pub fn run(args: ConfigArgs) -> Result<()> {
    let json = args.json;
    let config = args.console.into_config()?;

    let summary = serde_json::json!({
        "bind_address": config.bind_address.to_string(),
        "hostname": config.hostname,
        "login_url": config.login_url,
        "uaa_url": config.uaa_url,
        "api_url": config.api_url,
        "log_url": config.log_url,
        "client_id": config.client_id,
        "session_backend": config.session_backend.as_str(),
        "session_dir": config.session_dir.as_ref().map(|d| d.display().to_string()),
        "secure_cookies": config.secure_cookies,
        "local_cf": config.local_cf,
        "tic_secret_set": config.tic_secret.is_some(),
        "build_info": config.build_info,
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Configuration OK");
    if let Some(fields) = summary.as_object() {
        for (key, value) in fields {
            match value {
                serde_json::Value::String(s) => println!("  {:<16} {}", key, s),
                serde_json::Value::Null => println!("  {:<16} -", key),
                other => println!("  {:<16} {}", key, other),
            }
        }
    }
    Ok(())
}
