//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{QueryKitError, QueryKitResult};
use crate::gate::GatePolicy;
use crate::ui::{self, UiContext};
use clap::ValueEnum;

/// Keys accepted by `config set`
const VALID_KEYS: &[&str] = &[
    "general.verbose",
    "general.log_format",
    "query.stale_time_ms",
    "query.enabled",
    "gate.policy",
];

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    manager: &ConfigManager,
    config: &Config,
) -> QueryKitResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> QueryKitResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> QueryKitResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());

    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> QueryKitResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    if let Err(e) = apply_value(&mut config, key, value) {
        if matches!(e, QueryKitError::User(ref msg) if msg.starts_with("Unknown config key")) {
            ui::step_error_detail(&ctx, "Unknown config key", key);
            ui::step_info(&ctx, &format!("Valid keys: {}", VALID_KEYS.join(", ")));
        }
        return Err(e);
    }

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

/// Apply a dot-separated key to the config
fn apply_value(config: &mut Config, key: &str, value: &str) -> QueryKitResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "verbose"] => config.general.verbose = parse_bool(value)?,
        ["general", "log_format"] => match value {
            "text" | "json" => config.general.log_format = value.to_string(),
            _ => {
                return Err(QueryKitError::User(format!(
                    "Invalid log format: {}. Use text or json",
                    value
                )))
            }
        },
        ["query", "stale_time_ms"] => config.query.stale_time_ms = parse_u64(value)?,
        ["query", "enabled"] => config.query.enabled = parse_bool(value)?,
        ["gate", "policy"] => {
            config.gate.policy = GatePolicy::from_str(value, true).map_err(|_| {
                QueryKitError::User(format!(
                    "Invalid gate policy: {}. Use next-transition or resolve-if-ready",
                    value
                ))
            })?
        }
        _ => return Err(QueryKitError::User(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

fn parse_bool(value: &str) -> QueryKitResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(QueryKitError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_u64(value: &str) -> QueryKitResult<u64> {
    value
        .parse()
        .map_err(|_| QueryKitError::User(format!("Invalid number: {}", value)))
}
