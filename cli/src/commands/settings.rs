use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use config::Config;
use std::path::PathBuf;

use crate::runtime;

#[derive(Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Print the resolved configuration as TOML (secrets redacted)")]
    Show(ConfigArgs),

    #[command(about = "Validate the resolved configuration")]
    Validate(ConfigArgs)
}

#[derive(Args)]
pub struct ConfigArgs {
    /// File to resolve instead of the global --config
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

pub fn run(cmd: ConfigCommand, resolved: &Config) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => {
            let config = reload(&args, resolved)?;
            let redacted = redact(config);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&redacted)?);
            } else {
                let rendered =
                    toml::to_string_pretty(&redacted).context("Failed to render configuration as TOML")?;
                print!("{rendered}");
            }
            Ok(())
        }
        ConfigCommand::Validate(args) => {
            let config = reload(&args, resolved)?;
            runtime::validated(&config)?;
            if args.json {
                println!("{}", serde_json::json!({ "valid": true }));
            } else {
                println!("{} configuration is valid", "✓".green().bold());
            }
            Ok(())
        }
    }
}

fn reload(args: &ConfigArgs, resolved: &Config) -> Result<Config> {
    match &args.file {
        Some(path) => runtime::load_config(Some(path), None),
        None => Ok(resolved.clone())
    }
}

const REDACTED: &str = "***";

fn redact(mut config: Config) -> Config {
    if config.store.api_key.is_some() {
        config.store.api_key = Some(REDACTED.to_string());
    }
    if config.embedding.api_key.is_some() {
        config.embedding.api_key = Some(REDACTED.to_string());
    }
    for provider in &mut config.llm.providers {
        if provider.api_key.is_some() {
            provider.api_key = Some(REDACTED.to_string());
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::LlmProviderConfig;

    #[test]
    fn test_redact_hides_every_secret() {
        let mut config = Config::default();
        config.store.api_key = Some("store-secret".to_string());
        let mut provider = LlmProviderConfig::new("primary", "https://api.deepseek.com", "deepseek-chat");
        provider.api_key = Some("sk-live".to_string());
        config.llm.providers.push(provider);

        let redacted = redact(config);
        let rendered = toml::to_string_pretty(&redacted).unwrap();
        assert!(!rendered.contains("store-secret"));
        assert!(!rendered.contains("sk-live"));
        assert!(rendered.contains(REDACTED));
        assert!(redacted.embedding.api_key.is_none());
    }
}
