
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};

use super::{AnswerConfig, Config, ConfigError, ProviderConfig};
use crate::config::settings::API_KEY_ENV;

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 FAQ Bot Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir);

    eprintln!("{}", style("Provider Configuration").bold().yellow());
    eprintln!("Configure the Azure OpenAI deployments used for embeddings and answers.");
    eprintln!(
        "The API key is read from {} and is never written to the config file.",
        style(API_KEY_ENV).cyan()
    );
    eprintln!();

    configure_provider(&mut config.provider)?;

    eprintln!();
    eprintln!("{}", style("Answer Configuration").bold().yellow());
    configure_answer(&mut config.answer)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_provider_connection(&config.provider) {
        eprintln!("{}", style("✓ Provider endpoint reachable!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the provider endpoint").yellow()
        );
        eprintln!("You can continue, but indexing and answering will fail until it is reachable.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Provider Settings:").bold().yellow());
    eprintln!("  Endpoint: {}", style(&config.provider.endpoint).cyan());
    eprintln!("  API Version: {}", style(&config.provider.api_version).cyan());
    eprintln!(
        "  Embedding Deployment: {}",
        style(&config.provider.embedding_deployment).cyan()
    );
    eprintln!(
        "  Chat Deployment: {}",
        style(&config.provider.chat_deployment).cyan()
    );
    eprintln!(
        "  Timeout: {}s, Attempts: {}",
        style(config.provider.timeout_seconds).cyan(),
        style(config.provider.retry_attempts).cyan()
    );
    let key_status = if config.provider.api_key.is_some() {
        style("set").green()
    } else {
        style("missing").red()
    };
    eprintln!("  API Key ({}): {}", API_KEY_ENV, key_status);

    eprintln!();
    eprintln!("{}", style("Answer Settings:").bold().yellow());
    eprintln!(
        "  Confidence Threshold: {}",
        style(config.answer.confidence_threshold).cyan()
    );
    eprintln!("  Temperature: {}", style(config.answer.temperature).cyan());
    eprintln!("  Max Tokens: {}", style(config.answer.max_tokens).cyan());
    eprintln!(
        "  Related Questions: {}",
        style(config.answer.related_questions).cyan()
    );
    eprintln!(
        "  Fallback to Stored Answer: {}",
        style(config.answer.fallback_to_stored_answer).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Paths:").bold().yellow());
    eprintln!("  Corpus: {}", style(config.corpus_path().display()).cyan());
    eprintln!(
        "  Artifacts: {}",
        style(config.artifacts_dir().display()).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load_file(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Config::with_base_dir(config_dir)
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

fn configure_provider(provider: &mut ProviderConfig) -> Result<()> {
    let endpoint: String = Input::new()
        .with_prompt("Azure OpenAI endpoint")
        .default(provider.endpoint.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = ProviderConfig {
                endpoint: input.clone(),
                ..ProviderConfig::default()
            };
            temp_config.validate()
        })
        .interact_text()?;

    let api_version: String = Input::new()
        .with_prompt("API version")
        .default(provider.api_version.clone())
        .validate_with(non_empty("API version"))
        .interact_text()?;

    let embedding_deployment: String = Input::new()
        .with_prompt("Embedding deployment")
        .default(provider.embedding_deployment.clone())
        .validate_with(non_empty("Deployment name"))
        .interact_text()?;

    let chat_deployment: String = Input::new()
        .with_prompt("Chat deployment")
        .default(provider.chat_deployment.clone())
        .validate_with(non_empty("Deployment name"))
        .interact_text()?;

    provider.set_endpoint(endpoint)?;
    provider.set_api_version(api_version)?;
    provider.set_embedding_deployment(embedding_deployment)?;
    provider.set_chat_deployment(chat_deployment)?;

    Ok(())
}

fn configure_answer(answer: &mut AnswerConfig) -> Result<()> {
    let threshold: f32 = Input::new()
        .with_prompt("Confidence threshold (squared L2 distance)")
        .default(answer.confidence_threshold)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if input.is_finite() && *input >= 0.0 {
                Ok(())
            } else {
                Err("Threshold must be a non-negative number")
            }
        })
        .interact_text()?;

    answer.set_confidence_threshold(threshold)?;
    answer.fallback_to_stored_answer = Confirm::new()
        .with_prompt("Return the stored answer when generation fails?")
        .default(answer.fallback_to_stored_answer)
        .interact()?;

    Ok(())
}

fn non_empty(what: &'static str) -> impl FnMut(&String) -> Result<(), String> {
    move |input: &String| {
        if input.trim().is_empty() {
            Err(format!("{} cannot be empty", what))
        } else {
            Ok(())
        }
    }
}

/// Any HTTP response counts as reachable; only transport failures do not
fn test_provider_connection(provider: &ProviderConfig) -> bool {
    let Ok(url) = provider.embeddings_url() else {
        return false;
    };

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .http_status_as_error(false)
        .build()
        .into();

    agent.get(url.as_str()).call().is_ok()
}
