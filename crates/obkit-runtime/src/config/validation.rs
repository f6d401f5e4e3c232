//! Configuration validation utilities.

use std::collections::HashSet;

use obkit_adapter_onebot::OneBotBotConfig;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, ObkitConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ObkitConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_bots_config(&config.bots)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

fn validate_bots_config(bots: &[OneBotBotConfig]) -> ConfigResult<()> {
    let mut seen_ids = HashSet::new();

    for (index, bot) in bots.iter().enumerate() {
        if bot.bot_unique_id.trim().is_empty() {
            return Err(ConfigError::missing_field(format!(
                "bots[{index}].bot_unique_id"
            )));
        }

        if !seen_ids.insert(bot.bot_unique_id.as_str()) {
            return Err(ConfigError::DuplicateBotId(bot.bot_unique_id.clone()));
        }

        bot.validate().map_err(|e| {
            ConfigError::validation(format!("bot '{}': {e}", bot.bot_unique_id))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(bots: Vec<OneBotBotConfig>) -> ObkitConfig {
        ObkitConfig {
            bots,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_empty_config() {
        assert!(validate_config(&ObkitConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_duplicate_bot_id() {
        let config = config_with(vec![OneBotBotConfig::new("a"), OneBotBotConfig::new("a")]);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::DuplicateBotId(id)) if id == "a"
        ));
    }

    #[test]
    fn test_validate_empty_bot_id() {
        let config = config_with(vec![OneBotBotConfig::new("a"), OneBotBotConfig::new(" ")]);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { field }) if field == "bots[1].bot_unique_id"
        ));
    }

    #[test]
    fn test_validate_bad_host() {
        let config = config_with(vec![
            OneBotBotConfig::new("a").event_server_host("http://127.0.0.1:3002"),
        ]);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_file_output_requires_path() {
        let mut config = ObkitConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());
    }
}
