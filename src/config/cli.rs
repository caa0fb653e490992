use crate::config::{Settings, TomlConfig};
use crate::domain::model::LanguageSelector;
use crate::utils::error::Result;
use clap::Parser;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "deck-pricer")]
#[command(about = "Cleans an MTG decklist and finds the cheapest Cardmarket seller for each card")]
pub struct CliConfig {
    /// Decklist file; it is rewritten with one clean card name per line
    #[arg(long)]
    pub input: String,

    #[arg(long, default_value = "en", help = "Language to search: en, es or both (alias: all)")]
    pub lang: LanguageSelector,

    #[arg(long, default_value = "3", help = "Number of cards looked up in parallel")]
    pub workers: usize,

    #[arg(long, help = "Seconds to wait after each request [default: 0.5]")]
    pub sleep: Option<f64>,

    #[arg(long, help = "Request timeout in seconds [default: 30]")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Optional TOML settings file")]
    pub config: Option<String>,

    #[arg(long, help = "Report directory [default: decks]")]
    pub output_dir: Option<String>,

    #[arg(long, help = "Report file name without extension [default: cardmarket_results_<lang>]")]
    pub output_name: Option<String>,

    #[arg(long, value_delimiter = ',', help = "Report formats: html, csv, json [default: html]")]
    pub formats: Vec<String>,

    #[arg(long)]
    pub deck_max: Option<f64>,

    #[arg(long)]
    pub expansion_max: Option<f64>,

    #[arg(long)]
    pub cache_file: Option<String>,

    #[arg(long)]
    pub cache_ttl_hours: Option<u64>,

    #[arg(long, help = "Ignore and do not update the price cache")]
    pub no_cache: bool,

    #[arg(long, help = "Only clean the decklist, skip the price lookup")]
    pub clean_only: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log as JSON lines on stderr")]
    pub log_json: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

impl CliConfig {
    /// Builds the run settings: defaults, then `--config`, then explicit flags.
    pub fn to_settings(&self) -> Result<Settings> {
        let mut settings = Settings::new(self.input.clone());

        if let Some(path) = &self.config {
            tracing::info!("📁 Loading configuration from: {}", path);
            settings.apply_toml(&TomlConfig::from_file(path)?);
        }

        settings.languages = self.lang;
        settings.workers = self.workers;
        settings.clean_only = self.clean_only;

        if let Some(secs) = self.sleep {
            settings.cardmarket.request_delay = Duration::try_from_secs_f64(secs).map_err(|e| {
                crate::utils::error::PriceCheckError::InvalidConfigValueError {
                    field: "sleep".to_string(),
                    value: secs.to_string(),
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(secs) = self.timeout {
            settings.cardmarket.timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = &self.output_dir {
            settings.output_dir = dir.clone();
        }
        if let Some(name) = &self.output_name {
            settings.output_name = Some(name.clone());
        }
        if !self.formats.is_empty() {
            settings.output_formats = self.formats.iter().map(|f| f.trim().to_lowercase()).collect();
        }
        if let Some(v) = self.deck_max {
            settings.thresholds.deck_max = v;
        }
        if let Some(v) = self.expansion_max {
            settings.thresholds.expansion_max = v;
        }
        if let Some(file) = &self.cache_file {
            settings.cache.file = file.clone();
        }
        if let Some(hours) = self.cache_ttl_hours {
            settings.cache.ttl = Duration::from_secs(hours.saturating_mul(3600));
        }
        if self.no_cache {
            settings.cache.enabled = false;
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::Validate;

    #[test]
    fn test_cli_defaults() {
        let cli = CliConfig::parse_from(["deck-pricer", "--input", "deck.txt"]);
        let settings = cli.to_settings().unwrap();

        assert_eq!(settings.input_path, "deck.txt");
        assert_eq!(settings.languages, LanguageSelector::En);
        assert_eq!(settings.workers, 3);
        assert_eq!(settings.output_formats, vec!["html"]);
        assert!(settings.cache.enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_cli_flags_override() {
        let cli = CliConfig::parse_from([
            "deck-pricer",
            "--input",
            "deck.txt",
            "--lang",
            "all",
            "--sleep",
            "0",
            "--formats",
            "html,CSV",
            "--deck-max",
            "1.5",
            "--no-cache",
        ]);
        let settings = cli.to_settings().unwrap();

        assert_eq!(settings.languages, LanguageSelector::Both);
        assert!(settings.cardmarket.request_delay.is_zero());
        assert_eq!(settings.output_formats, vec!["html", "csv"]);
        assert_eq!(settings.thresholds.deck_max, 1.5);
        assert!(!settings.cache.enabled);
    }

    #[test]
    fn test_negative_sleep_is_rejected() {
        let cli = CliConfig::parse_from(["deck-pricer", "--input", "deck.txt", "--sleep=-1"]);
        assert!(cli.to_settings().is_err());
    }

    #[test]
    fn test_unknown_language_is_rejected() {
        let parsed = CliConfig::try_parse_from(["deck-pricer", "--input", "d.txt", "--lang", "de"]);
        assert!(parsed.is_err());
    }
}
