use crate::adapters::cache::DEFAULT_CACHE_FILE;
use crate::adapters::cardmarket::CardmarketConfig;
use crate::config::toml_config::TomlConfig;
use crate::domain::model::{LanguageSelector, PriceThresholds};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{PriceCheckError, Result};
use crate::utils::validation::{
    validate_file_stem, validate_non_empty_string, validate_one_of, validate_path,
    validate_range, validate_url, Validate,
};
use std::time::Duration;

pub const OUTPUT_FORMATS: [&str; 3] = ["html", "csv", "json"];

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub file: String,
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            file: DEFAULT_CACHE_FILE.to_string(),
            ttl: Duration::from_secs(24 * 3600),
        }
    }
}

/// Fully resolved run settings: defaults, then the TOML file, then command line flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub input_path: String,
    pub languages: LanguageSelector,
    pub workers: usize,
    pub thresholds: PriceThresholds,
    pub output_dir: String,
    pub output_name: Option<String>,
    pub output_formats: Vec<String>,
    pub cardmarket: CardmarketConfig,
    pub cache: CacheSettings,
    pub clean_only: bool,
}

impl Settings {
    pub fn new(input_path: impl Into<String>) -> Self {
        Self {
            input_path: input_path.into(),
            languages: LanguageSelector::default(),
            workers: 3,
            thresholds: PriceThresholds::default(),
            output_dir: "decks".to_string(),
            output_name: None,
            output_formats: vec!["html".to_string()],
            cardmarket: CardmarketConfig::default(),
            cache: CacheSettings::default(),
            clean_only: false,
        }
    }

    pub fn apply_toml(&mut self, toml: &TomlConfig) {
        if let Some(cm) = &toml.cardmarket {
            if let Some(base_url) = &cm.base_url {
                self.cardmarket.base_url = base_url.clone();
            }
            if let Some(sellers) = &cm.sellers {
                self.cardmarket.sellers = sellers.clone();
            }
            if let Some(ms) = cm.request_delay_ms {
                self.cardmarket.request_delay = Duration::from_millis(ms);
            }
            if let Some(secs) = cm.timeout_seconds {
                self.cardmarket.timeout = Duration::from_secs(secs);
            }
        }
        if let Some(t) = &toml.thresholds {
            if let Some(v) = t.deck_max {
                self.thresholds.deck_max = v;
            }
            if let Some(v) = t.expansion_max {
                self.thresholds.expansion_max = v;
            }
        }
        if let Some(c) = &toml.cache {
            if let Some(enabled) = c.enabled {
                self.cache.enabled = enabled;
            }
            if let Some(file) = &c.file {
                self.cache.file = file.clone();
            }
            if let Some(hours) = c.ttl_hours {
                self.cache.ttl = Duration::from_secs(hours.saturating_mul(3600));
            }
        }
        if let Some(o) = &toml.output {
            if let Some(dir) = &o.dir {
                self.output_dir = dir.clone();
            }
            if let Some(formats) = &o.formats {
                self.output_formats = formats.clone();
            }
        }
    }
}

impl ConfigProvider for Settings {
    fn input_path(&self) -> &str {
        &self.input_path
    }

    fn languages(&self) -> LanguageSelector {
        self.languages
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn thresholds(&self) -> PriceThresholds {
        self.thresholds
    }

    fn output_dir(&self) -> &str {
        &self.output_dir
    }

    fn output_name(&self) -> String {
        self.output_name
            .clone()
            .unwrap_or_else(|| format!("cardmarket_results_{}", self.languages.file_tag()))
    }

    fn output_formats(&self) -> &[String] {
        &self.output_formats
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_path("input", &self.input_path)?;
        validate_range("workers", self.workers, 1, 32)?;
        validate_url("cardmarket.base_url", &self.cardmarket.base_url)?;

        if self.cardmarket.sellers.is_empty() {
            return Err(PriceCheckError::MissingConfigError {
                field: "cardmarket.sellers".to_string(),
            });
        }
        for seller in &self.cardmarket.sellers {
            validate_non_empty_string("cardmarket.sellers", seller)?;
        }

        validate_range("thresholds.deck_max", self.thresholds.deck_max, 0.0, f64::MAX)?;
        validate_range(
            "thresholds.expansion_max",
            self.thresholds.expansion_max,
            self.thresholds.deck_max,
            f64::MAX,
        )?;

        validate_path("output_dir", &self.output_dir)?;
        validate_file_stem("output_name", &self.output_name())?;
        if self.output_formats.is_empty() {
            return Err(PriceCheckError::MissingConfigError {
                field: "formats".to_string(),
            });
        }
        for format in &self.output_formats {
            validate_one_of("formats", format, &OUTPUT_FORMATS)?;
        }

        if self.cache.enabled {
            validate_path("cache.file", &self.cache.file)?;
        }
        Ok(())
    }
}
