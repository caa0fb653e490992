use crate::utils::error::{PriceCheckError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional settings file. Every section and key may be omitted.
///
/// ```toml
/// [cardmarket]
/// base_url = "https://www.cardmarket.com"
/// sellers = ["MagicBarcelona", "Itaca"]
/// request_delay_ms = 500
/// timeout_seconds = 30
///
/// [thresholds]
/// deck_max = 2.0
/// expansion_max = 10.0
///
/// [cache]
/// enabled = true
/// file = "cardmarket_cache.json"
/// ttl_hours = 24
///
/// [output]
/// dir = "decks"
/// formats = ["html", "csv"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub cardmarket: Option<CardmarketSection>,
    pub thresholds: Option<ThresholdsSection>,
    pub cache: Option<CacheSection>,
    pub output: Option<OutputSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardmarketSection {
    pub base_url: Option<String>,
    pub sellers: Option<Vec<String>>,
    pub request_delay_ms: Option<u64>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdsSection {
    pub deck_max: Option<f64>,
    pub expansion_max: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSection {
    pub enabled: Option<bool>,
    pub file: Option<String>,
    pub ttl_hours: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSection {
    pub dir: Option<String>,
    pub formats: Option<Vec<String>>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PriceCheckError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PriceCheckError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CARDMARKET_URL})，未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PriceCheckError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}
