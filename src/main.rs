use clap::Parser;
use deck_pricer::config::Settings;
use deck_pricer::utils::error::{ErrorSeverity, PriceCheckError};
use deck_pricer::utils::{logger, validation::Validate};
use deck_pricer::{
    CachedLookup, CardmarketLookup, CliConfig, DeckPricePipeline, JsonFileCache, LocalStorage,
    PriceCheckEngine, PriceLookup,
};
use std::sync::Arc;

async fn build_lookup(settings: &Settings) -> Result<Arc<dyn PriceLookup>, PriceCheckError> {
    let cardmarket = CardmarketLookup::new(settings.cardmarket.clone())?;
    if !settings.cache.enabled {
        tracing::info!("💾 Cache disabled");
        return Ok(Arc::new(cardmarket));
    }
    let cache = JsonFileCache::open(
        &settings.cache.file,
        settings.cache.ttl,
        settings.cardmarket.cache_scope(),
    )
    .await;
    Ok(Arc::new(CachedLookup::new(cardmarket, cache)))
}

async fn run(config: &CliConfig) -> Result<Vec<String>, PriceCheckError> {
    let settings = config.to_settings()?;
    settings.validate()?;
    tracing::debug!("Resolved settings: {:?}", settings);

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let clean_only = settings.clean_only;
    let lookup = build_lookup(&settings).await?;
    let pipeline = DeckPricePipeline::new(LocalStorage::default(), settings, lookup);
    let engine = PriceCheckEngine::new_with_monitoring(pipeline, config.monitor);

    if clean_only {
        engine.clean_only().await?;
        return Ok(Vec::new());
    }
    engine.run().await
}

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting deck-pricer for {}", config.input);

    match run(&config).await {
        Ok(paths) => {
            println!("✅ Price check completed successfully!");
            for path in paths {
                println!("📁 Report saved to: {}", path);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Price check failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            // 依嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}
