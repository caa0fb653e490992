use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;

/// Drives a [`Pipeline`] through extract, transform and load.
pub struct PriceCheckEngine<P: Pipeline> {
    pipeline: P,
    monitor: RunMonitor,
}

impl<P: Pipeline> PriceCheckEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    /// Runs the three stages and returns the paths of the written report files.
    pub async fn run(&self) -> Result<Vec<String>> {
        tracing::info!("🚀 Starting price check...");
        self.monitor.log_phase("start");

        // Extract
        tracing::info!("📄 Cleaning decklist...");
        let deck = self.pipeline.extract().await?;
        tracing::info!("📄 Normalized {} cards", deck.cards.len());
        self.monitor.log_phase("extract");

        // Transform
        tracing::info!("🔎 Looking up prices...");
        let mut priced = self.pipeline.transform(deck).await?;
        priced.summary.execution_time = self.monitor.elapsed();
        tracing::info!(
            "🔎 Priced {} cards ({} not found)",
            priced.report.card_count(),
            priced.report.not_found.len()
        );
        self.monitor.log_phase("transform");

        // Load
        tracing::info!("💾 Writing reports...");
        let paths = self.pipeline.load(priced).await?;
        for path in &paths {
            tracing::info!("📁 Report saved to: {}", path);
        }
        self.monitor.log_phase("load");
        self.monitor.log_final_stats();

        Ok(paths)
    }

    /// Only the extract stage: rewrites the input file and stops.
    pub async fn clean_only(&self) -> Result<usize> {
        let deck = self.pipeline.extract().await?;
        tracing::info!("🧹 Decklist cleaned: {} cards", deck.cards.len());
        Ok(deck.cards.len())
    }
}
