use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

#[derive(Debug, Clone)]
pub struct ResourceStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
}

#[cfg(feature = "cli")]
struct ProcessProbe {
    system: Mutex<System>,
    pid: Pid,
    peak_memory_mb: Mutex<u64>,
}

#[cfg(feature = "cli")]
impl ProcessProbe {
    fn new() -> Option<Self> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        Some(Self {
            system: Mutex::new(system),
            pid,
            peak_memory_mb: Mutex::new(0),
        })
    }

    fn sample(&self) -> Option<ResourceStats> {
        let mut system = self.system.lock().ok()?;
        system.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        let process = system.process(self.pid)?;
        let memory_mb = process.memory() / 1024 / 1024;

        let mut peak = self.peak_memory_mb.lock().ok()?;
        *peak = (*peak).max(memory_mb);

        Some(ResourceStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
        })
    }
}

/// Measures the run's wall time and, when enabled, logs process CPU and memory per phase.
pub struct RunMonitor {
    start_time: Instant,
    #[cfg(feature = "cli")]
    probe: Option<ProcessProbe>,
}

impl RunMonitor {
    pub fn new(enabled: bool) -> Self {
        #[cfg(not(feature = "cli"))]
        let _ = enabled;

        Self {
            start_time: Instant::now(),
            #[cfg(feature = "cli")]
            probe: if enabled { ProcessProbe::new() } else { None },
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "cli")]
        {
            self.probe.is_some()
        }
        #[cfg(not(feature = "cli"))]
        {
            false
        }
    }

    pub fn stats(&self) -> Option<ResourceStats> {
        #[cfg(feature = "cli")]
        {
            self.probe.as_ref().and_then(ProcessProbe::sample)
        }
        #[cfg(not(feature = "cli"))]
        {
            None
        }
    }

    pub fn log_phase(&self, phase: &str) {
        if let Some(stats) = self.stats() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
                phase,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb,
                self.elapsed()
            );
        }
    }

    pub fn log_final_stats(&self) {
        match self.stats() {
            Some(stats) => tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                self.elapsed(),
                stats.peak_memory_mb
            ),
            None => tracing::debug!("Run finished in {:?}", self.elapsed()),
        }
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
