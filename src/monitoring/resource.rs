//! Resource Usage Sampling
//!
//! Reads host memory and CPU utilization at the moment a checkpoint asks
//! for it. Samplers are stateless with respect to limits; enforcement lives
//! in [`ResourceMonitor`](super::ResourceMonitor).

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sysinfo::System;

/// Pause between the two CPU refreshes sysinfo needs for a first reading.
const CPU_WARMUP: Duration = Duration::from_millis(200);

/// Default minimum interval between host refreshes.
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(200);

/// A single resource usage sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    /// When this sample was taken
    pub timestamp: DateTime<Utc>,
    /// Host memory in use, percent of total (0-100)
    pub memory_percent: f64,
    /// Host CPU utilization, percent (0-100)
    pub cpu_percent: f64,
}

impl ResourceSample {
    /// Creates a sample stamped now, clamping readings to `0.0..=100.0`.
    pub fn new(memory_percent: f64, cpu_percent: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            memory_percent: clamp_percent(memory_percent),
            cpu_percent: clamp_percent(cpu_percent),
        }
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Source of resource readings for a checkpoint.
pub trait ResourceSampler {
    /// Takes one sample of current memory and CPU utilization.
    fn sample(&mut self) -> ResourceSample;
}

/// Builds a fresh sampler for each task execution.
pub type SamplerFactory = Arc<dyn Fn() -> Box<dyn ResourceSampler> + Send + Sync>;

/// Factory producing [`SystemSampler`]s.
pub fn system_sampler_factory() -> SamplerFactory {
    Arc::new(|| Box::new(SystemSampler::new()) as Box<dyn ResourceSampler>)
}

/// Samples host-wide memory and CPU usage through sysinfo.
///
/// # Example
///
/// ```rust,no_run
/// use mathsim::monitoring::{ResourceSampler, SystemSampler};
///
/// let mut sampler = SystemSampler::new();
/// let sample = sampler.sample();
/// println!("memory {:.1}%, cpu {:.1}%", sample.memory_percent, sample.cpu_percent);
/// ```
pub struct SystemSampler {
    system: System,
    warmup_done: bool,
    last_refresh: Option<Instant>,
    min_interval: Duration,
}

impl SystemSampler {
    /// Creates a sampler for the current host.
    pub fn new() -> Self {
        Self {
            system: System::new(),
            warmup_done: false,
            last_refresh: None,
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }

    /// Sets the minimum interval between host refreshes.
    ///
    /// Samples requested inside the interval reuse the previous readings.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    fn refresh(&mut self, now: Instant) {
        self.system.refresh_memory();
        self.system.refresh_cpu();
        self.last_refresh = Some(now);
    }

    fn memory_percent(&self) -> f64 {
        let total = self.system.total_memory();
        if total == 0 {
            return 0.0;
        }
        self.system.used_memory() as f64 / total as f64 * 100.0
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSampler for SystemSampler {
    /// The first call performs CPU warmup (required for accurate readings).
    /// Subsequent refreshes are rate-limited by `min_interval`.
    fn sample(&mut self) -> ResourceSample {
        if !self.warmup_done {
            self.system.refresh_cpu();
            thread::sleep(CPU_WARMUP);
            self.warmup_done = true;
            self.refresh(Instant::now());
        } else {
            let now = Instant::now();
            let due = self
                .last_refresh
                .map_or(true, |last| now.duration_since(last) >= self.min_interval);
            if due {
                self.refresh(now);
            }
        }

        let cpu = f64::from(self.system.global_cpu_info().cpu_usage());
        ResourceSample::new(self.memory_percent(), cpu)
    }
}

/// Reports constant readings, optionally pausing before each one.
///
/// Useful where limits must be evaluated against known values rather than
/// whatever the host happens to be doing.
#[derive(Debug, Clone)]
pub struct FixedSampler {
    memory_percent: f64,
    cpu_percent: f64,
    delay: Option<Duration>,
}

impl FixedSampler {
    pub fn new(memory_percent: f64, cpu_percent: f64) -> Self {
        Self {
            memory_percent,
            cpu_percent,
            delay: None,
        }
    }

    /// Sleeps for `delay` before every sample.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Factory handing each task its own copy of this sampler.
    pub fn factory(self) -> SamplerFactory {
        Arc::new(move || Box::new(self.clone()) as Box<dyn ResourceSampler>)
    }
}

impl ResourceSampler for FixedSampler {
    fn sample(&mut self) -> ResourceSample {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        ResourceSample::new(self.memory_percent, self.cpu_percent)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use super::{ResourceSample, ResourceSampler, SamplerFactory};

    /// Replays `(memory, cpu)` readings in order, repeating the last one.
    #[derive(Debug, Clone)]
    pub struct SequenceSampler {
        readings: Vec<(f64, f64)>,
        next: usize,
    }

    impl SequenceSampler {
        pub fn new(readings: Vec<(f64, f64)>) -> Self {
            Self { readings, next: 0 }
        }

        /// `passing` readings at 10%, then one with memory at `memory_percent`.
        pub fn memory_spike_after(passing: usize, memory_percent: f64) -> Self {
            let mut readings = vec![(10.0, 10.0); passing];
            readings.push((memory_percent, 10.0));
            Self::new(readings)
        }

        pub fn factory(self) -> SamplerFactory {
            Arc::new(move || Box::new(self.clone()) as Box<dyn ResourceSampler>)
        }
    }

    impl ResourceSampler for SequenceSampler {
        fn sample(&mut self) -> ResourceSample {
            let index = self.next.min(self.readings.len().saturating_sub(1));
            self.next += 1;
            let (memory, cpu) = self.readings.get(index).copied().unwrap_or((0.0, 0.0));
            ResourceSample::new(memory, cpu)
        }
    }
}
