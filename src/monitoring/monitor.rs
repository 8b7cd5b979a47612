//! Resource Guard
//!
//! A [`ResourceMonitor`] is owned by exactly one task execution. Every
//! checkpoint appends one sample to its [`ResourceLog`] and then evaluates
//! the sample against the task's [`ResourceLimits`].

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ResourceKind, ResourceLimitExceeded};

use super::resource::{ResourceSample, ResourceSampler, SystemSampler};

const DEFAULT_MAX_MEMORY_PERCENT: f64 = 90.0;
const DEFAULT_MAX_CPU_PERCENT: f64 = 95.0;

/// Memory and CPU ceilings for one task. A reading equal to the limit is
/// allowed; only a reading strictly above it trips the guard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    #[serde(default = "default_max_memory")]
    max_memory_percent: f64,
    #[serde(default = "default_max_cpu")]
    max_cpu_percent: f64,
}

fn default_max_memory() -> f64 {
    DEFAULT_MAX_MEMORY_PERCENT
}

fn default_max_cpu() -> f64 {
    DEFAULT_MAX_CPU_PERCENT
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_memory_percent: DEFAULT_MAX_MEMORY_PERCENT,
            max_cpu_percent: DEFAULT_MAX_CPU_PERCENT,
        }
    }
}

impl ResourceLimits {
    /// Creates validated limits. Both values must lie in `0.0..=100.0`.
    pub fn new(max_memory_percent: f64, max_cpu_percent: f64) -> Result<Self, ConfigError> {
        let limits = Self {
            max_memory_percent,
            max_cpu_percent,
        };
        limits.validate()?;
        Ok(limits)
    }

    /// Limits that can never be exceeded.
    pub fn unlimited() -> Self {
        Self {
            max_memory_percent: 100.0,
            max_cpu_percent: 100.0,
        }
    }

    pub fn max_memory_percent(&self) -> f64 {
        self.max_memory_percent
    }

    pub fn max_cpu_percent(&self) -> f64 {
        self.max_cpu_percent
    }

    /// Checks both limits are finite percentages.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_percent("max_memory_percent", self.max_memory_percent)?;
        check_percent("max_cpu_percent", self.max_cpu_percent)
    }

    /// Returns the first limit the sample violates, memory before CPU.
    pub fn evaluate(&self, sample: &ResourceSample) -> Result<(), ResourceLimitExceeded> {
        if sample.memory_percent > self.max_memory_percent {
            return Err(ResourceLimitExceeded {
                resource: ResourceKind::Memory,
                observed: sample.memory_percent,
                limit: self.max_memory_percent,
            });
        }
        if sample.cpu_percent > self.max_cpu_percent {
            return Err(ResourceLimitExceeded {
                resource: ResourceKind::Cpu,
                observed: sample.cpu_percent,
                limit: self.max_cpu_percent,
            });
        }
        Ok(())
    }
}

fn check_percent(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidLimit { name, value })
    }
}

/// Append-only series of samples taken by one task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceLog {
    samples: Vec<ResourceSample>,
}

impl ResourceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, sample: ResourceSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns all recorded samples, oldest first.
    pub fn samples(&self) -> &[ResourceSample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&ResourceSample> {
        self.samples.last()
    }

    /// Returns the peak memory usage in percent.
    pub fn peak_memory_percent(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.memory_percent)
            .fold(0.0, f64::max)
    }

    /// Returns the peak CPU usage in percent.
    pub fn peak_cpu_percent(&self) -> f64 {
        self.samples.iter().map(|s| s.cpu_percent).fold(0.0, f64::max)
    }

    /// Returns the average CPU usage.
    pub fn average_cpu_percent(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|s| s.cpu_percent).sum::<f64>() / self.samples.len() as f64
    }

    /// Returns a human-readable summary of resource usage.
    pub fn summary(&self) -> String {
        if self.samples.is_empty() {
            return "No resource data collected".to_string();
        }

        format!(
            "Resource Usage:\n  Average CPU: {:.1}%\n  Peak CPU: {:.1}%\n  Peak Memory: {:.1}%\n  Samples: {}",
            self.average_cpu_percent(),
            self.peak_cpu_percent(),
            self.peak_memory_percent(),
            self.samples.len()
        )
    }
}

/// Guards one task execution against its resource limits.
///
/// # Example
///
/// ```rust
/// use mathsim::monitoring::{FixedSampler, ResourceLimits, ResourceMonitor};
///
/// let mut monitor = ResourceMonitor::with_sampler(
///     ResourceLimits::default(),
///     Box::new(FixedSampler::new(40.0, 10.0)),
/// );
///
/// monitor.checkpoint().unwrap();
/// assert_eq!(monitor.log().len(), 1);
/// ```
pub struct ResourceMonitor {
    sampler: Box<dyn ResourceSampler>,
    limits: ResourceLimits,
    log: ResourceLog,
}

impl ResourceMonitor {
    /// Creates a monitor sampling the current host.
    pub fn new(limits: ResourceLimits) -> Self {
        Self::with_sampler(limits, Box::new(SystemSampler::new()))
    }

    pub fn with_sampler(limits: ResourceLimits, sampler: Box<dyn ResourceSampler>) -> Self {
        Self {
            sampler,
            limits,
            log: ResourceLog::new(),
        }
    }

    /// Takes one sample, records it, then evaluates it against the limits.
    ///
    /// The sample is recorded even when it trips a limit, so the log always
    /// ends with the triggering sample.
    pub fn checkpoint(&mut self) -> Result<ResourceSample, ResourceLimitExceeded> {
        let sample = self.sampler.sample();
        self.log.push(sample.clone());
        self.limits.evaluate(&sample)?;
        Ok(sample)
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn log(&self) -> &ResourceLog {
        &self.log
    }

    /// Consumes the monitor, keeping its log.
    pub fn into_log(self) -> ResourceLog {
        self.log
    }
}
