//! Resource Monitoring Module
//!
//! Samples host resource usage at task checkpoints and enforces limits.
//!
//! # Components
//!
//! - [`ResourceSampler`]: reads memory and CPU utilization on demand
//! - [`ResourceMonitor`]: per-task sample log plus limit enforcement
//! - [`ExecutionTimeline`]: task start/end timing for a batch

pub mod monitor;
pub mod resource;
pub mod timeline;

pub use monitor::{ResourceLimits, ResourceLog, ResourceMonitor};
pub use resource::{
    system_sampler_factory, FixedSampler, ResourceSample, ResourceSampler, SamplerFactory,
    SystemSampler,
};
pub use timeline::{EventType, ExecutionTimeline, TimelineEvent};
