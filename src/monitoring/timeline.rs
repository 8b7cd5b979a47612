//! Batch Timeline
//!
//! Records when each task of a batch starts and finishes, in the order the
//! orchestrator observes it. Used for per-task durations and an ASCII chart.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Type of timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Task handed to a worker
    Started,
    /// Task finished with a result
    Completed,
    /// Task finished with a failure
    Failed,
}

impl EventType {
    fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A single event in the batch timeline.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    pub task_id: String,
    pub event_type: EventType,
    pub timestamp: Instant,
}

/// Tracks the execution timeline of one batch.
#[derive(Debug, Clone)]
pub struct ExecutionTimeline {
    events: Vec<TimelineEvent>,
    start_time: Instant,
}

impl ExecutionTimeline {
    /// Creates a new timeline starting now.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Records an event for a task.
    pub fn add_event(&mut self, task_id: impl Into<String>, event_type: EventType) {
        self.events.push(TimelineEvent {
            task_id: task_id.into(),
            event_type,
            timestamp: Instant::now(),
        });
    }

    pub fn get_events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Returns the total elapsed time since timeline creation.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Task ids in the order their terminal event was recorded.
    pub fn completion_order(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.event_type.is_terminal())
            .map(|e| e.task_id.as_str())
            .collect()
    }

    /// Returns task durations in milliseconds, for tasks that finished.
    pub fn get_durations(&self) -> HashMap<String, u128> {
        self.spans()
            .into_iter()
            .filter_map(|(id, (start, end))| end.map(|end| (id, end - start)))
            .collect()
    }

    /// Generates an ASCII Gantt chart, one bar per finished task.
    pub fn gantt_chart(&self) -> String {
        let mut output = String::from("\nExecution Timeline:\n\n");

        let total_time = self.start_time.elapsed().as_millis();
        if total_time == 0 {
            return output;
        }

        // Scale to 50 characters width
        let scale = 50.0 / total_time as f64;

        let mut spans: Vec<_> = self
            .spans()
            .into_iter()
            .filter_map(|(id, (start, end))| end.map(|end| (id, start, end)))
            .collect();
        spans.sort_by_key(|(_, start, _)| *start);

        for (task_id, start, end) in spans {
            let start_pos = (start as f64 * scale) as usize;
            let width = ((end - start) as f64 * scale).max(1.0) as usize;

            let mut bar = " ".repeat(start_pos);
            bar.push_str(&"#".repeat(width));

            output.push_str(&format!(
                "{:12} |{}| ({} ms)\n",
                truncate(&task_id, 12),
                bar,
                end - start
            ));
        }

        output.push_str(&format!("\nTotal: {} ms\n", total_time));
        output
    }

    /// Millisecond offsets of each task's start and (if any) end.
    fn spans(&self) -> HashMap<String, (u128, Option<u128>)> {
        let mut spans: HashMap<String, (u128, Option<u128>)> = HashMap::new();

        for event in &self.events {
            let elapsed = event.timestamp.duration_since(self.start_time).as_millis();

            match event.event_type {
                EventType::Started => {
                    spans.insert(event.task_id.clone(), (elapsed, None));
                }
                EventType::Completed | EventType::Failed => {
                    if let Some(span) = spans.get_mut(&event.task_id) {
                        span.1 = Some(elapsed);
                    }
                }
            }
        }

        spans
    }
}

impl Default for ExecutionTimeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Pads or truncates a label to a fixed width.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        format!("{:width$}", s, width = max_len)
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_timeline_creation() {
        let timeline = ExecutionTimeline::new();
        assert!(timeline.get_events().is_empty());
    }

    #[test]
    fn test_get_durations() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event("84", EventType::Started);
        thread::sleep(Duration::from_millis(50));
        timeline.add_event("84", EventType::Completed);

        let durations = timeline.get_durations();
        assert!(*durations.get("84").unwrap() >= 50);
    }

    #[test]
    fn test_durations_skip_unfinished() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event("sieve", EventType::Started);

        assert!(timeline.get_durations().is_empty());
    }

    #[test]
    fn test_failed_tasks_have_durations() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event("-1", EventType::Started);
        timeline.add_event("-1", EventType::Failed);

        assert!(timeline.get_durations().contains_key("-1"));
        assert_eq!(timeline.get_events()[1].event_type, EventType::Failed);
    }

    #[test]
    fn test_completion_order() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event("slow", EventType::Started);
        timeline.add_event("fast", EventType::Started);
        timeline.add_event("fast", EventType::Completed);
        timeline.add_event("slow", EventType::Failed);

        assert_eq!(timeline.completion_order(), vec!["fast", "slow"]);
    }

    #[test]
    fn test_gantt_chart_generation() {
        let mut timeline = ExecutionTimeline::new();

        timeline.add_event("aliquot", EventType::Started);
        thread::sleep(Duration::from_millis(30));
        timeline.add_event("aliquot", EventType::Completed);
        timeline.add_event("factorize", EventType::Started);
        thread::sleep(Duration::from_millis(30));
        timeline.add_event("factorize", EventType::Completed);

        let chart = timeline.gantt_chart();
        assert!(chart.contains("aliquot"));
        assert!(chart.contains("factorize"));
        assert!(chart.contains("Total:"));
    }

    #[test]
    fn test_truncate_long_label() {
        assert_eq!(truncate("a_very_long_task_id", 12), "a_very_lo...");
        assert_eq!(truncate("short", 8), "short   ");
    }

    #[test]
    fn test_timeline_elapsed() {
        let timeline = ExecutionTimeline::default();
        thread::sleep(Duration::from_millis(20));
        assert!(timeline.elapsed() >= Duration::from_millis(20));
    }
}
