use std::time::Duration;

use claudius::Usage as ClaudiusUsage;

/// Usage metrics for one policy request.
///
/// This tracks the token usage reported by claudius along with the number of model calls and the
/// wall clock time spent on the request.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Usage {
    /// Total token usage across all model calls
    pub claudius_usage: Option<ClaudiusUsage>,
    /// Wall clock time for the request
    pub wall_clock_time: Duration,
    /// Number of model calls that returned a response
    pub model_calls: usize,
}

impl Usage {
    /// Create a new empty Usage
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed model call and its token usage, if reported.
    pub fn record_call(&mut self, usage: Option<ClaudiusUsage>) {
        self.model_calls += 1;
        if let Some(usage) = usage {
            self.add_claudius_usage(usage);
        }
    }

    /// Add claudius usage to the total
    pub fn add_claudius_usage(&mut self, usage: ClaudiusUsage) {
        self.claudius_usage = Some(match self.claudius_usage {
            Some(existing) => existing + usage,
            None => usage,
        });
    }

    /// Set the wall clock time
    pub fn set_wall_clock_time(&mut self, duration: Duration) {
        self.wall_clock_time = duration;
    }
}
