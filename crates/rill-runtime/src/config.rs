use std::time::Duration;

/// Runtime configuration shared by every topic and actor of one app
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Capacity of each subscription queue (backpressure point)
    pub channel_capacity: usize,

    /// How long to wait for a cancelled replica task before aborting it
    pub stop_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            stop_timeout: Duration::from_secs(5),
        }
    }
}
