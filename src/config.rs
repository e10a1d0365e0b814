//! Server configuration.

use crate::error::{Iec61850Error, Result};

/// Default capacity of an RCB delivery queue.
pub const DEFAULT_REPORT_QUEUE_CAPACITY: usize = 64;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Capacity of each RCB delivery queue unless overridden at creation
    pub report_queue_capacity: usize,
}

impl ServerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            report_queue_capacity: DEFAULT_REPORT_QUEUE_CAPACITY,
        }
    }

    /// Set the default report queue capacity.
    pub fn report_queue_capacity(mut self, capacity: usize) -> Self {
        self.report_queue_capacity = capacity;
        self
    }

    /// Check the configuration values.
    pub fn validate(&self) -> Result<()> {
        validate_queue_capacity(self.report_queue_capacity)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters of a report control block created on a logical node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportControlConfig {
    /// RCB name, unique within the logical node
    pub name: String,
    /// Report ID, unique within the server. Defaults to `name`.
    pub rpt_id: Option<String>,
    /// Dataset ID on the same logical node
    pub dataset: String,
    /// Delivery queue capacity. Defaults to the server setting.
    pub queue_capacity: Option<usize>,
}

impl ReportControlConfig {
    /// Create a configuration for RCB `name` bound to `dataset`.
    pub fn new(name: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rpt_id: None,
            dataset: dataset.into(),
            queue_capacity: None,
        }
    }

    /// Set the report ID.
    pub fn rpt_id(mut self, rpt_id: impl Into<String>) -> Self {
        self.rpt_id = Some(rpt_id.into());
        self
    }

    /// Override the delivery queue capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Effective report ID.
    pub fn effective_rpt_id(&self) -> &str {
        self.rpt_id.as_deref().unwrap_or(&self.name)
    }
}

pub(crate) fn validate_queue_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(Iec61850Error::Config(
            "report queue capacity must be at least 1".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config() {
        let config = ServerConfig::new().report_queue_capacity(8);
        assert_eq!(config.report_queue_capacity, 8);
        assert!(config.validate().is_ok());

        assert_eq!(
            ServerConfig::default().report_queue_capacity,
            DEFAULT_REPORT_QUEUE_CAPACITY
        );
    }

    #[test]
    fn test_report_control_config() {
        let config = ReportControlConfig::new("urcb01", "dsMeas");
        assert_eq!(config.effective_rpt_id(), "urcb01");
        assert_eq!(config.queue_capacity, None);

        let config = config
            .rpt_id("IED1/Protection/MMXU1$RP$urcb01")
            .queue_capacity(4);
        assert_eq!(config.effective_rpt_id(), "IED1/Protection/MMXU1$RP$urcb01");
        assert_eq!(config.queue_capacity, Some(4));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = ServerConfig::new()
            .report_queue_capacity(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Iec61850Error::Config(_)));
    }
}
