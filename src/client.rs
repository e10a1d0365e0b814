//! Client role.
//!
//! An [`MmsClient`] is an in-process consumer bound to one [`Server`]. It
//! browses and reads the model directly and owns report control blocks
//! through reservations; each reservation hands out a [`ReportInbox`] the
//! client drains at its own pace.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Iec61850Error, Result};
use crate::model::AttributeSnapshot;
use crate::queue::ReportInbox;
use crate::rcb::{RcbState, ReportControlBlock};
use crate::server::Server;
use crate::types::DataValue;

static NEXT_SINK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a report sink, used as RCB owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(u64);

impl SinkId {
    /// Allocate a process-unique sink ID.
    pub fn next() -> Self {
        Self(NEXT_SINK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sink-{}", self.0)
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not bound to a server
    Disconnected,
    /// Bound to a server
    Connected,
}

/// In-process IEC 61850 client acting as report sink.
#[derive(Debug)]
pub struct MmsClient {
    id: SinkId,
    server: Option<Arc<Server>>,
    owned: HashMap<String, Arc<ReportControlBlock>>,
}

impl MmsClient {
    /// Create a disconnected client with a fresh sink ID.
    pub fn new() -> Self {
        Self {
            id: SinkId::next(),
            server: None,
            owned: HashMap::new(),
        }
    }

    /// Sink ID used as owner of reserved RCBs.
    pub fn id(&self) -> SinkId {
        self.id
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        if self.server.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Bind to a server.
    pub fn connect(&mut self, server: Arc<Server>) -> Result<()> {
        if self.server.is_some() {
            return Err(Iec61850Error::invalid_state("Already connected"));
        }
        info!(sink = %self.id, server = server.name(), "connected");
        self.server = Some(server);
        Ok(())
    }

    /// Unbind from the server, releasing every owned RCB.
    ///
    /// Fails with `OwnedEnabledRcb`, changing nothing, if an owned RCB is
    /// still enabled.
    pub fn disconnect(&mut self) -> Result<()> {
        if self.server.is_none() {
            return Ok(());
        }

        let mut enabled: Vec<&str> = self
            .owned
            .iter()
            .filter(|(_, rcb)| rcb.state() == RcbState::Enabled)
            .map(|(id, _)| id.as_str())
            .collect();
        if !enabled.is_empty() {
            enabled.sort_unstable();
            return Err(Iec61850Error::OwnedEnabledRcb(enabled.join(", ")));
        }

        for (rpt_id, rcb) in self.owned.drain() {
            // Only fails if the RCB got enabled after the check above.
            if let Err(e) = rcb.release(self.id) {
                debug!(sink = %self.id, rcb = %rpt_id, error = %e, "release on disconnect failed");
            }
        }
        self.server = None;
        info!(sink = %self.id, "disconnected");
        Ok(())
    }

    /// Names of the children of `path` (see [`Server::directory`]).
    pub fn browse(&self, path: &str) -> Result<Vec<String>> {
        self.server()?.directory(path)
    }

    /// Every attribute of the server with its current value.
    pub fn discover(&self) -> Result<Vec<AttributeSnapshot>> {
        Ok(self.server()?.discover())
    }

    /// Read an attribute value.
    pub fn read(&self, path: &str) -> Result<DataValue> {
        self.server()?.read(path)
    }

    /// Read value, quality and timestamp of an attribute.
    pub fn read_attribute(&self, path: &str) -> Result<AttributeSnapshot> {
        self.server()?.read_attribute(path)
    }

    /// Reserve an RCB by report ID.
    pub fn reserve(&mut self, rpt_id: &str) -> Result<ReportInbox> {
        let rcb = self.server()?.report_control(rpt_id)?;
        let inbox = rcb.reserve(self.id)?;
        self.owned.insert(rpt_id.to_string(), rcb);
        Ok(inbox)
    }

    /// Enable an RCB this client owns.
    pub fn enable(&mut self, rpt_id: &str) -> Result<()> {
        self.server()?.report_control(rpt_id)?.enable(self.id)
    }

    /// Disable an RCB this client owns.
    pub fn disable(&mut self, rpt_id: &str) -> Result<()> {
        self.server()?.report_control(rpt_id)?.disable(self.id)
    }

    /// Release an RCB this client owns.
    pub fn release(&mut self, rpt_id: &str) -> Result<()> {
        self.server()?.report_control(rpt_id)?.release(self.id)?;
        self.owned.remove(rpt_id);
        Ok(())
    }

    /// Reserve and enable an RCB, returning the inbox its reports land in.
    ///
    /// If enabling fails, a reservation made by this call is undone.
    pub fn subscribe(&mut self, rpt_id: &str) -> Result<ReportInbox> {
        let rcb = self.server()?.report_control(rpt_id)?;
        let newly_reserved = rcb.owner() != Some(self.id);
        let inbox = rcb.reserve(self.id)?;

        if let Err(e) = rcb.enable(self.id) {
            if newly_reserved {
                rcb.release(self.id).ok();
            }
            return Err(e);
        }

        self.owned.insert(rpt_id.to_string(), rcb);
        info!(sink = %self.id, rcb = rpt_id, "subscribed");
        Ok(inbox)
    }

    /// Disable and release an RCB.
    pub fn unsubscribe(&mut self, rpt_id: &str) -> Result<()> {
        let rcb = self.server()?.report_control(rpt_id)?;
        rcb.disable(self.id)?;
        rcb.release(self.id)?;
        self.owned.remove(rpt_id);
        info!(sink = %self.id, rcb = rpt_id, "unsubscribed");
        Ok(())
    }

    /// Report IDs of the RCBs this client owns, sorted.
    pub fn owned_report_controls(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.owned.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn server(&self) -> Result<&Arc<Server>> {
        self.server.as_ref().ok_or(Iec61850Error::NotConnected)
    }
}

impl Default for MmsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MmsClient {
    fn drop(&mut self) {
        for (rpt_id, rcb) in self.owned.drain() {
            if rcb.is_enabled() {
                rcb.disable(self.id).ok();
            }
            rcb.release(self.id).ok();
            debug!(sink = %self.id, rcb = %rpt_id, "released on drop");
        }
    }
}
