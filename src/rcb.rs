//! Report control blocks.
//!
//! An RCB binds a dataset to a delivery queue and carries the ownership and
//! enable state:
//!
//! ```text
//!            reserve(sink)            enable(sink)
//!   Idle ───────────────▶ Idle(owned) ────────────▶ Enabled
//!    ▲                      │    ▲                     │
//!    └──────────────────────┘    └─────────────────────┘
//!          release(sink)               disable(sink)
//! ```
//!
//! Only an enabled RCB is registered as observer on its dataset's
//! attributes, so only enabled RCBs generate reports. The sequence counter
//! survives every transition for the lifetime of the RCB.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::client::SinkId;
use crate::dataset::Dataset;
use crate::error::{Iec61850Error, Result};
use crate::model::DataAttribute;
use crate::queue::{ReportInbox, ReportQueue};
use crate::types::{ObjectReference, Report, ReportEntry};

/// Enable state of an RCB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcbState {
    /// Not generating reports (owned or not)
    Idle,
    /// Registered on the dataset attributes and generating reports
    Enabled,
}

#[derive(Debug)]
struct RcbInner {
    state: RcbState,
    owner: Option<SinkId>,
    sequence: u64,
    queue: Arc<ReportQueue>,
    bound: Vec<Arc<DataAttribute>>,
}

/// Report control block.
#[derive(Debug)]
pub struct ReportControlBlock {
    name: String,
    rpt_id: String,
    node: ObjectReference,
    dataset: Arc<Dataset>,
    queue_capacity: usize,
    this: Weak<ReportControlBlock>,
    inner: Mutex<RcbInner>,
}

impl ReportControlBlock {
    pub(crate) fn new(
        node: ObjectReference,
        name: &str,
        rpt_id: &str,
        dataset: Arc<Dataset>,
        queue_capacity: usize,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            name: name.to_string(),
            rpt_id: rpt_id.to_string(),
            node,
            dataset,
            queue_capacity,
            this: this.clone(),
            inner: Mutex::new(RcbInner {
                state: RcbState::Idle,
                owner: None,
                sequence: 0,
                queue: Arc::new(ReportQueue::new(queue_capacity)),
                bound: Vec::new(),
            }),
        })
    }

    /// RCB name on its logical node.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Report ID, unique within the server.
    pub fn rpt_id(&self) -> &str {
        &self.rpt_id
    }

    /// Logical node the RCB is configured on.
    pub fn node(&self) -> &ObjectReference {
        &self.node
    }

    /// Bound dataset.
    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// Delivery queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Current enable state.
    pub fn state(&self) -> RcbState {
        self.inner.lock().state
    }

    /// Check if the RCB is enabled.
    pub fn is_enabled(&self) -> bool {
        self.state() == RcbState::Enabled
    }

    /// Current owner.
    pub fn owner(&self) -> Option<SinkId> {
        self.inner.lock().owner
    }

    /// Sequence number of the last generated report (0 before the first).
    pub fn sequence_number(&self) -> u64 {
        self.inner.lock().sequence
    }

    /// Claim the RCB for `sink`.
    ///
    /// Reserving an RCB the sink already owns is a no-op that hands out
    /// another inbox on the same queue. A fresh reservation starts a new
    /// queue, so reports left over from a previous owner are never seen.
    pub fn reserve(&self, sink: SinkId) -> Result<ReportInbox> {
        let mut inner = self.inner.lock();
        let current = inner.owner;
        match current {
            Some(owner) if owner == sink => {}
            Some(owner) => {
                return Err(Iec61850Error::Busy(format!(
                    "{} is reserved by {}",
                    self.rpt_id, owner
                )));
            }
            None => {
                inner.owner = Some(sink);
                inner.queue = Arc::new(ReportQueue::new(self.queue_capacity));
                info!(rcb = %self.rpt_id, %sink, "reserved");
            }
        }
        Ok(ReportInbox::new(self.rpt_id.clone(), inner.queue.clone()))
    }

    /// Start generating reports for the dataset attributes.
    pub fn enable(&self, sink: SinkId) -> Result<()> {
        let mut inner = self.inner.lock();
        self.check_owner(&inner, sink)?;
        if inner.state == RcbState::Enabled {
            return Err(Iec61850Error::invalid_state(format!(
                "{} is already enabled",
                self.rpt_id
            )));
        }

        let members = self.dataset.freeze();
        for da in &members {
            da.add_observer(self.this.clone());
        }
        inner.bound = members;
        inner.state = RcbState::Enabled;

        info!(
            rcb = %self.rpt_id,
            dataset = %self.dataset.reference(),
            members = inner.bound.len(),
            seq = inner.sequence,
            "enabled"
        );
        Ok(())
    }

    /// Stop generating reports. Queued reports stay deliverable.
    pub fn disable(&self, sink: SinkId) -> Result<()> {
        let mut inner = self.inner.lock();
        self.check_owner(&inner, sink)?;
        if inner.state == RcbState::Idle {
            return Err(Iec61850Error::invalid_state(format!(
                "{} is not enabled",
                self.rpt_id
            )));
        }

        for da in inner.bound.drain(..) {
            da.remove_observer(&self.this);
        }
        self.dataset.thaw();
        inner.state = RcbState::Idle;

        info!(rcb = %self.rpt_id, seq = inner.sequence, "disabled");
        Ok(())
    }

    /// Give up ownership. The RCB must be disabled first.
    ///
    /// The current queue is closed: its inbox can still drain what is
    /// queued, after which `recv` returns `None`.
    pub fn release(&self, sink: SinkId) -> Result<()> {
        let mut inner = self.inner.lock();
        self.check_owner(&inner, sink)?;
        if inner.state == RcbState::Enabled {
            return Err(Iec61850Error::invalid_state(format!(
                "{} must be disabled before release",
                self.rpt_id
            )));
        }

        inner.owner = None;
        inner.queue.close();

        info!(rcb = %self.rpt_id, %sink, "released");
        Ok(())
    }

    /// Package a triggered entry as a report. Returns `false` when the RCB
    /// is idle and nothing was generated.
    pub(crate) fn on_trigger(&self, entry: &ReportEntry) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != RcbState::Enabled {
            return false;
        }

        inner.sequence += 1;
        let report = Report::new(
            self.rpt_id.clone(),
            inner.sequence,
            self.dataset.reference(),
            entry.clone(),
        );
        debug!(
            rcb = %self.rpt_id,
            seq = inner.sequence,
            reference = %entry.reference,
            reason = %entry.reason,
            "report queued"
        );

        if let Some(evicted) = inner.queue.push(report) {
            warn!(
                rcb = %self.rpt_id,
                evicted_seq = evicted.sequence_number,
                capacity = self.queue_capacity,
                "report queue full, oldest report dropped"
            );
        }
        true
    }

    fn check_owner(&self, inner: &RcbInner, sink: SinkId) -> Result<()> {
        match inner.owner {
            Some(owner) if owner == sink => Ok(()),
            Some(owner) => Err(Iec61850Error::Busy(format!(
                "{} is reserved by {}",
                self.rpt_id, owner
            ))),
            None => Err(Iec61850Error::invalid_state(format!(
                "{} is not reserved",
                self.rpt_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataValue, Quality};

    fn setup() -> (Arc<DataAttribute>, Arc<ReportControlBlock>) {
        let da = Arc::new(DataAttribute::new(
            ObjectReference::attribute("Device1", "MMXU1", "PhV", "phsA"),
            DataValue::Float(0.0),
            Quality::Good,
        ));
        let node = ObjectReference::node("Device1", "MMXU1");
        let ds = Arc::new(Dataset::new(&node, "ds1", vec![da.clone()]).unwrap());
        let rcb = ReportControlBlock::new(node, "rcb1", "rcb1", ds, 4);
        (da, rcb)
    }

    #[test]
    fn test_initial_state() {
        let (_, rcb) = setup();
        assert_eq!(rcb.state(), RcbState::Idle);
        assert_eq!(rcb.owner(), None);
        assert_eq!(rcb.sequence_number(), 0);
    }

    #[test]
    fn test_enable_requires_reservation() {
        let (_, rcb) = setup();
        let sink = SinkId::next();
        let err = rcb.enable(sink).unwrap_err();
        assert!(matches!(err, Iec61850Error::InvalidState(_)));
        assert_eq!(rcb.state(), RcbState::Idle);
    }

    #[test]
    fn test_second_reserve_is_busy() {
        let (_, rcb) = setup();
        let a = SinkId::next();
        let b = SinkId::next();

        rcb.reserve(a).unwrap();
        rcb.reserve(a).unwrap();
        assert!(matches!(rcb.reserve(b), Err(Iec61850Error::Busy(_))));
        assert!(matches!(rcb.enable(b), Err(Iec61850Error::Busy(_))));
        assert!(matches!(rcb.release(b), Err(Iec61850Error::Busy(_))));

        rcb.release(a).unwrap();
        rcb.reserve(b).unwrap();
        assert_eq!(rcb.owner(), Some(b));
    }

    #[test]
    fn test_enable_binds_observer() {
        let (da, rcb) = setup();
        let sink = SinkId::next();
        rcb.reserve(sink).unwrap();

        assert_eq!(da.observer_count(), 0);
        rcb.enable(sink).unwrap();
        assert_eq!(da.observer_count(), 1);
        assert!(rcb.dataset().is_frozen());
        assert!(matches!(rcb.enable(sink), Err(Iec61850Error::InvalidState(_))));

        rcb.disable(sink).unwrap();
        assert_eq!(da.observer_count(), 0);
        assert!(!rcb.dataset().is_frozen());
        assert!(matches!(rcb.disable(sink), Err(Iec61850Error::InvalidState(_))));
    }

    #[test]
    fn test_release_while_enabled_fails() {
        let (_, rcb) = setup();
        let sink = SinkId::next();
        rcb.reserve(sink).unwrap();
        rcb.enable(sink).unwrap();

        let err = rcb.release(sink).unwrap_err();
        assert!(matches!(err, Iec61850Error::InvalidState(_)));
        assert_eq!(rcb.owner(), Some(sink));
        assert!(rcb.is_enabled());
    }

    #[test]
    fn test_write_generates_report_only_when_enabled() {
        let (da, rcb) = setup();
        let sink = SinkId::next();
        let mut inbox = rcb.reserve(sink).unwrap();

        assert_eq!(da.write(DataValue::Float(1.0)).unwrap(), 0);
        assert!(inbox.try_recv().is_none());

        rcb.enable(sink).unwrap();
        assert_eq!(da.write(DataValue::Float(2.0)).unwrap(), 1);
        let report = inbox.try_recv().unwrap();
        assert_eq!(report.sequence_number, 1);
        assert_eq!(report.rpt_id, "rcb1");
        assert_eq!(report.dataset, "Device1/MMXU1$ds1");
        assert_eq!(report.first_entry().value, DataValue::Float(2.0));
    }

    #[test]
    fn test_disable_keeps_queued_reports() {
        let (da, rcb) = setup();
        let sink = SinkId::next();
        let mut inbox = rcb.reserve(sink).unwrap();
        rcb.enable(sink).unwrap();

        da.write(DataValue::Float(1.0)).unwrap();
        rcb.disable(sink).unwrap();
        da.write(DataValue::Float(2.0)).unwrap();

        let reports = inbox.drain();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].first_entry().value, DataValue::Float(1.0));
    }

    #[test]
    fn test_sequence_survives_owner_change() {
        let (da, rcb) = setup();
        let a = SinkId::next();
        let b = SinkId::next();

        let mut inbox_a = rcb.reserve(a).unwrap();
        rcb.enable(a).unwrap();
        da.write(DataValue::Float(1.0)).unwrap();
        rcb.disable(a).unwrap();
        rcb.release(a).unwrap();

        let mut inbox_b = rcb.reserve(b).unwrap();
        rcb.enable(b).unwrap();
        da.write(DataValue::Float(2.0)).unwrap();

        assert_eq!(inbox_a.try_recv().unwrap().sequence_number, 1);
        assert!(inbox_a.try_recv().is_none());
        assert!(inbox_a.is_closed());

        let report = inbox_b.try_recv().unwrap();
        assert_eq!(report.sequence_number, 2);
        assert!(inbox_b.try_recv().is_none());
    }

    #[test]
    fn test_quality_change_report() {
        let (da, rcb) = setup();
        let sink = SinkId::next();
        let mut inbox = rcb.reserve(sink).unwrap();
        rcb.enable(sink).unwrap();

        assert_eq!(da.write_quality(Quality::Invalid), 1);
        assert_eq!(da.write_quality(Quality::Invalid), 0);

        let report = inbox.try_recv().unwrap();
        assert_eq!(report.first_entry().reason, crate::types::TriggerReason::QualityChange);
        assert_eq!(report.first_entry().quality, Quality::Invalid);
        assert!(inbox.try_recv().is_none());
    }
}
