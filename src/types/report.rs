//! Report payload types.

use std::time::SystemTime;

use super::{DataValue, ObjectReference, Quality};

/// Reason for inclusion of a report entry (TrgOp).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerReason {
    /// Value of the attribute changed (dchg)
    DataChange,
    /// Quality of the attribute changed (qchg)
    QualityChange,
}

impl TriggerReason {
    /// Short IEC 61850 mnemonic.
    #[inline]
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            Self::DataChange => "dchg",
            Self::QualityChange => "qchg",
        }
    }
}

impl std::fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataChange => write!(f, "data-change"),
            Self::QualityChange => write!(f, "quality-change"),
        }
    }
}

/// One changed attribute inside a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    /// Attribute reference
    pub reference: ObjectReference,
    /// Value at the time of the change
    pub value: DataValue,
    /// Quality at the time of the change
    pub quality: Quality,
    /// Why this entry was reported
    pub reason: TriggerReason,
}

impl ReportEntry {
    /// Create a new entry.
    pub fn new(
        reference: ObjectReference,
        value: DataValue,
        quality: Quality,
        reason: TriggerReason,
    ) -> Self {
        Self {
            reference,
            value,
            quality,
            reason,
        }
    }
}

/// A report delivered by a report control block.
///
/// Sequence numbers start at 1 and are strictly increasing per RCB. A jump
/// of more than one between two consecutive reports means the delivery
/// queue overflowed and older reports were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Report ID of the originating RCB
    pub rpt_id: String,
    /// Sequence number assigned by the RCB
    pub sequence_number: u64,
    /// Time the report was generated
    pub timestamp: SystemTime,
    /// Dataset the entries belong to
    pub dataset: String,
    entries: Vec<ReportEntry>,
}

impl Report {
    /// Create a single-entry report.
    pub fn new(
        rpt_id: impl Into<String>,
        sequence_number: u64,
        dataset: impl Into<String>,
        entry: ReportEntry,
    ) -> Self {
        Self {
            rpt_id: rpt_id.into(),
            sequence_number,
            timestamp: SystemTime::now(),
            dataset: dataset.into(),
            entries: vec![entry],
        }
    }

    /// Report entries in dataset order. Never empty.
    #[inline]
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// First entry of the report.
    #[inline]
    pub fn first_entry(&self) -> &ReportEntry {
        &self.entries[0]
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} #{}]", self.rpt_id, self.sequence_number)?;
        for entry in &self.entries {
            write!(
                f,
                " {}={} ({}, {})",
                entry.reference, entry.value, entry.quality, entry.reason
            )?;
        }
        Ok(())
    }
}
