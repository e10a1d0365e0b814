//! IEC 61850 type definitions.
//!
//! This module contains the value-level types shared by the model tree,
//! the report control blocks and the client role:
//!
//! - `ObjectReference` - `LD/LN.DO.DA` addressing
//! - `DataValue` / `ValueKind` - typed attribute values
//! - `Quality` - quality descriptor bit string
//! - `Report` / `ReportEntry` / `TriggerReason` - report payloads

mod quality;
mod reference;
mod report;
mod value;

pub use quality::*;
pub use reference::*;
pub use report::*;
pub use value::*;
