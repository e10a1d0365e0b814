//! # voltage_iec61850
//!
//! IEC 61850 information model and report control block emulation for Rust.
//!
//! This crate models an IED the way MMS services see it: a strongly
//! addressed data tree that can be browsed and read, and report control
//! blocks that push value changes, in order, to the clients that own them.
//! Server and client are in-process roles connected by an explicit API;
//! there is no network transport.
//!
//! ## Features
//!
//! - **Addressed model**: `LD/LN.DO.DA` references, typed values, quality
//! - **Change-triggered reporting**: `data-change` and `quality-change`
//! - **Ownership rules**: reserve, enable, disable, release per RCB
//! - **Non-blocking delivery**: bounded drop-oldest queues, loss visible as
//!   sequence number gaps
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use voltage_iec61850::{
//!     DeviceDescription, MmsClient, ModelDescription, NodeDescription,
//!     ObjectDescription, ReportControlConfig, Server, ServerConfig,
//! };
//!
//! # async fn run() -> voltage_iec61850::Result<()> {
//! let model = ModelDescription::new("IED1").device(
//!     DeviceDescription::new("Device1").node(
//!         NodeDescription::new("MMXU1")
//!             .object(ObjectDescription::new("PhV").attribute("phsA", 0.0)),
//!     ),
//! );
//! let server = Server::build(&model, ServerConfig::default())?;
//! server.create_dataset("Device1/MMXU1", "ds1", ["Device1/MMXU1.PhV.phsA"])?;
//! server.create_report_control("Device1/MMXU1", ReportControlConfig::new("rcb1", "ds1"))?;
//!
//! let mut client = MmsClient::new();
//! client.connect(server.clone())?;
//! let mut inbox = client.subscribe("rcb1")?;
//!
//! server.write("Device1/MMXU1.PhV.phsA", 230.5)?;
//! if let Some(report) = inbox.recv().await {
//!     println!("{}", report);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Reporting Overview
//!
//! ```text
//! write(path, value)
//!   └─ DataAttribute: store, compare with previous value
//!        └─ each enabled RCB observing the attribute
//!             └─ Report { rpt_id, seq = ++counter, [entry] } ─▶ queue ─▶ ReportInbox
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod client;
pub mod config;
pub mod dataset;
pub mod description;
pub mod error;
pub mod model;
pub mod queue;
pub mod rcb;
pub mod server;
pub mod types;

// Re-export main types
pub use client::{ConnectionState, MmsClient, SinkId};
pub use config::{ReportControlConfig, ServerConfig, DEFAULT_REPORT_QUEUE_CAPACITY};
pub use dataset::Dataset;
pub use description::{
    AttributeDescription, DeviceDescription, ModelDescription, NodeDescription,
    ObjectDescription,
};
pub use error::{Iec61850Error, Result};
pub use model::{AttributeSnapshot, DataAttribute, DataObject, LogicalDevice, LogicalNode};
pub use queue::ReportInbox;
pub use rcb::{RcbState, ReportControlBlock};
pub use server::Server;
pub use types::*;
