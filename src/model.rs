//! Data model tree nodes.
//!
//! The hierarchy is `Server → LogicalDevice → LogicalNode → DataObject →
//! DataAttribute`. Structure is fixed once [`Server::build`] returns; only
//! attribute values, qualities and the datasets/RCBs hanging off logical
//! nodes change afterwards. Every node stores its own full reference, so no
//! child ever needs a pointer back to its parent.
//!
//! [`Server::build`]: crate::Server::build

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::dataset::Dataset;
use crate::error::{Iec61850Error, Result};
use crate::rcb::ReportControlBlock;
use crate::types::{
    DataValue, ObjectReference, Quality, ReportEntry, TriggerReason, ValueKind,
};

/// Insertion-ordered children with unique names.
#[derive(Debug)]
pub(crate) struct Children<T> {
    names: Vec<String>,
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Children<T> {
    pub(crate) fn new() -> Self {
        Self {
            names: Vec::new(),
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a child, failing if the name is taken. `context` names the parent
    /// for the error message.
    pub(crate) fn insert(&mut self, name: &str, item: T, context: &str) -> Result<()> {
        if self.index.contains_key(name) {
            return Err(Iec61850Error::duplicate(format!("{} in {}", name, context)));
        }
        self.index.insert(name.to_string(), self.items.len());
        self.names.push(name.to_string());
        self.items.push(item);
        Ok(())
    }

    pub(crate) fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&i| &self.items[i])
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.names.clone()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

/// Logical device.
#[derive(Debug)]
pub struct LogicalDevice {
    pub(crate) name: String,
    pub(crate) nodes: Children<LogicalNode>,
}

impl LogicalDevice {
    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a logical node by name.
    pub fn node(&self, name: &str) -> Option<&LogicalNode> {
        self.nodes.get(name)
    }

    /// Logical node names in model order.
    pub fn node_names(&self) -> Vec<String> {
        self.nodes.names()
    }
}

/// Logical node. Owns data objects plus the datasets and report control
/// blocks configured on it.
#[derive(Debug)]
pub struct LogicalNode {
    pub(crate) name: String,
    pub(crate) reference: ObjectReference,
    pub(crate) objects: Children<DataObject>,
    pub(crate) datasets: RwLock<HashMap<String, Arc<Dataset>>>,
    pub(crate) report_controls: RwLock<HashMap<String, Arc<ReportControlBlock>>>,
}

impl LogicalNode {
    pub(crate) fn new(device: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            reference: ObjectReference::node(device, name),
            objects: Children::new(),
            datasets: RwLock::new(HashMap::new()),
            report_controls: RwLock::new(HashMap::new()),
        }
    }

    /// Node name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full reference (`LD/LN`).
    pub fn reference(&self) -> &ObjectReference {
        &self.reference
    }

    /// Look up a data object by name.
    pub fn object(&self, name: &str) -> Option<&DataObject> {
        self.objects.get(name)
    }

    /// Data object names in model order.
    pub fn object_names(&self) -> Vec<String> {
        self.objects.names()
    }

    /// Look up a dataset by ID.
    pub fn dataset(&self, id: &str) -> Option<Arc<Dataset>> {
        self.datasets.read().get(id).cloned()
    }

    /// Dataset IDs, sorted.
    pub fn dataset_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.datasets.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Look up a report control block by its name on this node.
    pub fn report_control(&self, name: &str) -> Option<Arc<ReportControlBlock>> {
        self.report_controls.read().get(name).cloned()
    }

    /// Report control block names, sorted.
    pub fn report_control_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.report_controls.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Data object.
#[derive(Debug)]
pub struct DataObject {
    pub(crate) name: String,
    pub(crate) attributes: Children<Arc<DataAttribute>>,
}

impl DataObject {
    /// Object name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a data attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Arc<DataAttribute>> {
        self.attributes.get(name)
    }

    /// Data attribute names in model order.
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.names()
    }
}

/// Point-in-time view of a data attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSnapshot {
    pub reference: ObjectReference,
    pub value: DataValue,
    pub quality: Quality,
    /// Time of the last value or quality change (build time initially)
    pub timestamp: SystemTime,
}

#[derive(Debug)]
struct AttributeCell {
    value: DataValue,
    quality: Quality,
    timestamp: SystemTime,
}

/// Data attribute: a typed leaf value watched by report control blocks.
///
/// The value cell lock is held while observers are notified, so reports for
/// one attribute are generated in write order.
#[derive(Debug)]
pub struct DataAttribute {
    reference: ObjectReference,
    kind: ValueKind,
    cell: Mutex<AttributeCell>,
    observers: RwLock<Vec<Weak<ReportControlBlock>>>,
}

impl DataAttribute {
    pub(crate) fn new(reference: ObjectReference, value: DataValue, quality: Quality) -> Self {
        Self {
            reference,
            kind: value.kind(),
            cell: Mutex::new(AttributeCell {
                value,
                quality,
                timestamp: SystemTime::now(),
            }),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Full reference (`LD/LN.DO.DA`).
    pub fn reference(&self) -> &ObjectReference {
        &self.reference
    }

    /// Declared value kind.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Current value.
    pub fn value(&self) -> DataValue {
        self.cell.lock().value.clone()
    }

    /// Current quality.
    pub fn quality(&self) -> Quality {
        self.cell.lock().quality
    }

    /// Value, quality and timestamp read under one lock.
    pub fn snapshot(&self) -> AttributeSnapshot {
        let cell = self.cell.lock();
        AttributeSnapshot {
            reference: self.reference.clone(),
            value: cell.value.clone(),
            quality: cell.quality,
            timestamp: cell.timestamp,
        }
    }

    /// Number of enabled RCBs currently watching this attribute.
    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Store a new value. Returns the number of reports generated.
    pub(crate) fn write(&self, value: DataValue) -> Result<usize> {
        if value.kind() != self.kind {
            return Err(Iec61850Error::TypeMismatch {
                reference: self.reference.to_string(),
                expected: self.kind,
                actual: value.kind(),
            });
        }

        let mut cell = self.cell.lock();
        if cell.value == value {
            trace!(reference = %self.reference, "unchanged value, no report");
            return Ok(0);
        }
        cell.value = value.clone();
        cell.timestamp = SystemTime::now();

        let entry = ReportEntry::new(
            self.reference.clone(),
            value,
            cell.quality,
            TriggerReason::DataChange,
        );
        Ok(self.notify_observers(&entry))
    }

    /// Store a new quality. Returns the number of reports generated.
    pub(crate) fn write_quality(&self, quality: Quality) -> usize {
        let mut cell = self.cell.lock();
        if cell.quality == quality {
            trace!(reference = %self.reference, "unchanged quality, no report");
            return 0;
        }
        cell.quality = quality;
        cell.timestamp = SystemTime::now();

        let entry = ReportEntry::new(
            self.reference.clone(),
            cell.value.clone(),
            quality,
            TriggerReason::QualityChange,
        );
        self.notify_observers(&entry)
    }

    // Observers are collected first so the list lock is not held while an
    // RCB takes its own state lock.
    fn notify_observers(&self, entry: &ReportEntry) -> usize {
        let observers: Vec<Arc<ReportControlBlock>> = self
            .observers
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();

        observers
            .iter()
            .filter(|rcb| rcb.on_trigger(entry))
            .count()
    }

    pub(crate) fn add_observer(&self, rcb: Weak<ReportControlBlock>) {
        let mut observers = self.observers.write();
        observers.retain(|w| w.strong_count() > 0);
        if !observers.iter().any(|w| w.ptr_eq(&rcb)) {
            observers.push(rcb);
        }
    }

    pub(crate) fn remove_observer(&self, rcb: &Weak<ReportControlBlock>) {
        self.observers
            .write()
            .retain(|w| w.strong_count() > 0 && !w.ptr_eq(rcb));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phs_a() -> DataAttribute {
        DataAttribute::new(
            ObjectReference::attribute("Device1", "MMXU1", "PhV", "phsA"),
            DataValue::Float(0.0),
            Quality::Good,
        )
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let mut children = Children::new();
        children.insert("MMXU1", 1, "Device1").unwrap();
        children.insert("LLN0", 2, "Device1").unwrap();
        children.insert("XCBR1", 3, "Device1").unwrap();

        assert_eq!(children.names(), vec!["MMXU1", "LLN0", "XCBR1"]);
        assert_eq!(children.get("LLN0"), Some(&2));
        assert_eq!(children.len(), 3);
    }

    #[test]
    fn test_children_reject_duplicates() {
        let mut children = Children::new();
        children.insert("PhV", 1, "Device1/MMXU1").unwrap();
        let err = children.insert("PhV", 2, "Device1/MMXU1").unwrap_err();
        assert!(matches!(err, Iec61850Error::DuplicateName(_)));
        assert_eq!(children.get("PhV"), Some(&1));
    }

    #[test]
    fn test_attribute_write() {
        let da = phs_a();
        assert_eq!(da.kind(), ValueKind::Float);

        assert_eq!(da.write(DataValue::Float(230.5)).unwrap(), 0);
        assert_eq!(da.value(), DataValue::Float(230.5));
    }

    #[test]
    fn test_attribute_type_mismatch_leaves_value() {
        let da = phs_a();
        let err = da.write(DataValue::Boolean(true)).unwrap_err();
        assert!(matches!(
            err,
            Iec61850Error::TypeMismatch {
                expected: ValueKind::Float,
                actual: ValueKind::Boolean,
                ..
            }
        ));
        assert_eq!(da.value(), DataValue::Float(0.0));
    }

    #[test]
    fn test_unchanged_write_keeps_timestamp() {
        let da = phs_a();
        da.write(DataValue::Float(1.0)).unwrap();
        let before = da.snapshot().timestamp;
        da.write(DataValue::Float(1.0)).unwrap();
        assert_eq!(da.snapshot().timestamp, before);
    }

    #[test]
    fn test_write_quality() {
        let da = phs_a();
        assert_eq!(da.write_quality(Quality::Invalid), 0);
        assert_eq!(da.quality(), Quality::Invalid);
        assert_eq!(da.value(), DataValue::Float(0.0));
    }
}
