//! Datasets: named, ordered lists of data attribute references.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Iec61850Error, Result};
use crate::model::DataAttribute;
use crate::types::ObjectReference;

/// Separator between a logical node reference and a dataset ID.
pub const DATASET_SEPARATOR: char = '$';

#[derive(Debug)]
struct DatasetInner {
    members: Vec<Arc<DataAttribute>>,
    /// Number of enabled RCBs bound to this dataset.
    enabled_bindings: usize,
}

/// Dataset owned by a logical node.
///
/// Members are resolved attributes, kept in creation order. While at least
/// one enabled RCB is bound to the dataset its member list is frozen.
#[derive(Debug)]
pub struct Dataset {
    id: String,
    reference: String,
    inner: RwLock<DatasetInner>,
}

impl Dataset {
    pub(crate) fn new(
        node: &ObjectReference,
        id: &str,
        members: Vec<Arc<DataAttribute>>,
    ) -> Result<Self> {
        let reference = format!("{}{}{}", node, DATASET_SEPARATOR, id);
        check_members(&reference, &members)?;
        Ok(Self {
            id: id.to_string(),
            reference,
            inner: RwLock::new(DatasetInner {
                members,
                enabled_bindings: 0,
            }),
        })
    }

    /// Dataset ID, unique within its logical node.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Full dataset reference (`LD/LN$id`).
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Member references in dataset order.
    pub fn members(&self) -> Vec<ObjectReference> {
        self.inner
            .read()
            .members
            .iter()
            .map(|da| da.reference().clone())
            .collect()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.inner.read().members.len()
    }

    /// Check if the dataset has no members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if an enabled RCB currently pins the member list.
    pub fn is_frozen(&self) -> bool {
        self.inner.read().enabled_bindings > 0
    }

    pub(crate) fn replace_members(&self, members: Vec<Arc<DataAttribute>>) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.enabled_bindings > 0 {
            return Err(Iec61850Error::FrozenDataset(self.reference.clone()));
        }
        check_members(&self.reference, &members)?;
        inner.members = members;
        Ok(())
    }

    /// Pin the member list for an enabling RCB and hand out the members.
    pub(crate) fn freeze(&self) -> Vec<Arc<DataAttribute>> {
        let mut inner = self.inner.write();
        inner.enabled_bindings += 1;
        inner.members.clone()
    }

    pub(crate) fn thaw(&self) {
        let mut inner = self.inner.write();
        inner.enabled_bindings = inner.enabled_bindings.saturating_sub(1);
    }
}

fn check_members(reference: &str, members: &[Arc<DataAttribute>]) -> Result<()> {
    if members.is_empty() {
        return Err(Iec61850Error::invalid_dataset(format!(
            "{} has no members",
            reference
        )));
    }

    let mut seen = HashSet::with_capacity(members.len());
    for da in members {
        if !seen.insert(da.reference()) {
            return Err(Iec61850Error::invalid_dataset(format!(
                "{} lists {} more than once",
                reference,
                da.reference()
            )));
        }
    }
    Ok(())
}
