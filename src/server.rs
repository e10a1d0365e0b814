//! Server: root of one simulated IED namespace.
//!
//! The server owns the model tree and an index of every report control
//! block by report ID. All operations take `&self`; the structure is
//! immutable after [`Server::build`], attribute values sit behind per
//! attribute locks and each RCB serializes its own transitions, so a
//! `Arc<Server>` can be shared freely between producers and sinks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::{validate_queue_capacity, ReportControlConfig, ServerConfig};
use crate::dataset::Dataset;
use crate::description::ModelDescription;
use crate::error::{Iec61850Error, Result};
use crate::model::{
    AttributeSnapshot, Children, DataAttribute, DataObject, LogicalDevice, LogicalNode,
};
use crate::rcb::ReportControlBlock;
use crate::types::{validate_name, DataValue, ObjectReference, Quality, ReferenceLevel};

/// Simulated IED server.
#[derive(Debug)]
pub struct Server {
    name: String,
    config: ServerConfig,
    devices: Children<LogicalDevice>,
    report_index: RwLock<HashMap<String, Arc<ReportControlBlock>>>,
}

impl Server {
    /// Build the fixed model tree from a description.
    ///
    /// Fails with `DuplicateName` when two siblings share a name and with
    /// `InvalidReference` when a name cannot appear in an object reference.
    pub fn build(description: &ModelDescription, config: ServerConfig) -> Result<Arc<Self>> {
        config.validate()?;

        let mut devices = Children::new();
        let mut attribute_count = 0usize;

        for device_desc in &description.devices {
            let ld_name = device_desc.name.as_str();
            validate_name(ld_name, &description.name, false)?;
            let mut device = LogicalDevice {
                name: ld_name.to_string(),
                nodes: Children::new(),
            };

            for node_desc in &device_desc.nodes {
                validate_name(&node_desc.name, ld_name, false)?;
                let mut node = LogicalNode::new(ld_name, &node_desc.name);
                let node_ref = node.reference.to_string();

                for object_desc in &node_desc.objects {
                    validate_name(&object_desc.name, &node_ref, false)?;
                    let mut object = DataObject {
                        name: object_desc.name.clone(),
                        attributes: Children::new(),
                    };
                    let object_ref = format!("{}.{}", node_ref, object_desc.name);

                    for attr_desc in &object_desc.attributes {
                        validate_name(&attr_desc.name, &object_ref, true)?;
                        let reference = ObjectReference::attribute(
                            ld_name,
                            &node_desc.name,
                            &object_desc.name,
                            &attr_desc.name,
                        );
                        let attribute = DataAttribute::new(
                            reference,
                            attr_desc.value.clone(),
                            attr_desc.quality,
                        );
                        object
                            .attributes
                            .insert(&attr_desc.name, Arc::new(attribute), &object_ref)?;
                        attribute_count += 1;
                    }

                    node.objects.insert(&object_desc.name, object, &node_ref)?;
                }

                device.nodes.insert(&node_desc.name, node, ld_name)?;
            }

            devices.insert(ld_name, device, &description.name)?;
        }

        info!(
            server = %description.name,
            devices = devices.len(),
            attributes = attribute_count,
            "model built"
        );

        Ok(Arc::new(Self {
            name: description.name.clone(),
            config,
            devices,
            report_index: RwLock::new(HashMap::new()),
        }))
    }

    /// Server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Look up a logical device by name.
    pub fn device(&self, name: &str) -> Option<&LogicalDevice> {
        self.devices.get(name)
    }

    /// Resolve a data attribute reference.
    pub fn resolve(&self, path: &str) -> Result<Arc<DataAttribute>> {
        let reference = ObjectReference::parse_attribute(path)?;
        let object = self.find_object(&reference, path)?;
        reference
            .attribute_name()
            .and_then(|name| object.attribute(name))
            .cloned()
            .ok_or_else(|| Iec61850Error::not_found(path))
    }

    /// Resolve a logical node reference (`LD/LN`).
    pub fn logical_node(&self, path: &str) -> Result<&LogicalNode> {
        let reference = ObjectReference::parse_node(path)?;
        self.find_node(&reference, path)
    }

    /// Current value of a data attribute. Never generates reports.
    pub fn read(&self, path: &str) -> Result<DataValue> {
        Ok(self.resolve(path)?.value())
    }

    /// Value, quality and timestamp of a data attribute.
    pub fn read_attribute(&self, path: &str) -> Result<AttributeSnapshot> {
        Ok(self.resolve(path)?.snapshot())
    }

    /// Write a new value.
    ///
    /// The value kind must match the attribute's declared kind. If the value
    /// differs from the current one, every enabled RCB watching the
    /// attribute queues one `data-change` report. Writing the current value
    /// again succeeds without reporting.
    pub fn write(&self, path: &str, value: impl Into<DataValue>) -> Result<()> {
        let attribute = self.resolve(path)?;
        let reports = attribute.write(value.into())?;
        debug!(reference = path, reports, "value written");
        Ok(())
    }

    /// Write a new quality, reporting `quality-change` if it differs.
    pub fn write_quality(&self, path: &str, quality: Quality) -> Result<()> {
        let attribute = self.resolve(path)?;
        let reports = attribute.write_quality(quality);
        debug!(reference = path, %quality, reports, "quality written");
        Ok(())
    }

    /// Names of the immediate children of `path`, in model order.
    ///
    /// An empty path lists logical devices; `LD` lists logical nodes,
    /// `LD/LN` data objects and `LD/LN.DO` data attributes. A data attribute
    /// has no children.
    pub fn directory(&self, path: &str) -> Result<Vec<String>> {
        if path.is_empty() {
            return Ok(self.devices.names());
        }

        let reference = ObjectReference::parse(path)?;
        match reference.level() {
            ReferenceLevel::Device => self
                .devices
                .get(reference.device_name())
                .map(LogicalDevice::node_names)
                .ok_or_else(|| Iec61850Error::not_found(path)),
            ReferenceLevel::Node => Ok(self.find_node(&reference, path)?.object_names()),
            ReferenceLevel::Object => Ok(self.find_object(&reference, path)?.attribute_names()),
            ReferenceLevel::Attribute => self.resolve(path).map(|_| Vec::new()),
        }
    }

    /// Snapshot of every data attribute in model order.
    pub fn discover(&self) -> Vec<AttributeSnapshot> {
        self.devices
            .iter()
            .flat_map(|device| device.nodes.iter())
            .flat_map(|node| node.objects.iter())
            .flat_map(|object| object.attributes.iter())
            .map(|attribute| attribute.snapshot())
            .collect()
    }

    /// Create a dataset on logical node `node`.
    ///
    /// Every member must resolve to a data attribute; members may live on
    /// any logical node of the server.
    pub fn create_dataset<I, S>(&self, node: &str, id: &str, members: I) -> Result<Arc<Dataset>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ln = self.logical_node(node)?;
        validate_name(id, node, false)?;
        let attributes = self.resolve_members(members)?;

        let mut datasets = ln.datasets.write();
        if datasets.contains_key(id) {
            return Err(Iec61850Error::duplicate(format!("dataset {} in {}", id, node)));
        }
        let dataset = Arc::new(Dataset::new(&ln.reference, id, attributes)?);
        datasets.insert(id.to_string(), dataset.clone());

        info!(dataset = %dataset.reference(), members = dataset.len(), "dataset created");
        Ok(dataset)
    }

    /// Look up a dataset on logical node `node`.
    pub fn dataset(&self, node: &str, id: &str) -> Result<Arc<Dataset>> {
        self.logical_node(node)?
            .dataset(id)
            .ok_or_else(|| Iec61850Error::not_found(format!("dataset {} in {}", id, node)))
    }

    /// Replace the member list of a dataset.
    ///
    /// Fails with `FrozenDataset` while an enabled RCB is bound to it.
    pub fn set_dataset_members<I, S>(&self, node: &str, id: &str, members: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dataset = self.dataset(node, id)?;
        let attributes = self.resolve_members(members)?;
        dataset.replace_members(attributes)?;
        info!(dataset = %dataset.reference(), members = dataset.len(), "dataset members replaced");
        Ok(())
    }

    /// Create a report control block on logical node `node`.
    pub fn create_report_control(
        &self,
        node: &str,
        config: ReportControlConfig,
    ) -> Result<Arc<ReportControlBlock>> {
        let ln = self.logical_node(node)?;
        validate_name(&config.name, node, false)?;
        let rpt_id = config.effective_rpt_id().to_string();
        if rpt_id.is_empty() {
            return Err(Iec61850Error::invalid_reference("empty report ID"));
        }
        let capacity = config
            .queue_capacity
            .unwrap_or(self.config.report_queue_capacity);
        validate_queue_capacity(capacity)?;

        let dataset = ln.dataset(&config.dataset).ok_or_else(|| {
            Iec61850Error::not_found(format!("dataset {} in {}", config.dataset, node))
        })?;

        let mut index = self.report_index.write();
        let mut controls = ln.report_controls.write();
        if controls.contains_key(&config.name) {
            return Err(Iec61850Error::duplicate(format!(
                "report control {} in {}",
                config.name, node
            )));
        }
        if index.contains_key(&rpt_id) {
            return Err(Iec61850Error::duplicate(format!("report ID {}", rpt_id)));
        }

        let rcb = ReportControlBlock::new(
            ln.reference.clone(),
            &config.name,
            &rpt_id,
            dataset,
            capacity,
        );
        controls.insert(config.name.clone(), rcb.clone());
        index.insert(rpt_id.clone(), rcb.clone());

        info!(
            rcb = %rpt_id,
            node,
            dataset = %rcb.dataset().reference(),
            capacity,
            "report control created"
        );
        Ok(rcb)
    }

    /// Look up a report control block by report ID.
    pub fn report_control(&self, rpt_id: &str) -> Result<Arc<ReportControlBlock>> {
        self.report_index
            .read()
            .get(rpt_id)
            .cloned()
            .ok_or_else(|| Iec61850Error::not_found(format!("report control {}", rpt_id)))
    }

    /// All report IDs, sorted.
    pub fn report_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.report_index.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn resolve_members<I, S>(&self, members: I) -> Result<Vec<Arc<DataAttribute>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        members
            .into_iter()
            .map(|path| self.resolve(path.as_ref()))
            .collect()
    }

    fn find_node(&self, reference: &ObjectReference, path: &str) -> Result<&LogicalNode> {
        let device = self
            .devices
            .get(reference.device_name())
            .ok_or_else(|| Iec61850Error::not_found(path))?;
        reference
            .node_name()
            .and_then(|name| device.node(name))
            .ok_or_else(|| Iec61850Error::not_found(path))
    }

    fn find_object(&self, reference: &ObjectReference, path: &str) -> Result<&DataObject> {
        let node = self.find_node(reference, path)?;
        reference
            .object_name()
            .and_then(|name| node.object(name))
            .ok_or_else(|| Iec61850Error::not_found(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::{DeviceDescription, NodeDescription, ObjectDescription};
    use crate::types::ValueKind;

    const PHS_A: &str = "Device1/MMXU1.PhV.phsA";

    fn description() -> ModelDescription {
        ModelDescription::new("IED1")
            .device(
                DeviceDescription::new("Device1")
                    .node(
                        NodeDescription::new("MMXU1")
                            .object(
                                ObjectDescription::new("PhV")
                                    .attribute("phsA", 0.0)
                                    .attribute("phsB", 0.0),
                            )
                            .object(ObjectDescription::new("TotW").attribute("mag.f", 0.0)),
                    )
                    .node(
                        NodeDescription::new("XCBR1")
                            .object(ObjectDescription::new("Pos").attribute("stVal", false)),
                    ),
            )
            .device(DeviceDescription::new("Device2"))
    }

    fn server() -> Arc<Server> {
        Server::build(&description(), ServerConfig::default()).unwrap()
    }

    #[test]
    fn test_build_rejects_duplicates() {
        let desc = ModelDescription::new("IED1")
            .device(DeviceDescription::new("Device1"))
            .device(DeviceDescription::new("Device1"));
        assert!(matches!(
            Server::build(&desc, ServerConfig::default()),
            Err(Iec61850Error::DuplicateName(_))
        ));

        let desc = ModelDescription::new("IED1").device(
            DeviceDescription::new("Device1").node(
                NodeDescription::new("MMXU1").object(
                    ObjectDescription::new("PhV")
                        .attribute("phsA", 0.0)
                        .attribute("phsA", 1.0),
                ),
            ),
        );
        assert!(matches!(
            Server::build(&desc, ServerConfig::default()),
            Err(Iec61850Error::DuplicateName(_))
        ));
    }

    #[test]
    fn test_build_rejects_illegal_names() {
        let desc = ModelDescription::new("IED1").device(
            DeviceDescription::new("Device1").node(NodeDescription::new("MM.XU1")),
        );
        assert!(matches!(
            Server::build(&desc, ServerConfig::default()),
            Err(Iec61850Error::InvalidReference(_))
        ));
    }

    #[test]
    fn test_build_rejects_bad_config() {
        let config = ServerConfig::new().report_queue_capacity(0);
        assert!(matches!(
            Server::build(&description(), config),
            Err(Iec61850Error::Config(_))
        ));
    }

    #[test]
    fn test_resolve() {
        let server = server();
        let da = server.resolve(PHS_A).unwrap();
        assert_eq!(da.reference().to_string(), PHS_A);
        assert_eq!(da.kind(), ValueKind::Float);

        let da = server.resolve("Device1/MMXU1.TotW.mag.f").unwrap();
        assert_eq!(da.reference().attribute_name(), Some("mag.f"));

        for missing in [
            "Device9/MMXU1.PhV.phsA",
            "Device1/MMXU9.PhV.phsA",
            "Device1/MMXU1.PhW.phsA",
            "Device1/MMXU1.PhV.phsZ",
        ] {
            assert!(
                matches!(server.resolve(missing), Err(Iec61850Error::NotFound(_))),
                "{}",
                missing
            );
        }
    }

    #[test]
    fn test_read_after_write() {
        let server = server();
        server.write(PHS_A, 230.5).unwrap();
        assert_eq!(server.read(PHS_A).unwrap(), DataValue::Float(230.5));

        server.write("Device1/XCBR1.Pos.stVal", true).unwrap();
        assert_eq!(
            server.read("Device1/XCBR1.Pos.stVal").unwrap(),
            DataValue::Boolean(true)
        );
    }

    #[test]
    fn test_write_type_mismatch() {
        let server = server();
        let err = server.write("Device1/XCBR1.Pos.stVal", 1.0).unwrap_err();
        assert!(matches!(err, Iec61850Error::TypeMismatch { .. }));
        assert_eq!(
            server.read("Device1/XCBR1.Pos.stVal").unwrap(),
            DataValue::Boolean(false)
        );
    }

    #[test]
    fn test_write_quality() {
        let server = server();
        server.write_quality(PHS_A, Quality::Questionable).unwrap();
        let snapshot = server.read_attribute(PHS_A).unwrap();
        assert_eq!(snapshot.quality, Quality::Questionable);
        assert_eq!(snapshot.value, DataValue::Float(0.0));
    }

    #[test]
    fn test_directory() {
        let server = server();
        assert_eq!(server.directory("").unwrap(), vec!["Device1", "Device2"]);
        assert_eq!(server.directory("Device1").unwrap(), vec!["MMXU1", "XCBR1"]);
        assert!(server.directory("Device2").unwrap().is_empty());
        assert_eq!(
            server.directory("Device1/MMXU1").unwrap(),
            vec!["PhV", "TotW"]
        );
        assert_eq!(
            server.directory("Device1/MMXU1.PhV").unwrap(),
            vec!["phsA", "phsB"]
        );
        assert!(server.directory(PHS_A).unwrap().is_empty());

        assert!(matches!(
            server.directory("Device9"),
            Err(Iec61850Error::NotFound(_))
        ));
        assert!(matches!(
            server.directory("Device1/MMXU9"),
            Err(Iec61850Error::NotFound(_))
        ));
    }

    #[test]
    fn test_discover() {
        let server = server();
        let refs: Vec<String> = server
            .discover()
            .iter()
            .map(|s| s.reference.to_string())
            .collect();
        assert_eq!(
            refs,
            vec![
                "Device1/MMXU1.PhV.phsA",
                "Device1/MMXU1.PhV.phsB",
                "Device1/MMXU1.TotW.mag.f",
                "Device1/XCBR1.Pos.stVal",
            ]
        );
    }

    #[test]
    fn test_create_dataset() {
        let server = server();
        let ds = server
            .create_dataset("Device1/MMXU1", "ds1", [PHS_A, "Device1/XCBR1.Pos.stVal"])
            .unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(
            server.logical_node("Device1/MMXU1").unwrap().dataset_ids(),
            vec!["ds1"]
        );

        assert!(matches!(
            server.create_dataset("Device1/MMXU1", "ds1", [PHS_A]),
            Err(Iec61850Error::DuplicateName(_))
        ));
        assert!(matches!(
            server.create_dataset("Device1/MMXU1", "ds2", [PHS_A, PHS_A]),
            Err(Iec61850Error::InvalidDataset(_))
        ));
        assert!(matches!(
            server.create_dataset("Device1/MMXU1", "ds3", ["Device1/MMXU1.PhV.phsZ"]),
            Err(Iec61850Error::NotFound(_))
        ));
        assert!(matches!(
            server.create_dataset("Device1/MMXU9", "ds4", [PHS_A]),
            Err(Iec61850Error::NotFound(_))
        ));
        assert!(server.dataset("Device1/MMXU1", "ds2").is_err());
    }

    #[test]
    fn test_create_report_control() {
        let server = server();
        server
            .create_dataset("Device1/MMXU1", "ds1", [PHS_A])
            .unwrap();

        let rcb = server
            .create_report_control(
                "Device1/MMXU1",
                ReportControlConfig::new("urcb01", "ds1")
                    .rpt_id("IED1/Device1/MMXU1$RP$urcb01")
                    .queue_capacity(8),
            )
            .unwrap();
        assert_eq!(rcb.queue_capacity(), 8);
        assert_eq!(rcb.name(), "urcb01");
        assert!(Arc::ptr_eq(
            &server.report_control("IED1/Device1/MMXU1$RP$urcb01").unwrap(),
            &rcb
        ));

        let rcb2 = server
            .create_report_control("Device1/MMXU1", ReportControlConfig::new("urcb02", "ds1"))
            .unwrap();
        assert_eq!(rcb2.rpt_id(), "urcb02");
        assert_eq!(rcb2.queue_capacity(), 64);

        assert!(matches!(
            server.create_report_control("Device1/MMXU1", ReportControlConfig::new("urcb01", "ds1")),
            Err(Iec61850Error::DuplicateName(_))
        ));
        assert!(matches!(
            server.create_report_control(
                "Device1/XCBR1",
                ReportControlConfig::new("brcb", "ds1").rpt_id("urcb02")
            ),
            Err(Iec61850Error::NotFound(_))
        ));
        assert!(matches!(
            server.create_report_control(
                "Device1/MMXU1",
                ReportControlConfig::new("urcb03", "ds1").queue_capacity(0)
            ),
            Err(Iec61850Error::Config(_))
        ));
        assert!(matches!(
            server.report_control("missing"),
            Err(Iec61850Error::NotFound(_))
        ));
        assert_eq!(
            server.report_ids(),
            vec!["IED1/Device1/MMXU1$RP$urcb01", "urcb02"]
        );
    }

    #[test]
    fn test_set_dataset_members() {
        let server = server();
        server
            .create_dataset("Device1/MMXU1", "ds1", [PHS_A])
            .unwrap();
        server
            .set_dataset_members("Device1/MMXU1", "ds1", ["Device1/MMXU1.PhV.phsB", PHS_A])
            .unwrap();
        assert_eq!(server.dataset("Device1/MMXU1", "ds1").unwrap().len(), 2);

        assert!(matches!(
            server.set_dataset_members("Device1/MMXU1", "ds1", [PHS_A, PHS_A]),
            Err(Iec61850Error::InvalidDataset(_))
        ));
        assert_eq!(server.dataset("Device1/MMXU1", "ds1").unwrap().len(), 2);
    }
}
