use serde::{Deserialize, Serialize};

/// The durable projection of an allocation, one JSON object per
/// container. Field names are pinned to the records written by earlier
/// daemon versions, so existing state survives an upgrade.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FlatFence {
    #[serde(rename = "Ipn")]
    pub ipn: String,
    #[serde(rename = "ContainerIP")]
    pub container_ip: String,
    #[serde(rename = "ContainerIfcName")]
    pub container_ifc_name: String,
    #[serde(rename = "HostIfcName")]
    pub host_ifc_name: String,
    #[serde(rename = "SubnetShareable")]
    pub subnet_shareable: bool,
    #[serde(rename = "BridgeIfcName")]
    pub bridge_ifc_name: String,
}
