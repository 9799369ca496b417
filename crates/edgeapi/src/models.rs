//! Typed records for the edge and inventory services.
//!
//! Field names follow the wire format (`PascalCase` for edge, `snake_case`
//! for inventory). Optional fields default; a missing required field fails
//! decoding with [`crate::Error::InvalidResponse`].

use serde::{Deserialize, Deserializer, Serialize};

/// Decode `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Group type used for every group this tool creates.
pub const GROUP_TYPE_STATIC: &str = "static";

/// Device status that makes a device eligible for updates.
pub const STATUS_RUNNING: &str = "RUNNING";

/// A list envelope, either `{count, data}` or `{Count, Data}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ListResponse<T> {
    /// Total number of matching records.
    #[serde(default, alias = "Count")]
    pub count: u64,
    /// Records on this page (`null` decodes as empty).
    #[serde(default, alias = "Data", deserialize_with = "null_as_default")]
    pub data: Vec<T>,
}

impl<T> Default for ListResponse<T> {
    fn default() -> Self {
        Self {
            count: 0,
            data: Vec::new(),
        }
    }
}

// =============================================================================
// Groups
// =============================================================================

/// A device group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    /// Server-assigned ID.
    #[serde(rename = "ID")]
    pub id: u64,
    /// Unique name.
    pub name: String,
    /// Group type (`static`).
    #[serde(default, rename = "Type")]
    pub kind: String,
    /// Member devices.
    #[serde(default, deserialize_with = "null_as_default")]
    pub devices: Vec<Device>,
}

/// A group search result entry, `{DeviceGroup: {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupEntry {
    /// The group.
    #[serde(rename = "DeviceGroup")]
    pub group: Group,
}

/// Group detail, which lists devices at the top level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GroupDetail {
    /// Member devices.
    #[serde(default, rename = "Devices", deserialize_with = "null_as_default")]
    pub devices: Vec<Device>,
}

/// Body for group creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateGroup<'a> {
    /// Group name.
    pub name: &'a str,
    /// Group type.
    #[serde(rename = "type")]
    pub kind: &'a str,
}

/// Device reference in a membership body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceRef {
    /// Device ID.
    #[serde(rename = "ID")]
    pub id: u64,
}

/// Body for adding or removing group members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupDevices {
    /// Group ID.
    #[serde(rename = "ID")]
    pub id: u64,
    /// Devices to add or remove.
    #[serde(rename = "Devices")]
    pub devices: Vec<DeviceRef>,
}

impl GroupDevices {
    /// Membership body for `group_id` and the given device IDs.
    pub fn new(group_id: u64, device_ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            id: group_id,
            devices: device_ids.into_iter().map(|id| DeviceRef { id }).collect(),
        }
    }
}

// =============================================================================
// Devices
// =============================================================================

/// An edge device.
///
/// Also decodes the device view's `DeviceID`/`DeviceUUID`/`DeviceName`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Device {
    /// Server-assigned ID.
    #[serde(rename = "ID", alias = "DeviceID")]
    pub id: u64,
    /// Inventory UUID.
    #[serde(rename = "UUID", alias = "DeviceUUID")]
    pub uuid: String,
    /// Host name.
    #[serde(alias = "DeviceName", default)]
    pub name: String,
    /// Currently running image.
    #[serde(rename = "ImageID")]
    pub image_id: u64,
    /// Image set of the running image, when the service includes it.
    #[serde(rename = "ImageSetID", default, skip_serializing_if = "Option::is_none")]
    pub image_set_id: Option<u64>,
    /// Whether a newer image is available.
    #[serde(default)]
    pub update_available: bool,
    /// Commit hash of the pending update.
    #[serde(default, deserialize_with = "null_as_default")]
    pub available_hash: String,
    /// Lifecycle status (e.g. `RUNNING`).
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
}

impl Device {
    /// Whether the device can receive an update now.
    pub fn is_updatable(&self) -> bool {
        self.update_available && self.status == STATUS_RUNNING
    }

    /// Name if known, otherwise UUID.
    pub fn label(&self) -> &str {
        if self.name.is_empty() { &self.uuid } else { &self.name }
    }
}

/// Device detail envelope, `{Device: {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceDetail {
    /// The device.
    #[serde(rename = "Device")]
    pub device: Device,
}

/// Body for an update submission: one commit, many devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBatch {
    /// Target commit.
    #[serde(rename = "CommitID")]
    pub commit_id: u64,
    /// Devices to move to the commit.
    #[serde(rename = "DevicesUUID")]
    pub devices_uuid: Vec<String>,
}

// =============================================================================
// Images
// =============================================================================

/// Build artifact of an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Commit {
    /// Commit ID.
    #[serde(rename = "ID", default)]
    pub id: u64,
    /// Target architecture.
    #[serde(default)]
    pub arch: String,
    /// OSTree hash.
    #[serde(rename = "OSTreeCommit", default)]
    pub ostree_commit: String,
}

/// A package name in an image definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Package name.
    #[serde(alias = "Name")]
    pub name: String,
}

/// One image version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Image {
    /// Server-assigned ID.
    #[serde(rename = "ID")]
    pub id: u64,
    /// Image name.
    #[serde(default)]
    pub name: String,
    /// Version within its image set.
    #[serde(default)]
    pub version: u64,
    /// Owning image set.
    #[serde(rename = "ImageSetID", default)]
    pub image_set_id: Option<u64>,
    /// Distribution (e.g. `rhel-85`).
    #[serde(default)]
    pub distribution: String,
    /// Build status (`BUILDING`, `SUCCESS`, `ERROR`).
    #[serde(default)]
    pub status: String,
    /// Commit ID when flattened into the image record.
    #[serde(rename = "CommitID", default)]
    pub commit_id: u64,
    /// Commit detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<Commit>,
    /// Output types.
    #[serde(default, deserialize_with = "null_as_default")]
    pub output_types: Vec<String>,
    /// Additional packages.
    #[serde(default, deserialize_with = "null_as_default")]
    pub packages: Vec<Package>,
}

impl Image {
    /// Commit this image was built from; falls back to the image ID when the
    /// service omits commit data.
    pub fn target_commit(&self) -> u64 {
        if self.commit_id != 0 {
            return self.commit_id;
        }
        match &self.commit {
            Some(commit) if commit.id != 0 => commit.id,
            _ => self.id,
        }
    }

    /// Architecture from the commit, if present.
    pub fn arch(&self) -> Option<&str> {
        self.commit
            .as_ref()
            .map(|c| c.arch.as_str())
            .filter(|a| !a.is_empty())
    }
}

/// Image entry in an image-set detail, `{image: {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageEntry {
    /// The image.
    pub image: Image,
}

/// An image set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageSet {
    /// Server-assigned ID.
    #[serde(rename = "ID")]
    pub id: u64,
    /// Image set name.
    #[serde(default)]
    pub name: String,
    /// Current (latest) version.
    #[serde(default)]
    pub version: u64,
}

/// Image set search entry: either `{image_set: {...}}` or the set itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ImageSetEntry {
    /// Wrapped form.
    Wrapped {
        /// The image set.
        image_set: ImageSet,
    },
    /// Flat form.
    Flat(ImageSet),
}

impl ImageSetEntry {
    /// The image set regardless of form.
    pub fn into_inner(self) -> ImageSet {
        match self {
            Self::Wrapped { image_set } | Self::Flat(image_set) => image_set,
        }
    }
}

/// Image set detail, the `Data` of `/image-sets/<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageSetDetail {
    /// The set.
    pub image_set: ImageSet,
    /// Every image in the set.
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<ImageEntry>,
}

impl ImageSetDetail {
    /// The image whose version equals the set's current version.
    pub fn latest(&self) -> Option<&Image> {
        self.images
            .iter()
            .map(|e| &e.image)
            .find(|image| image.version == self.image_set.version)
    }
}

/// `{Data: ...}` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataEnvelope<T> {
    /// Payload.
    #[serde(rename = "Data")]
    pub data: T,
}

/// Installer settings of an image definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Installer {
    /// Initial user.
    pub username: String,
    /// Public key for that user.
    pub sshkey: String,
}

/// Architecture of an image definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSpec {
    /// Target architecture.
    pub arch: String,
}

/// Body for image creation and image update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDefinition {
    /// Image name.
    pub name: String,
    /// Version (0 for a new image).
    pub version: u64,
    /// Distribution.
    pub distribution: String,
    /// Image type (always `rhel-edge-installer` here).
    pub image_type: String,
    /// Additional packages.
    pub packages: Vec<PackageSpec>,
    /// Requested outputs.
    pub output_types: Vec<String>,
    /// Architecture.
    pub commit: CommitSpec,
    /// Installer user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installer: Option<Installer>,
    /// Free-form description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Package name in an image definition body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSpec {
    /// Package name.
    pub name: String,
}

// =============================================================================
// Inventory and repositories
// =============================================================================

/// An inventory host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryHost {
    /// Inventory ID.
    pub id: String,
    /// Display name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,
    /// Fully-qualified domain name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub fqdn: String,
    /// Insights ID.
    #[serde(default, deserialize_with = "null_as_default")]
    pub insights_id: String,
    /// Reported addresses, IPv4 and IPv6.
    #[serde(default, deserialize_with = "null_as_default")]
    pub ip_addresses: Vec<String>,
}

/// Inventory host page, `{total, results}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HostList {
    /// Total number of matching hosts.
    #[serde(default)]
    pub total: u64,
    /// Hosts on this page.
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<InventoryHost>,
}

/// A custom package repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Repo {
    /// Server-assigned ID.
    #[serde(rename = "ID")]
    pub id: u64,
    /// Repository name.
    pub name: String,
    /// Repository URL.
    #[serde(rename = "URL", default)]
    pub url: String,
}

/// Body for repository creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateRepo<'a> {
    /// Repository name.
    pub name: &'a str,
    /// Repository URL.
    pub url: &'a str,
}
