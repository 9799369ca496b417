//! Typed client over a [`Gateway`].
//!
//! Each method maps one remote operation to typed records. Name lookups
//! return every exact match and leave the uniqueness policy to the caller.

use crate::error::{Error, Result};
use crate::gateway::{Gateway, with_query};
use crate::models::{
    CreateGroup, CreateRepo, DataEnvelope, Device, DeviceDetail, GROUP_TYPE_STATIC, Group,
    GroupDetail, GroupDevices, GroupEntry, Image, ImageDefinition, ImageSet, ImageSetDetail,
    ImageSetEntry, InventoryHost, ListResponse, Repo, UpdateBatch,
};
use crate::paginate::{DEFAULT_STEP, PageQuery, PageStyle, Paginator};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::rc::Rc;

/// Edge management API root.
pub const EDGE_API: &str = "/api/edge/v1";
/// Inventory API root.
pub const INVENTORY_API: &str = "/api/inventory/v1";

/// Fixed inventory filters: fresh edge hosts only.
const INVENTORY_EDGE_FILTER: &str = "staleness=fresh&filter[system_profile][host_type]=edge";

fn edge(path: &str) -> String {
    format!("{EDGE_API}{path}")
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::invalid(path, e.to_string()))
}

type Progress<'a> = Rc<dyn Fn(usize, usize) + 'a>;

/// Client for the edge and inventory services.
///
/// # Example
///
/// ```
/// use edgeapi::{EdgeClient, MockGateway};
/// use serde_json::json;
///
/// let mock = MockGateway::new();
/// mock.on_get(
///     "/api/edge/v1/device-groups?name=lab",
///     json!({"count": 1, "data": [{"DeviceGroup": {"ID": 1, "Name": "lab"}}]}),
/// );
///
/// let client = EdgeClient::new(&mock);
/// let groups = client.groups_named("lab").unwrap();
/// assert_eq!(groups[0].id, 1);
/// ```
pub struct EdgeClient<'a> {
    gateway: &'a dyn Gateway,
    page_size: usize,
    progress: Option<Progress<'a>>,
}

impl<'a> EdgeClient<'a> {
    /// Create a client with the default page size.
    pub fn new(gateway: &'a dyn Gateway) -> Self {
        Self {
            gateway,
            page_size: DEFAULT_STEP,
            progress: None,
        }
    }

    /// Set the page size for paginated listings.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Report `(fetched, total)` while paginating.
    pub fn with_progress(mut self, progress: impl Fn(usize, usize) + 'a) -> Self {
        self.progress = Some(Rc::new(progress));
        self
    }

    /// The underlying gateway.
    pub fn gateway(&self) -> &'a dyn Gateway {
        self.gateway
    }

    fn paginator(&self) -> Paginator<'a> {
        let paginator = Paginator::new(self.gateway, self.page_size);
        match &self.progress {
            Some(progress) => {
                let progress = Rc::clone(progress);
                paginator.with_progress(move |fetched, total| progress(fetched, total))
            }
            None => paginator,
        }
    }

    fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.gateway.get(path)?;
        decode(path, value)
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Groups whose name is exactly `name`.
    ///
    /// The remote filter is a substring match, so results are narrowed here.
    pub fn groups_named(&self, name: &str) -> Result<Vec<Group>> {
        let path = with_query(&edge("/device-groups"), &[("name", name.to_string())]);
        let list: ListResponse<GroupEntry> = self.get_as(&path)?;
        Ok(list
            .data
            .into_iter()
            .map(|e| e.group)
            .filter(|g| g.name == name)
            .collect())
    }

    /// Every group, optionally narrowed by a name prefix.
    pub fn list_groups(&self, name_prefix: Option<&str>) -> Result<Vec<Group>> {
        let base = match name_prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => with_query(&edge("/device-groups"), &[("name", prefix.to_string())]),
            None => edge("/device-groups"),
        };
        let query = PageQuery::new(base, PageStyle::Offset).identity_at("/DeviceGroup/ID");
        let entries: Vec<GroupEntry> = self.paginator().fetch_all_as(&query)?;
        Ok(entries.into_iter().map(|e| e.group).collect())
    }

    /// Create a static group.
    pub fn create_group(&self, name: &str) -> Result<Value> {
        let body = serde_json::to_value(CreateGroup {
            name,
            kind: GROUP_TYPE_STATIC,
        })
        .map_err(|e| Error::Config(e.to_string()))?;
        self.gateway.post(&edge("/device-groups"), &body)
    }

    /// Delete a group by ID.
    pub fn delete_group(&self, id: u64) -> Result<Value> {
        self.gateway.delete(&edge(&format!("/device-groups/{id}")), None)
    }

    /// Current members of a group.
    pub fn group_devices(&self, id: u64) -> Result<Vec<Device>> {
        let detail: GroupDetail = self.get_as(&edge(&format!("/device-groups/{id}")))?;
        Ok(detail.devices)
    }

    /// Add devices to a group.
    pub fn add_group_devices(&self, id: u64, device_ids: &[u64]) -> Result<Value> {
        let body = membership_body(id, device_ids)?;
        self.gateway
            .post(&edge(&format!("/device-groups/{id}/devices")), &body)
    }

    /// Remove devices from a group.
    pub fn remove_group_devices(&self, id: u64, device_ids: &[u64]) -> Result<Value> {
        let body = membership_body(id, device_ids)?;
        self.gateway
            .delete(&edge(&format!("/device-groups/{id}/devices")), Some(&body))
    }

    // =========================================================================
    // Devices and updates
    // =========================================================================

    /// Every device matching a host name or ID, across all pages.
    pub fn devices_matching(&self, hostname_or_id: &str) -> Result<Vec<Device>> {
        let path = with_query(
            &edge("/devices"),
            &[("hostname_or_id", hostname_or_id.to_string())],
        );
        let query = PageQuery::new(path, PageStyle::Offset).identity_at("/ID");
        self.paginator().fetch_all_as(&query)
    }

    /// Device detail by ID or UUID.
    pub fn device(&self, id: &str) -> Result<Device> {
        let path = edge(&format!("/devices/{}", urlencoding::encode(id)));
        let detail: DeviceDetail = self.get_as(&path)?;
        Ok(detail.device)
    }

    /// Every device in the device view.
    pub fn list_devices(&self) -> Result<Vec<Device>> {
        let query = PageQuery::new(edge("/devicesview"), PageStyle::Offset)
            .records_at("/data/devices")
            .identity_at("/DeviceID");
        self.paginator().fetch_all_as(&query)
    }

    /// Submit one update batch.
    pub fn submit_update(&self, batch: &UpdateBatch) -> Result<Value> {
        let body = serde_json::to_value(batch).map_err(|e| Error::Config(e.to_string()))?;
        self.gateway.post(&edge("/updates"), &body)
    }

    // =========================================================================
    // Images and image sets
    // =========================================================================

    /// Image by ID.
    pub fn image(&self, id: u64) -> Result<Image> {
        self.get_as(&edge(&format!("/images/{id}")))
    }

    /// Image by commit hash.
    pub fn image_by_hash(&self, hash: &str) -> Result<Image> {
        self.get_as(&edge(&format!("/images/{}/info", urlencoding::encode(hash))))
    }

    /// Every image.
    pub fn list_images(&self) -> Result<Vec<Image>> {
        let query = PageQuery::new(edge("/images"), PageStyle::Offset).identity_at("/ID");
        self.paginator().fetch_all_as(&query)
    }

    /// Start an image build.
    pub fn create_image(&self, definition: &ImageDefinition) -> Result<Value> {
        let body = serde_json::to_value(definition).map_err(|e| Error::Config(e.to_string()))?;
        self.gateway.post(&edge("/images"), &body)
    }

    /// Build the next version of an image.
    pub fn update_image(&self, id: u64, definition: &ImageDefinition) -> Result<Value> {
        let body = serde_json::to_value(definition).map_err(|e| Error::Config(e.to_string()))?;
        self.gateway
            .post(&edge(&format!("/images/{id}/update")), &body)
    }

    /// Image set with its images.
    pub fn image_set(&self, id: u64) -> Result<ImageSetDetail> {
        let envelope: DataEnvelope<ImageSetDetail> =
            self.get_as(&edge(&format!("/image-sets/{id}")))?;
        Ok(envelope.data)
    }

    /// Image sets whose name is exactly `name`.
    pub fn image_sets_named(&self, name: &str) -> Result<Vec<ImageSet>> {
        let path = with_query(&edge("/image-sets"), &[("name", name.to_string())]);
        let list: ListResponse<ImageSetEntry> = self.get_as(&path)?;
        Ok(list
            .data
            .into_iter()
            .map(ImageSetEntry::into_inner)
            .filter(|s| s.name == name)
            .collect())
    }

    /// Every image set.
    pub fn list_image_sets(&self) -> Result<Vec<ImageSet>> {
        let query = PageQuery::new(edge("/image-sets"), PageStyle::Offset);
        let entries: Vec<ImageSetEntry> = self.paginator().fetch_all_as(&query)?;
        Ok(entries.into_iter().map(ImageSetEntry::into_inner).collect())
    }

    /// Every version in an image set.
    pub fn image_set_versions(&self, id: u64) -> Result<Vec<Image>> {
        let query = PageQuery::new(
            edge(&format!("/image-sets/view/{id}/versions")),
            PageStyle::Offset,
        )
        .identity_at("/ID");
        self.paginator().fetch_all_as(&query)
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// Fresh edge hosts matching extra query parameters.
    pub fn hosts(&self, params: &[(&str, String)]) -> Result<Vec<InventoryHost>> {
        let base = with_query(
            &format!("{INVENTORY_API}/hosts?{INVENTORY_EDGE_FILTER}"),
            params,
        );
        let query = PageQuery::new(base, PageStyle::Page)
            .total_at("/total")
            .records_at("/results")
            .identity_at("/id");
        self.paginator().fetch_all_as(&query)
    }

    // =========================================================================
    // Custom repositories
    // =========================================================================

    /// Repositories whose name is exactly `name`.
    pub fn repos_named(&self, name: &str) -> Result<Vec<Repo>> {
        let path = with_query(&edge("/thirdpartyrepo"), &[("name", name.to_string())]);
        let list: ListResponse<Repo> = self.get_as(&path)?;
        Ok(list.data.into_iter().filter(|r| r.name == name).collect())
    }

    /// Register a repository.
    pub fn create_repo(&self, name: &str, url: &str) -> Result<Value> {
        let body = serde_json::to_value(CreateRepo { name, url })
            .map_err(|e| Error::Config(e.to_string()))?;
        self.gateway.post(&edge("/thirdpartyrepo"), &body)
    }

    /// Delete a repository by ID.
    pub fn delete_repo(&self, id: u64) -> Result<Value> {
        self.gateway
            .delete(&edge(&format!("/thirdpartyrepo/{id}")), None)
    }
}

fn membership_body(id: u64, device_ids: &[u64]) -> Result<Value> {
    serde_json::to_value(GroupDevices::new(id, device_ids.iter().copied()))
        .map_err(|e| Error::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Method;
    use crate::mock::MockGateway;
    use serde_json::json;

    #[test]
    fn test_groups_named_filters_exact_name() {
        let mock = MockGateway::new();
        mock.on_get(
            "/api/edge/v1/device-groups?name=lab",
            json!({"count": 2, "data": [
                {"DeviceGroup": {"ID": 1, "Name": "lab"}},
                {"DeviceGroup": {"ID": 2, "Name": "lab-east"}}
            ]}),
        );
        let groups = EdgeClient::new(&mock).groups_named("lab").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, 1);
    }

    #[test]
    fn test_groups_named_null_data() {
        let mock = MockGateway::new();
        mock.on_get(
            "/api/edge/v1/device-groups?name=none",
            json!({"count": 0, "data": null}),
        );
        assert!(EdgeClient::new(&mock).groups_named("none").unwrap().is_empty());
    }

    #[test]
    fn test_create_group_body() {
        let mock = MockGateway::new();
        mock.on(Method::Post, "/api/edge/v1/device-groups", json!({}));
        EdgeClient::new(&mock).create_group("lab").unwrap();
        assert_eq!(
            mock.mutations()[0].body,
            Some(json!({"name": "lab", "type": "static"}))
        );
    }

    #[test]
    fn test_remove_group_devices_sends_body_with_delete() {
        let mock = MockGateway::new();
        mock.on(Method::Delete, "/api/edge/v1/device-groups/4/devices", json!({}));
        EdgeClient::new(&mock).remove_group_devices(4, &[9]).unwrap();

        let sent = &mock.mutations()[0];
        assert_eq!(sent.method, Method::Delete);
        assert_eq!(sent.body, Some(json!({"ID": 4, "Devices": [{"ID": 9}]})));
    }

    #[test]
    fn test_device_detail_envelope() {
        let mock = MockGateway::new();
        mock.on_get(
            "/api/edge/v1/devices/u-1",
            json!({"Device": {"ID": 1, "UUID": "u-1", "ImageID": 5}}),
        );
        let device = EdgeClient::new(&mock).device("u-1").unwrap();
        assert_eq!(device.image_id, 5);
    }

    #[test]
    fn test_image_set_detail_envelope() {
        let mock = MockGateway::new();
        mock.on_get(
            "/api/edge/v1/image-sets/3",
            json!({"Data": {
                "image_set": {"ID": 3, "Name": "s", "Version": 1},
                "images": [{"image": {"ID": 30, "Version": 1}}]
            }}),
        );
        let detail = EdgeClient::new(&mock).image_set(3).unwrap();
        assert_eq!(detail.latest().map(|i| i.id), Some(30));
    }

    #[test]
    fn test_hosts_paginates_inventory() {
        let mock = MockGateway::new();
        let base = "/api/inventory/v1/hosts?staleness=fresh&filter[system_profile][host_type]=edge&fqdn=a.example";
        mock.on_get(
            format!("{base}&per_page=1&page=1"),
            json!({"total": 1, "results": [{"id": "h1"}]}),
        );
        mock.on_get(
            format!("{base}&per_page=50&page=1"),
            json!({"total": 1, "results": [{"id": "h1", "ip_addresses": ["10.0.0.2"]}]}),
        );
        let hosts = EdgeClient::new(&mock)
            .hosts(&[("fqdn", "a.example".to_string())])
            .unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].ip_addresses, vec!["10.0.0.2"]);
    }

    #[test]
    fn test_devices_matching_reads_every_page() {
        let mock = MockGateway::new();
        let base = "/api/edge/v1/devices?hostname_or_id=edge";
        let device = |id: u64| {
            json!({
                "ID": id,
                "UUID": format!("u-{id}"),
                "Name": format!("edge{id}"),
                "ImageID": 1
            })
        };
        mock.on_get(
            format!("{base}&limit=1&offset=0"),
            json!({"count": 3, "data": [device(1)]}),
        );
        mock.on_get(
            format!("{base}&limit=2&offset=0"),
            json!({"count": 3, "data": [device(1), device(2)]}),
        );
        mock.on_get(
            format!("{base}&limit=2&offset=2"),
            json!({"count": 3, "data": [device(3)]}),
        );

        let devices = EdgeClient::new(&mock)
            .with_page_size(2)
            .devices_matching("edge")
            .unwrap();
        let ids: Vec<u64> = devices.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_group_device_without_id_is_rejected() {
        let mock = MockGateway::new();
        mock.on_get(
            "/api/edge/v1/device-groups/4",
            json!({"Devices": [
                {"UUID": "u1", "ImageID": 1, "UpdateAvailable": true, "Status": "RUNNING"},
                {"UUID": "u2", "ImageID": 1, "UpdateAvailable": true, "Status": "RUNNING"}
            ]}),
        );
        let err = EdgeClient::new(&mock).group_devices(4).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse { .. }));
    }

    #[test]
    fn test_image_by_hash() {
        let mock = MockGateway::new();
        mock.on_get(
            "/api/edge/v1/images/abc123/info",
            json!({"ID": 12, "Name": "kiosk", "Version": 2}),
        );
        let image = EdgeClient::new(&mock).image_by_hash("abc123").unwrap();
        assert_eq!((image.id, image.version), (12, 2));
    }

    #[test]
    fn test_decode_failure_is_invalid_response() {
        let mock = MockGateway::new();
        mock.on_get("/api/edge/v1/images/1", json!({"Name": "missing id"}));
        let err = EdgeClient::new(&mock).image(1).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse { .. }));
    }

    #[test]
    fn test_remote_error_propagates() {
        let mock = MockGateway::new();
        mock.on_status(Method::Post, "/api/edge/v1/updates", 400, "no commit");
        let err = EdgeClient::new(&mock)
            .submit_update(&UpdateBatch {
                commit_id: 1,
                devices_uuid: vec!["u".into()],
            })
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("no commit"));
    }
}
