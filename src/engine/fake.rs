//! Stateful in-memory edge service for engine tests
//!
//! Routes the subset of the edge and inventory APIs the engine uses. Name
//! searches are substring matches like the real service, so exact-name
//! filtering in the client is exercised too.

use super::Engine;
use edgeapi::mock::{path_only, query_param};
use edgeapi::models::{Commit, Device, Image, ImageSet, InventoryHost, Repo, UpdateBatch};
use edgeapi::{EDGE_API, EdgeClient, Gateway, INVENTORY_API, Method};
use reconcile::ExecuteOptions;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::time::Duration;

type ApiResult = edgeapi::Result<Value>;

struct FakeGroup {
    id: u64,
    name: String,
    devices: Vec<u64>,
    /// Name searches that still miss this group
    hidden_reads: usize,
}

struct State {
    next_id: u64,
    groups: Vec<FakeGroup>,
    devices: Vec<Device>,
    images: Vec<Image>,
    image_sets: Vec<ImageSet>,
    repos: Vec<Repo>,
    hosts: Vec<InventoryHost>,
    updates: Vec<UpdateBatch>,
    builds: Vec<(String, Value)>,
    created_groups: Vec<String>,
    deleted_groups: Vec<String>,
    requests: Vec<(Method, String)>,
    image_lookups: usize,
    failing_groups: BTreeSet<String>,
    failing_commits: BTreeSet<u64>,
    visibility_lag: usize,
}

impl Default for State {
    fn default() -> Self {
        Self {
            next_id: 1000,
            groups: Vec::new(),
            devices: Vec::new(),
            images: Vec::new(),
            image_sets: Vec::new(),
            repos: Vec::new(),
            hosts: Vec::new(),
            updates: Vec::new(),
            builds: Vec::new(),
            created_groups: Vec::new(),
            deleted_groups: Vec::new(),
            requests: Vec::new(),
            image_lookups: 0,
            failing_groups: BTreeSet::new(),
            failing_commits: BTreeSet::new(),
            visibility_lag: 0,
        }
    }
}

#[derive(Default)]
pub struct FakeEdge {
    state: RefCell<State>,
}

fn missing(method: Method, path: &str) -> edgeapi::Error {
    edgeapi::Error::remote(method.as_str(), path, 404, "not found")
}

fn parse_id(method: Method, path: &str, text: &str) -> edgeapi::Result<u64> {
    text.parse().map_err(|_| missing(method, path))
}

/// Slice `records` by the limit/offset or per_page/page parameters in `path`
fn page(path: &str, records: Vec<Value>) -> (usize, Vec<Value>) {
    let total = records.len();
    let number = |key| query_param(path, key).and_then(|v| v.parse::<usize>().ok());

    let window = match (number("limit"), number("per_page")) {
        (Some(limit), _) => Some((number("offset").unwrap_or(0), limit)),
        (None, Some(per_page)) => {
            let page = number("page").unwrap_or(1).max(1);
            Some(((page - 1) * per_page, per_page))
        }
        (None, None) => None,
    };
    let records = match window {
        Some((offset, size)) => records.into_iter().skip(offset).take(size).collect(),
        None => records,
    };
    (total, records)
}

fn list(path: &str, records: Vec<Value>) -> Value {
    let (count, data) = page(path, records);
    json!({"count": count, "data": data})
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl FakeEdge {
    pub fn new() -> Self {
        Self::default()
    }

    fn options(dry_run: bool) -> ExecuteOptions {
        ExecuteOptions {
            dry_run,
            verify_attempts: 3,
            verify_interval: Duration::ZERO,
        }
    }

    /// Engine over this fake with a small page size
    pub fn engine(&self) -> Engine<'_> {
        Engine::new(EdgeClient::new(self).with_page_size(2), Self::options(false))
    }

    pub fn engine_dry_run(&self) -> Engine<'_> {
        Engine::new(EdgeClient::new(self).with_page_size(2), Self::options(true))
    }

    fn next_id(&self) -> u64 {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        state.next_id
    }

    // -- seeding --

    pub fn add_group(&self, name: &str, devices: &[u64]) -> u64 {
        let id = self.next_id();
        self.state.borrow_mut().groups.push(FakeGroup {
            id,
            name: name.to_string(),
            devices: devices.to_vec(),
            hidden_reads: 0,
        });
        id
    }

    /// A running device `uuid-<id>` on `image_id`
    pub fn add_device(&self, id: u64, name: &str, image_id: u64, update_available: bool) {
        self.state.borrow_mut().devices.push(Device {
            id,
            uuid: format!("uuid-{id}"),
            name: name.to_string(),
            image_id,
            image_set_id: None,
            update_available,
            available_hash: String::new(),
            status: "RUNNING".to_string(),
        });
    }

    fn with_device(&self, id: u64, change: impl FnOnce(&mut Device)) {
        if let Some(device) = self
            .state
            .borrow_mut()
            .devices
            .iter_mut()
            .find(|d| d.id == id)
        {
            change(device);
        }
    }

    pub fn set_device_status(&self, id: u64, status: &str) {
        self.with_device(id, |d| d.status = status.to_string());
    }

    pub fn set_device_image_set(&self, id: u64, image_set: u64) {
        self.with_device(id, |d| d.image_set_id = Some(image_set));
    }

    /// An image set whose images are `(image_id, version, commit_id)`;
    /// the set's current version is the highest one
    pub fn add_image_set(&self, id: u64, name: &str, images: &[(u64, u64, u64)]) {
        let mut state = self.state.borrow_mut();
        for &(image_id, version, commit_id) in images {
            state.images.push(Image {
                id: image_id,
                name: name.to_string(),
                version,
                image_set_id: Some(id),
                distribution: "rhel-85".to_string(),
                status: "SUCCESS".to_string(),
                commit_id,
                commit: Some(Commit {
                    id: commit_id,
                    arch: "x86_64".to_string(),
                    ostree_commit: format!("hash-{commit_id}"),
                }),
                output_types: vec!["rhel-edge-commit".to_string()],
                packages: Vec::new(),
            });
        }
        state.image_sets.push(ImageSet {
            id,
            name: name.to_string(),
            version: images.iter().map(|i| i.1).max().unwrap_or(0),
        });
    }

    pub fn add_repo(&self, name: &str, url: &str) -> u64 {
        let id = self.next_id();
        self.state.borrow_mut().repos.push(Repo {
            id,
            name: name.to_string(),
            url: url.to_string(),
        });
        id
    }

    pub fn add_host(&self, id: &str, display_name: &str, addresses: &[&str]) {
        self.state.borrow_mut().hosts.push(InventoryHost {
            id: id.to_string(),
            display_name: display_name.to_string(),
            fqdn: format!("{display_name}.example.com"),
            insights_id: format!("insights-{id}"),
            ip_addresses: addresses.iter().map(ToString::to_string).collect(),
        });
    }

    // -- failure injection --

    pub fn fail_group_create(&self, name: &str) {
        self.state
            .borrow_mut()
            .failing_groups
            .insert(name.to_string());
    }

    pub fn fail_update_commit(&self, commit_id: u64) {
        self.state.borrow_mut().failing_commits.insert(commit_id);
    }

    /// Hide groups created from now on from the next `reads` name searches
    pub fn set_visibility_lag(&self, reads: usize) {
        self.state.borrow_mut().visibility_lag = reads;
    }

    // -- inspection --

    pub fn created_groups(&self) -> Vec<String> {
        self.state.borrow().created_groups.clone()
    }

    pub fn deleted_groups(&self) -> Vec<String> {
        self.state.borrow().deleted_groups.clone()
    }

    /// Remaining group names, sorted
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .borrow()
            .groups
            .iter()
            .map(|g| g.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Member device IDs of the named group, sorted
    pub fn group_members(&self, name: &str) -> Vec<u64> {
        let state = self.state.borrow();
        let mut members: Vec<u64> = state
            .groups
            .iter()
            .filter(|g| g.name == name)
            .flat_map(|g| g.devices.iter().copied())
            .collect();
        members.sort_unstable();
        members
    }

    pub fn updates(&self) -> Vec<UpdateBatch> {
        self.state.borrow().updates.clone()
    }

    /// Image build requests as `(path, body)`
    pub fn builds(&self) -> Vec<(String, Value)> {
        self.state.borrow().builds.clone()
    }

    pub fn repo_names(&self) -> Vec<String> {
        self.state
            .borrow()
            .repos
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.state.borrow().requests.len()
    }

    pub fn mutation_count(&self) -> usize {
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|(method, _)| method.is_mutating())
            .count()
    }

    /// Paths of every GET, in order
    pub fn reads(&self) -> Vec<String> {
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|(method, _)| !method.is_mutating())
            .map(|(_, path)| path.clone())
            .collect()
    }

    /// Number of single-image reads
    pub fn image_lookups(&self) -> usize {
        self.state.borrow().image_lookups
    }
}

impl State {
    fn route(&mut self, method: Method, path: &str, body: Option<&Value>) -> ApiResult {
        let route = path_only(path);
        if route == format!("{INVENTORY_API}/hosts") && method == Method::Get {
            return Ok(self.hosts(path));
        }
        let Some(rest) = route.strip_prefix(EDGE_API) else {
            return Err(missing(method, path));
        };
        let segments: Vec<&str> = rest.trim_start_matches('/').split('/').collect();
        let id = |text: &&str| parse_id(method, path, text);

        match (method, segments.as_slice()) {
            (Method::Get, ["device-groups"]) => Ok(self.list_groups(path)),
            (Method::Post, ["device-groups"]) => self.create_group(path, body),
            (Method::Get, ["device-groups", group]) => self.group_detail(method, path, id(group)?),
            (Method::Delete, ["device-groups", group]) => self.delete_group(method, path, id(group)?),
            (Method::Post, ["device-groups", group, "devices"]) => {
                self.change_members(method, path, id(group)?, body, true)
            }
            (Method::Delete, ["device-groups", group, "devices"]) => {
                self.change_members(method, path, id(group)?, body, false)
            }
            (Method::Get, ["devices"]) => Ok(self.devices_matching(path)),
            (Method::Get, ["devices", device]) => self.device_detail(method, path, device),
            (Method::Get, ["devicesview"]) => Ok(self.devices_view(path)),
            (Method::Post, ["updates"]) => self.submit_update(path, body),
            (Method::Get, ["images"]) => Ok(list(path, self.images.iter().map(to_json).collect())),
            (Method::Post, ["images"]) => Ok(self.build(path, body)),
            (Method::Get, ["images", image]) => {
                self.image_lookups += 1;
                let image = id(image)?;
                self.images
                    .iter()
                    .find(|i| i.id == image)
                    .map(to_json)
                    .ok_or_else(|| missing(method, path))
            }
            (Method::Post, ["images", image, "update"]) => {
                id(image)?;
                Ok(self.build(path, body))
            }
            (Method::Get, ["image-sets"]) => Ok(self.image_sets(path)),
            (Method::Get, ["image-sets", set]) => self.image_set_detail(method, path, id(set)?),
            (Method::Get, ["image-sets", "view", set, "versions"]) => {
                let set = id(set)?;
                let versions = self
                    .images
                    .iter()
                    .filter(|i| i.image_set_id == Some(set))
                    .map(to_json)
                    .collect();
                Ok(list(path, versions))
            }
            (Method::Get, ["thirdpartyrepo"]) => Ok(self.repos(path)),
            (Method::Post, ["thirdpartyrepo"]) => Ok(self.create_repo(body)),
            (Method::Delete, ["thirdpartyrepo", repo]) => {
                let repo = id(repo)?;
                let before = self.repos.len();
                self.repos.retain(|r| r.id != repo);
                if self.repos.len() == before {
                    return Err(missing(method, path));
                }
                Ok(json!({}))
            }
            _ => Err(missing(method, path)),
        }
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn device_json(&self, id: u64) -> Option<Value> {
        self.devices.iter().find(|d| d.id == id).map(to_json)
    }

    fn list_groups(&mut self, path: &str) -> Value {
        let filter = query_param(path, "name").unwrap_or_default();
        let mut entries = Vec::new();
        for group in &mut self.groups {
            if !group.name.contains(&filter) {
                continue;
            }
            if group.hidden_reads > 0 {
                group.hidden_reads -= 1;
                continue;
            }
            entries.push((group.id, group.name.clone(), group.devices.clone()));
        }
        let records = entries
            .into_iter()
            .map(|(id, name, devices)| {
                let devices: Vec<Value> =
                    devices.iter().filter_map(|d| self.device_json(*d)).collect();
                json!({"DeviceGroup": {
                    "ID": id,
                    "Name": name,
                    "Type": "static",
                    "Devices": devices,
                }})
            })
            .collect();
        list(path, records)
    }

    fn create_group(&mut self, path: &str, body: Option<&Value>) -> ApiResult {
        let name = body
            .and_then(|b| b.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if self.failing_groups.contains(&name) {
            return Err(edgeapi::Error::remote("POST", path, 500, "group create failed"));
        }
        let id = self.allocate();
        self.groups.push(FakeGroup {
            id,
            name: name.clone(),
            devices: Vec::new(),
            hidden_reads: self.visibility_lag,
        });
        self.created_groups.push(name.clone());
        Ok(json!({"ID": id, "Name": name, "Type": "static"}))
    }

    fn group_detail(&self, method: Method, path: &str, id: u64) -> ApiResult {
        let group = self
            .groups
            .iter()
            .find(|g| g.id == id)
            .ok_or_else(|| missing(method, path))?;
        let devices: Vec<Value> = group
            .devices
            .iter()
            .filter_map(|d| self.device_json(*d))
            .collect();
        Ok(json!({"ID": id, "Name": group.name, "Devices": devices}))
    }

    fn delete_group(&mut self, method: Method, path: &str, id: u64) -> ApiResult {
        let index = self
            .groups
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| missing(method, path))?;
        let group = self.groups.remove(index);
        self.deleted_groups.push(group.name);
        Ok(json!({}))
    }

    fn change_members(
        &mut self,
        method: Method,
        path: &str,
        id: u64,
        body: Option<&Value>,
        add: bool,
    ) -> ApiResult {
        let ids: Vec<u64> = body
            .and_then(|b| b.get("Devices"))
            .and_then(Value::as_array)
            .map(|devices| {
                devices
                    .iter()
                    .filter_map(|d| d.get("ID").and_then(Value::as_u64))
                    .collect()
            })
            .unwrap_or_default();
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| missing(method, path))?;
        if add {
            for device in ids {
                if !group.devices.contains(&device) {
                    group.devices.push(device);
                }
            }
        } else {
            group.devices.retain(|d| !ids.contains(d));
        }
        Ok(json!({}))
    }

    fn devices_matching(&self, path: &str) -> Value {
        let query = query_param(path, "hostname_or_id").unwrap_or_default();
        let records = self
            .devices
            .iter()
            .filter(|d| d.name.contains(&query) || d.uuid == query || d.id.to_string() == query)
            .map(to_json)
            .collect();
        list(path, records)
    }

    fn device_detail(&self, method: Method, path: &str, key: &str) -> ApiResult {
        self.devices
            .iter()
            .find(|d| d.uuid == key || d.id.to_string() == key)
            .map(|d| json!({"Device": to_json(d)}))
            .ok_or_else(|| missing(method, path))
    }

    fn devices_view(&self, path: &str) -> Value {
        let records = self
            .devices
            .iter()
            .map(|d| {
                json!({
                    "DeviceID": d.id,
                    "DeviceUUID": d.uuid,
                    "DeviceName": d.name,
                    "ImageID": d.image_id,
                    "UpdateAvailable": d.update_available,
                    "Status": d.status,
                })
            })
            .collect();
        let (count, devices) = page(path, records);
        json!({"count": count, "data": {"devices": devices}})
    }

    fn submit_update(&mut self, path: &str, body: Option<&Value>) -> ApiResult {
        let batch: UpdateBatch = body
            .cloned()
            .and_then(|b| serde_json::from_value(b).ok())
            .ok_or_else(|| edgeapi::Error::remote("POST", path, 400, "bad update body"))?;
        if self.failing_commits.contains(&batch.commit_id) {
            return Err(edgeapi::Error::remote("POST", path, 500, "update failed"));
        }
        let target = self
            .images
            .iter()
            .find(|i| i.target_commit() == batch.commit_id)
            .map(|i| i.id)
            .ok_or_else(|| edgeapi::Error::remote("POST", path, 400, "unknown commit"))?;
        for device in &mut self.devices {
            if batch.devices_uuid.contains(&device.uuid) {
                device.image_id = target;
                device.update_available = false;
            }
        }
        self.updates.push(batch);
        Ok(json!({"ID": self.updates.len()}))
    }

    fn build(&mut self, path: &str, body: Option<&Value>) -> Value {
        let id = self.allocate();
        self.builds
            .push((path.to_string(), body.cloned().unwrap_or(Value::Null)));
        json!({"ID": id, "Status": "BUILDING"})
    }

    fn image_sets(&self, path: &str) -> Value {
        let filter = query_param(path, "name").unwrap_or_default();
        let records = self
            .image_sets
            .iter()
            .filter(|s| s.name.contains(&filter))
            .map(|s| json!({"image_set": to_json(s)}))
            .collect();
        list(path, records)
    }

    fn image_set_detail(&self, method: Method, path: &str, id: u64) -> ApiResult {
        let set = self
            .image_sets
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| missing(method, path))?;
        let images: Vec<Value> = self
            .images
            .iter()
            .filter(|i| i.image_set_id == Some(id))
            .map(|i| json!({"image": to_json(i)}))
            .collect();
        Ok(json!({"Data": {"image_set": to_json(set), "images": images}}))
    }

    fn repos(&self, path: &str) -> Value {
        let filter = query_param(path, "name").unwrap_or_default();
        let records = self
            .repos
            .iter()
            .filter(|r| r.name.contains(&filter))
            .map(to_json)
            .collect();
        list(path, records)
    }

    fn create_repo(&mut self, body: Option<&Value>) -> Value {
        let field = |key: &str| {
            body.and_then(|b| b.get(key))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let repo = Repo {
            id: self.allocate(),
            name: field("name"),
            url: field("url"),
        };
        let value = to_json(&repo);
        self.repos.push(repo);
        value
    }

    fn hosts(&self, path: &str) -> Value {
        let exact = |key: &str, value: &str| query_param(path, key).is_none_or(|v| v == value);
        let records = self
            .hosts
            .iter()
            .filter(|h| exact("display_name", &h.display_name) && exact("fqdn", &h.fqdn))
            .map(to_json)
            .collect();
        let (total, results) = page(path, records);
        json!({"total": total, "results": results})
    }
}

impl Gateway for FakeEdge {
    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> ApiResult {
        let mut state = self.state.borrow_mut();
        state.requests.push((method, path.to_string()));
        state.route(method, path, body)
    }
}
