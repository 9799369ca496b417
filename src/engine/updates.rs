//! Staged image updates
//!
//! Targets come from device specifications and group names. Devices without
//! a pending update are dropped up front, the rest are partitioned by image
//! set, and each partition becomes one update request carrying one commit.

use super::{BatchFailure, Engine, Result, settle};
use edgeapi::models::{Device, UpdateBatch};
use reconcile::{ApplyResult, BatchPlan, ItemResult, Phase, Report, TargetSpec};
use std::collections::{BTreeMap, HashSet};

/// What to update and, optionally, to which version
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    /// Device names or UUIDs; ranges and wildcards allowed
    pub devices: Vec<String>,
    /// Group names; every member is a target
    pub groups: Vec<String>,
    /// Pin every target to this version of their shared image set
    pub version: Option<u64>,
}

/// One update request ready to submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedBatch {
    pub image_set: u64,
    /// Image the devices move to
    pub image_id: u64,
    pub version: u64,
    pub commit_id: u64,
    pub devices: Vec<Device>,
}

impl PlannedBatch {
    fn body(&self) -> UpdateBatch {
        UpdateBatch {
            commit_id: self.commit_id,
            devices_uuid: self.devices.iter().map(|d| d.uuid.clone()).collect(),
        }
    }
}

/// Batches to submit plus the targets that need nothing
#[derive(Debug, Clone, Default)]
pub struct UpdatePlan {
    pub batches: Vec<PlannedBatch>,
    pub unchanged: Vec<ItemResult>,
}

impl UpdatePlan {
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

impl Engine<'_> {
    /// Resolve, filter and partition the update targets
    pub fn plan_update(&self, request: &UpdateRequest) -> Result<UpdatePlan> {
        if request.devices.is_empty() && request.groups.is_empty() {
            return Err(reconcile::Error::validation(
                "update",
                "at least one device or group is required",
            )
            .into());
        }

        self.phase(Phase::Expand, "device specifications");
        let specs = reconcile::parse_all(&request.devices)?;

        self.phase(Phase::Fetch, "target devices");
        let mut targets = self.resolve_devices(&specs)?;
        for name in &request.groups {
            let group = self
                .find_group(name)?
                .ok_or_else(|| reconcile::Error::not_found("group", name.as_str()))?;
            targets.extend(self.client().group_devices(group.id)?);
        }

        self.phase(Phase::Diff, &format!("{} candidate devices", targets.len()));
        let mut seen = HashSet::new();
        targets.retain(|d| seen.insert(d.id));

        let mut plan = UpdatePlan::default();
        let (ready, skipped): (Vec<Device>, Vec<Device>) =
            targets.into_iter().partition(Device::is_updatable);
        for device in skipped {
            let reason = if device.update_available {
                format!("status is {}", device.status)
            } else {
                "no update available".to_string()
            };
            log::debug!("skipping {}: {reason}", device.label());
            plan.unchanged
                .push(ItemResult::new(device.label(), ApplyResult::Skipped { reason }));
        }
        if ready.is_empty() {
            return Ok(plan);
        }

        self.phase(Phase::Plan, "partition by image set");
        let keyed = self.with_image_sets(ready)?;
        match request.version {
            Some(version) => self.plan_pinned(keyed, version, &mut plan)?,
            None => self.plan_latest(keyed, &mut plan)?,
        }
        Ok(plan)
    }

    /// Submit every planned batch, one at a time
    pub fn apply_update(&self, plan: UpdatePlan) -> Result<Report> {
        let mut items = plan.unchanged;
        if plan.batches.is_empty() {
            return Ok(Report::unchanged(items));
        }

        self.phase(
            Phase::Execute,
            &format!("{} update batches", plan.batches.len()),
        );
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut submitted = Vec::new();
        for batch in &plan.batches {
            let key = format!("image-set {}", batch.image_set);
            if self.dry_run() {
                items.extend(
                    batch
                        .devices
                        .iter()
                        .map(|d| ItemResult::new(d.label(), ApplyResult::Modified)),
                );
                continue;
            }

            log::info!(
                "updating {} devices in {key} to version {} (commit {})",
                batch.devices.len(),
                batch.version,
                batch.commit_id
            );
            match self.client().submit_update(&batch.body()) {
                Ok(_) => {
                    items.extend(
                        batch
                            .devices
                            .iter()
                            .map(|d| ItemResult::new(d.label(), ApplyResult::Modified)),
                    );
                    submitted.extend(batch.devices.iter().map(|d| (d.uuid.clone(), batch.image_id)));
                    succeeded.push(key);
                }
                Err(error) => {
                    let message = error.to_string();
                    items.extend(batch.devices.iter().map(|d| {
                        ItemResult::new(
                            d.label(),
                            ApplyResult::Failed {
                                error: message.clone(),
                            },
                        )
                    }));
                    failed.push(BatchFailure { key, error });
                }
            }
        }
        settle(succeeded, failed)?;

        let targets: BTreeMap<String, u64> = submitted.into_iter().collect();
        let mut report = Report::from_items(items, self.dry_run());
        report.verification = self.verify(targets.keys().cloned().collect(), |pending| {
            let mut waiting = Vec::new();
            for uuid in pending {
                let device = self.client().device(uuid)?;
                let target = targets.get(uuid).copied().unwrap_or_default();
                if device.image_id != target && device.is_updatable() {
                    waiting.push(uuid.clone());
                }
            }
            Ok(waiting)
        })?;
        Ok(report)
    }

    /// Plan and submit in one go
    pub fn update_devices(&self, request: &UpdateRequest) -> Result<Report> {
        let plan = self.plan_update(request)?;
        self.apply_update(plan)
    }

    /// Resolve device specifications to device records
    ///
    /// Literal and range names must each resolve to exactly one device;
    /// every unknown name is reported in one error.
    pub(crate) fn resolve_devices(&self, specs: &[TargetSpec]) -> Result<Vec<Device>> {
        let mut devices = Vec::new();
        let mut missing = Vec::new();

        for spec in specs {
            if spec.is_wildcard() {
                let found = self.client().devices_matching(spec.search_prefix())?;
                devices.extend(found.into_iter().filter(|d| spec.matches(&d.name)));
                continue;
            }
            for name in spec.expand()? {
                let found: Vec<Device> = self
                    .client()
                    .devices_matching(&name)?
                    .into_iter()
                    .filter(|d| d.name == name || d.uuid == name)
                    .collect();
                match reconcile::expect_unique("device", &name, found, |d| d.uuid.clone())? {
                    Some(device) => devices.push(device),
                    None => missing.push(name),
                }
            }
        }

        if !missing.is_empty() {
            return Err(reconcile::Error::not_found("device", missing.join(", ")).into());
        }
        Ok(devices)
    }

    /// Pair each device with its image set, looking up images once each
    fn with_image_sets(&self, devices: Vec<Device>) -> Result<Vec<(u64, Device)>> {
        let mut by_image: BTreeMap<u64, u64> = BTreeMap::new();
        let mut keyed = Vec::with_capacity(devices.len());

        for device in devices {
            let set = match device.image_set_id {
                Some(set) => set,
                None => {
                    if let Some(set) = by_image.get(&device.image_id) {
                        *set
                    } else {
                        let image = self.client().image(device.image_id)?;
                        let set = image.image_set_id.ok_or_else(|| {
                            edgeapi::Error::invalid(
                                format!("{}/images/{}", edgeapi::EDGE_API, image.id),
                                "image has no image set",
                            )
                        })?;
                        by_image.insert(device.image_id, set);
                        set
                    }
                }
            };
            keyed.push((set, device));
        }
        Ok(keyed)
    }

    /// One batch per image set, each to the set's current version
    fn plan_latest(&self, keyed: Vec<(u64, Device)>, plan: &mut UpdatePlan) -> Result<()> {
        let mut batches = BatchPlan::build(keyed, |(_, d)| d.id, |(set, _)| *set);

        let mut latest = BTreeMap::new();
        for set in batches.keys() {
            let detail = self.client().image_set(set)?;
            let image = detail.latest().cloned().ok_or_else(|| {
                reconcile::Error::not_found(
                    "image version",
                    format!("{} v{}", detail.image_set.name, detail.image_set.version),
                )
            })?;
            latest.insert(set, image);
        }

        // Devices already running the target image need nothing
        let current = batches.retain(|set, (_, d)| {
            latest.get(set).is_none_or(|image| image.id != d.image_id)
        });
        for (_, (_, device)) in current {
            plan.unchanged
                .push(ItemResult::new(device.label(), ApplyResult::NoChange));
        }

        for batch in batches.into_batches() {
            let Some(image) = latest.get(&batch.key) else {
                continue;
            };
            plan.batches.push(PlannedBatch {
                image_set: batch.key,
                image_id: image.id,
                version: image.version,
                commit_id: image.target_commit(),
                devices: batch.items.into_iter().map(|(_, d)| d).collect(),
            });
        }
        Ok(())
    }

    /// Exactly one batch to a specific version of the targets' shared set
    fn plan_pinned(
        &self,
        keyed: Vec<(u64, Device)>,
        version: u64,
        plan: &mut UpdatePlan,
    ) -> Result<()> {
        let Some(set) = reconcile::single_partition(&keyed, |(set, _)| *set)? else {
            return Ok(());
        };

        let image = self
            .client()
            .image_set_versions(set)?
            .into_iter()
            .find(|image| image.version == version)
            .ok_or_else(|| {
                reconcile::Error::not_found("image version", format!("image-set {set} v{version}"))
            })?;

        let mut devices = Vec::new();
        for (_, device) in keyed {
            if device.image_id == image.id {
                plan.unchanged
                    .push(ItemResult::new(device.label(), ApplyResult::NoChange));
            } else {
                devices.push(device);
            }
        }
        if !devices.is_empty() {
            plan.batches.push(PlannedBatch {
                image_set: set,
                image_id: image.id,
                version: image.version,
                commit_id: image.target_commit(),
                devices,
            });
        }
        Ok(())
    }
}
