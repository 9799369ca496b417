//! Group membership: add / remove / sync

use super::{BatchFailure, Engine, Result, settle};
use edgeapi::models::Device;
use reconcile::{ApplyResult, ItemResult, Phase, Report, SetDiff};
use std::collections::{BTreeMap, BTreeSet};

/// Which side of the membership diff to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipMode {
    /// Add desired devices that are not members yet
    Add,
    /// Remove desired devices that are members
    Remove,
    /// Make the membership exactly the desired devices
    Sync,
}

impl MembershipMode {
    fn diff(self, desired: &BTreeSet<u64>, observed: &BTreeSet<u64>) -> SetDiff<u64> {
        match self {
            Self::Add => SetDiff::compute(desired, observed).additions_only(),
            Self::Remove => SetDiff::present_of(desired, observed),
            Self::Sync => SetDiff::compute(desired, observed),
        }
    }
}

impl Engine<'_> {
    /// Converge the membership of `group` toward the given devices
    pub fn reconcile_members<S: AsRef<str>>(
        &self,
        group: &str,
        devices: &[S],
        mode: MembershipMode,
    ) -> Result<Report> {
        if devices.is_empty() && mode != MembershipMode::Sync {
            return Err(reconcile::Error::validation(group, "no devices given").into());
        }

        self.phase(Phase::Expand, "device specifications");
        let specs = reconcile::parse_all(devices)?;

        self.phase(Phase::Fetch, "group and devices");
        let matches = self.client().groups_named(group)?;
        let target = reconcile::expect_one("group", group, matches, |g| g.id.to_string())?;
        let wanted = self.resolve_devices(&specs)?;
        let observed_devices = self.client().group_devices(target.id)?;

        let mut labels: BTreeMap<u64, String> = BTreeMap::new();
        for device in wanted.iter().chain(&observed_devices) {
            labels
                .entry(device.id)
                .or_insert_with(|| device.label().to_string());
        }
        let label = |id: &u64| labels.get(id).cloned().unwrap_or_else(|| id.to_string());

        self.phase(Phase::Diff, &format!("members of {group}"));
        let desired: BTreeSet<u64> = wanted.iter().map(|d| d.id).collect();
        let observed: BTreeSet<u64> = observed_devices.iter().map(|d| d.id).collect();
        let diff = mode.diff(&desired, &observed);

        if diff.is_noop() {
            let items = desired
                .iter()
                .map(|id| ItemResult::new(label(id), ApplyResult::NoChange))
                .collect();
            return Ok(Report::unchanged(items));
        }

        self.phase(
            Phase::Execute,
            &format!("+{} -{}", diff.to_add.len(), diff.to_remove.len()),
        );
        let mut items = Vec::new();
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        let steps = [
            ("add", &diff.to_add, ApplyResult::Created),
            ("remove", &diff.to_remove, ApplyResult::Removed),
        ];
        for (key, ids, outcome) in steps {
            if ids.is_empty() {
                continue;
            }
            if self.dry_run() {
                items.extend(ids.iter().map(|id| ItemResult::new(label(id), outcome.clone())));
                continue;
            }

            let ids: Vec<u64> = ids.iter().copied().collect();
            log::info!("{key} {} devices in group {}", ids.len(), target.name);
            let sent = if key == "add" {
                self.client().add_group_devices(target.id, &ids)
            } else {
                self.client().remove_group_devices(target.id, &ids)
            };
            match sent {
                Ok(_) => {
                    items.extend(ids.iter().map(|id| ItemResult::new(label(id), outcome.clone())));
                    succeeded.push(key.to_string());
                }
                Err(error) => {
                    let message = error.to_string();
                    items.extend(ids.iter().map(|id| {
                        ItemResult::new(
                            label(id),
                            ApplyResult::Failed {
                                error: message.clone(),
                            },
                        )
                    }));
                    failed.push(BatchFailure {
                        key: key.to_string(),
                        error,
                    });
                }
            }
        }
        settle(succeeded, failed)?;

        let expected = diff.apply_to(&observed);
        let pending: Vec<String> = diff
            .to_add
            .iter()
            .chain(&diff.to_remove)
            .map(ToString::to_string)
            .collect();
        let mut report = Report::from_items(items, self.dry_run());
        report.verification = self.verify(pending, |pending| {
            let current: BTreeSet<u64> = self
                .client()
                .group_devices(target.id)?
                .iter()
                .map(|d: &Device| d.id)
                .collect();
            Ok(pending
                .iter()
                .filter(|id| {
                    id.parse::<u64>()
                        .is_ok_and(|id| expected.contains(&id) != current.contains(&id))
                })
                .cloned()
                .collect())
        })?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Error;
    use crate::engine::fake::FakeEdge;
    use reconcile::Verification;

    fn fleet() -> FakeEdge {
        let fake = FakeEdge::new();
        for id in 1..=4 {
            fake.add_device(id, &format!("edge{id}"), 10, false);
        }
        fake
    }

    #[test]
    fn test_add_only_missing_members() {
        let fake = fleet();
        fake.add_group("lab", &[1]);

        let report = fake
            .engine()
            .reconcile_members("lab", &["edge[1:3]"], MembershipMode::Add)
            .unwrap();
        assert!(report.changed);
        assert_eq!(report.summary.created, 2);
        assert_eq!(fake.group_members("lab"), vec![1, 2, 3]);
        assert_eq!(fake.mutation_count(), 1);
        assert_eq!(report.verification, Verification::Confirmed);
    }

    #[test]
    fn test_add_existing_members_is_noop() {
        let fake = fleet();
        fake.add_group("lab", &[1, 2]);
        let report = fake
            .engine()
            .reconcile_members("lab", &["edge1", "edge2"], MembershipMode::Add)
            .unwrap();
        assert!(!report.changed);
        assert_eq!(report.summary.no_change, 2);
        assert_eq!(fake.mutation_count(), 0);
    }

    #[test]
    fn test_remove_only_present_members() {
        let fake = fleet();
        fake.add_group("lab", &[1, 2]);
        let report = fake
            .engine()
            .reconcile_members("lab", &["edge2", "edge3"], MembershipMode::Remove)
            .unwrap();
        assert_eq!(report.summary.removed, 1);
        assert_eq!(fake.group_members("lab"), vec![1]);
    }

    #[test]
    fn test_sync_applies_both_sides() {
        let fake = fleet();
        fake.add_group("lab", &[1, 2]);
        let report = fake
            .engine()
            .reconcile_members("lab", &["edge2", "edge4"], MembershipMode::Sync)
            .unwrap();
        assert_eq!(report.summary.created, 1);
        assert_eq!(report.summary.removed, 1);
        assert_eq!(fake.group_members("lab"), vec![2, 4]);
        assert_eq!(fake.mutation_count(), 2);

        let again = fake
            .engine()
            .reconcile_members("lab", &["edge2", "edge4"], MembershipMode::Sync)
            .unwrap();
        assert!(!again.changed);
    }

    #[test]
    fn test_missing_group_is_not_found() {
        let fake = fleet();
        let err = fake
            .engine()
            .reconcile_members("nope", &["edge1"], MembershipMode::Add)
            .unwrap_err();
        assert!(matches!(err, Error::Spec(reconcile::Error::NotFound { .. })));
    }

    #[test]
    fn test_duplicate_group_is_ambiguous() {
        let fake = fleet();
        fake.add_group("lab", &[]);
        fake.add_group("lab", &[]);
        let err = fake
            .engine()
            .reconcile_members("lab", &["edge1"], MembershipMode::Add)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Spec(reconcile::Error::AmbiguousMatch { .. })
        ));
    }

    #[test]
    fn test_add_requires_devices() {
        let fake = fleet();
        let none: [&str; 0] = [];
        let err = fake
            .engine()
            .reconcile_members("lab", &none, MembershipMode::Add)
            .unwrap_err();
        assert!(matches!(err, Error::Spec(reconcile::Error::Validation { .. })));
        assert_eq!(fake.request_count(), 0);
    }

    #[test]
    fn test_dry_run_reports_plan() {
        let fake = fleet();
        fake.add_group("lab", &[1]);
        let report = fake
            .engine_dry_run()
            .reconcile_members("lab", &["edge2"], MembershipMode::Sync)
            .unwrap();
        assert!(report.changed);
        assert_eq!(report.summary.created, 1);
        assert_eq!(report.summary.removed, 1);
        assert_eq!(fake.mutation_count(), 0);
        assert_eq!(fake.group_members("lab"), vec![1]);
    }
}
