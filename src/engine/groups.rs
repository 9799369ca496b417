//! Group lifecycle: present / absent

use super::{BatchFailure, Engine, Result, settle};
use edgeapi::models::Group;
use reconcile::{ApplyResult, ItemResult, Phase, Report, SetDiff, TargetSpec};
use std::collections::BTreeSet;

const KIND: &str = "group";

impl Engine<'_> {
    /// The single group named exactly `name`, if any
    pub fn find_group(&self, name: &str) -> Result<Option<Group>> {
        let matches = self.client().groups_named(name)?;
        Ok(reconcile::expect_unique(KIND, name, matches, |g| {
            g.id.to_string()
        })?)
    }

    /// Create every group the specifications name that does not exist yet
    pub fn ensure_groups_present<S: AsRef<str>>(&self, specs: &[S]) -> Result<Report> {
        self.phase(Phase::Expand, "group specifications");
        let specs = reconcile::parse_all(specs)?;
        let names = reconcile::expand_all(&specs)?;

        self.phase(Phase::Fetch, &format!("{} group names", names.len()));
        let mut observed = BTreeSet::new();
        for name in &names {
            if self.find_group(name)?.is_some() {
                observed.insert(name.clone());
            }
        }

        self.phase(Phase::Diff, "desired against observed");
        let desired: BTreeSet<String> = names.iter().cloned().collect();
        let diff = SetDiff::compute(&desired, &observed).additions_only();

        let mut items: Vec<ItemResult> = names
            .iter()
            .filter(|n| observed.contains(*n))
            .map(|n| ItemResult::new(n.as_str(), ApplyResult::NoChange))
            .collect();
        if diff.is_noop() {
            return Ok(Report::unchanged(items));
        }

        self.phase(Phase::Execute, &format!("create {} groups", diff.to_add.len()));
        let mut created = Vec::new();
        let mut failed = Vec::new();
        // Creation follows expansion order, not set order
        for name in names.iter().filter(|n| diff.to_add.contains(*n)) {
            if self.dry_run() {
                items.push(ItemResult::new(name.as_str(), ApplyResult::Created));
                continue;
            }
            log::info!("creating group {name}");
            match self.client().create_group(name) {
                Ok(_) => {
                    items.push(ItemResult::new(name.as_str(), ApplyResult::Created));
                    created.push(name.clone());
                }
                Err(error) => {
                    items.push(ItemResult::new(
                        name.as_str(),
                        ApplyResult::Failed {
                            error: error.to_string(),
                        },
                    ));
                    failed.push(BatchFailure {
                        key: name.clone(),
                        error,
                    });
                }
            }
        }
        settle(created.clone(), failed)?;

        let mut report = Report::from_items(items, self.dry_run());
        report.verification = self.verify(created, |pending| {
            let mut missing = Vec::new();
            for name in pending {
                if self.client().groups_named(name)?.is_empty() {
                    missing.push(name.clone());
                }
            }
            Ok(missing)
        })?;
        Ok(report)
    }

    /// Resolve the existing groups the specifications select
    ///
    /// Wildcards list groups narrowed by their literal prefix and match
    /// client-side. Literal and range names are looked up one by one; names
    /// that do not exist are skipped.
    pub fn groups_to_remove<S: AsRef<str>>(&self, specs: &[S]) -> Result<Vec<Group>> {
        self.phase(Phase::Expand, "group specifications");
        let specs = reconcile::parse_all(specs)?;

        self.phase(Phase::Fetch, "existing groups");
        let mut targets: Vec<Group> = Vec::new();
        let mut seen = BTreeSet::new();
        for spec in &specs {
            let found: Vec<Group> = match spec {
                TargetSpec::Wildcard { .. } => {
                    let prefix = spec.search_prefix();
                    self.client()
                        .list_groups(Some(prefix))?
                        .into_iter()
                        .filter(|g| spec.matches(&g.name))
                        .collect()
                }
                _ => {
                    let mut found = Vec::new();
                    for name in spec.expand()? {
                        found.extend(self.find_group(&name)?);
                    }
                    found
                }
            };
            targets.extend(found.into_iter().filter(|g| seen.insert(g.id)));
        }
        Ok(targets)
    }

    /// Delete the given groups by ID
    pub fn remove_groups(&self, targets: Vec<Group>) -> Result<Report> {
        if targets.is_empty() {
            return Ok(Report::unchanged(Vec::new()));
        }

        self.phase(Phase::Execute, &format!("delete {} groups", targets.len()));
        let mut items = Vec::new();
        let mut removed = Vec::new();
        let mut failed = Vec::new();
        for group in targets {
            if self.dry_run() {
                items.push(ItemResult::new(group.name, ApplyResult::Removed));
                continue;
            }
            log::info!("deleting group {} (ID {})", group.name, group.id);
            match self.client().delete_group(group.id) {
                Ok(_) => {
                    items.push(ItemResult::new(group.name.as_str(), ApplyResult::Removed));
                    removed.push(group.name);
                }
                Err(error) => {
                    items.push(ItemResult::new(
                        group.name.as_str(),
                        ApplyResult::Failed {
                            error: error.to_string(),
                        },
                    ));
                    failed.push(BatchFailure {
                        key: group.name,
                        error,
                    });
                }
            }
        }
        settle(removed.clone(), failed)?;

        let mut report = Report::from_items(items, self.dry_run());
        report.verification = self.verify(removed, |pending| {
            let mut lingering = Vec::new();
            for name in pending {
                if !self.client().groups_named(name)?.is_empty() {
                    lingering.push(name.clone());
                }
            }
            Ok(lingering)
        })?;
        Ok(report)
    }

    /// Delete every existing group the specifications select
    pub fn ensure_groups_absent<S: AsRef<str>>(&self, specs: &[S]) -> Result<Report> {
        let targets = self.groups_to_remove(specs)?;
        self.remove_groups(targets)
    }
}
