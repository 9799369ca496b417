//! Custom package repositories: present / absent

use super::{BatchFailure, Engine, Result, settle};
use reconcile::{ApplyResult, ItemResult, Phase, Report};
use url::Url;

const KIND: &str = "repository";

/// Accept only absolute http(s) URLs
fn check_url(name: &str, url: &str) -> reconcile::Result<()> {
    let parsed = Url::parse(url)
        .map_err(|e| reconcile::Error::validation(name, format!("invalid URL '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" if parsed.has_host() => Ok(()),
        scheme => Err(reconcile::Error::validation(
            name,
            format!("URL must be http or https, got '{scheme}'"),
        )),
    }
}

impl Engine<'_> {
    /// Register `name` at `url` unless a repository with that name exists
    pub fn ensure_repo_present(&self, name: &str, url: &str) -> Result<Report> {
        check_url(name, url)?;

        self.phase(Phase::Fetch, KIND);
        let existing = reconcile::expect_unique(
            KIND,
            name,
            self.client().repos_named(name)?,
            |r| r.id.to_string(),
        )?;
        if let Some(repo) = existing {
            if repo.url != url {
                log::warn!(
                    "repository {name} exists with URL {}, leaving it unchanged",
                    repo.url
                );
            }
            return Ok(Report::unchanged(vec![ItemResult::new(
                name,
                ApplyResult::NoChange,
            )]));
        }

        let item = ItemResult::new(name, ApplyResult::Created);
        if self.dry_run() {
            return Ok(Report::from_items(vec![item], true));
        }

        log::info!("creating repository {name}");
        self.client().create_repo(name, url)?;

        let mut report = Report::from_items(vec![item], false);
        report.verification = self.verify(vec![name.to_string()], |pending| {
            let mut missing = Vec::new();
            for name in pending {
                if self.client().repos_named(name)?.is_empty() {
                    missing.push(name.clone());
                }
            }
            Ok(missing)
        })?;
        Ok(report)
    }

    /// Delete every repository named exactly `name`
    pub fn ensure_repo_absent(&self, name: &str) -> Result<Report> {
        self.phase(Phase::Fetch, KIND);
        let existing = self.client().repos_named(name)?;
        if existing.is_empty() {
            return Ok(Report::unchanged(Vec::new()));
        }

        let mut items = Vec::new();
        let mut removed = Vec::new();
        let mut failed = Vec::new();
        for repo in existing {
            let key = format!("{} (ID {})", repo.name, repo.id);
            if self.dry_run() {
                items.push(ItemResult::new(key, ApplyResult::Removed));
                continue;
            }
            log::info!("deleting repository {key}");
            match self.client().delete_repo(repo.id) {
                Ok(_) => {
                    items.push(ItemResult::new(key.as_str(), ApplyResult::Removed));
                    removed.push(key);
                }
                Err(error) => {
                    items.push(ItemResult::new(
                        key.as_str(),
                        ApplyResult::Failed {
                            error: error.to_string(),
                        },
                    ));
                    failed.push(BatchFailure { key, error });
                }
            }
        }
        let deleted_any = !removed.is_empty();
        settle(removed, failed)?;

        let mut report = Report::from_items(items, self.dry_run());
        let pending = if deleted_any {
            vec![name.to_string()]
        } else {
            Vec::new()
        };
        report.verification = self.verify(pending, |pending| {
            let mut lingering = Vec::new();
            for name in pending {
                if !self.client().repos_named(name)?.is_empty() {
                    lingering.push(name.clone());
                }
            }
            Ok(lingering)
        })?;
        Ok(report)
    }
}
