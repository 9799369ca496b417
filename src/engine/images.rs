//! Image builds: create a new image, or build the next version of one

use super::{Engine, Result};
use clap::ValueEnum;
use edgeapi::models::{CommitSpec, ImageDefinition, Installer, PackageSpec};
use reconcile::{ApplyResult, ItemResult, Phase, Report};
use std::fmt;

const OUTPUT_COMMIT: &str = "rhel-edge-commit";
const OUTPUT_INSTALLER: &str = "rhel-edge-installer";
const STATUS_BUILDING: &str = "BUILDING";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Distribution {
    #[value(name = "rhel-84")]
    Rhel84,
    #[default]
    #[value(name = "rhel-85")]
    Rhel85,
}

impl Distribution {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rhel84 => "rhel-84",
            Self::Rhel85 => "rhel-85",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Arch {
    #[default]
    #[value(name = "x86_64")]
    X86_64,
    #[value(name = "aarch64")]
    Aarch64,
}

impl Arch {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
        }
    }
}

/// A new image to build
#[derive(Debug, Clone, Default)]
pub struct ImageRequest {
    pub name: String,
    pub distribution: Distribution,
    pub arch: Arch,
    pub packages: Vec<String>,
    pub ssh_user: String,
    pub ssh_key: String,
    /// Also produce an installer ISO
    pub installer: bool,
}

impl ImageRequest {
    fn definition(&self) -> ImageDefinition {
        let mut output_types = vec![OUTPUT_COMMIT.to_string()];
        if self.installer {
            output_types.push(OUTPUT_INSTALLER.to_string());
        }
        ImageDefinition {
            name: self.name.clone(),
            version: 0,
            distribution: self.distribution.as_str().to_string(),
            image_type: OUTPUT_INSTALLER.to_string(),
            packages: package_specs(&self.packages),
            output_types,
            commit: CommitSpec {
                arch: self.arch.as_str().to_string(),
            },
            installer: Some(Installer {
                username: self.ssh_user.clone(),
                sshkey: self.ssh_key.clone(),
            }),
            description: format!("Edge image {}", self.name),
        }
    }
}

fn package_specs(names: &[String]) -> Vec<PackageSpec> {
    names
        .iter()
        .map(|name| PackageSpec { name: name.clone() })
        .collect()
}

impl Engine<'_> {
    /// Start a build for a new image unless an image set of that name exists
    pub fn create_image(&self, request: &ImageRequest) -> Result<Report> {
        if request.name.trim().is_empty() {
            return Err(reconcile::Error::validation("name", "image name is empty").into());
        }
        if request.ssh_user.is_empty() || request.ssh_key.is_empty() {
            return Err(reconcile::Error::validation(
                request.name.as_str(),
                "an ssh user and public key are required",
            )
            .into());
        }

        self.phase(Phase::Fetch, "image sets");
        let existing = reconcile::expect_unique(
            "image set",
            &request.name,
            self.client().image_sets_named(&request.name)?,
            |s| s.id.to_string(),
        )?;
        if let Some(set) = existing {
            log::info!(
                "image set {} already exists (ID {}, version {})",
                set.name,
                set.id,
                set.version
            );
            return Ok(Report::unchanged(vec![ItemResult::new(
                request.name.as_str(),
                ApplyResult::NoChange,
            )]));
        }

        let item = ItemResult::new(request.name.as_str(), ApplyResult::Created);
        if !self.dry_run() {
            log::info!(
                "building image {} ({}, {})",
                request.name,
                request.distribution,
                request.arch.as_str()
            );
            self.client().create_image(&request.definition())?;
        }
        Ok(Report::from_items(vec![item], self.dry_run()))
    }

    /// Build the next version of the image set `image_id` belongs to
    ///
    /// The new version is based on the set's latest image and adds
    /// `packages`. A set whose latest image is still building is left alone.
    pub fn update_image(&self, image_id: u64, packages: &[String]) -> Result<Report> {
        self.phase(Phase::Fetch, &format!("image {image_id}"));
        let image = self.client().image(image_id)?;
        let set_id = image.image_set_id.ok_or_else(|| {
            edgeapi::Error::invalid(
                format!("{}/images/{image_id}", edgeapi::EDGE_API),
                "image has no image set",
            )
        })?;
        let detail = self.client().image_set(set_id)?;
        let latest = detail.latest().ok_or_else(|| {
            reconcile::Error::not_found(
                "image version",
                format!("{} v{}", detail.image_set.name, detail.image_set.version),
            )
        })?;

        let name = image.name.clone();
        if latest.status == STATUS_BUILDING {
            return Ok(Report::unchanged(vec![ItemResult::new(
                name,
                ApplyResult::Skipped {
                    reason: format!("version {} is still building", latest.version),
                },
            )]));
        }

        self.phase(Phase::Plan, "next image version");
        let definition = ImageDefinition {
            name: image.name.clone(),
            version: detail.image_set.version + 1,
            distribution: image.distribution.clone(),
            image_type: OUTPUT_COMMIT.to_string(),
            packages: package_specs(packages),
            output_types: vec![OUTPUT_COMMIT.to_string()],
            commit: CommitSpec {
                arch: image
                    .arch()
                    .unwrap_or(Arch::default().as_str())
                    .to_string(),
            },
            installer: None,
            description: format!("Edge image {name}, version {}", detail.image_set.version + 1),
        };

        let item = ItemResult::new(name, ApplyResult::Modified);
        if !self.dry_run() {
            log::info!(
                "building {} version {} from image {}",
                definition.name,
                definition.version,
                latest.id
            );
            self.client().update_image(latest.id, &definition)?;
        }
        Ok(Report::from_items(vec![item], self.dry_run()))
    }
}
