use anyhow::Result;
use colored::Colorize;
use edgeapi::models::Image;

use super::{Session, emit_json, emit_report};
use crate::Context;
use crate::engine::images::ImageRequest;
use crate::ui;

/// One listing line for an image
pub fn line(image: &Image) {
    println!(
        "  {:<8} {:<28} v{:<4} {} {}",
        image.id,
        image.name,
        image.version,
        image.status,
        image.distribution.dimmed()
    );
}

pub fn show(ctx: &Context, image: &str) -> Result<()> {
    let session = Session::open(ctx)?;
    let client = session.client();
    let image = match image.parse::<u64>() {
        Ok(id) => client.image(id)?,
        Err(_) => client.image_by_hash(image)?,
    };

    if ctx.json {
        return emit_json(&image);
    }
    ui::header(&image.name);
    ui::kv("ID", &image.id.to_string());
    ui::kv("Version", &image.version.to_string());
    if let Some(set) = image.image_set_id {
        ui::kv("Image set", &set.to_string());
    }
    ui::kv("Status", &image.status);
    ui::kv("Distribution", &image.distribution);
    if let Some(arch) = image.arch() {
        ui::kv("Arch", arch);
    }
    ui::kv("Commit", &image.target_commit().to_string());
    if !image.output_types.is_empty() {
        ui::kv("Outputs", &image.output_types.join(", "));
    }
    if !image.packages.is_empty() {
        let names: Vec<&str> = image.packages.iter().map(|p| p.name.as_str()).collect();
        ui::kv("Packages", &names.join(", "));
    }
    Ok(())
}

pub fn list(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    let pb = ui::spinner("Fetching images", ctx.quiet || ctx.json);
    let images = session.client_with_progress("images", &pb).list_images();
    pb.finish_and_clear();
    let images = images?;

    if ctx.json {
        return emit_json(&images);
    }
    ui::header(&format!("Images ({})", images.len()));
    images.iter().for_each(line);
    Ok(())
}

pub fn create(ctx: &Context, request: &ImageRequest) -> Result<()> {
    let session = Session::open(ctx)?;
    let report = session.engine(ctx).create_image(request)?;
    emit_report(ctx, "Image build", &report)
}

pub fn update(ctx: &Context, id: u64, packages: &[String]) -> Result<()> {
    let session = Session::open(ctx)?;
    let report = session.engine(ctx).update_image(id, packages)?;
    emit_report(ctx, "Image build", &report)
}
