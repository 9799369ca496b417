use anyhow::Result;
use colored::Colorize;

use super::images::line;
use super::{Session, emit_json};
use crate::Context;
use crate::ui;

pub fn show(ctx: &Context, id: u64) -> Result<()> {
    let session = Session::open(ctx)?;
    let detail = session.client().image_set(id)?;
    let images: Vec<_> = detail.images.iter().map(|e| &e.image).collect();

    if ctx.json {
        return emit_json(&serde_json::json!({
            "image_set": detail.image_set,
            "images": images,
        }));
    }
    ui::header(&detail.image_set.name);
    ui::kv("ID", &detail.image_set.id.to_string());
    ui::kv("Version", &detail.image_set.version.to_string());
    if let Some(latest) = detail.latest() {
        ui::kv("Latest image", &latest.id.to_string());
    }
    println!();
    images.into_iter().for_each(line);
    Ok(())
}

pub fn list(ctx: &Context, name: Option<&str>) -> Result<()> {
    let session = Session::open(ctx)?;
    let sets = match name {
        Some(name) => {
            let matches = session.client().image_sets_named(name)?;
            vec![reconcile::expect_one("image set", name, matches, |s| {
                s.id.to_string()
            })?]
        }
        None => {
            let pb = ui::spinner("Fetching image sets", ctx.quiet || ctx.json);
            let sets = session
                .client_with_progress("image sets", &pb)
                .list_image_sets();
            pb.finish_and_clear();
            sets?
        }
    };

    if ctx.json {
        return emit_json(&sets);
    }
    ui::header(&format!("Image sets ({})", sets.len()));
    for set in &sets {
        println!(
            "  {:<8} {:<32} {}",
            set.id,
            set.name,
            format!("v{}", set.version).dimmed()
        );
    }
    Ok(())
}

pub fn versions(ctx: &Context, id: u64) -> Result<()> {
    let session = Session::open(ctx)?;
    let pb = ui::spinner("Fetching versions", ctx.quiet || ctx.json);
    let images = session
        .client_with_progress("versions", &pb)
        .image_set_versions(id);
    pb.finish_and_clear();
    let images = images?;

    if ctx.json {
        return emit_json(&images);
    }
    ui::header(&format!("Image set {id} ({} versions)", images.len()));
    images.iter().for_each(line);
    Ok(())
}
