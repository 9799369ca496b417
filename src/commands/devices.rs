use anyhow::Result;
use colored::Colorize;
use edgeapi::models::Device;

use super::{Session, emit_json};
use crate::Context;
use crate::ui;

fn status(device: &Device) -> String {
    let status = if device.status.is_empty() {
        "unknown"
    } else {
        device.status.as_str()
    };
    if device.update_available {
        format!("{status}, update available").yellow().to_string()
    } else {
        status.to_string()
    }
}

pub fn list(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    let pb = ui::spinner("Fetching devices", ctx.quiet || ctx.json);
    let devices = session.client_with_progress("devices", &pb).list_devices();
    pb.finish_and_clear();
    let devices = devices?;

    if ctx.json {
        return emit_json(&devices);
    }
    ui::header(&format!("Devices ({})", devices.len()));
    for device in &devices {
        println!(
            "  {:<28} {} {}",
            device.label(),
            device.uuid.dimmed(),
            status(device)
        );
    }
    Ok(())
}

pub fn show(ctx: &Context, id: &str) -> Result<()> {
    let session = Session::open(ctx)?;
    let device = session.client().device(id)?;

    if ctx.json {
        return emit_json(&device);
    }
    ui::header(device.label());
    ui::kv("ID", &device.id.to_string());
    ui::kv("UUID", &device.uuid);
    ui::kv("Image", &device.image_id.to_string());
    if let Some(set) = device.image_set_id {
        ui::kv("Image set", &set.to_string());
    }
    ui::kv("Status", &status(&device));
    if !device.available_hash.is_empty() {
        ui::kv("Pending commit", &device.available_hash);
    }
    Ok(())
}
