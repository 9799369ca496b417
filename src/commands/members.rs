use anyhow::Result;
use colored::Colorize;

use super::{Session, emit_json, emit_report};
use crate::Context;
use crate::cli::MembersArgs;
use crate::engine::members::MembershipMode;
use crate::ui;

pub fn run(ctx: &Context, args: &MembersArgs, mode: MembershipMode) -> Result<()> {
    let session = Session::open(ctx)?;
    let report = session
        .engine(ctx)
        .reconcile_members(&args.group, &args.devices, mode)?;
    emit_report(ctx, &format!("Members of {}", args.group), &report)
}

pub fn list(ctx: &Context, group: &str) -> Result<()> {
    let session = Session::open(ctx)?;
    let client = session.client();
    let found = reconcile::expect_one("group", group, client.groups_named(group)?, |g| {
        g.id.to_string()
    })?;
    let devices = client.group_devices(found.id)?;

    if ctx.json {
        return emit_json(&devices);
    }
    ui::header(&format!("{} ({} devices)", found.name, devices.len()));
    for device in &devices {
        println!("  {:<32} {}", device.label(), device.uuid.dimmed());
    }
    Ok(())
}
