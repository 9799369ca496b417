use anyhow::Result;
use colored::Colorize;
use reconcile::Report;

use super::{Session, confirm, emit_json, emit_report};
use crate::Context;
use crate::ui;

pub fn present(ctx: &Context, specs: &[String]) -> Result<()> {
    let session = Session::open(ctx)?;
    let report = session.engine(ctx).ensure_groups_present(specs)?;
    emit_report(ctx, "Groups", &report)
}

pub fn absent(ctx: &Context, specs: &[String], yes: bool) -> Result<()> {
    let session = Session::open(ctx)?;
    let engine = session.engine(ctx);

    let targets = engine.groups_to_remove(specs)?;
    if targets.is_empty() {
        return emit_report(ctx, "Groups", &Report::unchanged(Vec::new()));
    }

    if !ctx.json && !ctx.quiet {
        ui::header("Groups to delete");
        for group in &targets {
            println!(
                "  {} {} {}",
                "-".red(),
                group.name,
                format!("(ID {}, {} devices)", group.id, group.devices.len()).dimmed()
            );
        }
        println!();
    }
    if !confirm(ctx, yes, &format!("Delete {} groups?", targets.len()))? {
        ui::info("Aborted");
        return Ok(());
    }

    let report = engine.remove_groups(targets)?;
    emit_report(ctx, "Groups", &report)
}

pub fn list(ctx: &Context, prefix: Option<&str>) -> Result<()> {
    let session = Session::open(ctx)?;
    let pb = ui::spinner("Fetching groups", ctx.quiet || ctx.json);
    let groups = session
        .client_with_progress("groups", &pb)
        .list_groups(prefix);
    pb.finish_and_clear();
    let groups = groups?;

    if ctx.json {
        return emit_json(&groups);
    }
    ui::header(&format!("Groups ({})", groups.len()));
    for group in &groups {
        println!(
            "  {:<32} {} {}",
            group.name,
            format!("ID {}", group.id).dimmed(),
            format!("{} devices", group.devices.len()).dimmed()
        );
    }
    Ok(())
}
