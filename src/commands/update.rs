use anyhow::Result;
use colored::Colorize;

use super::{Session, confirm, emit_report};
use crate::Context;
use crate::cli::UpdateArgs;
use crate::engine::updates::{UpdatePlan, UpdateRequest};
use crate::ui;

fn show_plan(plan: &UpdatePlan) {
    ui::header("Update plan");
    for batch in &plan.batches {
        println!(
            "  {} image set {} → version {} {}",
            "~".yellow(),
            batch.image_set,
            batch.version,
            format!("(commit {})", batch.commit_id).dimmed()
        );
        for device in &batch.devices {
            ui::dim(device.label());
        }
    }
    if !plan.unchanged.is_empty() {
        ui::kv("Not updated", &plan.unchanged.len().to_string());
    }
    println!();
}

pub fn run(ctx: &Context, args: UpdateArgs) -> Result<()> {
    let session = Session::open(ctx)?;
    let engine = session.engine(ctx);
    let request = UpdateRequest {
        devices: args.devices,
        groups: args.groups,
        version: args.version,
    };

    let plan = engine.plan_update(&request)?;
    if !plan.is_empty() && !ctx.json && !ctx.quiet {
        show_plan(&plan);
    }
    if !plan.is_empty() {
        let devices: usize = plan.batches.iter().map(|b| b.devices.len()).sum();
        if !confirm(ctx, args.yes, &format!("Update {devices} devices?"))? {
            ui::info("Aborted");
            return Ok(());
        }
    }

    let report = engine.apply_update(plan)?;
    emit_report(ctx, "Updates", &report)
}
