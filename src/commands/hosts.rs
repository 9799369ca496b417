use anyhow::Result;
use colored::Colorize;

use super::{Session, emit_json};
use crate::Context;
use crate::engine::inventory::HostFilter;
use crate::ui;

pub fn list(ctx: &Context, filters: &[String], ipv4: Option<&str>) -> Result<()> {
    let filter = HostFilter::parse(filters, ipv4)?;
    let session = Session::open(ctx)?;

    let pb = ui::spinner("Fetching hosts", ctx.quiet || ctx.json);
    let hosts = session.engine(ctx).select_hosts(&filter);
    pb.finish_and_clear();
    let hosts = hosts?;

    if ctx.json {
        return emit_json(&hosts);
    }
    ui::header(&format!("Hosts ({})", hosts.len()));
    for host in &hosts {
        println!(
            "  {:<32} {} {}",
            host.display_name,
            host.id.dimmed(),
            host.ip_addresses.join(", ")
        );
    }
    Ok(())
}
