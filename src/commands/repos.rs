use anyhow::Result;

use super::{Session, emit_report};
use crate::Context;

pub fn present(ctx: &Context, name: &str, url: &str) -> Result<()> {
    let session = Session::open(ctx)?;
    let report = session.engine(ctx).ensure_repo_present(name, url)?;
    emit_report(ctx, "Repositories", &report)
}

pub fn absent(ctx: &Context, name: &str) -> Result<()> {
    let session = Session::open(ctx)?;
    let report = session.engine(ctx).ensure_repo_absent(name)?;
    emit_report(ctx, "Repositories", &report)
}
