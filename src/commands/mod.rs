// Reconciling commands
pub mod groups;
pub mod members;
pub mod repos;
pub mod update;

// Read-only commands
pub mod devices;
pub mod hosts;
pub mod images;
pub mod imagesets;

use anyhow::{Context as _, Result};
use dialoguer::Confirm;
use edgeapi::{EdgeClient, HttpGateway};
use indicatif::ProgressBar;
use reconcile::Report;
use serde::Serialize;

use crate::Context;
use crate::config::Config;
use crate::engine::Engine;
use crate::paths;
use crate::ui;

/// Resolved configuration plus a connected gateway
pub struct Session {
    pub config: Config,
    gateway: HttpGateway,
}

impl Session {
    pub fn open(ctx: &Context) -> Result<Self> {
        let path = match &ctx.config {
            Some(path) => path.clone(),
            None => paths::config_file()?,
        };
        let config = Config::load(&path)?
            .with_env(|key| std::env::var(key).ok())
            .with_server(ctx.server.as_deref());
        config
            .validate()
            .with_context(|| format!("Invalid configuration ({})", paths::display(&path)))?;
        log::debug!("Server: {}", config.server);

        let gateway = config.gateway();
        Ok(Self { config, gateway })
    }

    pub fn client(&self) -> EdgeClient<'_> {
        EdgeClient::new(&self.gateway).with_page_size(self.config.page_size)
    }

    /// Client that reports page progress on `pb`
    pub fn client_with_progress<'a>(&'a self, what: &'a str, pb: &'a ProgressBar) -> EdgeClient<'a> {
        self.client()
            .with_progress(move |fetched, total| pb.set_message(ui::fetched(what, fetched, total)))
    }

    pub fn engine(&self, ctx: &Context) -> Engine<'_> {
        Engine::new(self.client(), self.config.execute_options(ctx.dry_run))
    }
}

/// Print a report as JSON or for humans
pub fn emit_report(ctx: &Context, title: &str, report: &Report) -> Result<()> {
    if ctx.json {
        return emit_json(report);
    }
    if !ctx.quiet || report.changed {
        ui::report(title, report);
    }
    Ok(())
}

pub fn emit_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to encode JSON")?;
    println!("{text}");
    Ok(())
}

/// Ask before a destructive step; `--yes`, `--dry-run` and `--json` skip it
pub fn confirm(ctx: &Context, yes: bool, prompt: &str) -> Result<bool> {
    if yes || ctx.dry_run || ctx.json {
        return Ok(true);
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}
