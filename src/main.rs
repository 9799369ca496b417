mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{
    Cli, Command, DevicesCommand, GroupsCommand, HostsCommand, ImageSetsCommand, ImagesCommand,
    MembersCommand, ReposCommand,
};
use engine::images::ImageRequest;
use engine::members::MembershipMode;
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub json: bool,
    pub dry_run: bool,
    pub config: Option<PathBuf>,
    pub server: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        json: cli.json,
        dry_run: cli.dry_run,
        config: cli.config,
        server: cli.server,
    };
    log::trace!("verbosity {}", ctx.verbose);

    match cli.command {
        Command::Groups(cmd) => match cmd {
            GroupsCommand::Present { specs } => commands::groups::present(&ctx, &specs),
            GroupsCommand::Absent { specs, yes } => commands::groups::absent(&ctx, &specs, yes),
            GroupsCommand::List { prefix } => commands::groups::list(&ctx, prefix.as_deref()),
        },
        Command::Members(cmd) => match cmd {
            MembersCommand::Add(args) => commands::members::run(&ctx, &args, MembershipMode::Add),
            MembersCommand::Remove(args) => {
                commands::members::run(&ctx, &args, MembershipMode::Remove)
            }
            MembersCommand::Sync(args) => {
                commands::members::run(&ctx, &args, MembershipMode::Sync)
            }
            MembersCommand::List { group } => commands::members::list(&ctx, &group),
        },
        Command::Update(args) => commands::update::run(&ctx, args),
        Command::Devices(cmd) => match cmd {
            DevicesCommand::List => commands::devices::list(&ctx),
            DevicesCommand::Show { device } => commands::devices::show(&ctx, &device),
        },
        Command::Hosts(cmd) => match cmd {
            HostsCommand::List { filters, ipv4 } => {
                commands::hosts::list(&ctx, &filters, ipv4.as_deref())
            }
        },
        Command::Images(cmd) => match cmd {
            ImagesCommand::Show { image } => commands::images::show(&ctx, &image),
            ImagesCommand::List => commands::images::list(&ctx),
            ImagesCommand::Create {
                name,
                distribution,
                arch,
                packages,
                ssh_user,
                ssh_key,
                no_installer,
            } => commands::images::create(
                &ctx,
                &ImageRequest {
                    name,
                    distribution,
                    arch,
                    packages,
                    ssh_user,
                    ssh_key,
                    installer: !no_installer,
                },
            ),
            ImagesCommand::Update { id, packages } => {
                commands::images::update(&ctx, id, &packages)
            }
        },
        Command::Imagesets(cmd) => match cmd {
            ImageSetsCommand::Show { id } => commands::imagesets::show(&ctx, id),
            ImageSetsCommand::List { name } => commands::imagesets::list(&ctx, name.as_deref()),
            ImageSetsCommand::Versions { id } => commands::imagesets::versions(&ctx, id),
        },
        Command::Repos(cmd) => match cmd {
            ReposCommand::Present { name, url } => commands::repos::present(&ctx, &name, &url),
            ReposCommand::Absent { name } => commands::repos::absent(&ctx, &name),
        },
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "edgectl", &mut io::stdout());
            Ok(())
        }
    }
}
