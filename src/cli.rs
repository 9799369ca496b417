use crate::engine::images::{Arch, Distribution};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "edgectl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative fleet management for edge devices", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: <config dir>/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Server URL (overrides config and EDGECTL_SERVER)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Print machine-readable JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Compute and show the plan without changing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or delete device groups
    #[command(subcommand)]
    Groups(GroupsCommand),

    /// Manage the devices in a group
    #[command(subcommand)]
    Members(MembersCommand),

    /// Update devices to the latest (or a pinned) image version
    #[command(disable_version_flag = true)]
    Update(UpdateArgs),

    /// Inspect edge devices
    #[command(subcommand)]
    Devices(DevicesCommand),

    /// Query inventory hosts
    #[command(subcommand)]
    Hosts(HostsCommand),

    /// Build and inspect images
    #[command(subcommand)]
    Images(ImagesCommand),

    /// Inspect image sets
    #[command(subcommand)]
    Imagesets(ImageSetsCommand),

    /// Register or remove custom package repositories
    #[command(subcommand)]
    Repos(ReposCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Groups
// ============================================================================

#[derive(Subcommand)]
pub enum GroupsCommand {
    /// Ensure groups exist (e.g. "lab[1:3]")
    Present {
        /// Group names or ranges
        #[arg(required = true)]
        specs: Vec<String>,
    },

    /// Ensure groups do not exist (ranges and wildcards allowed)
    Absent {
        /// Group names, ranges or wildcards
        #[arg(required = true)]
        specs: Vec<String>,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// List groups
    List {
        /// Only groups whose name starts with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },
}

// ============================================================================
// Members
// ============================================================================

#[derive(Args)]
pub struct MembersArgs {
    /// Group name
    pub group: String,

    /// Device names or UUIDs (ranges and wildcards allowed)
    #[arg(short, long = "device")]
    pub devices: Vec<String>,
}

#[derive(Subcommand)]
pub enum MembersCommand {
    /// Add devices that are not members yet
    Add(MembersArgs),
    /// Remove devices that are members
    Remove(MembersArgs),
    /// Make the membership exactly the given devices
    Sync(MembersArgs),
    /// List the members of a group
    List {
        /// Group name
        group: String,
    },
}

// ============================================================================
// Updates
// ============================================================================

#[derive(Args)]
pub struct UpdateArgs {
    /// Device names or UUIDs (ranges and wildcards allowed)
    #[arg(short, long = "device")]
    pub devices: Vec<String>,

    /// Every device in these groups
    #[arg(short, long = "group")]
    pub groups: Vec<String>,

    /// Pin to this version of the devices' image set
    #[arg(long)]
    pub version: Option<u64>,

    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

// ============================================================================
// Inventory
// ============================================================================

#[derive(Subcommand)]
pub enum DevicesCommand {
    /// List every device
    List,
    /// Show one device
    Show {
        /// Device UUID or ID
        device: String,
    },
}

#[derive(Subcommand)]
pub enum HostsCommand {
    /// List fresh edge hosts
    List {
        /// key=value filter (display_name, fqdn, hostname_or_id, insights_id or a system profile fact)
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// IPv4 pattern, e.g. "192.168.122.[22:199]" or "10.0.[].[]"
        #[arg(long)]
        ipv4: Option<String>,
    },
}

// ============================================================================
// Images
// ============================================================================

#[derive(Subcommand)]
pub enum ImagesCommand {
    /// Show one image
    Show {
        /// Image ID or ostree commit hash
        image: String,
    },

    /// List images
    List,

    /// Build a new image
    Create {
        /// Image name
        name: String,

        #[arg(long, value_enum, default_value_t = Distribution::Rhel85)]
        distribution: Distribution,

        #[arg(long, value_enum, default_value_t = Arch::X86_64)]
        arch: Arch,

        /// Additional package (repeatable)
        #[arg(short, long = "package")]
        packages: Vec<String>,

        /// Initial user on installed devices
        #[arg(long)]
        ssh_user: String,

        /// Public key for that user
        #[arg(long)]
        ssh_key: String,

        /// Only build the commit, no installer ISO
        #[arg(long)]
        no_installer: bool,
    },

    /// Build the next version of an image
    Update {
        /// Image ID
        id: u64,

        /// Additional package (repeatable)
        #[arg(short, long = "package")]
        packages: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum ImageSetsCommand {
    /// Show one image set and its images
    Show {
        /// Image set ID
        id: u64,
    },
    /// List image sets
    List {
        /// Exactly this name
        #[arg(long)]
        name: Option<String>,
    },
    /// List every version in an image set
    Versions {
        /// Image set ID
        id: u64,
    },
}

// ============================================================================
// Repositories
// ============================================================================

#[derive(Subcommand)]
pub enum ReposCommand {
    /// Ensure a repository is registered
    Present {
        name: String,
        /// Absolute http(s) URL
        #[arg(long)]
        url: String,
    },
    /// Ensure no repository has this name
    Absent { name: String },
}
