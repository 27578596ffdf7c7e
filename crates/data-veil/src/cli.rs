use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "data-veil", version, about = "Masking and row access policy engine")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Path to the policy file (overrides config file setting)
    #[arg(short, long)]
    pub policy_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the policy file and report what it declares
    Validate,

    /// Evaluate a masking policy against a value
    Mask {
        /// Name of the masking policy
        #[arg(long)]
        policy: String,

        #[command(flatten)]
        caller: CallerArgs,

        /// The raw value to transform
        value: String,
    },

    /// Evaluate a row access policy against a row discriminant
    Filter {
        /// Name of the row access policy
        #[arg(long)]
        policy: String,

        #[command(flatten)]
        caller: CallerArgs,

        /// The row's discriminant column value
        discriminant: String,
    },

    /// Resolve the policies bound to a table cell and apply both
    Cell {
        /// Table the cell belongs to
        #[arg(long)]
        table: String,

        /// Column the cell belongs to
        #[arg(long)]
        column: String,

        /// The row's discriminant column value
        #[arg(long)]
        discriminant: String,

        #[command(flatten)]
        caller: CallerArgs,

        /// The raw cell value
        value: String,
    },
}

/// Caller identity shared by every evaluation subcommand.
#[derive(Args, Debug)]
pub struct CallerArgs {
    /// Active role of the caller
    #[arg(long)]
    pub role: String,

    /// User identity of the caller
    #[arg(long, default_value = "anonymous")]
    pub user: String,

    /// Secondary roles held by the caller (repeatable)
    #[arg(long = "secondary-role")]
    pub secondary_roles: Vec<String>,
}
