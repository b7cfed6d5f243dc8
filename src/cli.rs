use clap::{Parser, Subcommand, Args};
use std::path::PathBuf;
use colored::*;

#[derive(Parser, Debug)]
#[command(
    name = "sharesweep",
    about = "Bulk erase, copy and restructure tool for SharePoint document libraries",
    version,
    long_about = "SharePoint document libraries (and local folder trees) can only\n\
                  delete folders one level at a time. Sharesweep walks the tree\n\
                  for you and keeps a log sheet of what it touched.\n\n\
                  Features:\n\
                  • Erase: bottom-up recursive folder removal, safe to re-run\n\
                  • Browse: menu-driven navigation with copy and erase actions\n\
                  • Copy: subfolders through a name mapping, or plain files\n\
                  • Restructure: rename and create folders across sibling units"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable safe mode (preview only, no changes)
    #[arg(long, global = true)]
    pub safe: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Use this config file instead of ~/.sharesweep.json
    #[arg(long, global = true, env = "SHARESWEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Work on a local folder tree rooted here instead of the configured store
    #[arg(long, global = true)]
    pub local: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Browse folders interactively
    Browse(BrowseArgs),

    /// Delete a folder and everything beneath it
    Erase(EraseArgs),

    /// List subfolders and files of a folder
    List(PathArgs),

    /// Append the subfolder listing of a folder to the log sheet
    Store(PathArgs),

    /// Copy the folder SOURCE itself into DEST
    CopyFolder(CopyArgs),

    /// Copy every subfolder of SOURCE below DEST, applying the folder mapping
    CopyFolders(CopyArgs),

    /// Merge SOURCE into an existing structure under DEST, applying the folder mapping
    StructureCopy(CopyArgs),

    /// Copy every file of SOURCE into DEST
    CopyFiles(CopyArgs),

    /// Rename and create folders inside every subfolder of ROOT
    Restructure(RestructureArgs),

    /// Show configuration
    Config,

    /// Show help and examples
    ShowHelp,
}

#[derive(Args, Debug)]
pub struct BrowseArgs {
    /// Folder to start in (asked for when omitted)
    pub path: Option<String>,
}

#[derive(Args, Debug)]
pub struct EraseArgs {
    /// Folder to erase
    pub path: String,

    /// Show what would be deleted without deleting
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompts
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct PathArgs {
    /// Folder path
    pub path: String,
}

#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Source folder
    pub source: String,

    /// Destination folder
    pub destination: String,
}

#[derive(Args, Debug)]
pub struct RestructureArgs {
    /// Folder whose subfolders are restructured
    pub root: String,

    /// Rename subfolder FROM to TO inside each unit
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
    pub rename: Option<Vec<String>>,

    /// Folder to create inside each unit (repeatable)
    #[arg(long = "create", value_name = "NAME")]
    pub create: Vec<String>,
}

impl Cli {
    /// Print help with examples
    pub fn print_help() {
        println!("{}", "🧹 SHARESWEEP - DOCUMENT LIBRARY CLEANUP TOOL".bold().green());
        println!();
        println!("{}", "USAGE:".bold());
        println!("  sharesweep [OPTIONS] <COMMAND>");
        println!();
        println!("{}", "OPTIONS:".bold());
        println!("  --safe           Safe mode (preview only, no changes)");
        println!("  -v, --verbose    Verbose output");
        println!("  --no-color       Disable colored output");
        println!("  --config FILE    Use another config file");
        println!("  --local ROOT     Work on a local folder tree");
        println!();
        println!("{}", "COMMANDS:".bold());
        println!();
        println!("  {}  Browse folders interactively", "browse".cyan().bold());
        println!("      sharesweep browse \"/sites/team/Shared Documents\"");
        println!();
        println!("  {}  Erase a folder tree", "erase".cyan().bold());
        println!("      sharesweep erase \"/sites/team/Shared Documents/Old\" --dry-run");
        println!("      sharesweep erase \"/sites/team/Shared Documents/Old\" -y");
        println!();
        println!("  {}  List a folder", "list".cyan().bold());
        println!("      sharesweep list \"/sites/team/Shared Documents\"");
        println!();
        println!("  {}  Log a folder listing to the sheet", "store".cyan().bold());
        println!("      sharesweep store \"/sites/team/Shared Documents\"");
        println!();
        println!("  {}  Copy a folder into another one", "copy-folder".cyan().bold());
        println!("      sharesweep copy-folder /sites/old/Docs/2023 /sites/new/Docs");
        println!();
        println!("  {}  Copy subfolders with name mapping", "copy-folders".cyan().bold());
        println!("      sharesweep copy-folders /sites/old/Docs /sites/new/Docs");
        println!();
        println!("  {}  Copy files", "copy-files".cyan().bold());
        println!("      sharesweep copy-files /sites/old/Docs/2023 /sites/new/Docs/2023");
        println!();
        println!("  {}  Merge into an existing structure", "structure-copy".cyan().bold());
        println!("      sharesweep structure-copy /sites/old/Docs /sites/new/Docs");
        println!();
        println!("  {}  Rename and create folders in every unit", "restructure".cyan().bold());
        println!("      sharesweep restructure /sites/ops/Stores --rename Folder_01 Folder_1 \\");
        println!("          --create Folder_1 --create Folder_2");
        println!();
        println!("{}", "TOKEN:".bold());
        println!("  The SharePoint access token is read from the environment variable");
        println!("  named in the config (SHAREPOINT_TOKEN by default).");
    }
}
