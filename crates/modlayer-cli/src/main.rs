use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use modlayer_core::ComponentState;
use modlayer_installer::ManagerUpdateMode;

mod completion;
mod dispatch;
mod download;
mod locate;
mod render;

use completion::CliCompletionShell;

const EXIT_FAILURE: u8 = 1;
const EXIT_RESTART_REQUESTED: u8 = 3;
const MANAGER_UPDATE_FLAG: &str = "--manager-update";

#[derive(Parser, Debug)]
#[command(name = "modlayer")]
#[command(about = "Layered mod archive installer with reversible overlays", long_about = None)]
struct Cli {
    /// Update the manager itself before touching any mods.
    #[arg(long, value_enum)]
    manager_update: Option<ManagerUpdateArg>,
    /// Download newer mod archives named by the component spec.
    #[arg(long, value_enum)]
    mods_update: Option<YesNo>,
    /// Requested state for every configured mod component.
    #[arg(long, value_enum)]
    mods_enable: Option<ModsEnableArg>,
    /// Management install root (defaults to three levels above
    /// `Components/<manager>/Current`).
    #[arg(long)]
    install_root: Option<PathBuf>,
    /// Target application directory (defaults to a Steam library lookup).
    #[arg(long)]
    app_dir: Option<PathBuf>,
    #[arg(long)]
    spec_url: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ManagerUpdateArg {
    Yes,
    No,
    CheckInstallOnly,
}

impl From<ManagerUpdateArg> for ManagerUpdateMode {
    fn from(value: ManagerUpdateArg) -> Self {
        match value {
            ManagerUpdateArg::Yes => Self::Yes,
            ManagerUpdateArg::No => Self::No,
            ManagerUpdateArg::CheckInstallOnly => Self::CheckInstallOnly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum YesNo {
    Yes,
    No,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ModsEnableArg {
    Yes,
    No,
    Maintain,
    /// Uninstall every component and delete its downloaded archive.
    Purge,
}

impl ModsEnableArg {
    fn requested_state(self) -> Option<ComponentState> {
        match self {
            Self::Yes => Some(ComponentState::Installed),
            Self::No => Some(ComponentState::Uninstalled),
            Self::Maintain => Some(ComponentState::Maintain),
            Self::Purge => None,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let raw_args = std::env::args().skip(1).collect::<Vec<_>>();

    match dispatch::run_cli(cli, &raw_args) {
        Ok(status) => status.exit_code(),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
