use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use modlayer_core::{ArchiveSpec, ComponentState, ManagerConfig};
use modlayer_installer::{
    residual_args, ComponentOutcome, ComponentRun, ManagerLayout, ManagerOutcome,
    ManagerUpdateMode, ManagerUpdater, Sequencer,
};

use crate::completion::write_completions_script;
use crate::download::HttpClient;
use crate::locate::{ensure_manager_run_dir, resolve_app_dir, resolve_install_root, STEAM_PATH_ENV};
use crate::render::{TerminalRenderer, TerminalReporter};
use crate::{
    Cli, Commands, ModsEnableArg, YesNo, EXIT_FAILURE, EXIT_RESTART_REQUESTED,
    MANAGER_UPDATE_FLAG,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum RunStatus {
    Completed,
    NoWork,
    RestartRequested,
}

impl RunStatus {
    pub(crate) fn exit_code(self) -> ExitCode {
        match self {
            Self::Completed => ExitCode::SUCCESS,
            Self::NoWork => ExitCode::from(EXIT_FAILURE),
            Self::RestartRequested => ExitCode::from(EXIT_RESTART_REQUESTED),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum ModsAction {
    Apply {
        check_download: bool,
        requested: ComponentState,
    },
    Purge,
}

/// What one invocation will do, derived from the option groups.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct RunPlan {
    pub(crate) manager: ManagerUpdateMode,
    pub(crate) mods: Option<ModsAction>,
}

impl RunPlan {
    /// `None` when no option group was given.
    pub(crate) fn from_cli(cli: &Cli) -> Option<Self> {
        if cli.manager_update.is_none() && cli.mods_update.is_none() && cli.mods_enable.is_none()
        {
            return None;
        }

        let manager = cli
            .manager_update
            .map(ManagerUpdateMode::from)
            .unwrap_or(ManagerUpdateMode::No);
        let mods = if cli.mods_update.is_none() && cli.mods_enable.is_none() {
            None
        } else {
            let enable = cli.mods_enable.unwrap_or(ModsEnableArg::Maintain);
            Some(match enable.requested_state() {
                Some(requested) => ModsAction::Apply {
                    check_download: cli.mods_update == Some(YesNo::Yes),
                    requested,
                },
                None => ModsAction::Purge,
            })
        };

        Some(Self { manager, mods })
    }

    /// Only a manager update or a mods download check consults the spec;
    /// every other run works from local state alone.
    pub(crate) fn needs_spec(&self) -> bool {
        self.manager == ManagerUpdateMode::Yes
            || matches!(
                self.mods,
                Some(ModsAction::Apply {
                    check_download: true,
                    ..
                })
            )
    }
}

pub(crate) fn run_cli(cli: Cli, raw_args: &[String]) -> Result<RunStatus> {
    if let Some(Commands::Completions { shell }) = cli.command {
        let mut stdout = std::io::stdout().lock();
        write_completions_script(shell, &mut stdout)?;
        return Ok(RunStatus::Completed);
    }

    let renderer = TerminalRenderer::current();
    let Some(plan) = RunPlan::from_cli(&cli) else {
        renderer.print_status(
            "warn",
            "no work requested; pass --manager-update, --mods-update or --mods-enable",
        );
        return Ok(RunStatus::NoWork);
    };

    let cwd = env::current_dir().context("failed to read current directory")?;
    let layout = ManagerLayout::new(resolve_install_root(cli.install_root.as_deref(), &cwd)?);
    let config_path = cli.config.clone().unwrap_or_else(|| layout.config_path());
    let config = ManagerConfig::load(&config_path)?;
    if cli.install_root.is_none() {
        ensure_manager_run_dir(&cwd, &config.manager_component)?;
    }

    let target_dir = match plan.mods {
        Some(_) => Some(resolve_app_dir(
            cli.app_dir.as_deref(),
            &config.app_name,
            env::var_os(STEAM_PATH_ENV).map(PathBuf::from),
        )?),
        None => None,
    };

    let http = HttpClient::new(renderer)?;
    let spec = if plan.needs_spec() {
        let spec_url = cli.spec_url.as_deref().unwrap_or(&config.spec_url);
        renderer.print_section("spec");
        let spec = ArchiveSpec::from_spec_url(spec_url, &http.fetch_text(spec_url)?);
        renderer.print_status("ok", &format!("fetched component spec from {spec_url}"));
        spec
    } else {
        ArchiveSpec::default()
    };

    let reporter = TerminalReporter::new(renderer);
    if plan.manager != ManagerUpdateMode::No {
        renderer.print_section("manager");
        let manager = config.manager();
        let outcome = ManagerUpdater::new(&layout, &manager, &spec, &http, &reporter).perform(
            plan.manager,
            residual_args(raw_args, MANAGER_UPDATE_FLAG, "no"),
        )?;
        if let ManagerOutcome::RestartRequested { residual_args } = outcome {
            renderer.print_status(
                "ok",
                &format!(
                    "restart requested; relaunch with: {}",
                    residual_args.join(" ")
                ),
            );
            return Ok(RunStatus::RestartRequested);
        }
    }

    let (Some(mods), Some(target_dir)) = (plan.mods, target_dir) else {
        return Ok(RunStatus::Completed);
    };

    renderer.print_section("mods");
    let sequencer = Sequencer::new(&layout, &spec, &target_dir, &http, &reporter);
    let runs = match mods {
        ModsAction::Apply {
            check_download,
            requested,
        } => sequencer.run(&config.components, check_download, requested)?,
        ModsAction::Purge => sequencer.purge(&config.components)?,
    };
    renderer.print_status("ok", &summarize_runs(&runs));

    Ok(RunStatus::Completed)
}

pub(crate) fn summarize_runs(runs: &[ComponentRun]) -> String {
    let mut changed = 0;
    let mut states = Vec::with_capacity(runs.len());
    for run in runs {
        let (is_change, state) = match &run.outcome {
            ComponentOutcome::NoOp => (false, "unchanged"),
            ComponentOutcome::Applied {
                previous,
                current,
                archive_swapped,
                ..
            } => (previous != current || *archive_swapped, current.as_str()),
            ComponentOutcome::Purged { .. } => (true, "purged"),
        };
        if is_change {
            changed += 1;
        }
        states.push(format!("{}: {state}", run.name));
    }
    format!(
        "{} component(s) processed, {changed} changed ({})",
        runs.len(),
        states.join(", ")
    )
}
