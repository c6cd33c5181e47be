use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use modlayer_installer::{OverlayEvent, Reporter};

const NO_COLOR_ENV: &str = "NO_COLOR";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    output_style_from(
        std::env::var_os(NO_COLOR_ENV).is_some_and(|value| !value.is_empty()),
        std::io::stdout().is_terminal(),
    )
}

pub(crate) fn output_style_from(no_color: bool, is_terminal: bool) -> OutputStyle {
    if no_color || !is_terminal {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
}

pub(crate) struct TerminalProgress {
    style: OutputStyle,
    label: String,
    current: u64,
    total: Option<u64>,
    progress_bar: Option<ProgressBar>,
    started_at: Instant,
}

impl TerminalRenderer {
    pub(crate) fn from_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub(crate) fn current() -> Self {
        Self::from_style(current_output_style())
    }

    pub(crate) fn print_status(self, status: &str, message: &str) {
        println!("{}", render_status_line(self.style, status, message));
    }

    pub(crate) fn print_section(self, title: &str) {
        if self.style == OutputStyle::Plain {
            return;
        }
        println!();
        println!("{}", colorize(section_style(), &format!("== {title} ==")));
    }

    pub(crate) fn start_progress(self, label: &str) -> TerminalProgress {
        let progress_bar = if self.style == OutputStyle::Rich {
            let progress_bar = ProgressBar::new(1);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.cyan.bold} {msg:<16} [{bar:20.cyan/blue}] {bytes:>10}/{total_bytes:10} {elapsed_precise}",
            ) {
                progress_bar.set_style(style.tick_chars("|/-\\ ").progress_chars("=>-"));
            }
            progress_bar.set_message(label.to_string());
            progress_bar.enable_steady_tick(Duration::from_millis(80));
            Some(progress_bar)
        } else {
            None
        };

        TerminalProgress {
            style: self.style,
            label: label.to_string(),
            current: 0,
            total: None,
            progress_bar,
            started_at: Instant::now(),
        }
    }
}

impl TerminalProgress {
    pub(crate) fn set(&mut self, current: u64, total: Option<u64>) {
        self.current = current;
        self.total = total;

        let Some(progress_bar) = &self.progress_bar else {
            return;
        };
        progress_bar.set_length(total.unwrap_or(current).max(1));
        progress_bar.set_position(current);
    }

    pub(crate) fn finish_success(mut self) {
        let Some(progress_bar) = self.progress_bar.take() else {
            return;
        };

        progress_bar.finish_and_clear();
        if let Some(line) = render_progress_line(
            self.style,
            &self.label,
            self.current,
            self.total,
            Some(self.started_at.elapsed()),
        ) {
            println!("{line}");
        }
    }

    pub(crate) fn finish_abandon(mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }
}

/// Prints installer events as status lines.
pub(crate) struct TerminalReporter {
    renderer: TerminalRenderer,
}

impl TerminalReporter {
    pub(crate) fn new(renderer: TerminalRenderer) -> Self {
        Self { renderer }
    }
}

impl Reporter for TerminalReporter {
    fn report(&self, component: &str, event: &OverlayEvent) {
        let (status, message) = describe_event(component, event);
        self.renderer.print_status(status, &message);
    }
}

/// Status keyword and message line for one installer event.
pub(crate) fn describe_event(component: &str, event: &OverlayEvent) -> (&'static str, String) {
    let status = if event.is_warning() { "warn" } else { "ok" };
    let message = match event {
        OverlayEvent::CleanedStaleDownload { path } => {
            format!("removed stale download {}", path.display())
        }
        OverlayEvent::CheckingForUpdate => "checking for archive update".to_string(),
        OverlayEvent::NoArchiveInSpec => "no archive listed in spec".to_string(),
        OverlayEvent::ArchiveUpToDate { archive } => format!("archive {archive} is up to date"),
        OverlayEvent::DownloadingArchive { url, .. } => format!("downloading {url}"),
        OverlayEvent::ArchiveSwapped { archive } => {
            format!("archive updated to {}", display_file_name(archive))
        }
        OverlayEvent::Uninstalling => "uninstalling".to_string(),
        OverlayEvent::Uninstalled => "uninstalled".to_string(),
        OverlayEvent::Installing => "installing".to_string(),
        OverlayEvent::Installed => "installed".to_string(),
        OverlayEvent::NothingToInstall => "no archive available; install skipped".to_string(),
        OverlayEvent::BackedUp { path } => format!("backed up {}", path.display()),
        OverlayEvent::Restored { path } => format!("restored {}", path.display()),
        OverlayEvent::Removed { path } => format!("removed {}", path.display()),
        OverlayEvent::DriftPreserved { path } => {
            format!("{} was modified after install; left in place", path.display())
        }
        OverlayEvent::ManagerVerified => "manager install verified".to_string(),
        OverlayEvent::ManagerNotVerified { reason } => {
            format!("manager install not verified: {reason}")
        }
        OverlayEvent::RemovedPreviousInstall { path } => {
            format!("removed previous install {}", path.display())
        }
        OverlayEvent::RestartRequested { params_path } => {
            format!("new build staged; relaunch arguments in {}", params_path.display())
        }
    };
    (status, format!("{component}: {message}"))
}

fn display_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "error" => "[ERR]",
        _ => "[..]",
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn progress_label_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightCyan.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

pub(crate) fn render_progress_line(
    style: OutputStyle,
    label: &str,
    current: u64,
    total: Option<u64>,
    elapsed: Option<Duration>,
) -> Option<String> {
    if style == OutputStyle::Plain {
        return None;
    }

    let counts = match total {
        Some(total) => format!("{}/{}", HumanBytes(current), HumanBytes(total)),
        None => HumanBytes(current).to_string(),
    };
    let suffix = elapsed
        .map(|value| format!(" complete in {}", format_elapsed(value)))
        .unwrap_or_default();

    Some(format!(
        "{} {}{}",
        colorize(progress_label_style(), label),
        counts,
        suffix
    ))
}
