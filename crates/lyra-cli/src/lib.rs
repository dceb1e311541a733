use lyra_upload::{FlowPhase, FlowStatus, Notification, Notifier};

const BAR_WIDTH: usize = 30;

/// Prints notifications to stderr so stdout stays machine-readable.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let marker = if notification.is_failure() { "error" } else { "ok" };
        eprintln!(
            "\n[{}] {}: {}",
            marker, notification.title, notification.description
        );
    }
}

/// Short label for a flow phase, as shown next to the progress bar.
pub fn phase_label(phase: FlowPhase) -> &'static str {
    match phase {
        FlowPhase::Idle => "idle",
        FlowPhase::RequestingCredential => "signing in",
        FlowPhase::RequestingDescriptor => "requesting upload",
        FlowPhase::Uploading => "uploading",
        FlowPhase::Succeeded => "done",
        FlowPhase::Failed => "failed",
    }
}

/// Render one progress line, e.g. `[#########.....]  30% requesting upload`.
pub fn render_progress(status: &FlowStatus) -> String {
    let percent = status.progress.percent() as usize;
    let filled = BAR_WIDTH * percent / 100;
    format!(
        "[{}{}] {:>3}% {}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        percent,
        phase_label(status.phase)
    )
}

/// Initialize tracing for the CLI.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyra_core::UploadProgress;

    fn status(percent: u8, phase: FlowPhase) -> FlowStatus {
        let mut progress = UploadProgress::default();
        progress.advance(percent);
        FlowStatus {
            phase,
            progress,
            dialog_open: true,
        }
    }

    #[test]
    fn render_progress_empty() {
        let line = render_progress(&status(0, FlowPhase::Idle));
        assert_eq!(line, format!("[{}]   0% idle", ".".repeat(BAR_WIDTH)));
    }

    #[test]
    fn render_progress_partial() {
        let line = render_progress(&status(50, FlowPhase::RequestingDescriptor));
        assert!(line.starts_with(&format!("[{}{}]", "#".repeat(15), ".".repeat(15))));
        assert!(line.ends_with(" 50% requesting upload"));
    }

    #[test]
    fn render_progress_complete() {
        let line = render_progress(&status(100, FlowPhase::Succeeded));
        assert_eq!(line, format!("[{}] 100% done", "#".repeat(BAR_WIDTH)));
    }
}
