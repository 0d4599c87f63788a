//! `startstop up`: start the tree, stream events, then stop it again.

use std::path::Path;

use anyhow::{Context, Result, bail};
use console::style;
use startstop_core::LifecycleController;
use startstop_types::{LifecycleError, LifecycleEvent};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::manifest::Manifest;

use super::render;

/// Options for one `up` invocation.
#[derive(Debug, Clone, Copy)]
pub struct UpOptions {
    pub once: bool,
    pub json: bool,
    pub quiet: bool,
}

pub async fn handle_up(path: &Path, opts: UpOptions) -> Result<()> {
    let manifest = Manifest::load(path)
        .await
        .with_context(|| format!("cannot load manifest {}", path.display()))?;
    let controller = LifecycleController::with_config(manifest.to_tree(), manifest.settings.clone());
    let printer = spawn_printer(controller.subscribe(), opts);

    tracing::info!(steps = controller.tree().step_count(), "bringing steps up");
    let started = controller.start().await;

    if started.is_ok() && !opts.once {
        if !opts.json && !opts.quiet {
            println!("{}", style("  Press Ctrl-C to stop.").dim());
        }
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?;
    }

    // Stop even after a failed start so that steps which did come up are
    // brought down again.
    let stopped = controller.stop().await;
    let last_run = controller.last_run();
    drop(controller);
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "event printer task failed");
    }

    if !opts.json && !opts.quiet {
        if let Some(report) = &last_run {
            println!("{}", render::report_line(report));
        }
    }

    match (started, stopped) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(err), _) => fail("start", err, opts),
        (Ok(()), Err(err)) => fail("stop", err, opts),
    }
}

fn fail(action: &str, err: LifecycleError, opts: UpOptions) -> Result<()> {
    if let (Some(failures), false) = (err.failures(), opts.json) {
        eprintln!("{}", render::failure_summary(failures));
    }
    bail!("{action} failed: {err}")
}

/// Print events until every controller handle is gone.
fn spawn_printer(mut events: broadcast::Receiver<LifecycleEvent>, opts: UpOptions) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event, opts),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "event printer lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn print_event(event: &LifecycleEvent, opts: UpOptions) {
    if opts.json {
        match render::event_json(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize event"),
        }
    } else if let Some(line) = render::event_line(event, opts.quiet) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn manifest_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const QUIET: UpOptions = UpOptions {
        once: true,
        json: false,
        quiet: true,
    };

    #[tokio::test]
    async fn once_brings_steps_up_and_down() {
        let dir = tempfile::tempdir().unwrap();
        let file = manifest_file(&format!(
            r#"
[[steps]]
name = "touch"
start = "touch started"
stop = "touch stopped"
workdir = "{}"
"#,
            dir.path().display()
        ));

        handle_up(file.path(), QUIET).await.unwrap();

        assert!(dir.path().join("started").exists());
        assert!(dir.path().join("stopped").exists());
    }

    #[tokio::test]
    async fn failed_start_still_stops_and_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = manifest_file(&format!(
            r#"
[[steps]]
name = "broken"
start = "exit 4"
stop = "touch stopped"
workdir = "{}"
"#,
            dir.path().display()
        ));

        let err = handle_up(file.path(), QUIET).await.unwrap_err();

        assert!(err.to_string().starts_with("start failed"));
        assert!(err.to_string().contains("code 4"));
        assert!(dir.path().join("stopped").exists());
    }

    #[tokio::test]
    async fn missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = handle_up(&dir.path().join("nope.toml"), QUIET).await.unwrap_err();
        assert!(err.to_string().contains("cannot load manifest"));
    }
}
