use miette::IntoDiagnostic;
use vsd_debugger::{Debugger, Session};
use vsd_tracer::Command;
use vsd_tracer::supervisor::{StopHandle, Supervisor};

use crate::client::command_title;
use crate::config::LogTarget;
use crate::{CliOpts, ConsoleClient, Output, Settings, VsdConfig};

/// Runs the target application under supervision.
///
/// Returns the exit code of the target, or `-1` if it could not be started.
pub fn evaluate_run(opts: CliOpts) -> miette::Result<i32> {
    let config = VsdConfig::load(opts.config.as_deref())?;
    let settings = Settings::resolve(&opts, config);

    let command = Command::new(opts.program).args(opts.args);

    let mut client = ConsoleClient::<Session>::new(
        open_output(&settings, &command).into_diagnostic()?,
        settings.log_dll,
    );
    client.command_started(&command).into_diagnostic()?;

    let supervisor = Supervisor::builder()
        .with_debugger(Debugger::new())
        .with_client(client)
        .with_config(settings.run)
        .build();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    runtime.spawn(stop_on_signal(supervisor.stop_handle()));

    // debug events are bound to the thread that created the debuggee
    match runtime.block_on(supervisor.run(command)) {
        Ok((outcome, mut client)) => {
            tracing::info!(exit_code = outcome.exit_code, duration = ?outcome.duration, "run finished");

            client.finish().into_diagnostic()?;
            Ok(outcome.exit_code)
        }
        Err(e) => match e.exit_code() {
            // already reported through the client
            Some(exit_code) => Ok(exit_code),
            None => Err(e).into_diagnostic(),
        },
    }
}

fn open_output(settings: &Settings, command: &Command) -> std::io::Result<Output> {
    let mut output = Output::default();

    if settings.console {
        output = output.with_console();
    }

    match &settings.log {
        Some(LogTarget { path, html: true }) => {
            output.with_html_log(path, &command_title(command))
        }
        Some(LogTarget { path, html: false }) => output.with_plain_log(path),
        None => Ok(output),
    }
}

async fn stop_on_signal(stop: StopHandle) {
    match shutdown_signal().await {
        Ok(()) => {
            tracing::info!("interrupted, stopping the target");

            // closing the windows of the target may wait for a while
            if let Err(e) = tokio::task::spawn_blocking(move || stop.stop()).await {
                tracing::error!(error = %e, "stop task failed");
            }
        }
        Err(e) => tracing::warn!(error = %e, "cannot listen for interruptions"),
    }
}

#[cfg(windows)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::windows::{ctrl_break, ctrl_close};

    let mut close = ctrl_close()?;
    let mut brk = ctrl_break()?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = close.recv() => Ok(()),
        _ = brk.recv() => Ok(()),
    }
}

#[cfg(not(windows))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
