use std::io;
use std::marker::PhantomData;
use std::path::Path;
use std::time::Duration;

use vsd_tracer::Command;
use vsd_tracer::client::{Child, Client};
use vsd_tracer::debugger::{DebugSession, ProcessHandle};
use vsd_tracer::supervisor::{ChildProcess, STILL_ACTIVE};

use crate::{Color, Output};

/// Client printing the traced processes' output and events.
pub struct ConsoleClient<S> {
    out: Output,
    log_dll: bool,
    _session: PhantomData<fn() -> S>,
}

impl<S> ConsoleClient<S> {
    /// Creates a new client writing to `out`.
    ///
    /// DLL (un)loading is only printed if `log_dll` is set.
    pub fn new(out: Output, log_dll: bool) -> Self {
        Self {
            out,
            log_dll,
            _session: PhantomData,
        }
    }

    /// Prints the command about to run.
    pub fn command_started(&mut self, command: &Command) -> io::Result<()> {
        let line = command_title(command);
        self.out.write(Color::Info, &format!("{line}\n"))
    }

    /// Terminates the output of the run.
    pub fn finish(&mut self) -> io::Result<()> {
        self.out.write(Color::Default, "\n")?;
        self.out.flush()
    }
}

impl<S: DebugSession> Client for ConsoleClient<S> {
    type Session = S;
    type Error = io::Error;

    async fn write_stdout(&mut self, text: &str) -> io::Result<()> {
        self.out.write(Color::Default, text)
    }

    async fn write_stderr(&mut self, text: &str) -> io::Result<()> {
        self.out.write(Color::Error, text)
    }

    async fn write_debug(&mut self, child: &Child<S>, text: &str) -> io::Result<()> {
        self.out.write(Color::Debug, &debug_line(child, text))
    }

    async fn write_dll_load(
        &mut self,
        child: &Child<S>,
        path: &Path,
        loading: bool,
    ) -> io::Result<()> {
        if !self.log_dll {
            return Ok(());
        }
        self.out.write(Color::DllLoad, &dll_line(child, path, loading))
    }

    async fn process_started(&mut self, child: &Child<S>) -> io::Result<()> {
        self.out.write(Color::Info, &started_line(child))
    }

    async fn process_stopped(&mut self, child: &Child<S>) -> io::Result<()> {
        self.out.write(Color::Info, &stopped_line(child))
    }
}

/// Returns the program followed by its arguments.
pub(crate) fn command_title(command: &Command) -> String {
    std::iter::once(command.program.display().to_string())
        .chain(command.args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn debug_line<P: ProcessHandle>(child: &ChildProcess<P>, text: &str) -> String {
    let text = text.trim_end_matches(['\r', '\n']);
    format!("{}({}): {text}\n", child.name(), child.id())
}

fn dll_line<P: ProcessHandle>(child: &ChildProcess<P>, path: &Path, loading: bool) -> String {
    let action = if loading { "Loading" } else { "Unloading" };
    format!("{}({}): {action}: {}\n", child.name(), child.id(), path.display())
}

fn started_line<P: ProcessHandle>(child: &ChildProcess<P>) -> String {
    format!("Process Created: {} ({})\n", child.path().display(), child.id())
}

fn stopped_line<P: ProcessHandle>(child: &ChildProcess<P>) -> String {
    let mut line = format!("Process Stopped: {} ({})", child.path().display(), child.id());

    if let Some(error) = child.error() {
        line.push_str(" Error: ");
        line.push_str(error);
    }

    let exit_code = child.exit_code().unwrap_or(STILL_ACTIVE);
    line.push_str(&format!(
        " With exit Code: {exit_code:#x} After: {}\n",
        timestamp(child.elapsed())
    ));

    line
}

/// Formats a duration as `hours:minutes:seconds:milliseconds`.
fn timestamp(time: Duration) -> String {
    let secs = time.as_secs();
    format!(
        "{}:{}:{}:{}",
        secs / 3600,
        secs / 60 % 60,
        secs % 60,
        time.subsec_millis()
    )
}
