use std::path::Path;

use vsd_tracer::Command;
use vsd_tracer::debugger::{DebugScope, LaunchStdio};

use super::codepage::encoding_for_codepage;
use super::session::Session;
use crate::sys;

/// Default debugger (local debugging) implementation.
///
/// # Note
///
/// Right now, only **Windows** is supported.
#[derive(Default)]
pub struct Debugger;

impl Debugger {
    /// Creates a new debugger.
    pub const fn new() -> Self {
        Self
    }
}

impl vsd_tracer::debugger::Debugger for Debugger {
    type Session = Session;
    type PipeReader = sys::PipeReader;
    type PipeWriter = sys::PipeWriter;
    type Error = crate::Error;

    fn narrow_encoding(&self) -> &'static encoding_rs::Encoding {
        encoding_for_codepage(sys::ansi_codepage())
    }

    fn create_pipe(&mut self) -> crate::Result<(Self::PipeReader, Self::PipeWriter)> {
        Ok(sys::create_pipe()?)
    }

    #[tracing::instrument(name = "Launch", skip_all, fields(program = %program.display()))]
    async fn launch(
        &mut self,
        program: &Path,
        command: &Command,
        stdio: LaunchStdio<'_, Self::PipeWriter>,
        scope: DebugScope,
    ) -> crate::Result<Session> {
        let options = sys::LaunchOptions {
            program,
            command_line: command.to_command_line(program),
            env: command.env.captured(),
            current_dir: command.current_dir.as_deref(),
            stdout: stdio.stdout,
            stderr: stdio.stderr,
            debug_tree: scope == DebugScope::Tree,
        };

        let session = sys::launch(&options)?;
        tracing::debug!(pid = session.root_process_id(), ?scope, "debuggee launched");

        Ok(Session::new(session))
    }
}
