mod builder;
mod child;
mod exception;
mod module;
mod output;
mod registry;
mod stop;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use encoding_rs::Encoding;

pub use self::builder::Builder;
use self::builder::NeedsDebugger;
pub use self::child::{ChildProcess, ExitStatus, STILL_ACTIVE, TERMINATED_EXIT_CODE};
pub use self::exception::{describe_exception, exception_name, unhandled_exception_reason};
pub use self::module::{Module, ModuleRef, ModuleTable, UNKNOWN_PATH};
use self::module::resolve_image_path;
use self::output::{OutputPipe, Stream};
pub use self::registry::ProcessRegistry;
pub use self::stop::StopHandle;
use crate::client::Client;
use crate::codec::TextCodec;
use crate::debugger::{ContinueStatus, DebugEvent, DebugEventKind, DebugScope, DebugSession};
use crate::debugger::{DebugStringRef, Debugger, LaunchStdio, ProcessHandle};
use crate::error::{ClientError, DebuggerError, Error};
use crate::Command;

/// Default time to wait for a debug event before polling the output pipes.
pub const DEFAULT_EVENT_TIMEOUT: Duration = Duration::from_millis(500);

/// Default time given to the root process to exit once asked to close.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// How the standard error of the debuggee is captured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelMode {
    /// Standard output and standard error share a single pipe, and both
    /// are reported as standard output.
    #[default]
    Merged,

    /// Standard error is captured on its own pipe.
    Separate,
}

/// Options of a supervised run.
#[derive(Clone, Copy, Debug)]
pub struct RunConfig {
    /// How the standard error is captured.
    pub channel_mode: ChannelMode,

    /// Which processes are debugged.
    pub debug_scope: DebugScope,

    /// Whether module loads and unloads are reported to the client.
    pub trace_modules: bool,

    /// Time to wait for a debug event before polling the output pipes.
    pub event_timeout: Duration,

    /// Time given to the root process to exit once asked to close.
    pub stop_timeout: Duration,

    /// Encoding of narrow text, overriding the one of the debugger.
    pub text_encoding: Option<&'static Encoding>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            channel_mode: ChannelMode::default(),
            debug_scope: DebugScope::default(),
            trace_modules: false,
            event_timeout: DEFAULT_EVENT_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            text_encoding: None,
        }
    }
}

/// Result of a completed run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    /// Exit code of the root process.
    ///
    /// This is [STILL_ACTIVE] if the exit of the root process was never
    /// reported.
    pub exit_code: i32,

    /// Run time of the root process.
    pub duration: Duration,
}

type RunResult<T, D, C> = crate::Result<T, <D as Debugger>::Error, <C as Client>::Error>;

/// Process supervisor.
///
/// It launches a program under debug supervision, captures its output and
/// debug strings, and reports the lifecycle of every traced process to a
/// [Client].
pub struct Supervisor<D, C> {
    /// Debugger launching the root process.
    pub(super) debugger: D,

    /// Consumer of supervision events.
    pub(super) client: C,

    /// Options of the run.
    pub(super) config: RunConfig,

    /// Handle stopping the run from other threads.
    pub(super) stop: StopHandle,
}

impl Supervisor<(), ()> {
    /// Creates a supervisor builder.
    pub const fn builder() -> Builder<NeedsDebugger> {
        Builder::new()
    }
}

impl<D, C> Supervisor<D, C>
where
    D: Debugger,
    C: Client<Session = D::Session>,
{
    /// Returns the options of the run.
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Returns a handle able to stop the run from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Launches the program of `command`, and supervises it until every
    /// traced process has exited.
    ///
    /// On success, the outcome of the root process is returned as well as
    /// the client. Failures happening before any process exists are also
    /// reported to the client, as standard error text.
    #[tracing::instrument(name = "Supervise", skip_all, fields(program = %command.program.display()))]
    pub async fn run(mut self, command: Command) -> RunResult<(RunOutcome, C), D, C> {
        let codec = TextCodec::new(
            self.config
                .text_encoding
                .unwrap_or_else(|| self.debugger.narrow_encoding()),
        );

        let Some(program) = command.resolve_program() else {
            return self.fail(Error::ProgramNotFound(command.program.clone())).await;
        };

        let (stdout_reader, stdout_writer) = match self.debugger.create_pipe() {
            Ok(pipe) => pipe,
            Err(source) => {
                let stream = Stream::Stdout.name();
                return self.fail(Error::PipeSetup { stream, source }).await;
            }
        };

        let stderr_pipe = match self.config.channel_mode {
            ChannelMode::Merged => None,
            ChannelMode::Separate => match self.debugger.create_pipe() {
                Ok(pipe) => Some(pipe),
                Err(source) => {
                    let stream = Stream::Stderr.name();
                    return self.fail(Error::PipeSetup { stream, source }).await;
                }
            },
        };
        let (stderr_reader, stderr_writer) = stderr_pipe.unzip();

        let stdio = LaunchStdio {
            stdout: &stdout_writer,
            stderr: stderr_writer.as_ref().unwrap_or(&stdout_writer),
        };

        let launched = self
            .debugger
            .launch(&program, &command, stdio, self.config.debug_scope)
            .await;

        // the debuggee holds its own copies of the write ends
        drop(stdout_writer);
        drop(stderr_writer);

        let session = match launched {
            Ok(session) => session,
            Err(source) => {
                let args = command.args.join(" ");
                return self.fail(Error::Launch { program, args, source }).await;
            }
        };

        let root_id = session.root_process_id();
        tracing::info!(root_pid = root_id, path = %program.display(), "launched");

        match session.stopper() {
            Ok(stopper) => {
                if self.stop.arm(stopper) {
                    self.stop.stop();
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "no root stopper, stop requests are polled");
                self.stop.arm_polled();
            }
        }

        let mut pipes = vec![OutputPipe::new(Stream::Stdout, stdout_reader, &codec)];
        pipes.extend(stderr_reader.map(|reader| OutputPipe::new(Stream::Stderr, reader, &codec)));

        let mut run = Run::<D, C> {
            session,
            client: self.client,
            registry: ProcessRegistry::new(),
            pipes,
            codec,
            config: self.config,
            stop: self.stop.clone(),
            root_id,
            root_exit: None,
            tracing_started: false,
            started: Instant::now(),
        };

        let result = run.supervise().await;
        self.stop.disarm();
        result?;

        run.finish().await
    }

    async fn fail<T>(&mut self, error: Error<D::Error, C::Error>) -> RunResult<T, D, C> {
        tracing::error!(%error, "run failed");

        if let Err(e) = self.client.write_stderr(&format!("{error}\n")).await {
            tracing::error!(error = %e, "report run failure to client");
        }

        Err(error)
    }
}

/// State of a run, once the root process is launched.
struct Run<D: Debugger, C> {
    session: D::Session,
    client: C,
    registry: ProcessRegistry<<D::Session as DebugSession>::Process>,
    pipes: Vec<OutputPipe<D::PipeReader>>,
    codec: TextCodec,
    config: RunConfig,
    stop: StopHandle,
    root_id: u32,
    root_exit: Option<(u32, Duration)>,
    tracing_started: bool,
    started: Instant,
}

impl<D, C> Run<D, C>
where
    D: Debugger,
    C: Client<Session = D::Session>,
{
    fn debugger_error(e: impl Into<D::Error>) -> Error<D::Error, C::Error> {
        Error::Debugger(DebuggerError(e.into()))
    }

    /// Processes debug events until every traced process has exited.
    async fn supervise(&mut self) -> RunResult<(), D, C> {
        loop {
            let root = self.registry.get(self.root_id);
            if let Some(root) = root.filter(|_| self.stop.take_request()) {
                tracing::info!(pid = root.id(), "stop requested");
                root.stop();
            }

            self.drain_pipes().await?;

            let Some(event) = self
                .session
                .wait_event(self.config.event_timeout)
                .await
                .map_err(Self::debugger_error)?
            else {
                continue;
            };

            self.drain_pipes().await?;

            let DebugEvent {
                process_id,
                thread_id,
                kind,
            } = event;

            let status = self.dispatch(process_id, kind).await?;

            self.session
                .continue_event(process_id, thread_id, status)
                .map_err(Self::debugger_error)?;

            if self.tracing_started && self.registry.is_empty() {
                tracing::debug!("no traced process left");
                return Ok(());
            }
        }
    }

    async fn dispatch(
        &mut self,
        pid: u32,
        kind: DebugEventKind<D::Session>,
    ) -> RunResult<ContinueStatus, D, C> {
        match kind {
            DebugEventKind::ProcessCreated { process, image } => {
                self.on_process_created(pid, process, image).await?
            }
            DebugEventKind::ProcessExited { exit_code } => {
                self.on_process_exited(pid, exit_code).await?
            }
            DebugEventKind::ThreadChanged => (),
            DebugEventKind::ModuleLoaded { base_addr, image } => {
                self.on_module_loaded(pid, base_addr, image).await?
            }
            DebugEventKind::ModuleUnloaded { base_addr } => {
                self.on_module_unloaded(pid, base_addr).await?
            }
            DebugEventKind::DebugString(string) => self.on_debug_string(pid, string).await?,
            DebugEventKind::Exception {
                code,
                addr,
                first_chance,
            } => return Ok(self.on_exception(pid, code, addr, first_chance)),
            DebugEventKind::Rip {
                error,
                message,
                exit_code,
            } => self.on_rip(pid, error, message, exit_code).await?,
        }

        Ok(ContinueStatus::Continue)
    }

    async fn on_process_created(
        &mut self,
        pid: u32,
        process: <D::Session as DebugSession>::Process,
        image: Option<<D::Session as DebugSession>::ImageFile>,
    ) -> RunResult<(), D, C> {
        let path = resolve_image_path(image)
            .or_else(|| {
                process
                    .image_path()
                    .inspect_err(|e| tracing::warn!(pid, error = %e, "query process image path"))
                    .ok()
            })
            .unwrap_or_else(|| PathBuf::from(UNKNOWN_PATH));

        tracing::info!(pid, path = %path.display(), "process created");

        let child = self.registry.insert(ChildProcess::new(pid, process, path));
        self.tracing_started = true;

        self.client
            .process_started(child)
            .await
            .map_err(ClientError)?;

        Ok(())
    }

    async fn on_process_exited(&mut self, pid: u32, exit_code: u32) -> RunResult<(), D, C> {
        let Some(mut child) = self.registry.remove(pid) else {
            tracing::warn!(pid, exit_code, "exit of untraced process");
            return Ok(());
        };

        child.process_stopped(exit_code);

        tracing::info!(
            pid,
            exit_code = format_args!("{:#x}", child.exit_code().unwrap_or(exit_code)),
            elapsed = ?child.elapsed(),
            "process stopped"
        );

        self.client
            .process_stopped(&child)
            .await
            .map_err(ClientError)?;

        if pid == self.root_id {
            self.root_exit = Some((child.exit_code().unwrap_or(exit_code), child.elapsed()));

            tracing::debug!(remaining = self.registry.len(), "root process stopped");
            self.registry.stop_all();
            self.drain_pipes().await?;
        }

        Ok(())
    }

    async fn on_module_loaded(
        &mut self,
        pid: u32,
        base_addr: u64,
        image: Option<<D::Session as DebugSession>::ImageFile>,
    ) -> RunResult<(), D, C> {
        let Some(child) = self.registry.get_mut(pid) else {
            tracing::warn!(pid, base_addr = format_args!("{base_addr:#x}"), "module loaded by untraced process");
            return Ok(());
        };

        let (module, inserted) = child.modules_mut().register(base_addr, image);

        tracing::debug!(
            pid,
            base_addr = format_args!("{base_addr:#x}"),
            path = %module.path().display(),
            inserted,
            "module loaded"
        );

        if self.config.trace_modules {
            let path = module.path().to_path_buf();

            self.client
                .write_dll_load(child, &path, true)
                .await
                .map_err(ClientError)?;
        }

        Ok(())
    }

    async fn on_module_unloaded(&mut self, pid: u32, base_addr: u64) -> RunResult<(), D, C> {
        let Some(child) = self.registry.get(pid) else {
            tracing::warn!(pid, base_addr = format_args!("{base_addr:#x}"), "module unloaded by untraced process");
            return Ok(());
        };

        let path = child.modules().path_or_unknown(base_addr);

        tracing::debug!(
            pid,
            base_addr = format_args!("{base_addr:#x}"),
            path = %path.display(),
            "module unloaded"
        );

        if self.config.trace_modules {
            self.client
                .write_dll_load(child, path, false)
                .await
                .map_err(ClientError)?;
        }

        Ok(())
    }

    async fn on_debug_string(&mut self, pid: u32, string: DebugStringRef) -> RunResult<(), D, C> {
        if string.len == 0 {
            tracing::trace!(pid, "empty debug string");
            return Ok(());
        }

        let Some(child) = self.registry.get(pid) else {
            tracing::warn!(pid, "debug string from untraced process");
            return Ok(());
        };

        let Some(bytes) = read_debug_string(child.handle(), string) else {
            return Ok(());
        };

        let text = self.codec.decode_debug_string(&bytes, string.is_wide);
        tracing::trace!(pid, text = %text, "debug string");

        if text.is_empty() {
            return Ok(());
        }

        self.client
            .write_debug(child, &text)
            .await
            .map_err(ClientError)?;

        Ok(())
    }

    fn on_exception(&mut self, pid: u32, code: u32, addr: u64, first_chance: bool) -> ContinueStatus {
        let Some(child) = self.registry.get_mut(pid) else {
            tracing::warn!(pid, code = format_args!("{code:#x}"), "exception in untraced process");
            return ContinueStatus::ExceptionNotHandled;
        };

        if first_chance {
            if child.take_initial_breakpoint(code) {
                tracing::debug!(pid, "initial breakpoint");
                return ContinueStatus::Continue;
            }

            tracing::debug!(
                pid,
                code = format_args!("{code:#x}"),
                addr = format_args!("{addr:#x}"),
                "first-chance exception"
            );
        } else {
            let mut reason = unhandled_exception_reason(code);

            if let Some(module) = child.module_containing(addr) {
                reason = format!("{reason} in {}", module.path().display());
            }

            tracing::warn!(pid, addr = format_args!("{addr:#x}"), "{reason}");

            child.process_died(None, reason);
        }

        ContinueStatus::ExceptionNotHandled
    }

    async fn on_rip(
        &mut self,
        pid: u32,
        error: u32,
        message: String,
        exit_code: Option<u32>,
    ) -> RunResult<(), D, C> {
        let Some(child) = self.registry.get_mut(pid) else {
            tracing::warn!(pid, error, "debugging error in untraced process");
            return Ok(());
        };

        tracing::warn!(pid, error, message = %message, "debugging error");

        let exit_code = exit_code.unwrap_or(STILL_ACTIVE);
        child.process_died(Some(exit_code), format!("RIP: {message}"));

        self.on_process_exited(pid, exit_code).await
    }

    /// Forwards the output currently available in the pipes to the client.
    async fn drain_pipes(&mut self) -> RunResult<(), D, C> {
        for pipe in &mut self.pipes {
            let Some(text) = pipe.read_text().map_err(Self::debugger_error)? else {
                continue;
            };

            write_output(&mut self.client, pipe.stream(), &text).await?;
        }

        Ok(())
    }

    /// Flushes the pipes and releases every OS resource of the run.
    async fn finish(mut self) -> RunResult<(RunOutcome, C), D, C> {
        self.drain_pipes().await?;

        for pipe in &mut self.pipes {
            if let Some(text) = pipe.finish() {
                write_output(&mut self.client, pipe.stream(), &text).await?;
            }
        }

        let Self {
            session,
            client,
            registry,
            pipes,
            root_exit,
            started,
            ..
        } = self;

        drop(registry);
        drop(session);
        drop(pipes);

        let (exit_code, duration) = root_exit.unwrap_or_else(|| {
            tracing::warn!("exit of root process was never reported");
            (STILL_ACTIVE, started.elapsed())
        });

        tracing::info!(exit_code = format_args!("{exit_code:#x}"), ?duration, "run completed");

        let outcome = RunOutcome {
            exit_code: exit_code as i32,
            duration,
        };

        Ok((outcome, client))
    }
}

async fn write_output<C: Client>(
    client: &mut C,
    stream: Stream,
    text: &str,
) -> Result<(), ClientError<C::Error>> {
    match stream {
        Stream::Stdout => client.write_stdout(text).await,
        Stream::Stderr => client.write_stderr(text).await,
    }
    .map_err(ClientError)
}

/// Reads a debug string from the memory of the process writing it.
///
/// The length of a wide string is taken as a count of characters first,
/// then as a count of bytes if the larger read fails.
fn read_debug_string<P: ProcessHandle>(process: &P, string: DebugStringRef) -> Option<Vec<u8>> {
    let len = string.len as usize;
    let size = if string.is_wide { len * 2 } else { len };

    let mut buf = vec![0; size];

    match process.read_memory(string.addr, &mut buf) {
        Ok(()) => return Some(buf),
        Err(e) if string.is_wide => {
            tracing::debug!(error = %e, "read wide debug string, retrying with byte length");
        }
        Err(e) => {
            tracing::warn!(pid = process.id(), error = %e, "read debug string");
            return None;
        }
    }

    buf.truncate(len);

    process
        .read_memory(string.addr, &mut buf)
        .inspect_err(|e| tracing::warn!(pid = process.id(), error = %e, "read debug string"))
        .ok()
        .map(|()| buf)
}
