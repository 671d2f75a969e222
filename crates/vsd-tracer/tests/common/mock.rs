use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use vsd_tracer::Command;
use vsd_tracer::debugger::{
    ContinueStatus, DebugEvent, DebugEventKind, DebugScope, DebugSession, DebugStringRef,
    Debugger, ImageFile, LaunchStdio, ModuleInfo, PipeReader, ProcessHandle, RootStopper,
};

/// Address debug strings are placed at, in the memory of mock processes.
pub const DEBUG_STRING_ADDR: u64 = 0x1000;

#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("script exhausted")]
    ScriptExhausted,

    #[error("pipe creation refused")]
    PipeRefused,

    #[error("launch refused")]
    LaunchRefused,

    #[error("memory unreadable")]
    MemoryUnreadable,

    #[error("no image path")]
    NoImagePath,

    #[error("image unresolvable")]
    ImageUnresolvable,

    #[error("stopper refused")]
    StopperRefused,
}

/// Everything the backend was asked to do, shared with the test.
#[derive(Debug, Default)]
pub struct Journal {
    pub pipes_created: usize,
    pub launched: Option<Launch>,
    pub continued: Vec<(u32, ContinueStatus)>,
    pub terminated: Vec<(u32, u32)>,
    pub opened_processes: Vec<u32>,
    pub closed_processes: Vec<u32>,
    pub opened_images: usize,
    pub closed_images: usize,
    pub resolved_images: Vec<PathBuf>,
    pub close_requests: usize,
    pub session_dropped: bool,
}

#[derive(Debug)]
pub struct Launch {
    pub program: PathBuf,
    pub cmdline: String,
    pub scope: DebugScope,
    pub merged: bool,
}

pub type SharedJournal = Arc<Mutex<Journal>>;

#[derive(Clone, Copy, Debug)]
pub enum Out {
    Stdout,
    Stderr,
}

/// Step of a scripted session.
pub enum Step {
    Created {
        pid: u32,
        image: Option<&'static str>,
    },
    Exited {
        pid: u32,
        code: u32,
    },
    Thread {
        pid: u32,
    },
    Loaded {
        pid: u32,
        base: u64,
        image: Option<&'static str>,
    },
    Unloaded {
        pid: u32,
        base: u64,
    },
    DebugString {
        pid: u32,
        bytes: Vec<u8>,
        len: u32,
        wide: bool,
    },
    Exception {
        pid: u32,
        code: u32,
        first_chance: bool,
    },
    Rip {
        pid: u32,
        message: &'static str,
        exit_code: Option<u32>,
    },
    Output(Out, Vec<u8>),
    Timeout,
}

impl Step {
    pub fn narrow_string(pid: u32, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);

        Self::DebugString {
            pid,
            len: bytes.len() as u32,
            bytes,
            wide: false,
        }
    }

    pub fn wide_string(pid: u32, text: &str) -> Self {
        let mut bytes: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
        bytes.extend_from_slice(&[0, 0]);

        Self::DebugString {
            pid,
            len: (bytes.len() / 2) as u32,
            bytes,
            wide: true,
        }
    }
}

pub struct MockDebugger {
    journal: SharedJournal,
    script: Vec<Step>,
    root_pid: u32,
    refuse_pipe: bool,
    refuse_launch: bool,
    refuse_stopper: bool,
}

impl MockDebugger {
    pub fn new(root_pid: u32, script: Vec<Step>) -> (Self, SharedJournal) {
        let journal = SharedJournal::default();

        let debugger = Self {
            journal: journal.clone(),
            script,
            root_pid,
            refuse_pipe: false,
            refuse_launch: false,
            refuse_stopper: false,
        };

        (debugger, journal)
    }

    pub fn refusing_pipes(mut self) -> Self {
        self.refuse_pipe = true;
        self
    }

    pub fn refusing_launch(mut self) -> Self {
        self.refuse_launch = true;
        self
    }

    pub fn refusing_stopper(mut self) -> Self {
        self.refuse_stopper = true;
        self
    }
}

impl Debugger for MockDebugger {
    type Session = MockSession;
    type PipeReader = MockPipeReader;
    type PipeWriter = MockPipeWriter;
    type Error = MockError;

    fn create_pipe(&mut self) -> Result<(Self::PipeReader, Self::PipeWriter), Self::Error> {
        if self.refuse_pipe {
            return Err(MockError::PipeRefused);
        }

        self.journal.lock().pipes_created += 1;

        let buf = Arc::new(Mutex::new(Vec::new()));

        Ok((MockPipeReader { buf: buf.clone() }, MockPipeWriter { buf }))
    }

    async fn launch(
        &mut self,
        program: &Path,
        command: &Command,
        stdio: LaunchStdio<'_, Self::PipeWriter>,
        scope: DebugScope,
    ) -> Result<Self::Session, Self::Error> {
        if self.refuse_launch {
            return Err(MockError::LaunchRefused);
        }

        self.journal.lock().launched = Some(Launch {
            program: program.to_path_buf(),
            cmdline: command.to_command_line(program),
            scope,
            merged: Arc::ptr_eq(&stdio.stdout.buf, &stdio.stderr.buf),
        });

        Ok(MockSession {
            journal: self.journal.clone(),
            script: std::mem::take(&mut self.script).into(),
            root_pid: self.root_pid,
            refuse_stopper: self.refuse_stopper,
            stdout: stdio.stdout.buf.clone(),
            stderr: stdio.stderr.buf.clone(),
            memories: HashMap::new(),
        })
    }
}

pub struct MockPipeReader {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl PipeReader for MockPipeReader {
    type Error = MockError;

    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, Self::Error> {
        let mut pending = self.buf.lock();
        let len = pending.len();
        buf.append(&mut pending);
        Ok(len)
    }
}

pub struct MockPipeWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

type Memory = Arc<Mutex<HashMap<u64, Vec<u8>>>>;

pub struct MockSession {
    journal: SharedJournal,
    script: VecDeque<Step>,
    root_pid: u32,
    refuse_stopper: bool,
    stdout: Arc<Mutex<Vec<u8>>>,
    stderr: Arc<Mutex<Vec<u8>>>,
    memories: HashMap<u32, Memory>,
}

impl MockSession {
    fn image(&self, path: Option<&'static str>) -> Option<MockImage> {
        self.journal.lock().opened_images += 1;

        Some(MockImage {
            journal: self.journal.clone(),
            path: path.map(PathBuf::from),
        })
    }

    fn event(&mut self, step: Step) -> Option<DebugEvent<Self>> {
        let (process_id, kind) = match step {
            Step::Created { pid, image } => {
                let memory = self.memories.entry(pid).or_default().clone();
                self.journal.lock().opened_processes.push(pid);

                let process = MockProcess {
                    pid,
                    journal: self.journal.clone(),
                    memory,
                };

                let image = self.image(image);
                (pid, DebugEventKind::ProcessCreated { process, image })
            }
            Step::Exited { pid, code } => (pid, DebugEventKind::ProcessExited { exit_code: code }),
            Step::Thread { pid } => (pid, DebugEventKind::ThreadChanged),
            Step::Loaded { pid, base, image } => {
                let image = self.image(image);
                (
                    pid,
                    DebugEventKind::ModuleLoaded {
                        base_addr: base,
                        image,
                    },
                )
            }
            Step::Unloaded { pid, base } => {
                (pid, DebugEventKind::ModuleUnloaded { base_addr: base })
            }
            Step::DebugString {
                pid,
                bytes,
                len,
                wide,
            } => {
                self.memories
                    .entry(pid)
                    .or_default()
                    .lock()
                    .insert(DEBUG_STRING_ADDR, bytes);

                (
                    pid,
                    DebugEventKind::DebugString(DebugStringRef {
                        addr: DEBUG_STRING_ADDR,
                        len,
                        is_wide: wide,
                    }),
                )
            }
            Step::Exception {
                pid,
                code,
                first_chance,
            } => (
                pid,
                DebugEventKind::Exception {
                    code,
                    addr: 0xdead_beef,
                    first_chance,
                },
            ),
            Step::Rip {
                pid,
                message,
                exit_code,
            } => (
                pid,
                DebugEventKind::Rip {
                    error: 6,
                    message: message.to_owned(),
                    exit_code,
                },
            ),
            Step::Output(out, bytes) => {
                match out {
                    Out::Stdout => self.stdout.lock().extend_from_slice(&bytes),
                    Out::Stderr => self.stderr.lock().extend_from_slice(&bytes),
                }
                return None;
            }
            Step::Timeout => return None,
        };

        Some(DebugEvent {
            process_id,
            thread_id: process_id + 1,
            kind,
        })
    }
}

impl DebugSession for MockSession {
    type Process = MockProcess;
    type ImageFile = MockImage;
    type Stopper = MockStopper;
    type Error = MockError;

    fn root_process_id(&self) -> u32 {
        self.root_pid
    }

    async fn wait_event(
        &mut self,
        _timeout: Duration,
    ) -> Result<Option<DebugEvent<Self>>, Self::Error> {
        let step = self.script.pop_front().ok_or(MockError::ScriptExhausted)?;
        Ok(self.event(step))
    }

    fn continue_event(
        &mut self,
        process_id: u32,
        _thread_id: u32,
        status: ContinueStatus,
    ) -> Result<(), Self::Error> {
        self.journal.lock().continued.push((process_id, status));
        Ok(())
    }

    fn stopper(&self) -> Result<Self::Stopper, Self::Error> {
        if self.refuse_stopper {
            return Err(MockError::StopperRefused);
        }

        Ok(MockStopper {
            journal: self.journal.clone(),
            root_pid: self.root_pid,
        })
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.journal.lock().session_dropped = true;
    }
}

pub struct MockProcess {
    pid: u32,
    journal: SharedJournal,
    memory: Memory,
}

impl ProcessHandle for MockProcess {
    type Error = MockError;

    fn id(&self) -> u32 {
        self.pid
    }

    fn read_memory(&self, addr: u64, buf: &mut [u8]) -> Result<(), Self::Error> {
        let memory = self.memory.lock();
        let data = memory.get(&addr).ok_or(MockError::MemoryUnreadable)?;

        if buf.len() > data.len() {
            return Err(MockError::MemoryUnreadable);
        }

        buf.copy_from_slice(&data[..buf.len()]);
        Ok(())
    }

    fn terminate(&self, exit_code: u32) -> Result<(), Self::Error> {
        self.journal.lock().terminated.push((self.pid, exit_code));
        Ok(())
    }

    fn image_path(&self) -> Result<PathBuf, Self::Error> {
        Err(MockError::NoImagePath)
    }

    fn module_info(&self, base_addr: u64) -> Result<ModuleInfo, Self::Error> {
        Ok(ModuleInfo {
            image_size: 0x1000,
            entry_point: base_addr + 0x100,
        })
    }
}

impl Drop for MockProcess {
    fn drop(&mut self) {
        self.journal.lock().closed_processes.push(self.pid);
    }
}

pub struct MockImage {
    journal: SharedJournal,
    path: Option<PathBuf>,
}

impl ImageFile for MockImage {
    type Error = MockError;

    fn resolve_path(self) -> Result<PathBuf, Self::Error> {
        let path = self.path.clone().ok_or(MockError::ImageUnresolvable)?;
        self.journal.lock().resolved_images.push(path.clone());
        Ok(path)
    }
}

impl Drop for MockImage {
    fn drop(&mut self) {
        self.journal.lock().closed_images += 1;
    }
}

pub struct MockStopper {
    journal: SharedJournal,
    root_pid: u32,
}

impl RootStopper for MockStopper {
    fn close_windows(&self) -> bool {
        self.journal.lock().close_requests += 1;
        false
    }

    fn wait_for_exit(&self, _timeout: Duration) -> bool {
        false
    }

    fn terminate(&self) -> std::io::Result<()> {
        self.journal.lock().terminated.push((self.root_pid, u32::MAX));
        Ok(())
    }
}
