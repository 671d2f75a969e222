use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// A process builder, describing the root process to supervise.
#[derive(Debug, Clone)]
pub struct Command {
    /// Program to spawn, as given by the user.
    pub program: PathBuf,

    /// Program arguments for the process to spawn.
    pub args: Vec<String>,

    /// Environment variables for the process to spawn.
    pub env: CommandEnv,

    /// Working directory for the process to spawn
    pub current_dir: Option<PathBuf>,
}

impl Command {
    /// Constructs a new `Command` for launching the program at
    /// path `program`, with the following default configuration:
    ///
    /// * No arguments to the program
    /// * Inherit the current process's environment
    /// * Inherit the current process's working directory
    ///
    /// If `program` does not name an existing file, it is searched in the
    /// `PATH` when the supervisor is run (see [resolve_program](Self::resolve_program)).
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: CommandEnv::Inherit(BTreeMap::new()),
            current_dir: None,
        }
    }

    /// Adds an argument to pass to the program.
    ///
    /// Only one argument can be passed per use. To pass multiple arguments
    /// see [`args`](Self::args).
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple arguments to pass to the program.
    pub fn args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        args.into_iter().fold(self, |cmd, arg| cmd.arg(arg))
    }

    /// Inserts or updates an explicit environment variable mapping.
    ///
    /// Environment variables explicitly set using [`env`](Self::env) take
    /// precedence over inherited variables.
    pub fn env<K, V>(mut self, key: K, val: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        match self.env {
            CommandEnv::Inherit(ref mut env) => {
                env.insert(key.into(), Some(val.into()));
            }
            CommandEnv::NoInherit(ref mut env) => {
                env.insert(key.into(), val.into());
            }
        }

        self
    }

    /// Removes an explicitly set environment variable and prevents inheriting
    /// it from a parent process.
    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        match self.env {
            CommandEnv::Inherit(ref mut env) => {
                env.insert(key.into(), None);
            }
            CommandEnv::NoInherit(ref mut env) => {
                env.remove(&key.into());
            }
        }

        self
    }

    /// Clears all explicitly set environment variables and prevents inheriting
    /// any parent process environment variables.
    pub fn env_clear(mut self) -> Self {
        self.env = CommandEnv::NoInherit(BTreeMap::new());
        self
    }

    /// Sets the working directory for the process to spawn.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Resolves the program to an absolute path.
    ///
    /// If the program names an existing file, its absolute form is returned.
    /// Otherwise the platform's executable extension is appended (unless
    /// the program already ends with it) and the directories of the `PATH`
    /// environment variable are searched.
    pub fn resolve_program(&self) -> Option<PathBuf> {
        resolve_program_in(&self.program, std::env::var_os("PATH"))
    }

    /// Builds the command line of the process to spawn, following the
    /// quoting rules of the Microsoft C runtime.
    ///
    /// The program is always quoted, arguments only when needed.
    pub fn to_command_line(&self, program: &Path) -> String {
        let mut cmdline = format!("\"{}\"", program.display());

        for arg in &self.args {
            cmdline.push(' ');
            append_quoted_arg(&mut cmdline, arg);
        }

        cmdline
    }
}

/// Environment variables attached to a [Command].
#[derive(Debug, Clone)]
pub enum CommandEnv {
    /// Environment variables the process to spawn will have, in addition to
    /// the ones inherited from the parent process.
    ///
    /// A `None` value indicates that the environment variable will be removed
    /// from the process to spawn, even if it was inherited.
    Inherit(BTreeMap<String, Option<String>>),

    /// Environment variables the process to spawn will have, without
    /// inheriting any from the parent process.
    NoInherit(BTreeMap<String, String>),
}

impl CommandEnv {
    /// Captures the current environment with the specified changes applied.
    ///
    /// `None` means the environment is inherited unchanged.
    pub fn captured(&self) -> Option<BTreeMap<OsString, OsString>> {
        let mut captured_env = BTreeMap::new();

        match self {
            Self::Inherit(env) if env.is_empty() => return None,
            Self::Inherit(env) => {
                captured_env.extend(std::env::vars_os());
                for (k, v) in env {
                    if let Some(v) = v {
                        captured_env.insert(k.into(), v.into());
                    } else {
                        captured_env.remove(OsStr::new(k));
                    }
                }
            }
            Self::NoInherit(env) => {
                captured_env.extend(env.iter().map(|(k, v)| (k.into(), v.into())));
            }
        }

        Some(captured_env)
    }
}

fn resolve_program_in(program: &Path, search_path: Option<OsString>) -> Option<PathBuf> {
    if program.is_file() {
        return std::path::absolute(program).ok();
    }

    let file_name = with_extension_appended(program, std::env::consts::EXE_EXTENSION);

    if file_name.is_file() {
        return std::path::absolute(file_name).ok();
    }

    // only bare names are looked up in the search path
    if file_name.components().count() != 1 {
        return None;
    }

    std::env::split_paths(&search_path?)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
        .and_then(|candidate| std::path::absolute(candidate).ok())
}

/// Appends `.{extension}` to `program`, unless it already ends with it
/// (ignoring case).
fn with_extension_appended(program: &Path, extension: &str) -> PathBuf {
    let has_extension = program
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));

    if extension.is_empty() || has_extension {
        return program.to_path_buf();
    }

    let mut name = program.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn append_quoted_arg(cmdline: &mut String, arg: &str) {
    let needs_quotes = arg.is_empty() || arg.contains([' ', '\t', '\n', '\u{b}', '"']);

    if !needs_quotes {
        cmdline.push_str(arg);
        return;
    }

    cmdline.push('"');

    let mut backslashes = 0usize;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                // backslashes preceding a quote are escaped, and so is the quote
                cmdline.extend(std::iter::repeat_n('\\', backslashes * 2 + 1));
                cmdline.push('"');
                backslashes = 0;
            }
            _ => {
                cmdline.extend(std::iter::repeat_n('\\', backslashes));
                cmdline.push(c);
                backslashes = 0;
            }
        }
    }

    // backslashes preceding the closing quote are escaped
    cmdline.extend(std::iter::repeat_n('\\', backslashes * 2));
    cmdline.push('"');
}
