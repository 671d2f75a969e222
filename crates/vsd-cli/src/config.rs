use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::IntoDiagnostic;
use vsd_tracer::debugger::DebugScope;
use vsd_tracer::supervisor::{ChannelMode, RunConfig};

use crate::CliOpts;

/// Name of the configuration file looked up next to the executable.
const CONFIG_FILE_NAME: &str = "vsd.kdl";

/// Configuration of `vsd`, overridden by command-line options.
#[derive(Debug, PartialEq, Eq, knus::Decode)]
pub struct VsdConfig {
    /// Whether stdout and stderr share a single pipe.
    #[knus(child, default = true, unwrap(argument))]
    pub merge_channels: bool,

    /// Whether the processes created by the target are debugged too.
    #[knus(child, default, unwrap(argument))]
    pub attach_subprocess: bool,

    /// Whether DLL loading is debugged.
    #[knus(child, default, unwrap(argument))]
    pub debug_dll_loading: bool,

    /// Whether DLL loading is logged.
    #[knus(child, default, unwrap(argument))]
    pub log_dll_loading: bool,

    /// Log file written on each run.
    #[knus(child, unwrap(argument))]
    pub log_file: Option<String>,

    /// Whether the log file is written as colored HTML.
    #[knus(child, default = true, unwrap(argument))]
    pub log_html: bool,

    /// Whether narrow text is decoded as UTF-8.
    #[knus(child, default, unwrap(argument))]
    pub utf8: bool,

    /// Maximum wait for a single debug event, in milliseconds.
    #[knus(child, default = 500, unwrap(argument))]
    pub debug_event_timeout_ms: u64,

    /// Grace period given to the target to close on stop, in milliseconds.
    #[knus(child, default = 10_000, unwrap(argument))]
    pub stop_timeout_ms: u64,
}

impl VsdConfig {
    /// Loads the configuration.
    ///
    /// `source` is either a path ending with `.kdl` or inline KDL content.
    /// Without source, the `vsd.kdl` file next to the executable is read if
    /// it exists.
    pub fn load(source: Option<&str>) -> miette::Result<Self> {
        if let Some(source) = source {
            return Self::parse(source);
        }

        match std::env::current_exe()
            .ok()
            .map(|exe| exe.with_file_name(CONFIG_FILE_NAME))
            .filter(|path| path.is_file())
        {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::parse_file(&path)
            }
            None => Ok(knus::parse("<default>", "")?),
        }
    }

    fn parse(source: &str) -> miette::Result<Self> {
        let path = Path::new(source);

        if path.extension().and_then(OsStr::to_str) == Some("kdl") {
            Self::parse_file(path)
        } else {
            Ok(knus::parse("<content>", source)?)
        }
    }

    fn parse_file(path: &Path) -> miette::Result<Self> {
        let filename = path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or(CONFIG_FILE_NAME);

        let content = std::fs::read_to_string(path).into_diagnostic()?;
        Ok(knus::parse(filename, &content)?)
    }
}

/// Where the log is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    /// Log file.
    pub path: PathBuf,

    /// Whether the log is colored HTML.
    pub html: bool,
}

/// Settings of a run, after merging the configuration and the command line.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Supervision settings.
    pub run: RunConfig,

    /// Whether DLL loading is printed.
    pub log_dll: bool,

    /// Whether output is printed to the console.
    pub console: bool,

    /// Optional log file.
    pub log: Option<LogTarget>,
}

impl Settings {
    /// Applies the command-line options on top of the configuration.
    pub fn resolve(opts: &CliOpts, config: VsdConfig) -> Self {
        let channel_mode = if opts.separate_error || !config.merge_channels {
            ChannelMode::Separate
        } else {
            ChannelMode::Merged
        };

        let debug_scope = if opts.all || config.attach_subprocess {
            DebugScope::Tree
        } else {
            DebugScope::RootOnly
        };

        let log_dll = opts.log_dll || config.log_dll_loading;
        let text_encoding = (opts.utf8 || config.utf8).then_some(encoding_rs::UTF_8);

        let log = match (&opts.log, &opts.log_plain) {
            (Some(path), _) => Some(LogTarget {
                path: path.clone(),
                html: true,
            }),
            (None, Some(path)) => Some(LogTarget {
                path: path.clone(),
                html: false,
            }),
            (None, None) => config.log_file.map(|path| LogTarget {
                path: path.into(),
                html: config.log_html,
            }),
        };

        Self {
            run: RunConfig {
                channel_mode,
                debug_scope,
                trace_modules: log_dll || opts.debug_dll || config.debug_dll_loading,
                event_timeout: Duration::from_millis(config.debug_event_timeout_ms),
                stop_timeout: Duration::from_millis(config.stop_timeout_ms),
                text_encoding,
            },
            log_dll,
            console: !opts.no_console,
            log,
        }
    }
}
