use std::ffi::OsString;
use std::path::PathBuf;

/// Prefix shared by every option of `vsd` itself.
const OPTION_PREFIX: &str = "--vsd-";

/// Options of `vsd` taking a value.
const VALUED_OPTIONS: [&str; 3] = ["--vsd-log", "--vsd-log-plain", "--vsd-config"];

/// Prints the output and debug messages of an application and its
/// sub-processes.
///
/// Options starting with `--vsd-` may appear anywhere on the command line,
/// every other argument is forwarded to the target application.
#[derive(clap::Parser, Debug, PartialEq, Eq)]
#[clap(name = "vsd", version, arg_required_else_help = true)]
pub struct CliOpts {
    /// Separate stderr and stdout to identify stderr messages.
    #[clap(long = "vsd-separate-error")]
    pub separate_error: bool,

    /// Write a colored HTML log to the given file.
    #[clap(long = "vsd-log", value_name = "FILE", overrides_with = "log_plain")]
    pub log: Option<PathBuf>,

    /// Write a plain text log to the given file.
    #[clap(long = "vsd-log-plain", value_name = "FILE", overrides_with = "log")]
    pub log_plain: Option<PathBuf>,

    /// Debug every process created by the target application too.
    #[clap(long = "vsd-all")]
    pub all: bool,

    /// Debug DLL loading.
    #[clap(long = "vsd-debug-dll")]
    pub debug_dll: bool,

    /// Log DLL loading (implies `--vsd-debug-dll`).
    #[clap(long = "vsd-log-dll")]
    pub log_dll: bool,

    /// Don't log to the console.
    #[clap(long = "vsd-no-console")]
    pub no_console: bool,

    /// Decode narrow text as UTF-8 instead of the system codepage.
    #[clap(long = "vsd-utf8")]
    pub utf8: bool,

    /// Configuration (KDL format).
    ///
    /// If it ends with `.kdl`, it is treated as a path to a configuration
    /// file. Otherwise it is directly parsed as inline KDL-formatted
    /// configuration. Defaults to the `vsd.kdl` file next to the executable.
    #[clap(long = "vsd-config", value_name = "CONTENT/PATH")]
    pub config: Option<String>,

    /// Target application.
    pub program: PathBuf,

    /// Arguments of the target application.
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl CliOpts {
    /// Parses the CLI from the command-line.
    ///
    /// # Warning
    ///
    /// Exits on error.
    pub fn parse_from_cmdline() -> Self {
        Self::parse_from_args(std::env::args_os())
    }

    /// Parses the CLI from the given arguments, the first one being the
    /// name of the binary.
    ///
    /// # Warning
    ///
    /// Exits on error.
    pub fn parse_from_args(args: impl IntoIterator<Item = OsString>) -> Self {
        <Self as clap::Parser>::parse_from(reorder_args(args))
    }
}

/// Moves the options of `vsd` in front of the target application, separated
/// from it by `--`.
///
/// `--help` and `--version` only belong to `vsd` when given first.
fn reorder_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut args = args.into_iter();

    let mut reordered: Vec<OsString> = args.next().into_iter().collect();
    let mut forwarded = Vec::new();

    let mut first = true;
    while let Some(arg) = args.next() {
        let text = arg.to_string_lossy();

        if text.starts_with(OPTION_PREFIX) {
            let takes_value = VALUED_OPTIONS.contains(&text.as_ref());
            reordered.push(arg);

            if takes_value {
                reordered.extend(args.next());
            }
        } else if first && matches!(text.as_ref(), "--help" | "-h" | "--version" | "-V") {
            reordered.push(arg);
        } else {
            forwarded.push(arg);
        }

        first = false;
    }

    if !forwarded.is_empty() {
        reordered.push("--".into());
        reordered.extend(forwarded);
    }

    reordered
}
