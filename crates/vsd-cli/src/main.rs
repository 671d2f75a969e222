#![allow(missing_docs)]
#![allow(clippy::print_stderr)]

use tracing_subscriber::EnvFilter;
use vsd_cli::CliOpts;

fn main() {
    let cli = CliOpts::parse_from_cmdline();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::builder().with_env_var("VSD_LOG").from_env_lossy())
        .init();

    match vsd_cli::evaluate_run(cli) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("{e:?}");
            std::process::exit(1);
        }
    }
}
