//! This crate allows to launch a process and supervise its execution.
//!
//! Two main components are provided:
//! - A trait to implement a custom client, consuming supervision events
//!   (e.g., captured output, debug strings, process and module lifecycle).
//! - A few traits to implement a custom debugger, responsible for launching
//!   a process and delivering its debug events.
//!
//! # Consuming supervision events
//!
//! This is the main use case of this crate.
//!
//! The [Client](self::client::Client) trait allows to define custom logic
//! for handling events from a supervised process tree.
//!
//! ```no_run
//! use vsd_debugger::{Debugger, Session};
//!
//! use vsd_tracer::Command;
//! use vsd_tracer::client::{Child, Client};
//! use vsd_tracer::supervisor::Supervisor;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     // initialize the supervisor
//!     let supervisor = Supervisor::builder()
//!         .with_debugger(Debugger::default())
//!         .with_client(CustomClient)
//!         .trace_modules(true)
//!         .build();
//!
//!     // launch the process, and wait for the whole tree to exit
//!     let (outcome, _) = supervisor
//!         .run(Command::new("cmd").args(["/c", "echo hi"]))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(outcome.exit_code, 0);
//! }
//!
//! struct CustomClient;
//!
//! impl Client for CustomClient {
//!     type Session = Session;
//!     type Error = std::io::Error;
//!
//!     async fn write_debug(
//!         &mut self,
//!         _child: &Child<Self::Session>,
//!         _text: &str,
//!     ) -> Result<(), Self::Error> {
//!         //
//!         // do some action with the debug string
//!         //
//!
//!         Ok(())
//!     }
//! }
//! ```
//!
//! # Implementing a custom debugger
//!
//! This is the advanced use case of this crate.
//!
//! The [Debugger](self::debugger::Debugger)/[DebugSession](self::debugger::DebugSession)
//! traits allow to implement the inner debugging logic used for supervising
//! a process. The supervision engine never calls an OS API by itself, which
//! also allows to drive it from a scripted backend in tests.
//!
//! Most of the time, you won't need to go this far. The default debugger
//! provided by `vsd-debugger` relies on the Win32 debugging API.

/// Module containing the trait for consuming supervision events.
pub mod client;

/// Module containing traits for implementing a custom debugger.
pub mod debugger;

/// Module implementing the process supervisor.
pub mod supervisor;

mod codec;
mod command;
mod error;

pub use self::codec::{StreamDecoder, TextCodec, decode_wide};
pub use self::command::{Command, CommandEnv};
pub use self::error::{ClientError, DebuggerError, Error, LAUNCH_FAILURE_EXIT_CODE, Result};
