//! This crate provides a default implementation of a debugger (to be used with
//! `vsd-tracer`).
//!
//! The debugger is able to launch a process (on the **same host machine**)
//! under the Win32 debugging API, capture its standard streams through
//! anonymous pipes, and deliver its debug events.
//!
//! <div class="warning">
//!
//! *This crate is not meant to be used on its own! It merely implements the
//! interface (traits) provided by `vsd-tracer`, so that the debugger can
//! be used by that crate for supervising processes.*
//!
//! </div>
//!
//! # Supported Platforms
//!
//! <table>
//!     <thead>
//!         <tr>
//!             <th>Host Machine</th>
//!             <th>Debuggee Platform</th>
//!         </tr>
//!     </thead>
//!     <tbody>
//!         <tr>
//!             <td rowspan="2">Windows <code>x86_64</code></td>
//!             <td><code>x86_64</code></td>
//!         </tr>
//!         <tr>
//!             <td><code>i386</code> (WOW64)</td>
//!         </tr>
//!     </tbody>
//! </table>
//!
//! On other hosts, the crate builds but launching a process always fails
//! with an error.

mod common;
mod error;
mod sys;

pub use self::common::debugger::Debugger;
pub use self::common::session::Session;
pub use self::error::{Error, Result};
pub use self::sys::{ImageFile, PipeReader, PipeWriter, Process, Stopper};
