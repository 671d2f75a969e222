mod codepage;
mod error;
mod event;
mod handle;
mod launch;
mod pipe;
mod process;
mod session;
mod window;

pub use self::codepage::ansi_codepage;
pub use self::error::{Error, Result};
pub use self::launch::launch;
pub use self::pipe::{PipeReader, PipeWriter, create_pipe};
pub use self::process::{ImageFile, Process, Stopper};
pub use self::session::Session;
