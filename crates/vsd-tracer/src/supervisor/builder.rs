use std::time::Duration;

use encoding_rs::Encoding;

use super::stop::StopHandle;
use super::{ChannelMode, RunConfig, Supervisor};
use crate::client::Client;
use crate::debugger::{DebugScope, Debugger};

/// Builder for [Supervisor].
///
/// It is usually created by calling [Supervisor::builder], and allows to
/// specify which debugger and client to use for supervising a process.
pub struct Builder<S> {
    state: S,
}

impl Builder<NeedsDebugger> {
    pub(super) const fn new() -> Self {
        Self {
            state: NeedsDebugger,
        }
    }

    /// Specifies the debugger to use for launching and supervising a
    /// process.
    pub const fn with_debugger<D: Debugger>(self, debugger: D) -> Builder<NeedsClient<D>> {
        Builder {
            state: NeedsClient { debugger },
        }
    }
}

impl<D: Debugger> Builder<NeedsClient<D>> {
    /// Specifies the consumer of supervision events.
    pub fn with_client<C>(self, client: C) -> Builder<Ready<D, C>>
    where
        C: Client<Session = <D as Debugger>::Session>,
    {
        Builder {
            state: Ready {
                debugger: self.state.debugger,
                client,
                config: RunConfig::default(),
            },
        }
    }
}

impl<D, C> Builder<Ready<D, C>> {
    /// Replaces every option with the given configuration.
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.state.config = config;
        self
    }

    /// Specifies whether the standard error is captured on its own pipe,
    /// or merged with the standard output (default).
    pub fn channel_mode(mut self, mode: ChannelMode) -> Self {
        self.state.config.channel_mode = mode;
        self
    }

    /// Specifies which processes are debugged.
    ///
    /// By default, only the root process is.
    pub fn debug_scope(mut self, scope: DebugScope) -> Self {
        self.state.config.debug_scope = scope;
        self
    }

    /// Specifies whether module loads and unloads are reported to the
    /// client.
    pub fn trace_modules(mut self, enabled: bool) -> Self {
        self.state.config.trace_modules = enabled;
        self
    }

    /// Specifies how long to wait for a debug event before polling the
    /// output pipes again.
    pub fn event_timeout(mut self, timeout: Duration) -> Self {
        self.state.config.event_timeout = timeout;
        self
    }

    /// Specifies how long the root process is given to exit after its
    /// windows were asked to close.
    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.state.config.stop_timeout = timeout;
        self
    }

    /// Specifies the encoding of narrow text, overriding the one reported
    /// by the debugger.
    pub fn text_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.state.config.text_encoding = Some(encoding);
        self
    }

    /// Builds the supervisor.
    pub fn build(self) -> Supervisor<D, C> {
        let Ready {
            debugger,
            client,
            config,
        } = self.state;

        Supervisor {
            debugger,
            client,
            stop: StopHandle::new(config.stop_timeout),
            config,
        }
    }
}

pub struct NeedsDebugger;

pub struct NeedsClient<D> {
    debugger: D,
}

pub struct Ready<D, C> {
    debugger: D,
    client: C,
    config: RunConfig,
}
