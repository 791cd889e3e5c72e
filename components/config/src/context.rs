/// Ambient logging/tracing handle threaded through the store and core crates.
///
/// Mirrors the calling convention of `chainhook_sdk::utils::Context`: a `None` logger means every
/// `try_*!` call below silently no-ops, so the same code path runs in tests (which build an empty
/// `Context`) and in production (which wires one to a real `slog::Logger`).
#[derive(Clone, Default)]
pub struct Context {
    pub logger: Option<slog::Logger>,
    pub tracer: bool,
}

impl Context {
    pub fn empty() -> Context {
        Context {
            logger: None,
            tracer: false,
        }
    }

    pub fn expect_logger(&self) -> &slog::Logger {
        self.logger.as_ref().expect("logger expected")
    }
}

#[macro_export]
macro_rules! try_info {
    ($ctx:expr, $($arg:tt)*) => {
        if let Some(ref logger) = $ctx.logger {
            slog::info!(logger, $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! try_debug {
    ($ctx:expr, $($arg:tt)*) => {
        if let Some(ref logger) = $ctx.logger {
            slog::debug!(logger, $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! try_warn {
    ($ctx:expr, $($arg:tt)*) => {
        if let Some(ref logger) = $ctx.logger {
            slog::warn!(logger, $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! try_error {
    ($ctx:expr, $($arg:tt)*) => {
        if let Some(ref logger) = $ctx.logger {
            slog::error!(logger, $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! try_crit {
    ($ctx:expr, $($arg:tt)*) => {
        if let Some(ref logger) = $ctx.logger {
            slog::crit!(logger, $($arg)*);
        }
    };
}
