#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

extern crate alloc;

pub use color_eyre::eyre;
pub use log::LevelFilter;
pub use partwise_testhelpers_macros::test;

use alloc::rc::Rc;
use core::cell::RefCell;
use log::{Level, Log, Metadata, Record};
use owo_colors::{OwoColorize, Style};
use std::io::Write;
use std::sync::Once;

struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level_style = match record.level() {
            Level::Error => Style::new().fg_rgb::<243, 139, 168>(),
            Level::Warn => Style::new().fg_rgb::<249, 226, 175>(),
            Level::Info => Style::new().fg_rgb::<166, 227, 161>(),
            Level::Debug => Style::new().fg_rgb::<137, 180, 250>(),
            Level::Trace => Style::new().fg_rgb::<148, 226, 213>(),
        };

        // Only the crate part of the target: `partwise_reflect::builder` -> `partwise_reflect`
        let target = record.target();
        let krate = target.split("::").next().unwrap_or(target);

        eprintln!(
            "{:>5} {}: {}",
            record.level().style(level_style),
            krate.style(Style::new().fg_rgb::<137, 180, 250>()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// The level to log at when a test doesn't ask for one: `PARTWISE_LOG`, or `trace`.
pub fn default_level() -> LevelFilter {
    std::env::var("PARTWISE_LOG")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Trace)
}

/// Installs color-backtrace (except on miri) and the logger, at the default level.
pub fn setup() {
    setup_at(default_level());
}

/// Like [`setup`], but logs at `level`.
///
/// The hooks and the logger are installed once per process; later calls only
/// change the level.
pub fn setup_at(level: LevelFilter) {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(install_hooks);
    log::set_max_level(level);
}

fn install_hooks() {
    #[cfg(not(miri))]
    {
        use color_eyre::config::HookBuilder;
        use regex::Regex;
        use std::sync::LazyLock;

        /// Frames from the panic machinery and the test harness, which never
        /// say anything about the failure.
        static IGNORE_FRAMES: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^(std::panic|core::panic|test::run_test|__pthread_cond_wait|std::sys::(pal|backtrace)|std::thread::Builder|core::ops::function|test::__rust_begin_short_backtrace|<core::panic::|<alloc::boxed::Box<F,A> as core::ops::function::FnOnce<Args>>::call_once)")
                .expect("frame filter regex is valid")
        });

        let eyre_filter = move |frames: &mut Vec<&color_eyre::config::Frame>| {
            frames.retain(|frame| {
                frame
                    .name
                    .as_ref()
                    .map(|n| !IGNORE_FRAMES.is_match(&n.to_string()))
                    .unwrap_or(true)
            });
        };

        // Another hook may already be installed by a test binary of its own.
        let _ = HookBuilder::default()
            .add_frame_filter(Box::new(eyre_filter))
            .install();

        {
            use color_backtrace::{BacktracePrinter, Frame};

            let filter = move |frames: &mut Vec<&Frame>| {
                frames.retain(|frame| {
                    frame
                        .name
                        .as_ref()
                        .map(|name| !IGNORE_FRAMES.is_match(name))
                        .unwrap_or(true)
                });
            };

            let stderr = color_backtrace::termcolor::StandardStream::stderr(
                color_backtrace::termcolor::ColorChoice::Auto,
            );
            let printer = BacktracePrinter::new().add_frame_filter(Box::new(filter));
            printer.install(Box::new(stderr));
        }
    }

    // Fails if the test binary installed its own logger, which then wins.
    let _ = log::set_boxed_logger(Box::new(SimpleLogger));
}

/// Collects values pushed from listener callbacks.
///
/// Clones share the same storage, so one clone can move into a callback while
/// the test keeps another to look at what was recorded.
pub struct Recorder<T> {
    events: Rc<RefCell<Vec<T>>>,
}

impl<T> Recorder<T> {
    /// Creates an empty recorder
    pub fn new() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Records `event`
    pub fn push(&self, event: T) {
        self.events.borrow_mut().push(event);
    }

    /// Removes and returns everything recorded so far
    pub fn take(&self) -> Vec<T> {
        core::mem::take(&mut *self.events.borrow_mut())
    }

    /// Number of events recorded so far
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Returns true if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl<T: Clone> Recorder<T> {
    /// Everything recorded so far, leaving it in place
    pub fn events(&self) -> Vec<T> {
        self.events.borrow().clone()
    }
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            events: Rc::clone(&self.events),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}
