//! Process runner abstraction.
//!
//! The [`Runner`] trait is the single seam between reconciliation logic and
//! the kubectl subprocess, allowing for different implementations (real CLI,
//! scripted mock for testing).

pub mod kubectl;
pub mod mock;

use crate::error::Result;

pub use kubectl::KubectlRunner;
pub use mock::{Call, MockRunner};

/// Runs the external tool once per call.
pub trait Runner: Send + Sync {
    /// Run the tool with `args`, feeding it `stdin` if given.
    ///
    /// Returns captured stdout. A non-zero exit is an error carrying the
    /// command line and captured stderr.
    fn run(&self, args: &[&str], stdin: Option<&str>) -> Result<String>;
}

impl<R: Runner + ?Sized> Runner for &R {
    fn run(&self, args: &[&str], stdin: Option<&str>) -> Result<String> {
        (**self).run(args, stdin)
    }
}

impl<R: Runner + ?Sized> Runner for Box<R> {
    fn run(&self, args: &[&str], stdin: Option<&str>) -> Result<String> {
        (**self).run(args, stdin)
    }
}
