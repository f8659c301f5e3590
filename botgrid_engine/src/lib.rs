//! Runs untrusted player scripts against bot grid levels.
//!
//! A script is first checked by [`validate::Validator`], then executed by
//! [`sandbox::execute`] on a worker thread owned by [`attempt::Engine`]. The
//! simulation itself lives in `botgrid_sim`.

pub mod attempt;
pub mod config;
pub mod sandbox;
pub mod validate;

pub use attempt::{AttemptError, AttemptReport, Engine, ScriptCheck, Verdict};
pub use config::SandboxConfig;
pub use sandbox::{Execution, Outcome};
pub use validate::{ValidationError, Validator};
