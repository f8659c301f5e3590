//! Static safety check run before any player script executes.
//!
//! This is a best-effort denylist over the parsed script, not a security
//! boundary on its own. Execution additionally runs with no standard
//! libraries and an environment that holds nothing but `bot`.

use anyhow::{Context, Result};
use full_moon::{
    ast::{FunctionCall, Prefix, Var},
    parse,
    visitors::Visitor,
};
use regex::Regex;
use thiserror::Error;

/// Library tables that reach outside the sandbox.
pub const DISALLOWED_MODULES: &[&str] = &[
    "os", "io", "debug", "package", "ffi", "jit", "socket", "lfs",
];

/// Builtins for dynamic code loading, metatable and environment access,
/// and error trapping (which would swallow the engine's unwind signals).
pub const DISALLOWED_BUILTINS: &[&str] = &[
    "load",
    "loadstring",
    "loadfile",
    "dofile",
    "require",
    "module",
    "getfenv",
    "setfenv",
    "getmetatable",
    "setmetatable",
    "rawget",
    "rawset",
    "rawequal",
    "newproxy",
    "collectgarbage",
    "pcall",
    "xpcall",
];

pub const GLOBAL_NAMESPACES: &[&str] = &["_G", "_ENV"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("script does not parse: {0}")]
    Parse(String),
    #[error("reference to disallowed module `{0}`")]
    DisallowedModule(String),
    #[error("reference to disallowed builtin `{0}`")]
    DisallowedBuiltin(String),
    #[error("access to the global namespace through `{0}`")]
    GlobalNamespace(String),
    #[error("{kind} pattern `{found}`")]
    ForbiddenPattern { kind: &'static str, found: String },
}

pub struct Validator {
    patterns: Vec<(&'static str, Regex)>,
}

impl Validator {
    pub fn new() -> Result<Self> {
        let sources = [
            ("dunder name", r"__[A-Za-z0-9_]+"),
            ("hex escape", r"\\x[0-9A-Fa-f]{2}"),
            ("decimal escape", r"\\[0-9]{1,3}"),
        ];
        let mut patterns = Vec::with_capacity(sources.len());
        for (kind, source) in sources {
            let regex = Regex::new(source)
                .with_context(|| format!("building {kind} pattern"))?;
            patterns.push((kind, regex));
        }
        Ok(Self { patterns })
    }

    /// Pure predicate over the script text; never executes anything.
    pub fn validate(&self, source: &str) -> Result<(), ValidationError> {
        let ast = parse(source).map_err(|error| ValidationError::Parse(error.to_string()))?;

        let mut scan = NameScan::default();
        scan.visit_ast(&ast);
        if let Some(violation) = scan.violation {
            return Err(violation);
        }

        for (kind, regex) in &self.patterns {
            if let Some(found) = regex.find(source) {
                return Err(ValidationError::ForbiddenPattern {
                    kind: *kind,
                    found: found.as_str().to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct NameScan {
    violation: Option<ValidationError>,
}

impl NameScan {
    fn check(&mut self, name: String) {
        if self.violation.is_some() {
            return;
        }
        let name_ref = name.as_str();
        self.violation = if DISALLOWED_MODULES.contains(&name_ref) {
            Some(ValidationError::DisallowedModule(name))
        } else if DISALLOWED_BUILTINS.contains(&name_ref) {
            Some(ValidationError::DisallowedBuiltin(name))
        } else if GLOBAL_NAMESPACES.contains(&name_ref) {
            Some(ValidationError::GlobalNamespace(name))
        } else {
            None
        };
    }

    fn check_prefix(&mut self, prefix: &Prefix) {
        if let Prefix::Name(name) = prefix {
            self.check(name.token().to_string());
        }
    }
}

impl Visitor for NameScan {
    fn visit_function_call(&mut self, call: &FunctionCall) {
        self.check_prefix(call.prefix());
    }

    fn visit_var(&mut self, var: &Var) {
        match var {
            Var::Name(name) => self.check(name.token().to_string()),
            Var::Expression(expression) => self.check_prefix(expression.prefix()),
            _ => {}
        }
    }
}
