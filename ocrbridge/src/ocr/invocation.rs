use std::fmt;

use crate::config::EngineConfig;

use super::request::ExtractionRequest;

pub const FLAG_BATCH: &str = "--batch";
pub const FLAG_JSON: &str = "--json";
pub const FLAG_DETAIL: &str = "--detail";
pub const FLAG_LANGUAGES: &str = "--languages";
pub const FLAG_DPI: &str = "--dpi";

/// The engine executable plus any arguments that precede every request,
/// typically the script path for an interpreter-hosted engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engine {
    program: String,
    leading_args: Vec<String>,
}

impl Engine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_leading_arg(mut self, arg: impl Into<String>) -> Self {
        self.leading_args.push(arg.into());
        self
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let engine = Self::new(config.program.clone());
        match &config.script {
            Some(script) => engine.with_leading_arg(script.clone()),
            None => engine,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn leading_args(&self) -> &[String] {
        &self.leading_args
    }

    /// Map a request onto the engine's positional command line.
    ///
    /// Order: paths, `--batch`, `--json`, `--detail`, `--languages <codes>`,
    /// `--dpi <n>`. The same request always yields the same invocation.
    pub fn build(&self, request: &ExtractionRequest) -> Invocation {
        let mut args = self.leading_args.clone();
        args.extend(request.paths().iter().cloned());

        if request.is_batch() {
            args.push(FLAG_BATCH.to_string());
        }
        if request.wants_structured() {
            args.push(FLAG_JSON.to_string());
        }
        if request.detail() {
            args.push(FLAG_DETAIL.to_string());
        }
        if !request.languages().is_empty() {
            args.push(FLAG_LANGUAGES.to_string());
            args.extend(request.languages().iter().cloned());
        }
        if let Some(dpi) = request.dpi() {
            args.push(FLAG_DPI.to_string());
            args.push(dpi.to_string());
        }

        Invocation {
            program: self.program.clone(),
            args,
            leading: self.leading_args.len(),
        }
    }

    /// `<engine> --help`, used to check that the engine can start at all.
    pub fn help(&self) -> Invocation {
        let mut args = self.leading_args.clone();
        args.push("--help".to_string());
        Invocation {
            program: self.program.clone(),
            args,
            leading: self.leading_args.len(),
        }
    }
}

/// A fully formed engine command. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    leading: usize,
}

impl Invocation {
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Arguments derived from the request, without the engine's leading ones.
    pub fn request_args(&self) -> &[String] {
        &self.args[self.leading..]
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}
