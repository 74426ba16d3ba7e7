#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use ocrbridge::ocr::{Engine, OcrService};
use tempfile::TempDir;

/// A throwaway engine: a `/bin/sh` script that receives the request
/// arguments as `$1..$n`.
pub struct FakeEngine {
    dir: TempDir,
    script: PathBuf,
}

impl FakeEngine {
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let script = dir.path().join("engine.sh");
        fs::write(&script, body).expect("Failed to write fake engine script");
        Self { dir, script }
    }

    pub fn script(&self) -> String {
        self.script.to_string_lossy().into_owned()
    }

    pub fn engine(&self) -> Engine {
        Engine::new("sh").with_leading_arg(self.script())
    }

    pub fn service(&self) -> OcrService {
        OcrService::new(
            self.engine(),
            std::sync::Arc::new(ocrbridge::ocr::TokioProcessRunner::new()),
        )
    }

    /// Path of a (nonexistent) input file inside the engine's temp dir.
    pub fn input(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }
}

pub fn init_test_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ocrbridge=debug")
        .with_test_writer()
        .try_init();
}
