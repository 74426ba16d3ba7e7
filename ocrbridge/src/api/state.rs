use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::ocr::OcrService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ocr: OcrService,
    /// Cancelled on shutdown; in-flight engine runs are killed with it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config, ocr: OcrService, shutdown: CancellationToken) -> Self {
        Self {
            config: Arc::new(config),
            ocr,
            shutdown,
        }
    }
}
