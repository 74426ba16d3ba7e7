pub mod health;
pub mod languages;
pub mod process;

pub use health::health_check;
pub use languages::list_languages;
pub use process::{process_files, quick_extract};
