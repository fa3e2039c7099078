pub mod config;
pub mod error;
pub mod file_config;
pub mod plan;
pub mod score;
pub mod status;
pub mod types;

pub use config::AppConfig;
pub use error::{ContentFactoryError, Result};
pub use file_config::FileConfig;
pub use plan::{CallToAction, PlanStructure, Slide};
pub use score::parse_score;
pub use status::*;
pub use types::*;
