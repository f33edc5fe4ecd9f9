mod config;
pub mod error;
pub mod storage;
pub mod transcript;

pub use config::Config;
pub use config::FramingMode;
pub use error::ClientError;
