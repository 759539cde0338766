pub mod cli;
pub mod error;
pub mod logging;

pub use cli::NetTarget;
pub use error::GbnError;
pub use logging::init_tracing;
