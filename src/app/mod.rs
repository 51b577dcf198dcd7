pub mod setup;
pub mod streaming;

pub use setup::setup;
pub use streaming::sync_streaming_settings;
