//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod audio;
pub mod tts;

pub use audio::WavMerger;
pub use tts::{FakeTtsClient, FakeTtsClientConfig, HttpTtsClient, HttpTtsClientConfig};
