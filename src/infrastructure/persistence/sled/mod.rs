//! Sled Persistence - 音频数据存储

mod audio_store;

pub use audio_store::{SledAudioStore, SledStoreConfig};
