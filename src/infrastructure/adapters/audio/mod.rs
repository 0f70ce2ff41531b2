//! Audio Adapter - WAV 解析与拼接

mod wav;
mod wav_merger;

pub use wav::{encode_pcm16, parse_wav, WavFormat, WavInfo};
pub use wav_merger::WavMerger;
