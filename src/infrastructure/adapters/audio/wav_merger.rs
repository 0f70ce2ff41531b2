//! WAV Merger - 基于 symphonia 的音频拼接
//!
//! - 所有片段格式一致时直接拼接 data chunk
//! - 格式不一致时解码为 PCM，统一到第一个片段的采样率与声道后重新编码

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::wav::{encode_pcm16, parse_wav, write_wav, WavFormat};
use crate::application::ports::{AudioMergerPort, MergeAudioError, MergedAudio};

/// WAV 拼接器
#[derive(Debug, Default, Clone, Copy)]
pub struct WavMerger;

impl WavMerger {
    pub fn new() -> Self {
        Self
    }

    fn concat_same_format(
        &self,
        format: WavFormat,
        segments: &[&[u8]],
    ) -> MergedAudio {
        let total: usize = segments.iter().map(|s| s.len()).sum();
        let mut data = Vec::with_capacity(total);
        for segment in segments {
            data.extend_from_slice(segment);
        }

        MergedAudio {
            duration_ms: format.duration_ms(data.len()),
            data: write_wav(&format, &data),
            sample_rate: format.sample_rate,
            channels: format.channels,
        }
    }

    fn convert_and_concat(
        &self,
        segments: &[Vec<u8>],
    ) -> Result<MergedAudio, MergeAudioError> {
        let mut decoded = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            let audio = decode_to_pcm(segment).map_err(|e| match e {
                MergeAudioError::DecodeError(reason) => {
                    MergeAudioError::DecodeError(format!("segment {}: {}", index, reason))
                }
                other => other,
            })?;
            decoded.push(audio);
        }

        let target_rate = decoded[0].sample_rate;
        let target_channels = decoded[0].channels;

        let mut samples: Vec<f32> = Vec::new();
        for audio in &decoded {
            let remixed = remix(&audio.samples, audio.channels, target_channels);
            let resampled = resample(&remixed, audio.sample_rate, target_rate, target_channels);
            samples.extend(resampled);
        }

        let pcm: Vec<i16> = samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
            .collect();

        let frames = pcm.len() as u64 / target_channels.max(1) as u64;
        let duration_ms = if target_rate > 0 {
            frames * 1000 / target_rate as u64
        } else {
            0
        };

        Ok(MergedAudio {
            data: encode_pcm16(&pcm, target_rate, target_channels),
            duration_ms,
            sample_rate: target_rate,
            channels: target_channels,
        })
    }
}

impl AudioMergerPort for WavMerger {
    fn merge(&self, segments: &[Vec<u8>]) -> Result<MergedAudio, MergeAudioError> {
        if segments.is_empty() {
            return Err(MergeAudioError::Empty);
        }

        let mut parsed = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            let info = parse_wav(segment).map_err(|e| match e {
                MergeAudioError::InvalidFormat(reason) => {
                    MergeAudioError::InvalidFormat(format!("segment {}: {}", index, reason))
                }
                other => other,
            })?;
            parsed.push(info);
        }

        let first = parsed[0].format;
        if parsed.iter().all(|info| info.format == first) {
            let data: Vec<&[u8]> = parsed.iter().map(|info| info.data).collect();
            let merged = self.concat_same_format(first, &data);
            tracing::debug!(
                segments = segments.len(),
                duration_ms = merged.duration_ms,
                "Merged segments byte-wise"
            );
            return Ok(merged);
        }

        let merged = self.convert_and_concat(segments)?;
        tracing::debug!(
            segments = segments.len(),
            sample_rate = merged.sample_rate,
            channels = merged.channels,
            duration_ms = merged.duration_ms,
            "Merged segments with format conversion"
        );
        Ok(merged)
    }
}

#[derive(Debug)]
struct DecodedAudio {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

/// 使用 symphonia 解码为交错的 f32 样本
fn decode_to_pcm(data: &[u8]) -> Result<DecodedAudio, MergeAudioError> {
    let cursor = Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("wav");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| MergeAudioError::DecodeError(format!("probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| MergeAudioError::DecodeError("no audio track found".to_string()))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| MergeAudioError::DecodeError("unknown sample rate".to_string()))?;

    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .ok_or_else(|| MergeAudioError::DecodeError("unknown channel count".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| MergeAudioError::DecodeError(format!("decoder creation failed: {}", e)))?;

    let track_id = track.id;
    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(MergeAudioError::DecodeError(format!(
                    "packet read error: {}",
                    e
                )));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "Decode error (skipping packet)");
                continue;
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        let actual = num_frames * spec.channels.count();
        samples.extend(&sample_buf.samples()[..actual]);
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// 声道转换：多转单取平均，少转多复制最后一个声道
fn remix(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }
    let from = from as usize;
    let to = to as usize;

    let mut out = Vec::with_capacity(samples.len() / from * to);
    for frame in samples.chunks_exact(from) {
        if to == 1 {
            out.push(frame.iter().sum::<f32>() / from as f32);
        } else {
            for ch in 0..to {
                out.push(frame[ch.min(from - 1)]);
            }
        }
    }
    out
}

/// 简单线性重采样
fn resample(samples: &[f32], from_rate: u32, to_rate: u32, channels: u16) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || channels == 0 {
        return samples.to_vec();
    }

    let channel_count = channels as usize;
    let frame_count = samples.len() / channel_count;
    if frame_count == 0 {
        return Vec::new();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let new_frame_count = (frame_count as f64 * ratio) as usize;
    let mut resampled = Vec::with_capacity(new_frame_count * channel_count);

    for i in 0..new_frame_count {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        for ch in 0..channel_count {
            let idx0 = src_idx.min(frame_count - 1) * channel_count + ch;
            let idx1 = (src_idx + 1).min(frame_count - 1) * channel_count + ch;
            let s0 = samples[idx0];
            let s1 = samples[idx1];
            resampled.push(s0 + (s1 - s0) * frac);
        }
    }

    resampled
}
