//! WAV 容器解析与编码
//!
//! 只处理 RIFF/WAVE 容器本身，解码交给 symphonia

use crate::application::ports::MergeAudioError;

const PCM_FORMAT: u16 = 1;

/// fmt chunk 中决定能否直接拼接的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl WavFormat {
    pub fn pcm16(sample_rate: u32, channels: u16) -> Self {
        Self {
            audio_format: PCM_FORMAT,
            channels,
            sample_rate,
            bits_per_sample: 16,
        }
    }

    fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8)
    }

    fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// 按数据块长度计算时长（毫秒）
    pub fn duration_ms(&self, data_len: usize) -> u64 {
        let block_align = self.block_align() as u64;
        if block_align == 0 || self.sample_rate == 0 {
            return 0;
        }
        (data_len as u64 / block_align) * 1000 / self.sample_rate as u64
    }
}

/// 解析结果，`data` 借用原始字节
#[derive(Debug)]
pub struct WavInfo<'a> {
    pub format: WavFormat,
    pub data: &'a [u8],
}

impl WavInfo<'_> {
    pub fn duration_ms(&self) -> u64 {
        self.format.duration_ms(self.data.len())
    }
}

fn invalid(reason: &str) -> MergeAudioError {
    MergeAudioError::InvalidFormat(reason.to_string())
}

fn read_u16(data: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([data[pos], data[pos + 1]])
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

/// 解析 WAV 文件头，定位 fmt 与 data chunk
pub fn parse_wav(data: &[u8]) -> Result<WavInfo<'_>, MergeAudioError> {
    if data.len() < 12 {
        return Err(invalid("WAV data too short"));
    }
    if &data[0..4] != b"RIFF" {
        return Err(invalid("missing RIFF header"));
    }
    if &data[8..12] != b"WAVE" {
        return Err(invalid("missing WAVE identifier"));
    }

    let mut pos = 12;
    let mut format: Option<WavFormat> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32(data, pos + 4) as usize;
        let body = pos + 8;

        match chunk_id {
            b"fmt " => {
                if chunk_size < 16 || body + 16 > data.len() {
                    return Err(invalid("invalid fmt chunk"));
                }
                format = Some(WavFormat {
                    audio_format: read_u16(data, body),
                    channels: read_u16(data, body + 2),
                    sample_rate: read_u32(data, body + 4),
                    bits_per_sample: read_u16(data, body + 14),
                });
            }
            b"data" => {
                let format = format.ok_or_else(|| invalid("data chunk before fmt chunk"))?;
                // 流式写出的文件可能带占位长度，按实际剩余字节截断
                let end = body.saturating_add(chunk_size).min(data.len());
                return Ok(WavInfo {
                    format,
                    data: &data[body..end],
                });
            }
            _ => {}
        }

        pos = body.saturating_add(chunk_size);
        // 对齐到偶数字节
        if chunk_size % 2 != 0 {
            pos += 1;
        }
    }

    match format {
        Some(_) => Err(invalid("missing data chunk")),
        None => Err(invalid("missing fmt chunk")),
    }
}

/// 以给定格式写出 WAV 头与数据
pub fn write_wav(format: &WavFormat, data: &[u8]) -> Vec<u8> {
    let mut wav = Vec::with_capacity(44 + data.len());

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&format.audio_format.to_le_bytes());
    wav.extend_from_slice(&format.channels.to_le_bytes());
    wav.extend_from_slice(&format.sample_rate.to_le_bytes());
    wav.extend_from_slice(&format.byte_rate().to_le_bytes());
    wav.extend_from_slice(&format.block_align().to_le_bytes());
    wav.extend_from_slice(&format.bits_per_sample.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data.len() as u32).to_le_bytes());
    wav.extend_from_slice(data);

    wav
}

/// 将交错的 i16 样本编码为 16-bit PCM WAV
pub fn encode_pcm16(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        data.extend_from_slice(&sample.to_le_bytes());
    }
    write_wav(&WavFormat::pcm16(sample_rate, channels), &data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_encoded_wav() {
        let wav = encode_pcm16(&vec![0i16; 16000], 16000, 1);

        let info = parse_wav(&wav).unwrap();
        assert_eq!(info.format, WavFormat::pcm16(16000, 1));
        assert_eq!(info.data.len(), 32000);
        assert_eq!(info.duration_ms(), 1000);
    }

    #[test]
    fn test_parse_skips_unknown_chunks() {
        let wav = encode_pcm16(&[1, 2, 3, 4], 8000, 2);
        // 在 fmt 与 data 之间插入一个奇数长度的 LIST chunk
        let mut patched = wav[..36].to_vec();
        patched.extend_from_slice(b"LIST");
        patched.extend_from_slice(&3u32.to_le_bytes());
        patched.extend_from_slice(&[0, 0, 0, 0]);
        patched.extend_from_slice(&wav[36..]);

        let info = parse_wav(&patched).unwrap();
        assert_eq!(info.format.channels, 2);
        assert_eq!(info.data, &wav[44..]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_wav(b"not a wav file at all").is_err());
        assert!(parse_wav(b"RIFF").is_err());

        let wav = encode_pcm16(&[0; 4], 8000, 1);
        assert!(matches!(
            parse_wav(&wav[..36]),
            Err(MergeAudioError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_truncated_data_chunk() {
        let wav = encode_pcm16(&[0; 100], 8000, 1);
        let info = parse_wav(&wav[..100]).unwrap();
        assert_eq!(info.data.len(), 56);
    }
}
