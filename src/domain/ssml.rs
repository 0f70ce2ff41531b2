//! SSML 渲染
//!
//! 把句子内容、音色参数和停顿标记渲染为合成服务接受的 SSML。

use crate::domain::task::{Pause, VoiceParams};

fn escape_into(out: &mut String, ch: char) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&apos;"),
        _ => out.push(ch),
    }
}

fn push_breaks(out: &mut String, pauses: &[Pause], position: usize) {
    for pause in pauses.iter().filter(|p| p.position == position) {
        out.push_str(&format!("<break time=\"{}ms\"/>", pause.duration_ms));
    }
}

/// 渲染 SSML
///
/// 语速、音调以 100% 为中性值叠加偏移；音量偏移以 dB 表示。
/// `pauses` 的位置为字符偏移。
pub fn render_ssml(content: &str, voice: &VoiceParams, pauses: &[Pause]) -> String {
    let mut body = String::with_capacity(content.len() + 32);
    let mut position = 0;
    for ch in content.chars() {
        push_breaks(&mut body, pauses, position);
        escape_into(&mut body, ch);
        position += 1;
    }
    push_breaks(&mut body, pauses, position);

    let prosody = format!(
        "<prosody rate=\"{}%\" volume=\"{:+}dB\" pitch=\"{}%\">{}</prosody>",
        100 + voice.speech_rate,
        voice.volume,
        100 + voice.pitch,
        body
    );

    match &voice.voice_id {
        Some(voice_id) => {
            let mut name = String::new();
            voice_id.chars().for_each(|c| escape_into(&mut name, c));
            format!("<speak><voice name=\"{}\">{}</voice></speak>", name, prosody)
        }
        None => format!("<speak>{}</speak>", prosody),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::PauseKind;

    #[test]
    fn test_neutral_params() {
        let ssml = render_ssml("你好", &VoiceParams::default(), &[]);
        assert_eq!(
            ssml,
            "<speak><prosody rate=\"100%\" volume=\"+0dB\" pitch=\"100%\">你好</prosody></speak>"
        );
    }

    #[test]
    fn test_voice_breaks_and_escaping() {
        let voice = VoiceParams {
            voice_id: Some("v1".to_string()),
            speech_rate: 10,
            volume: -3,
            pitch: -5,
        };
        let pauses = vec![
            Pause {
                position: 1,
                duration_ms: 300,
                kind: PauseKind::Pause,
            },
            Pause {
                position: 3,
                duration_ms: 500,
                kind: PauseKind::Silence,
            },
        ];

        let ssml = render_ssml("a<b", &voice, &pauses);
        assert_eq!(
            ssml,
            "<speak><voice name=\"v1\"><prosody rate=\"110%\" volume=\"-3dB\" pitch=\"95%\">\
             a<break time=\"300ms\"/>&lt;b<break time=\"500ms\"/></prosody></voice></speak>"
        );
    }
}
