use std::cell::Cell;
use std::collections::HashMap;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

/// Identifies one speak request. The session only honors the completion of
/// the utterance it is currently waiting on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Utterance {
    pub generation: u64,
    pub id: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeechStart {
    /// Speaking; completion is reported later with the same `Utterance`.
    Started,
    /// Nothing will be spoken (no voice, muted, or the synthesizer failed).
    Unavailable,
}

/// Text-to-speech capability. Implementations must not block: `speak`
/// returns immediately and completion is delivered out of band.
pub trait Speaker {
    fn speak(&self, text: &str, language: &str, utterance: Utterance) -> SpeechStart;
}

/// Speaker that never speaks.
pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak(&self, _text: &str, _language: &str, _utterance: Utterance) -> SpeechStart {
        SpeechStart::Unavailable
    }
}

/// Synthesizer default words per minute (espeak-ng).
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

pub type SpeechNotifier = Arc<dyn Fn(Utterance) + Send + Sync>;

/// Runs an external synthesizer (`espeak-ng` by default) per utterance.
/// Each child process is reaped on its own thread, which then calls the
/// notifier, whether the synthesizer succeeded or not.
pub struct CommandSpeaker {
    program: String,
    rate: f32,
    voices: HashMap<String, String>,
    notify: SpeechNotifier,
    spawn_failed: Cell<bool>,
}

impl CommandSpeaker {
    pub fn new(
        program: impl Into<String>,
        rate: f32,
        voices: HashMap<String, String>,
        notify: SpeechNotifier,
    ) -> Self {
        Self {
            program: program.into(),
            rate,
            voices,
            notify,
            spawn_failed: Cell::new(false),
        }
    }

    /// Configured voice for the locale, else its primary language subtag
    /// (`el-GR` -> `el`).
    pub fn voice_for(&self, language: &str) -> String {
        if let Some(voice) = self.voices.get(language) {
            return voice.clone();
        }
        language
            .split(['-', '_'])
            .next()
            .unwrap_or(language)
            .to_lowercase()
    }

    pub fn words_per_minute(&self) -> u32 {
        (BASE_WORDS_PER_MINUTE * self.rate.clamp(0.1, 4.0)).round() as u32
    }

    /// Synthesizer arguments. The text follows `--` so a spoken form that
    /// starts with `-` is never read as an option.
    fn args(&self, text: &str, language: &str) -> Vec<String> {
        vec![
            "-v".to_string(),
            self.voice_for(language),
            "-s".to_string(),
            self.words_per_minute().to_string(),
            "--".to_string(),
            text.to_string(),
        ]
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&self, text: &str, language: &str, utterance: Utterance) -> SpeechStart {
        if self.spawn_failed.get() {
            return SpeechStart::Unavailable;
        }

        let child = Command::new(&self.program)
            .args(self.args(text, language))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                log::warn!("speech disabled, could not run {}: {e}", self.program);
                self.spawn_failed.set(true);
                return SpeechStart::Unavailable;
            }
        };

        let notify = Arc::clone(&self.notify);
        thread::spawn(move || {
            match child.wait() {
                Ok(status) if !status.success() => {
                    log::debug!("synthesizer exited with {status}");
                }
                Err(e) => log::debug!("waiting on synthesizer failed: {e}"),
                _ => {}
            }
            notify(utterance);
        });

        SpeechStart::Started
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    fn speaker(program: &str, notify: SpeechNotifier) -> CommandSpeaker {
        let mut voices = HashMap::new();
        voices.insert("ja-JP".to_string(), "ja+f3".to_string());
        CommandSpeaker::new(program, 0.7, voices, notify)
    }

    #[test]
    fn test_voice_from_locale_prefix() {
        let s = speaker("espeak-ng", Arc::new(|_| {}));
        assert_eq!(s.voice_for("el-GR"), "el");
        assert_eq!(s.voice_for("pt_BR"), "pt");
        assert_eq!(s.voice_for("ja-JP"), "ja+f3");
    }

    #[test]
    fn test_rate_scales_words_per_minute() {
        let s = speaker("espeak-ng", Arc::new(|_| {}));
        assert!((122..=123).contains(&s.words_per_minute()));
        let full = CommandSpeaker::new("espeak-ng", 1.0, HashMap::new(), Arc::new(|_| {}));
        assert_eq!(full.words_per_minute(), 175);
    }

    #[test]
    fn test_text_comes_after_option_terminator() {
        let s = speaker("espeak-ng", Arc::new(|_| {}));
        let args = s.args("-ka", "ja-JP");
        let wpm = s.words_per_minute().to_string();
        assert_eq!(args, vec!["-v", "ja+f3", "-s", wpm.as_str(), "--", "-ka"]);
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let s = speaker("glyphdr-no-such-synthesizer", Arc::new(|_| {}));
        let u = Utterance { generation: 1, id: 0 };
        assert_eq!(s.speak("α", "el-GR", u), SpeechStart::Unavailable);
        assert_eq!(s.speak("β", "el-GR", u), SpeechStart::Unavailable);
    }

    #[cfg(unix)]
    #[test]
    fn test_completion_is_notified() {
        // `true` ignores its arguments and exits immediately.
        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        let s = speaker(
            "true",
            Arc::new(move |u| {
                let _ = tx.lock().map(|tx| tx.send(u));
            }),
        );
        let u = Utterance { generation: 2, id: 5 };
        assert_eq!(s.speak("あ", "ja-JP", u), SpeechStart::Started);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), u);
    }

    #[test]
    fn test_silent_speaker() {
        let u = Utterance { generation: 0, id: 0 };
        assert_eq!(SilentSpeaker.speak("α", "el-GR", u), SpeechStart::Unavailable);
    }
}
