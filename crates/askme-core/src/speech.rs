//! Speech adapters backed by external programs.
//!
//! - [`CommandSpeechOutput`]: text-to-speech through a configured command or
//!   an autodetected synthesizer (`espeak-ng`, `espeak`, `say`, `spd-say`).
//!   Utterances are queued on a channel and played one at a time.
//! - [`CommandSpeechInput`]: runs a configured recognizer and takes the first
//!   non-empty stdout line as the transcript.
//! - [`NoSpeech`]: null adapter for both directions.
//!
//! Configured commands run through `sh -c` and receive the locale, rate and
//! pitch as `ASKME_SPEECH_LOCALE`, `ASKME_SPEECH_RATE` and
//! `ASKME_SPEECH_PITCH`. Output commands read the utterance on stdin.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use futures_util::future::BoxFuture;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::SpeechConfig;
use crate::ports::{SpeechError, SpeechInput, SpeechOutput};

/// Synthesizers probed on `PATH`, in order.
const KNOWN_SYNTHESIZERS: &[&str] = &["espeak-ng", "espeak", "say", "spd-say"];

/// Speaking rate of `espeak`/`say` at rate 1.0, in words per minute.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

#[derive(Debug, Clone, PartialEq)]
enum Synthesizer {
    /// User command reading text on stdin.
    Shell(String),
    /// Known program; the text goes on stdin or after `--`, never where it
    /// could be read as an option.
    Program { name: String, path: PathBuf },
}

#[derive(Debug, Clone)]
struct Voice {
    locale: String,
    rate: f32,
    pitch: f32,
}

impl Voice {
    fn from_config(config: &SpeechConfig) -> Self {
        Self {
            locale: config.locale.clone(),
            rate: config.rate,
            pitch: config.pitch,
        }
    }

    fn words_per_minute(&self) -> u32 {
        (BASE_WORDS_PER_MINUTE * self.rate).round().clamp(80.0, 450.0) as u32
    }

    /// `espeak` pitch is 0..=99 with 50 as the default.
    fn espeak_pitch(&self) -> u32 {
        (50.0 * self.pitch).round().clamp(0.0, 99.0) as u32
    }

    /// `spd-say` rate/pitch are -100..=100 with 0 as the default.
    fn spd_offset(value: f32) -> i32 {
        ((value - 1.0) * 100.0).round().clamp(-100.0, 100.0) as i32
    }

    fn language(&self) -> &str {
        self.locale.split(['-', '_']).next().unwrap_or("en")
    }
}

fn build_command(synth: &Synthesizer, voice: &Voice, text: &str) -> tokio::process::Command {
    let mut cmd = match synth {
        Synthesizer::Shell(command) => {
            let mut cmd = tokio::process::Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd.stdin(Stdio::piped());
            cmd
        }
        Synthesizer::Program { name, path } => {
            let mut cmd = tokio::process::Command::new(path);
            match name.as_str() {
                "espeak-ng" | "espeak" => {
                    cmd.arg("-v")
                        .arg(voice.language())
                        .arg("-s")
                        .arg(voice.words_per_minute().to_string())
                        .arg("-p")
                        .arg(voice.espeak_pitch().to_string())
                        .arg("--stdin");
                    cmd.stdin(Stdio::piped());
                }
                // Reads stdin when no text argument is given.
                "say" => {
                    cmd.arg("-r").arg(voice.words_per_minute().to_string());
                    cmd.stdin(Stdio::piped());
                }
                "spd-say" => {
                    cmd.arg("-w")
                        .arg("-l")
                        .arg(voice.language())
                        .arg("-r")
                        .arg(Voice::spd_offset(voice.rate).to_string())
                        .arg("-p")
                        .arg(Voice::spd_offset(voice.pitch).to_string())
                        .arg("--")
                        .arg(text);
                    cmd.stdin(Stdio::null());
                }
                _ => {
                    cmd.arg("--").arg(text);
                    cmd.stdin(Stdio::null());
                }
            }
            cmd
        }
    };
    cmd.env("ASKME_SPEECH_LOCALE", &voice.locale)
        .env("ASKME_SPEECH_RATE", voice.rate.to_string())
        .env("ASKME_SPEECH_PITCH", voice.pitch.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    cmd
}

async fn speak_once(synth: &Synthesizer, voice: &Voice, text: &str) -> std::io::Result<()> {
    let mut child = build_command(synth, voice, text).spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes()).await?;
        stdin.shutdown().await?;
    }
    let status = child.wait().await?;
    if !status.success() {
        tracing::warn!(%status, "Speech synthesizer exited unsuccessfully");
    }
    Ok(())
}

/// Text-to-speech through an external program.
pub struct CommandSpeechOutput {
    tx: Option<mpsc::UnboundedSender<String>>,
    worker: Option<JoinHandle<()>>,
}

impl CommandSpeechOutput {
    /// Resolves the synthesizer and starts the playback worker.
    ///
    /// Must be called within a tokio runtime. When speech is disabled or no
    /// synthesizer is found the adapter reports itself unavailable.
    pub fn spawn(config: &SpeechConfig) -> Self {
        let synth = if config.enabled {
            resolve_synthesizer(config.output_command.as_deref())
        } else {
            None
        };

        let Some(synth) = synth else {
            tracing::debug!("Speech output unavailable");
            return Self {
                tx: None,
                worker: None,
            };
        };

        tracing::debug!(?synth, "Speech output ready");
        let voice = Voice::from_config(config);
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let worker = tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                if let Err(e) = speak_once(&synth, &voice, &text).await {
                    tracing::warn!(error = %e, "Speech output failed");
                }
            }
        });

        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }
}

impl SpeechOutput for CommandSpeechOutput {
    fn is_available(&self) -> bool {
        self.tx.is_some()
    }

    fn speak(&self, text: &str) {
        if let Some(tx) = &self.tx
            && tx.send(text.to_string()).is_err()
        {
            tracing::warn!("Speech worker stopped; dropping utterance");
        }
    }

    fn finish(mut self: Box<Self>) -> BoxFuture<'static, ()> {
        self.tx = None;
        let worker = self.worker.take();
        Box::pin(async move {
            if let Some(worker) = worker
                && let Err(e) = worker.await
            {
                tracing::warn!(error = %e, "Speech worker panicked");
            }
        })
    }
}

fn resolve_synthesizer(configured: Option<&str>) -> Option<Synthesizer> {
    if let Some(command) = configured.map(str::trim).filter(|c| !c.is_empty()) {
        return Some(Synthesizer::Shell(command.to_string()));
    }
    let path_var = std::env::var_os("PATH")?;
    let dirs: Vec<PathBuf> = std::env::split_paths(&path_var).collect();
    KNOWN_SYNTHESIZERS.iter().find_map(|name| {
        find_in_dirs(name, &dirs).map(|path| Synthesizer::Program {
            name: (*name).to_string(),
            path,
        })
    })
}

fn find_in_dirs(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Speech-to-text through a configured recognizer command.
pub struct CommandSpeechInput {
    command: Option<String>,
    voice: Voice,
}

impl CommandSpeechInput {
    pub fn new(config: &SpeechConfig) -> Self {
        let command = config
            .input_command
            .as_deref()
            .map(str::trim)
            .filter(|c| config.enabled && !c.is_empty())
            .map(str::to_string);
        Self {
            command,
            voice: Voice::from_config(config),
        }
    }

    async fn recognize(&self, command: &str) -> Result<String, SpeechError> {
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .env("ASKME_SPEECH_LOCALE", &self.voice.locale)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SpeechError::new(format!("Failed to start recognizer: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::new(format!(
                "Recognizer exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        first_transcript_line(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| SpeechError::new("No speech was recognized"))
    }
}

impl SpeechInput for CommandSpeechInput {
    fn is_available(&self) -> bool {
        self.command.is_some()
    }

    fn listen(&self) -> BoxFuture<'_, Result<String, SpeechError>> {
        Box::pin(async move {
            let Some(command) = self.command.as_deref() else {
                return Err(SpeechError::new("Speech recognition is not available"));
            };
            self.recognize(command).await
        })
    }
}

fn first_transcript_line(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Adapter for hosts without speech support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpeech;

impl SpeechOutput for NoSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&self, _text: &str) {}
}

impl SpeechInput for NoSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn listen(&self) -> BoxFuture<'_, Result<String, SpeechError>> {
        Box::pin(async { Err(SpeechError::new("Speech recognition is not available")) })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn config_with(output: Option<String>, input: Option<String>) -> SpeechConfig {
        SpeechConfig {
            output_command: output,
            input_command: input,
            ..SpeechConfig::default()
        }
    }

    #[test]
    fn voice_maps_rate_and_pitch() {
        let voice = Voice::from_config(&SpeechConfig::default());
        assert_eq!(voice.words_per_minute(), 175);
        assert_eq!(voice.espeak_pitch(), 50);
        assert_eq!(Voice::spd_offset(1.0), 0);
        assert_eq!(Voice::spd_offset(1.5), 50);
        assert_eq!(voice.language(), "en");
    }

    fn program(name: &str) -> Synthesizer {
        Synthesizer::Program {
            name: name.to_string(),
            path: PathBuf::from(format!("/usr/bin/{name}")),
        }
    }

    fn args_of(cmd: &tokio::process::Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn leading_dash_text_is_never_an_option() {
        let voice = Voice::from_config(&SpeechConfig::default());
        let text = "-5 is negative";

        for name in ["espeak-ng", "espeak", "say"] {
            let args = args_of(&build_command(&program(name), &voice, text));
            assert!(!args.iter().any(|a| a == text), "{name}: {args:?}");
        }
        let espeak = args_of(&build_command(&program("espeak-ng"), &voice, text));
        assert_eq!(espeak.last().map(String::as_str), Some("--stdin"));

        let spd = args_of(&build_command(&program("spd-say"), &voice, text));
        assert_eq!(&spd[spd.len() - 2..], ["--", text]);
    }

    #[test]
    fn configured_command_wins_over_autodetect() {
        let synth = resolve_synthesizer(Some("  my-tts --fast ")).unwrap();
        assert_eq!(synth, Synthesizer::Shell("my-tts --fast".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn finds_executable_in_dirs() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let bin = dir.path().join("espeak");
        fs::write(&bin, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();
        let not_exec = dir.path().join("say");
        fs::write(&not_exec, "").unwrap();

        let dirs = vec![dir.path().to_path_buf()];
        assert_eq!(find_in_dirs("espeak", &dirs), Some(bin));
        assert_eq!(find_in_dirs("say", &dirs), None);
    }

    #[test]
    fn transcript_is_first_non_empty_line() {
        assert_eq!(
            first_transcript_line("\n  what is rust  \nignored\n"),
            Some("what is rust".to_string())
        );
        assert_eq!(first_transcript_line(" \n\n"), None);
    }

    #[tokio::test]
    async fn disabled_speech_is_unavailable() {
        let config = SpeechConfig {
            enabled: false,
            ..config_with(Some("cat".into()), Some("echo hi".into()))
        };
        let output = CommandSpeechOutput::spawn(&config);
        assert!(!output.is_available());
        assert!(!CommandSpeechInput::new(&config).is_available());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn output_plays_utterances_in_order() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("spoken.txt");
        let command = format!("cat >> '{}'; echo >> '{}'", log.display(), log.display());

        let output: Box<dyn SpeechOutput> =
            Box::new(CommandSpeechOutput::spawn(&config_with(Some(command), None)));
        assert!(output.is_available());
        output.speak("first");
        output.speak("second");
        output.finish().await;

        assert_eq!(fs::read_to_string(&log).unwrap(), "first\nsecond\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn input_reads_transcript_and_locale() {
        let config = config_with(None, Some("echo \"hello from $ASKME_SPEECH_LOCALE\"".into()));
        let input = CommandSpeechInput::new(&config);
        assert!(input.is_available());
        assert_eq!(input.listen().await.unwrap(), "hello from en-US");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_recognizer_is_an_error() {
        let input = CommandSpeechInput::new(&config_with(None, Some("echo nope >&2; exit 3".into())));
        let err = input.listen().await.unwrap_err();
        assert!(err.message.contains("nope"), "{err}");
    }

    #[tokio::test]
    async fn no_speech_degrades_silently() {
        let speech = NoSpeech;
        SpeechOutput::speak(&speech, "ignored");
        assert!(!SpeechOutput::is_available(&speech));
        assert!(SpeechInput::listen(&speech).await.is_err());
    }
}
