//! What the user sees while a run streams in.

use serde_json::Value;
use tracing::{debug, warn};

use hot_topic_core::audio::AudioPayload;
use hot_topic_core::events::{PipelineEvent, StepId};

pub const INITIAL_STATUS: &str = "ここにステータスが表示されます。";

/// How a stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Finished,
    Failed(String),
}

/// Status line, result text and audio, updated one event at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunView {
    pub status: String,
    pub result_text: String,
    pub audio: Option<AudioPayload>,
    pub outcome: Option<RunOutcome>,
}

impl Default for RunView {
    fn default() -> Self {
        Self {
            status: INITIAL_STATUS.to_string(),
            result_text: String::new(),
            audio: None,
            outcome: None,
        }
    }
}

impl RunView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.outcome.is_some()
    }

    /// Parse one NDJSON line and apply it. Lines that are not a valid event
    /// are logged and skipped.
    ///
    /// `audioData` is normalized separately so an unplayable payload still
    /// delivers the step's text.
    pub fn apply_line(&mut self, line: &str) -> Option<PipelineEvent> {
        let parsed = serde_json::from_str::<Value>(line).and_then(|mut value| {
            let raw_audio = take_raw_audio(&mut value);
            serde_json::from_value::<PipelineEvent>(value).map(|event| (event, raw_audio))
        });
        match parsed {
            Ok((mut event, raw_audio)) => {
                if let Some(raw) = raw_audio {
                    if let PipelineEvent::StepResult { output, .. } = &mut event {
                        match AudioPayload::from_json(&raw) {
                            Ok(audio) => output.audio_data = Some(audio),
                            Err(e) => warn!(error = %e, "Discarding unplayable audio payload"),
                        }
                    }
                }
                self.apply(&event);
                Some(event)
            }
            Err(e) => {
                warn!(error = %e, line = %truncate(line, 200), "Skipping unparseable event line");
                None
            }
        }
    }

    pub fn apply(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::WorkflowStart { .. } => {
                self.status = "ワークフロー開始...".into();
            }
            PipelineEvent::Start { .. } => {
                self.status = "ワークフロー実行中...".into();
            }
            PipelineEvent::StepStart { id } => {
                self.status = format!("実行中: {id}");
            }
            PipelineEvent::StepResult { id, output, .. } => {
                self.status = format!("完了: {id}");
                if !output.topics_text.is_empty() {
                    self.result_text = output.topics_text.clone();
                }
                if *id == StepId::Tts {
                    match &output.audio_data {
                        Some(audio) => {
                            self.audio = Some(audio.clone());
                            self.status = "音声準備完了！再生ボタンを押してください。".into();
                        }
                        None => {
                            self.status = "テキスト完了、音声データの処理に失敗しました。".into();
                        }
                    }
                }
            }
            PipelineEvent::StepFinish { id } => {
                debug!(step = %id, "Step finished");
            }
            PipelineEvent::Finish { .. } => {
                self.status = "ワークフロー完了！".into();
                self.outcome = Some(RunOutcome::Finished);
            }
            PipelineEvent::Error { error, .. } | PipelineEvent::WorkflowError { error } => {
                self.status = format!("エラーが発生しました: {error}");
                self.outcome = Some(RunOutcome::Failed(error.clone()));
            }
        }
    }
}

fn take_raw_audio(value: &mut Value) -> Option<Value> {
    value
        .get_mut("payload")?
        .get_mut("output")?
        .as_object_mut()?
        .remove("audioData")
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
