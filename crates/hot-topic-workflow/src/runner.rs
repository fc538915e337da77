//! Pipeline runner state machine.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use hot_topic_core::audio::AudioPayload;
use hot_topic_core::events::{PipelineEvent, StepId, StepOutput, StepStatus};
use hot_topic_core::types::TopicQuery;
use hot_topic_tts::SpeechSynthesizer;

use crate::TopicGenerator;
use crate::error::WorkflowError;

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    GeneratingText,
    SynthesizingSpeech,
    Complete,
    Failed,
}

impl RunState {
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, GeneratingText)
                | (GeneratingText, SynthesizingSpeech)
                | (SynthesizingSpeech, Complete)
                | (GeneratingText, Failed)
                | (SynthesizingSpeech, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Complete | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::GeneratingText => "generating-text",
            RunState::SynthesizingSpeech => "synthesizing-speech",
            RunState::Complete => "complete",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Final bundle of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutput {
    pub run_id: String,
    pub topics_text: String,
    pub audio: AudioPayload,
}

/// Executes `generate-hot-topic` then `tts`.
pub struct PipelineRunner {
    id: String,
    generator: Arc<dyn TopicGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

struct Run<'a> {
    run_id: String,
    state: RunState,
    events: &'a mpsc::UnboundedSender<PipelineEvent>,
}

impl Run<'_> {
    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        info!(run_id = %self.run_id, from = %self.state, to = %next, "Run state");
        self.state = next;
    }

    fn emit(&self, event: PipelineEvent) {
        // A closed receiver means nobody is listening; the run carries on.
        let _ = self.events.send(event);
    }

    fn fail(&mut self, step: StepId, message: String) -> WorkflowError {
        warn!(run_id = %self.run_id, %step, error = %message, "Step failed");
        self.advance(RunState::Failed);
        self.emit(PipelineEvent::Error {
            error: message.clone(),
            step: Some(step),
        });
        WorkflowError::StepFailed { step, message }
    }

    /// Await one step's work, honouring cancellation.
    async fn step<T, F>(
        &mut self,
        step: StepId,
        cancel: &CancellationToken,
        work: F,
    ) -> Result<T, WorkflowError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        self.emit(PipelineEvent::StepStart { id: step });
        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                warn!(run_id = %self.run_id, %step, "Run cancelled");
                return Err(WorkflowError::Cancelled { step });
            }
            outcome = work => outcome,
        };
        outcome.map_err(|e| self.fail(step, format!("{e:#}")))
    }

    fn step_done(&self, step: StepId, output: StepOutput) {
        self.emit(PipelineEvent::StepResult {
            id: step,
            status: StepStatus::Success,
            output,
        });
        self.emit(PipelineEvent::StepFinish { id: step });
    }
}

impl PipelineRunner {
    pub fn new(
        id: impl Into<String>,
        generator: Arc<dyn TopicGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            id: id.into(),
            generator,
            synthesizer,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run both steps, sending every lifecycle event to `events`.
    ///
    /// On success the last event sent is `finish`; on a step fault it is a
    /// single `error` naming the step. Cancellation stops the run without a
    /// terminal event.
    pub async fn run(
        &self,
        query: TopicQuery,
        events: mpsc::UnboundedSender<PipelineEvent>,
        cancel: CancellationToken,
    ) -> Result<WorkflowOutput, WorkflowError> {
        let mut run = Run {
            run_id: uuid::Uuid::new_v4().to_string(),
            state: RunState::Idle,
            events: &events,
        };
        info!(
            workflow = %self.id,
            run_id = %run.run_id,
            target_date = ?query.target_date,
            "Starting pipeline run"
        );
        run.emit(PipelineEvent::Start {
            run_id: run.run_id.clone(),
        });

        run.advance(RunState::GeneratingText);
        let run_id = run.run_id.clone();
        let topics_text = run
            .step(
                StepId::GenerateHotTopic,
                &cancel,
                self.generator.generate(&query, &run_id),
            )
            .await?;
        if topics_text.trim().is_empty() {
            return Err(run.fail(
                StepId::GenerateHotTopic,
                "generated topic text is empty".to_string(),
            ));
        }
        run.step_done(
            StepId::GenerateHotTopic,
            StepOutput {
                topics_text: topics_text.clone(),
                audio_data: None,
            },
        );

        run.advance(RunState::SynthesizingSpeech);
        let audio = run
            .step(StepId::Tts, &cancel, self.synthesizer.synthesize(&topics_text))
            .await?;
        run.step_done(
            StepId::Tts,
            StepOutput {
                topics_text: topics_text.clone(),
                audio_data: Some(audio.clone()),
            },
        );

        run.advance(RunState::Complete);
        run.emit(PipelineEvent::Finish {
            run_id: run.run_id.clone(),
            status: StepStatus::Success,
        });
        info!(run_id = %run.run_id, chars = topics_text.chars().count(), audio_bytes = audio.len(), "Pipeline run complete");

        Ok(WorkflowOutput {
            run_id: run.run_id,
            topics_text,
            audio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        use RunState::*;
        assert!(Idle.can_transition_to(GeneratingText));
        assert!(GeneratingText.can_transition_to(SynthesizingSpeech));
        assert!(SynthesizingSpeech.can_transition_to(Complete));
        assert!(GeneratingText.can_transition_to(Failed));
        assert!(SynthesizingSpeech.can_transition_to(Failed));
    }

    #[test]
    fn test_illegal_transitions() {
        use RunState::*;
        assert!(!Idle.can_transition_to(SynthesizingSpeech));
        assert!(!Idle.can_transition_to(Failed));
        assert!(!GeneratingText.can_transition_to(Complete));
        assert!(!Complete.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(GeneratingText));
    }

    #[test]
    fn test_terminal_states() {
        assert!(RunState::Complete.is_terminal());
        assert!(RunState::Failed.is_terminal());
        assert!(!RunState::SynthesizingSpeech.is_terminal());
        assert_eq!(RunState::SynthesizingSpeech.to_string(), "synthesizing-speech");
    }
}
