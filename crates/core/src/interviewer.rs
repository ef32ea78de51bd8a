//! LLM-backed Interviewer
//!
//! An `InterviewerService` that renders prompt templates, asks an
//! OpenAI-compatible model for text or JSON, and validates what comes back.
//! Replies that cannot be parsed or fall outside their documented ranges are
//! reported as errors rather than patched up.

use crate::capability::{AnswerEvaluation, InterviewerService, QuestionContext};
use crate::coverage::CriterionContribution;
use crate::interview::InterviewConfig;
use crate::llm_client::{LLMClient, ResponseMode};
use crate::memory::Exchange;
use crate::report::{ReportAssessment, TranscriptEntry};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Prompt template keys this service expects in its prompt map.
pub const PROMPT_KEYS: [&str; 8] = [
    "system_prompt",
    "introduction",
    "generate_question",
    "evaluate_answer",
    "classify_coverage",
    "closing",
    "reflection",
    "final_report",
];

/// Reply a model gives when it has nothing worth reflecting back.
const NO_REFLECTION: &str = "NONE";

#[derive(Deserialize, JsonSchema)]
struct CoverageReply {
    contributions: Vec<CriterionContribution>,
}

pub struct LlmInterviewer {
    client: Arc<dyn LLMClient>,
    prompts: HashMap<String, String>,
}

impl LlmInterviewer {
    /// # Arguments
    ///
    /// * `client` - The chat-completion client used for every call.
    /// * `prompts` - Templates keyed by the names in [`PROMPT_KEYS`].
    pub fn new(client: Arc<dyn LLMClient>, prompts: HashMap<String, String>) -> Self {
        Self { client, prompts }
    }

    /// Names of expected templates that are absent from the prompt map.
    pub fn missing_prompts(&self) -> Vec<&'static str> {
        PROMPT_KEYS
            .into_iter()
            .filter(|key| !self.prompts.contains_key(*key))
            .collect()
    }

    fn render(&self, key: &str, vars: &[(&str, String)]) -> Result<String> {
        let template = self
            .prompts
            .get(key)
            .with_context(|| format!("Missing prompt template: '{}'", key))?;
        // Single pass: substituted values are never scanned for placeholders.
        let mut rendered = String::with_capacity(template.len());
        let mut rest = template.as_str();
        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let tail = &rest[start..];
            let substitution = tail.find('}').and_then(|end| {
                vars.iter()
                    .find(|(name, _)| *name == &tail[1..end])
                    .map(|(_, value)| (value, end))
            });
            match substitution {
                Some((value, end)) => {
                    rendered.push_str(value);
                    rest = &tail[end + 1..];
                }
                None => {
                    rendered.push('{');
                    rest = &tail[1..];
                }
            }
        }
        rendered.push_str(rest);
        Ok(rendered)
    }

    async fn ask(&self, key: &str, vars: &[(&str, String)], mode: ResponseMode) -> Result<String> {
        let system = self.render("system_prompt", &[])?;
        let user = self.render(key, vars)?;
        debug!(prompt = key, "Calling interviewer model");
        let reply = self
            .client
            .complete(system, user, mode)
            .await
            .with_context(|| format!("Model call for '{}' failed", key))?;
        Ok(reply.trim().to_string())
    }

    async fn ask_json<T: DeserializeOwned + JsonSchema>(
        &self,
        key: &str,
        mut vars: Vec<(&str, String)>,
    ) -> Result<T> {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(T))?;
        vars.push(("schema", schema));
        let reply = self.ask(key, &vars, ResponseMode::Json).await?;
        parse_json(&reply).with_context(|| format!("Unparseable reply for '{}'", key))
    }
}

/// Parses a JSON reply, tolerating a surrounding markdown code fence.
fn parse_json<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    Ok(serde_json::from_str(body.trim())?)
}

fn render_history(history: &[Exchange]) -> String {
    if history.is_empty() {
        return "(no previous questions)".to_string();
    }
    history
        .iter()
        .enumerate()
        .map(|(i, ex)| format!("Q{n}: {}\nA{n}: {}", ex.question, ex.answer, n = i + 1))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_transcript(transcript: &[TranscriptEntry]) -> String {
    transcript
        .iter()
        .map(|entry| {
            let score = entry
                .score
                .map(|s| format!("{}/10", s))
                .unwrap_or_else(|| "unscored".to_string());
            format!(
                "Q{n}: {}\nA{n}: {}\nScore: {}",
                entry.question,
                entry.answer,
                score,
                n = entry.index + 1
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn config_vars(config: &InterviewConfig) -> Vec<(&'static str, String)> {
    vec![
        ("interview_type", config.interview_type.to_string()),
        ("target_role", config.target_role.clone()),
        ("difficulty", config.difficulty.to_string()),
        ("context", config.context.clone().unwrap_or_default()),
    ]
}

#[async_trait]
impl InterviewerService for LlmInterviewer {
    async fn generate_introduction(&self, config: &InterviewConfig) -> Result<String> {
        self.ask("introduction", &config_vars(config), ResponseMode::Text)
            .await
    }

    async fn generate_question(&self, context: &QuestionContext) -> Result<String> {
        let vars = vec![
            ("interview_type", context.interview_type.to_string()),
            ("target_role", context.target_role.clone()),
            ("difficulty", context.difficulty.to_string()),
            ("kind", context.kind.to_string()),
            ("number", (context.index + 1).to_string()),
            ("total", context.total_questions.to_string()),
            ("history", render_history(&context.history)),
            (
                "active_project",
                context.active_project.clone().unwrap_or_else(|| "none".into()),
            ),
            (
                "focus",
                context
                    .focus
                    .map(|c| c.label().to_string())
                    .unwrap_or_else(|| "none".into()),
            ),
            ("context", context.candidate_context.clone().unwrap_or_default()),
        ];
        let question = self
            .ask("generate_question", &vars, ResponseMode::Text)
            .await?;
        if question.is_empty() {
            bail!("Model returned an empty question");
        }
        Ok(question)
    }

    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        config: &InterviewConfig,
    ) -> Result<AnswerEvaluation> {
        let mut vars = config_vars(config);
        vars.push(("question", question.to_string()));
        vars.push(("answer", answer.to_string()));
        let evaluation: AnswerEvaluation = self.ask_json("evaluate_answer", vars).await?;
        if !(1..=10).contains(&evaluation.score) {
            bail!("Evaluation score out of range: {}", evaluation.score);
        }
        if let Some(confidence) = evaluation.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                bail!("Evaluation confidence out of range: {}", confidence);
            }
        }
        Ok(evaluation)
    }

    async fn classify_coverage(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<Vec<CriterionContribution>> {
        let vars = vec![
            ("question", question.to_string()),
            ("answer", answer.to_string()),
        ];
        let reply: CoverageReply = self.ask_json("classify_coverage", vars).await?;
        for contribution in &reply.contributions {
            if !(0.0..=1.0).contains(&contribution.score) {
                bail!(
                    "Coverage score for '{}' out of range: {}",
                    contribution.criterion,
                    contribution.score
                );
            }
        }
        Ok(reply.contributions)
    }

    async fn generate_closing(&self, config: &InterviewConfig) -> Result<String> {
        self.ask("closing", &config_vars(config), ResponseMode::Text)
            .await
    }

    async fn generate_reflection(
        &self,
        answer: &str,
        previous_reflection: Option<String>,
    ) -> Result<Option<String>> {
        let vars = [
            ("answer", answer.to_string()),
            ("previous", previous_reflection.unwrap_or_default()),
        ];
        let reply = self.ask("reflection", &vars, ResponseMode::Text).await?;
        if reply.is_empty() || reply.eq_ignore_ascii_case(NO_REFLECTION) {
            return Ok(None);
        }
        Ok(Some(reply))
    }

    async fn generate_final_report(
        &self,
        transcript: &[TranscriptEntry],
        scores: &[u8],
    ) -> Result<ReportAssessment> {
        let scores = scores
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let vars = vec![
            ("transcript", render_transcript(transcript)),
            ("scores", scores),
        ];
        self.ask_json("final_report", vars).await
    }
}
