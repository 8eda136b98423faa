//! One full run: credentials, news, questions, then one session per question.

use crate::cli::InclusiveRange;
use crate::news::NewsAggregator;
use crate::questions::QuestionSynthesizer;
use anyhow::{Context, Result};
use chrono::Local;
use dialoguer::console::style;
use std::time::Duration;
use surf_chat::{CredentialStore, SessionClient};
use tracing::{error, info};

/// Pauses between questions, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    None,
    Minutes(InclusiveRange),
}

pub struct RunOrchestrator {
    credentials: CredentialStore,
    news: NewsAggregator,
    synthesizer: QuestionSynthesizer,
    sessions: SessionClient,
    question_count: InclusiveRange,
    pacing: Pacing,
}

impl RunOrchestrator {
    pub fn new(
        credentials: CredentialStore,
        news: NewsAggregator,
        synthesizer: QuestionSynthesizer,
        sessions: SessionClient,
        question_count: InclusiveRange,
        pacing: Pacing,
    ) -> Self {
        Self {
            credentials,
            news,
            synthesizer,
            sessions,
            question_count,
            pacing,
        }
    }

    /// Run once. Failures are logged here and never reach the caller.
    pub async fn run(&mut self) {
        if let Err(e) = self.try_run().await {
            error!("Run aborted: {e:#}");
            info!(target: "plain", "{} {} {e:#}", style("✘").red(), style("Run failed:").bold());
        }
    }

    /// Every answer of the run, in question order.
    pub async fn try_run(&mut self) -> Result<Vec<String>> {
        let count = self.question_count.sample();
        info!(count, "starting run");

        // Fail early on bad credentials before spending an LLM call.
        self.credentials.access_token().await?;

        let items = self.news.collect().await.context("News aggregation failed")?;
        info!(items = items.len(), "news aggregated");

        let questions = self
            .synthesizer
            .synthesize(&items, count, Local::now().date_naive())
            .await
            .context("Question synthesis failed")?;
        let questions: Vec<String> = questions.into_iter().take(count).collect();

        let total = questions.len();
        info!(target: "plain", "\n{}", style("=== Surf AI Chat ===").cyan().bold());
        info!(target: "plain", "{}", style(format!("{total} question(s)")).dim());

        let mut answers = Vec::with_capacity(total);
        for (i, question) in questions.iter().enumerate() {
            info!(target: "plain", "\n{}", style(format!("--- Question {}/{total} ---", i + 1)).blue().bold());
            info!(target: "plain", "{} {} {}\n", style("❓").yellow(), style("Question:").bold(), style(question).dim());

            let answer = self
                .sessions
                .ask(question, &mut self.credentials)
                .await
                .with_context(|| format!("Question {}/{total} failed", i + 1))?;

            info!(target: "plain", "\n{}", style("=== Answer ===").green().bold());
            info!(target: "plain", "{answer}\n");
            answers.push(answer);

            if i + 1 < total {
                self.pause().await;
            }
        }

        info!(target: "plain", "{}", style("✔ All questions completed").green().bold());
        Ok(answers)
    }

    async fn pause(&self) {
        let Pacing::Minutes(range) = self.pacing else {
            return;
        };
        let minutes = range.sample();
        if minutes == 0 {
            return;
        }
        info!(target: "plain", "{}", style(format!("⏳ Waiting {minutes} minute(s) before the next question")).dim());
        tokio::time::sleep(Duration::from_secs(minutes as u64 * 60)).await;
    }
}
