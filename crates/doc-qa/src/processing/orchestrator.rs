//! End-to-end answering: chunk, batch, select, call the model, reassemble

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use super::batcher::{split_into_parts, QuestionGroup};
use crate::config::{BatchingConfig, QaConfig, RetrievalConfig, RetrievalStrategy};
use crate::error::Result;
use crate::generation::PromptBuilder;
use crate::ingestion::{TextChunker, TextExtractor};
use crate::providers::{EmbeddingProvider, GatewayResponse, ModelGateway, RotationKey};
use crate::retrieval::{LexicalSelector, RelevanceSelector, SemanticIndex, SemanticSelector};
use crate::types::{Chunk, RunRequest, LLM_ERROR_ANSWER, UNEXPECTED_FORMAT_ANSWER};

/// Answers for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// One answer per question, in question order
    pub answers: Vec<String>,
    /// Number of questions in the request
    pub question_count: usize,
}

/// Answers produced for one sub-group, tagged with its absolute offset
type GroupAnswers = (usize, Vec<String>);

/// Drives a request through extraction, chunking, selection and the model gateway
pub struct AnswerOrchestrator {
    extractor: Arc<dyn TextExtractor>,
    gateway: Arc<dyn ModelGateway>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    chunker: TextChunker,
    retrieval: RetrievalConfig,
    batching: BatchingConfig,
}

impl AnswerOrchestrator {
    /// Create a new orchestrator
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        gateway: Arc<dyn ModelGateway>,
        config: &QaConfig,
    ) -> Self {
        Self {
            extractor,
            gateway,
            embedder: None,
            chunker: TextChunker::new(config.chunking.max_tokens),
            retrieval: config.retrieval.clone(),
            batching: config.batching.clone(),
        }
    }

    /// Attach the embedding backend used by the semantic strategy
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Validate, extract the document, then answer every question.
    ///
    /// Validation and extraction failures fail the request; model failures
    /// only replace the affected group's answers with placeholders.
    pub async fn answer_document(&self, request: RunRequest) -> Result<RunOutcome> {
        let run = request.validate()?;
        tracing::info!(
            "Answering {} questions against {}",
            run.questions.len(),
            run.documents
        );

        let started = Instant::now();
        let text = self.extractor.extract_text(&run.documents).await?;
        tracing::info!(
            "Extracted {} characters in {:?}",
            text.len(),
            started.elapsed()
        );

        Ok(self.run(&text, &run.questions).await)
    }

    /// Answer `questions` from `document_text`. Always returns one answer per question.
    pub async fn run(&self, document_text: &str, questions: &[String]) -> RunOutcome {
        let question_count = questions.len();
        if question_count == 0 {
            return RunOutcome {
                answers: Vec::new(),
                question_count,
            };
        }

        let started = Instant::now();
        let chunks = self.chunker.chunk(document_text);
        let selector = self.selector_for(&chunks).await;
        let groups = split_into_parts(questions, self.batching.groups);
        let limiter = self.batching.max_in_flight.map(|n| Semaphore::new(n.max(1)));

        tracing::info!(
            "{} chunks, {} questions in {} groups, {} selection",
            chunks.len(),
            question_count,
            groups.len(),
            selector.name()
        );

        let base_key = self.gateway.begin_request();
        let per_group = join_all(groups.iter().enumerate().map(|(g, group)| {
            self.answer_group(
                selector.as_ref(),
                &chunks,
                group,
                base_key.offset(g),
                limiter.as_ref(),
            )
        }))
        .await;

        let mut answers = vec![String::new(); question_count];
        for (offset, group_answers) in per_group.into_iter().flatten() {
            for (i, answer) in group_answers.into_iter().enumerate() {
                answers[offset + i] = answer;
            }
        }

        tracing::info!("Answered {} questions in {:?}", question_count, started.elapsed());
        RunOutcome {
            answers,
            question_count,
        }
    }

    /// Selector for this document; semantic selection degrades to lexical when embedding fails
    async fn selector_for(&self, chunks: &[Chunk]) -> Arc<dyn RelevanceSelector> {
        let lexical = || -> Arc<dyn RelevanceSelector> {
            Arc::new(LexicalSelector::new(self.retrieval.smart_trim))
        };

        match (self.retrieval.strategy, &self.embedder) {
            (RetrievalStrategy::Lexical, _) => lexical(),
            (RetrievalStrategy::Semantic, None) => {
                tracing::warn!("Semantic retrieval configured without an embedder, using lexical");
                lexical()
            }
            (RetrievalStrategy::Semantic, Some(embedder)) => {
                match SemanticIndex::build(embedder.as_ref(), chunks).await {
                    Ok(index) => Arc::new(SemanticSelector::new(
                        index,
                        Arc::clone(embedder),
                        self.retrieval.similarity_threshold,
                        self.retrieval.top_k,
                        self.retrieval.smart_trim,
                    )),
                    Err(e) => {
                        tracing::warn!("Chunk embedding failed, using lexical selection: {}", e);
                        lexical()
                    }
                }
            }
        }
    }

    /// Split a top-level group into sub-groups and dispatch them per the schedule
    async fn answer_group(
        &self,
        selector: &dyn RelevanceSelector,
        chunks: &[Chunk],
        group: &QuestionGroup,
        key: RotationKey,
        limiter: Option<&Semaphore>,
    ) -> Vec<GroupAnswers> {
        let sub_groups = group.split(self.batching.sub_groups);

        match self.batching.schedule.delay() {
            None => {
                join_all(
                    sub_groups
                        .iter()
                        .map(|sub| self.answer_sub_group(selector, chunks, sub, key, limiter)),
                )
                .await
            }
            Some(delay) => {
                let mut results = Vec::with_capacity(sub_groups.len());
                for (i, sub) in sub_groups.iter().enumerate() {
                    if i > 0 && !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    results.push(self.answer_sub_group(selector, chunks, sub, key, limiter).await);
                }
                results
            }
        }
    }

    /// Select context for one sub-group, call the gateway and validate the reply
    async fn answer_sub_group(
        &self,
        selector: &dyn RelevanceSelector,
        chunks: &[Chunk],
        sub: &QuestionGroup,
        key: RotationKey,
        limiter: Option<&Semaphore>,
    ) -> GroupAnswers {
        let max_chars = self.retrieval.max_context_length;
        let selected = selector.select(chunks, &sub.questions, max_chars).await;
        let context = PromptBuilder::build_context(&selected, max_chars);

        tracing::debug!(
            "Group at offset {} ({} questions): {} chunks, {} context chars, key {}",
            sub.offset,
            sub.len(),
            selected.len(),
            context.chars().count(),
            key.0
        );

        let _permit = match limiter {
            Some(semaphore) => semaphore.acquire().await.ok(),
            None => None,
        };

        let expected = sub.len();
        let answers = match self.gateway.complete(&context, &sub.questions, key).await {
            Ok(response) => {
                let received = match &response {
                    GatewayResponse::ParsedAnswers(answers) => format!("{} answers", answers.len()),
                    GatewayResponse::Malformed(raw) => format!("malformed output ({} chars)", raw.len()),
                };
                response.into_answers(expected).unwrap_or_else(|| {
                    tracing::warn!(
                        "Group at offset {}: expected {} answers, got {}",
                        sub.offset,
                        expected,
                        received
                    );
                    vec![UNEXPECTED_FORMAT_ANSWER.to_string(); expected]
                })
            }
            Err(e) => {
                tracing::warn!("Group at offset {}: {} failed: {}", sub.offset, self.gateway.name(), e);
                vec![LLM_ERROR_ANSWER.to_string(); expected]
            }
        };

        (sub.offset, answers)
    }
}
