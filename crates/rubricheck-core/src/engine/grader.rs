use crate::aggregate;
use crate::config::GraderConfig;
use crate::errors::GradeError;
use crate::judge::{JudgeOracle, JudgeService};
use crate::model::{
    Criterion, CriterionResult, EssayMetadataNote, GradeNotes, GradeSummary, ProcessedEssay,
    Provenance, Rubric,
};
use crate::report::progress::{ProgressEvent, ProgressSink};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;

/// Rubric index and outcome of one criterion task.
type Finished = (usize, Result<CriterionResult, GradeError>);

/// Grades one essay against one rubric: evaluate every criterion, then aggregate.
#[derive(Clone)]
pub struct Grader {
    judge: JudgeService,
    batched: bool,
    parallel: usize,
    max_essay_paragraphs: usize,
    model: Option<String>,
    progress: Option<ProgressSink>,
}

impl Grader {
    pub fn new(config: &GraderConfig, oracle: Arc<dyn JudgeOracle>) -> Self {
        Self {
            judge: JudgeService::new(config.runtime_config(), oracle),
            batched: config.batched,
            parallel: config.parallel.max(1),
            max_essay_paragraphs: config.max_essay_paragraphs.max(1),
            model: Some(config.judge.model.clone()),
            progress: None,
        }
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn judge(&self) -> &JudgeService {
        &self.judge
    }

    pub async fn grade(
        &self,
        rubric: &Rubric,
        essay: &ProcessedEssay,
    ) -> Result<GradeSummary, GradeError> {
        rubric.validate()?;
        if essay.paragraphs.is_empty() {
            return Err(GradeError::invalid_essay("essay has no paragraphs"));
        }

        let mut warnings = Vec::new();
        let mut essay = essay.clone();
        let original = essay.paragraphs.len();
        if essay.truncate_paragraphs(self.max_essay_paragraphs) {
            let msg = format!(
                "essay truncated from {original} to {} paragraphs",
                self.max_essay_paragraphs
            );
            tracing::warn!("{msg}");
            warnings.push(msg);
        }

        let span = tracing::info_span!(
            "grade",
            criteria = rubric.criteria.len(),
            mode = self.judge.config().mode.as_str(),
            batched = self.batched
        );
        let per_criterion = async {
            tracing::info!("grading started");
            if self.batched {
                let outcome = self.judge.evaluate_batched(rubric, &essay).await?;
                warnings.extend(outcome.warnings);
                self.report_progress(outcome.results.len(), rubric.criteria.len());
                Ok::<_, GradeError>(outcome.results)
            } else {
                self.evaluate_all(rubric, &essay).await
            }
        }
        .instrument(span)
        .await?;

        let agg = aggregate::aggregate(&per_criterion, rubric);
        tracing::info!(
            numeric_score = ?agg.numeric_score,
            letter = ?agg.letter,
            needs_review = agg.flags.any_needs_review,
            "grading finished"
        );

        let notes = GradeNotes {
            flags: agg.flags,
            warnings,
            essay_metadata: Some(EssayMetadataNote::from(&essay)),
            provenance: Some(Provenance {
                mode: self.judge.config().mode.as_str().to_string(),
                batched: self.batched,
                model: self.model.clone(),
                rubric_sha256: sha256_json(rubric)?,
                essay_sha256: sha256_json(&essay)?,
            }),
        };

        Ok(GradeSummary {
            per_criterion,
            numeric_score: agg.numeric_score,
            letter: agg.letter,
            categorical_points: agg.categorical_points,
            notes,
        })
    }

    /// Evaluate criteria concurrently, bounded by `parallel`. The first failure
    /// aborts the remaining tasks and is returned. Results keep rubric order.
    ///
    /// Finished tasks are collected while waiting for a permit, so a failure
    /// stops further criteria from being spawned.
    async fn evaluate_all(
        &self,
        rubric: &Rubric,
        essay: &ProcessedEssay,
    ) -> Result<Vec<CriterionResult>, GradeError> {
        let total = rubric.criteria.len();
        let sem = Arc::new(Semaphore::new(self.parallel));
        let essay = Arc::new(essay.clone());
        let mut join_set = JoinSet::new();
        let mut slots: Vec<Option<CriterionResult>> = vec![None; total];
        let mut done = 0;

        for (idx, criterion) in rubric.criteria.iter().enumerate() {
            let permit = loop {
                tokio::select! {
                    biased;
                    Some(joined) = join_set.join_next(), if !join_set.is_empty() => {
                        self.absorb(joined, &mut join_set, &mut slots, &mut done)?;
                    }
                    acquired = sem.clone().acquire_owned() => {
                        break acquired.map_err(|e| GradeError::Task {
                            message: e.to_string(),
                        })?;
                    }
                }
            };
            let judge = self.judge.clone();
            let essay = essay.clone();
            let criterion: Criterion = criterion.clone();
            join_set.spawn(async move {
                let _permit = permit;
                let res = judge.evaluate(&criterion, &essay).await;
                (idx, res)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            self.absorb(joined, &mut join_set, &mut slots, &mut done)?;
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// Store one finished criterion, or abort everything still running.
    fn absorb(
        &self,
        joined: Result<Finished, JoinError>,
        join_set: &mut JoinSet<Finished>,
        slots: &mut [Option<CriterionResult>],
        done: &mut usize,
    ) -> Result<(), GradeError> {
        let (idx, res) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                join_set.abort_all();
                return Err(GradeError::Task {
                    message: e.to_string(),
                });
            }
        };
        match res {
            Ok(result) => {
                slots[idx] = Some(result);
                *done += 1;
                self.report_progress(*done, slots.len());
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "criterion failed; aborting grading run");
                join_set.abort_all();
                Err(e)
            }
        }
    }

    fn report_progress(&self, done: usize, total: usize) {
        if let Some(sink) = &self.progress {
            sink(ProgressEvent { done, total });
        }
    }
}

/// Hex sha256 of the canonical JSON form of `value`.
pub fn sha256_json<T: serde::Serialize>(value: &T) -> Result<String, GradeError> {
    let bytes = serde_json::to_vec(value).map_err(|e| GradeError::Task {
        message: format!("failed to serialize for hashing: {e}"),
    })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
