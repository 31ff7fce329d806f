use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::synthesizer::fallback_synthesis;
use super::{
    ConfidenceTier, CrossReferencer, Gap, GapAnalyzer, GapImportance, PageAnalyzer,
    ParallelSearcher, PhaseStats, QuestionPlanner, ResearchResult, ResearchStats,
    ResponseSynthesizer, SearchResult, SourceEvaluation, SourceEvaluator, SourceReference,
    SubQuestion, VerifiedFact,
};
use crate::browser::BrowserAutomation;
use crate::config::{Config, DeepResearchConfig};
use crate::error::{AppError, AppResult, BrowserError};
use crate::llm::CompletionClient;

/// Cap on pages fetched from a single domain within one run. Agreement
/// counting needs domain diversity, not ten pages of the same site.
const MAX_PAGES_PER_DOMAIN: usize = 2;

/// Orchestrates the full research pipeline under one deadline.
///
/// Every phase degrades rather than fails: a run that hits its deadline
/// mid-pipeline still returns a result built from whatever evidence was
/// gathered, with the missing coverage reported as gaps.
pub struct ResearchEngine {
    planner: QuestionPlanner,
    searcher: ParallelSearcher,
    analyzer: PageAnalyzer,
    evaluator: SourceEvaluator,
    crossref: CrossReferencer,
    gap_analyzer: GapAnalyzer,
    synthesizer: ResponseSynthesizer,
    config: DeepResearchConfig,
}

impl ResearchEngine {
    /// Wire the pipeline phases from the two collaborators and the config
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        browser: Arc<dyn BrowserAutomation>,
        config: &Config,
    ) -> Self {
        let model = config.llm.model.clone();
        Self {
            planner: QuestionPlanner::new(Arc::clone(&llm), model.clone()),
            searcher: ParallelSearcher::new(Arc::clone(&browser)),
            analyzer: PageAnalyzer::new(browser),
            evaluator: SourceEvaluator::new(Arc::clone(&llm), model.clone()),
            crossref: CrossReferencer::new(&config.research),
            gap_analyzer: GapAnalyzer::new(),
            synthesizer: ResponseSynthesizer::new(llm, model),
            config: config.research.clone(),
        }
    }

    /// Run one research request end to end.
    ///
    /// `agent_id` identifies the caller in logs only; it never affects
    /// behavior.
    pub async fn research(
        &self,
        prompt: &str,
        agent_id: Option<&str>,
    ) -> AppResult<ResearchResult> {
        let started = Instant::now();
        let deadline = started + Duration::from_millis(self.config.timeout_ms);
        let mut stats = ResearchStats::default();

        info!(
            agent = agent_id.unwrap_or("anonymous"),
            prompt_chars = prompt.len(),
            timeout_ms = self.config.timeout_ms,
            "Research run started"
        );

        // Phase 1: decompose the prompt.
        let phase = Instant::now();
        let sub_questions = self
            .planner
            .plan(prompt, self.config.max_sub_questions)
            .await;
        stats
            .phases
            .push(phase_stat("planning", phase, sub_questions.len()));

        // Phase 2: initial search round. Every search failing with the
        // bridge unreachable is the one run-fatal condition.
        let phase = Instant::now();
        let round = self.searcher.search_all(&sub_questions, Some(deadline)).await;
        if round.attempted > 0 && round.unavailable == round.attempted {
            return Err(AppError::Browser(BrowserError::Unavailable {
                message: "browser bridge unreachable for every search".to_string(),
            }));
        }
        let search_map = round.results;
        stats.searches_run += round.attempted;
        stats.phases.push(phase_stat("searching", phase, search_map.len()));

        // One search spent per sub-question that actually ran.
        let mut searches_spent: HashMap<String, usize> = sub_questions
            .iter()
            .map(|sq| (sq.id.clone(), usize::from(search_map.contains_key(&sq.id))))
            .collect();

        let mut seen_urls = HashSet::new();
        let mut domain_counts = HashMap::new();

        // Phases 3+4: fetch pages, score sources, extract facts.
        let phase = Instant::now();
        let selected = select_pages(
            &sub_questions,
            &search_map,
            self.config.max_pages_to_fetch,
            &mut seen_urls,
            &mut domain_counts,
        );
        let mut evaluations = self
            .analyze_and_evaluate(&selected, &sub_questions, deadline, &mut stats)
            .await;
        stats
            .phases
            .push(phase_stat("analysis", phase, evaluations.len()));

        // Phases 5+6: cross-reference and find gaps.
        let phase = Instant::now();
        let mut verified = self.crossref.verify(&evaluations);
        let mut gaps = self.gap_analyzer.find_gaps(&sub_questions, &verified);
        stats
            .phases
            .push(phase_stat("verification", phase, verified.len()));

        // Bounded follow-up rounds chase critical and important gaps.
        for round in 0..self.config.max_follow_up_searches {
            if Instant::now() >= deadline {
                warn!(round, "Deadline reached, skipping follow-up rounds");
                break;
            }
            let follow_ups = self.follow_up_questions(&sub_questions, &gaps, &mut searches_spent);
            if follow_ups.is_empty() {
                break;
            }

            let phase = Instant::now();
            let follow_round = self.searcher.search_all(&follow_ups, Some(deadline)).await;
            stats.searches_run += follow_round.attempted;
            let selected = select_pages(
                &follow_ups,
                &follow_round.results,
                self.config.max_pages_to_fetch,
                &mut seen_urls,
                &mut domain_counts,
            );
            let extra = self
                .analyze_and_evaluate(&selected, &follow_ups, deadline, &mut stats)
                .await;
            let found = extra.len();
            evaluations.extend(extra);

            verified = self.crossref.verify(&evaluations);
            gaps = self.gap_analyzer.find_gaps(&sub_questions, &verified);
            stats
                .phases
                .push(phase_stat("follow-up", phase, found));
        }

        // Phase 7: synthesis. Past the deadline the deterministic template
        // stands in for the model.
        let phase = Instant::now();
        let sources = collect_sources(&verified);
        let synthesis = if Instant::now() >= deadline {
            warn!("Deadline reached, synthesizing without the model");
            fallback_synthesis(prompt, &verified, &gaps, &sources)
        } else {
            self.synthesizer
                .synthesize(prompt, &verified, &gaps, &sources)
                .await
        };
        stats.phases.push(phase_stat("synthesis", phase, 1));

        let confidence = overall_confidence(&verified, &gaps);
        stats.facts_verified = verified.len();
        stats.total_duration_ms = started.elapsed().as_millis() as u64;

        info!(
            agent = agent_id.unwrap_or("anonymous"),
            confidence = confidence.as_str(),
            facts = verified.len(),
            gaps = gaps.len(),
            duration_ms = stats.total_duration_ms,
            "Research run finished"
        );

        Ok(ResearchResult {
            response: synthesis.response,
            sources,
            facts: verified,
            gaps,
            confidence,
            follow_up_questions: synthesis.follow_up_questions,
            stats,
        })
    }

    /// Fetch each selected page and evaluate it against its sub-question,
    /// sequentially, checking the deadline between pages.
    async fn analyze_and_evaluate(
        &self,
        selected: &[(SearchResult, usize)],
        sub_questions: &[SubQuestion],
        deadline: Instant,
        stats: &mut ResearchStats,
    ) -> Vec<SourceEvaluation> {
        let mut evaluations = Vec::new();

        for (result, sq_index) in selected {
            if Instant::now() >= deadline {
                warn!("Deadline reached, skipping remaining page analysis");
                break;
            }
            let Some(sub_question) = sub_questions.get(*sq_index) else {
                continue;
            };
            let Some(content) = self.analyzer.analyze(result).await else {
                continue;
            };
            stats.pages_analyzed += 1;

            let evaluation = self.evaluator.evaluate(content, sub_question).await;
            stats.facts_extracted += evaluation.facts.len();
            evaluations.push(evaluation);
        }

        evaluations
    }

    /// Build follow-up sub-questions from the open gaps, charging each
    /// against the originating sub-question's search allowance.
    fn follow_up_questions(
        &self,
        sub_questions: &[SubQuestion],
        gaps: &[Gap],
        searches_spent: &mut HashMap<String, usize>,
    ) -> Vec<SubQuestion> {
        let mut follow_ups = Vec::new();

        for gap in gaps {
            if gap.importance == GapImportance::NiceToHave {
                continue;
            }
            let Some(original) = sub_questions.iter().find(|sq| sq.id == gap.sub_question_id)
            else {
                continue;
            };
            let spent = searches_spent.entry(original.id.clone()).or_insert(0);
            if *spent >= self.config.max_searches_per_question {
                continue;
            }
            *spent += 1;
            follow_ups.push(SubQuestion::new(
                &original.question,
                original.category,
                original.priority,
                &gap.suggested_query,
            ));
        }

        follow_ups
    }
}

/// Pick the pages to fetch, interleaving across sub-questions by rank so
/// each question gets coverage before any one query's tail is consumed.
/// Already-seen URLs and over-represented domains are skipped.
fn select_pages(
    sub_questions: &[SubQuestion],
    search_map: &HashMap<String, Vec<SearchResult>>,
    max_pages: usize,
    seen_urls: &mut HashSet<String>,
    domain_counts: &mut HashMap<String, usize>,
) -> Vec<(SearchResult, usize)> {
    let per_question: Vec<&[SearchResult]> = sub_questions
        .iter()
        .map(|sq| search_map.get(&sq.id).map(Vec::as_slice).unwrap_or(&[]))
        .collect();
    let deepest = per_question.iter().map(|r| r.len()).max().unwrap_or(0);

    let mut selected = Vec::new();
    'outer: for rank in 0..deepest {
        for (sq_index, results) in per_question.iter().enumerate() {
            let Some(result) = results.get(rank) else {
                continue;
            };
            if !seen_urls.insert(result.url.clone()) {
                continue;
            }
            let domain = super::domain_of(&result.url);
            let count = domain_counts.entry(domain).or_insert(0);
            if *count >= MAX_PAGES_PER_DOMAIN {
                continue;
            }
            *count += 1;

            selected.push((result.clone(), sq_index));
            if selected.len() >= max_pages {
                break 'outer;
            }
        }
    }

    selected
}

/// Unique sources cited by the verified facts, ordered by descending
/// authority
fn collect_sources(facts: &[VerifiedFact]) -> Vec<SourceReference> {
    let mut seen = HashSet::new();
    let mut sources: Vec<SourceReference> = facts
        .iter()
        .flat_map(|fact| fact.sources.iter())
        .filter(|source| seen.insert(source.url.clone()))
        .cloned()
        .collect();
    sources.sort_by(|a, b| b.authority_score.cmp(&a.authority_score));
    sources
}

/// Run-level confidence: the best fact tier, stepped down once when a
/// critical gap remains open. No verified facts at all means low.
fn overall_confidence(facts: &[VerifiedFact], gaps: &[Gap]) -> ConfidenceTier {
    let Some(best) = facts.iter().map(|fact| fact.confidence).max() else {
        return ConfidenceTier::Low;
    };
    if gaps.iter().any(|g| g.importance == GapImportance::Critical) {
        best.downgraded()
    } else {
        best
    }
}

fn phase_stat(name: &str, started: Instant, items_processed: usize) -> PhaseStats {
    PhaseStats {
        name: name.to_string(),
        duration_ms: started.elapsed().as_millis() as u64,
        items_processed,
    }
}
