//! Stability metrics over repeated judgments.
//!
//! Everything here is a pure function of the record set: same records in,
//! same report out, regardless of record order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::collector::Exclusion;
use crate::error::DebateError;
use crate::judgment::{Category, JudgeConfig, JudgmentRecord};
use crate::participant::Side;

/// Weights of the composite instability score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InstabilityWeights {
    pub flip_rate: f64,
    pub score_variance: f64,
    pub confidence_variance: f64,
    pub side_bias: f64,
}

impl Default for InstabilityWeights {
    fn default() -> Self {
        Self {
            flip_rate: 3.0,
            score_variance: 1.0,
            confidence_variance: 0.5,
            side_bias: 2.0,
        }
    }
}

impl InstabilityWeights {
    pub fn validate(&self) -> Result<(), DebateError> {
        let weights = [
            ("flip_rate", self.flip_rate),
            ("score_variance", self.score_variance),
            ("confidence_variance", self.confidence_variance),
            ("side_bias", self.side_bias),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(DebateError::Configuration(format!(
                    "analysis weight '{}' must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn score(
        &self,
        flip_rate: f64,
        category_variance: f64,
        confidence_variance: f64,
        side_bias: f64,
    ) -> f64 {
        self.flip_rate * flip_rate
            + self.score_variance * category_variance
            + self.confidence_variance * confidence_variance
            + self.side_bias * side_bias
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample variance (n - 1). Zero for fewer than two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Metrics for one judge configuration.
///
/// `None` means there was no data to compute the metric from, which is
/// distinct from a measured zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StabilityMetrics {
    pub judge_config: JudgeConfig,
    /// Debates with at least one accepted judgment.
    pub debates_judged: usize,
    pub total_judgments: usize,
    pub excluded_runs: usize,
    pub flip_rate: Option<f64>,
    pub score_variance: BTreeMap<Category, f64>,
    /// Mean of `score_variance` across categories.
    pub category_variance: Option<f64>,
    pub confidence_variance: Option<f64>,
    pub pro_win_rate: Option<f64>,
    pub side_bias: Option<f64>,
    pub instability_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedConfig {
    pub rank: usize,
    pub recommended: bool,
    pub metrics: StabilityMetrics,
}

/// Agreement between two prompt variants under one judge model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptPairSensitivity {
    pub prompt_a: String,
    pub prompt_b: String,
    pub common_debates: usize,
    /// Fraction of common debates whose majority winner differs.
    pub disagreement_rate: Option<f64>,
    /// Pairwise score shift between the two prompts: for each common debate,
    /// category and side, the absolute difference of the two prompts' mean
    /// scores, averaged over all of them. This is not the max-min spread
    /// across every prompt of the family.
    pub avg_score_delta: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptSensitivity {
    pub judge_model: String,
    pub temperature: f32,
    pub pairs: Vec<PromptPairSensitivity>,
    pub mean_disagreement_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StabilityReport {
    pub rankings: Vec<RankedConfig>,
    pub prompt_sensitivity: Vec<PromptSensitivity>,
}

impl StabilityReport {
    pub fn recommended(&self) -> Option<&RankedConfig> {
        self.rankings.iter().find(|r| r.recommended)
    }
}

/// Every distinct judge config seen in records or exclusions, by key.
pub fn configs_in(records: &[JudgmentRecord], exclusions: &[Exclusion]) -> Vec<JudgeConfig> {
    let mut seen = BTreeMap::new();
    for config in records
        .iter()
        .map(|r| &r.judge_config)
        .chain(exclusions.iter().map(|e| &e.judge_config))
    {
        seen.entry(config.key()).or_insert_with(|| config.clone());
    }
    seen.into_values().collect()
}

type RunsByDebate<'a> = BTreeMap<Uuid, Vec<&'a JudgmentRecord>>;

#[derive(Debug, Clone, Default)]
pub struct StabilityAnalyzer {
    weights: InstabilityWeights,
}

impl StabilityAnalyzer {
    pub fn new(weights: InstabilityWeights) -> Self {
        Self { weights }
    }

    /// Rank `configs` and measure prompt sensitivity. Configs without any
    /// accepted judgment are listed last with undefined metrics.
    pub fn analyze(
        &self,
        configs: &[JudgeConfig],
        records: &[JudgmentRecord],
        exclusions: &[Exclusion],
    ) -> StabilityReport {
        let grouped = group_records(records);

        let mut metrics: Vec<StabilityMetrics> = configs
            .iter()
            .map(|config| {
                let key = config.key();
                let empty = RunsByDebate::new();
                let runs = grouped.get(&key).unwrap_or(&empty);
                let excluded = exclusions
                    .iter()
                    .filter(|e| e.judge_config.key() == key)
                    .count();
                self.config_metrics(config, runs, excluded)
            })
            .collect();

        metrics.sort_by(compare_metrics);

        let rankings = metrics
            .into_iter()
            .enumerate()
            .map(|(i, metrics)| RankedConfig {
                rank: i + 1,
                recommended: i == 0 && metrics.instability_score.is_some(),
                metrics,
            })
            .collect();

        StabilityReport {
            rankings,
            prompt_sensitivity: prompt_sensitivity(configs, &grouped),
        }
    }

    fn config_metrics(
        &self,
        config: &JudgeConfig,
        runs: &RunsByDebate<'_>,
        excluded_runs: usize,
    ) -> StabilityMetrics {
        let debates_judged = runs.len();
        let total_judgments: usize = runs.values().map(Vec::len).sum();

        let flip_rate = (debates_judged > 0).then(|| {
            let flips = runs.values().filter(|judgments| !is_unanimous(judgments)).count();
            flips as f64 / debates_judged as f64
        });

        let mut score_variance = BTreeMap::new();
        if debates_judged > 0 {
            for category in Category::ALL {
                let per_debate_side: Vec<f64> = runs
                    .values()
                    .flat_map(|judgments| {
                        Side::BOTH.into_iter().map(move |side| {
                            let scores: Vec<f64> = judgments
                                .iter()
                                .map(|r| r.scores.score(category, side))
                                .collect();
                            sample_variance(&scores)
                        })
                    })
                    .collect();
                if let Some(v) = mean(&per_debate_side) {
                    score_variance.insert(category, v);
                }
            }
        }
        let category_variance = mean(&score_variance.values().copied().collect::<Vec<_>>());

        let confidence_variance = mean(
            &runs
                .values()
                .map(|judgments| {
                    let confidences: Vec<f64> = judgments.iter().map(|r| r.confidence).collect();
                    sample_variance(&confidences)
                })
                .collect::<Vec<_>>(),
        );

        let pro_win_rate = (total_judgments > 0).then(|| {
            let pro_wins = runs
                .values()
                .flatten()
                .filter(|r| r.winner == Side::Pro)
                .count();
            pro_wins as f64 / total_judgments as f64
        });
        let side_bias = pro_win_rate.map(|rate| (rate - 0.5).abs());

        let instability_score =
            match (flip_rate, category_variance, confidence_variance, side_bias) {
                (Some(f), Some(s), Some(c), Some(b)) => Some(self.weights.score(f, s, c, b)),
                _ => None,
            };

        debug!(
            judge = %config,
            debates_judged,
            total_judgments,
            excluded_runs,
            ?instability_score,
            "Computed stability metrics"
        );

        StabilityMetrics {
            judge_config: config.clone(),
            debates_judged,
            total_judgments,
            excluded_runs,
            flip_rate,
            score_variance,
            category_variance,
            confidence_variance,
            pro_win_rate,
            side_bias,
            instability_score,
        }
    }
}

fn group_records(records: &[JudgmentRecord]) -> BTreeMap<String, RunsByDebate<'_>> {
    let mut grouped: BTreeMap<String, RunsByDebate<'_>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.judge_config.key())
            .or_default()
            .entry(record.debate_id)
            .or_default()
            .push(record);
    }
    for runs in grouped.values_mut() {
        for judgments in runs.values_mut() {
            judgments.sort_by_key(|r| r.run_number);
        }
    }
    grouped
}

fn is_unanimous(judgments: &[&JudgmentRecord]) -> bool {
    judgments.windows(2).all(|w| w[0].winner == w[1].winner)
}

/// Winner of most runs, `None` on a tie.
fn majority_winner(judgments: &[&JudgmentRecord]) -> Option<Side> {
    let pro = judgments.iter().filter(|r| r.winner == Side::Pro).count();
    let con = judgments.len() - pro;
    match pro.cmp(&con) {
        Ordering::Greater => Some(Side::Pro),
        Ordering::Less => Some(Side::Con),
        Ordering::Equal => None,
    }
}

/// Undefined sorts after any value.
fn cmp_defined(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_metrics(a: &StabilityMetrics, b: &StabilityMetrics) -> Ordering {
    cmp_defined(a.instability_score, b.instability_score)
        .then_with(|| cmp_defined(a.flip_rate, b.flip_rate))
        .then_with(|| cmp_defined(a.side_bias, b.side_bias))
        .then_with(|| a.judge_config.key().cmp(&b.judge_config.key()))
}

/// Compare every pair of prompt variants sharing a judge model and
/// temperature. Score deltas are pairwise means, see
/// [`PromptPairSensitivity::avg_score_delta`].
fn prompt_sensitivity(
    configs: &[JudgeConfig],
    grouped: &BTreeMap<String, RunsByDebate<'_>>,
) -> Vec<PromptSensitivity> {
    // (model, temperature key) -> prompt id -> config key
    let mut families: BTreeMap<(String, String), (f32, BTreeMap<String, String>)> =
        BTreeMap::new();
    for config in configs {
        families
            .entry((config.judge_model.clone(), config.temperature.to_string()))
            .or_insert_with(|| (config.temperature, BTreeMap::new()))
            .1
            .insert(config.judge_prompt.clone(), config.key());
    }

    let empty = RunsByDebate::new();
    families
        .into_iter()
        .filter(|(_, (_, prompts))| prompts.len() > 1)
        .map(|((judge_model, _), (temperature, prompts))| {
            let entries: Vec<(&String, &RunsByDebate<'_>)> = prompts
                .iter()
                .map(|(prompt, key)| (prompt, grouped.get(key).unwrap_or(&empty)))
                .collect();

            let mut pairs = Vec::new();
            for (i, (prompt_a, runs_a)) in entries.iter().enumerate() {
                for (prompt_b, runs_b) in &entries[i + 1..] {
                    pairs.push(compare_prompts(prompt_a, runs_a, prompt_b, runs_b));
                }
            }
            let rates: Vec<f64> = pairs.iter().filter_map(|p| p.disagreement_rate).collect();

            PromptSensitivity {
                judge_model,
                temperature,
                mean_disagreement_rate: mean(&rates),
                pairs,
            }
        })
        .collect()
}

fn compare_prompts(
    prompt_a: &str,
    runs_a: &RunsByDebate<'_>,
    prompt_b: &str,
    runs_b: &RunsByDebate<'_>,
) -> PromptPairSensitivity {
    let debates_a: BTreeSet<&Uuid> = runs_a.keys().collect();
    let common: Vec<&Uuid> = runs_b.keys().filter(|id| debates_a.contains(id)).collect();

    let mut disagreements = 0usize;
    let mut deltas = Vec::new();
    for id in &common {
        let (a, b) = (&runs_a[*id], &runs_b[*id]);
        if majority_winner(a) != majority_winner(b) {
            disagreements += 1;
        }
        for category in Category::ALL {
            for side in Side::BOTH {
                let mean_a = mean_score(a, category, side);
                let mean_b = mean_score(b, category, side);
                if let (Some(x), Some(y)) = (mean_a, mean_b) {
                    deltas.push((x - y).abs());
                }
            }
        }
    }

    PromptPairSensitivity {
        prompt_a: prompt_a.to_string(),
        prompt_b: prompt_b.to_string(),
        common_debates: common.len(),
        disagreement_rate: (!common.is_empty()).then(|| disagreements as f64 / common.len() as f64),
        avg_score_delta: mean(&deltas),
    }
}

fn mean_score(judgments: &[&JudgmentRecord], category: Category, side: Side) -> Option<f64> {
    let scores: Vec<f64> = judgments
        .iter()
        .map(|r| r.scores.score(category, side))
        .collect();
    mean(&scores)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::judgment::{Scores, SideScores};

    fn uniform(score: f64) -> Scores {
        let s = SideScores { pro: score, con: score };
        Scores {
            argument_quality: s,
            evidence: s,
            clash: s,
            weighing: s,
        }
    }

    fn record(
        debate_id: Uuid,
        config: &JudgeConfig,
        run: u32,
        winner: Side,
        score: f64,
        confidence: f64,
    ) -> JudgmentRecord {
        JudgmentRecord {
            debate_id,
            judge_config: config.clone(),
            run_number: run,
            winner,
            scores: uniform(score),
            confidence,
            short_reason: String::new(),
            timestamp: Utc::now(),
        }
    }

    fn runs(debate_id: Uuid, config: &JudgeConfig, winners: &[Side]) -> Vec<JudgmentRecord> {
        winners
            .iter()
            .enumerate()
            .map(|(i, w)| record(debate_id, config, i as u32 + 1, *w, 7.0, 0.8))
            .collect()
    }

    fn analyze(configs: &[JudgeConfig], records: &[JudgmentRecord]) -> StabilityReport {
        StabilityAnalyzer::default().analyze(configs, records, &[])
    }

    fn config(prompt: &str) -> JudgeConfig {
        JudgeConfig::new("judge", prompt, 0.0)
    }

    #[test]
    fn test_unanimous_runs_have_zero_flip_rate() {
        let c = config("p0");
        let records = runs(Uuid::new_v4(), &c, &[Side::Pro, Side::Pro, Side::Pro]);
        let report = analyze(std::slice::from_ref(&c), &records);
        assert_eq!(report.rankings[0].metrics.flip_rate, Some(0.0));
    }

    #[test]
    fn test_split_runs_count_as_flip() {
        let c = config("p0");
        let records = runs(Uuid::new_v4(), &c, &[Side::Pro, Side::Con, Side::Pro]);
        let report = analyze(std::slice::from_ref(&c), &records);
        assert_eq!(report.rankings[0].metrics.flip_rate, Some(1.0));
    }

    #[test]
    fn test_flip_rate_is_fraction_of_debates() {
        let c = config("p0");
        let mut records = runs(Uuid::new_v4(), &c, &[Side::Pro, Side::Pro]);
        records.extend(runs(Uuid::new_v4(), &c, &[Side::Con, Side::Pro]));
        records.extend(runs(Uuid::new_v4(), &c, &[Side::Con, Side::Con]));
        records.extend(runs(Uuid::new_v4(), &c, &[Side::Con, Side::Con]));
        let report = analyze(std::slice::from_ref(&c), &records);
        assert_eq!(report.rankings[0].metrics.flip_rate, Some(0.25));
    }

    #[test]
    fn test_debate_without_valid_judgments_is_not_counted() {
        let c = config("p0");
        let unjudged = Uuid::new_v4();
        let records = runs(Uuid::new_v4(), &c, &[Side::Pro, Side::Pro]);
        let exclusions: Vec<Exclusion> = (1..=3)
            .map(|run| Exclusion {
                debate_id: unjudged,
                judge_config: c.clone(),
                run_number: run,
                attempts: 3,
                reason: "No JSON object found in judge output".into(),
                timestamp: Utc::now(),
            })
            .collect();

        let report =
            StabilityAnalyzer::default().analyze(std::slice::from_ref(&c), &records, &exclusions);
        let metrics = &report.rankings[0].metrics;
        assert_eq!(metrics.debates_judged, 1);
        assert_eq!(metrics.flip_rate, Some(0.0));
        assert_eq!(metrics.excluded_runs, 3);
    }

    #[test]
    fn test_config_with_no_data_is_undefined_and_ranked_last() {
        let judged = config("p0");
        let silent = config("p1");
        let records = runs(Uuid::new_v4(), &judged, &[Side::Con, Side::Pro]);
        let report = analyze(&[silent.clone(), judged.clone()], &records);

        assert_eq!(report.rankings[0].metrics.judge_config, judged);
        assert!(report.rankings[0].recommended);
        let last = &report.rankings[1].metrics;
        assert_eq!(last.judge_config, silent);
        assert_eq!(last.flip_rate, None);
        assert_eq!(last.side_bias, None);
        assert_eq!(last.instability_score, None);
        assert!(!report.rankings[1].recommended);
    }

    #[test]
    fn test_single_run_variance_is_zero() {
        let c = config("p0");
        let records = vec![record(Uuid::new_v4(), &c, 1, Side::Pro, 6.0, 0.9)];
        let metrics = &analyze(std::slice::from_ref(&c), &records).rankings[0].metrics;
        assert_eq!(metrics.category_variance, Some(0.0));
        assert_eq!(metrics.confidence_variance, Some(0.0));
        assert!(metrics.score_variance.values().all(|v| *v == 0.0));
        assert!(metrics.instability_score.unwrap().is_finite());
    }

    #[test]
    fn test_sample_variance() {
        assert_eq!(sample_variance(&[]), 0.0);
        assert_eq!(sample_variance(&[4.0]), 0.0);
        assert_eq!(sample_variance(&[2.0, 4.0]), 2.0);
        assert_eq!(sample_variance(&[1.0, 2.0, 3.0, 4.0]), 5.0 / 3.0);
    }

    #[test]
    fn test_score_and_confidence_variance() {
        let c = config("p0");
        let id = Uuid::new_v4();
        let records = vec![
            record(id, &c, 1, Side::Pro, 6.0, 0.6),
            record(id, &c, 2, Side::Pro, 8.0, 0.8),
        ];
        let metrics = &analyze(std::slice::from_ref(&c), &records).rankings[0].metrics;
        assert_eq!(metrics.score_variance[&Category::Clash], 2.0);
        assert_eq!(metrics.category_variance, Some(2.0));
        assert!((metrics.confidence_variance.unwrap() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_side_bias_zero_iff_half_pro() {
        let c = config("p0");
        let mut records = runs(Uuid::new_v4(), &c, &[Side::Pro, Side::Pro]);
        records.extend(runs(Uuid::new_v4(), &c, &[Side::Con, Side::Con]));
        let metrics = &analyze(std::slice::from_ref(&c), &records).rankings[0].metrics;
        assert_eq!(metrics.pro_win_rate, Some(0.5));
        assert_eq!(metrics.side_bias, Some(0.0));

        records.push(record(Uuid::new_v4(), &c, 1, Side::Pro, 7.0, 0.8));
        let metrics = &analyze(std::slice::from_ref(&c), &records).rankings[0].metrics;
        assert!(metrics.side_bias.unwrap() > 0.0);
    }

    #[test]
    fn test_lower_side_bias_ranks_first() {
        let balanced = config("p0");
        let skewed = config("p1");
        let mut records = Vec::new();
        for i in 0..50 {
            let id = Uuid::new_v4();
            let balanced_winner = if i < 26 { Side::Pro } else { Side::Con };
            let skewed_winner = if i < 35 { Side::Pro } else { Side::Con };
            records.push(record(id, &balanced, 1, balanced_winner, 7.0, 0.8));
            records.push(record(id, &skewed, 1, skewed_winner, 7.0, 0.8));
        }

        let report = analyze(&[skewed.clone(), balanced.clone()], &records);
        let first = &report.rankings[0].metrics;
        let second = &report.rankings[1].metrics;
        assert_eq!(first.judge_config, balanced);
        assert!((first.side_bias.unwrap() - 0.02).abs() < 1e-9);
        assert!((second.side_bias.unwrap() - 0.20).abs() < 1e-9);
        assert!(first.instability_score < second.instability_score);
        assert_eq!(report.recommended().unwrap().metrics.judge_config, balanced);
    }

    #[test]
    fn test_score_is_monotone_in_each_component() {
        let w = InstabilityWeights::default();
        let base = w.score(0.2, 0.5, 0.1, 0.1);
        assert!(w.score(0.3, 0.5, 0.1, 0.1) >= base);
        assert!(w.score(0.2, 0.6, 0.1, 0.1) >= base);
        assert!(w.score(0.2, 0.5, 0.2, 0.1) >= base);
        assert!(w.score(0.2, 0.5, 0.1, 0.2) >= base);
        assert_eq!(w.score(1.0, 0.0, 0.0, 0.0), 3.0);
        assert_eq!(w.score(0.0, 0.0, 1.0, 0.5), 1.5);
    }

    #[test]
    fn test_ties_break_on_flip_rate_then_side_bias_then_key() {
        let a = StabilityMetrics {
            judge_config: config("p1"),
            debates_judged: 1,
            total_judgments: 1,
            excluded_runs: 0,
            flip_rate: Some(0.0),
            score_variance: BTreeMap::new(),
            category_variance: Some(0.0),
            confidence_variance: Some(0.0),
            pro_win_rate: Some(0.5),
            side_bias: Some(0.0),
            instability_score: Some(1.0),
        };
        let mut b = a.clone();
        b.judge_config = config("p0");
        b.flip_rate = Some(0.1);
        assert_eq!(compare_metrics(&a, &b), Ordering::Less);

        b.flip_rate = Some(0.0);
        b.side_bias = Some(0.1);
        assert_eq!(compare_metrics(&a, &b), Ordering::Less);

        b.side_bias = Some(0.0);
        assert_eq!(compare_metrics(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_analysis_is_order_independent() {
        let c0 = config("p0");
        let c1 = config("p1");
        let id = Uuid::new_v4();
        let mut records = runs(id, &c0, &[Side::Pro, Side::Con, Side::Pro]);
        records.extend(runs(id, &c1, &[Side::Con, Side::Con]));
        records.push(record(Uuid::new_v4(), &c1, 1, Side::Pro, 3.0, 0.2));

        let configs = configs_in(&records, &[]);
        let forward = analyze(&configs, &records);
        records.reverse();
        let backward = analyze(&configs, &records);
        assert_eq!(forward, backward);
        assert_eq!(forward, analyze(&configs, &records));
    }

    #[test]
    fn test_prompt_sensitivity_per_model() {
        let p0 = config("p0");
        let p1 = config("p1");
        let other = JudgeConfig::new("other-judge", "p0", 0.0);
        let agree = Uuid::new_v4();
        let disagree = Uuid::new_v4();
        let only_p0 = Uuid::new_v4();

        let mut records = runs(agree, &p0, &[Side::Pro, Side::Pro]);
        records.extend(runs(agree, &p1, &[Side::Pro, Side::Con, Side::Pro]));
        records.extend(runs(disagree, &p0, &[Side::Pro]));
        records.push(record(disagree, &p1, 1, Side::Con, 5.0, 0.5));
        records.extend(runs(only_p0, &p0, &[Side::Con]));
        records.extend(runs(agree, &other, &[Side::Con]));

        let report = analyze(&[p0, p1, other], &records);
        assert_eq!(report.prompt_sensitivity.len(), 1);
        let family = &report.prompt_sensitivity[0];
        assert_eq!(family.judge_model, "judge");
        let pair = &family.pairs[0];
        assert_eq!((pair.prompt_a.as_str(), pair.prompt_b.as_str()), ("p0", "p1"));
        assert_eq!(pair.common_debates, 2);
        assert_eq!(pair.disagreement_rate, Some(0.5));
        // 0 on the agreeing debate, |7 - 5| on the other
        assert_eq!(pair.avg_score_delta, Some(1.0));
        assert_eq!(family.mean_disagreement_rate, Some(0.5));
    }

    #[test]
    fn test_tied_majorities_compare_equal() {
        let p0 = config("p0");
        let p1 = config("p1");
        let id = Uuid::new_v4();
        let mut records = runs(id, &p0, &[Side::Pro, Side::Con]);
        records.extend(runs(id, &p1, &[Side::Con, Side::Pro]));
        let report = analyze(&[p0, p1], &records);
        assert_eq!(report.prompt_sensitivity[0].pairs[0].disagreement_rate, Some(0.0));
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let weights = InstabilityWeights {
            confidence_variance: -0.5,
            ..Default::default()
        };
        assert!(matches!(weights.validate(), Err(DebateError::Configuration(_))));
        assert!(InstabilityWeights::default().validate().is_ok());
    }
}
