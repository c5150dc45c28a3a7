//! 採点結果を一致/不足スキルと説明文に変換する

use std::cmp::Ordering;

use serde::Serialize;

use crate::extraction::{SkillRecord, SkillSet};
use crate::keywords::KeywordAnalysis;
use crate::scoring::{DroppedSignal, Recommendation, ScoreBreakdown, SignalScore, UnavailableReason};
use crate::taxonomy::{DEFAULT_IMPORTANCE, SkillCategory, SkillTaxonomy};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingSkill {
    pub skill_name: String,
    pub category: SkillCategory,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    /// 求人（必須 ∪ 歓迎）と一致した履歴書側のスキル
    pub matched_skills: Vec<SkillRecord>,
    /// 履歴書にない必須スキル（重要度降順 → 名前順）
    pub missing_skills: Vec<MissingSkill>,
    pub missing_preferred: Vec<MissingSkill>,
    pub narrative: String,
}

/// 必須/歓迎ごとの一致・不足と、求人が求めていない履歴書スキル
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SkillGapAnalysis {
    pub required_matched: Vec<String>,
    pub required_missing: Vec<String>,
    pub preferred_matched: Vec<String>,
    pub preferred_missing: Vec<String>,
    pub extra_skills: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct MatchExplainer {
    max_missing_named: usize,
}

impl Default for MatchExplainer {
    fn default() -> Self {
        Self::new(3)
    }
}

impl MatchExplainer {
    pub fn new(max_missing_named: usize) -> Self {
        Self { max_missing_named }
    }

    pub fn explain(
        &self,
        breakdown: &ScoreBreakdown,
        resume: &SkillSet,
        required: &SkillSet,
        preferred: &SkillSet,
        taxonomy: &SkillTaxonomy,
    ) -> Explanation {
        let matched_skills: Vec<SkillRecord> = resume
            .iter()
            .filter(|r| required.contains(&r.skill_name) || preferred.contains(&r.skill_name))
            .cloned()
            .collect();

        let missing_skills = missing_from(required, resume, taxonomy);
        let missing_preferred = missing_from(preferred, resume, taxonomy);

        let matched_required = required.names().filter(|n| resume.contains(n)).count();
        let matched_preferred = preferred.names().filter(|n| resume.contains(n)).count();

        let mut sentences = vec![
            tier_sentence(breakdown.recommendation).to_string(),
            score_sentence(breakdown),
        ];
        if let Some(note) = degradation_sentence(breakdown) {
            sentences.push(note);
        }
        if let Some(coverage) = coverage_sentence(
            matched_required,
            required.len(),
            matched_preferred,
            preferred.len(),
        ) {
            sentences.push(coverage);
        }
        if !required.is_empty() {
            sentences.push(self.missing_sentence(&missing_skills, taxonomy));
        }

        Explanation {
            matched_skills,
            missing_skills,
            missing_preferred,
            narrative: sentences.join(" "),
        }
    }

    fn missing_sentence(&self, missing: &[MissingSkill], taxonomy: &SkillTaxonomy) -> String {
        let named: Vec<&str> = missing
            .iter()
            .filter(|m| taxonomy.entry(&m.skill_name).is_some())
            .map(|m| m.skill_name.as_str())
            .collect();

        if named.is_empty() {
            return "No required skills are missing.".to_string();
        }

        let shown = &named[..named.len().min(self.max_missing_named)];
        let remaining = named.len() - shown.len();
        if shown.is_empty() {
            return match remaining {
                1 => "Missing 1 required skill.".to_string(),
                n => format!("Missing {n} required skills."),
            };
        }
        let list = if remaining > 0 {
            format!("{} and {} more", shown.join(", "), remaining)
        } else {
            join_with_and(shown)
        };
        format!("Missing required skills: {list}.")
    }

    /// 求人票にあって履歴書にない語の一文（不足がなければ None）
    pub fn keyword_sentence(&self, analysis: &KeywordAnalysis) -> Option<String> {
        let missing = &analysis.missing_keywords;
        if missing.is_empty() {
            return None;
        }
        let shown: Vec<&str> = missing
            .iter()
            .take(self.max_missing_named)
            .map(String::as_str)
            .collect();
        let remaining = missing.len() - shown.len();
        let sentence = match (shown.is_empty(), remaining) {
            (true, 1) => "1 job term was not found in the resume.".to_string(),
            (true, n) => format!("{n} job terms were not found in the resume."),
            (false, 0) => format!("Job terms not found in the resume: {}.", join_with_and(&shown)),
            (false, n) => format!("Job terms not found in the resume: {} and {n} more.", shown.join(", ")),
        };
        Some(sentence)
    }
}

/// 必須/歓迎それぞれの一致・不足と、求人にない履歴書スキルを列挙する
pub fn gap_analysis(resume: &SkillSet, required: &SkillSet, preferred: &SkillSet) -> SkillGapAnalysis {
    let split = |wanted: &SkillSet| -> (Vec<String>, Vec<String>) {
        wanted
            .names()
            .map(str::to_string)
            .partition(|name| resume.contains(name))
    };
    let (required_matched, required_missing) = split(required);
    let (preferred_matched, preferred_missing) = split(preferred);
    let extra_skills = resume
        .names()
        .filter(|n| !required.contains(n) && !preferred.contains(n))
        .map(str::to_string)
        .collect();

    SkillGapAnalysis {
        required_matched,
        required_missing,
        preferred_matched,
        preferred_missing,
        extra_skills,
    }
}

fn missing_from(wanted: &SkillSet, resume: &SkillSet, taxonomy: &SkillTaxonomy) -> Vec<MissingSkill> {
    let mut missing: Vec<MissingSkill> = wanted
        .iter()
        .filter(|r| !resume.contains(&r.skill_name))
        .map(|r| MissingSkill {
            skill_name: r.skill_name.clone(),
            category: r.category,
            importance: taxonomy
                .entry(&r.skill_name)
                .map(|e| e.importance)
                .unwrap_or(DEFAULT_IMPORTANCE),
        })
        .collect();
    missing.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.skill_name.cmp(&b.skill_name))
    });
    missing
}

fn tier_sentence(recommendation: Recommendation) -> &'static str {
    match recommendation {
        Recommendation::StrongMatch => "Strong match: the resume covers the core requirements of the role.",
        Recommendation::GoodMatch => "Good match: the resume meets most of the requirements of the role.",
        Recommendation::WeakMatch => "Weak match: the resume shows partial alignment with the role.",
        Recommendation::NoMatch => "No match: the resume shows little alignment with the role.",
    }
}

fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

fn signal_text(score: &SignalScore) -> String {
    match score {
        SignalScore::Available { value } => percent(*value),
        SignalScore::Unavailable { .. } => "unavailable".to_string(),
    }
}

fn score_sentence(breakdown: &ScoreBreakdown) -> String {
    format!(
        "Overall score {} (skill coverage {}, semantic similarity {}).",
        percent(breakdown.overall_score),
        signal_text(&breakdown.skill_score),
        signal_text(&breakdown.semantic_score),
    )
}

fn reason_text(reason: UnavailableReason) -> &'static str {
    match reason {
        UnavailableReason::NoJobSkills => "the job lists no recognizable skills",
        UnavailableReason::LowConfidenceEmbedding => "one of the documents is too short to compare",
        UnavailableReason::EmbeddingUnavailable => "the embedding provider was unavailable",
        UnavailableReason::EmbeddingTimeout => "the embedding step timed out",
        UnavailableReason::ProviderMismatch => "the documents were embedded by different providers",
    }
}

fn degradation_sentence(breakdown: &ScoreBreakdown) -> Option<String> {
    let reason_of = |score: &SignalScore| {
        score
            .unavailable_reason()
            .map(reason_text)
            .unwrap_or("the signal was unavailable")
    };
    match breakdown.dropped_signal {
        DroppedSignal::None => None,
        DroppedSignal::Semantic => Some(format!(
            "Semantic similarity was not used because {}, so the score reflects skill coverage only.",
            reason_of(&breakdown.semantic_score)
        )),
        DroppedSignal::Skill => Some(format!(
            "Skill coverage was not used because {}, so the score reflects semantic similarity only.",
            reason_of(&breakdown.skill_score)
        )),
        DroppedSignal::Both => Some(format!(
            "Neither signal could be computed: {} and {}.",
            reason_of(&breakdown.skill_score),
            reason_of(&breakdown.semantic_score)
        )),
    }
}

fn coverage_sentence(
    matched_required: usize,
    required: usize,
    matched_preferred: usize,
    preferred: usize,
) -> Option<String> {
    match (required, preferred) {
        (0, 0) => None,
        (r, 0) => Some(format!("Matched {matched_required} of {r} required skills.")),
        (0, p) => Some(format!("Matched {matched_preferred} of {p} preferred skills.")),
        (r, p) => Some(format!(
            "Matched {matched_required} of {r} required skills and {matched_preferred} of {p} preferred skills."
        )),
    }
}

fn join_with_and(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_string(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::MatchMethod;
    use crate::scoring::weights::{DEFAULT_WEIGHTS, SKILL_ONLY_WEIGHTS};

    fn taxonomy() -> SkillTaxonomy {
        SkillTaxonomy::builtin().unwrap()
    }

    fn skills(taxonomy: &SkillTaxonomy, names: &[&str]) -> SkillSet {
        let mut set = SkillSet::new(taxonomy.version());
        for name in names {
            let entry = taxonomy.entry(name).unwrap();
            set.insert(SkillRecord {
                skill_name: entry.name.clone(),
                category: entry.category,
                confidence: 1.0,
                matched_alias: name.to_lowercase(),
                match_method: MatchMethod::Exact,
            });
        }
        set
    }

    fn breakdown(overall: f64, recommendation: Recommendation) -> ScoreBreakdown {
        ScoreBreakdown {
            skill_score: SignalScore::Available { value: 0.6667 },
            semantic_score: SignalScore::Available { value: 0.78 },
            overall_score: overall,
            weights_used: DEFAULT_WEIGHTS,
            dropped_signal: DroppedSignal::None,
            recommendation,
        }
    }

    #[test]
    fn partitions_required_into_matched_and_missing() {
        let t = taxonomy();
        let resume = skills(&t, &["Python", "React", "Docker"]);
        let required = skills(&t, &["Python", "React", "SQL"]);
        let preferred = skills(&t, &["Docker", "Redis"]);

        let explanation = MatchExplainer::default().explain(
            &breakdown(0.72, Recommendation::GoodMatch),
            &resume,
            &required,
            &preferred,
            &t,
        );

        let matched: Vec<_> = explanation.matched_skills.iter().map(|r| r.skill_name.as_str()).collect();
        assert_eq!(matched, vec!["Docker", "Python", "React"]);
        let missing: Vec<_> = explanation.missing_skills.iter().map(|m| m.skill_name.as_str()).collect();
        assert_eq!(missing, vec!["SQL"]);
        assert_eq!(explanation.missing_preferred[0].skill_name, "Redis");
        assert!(explanation.narrative.starts_with("Good match"));
        assert!(explanation.narrative.contains("Overall score 72%"));
        assert!(explanation.narrative.contains("Matched 2 of 3 required skills and 1 of 2 preferred skills."));
        assert!(explanation.narrative.contains("Missing required skills: SQL."));
    }

    #[test]
    fn names_top_missing_skills_by_importance() {
        let t = taxonomy();
        let resume = skills(&t, &[]);
        // Python 0.9, Machine Learning 0.9, SQL 0.85, Docker 0.75, Jira 0.4
        let required = skills(&t, &["Jira", "Docker", "SQL", "Python", "Machine Learning"]);
        let preferred = skills(&t, &[]);

        let explanation = MatchExplainer::new(3).explain(
            &breakdown(0.1, Recommendation::NoMatch),
            &resume,
            &required,
            &preferred,
            &t,
        );

        let order: Vec<_> = explanation.missing_skills.iter().map(|m| m.skill_name.as_str()).collect();
        assert_eq!(order, vec!["Machine Learning", "Python", "SQL", "Docker", "Jira"]);
        assert!(
            explanation
                .narrative
                .contains("Missing required skills: Machine Learning, Python, SQL and 2 more."),
            "{}",
            explanation.narrative
        );
    }

    #[test]
    fn counts_missing_skills_when_none_are_named() {
        let t = taxonomy();
        let resume = skills(&t, &[]);
        let required = skills(&t, &["SQL", "Docker"]);
        let preferred = skills(&t, &[]);

        let explanation = MatchExplainer::new(0).explain(
            &breakdown(0.1, Recommendation::NoMatch),
            &resume,
            &required,
            &preferred,
            &t,
        );

        assert!(explanation.narrative.ends_with("Missing 2 required skills."), "{}", explanation.narrative);
        assert!(!explanation.narrative.contains(":  and"));
    }

    #[test]
    fn keyword_sentence_names_missing_terms() {
        let analysis = KeywordAnalysis {
            missing_keywords: vec!["design".into(), "warehouse".into(), "queries".into(), "latency".into()],
            ..KeywordAnalysis::default()
        };

        assert_eq!(
            MatchExplainer::new(3).keyword_sentence(&analysis).as_deref(),
            Some("Job terms not found in the resume: design, warehouse, queries and 1 more.")
        );
        assert_eq!(
            MatchExplainer::new(5).keyword_sentence(&analysis).as_deref(),
            Some("Job terms not found in the resume: design, warehouse, queries and latency.")
        );
        assert_eq!(
            MatchExplainer::new(0).keyword_sentence(&analysis).as_deref(),
            Some("4 job terms were not found in the resume.")
        );
        assert_eq!(MatchExplainer::default().keyword_sentence(&KeywordAnalysis::default()), None);
    }

    #[test]
    fn narrative_mentions_dropped_semantic_signal() {
        let t = taxonomy();
        let resume = skills(&t, &["Python"]);
        let required = skills(&t, &["Python"]);
        let preferred = skills(&t, &[]);
        let degraded = ScoreBreakdown {
            skill_score: SignalScore::Available { value: 1.0 },
            semantic_score: SignalScore::Unavailable {
                reason: UnavailableReason::EmbeddingTimeout,
            },
            overall_score: 1.0,
            weights_used: SKILL_ONLY_WEIGHTS,
            dropped_signal: DroppedSignal::Semantic,
            recommendation: Recommendation::StrongMatch,
        };

        let explanation = MatchExplainer::default().explain(&degraded, &resume, &required, &preferred, &t);

        assert!(explanation.narrative.contains("semantic similarity unavailable"));
        assert!(explanation.narrative.contains("the embedding step timed out"));
        assert!(explanation.narrative.contains("No required skills are missing."));
    }

    #[test]
    fn gap_analysis_reports_extra_skills() {
        let t = taxonomy();
        let resume = skills(&t, &["Python", "Figma", "Docker"]);
        let required = skills(&t, &["Python", "SQL"]);
        let preferred = skills(&t, &["Docker", "Redis"]);

        let gaps = gap_analysis(&resume, &required, &preferred);

        assert_eq!(gaps.required_matched, vec!["Python"]);
        assert_eq!(gaps.required_missing, vec!["SQL"]);
        assert_eq!(gaps.preferred_matched, vec!["Docker"]);
        assert_eq!(gaps.preferred_missing, vec!["Redis"]);
        assert_eq!(gaps.extra_skills, vec!["Figma"]);
    }

    #[test]
    fn join_with_and_formats_lists() {
        assert_eq!(join_with_and(&["A"]), "A");
        assert_eq!(join_with_and(&["A", "B"]), "A and B");
        assert_eq!(join_with_and(&["A", "B", "C"]), "A, B and C");
    }

    const POOL: &[&str] = &[
        "Python", "SQL", "React", "Docker", "Kubernetes", "AWS", "Java", "Agile", "Leadership", "Jira",
    ];

    proptest::proptest! {
        #[test]
        fn matched_and_missing_partition_required(
            resume_names in proptest::sample::subsequence(POOL, 0..=POOL.len()),
            required_names in proptest::sample::subsequence(POOL, 0..=POOL.len()),
        ) {
            let t = taxonomy();
            let resume = skills(&t, &resume_names);
            let required = skills(&t, &required_names);
            let preferred = SkillSet::new(t.version());

            let explanation = MatchExplainer::default()
                .explain(&breakdown(0.5, Recommendation::WeakMatch), &resume, &required, &preferred, &t);

            let matched: Vec<&str> = explanation.matched_skills.iter().map(|r| r.skill_name.as_str()).collect();
            let missing: Vec<&str> = explanation.missing_skills.iter().map(|m| m.skill_name.as_str()).collect();
            for name in required.names() {
                let in_matched = matched.contains(&name);
                let in_missing = missing.contains(&name);
                proptest::prop_assert!(in_matched != in_missing, "{name} must be in exactly one side");
            }
            proptest::prop_assert_eq!(matched.len() + missing.len(), required.len());
        }
    }
}
