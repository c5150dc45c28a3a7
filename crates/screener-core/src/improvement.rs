//! 採点結果から履歴書の改善提案を組み立てる
//!
//! 提案の材料は不足スキル・不足キーワード・履歴書本文の構成だけ。
//! 連絡先やファイル形式の検査は抽出前のテキストが必要なので扱わない。

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use strum::AsRefStr;

use crate::explain::MissingSkill;
use crate::extraction::SkillRecord;
use crate::keywords::KeywordAnalysis;
use crate::normalize::{normalize_text, stem, tokenize};
use crate::scoring::Recommendation;

const MAX_SKILLS_IN_SUGGESTION: usize = 5;
const MAX_NAMED_IN_TITLE: usize = 3;
const MAX_POSITIVE_POINTS: usize = 5;
/// 1スキルあたりの改善見込み（%）と上限
const SKILL_IMPACT_PERCENT: usize = 5;
const MAX_SKILL_IMPACT_PERCENT: usize = 25;

const MIN_RESUME_CHARS: usize = 500;
const MAX_RESUME_CHARS: usize = 30_000;
const WELL_SIZED_RESUME_CHARS: std::ops::RangeInclusive<usize> = 1_000..=10_000;
const MIN_SECTION_HEADERS: usize = 2;

const SECTION_HEADERS: &[&str] = &["experience", "education", "skills", "summary", "objective", "projects"];
const EDUCATION_TERMS: &[&str] = &[
    "degree", "bachelor", "master", "phd", "university", "college", "diploma", "mba", "b.s", "b.a",
    "m.s", "m.a",
];
const EXPERIENCE_TERMS: &[&str] = &["worked", "managed", "developed", "led", "created", "company", "responsibilities"];
const SENIORITY_TERMS: &[&str] = &["years", "experience", "senior", "lead", "manager"];

/// 数値で示した成果（"40%", "$2", "10 million", "300 users"）
static QUANTIFIED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+\s*%|\$\s*\d+|\b\d+\s*(?:million|thousand|users|customers|projects)\b").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SuggestionPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SuggestionCategory {
    MissingCriticalSkills,
    MissingKeywords,
    MissingPreferredSkills,
    Formatting,
    ContentGaps,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImprovementSuggestion {
    pub category: SuggestionCategory,
    pub priority: SuggestionPriority,
    pub title: String,
    pub description: String,
    pub action_items: Vec<String>,
    pub impact: String,
}

/// 優先度順の提案と、履歴書の強み（最大5件）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImprovementReport {
    pub suggestions: Vec<ImprovementSuggestion>,
    pub positive_points: Vec<String>,
}

impl ImprovementReport {
    pub fn high_priority(&self) -> usize {
        self.suggestions
            .iter()
            .filter(|s| s.priority == SuggestionPriority::High)
            .count()
    }
}

pub struct ImprovementInputs<'a> {
    pub resume_text: &'a str,
    pub matched_skills: &'a [SkillRecord],
    pub missing_required: &'a [MissingSkill],
    pub missing_preferred: &'a [MissingSkill],
    pub keywords: &'a KeywordAnalysis,
    pub recommendation: Recommendation,
}

/// 本文の語（語幹）集合。見出しや学歴語の有無の判定に使う。
struct ResumeText {
    chars: usize,
    tokens: HashSet<String>,
    stems: HashSet<String>,
    quantified: bool,
}

impl ResumeText {
    fn new(text: &str) -> Self {
        let tokens: HashSet<String> = tokenize(text).into_iter().collect();
        let stems = tokens.iter().map(|t| stem(t)).collect();
        Self {
            chars: text.chars().count(),
            tokens,
            stems,
            quantified: QUANTIFIED_RE.is_match(&normalize_text(text)),
        }
    }

    fn mentions_any(&self, terms: &[&str]) -> bool {
        terms
            .iter()
            .any(|t| self.tokens.contains(*t) || self.stems.contains(&stem(t)))
    }

    fn section_headers(&self) -> usize {
        SECTION_HEADERS.iter().filter(|h| self.tokens.contains(**h)).count()
    }
}

pub fn suggest_improvements(inputs: &ImprovementInputs<'_>) -> ImprovementReport {
    let resume = ResumeText::new(inputs.resume_text);

    let mut suggestions = Vec::new();
    if let Some(s) = missing_skills_suggestion(inputs.missing_required) {
        suggestions.push(s);
    }
    if let Some(s) = missing_keywords_suggestion(&inputs.keywords.missing_keywords) {
        suggestions.push(s);
    }
    if let Some(s) = preferred_skills_suggestion(inputs.missing_preferred) {
        suggestions.push(s);
    }
    suggestions.extend(formatting_suggestions(&resume));
    suggestions.extend(content_suggestions(&resume));

    // 同じ優先度の中では上の追加順を保つ
    suggestions.sort_by_key(|s| s.priority);

    ImprovementReport {
        suggestions,
        positive_points: positive_points(inputs, &resume),
    }
}

fn names(skills: &[MissingSkill], limit: usize) -> Vec<&str> {
    skills.iter().take(limit).map(|m| m.skill_name.as_str()).collect()
}

fn missing_skills_suggestion(missing: &[MissingSkill]) -> Option<ImprovementSuggestion> {
    if missing.is_empty() {
        return None;
    }
    let top = names(missing, MAX_SKILLS_IN_SUGGESTION);
    let impact = (top.len() * SKILL_IMPACT_PERCENT).min(MAX_SKILL_IMPACT_PERCENT);
    Some(ImprovementSuggestion {
        category: SuggestionCategory::MissingCriticalSkills,
        priority: SuggestionPriority::High,
        title: format!("Add critical skills: {}", top[..top.len().min(MAX_NAMED_IN_TITLE)].join(", ")),
        description: format!(
            "The job requires {} but the resume does not clearly mention them.",
            top.join(", ")
        ),
        action_items: vec![
            format!("Add '{}' to the skills section if you have this experience", top[0]),
            "Describe projects where these skills were applied".to_string(),
            "Consider a course or certification for skills you lack".to_string(),
        ],
        impact: format!("Adding these skills could raise the match score by about {impact}%"),
    })
}

fn missing_keywords_suggestion(missing: &[String]) -> Option<ImprovementSuggestion> {
    let first = missing.first()?;
    let shown: Vec<&str> = missing.iter().take(MAX_NAMED_IN_TITLE).map(String::as_str).collect();
    Some(ImprovementSuggestion {
        category: SuggestionCategory::MissingKeywords,
        priority: SuggestionPriority::Medium,
        title: format!("Use the job's wording: {}", shown.join(", ")),
        description: format!(
            "{} terms from the job description do not appear in the resume.",
            missing.len()
        ),
        action_items: vec![
            format!("Work '{first}' into the experience section where it is accurate"),
            "Mirror the language used in the job description".to_string(),
            "Add industry terminology where it applies".to_string(),
        ],
        impact: "Closer wording improves keyword-based screening".to_string(),
    })
}

fn preferred_skills_suggestion(missing: &[MissingSkill]) -> Option<ImprovementSuggestion> {
    if missing.is_empty() {
        return None;
    }
    let top = names(missing, MAX_SKILLS_IN_SUGGESTION);
    Some(ImprovementSuggestion {
        category: SuggestionCategory::MissingPreferredSkills,
        priority: SuggestionPriority::Low,
        title: format!("Highlight preferred skills: {}", top[..top.len().min(MAX_NAMED_IN_TITLE)].join(", ")),
        description: format!("The job would also value {}.", top.join(", ")),
        action_items: vec![
            "Mention any exposure to these skills, even from side projects".to_string(),
        ],
        impact: "Preferred skills differentiate otherwise similar candidates".to_string(),
    })
}

fn formatting_suggestions(resume: &ResumeText) -> Vec<ImprovementSuggestion> {
    let mut out = Vec::new();
    if resume.chars < MIN_RESUME_CHARS {
        out.push(ImprovementSuggestion {
            category: SuggestionCategory::Formatting,
            priority: SuggestionPriority::High,
            title: "Resume is too short".to_string(),
            description: format!("The resume has {} characters; most run well past {MIN_RESUME_CHARS}.", resume.chars),
            action_items: vec![
                "Describe responsibilities and results for each role".to_string(),
                "Add a skills section and relevant projects".to_string(),
            ],
            impact: "More detail gives both skill and semantic matching more to work with".to_string(),
        });
    } else if resume.chars > MAX_RESUME_CHARS {
        out.push(ImprovementSuggestion {
            category: SuggestionCategory::Formatting,
            priority: SuggestionPriority::Medium,
            title: "Resume may be too long".to_string(),
            description: format!("The resume has {} characters.", resume.chars),
            action_items: vec![
                "Trim roles older than ten years to a line each".to_string(),
                "Keep the most relevant achievements per role".to_string(),
            ],
            impact: "A focused resume is easier to review".to_string(),
        });
    }
    if resume.section_headers() < MIN_SECTION_HEADERS {
        out.push(ImprovementSuggestion {
            category: SuggestionCategory::Formatting,
            priority: SuggestionPriority::Medium,
            title: "Add clear section headers".to_string(),
            description: "Few standard sections (Experience, Education, Skills) were found.".to_string(),
            action_items: vec!["Use standard headers such as Experience, Education, and Skills".to_string()],
            impact: "Standard sections help both reviewers and parsers".to_string(),
        });
    }
    out
}

fn content_suggestions(resume: &ResumeText) -> Vec<ImprovementSuggestion> {
    let mut out = Vec::new();
    if !resume.mentions_any(EDUCATION_TERMS) {
        out.push(ImprovementSuggestion {
            category: SuggestionCategory::ContentGaps,
            priority: SuggestionPriority::Medium,
            title: "Add education details".to_string(),
            description: "No degree, school, or diploma was found.".to_string(),
            action_items: vec!["List degrees, certifications, or relevant coursework".to_string()],
            impact: "Many roles filter on education".to_string(),
        });
    }
    if !resume.mentions_any(EXPERIENCE_TERMS) {
        out.push(ImprovementSuggestion {
            category: SuggestionCategory::ContentGaps,
            priority: SuggestionPriority::Medium,
            title: "Describe work experience".to_string(),
            description: "No description of past roles or responsibilities was found.".to_string(),
            action_items: vec!["Describe each role with what you built, managed, or led".to_string()],
            impact: "Experience descriptions carry most of the semantic signal".to_string(),
        });
    }
    if !resume.quantified {
        out.push(ImprovementSuggestion {
            category: SuggestionCategory::ContentGaps,
            priority: SuggestionPriority::Medium,
            title: "Quantify achievements".to_string(),
            description: "No measurable results (percentages, amounts, user counts) were found.".to_string(),
            action_items: vec![
                "Add numbers to results, e.g. 'cut latency by 40%'".to_string(),
                "State team sizes, budgets, or user counts".to_string(),
            ],
            impact: "Measured results make impact concrete".to_string(),
        });
    }
    out
}

fn positive_points(inputs: &ImprovementInputs<'_>, resume: &ResumeText) -> Vec<String> {
    let mut points = Vec::new();
    if !inputs.matched_skills.is_empty() {
        points.push(format!(
            "Strong skill alignment: {} skills match the job requirements",
            inputs.matched_skills.len()
        ));
    }
    match inputs.recommendation {
        Recommendation::StrongMatch => points.push("Excellent overall match for this position".to_string()),
        Recommendation::GoodMatch => points.push("Good foundation for this role with room to grow".to_string()),
        Recommendation::WeakMatch | Recommendation::NoMatch => {}
    }
    if WELL_SIZED_RESUME_CHARS.contains(&resume.chars) {
        points.push("Well-sized resume".to_string());
    }
    if resume.mentions_any(SENIORITY_TERMS) {
        points.push("Demonstrates relevant professional experience".to_string());
    }
    if resume.quantified {
        points.push("Includes quantified achievements".to_string());
    }
    points.truncate(MAX_POSITIVE_POINTS);
    points
}
