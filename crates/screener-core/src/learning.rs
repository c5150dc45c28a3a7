//! 不足スキルの学習プラン
//!
//! 講座カタログ（JSON）は起動時に読み込む。カタログにないスキルには
//! 検索リンクだけの代替リソースを返す。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::AsRefStr;
use tracing::{debug, info};

use crate::explain::MissingSkill;
use crate::normalize::{alias_key, normalize_text};
use crate::run_id;
use crate::taxonomy::{SkillCategory, SkillTaxonomy};

pub const DEFAULT_MAX_PLAN_SKILLS: usize = 5;
pub const DEFAULT_MAX_COURSES: usize = 3;
const MAX_RATING: f64 = 5.0;
const FALLBACK_RATING: f64 = 4.0;
const HIGHLY_RATED: f64 = 4.8;
/// 期間が読めない講座の想定週数
const DEFAULT_COURSE_WEEKS: u32 = 2;
const WEEKS_PER_MONTH: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningResource {
    pub title: String,
    pub provider: String,
    pub url: String,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// "4 weeks", "3 months", "self-paced" など
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub cost: Option<String>,
    #[serde(default)]
    pub certificate: bool,
    #[serde(default)]
    pub rating: f64,
    /// カタログに該当がなく検索リンクで代替したもの
    #[serde(default)]
    pub is_fallback: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LearningCatalogError {
    #[error("failed to read learning catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse learning catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("learning catalog has an empty skill name")]
    EmptySkill,
    #[error("course '{title}' for {skill} has rating {rating} outside 0..=5")]
    InvalidRating { skill: String, title: String, rating: f64 },
}

#[derive(Deserialize)]
struct RawCatalog {
    courses: BTreeMap<String, Vec<LearningResource>>,
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    skill: String,
    key: String,
    resources: Vec<LearningResource>,
}

/// スキル名 → 講座一覧
#[derive(Debug, Clone, Default)]
pub struct LearningCatalog {
    entries: Vec<CatalogEntry>,
}

impl LearningCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, LearningCatalogError> {
        let parsed: RawCatalog = serde_json::from_str(raw)?;
        let mut entries = Vec::with_capacity(parsed.courses.len());
        for (skill, resources) in parsed.courses {
            let key = alias_key(&skill);
            if key.is_empty() {
                return Err(LearningCatalogError::EmptySkill);
            }
            if let Some(bad) = resources.iter().find(|r| !(0.0..=MAX_RATING).contains(&r.rating)) {
                return Err(LearningCatalogError::InvalidRating {
                    skill,
                    title: bad.title.clone(),
                    rating: bad.rating,
                });
            }
            entries.push(CatalogEntry { skill, key, resources });
        }
        Ok(Self { entries })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LearningCatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| LearningCatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&raw)?;
        info!(path = %path.display(), skills = catalog.len(), "learning catalog loaded");
        Ok(catalog)
    }

    /// パス指定がなければ空のカタログ（全スキルが検索リンクになる）
    pub fn load(path: Option<&Path>) -> Result<Self, LearningCatalogError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::empty()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 完全一致（正規名・エイリアス経由）→ 語単位の部分一致の順で探す
    fn resources_for(&self, skill_name: &str, taxonomy: &SkillTaxonomy) -> Option<&CatalogEntry> {
        let mut keys = vec![alias_key(skill_name)];
        if let Some(entry) = taxonomy.lookup(skill_name) {
            keys.push(alias_key(&entry.name));
        }

        if let Some(found) = self.entries.iter().find(|e| keys.contains(&e.key)) {
            return Some(found);
        }

        let wanted: Vec<&str> = keys[0].split(' ').collect();
        self.entries.iter().find(|e| {
            let have: Vec<&str> = e.key.split(' ').collect();
            contains_words(&wanted, &have) || contains_words(&have, &wanted)
        })
    }

    /// 難易度が合う講座を優先し、評価の高い順に `max` 件。該当がなければ検索リンク1件。
    pub fn find_courses(
        &self,
        skill_name: &str,
        taxonomy: &SkillTaxonomy,
        difficulty: Option<Difficulty>,
        max: usize,
    ) -> Vec<LearningResource> {
        let Some(entry) = self.resources_for(skill_name, taxonomy) else {
            debug!(skill = %skill_name, "no catalog courses; using search fallback");
            return vec![fallback_resource(skill_name)];
        };

        let mut courses: Vec<LearningResource> = match difficulty {
            Some(level) => entry
                .resources
                .iter()
                .filter(|r| r.difficulty == Some(level))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        if courses.is_empty() {
            courses = entry.resources.clone();
        }
        if courses.is_empty() {
            return vec![fallback_resource(&entry.skill)];
        }

        courses.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        courses.truncate(max);
        courses
    }
}

fn contains_words(haystack: &[&str], needle: &[&str]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

fn fallback_resource(skill_name: &str) -> LearningResource {
    LearningResource {
        title: format!("Search '{skill_name}' tutorials"),
        provider: "YouTube".to_string(),
        url: format!(
            "https://www.youtube.com/results?search_query={}+tutorial",
            urlencoding::encode(skill_name)
        ),
        difficulty: None,
        duration: Some("self-paced".to_string()),
        cost: Some("free".to_string()),
        certificate: false,
        rating: FALLBACK_RATING,
        is_fallback: true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LearningPriority {
    #[default]
    Critical,
    Preferred,
    NiceToHave,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningTarget {
    pub skill_name: String,
    #[serde(default)]
    pub priority: LearningPriority,
}

/// 必須の不足スキルを Critical、歓迎の不足スキルを Preferred にする
pub fn learning_targets(missing_required: &[MissingSkill], missing_preferred: &[MissingSkill]) -> Vec<LearningTarget> {
    let tagged = |skills: &[MissingSkill], priority: LearningPriority| {
        skills
            .iter()
            .map(|m| LearningTarget {
                skill_name: m.skill_name.clone(),
                priority,
            })
            .collect::<Vec<_>>()
    };
    let mut targets = tagged(missing_required, LearningPriority::Critical);
    targets.extend(tagged(missing_preferred, LearningPriority::Preferred));
    targets
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedCourse {
    #[serde(flatten)]
    pub resource: LearningResource,
    pub why_recommended: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillLearningPlan {
    pub skill_name: String,
    pub priority: LearningPriority,
    pub recommended_courses: Vec<RecommendedCourse>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningMilestone {
    pub month: usize,
    pub focus: String,
    pub courses: Vec<String>,
    pub expected_outcome: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningPlan {
    pub plan_id: String,
    pub total_skills_to_learn: usize,
    pub estimated_weeks: u32,
    pub estimated_total_time: String,
    pub skills: Vec<SkillLearningPlan>,
    pub milestones: Vec<LearningMilestone>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningOptions {
    pub max_skills: usize,
    pub difficulty: Option<Difficulty>,
    pub max_courses: usize,
}

impl Default for LearningOptions {
    fn default() -> Self {
        Self {
            max_skills: DEFAULT_MAX_PLAN_SKILLS,
            difficulty: Some(Difficulty::Beginner),
            max_courses: DEFAULT_MAX_COURSES,
        }
    }
}

fn why_recommended(resource: &LearningResource) -> &'static str {
    if resource.rating >= HIGHLY_RATED {
        "Highly rated by learners"
    } else if resource.cost.as_deref().map(normalize_text).as_deref() == Some("free") {
        "Free and comprehensive"
    } else if resource.certificate {
        "Includes a certificate"
    } else {
        "Recommended for skill development"
    }
}

/// "6 weeks" → 6、"2 months" → 8、読めなければ 2
fn duration_weeks(duration: Option<&str>) -> u32 {
    let Some(duration) = duration else {
        return DEFAULT_COURSE_WEEKS;
    };
    let duration = normalize_text(duration);
    let number = duration
        .split(|c: char| !c.is_ascii_digit())
        .find(|s| !s.is_empty())
        .and_then(|s| s.parse::<u32>().ok());
    if duration.contains("week") {
        number.unwrap_or(WEEKS_PER_MONTH)
    } else if duration.contains("month") {
        number.unwrap_or(1) * WEEKS_PER_MONTH
    } else {
        DEFAULT_COURSE_WEEKS
    }
}

fn total_time_text(weeks: u32) -> String {
    let months = weeks / WEEKS_PER_MONTH;
    match weeks {
        0..=4 => "1 month".to_string(),
        5..=12 => format!("{}-{} months", months.max(1), months + 1),
        _ => format!("{months} months"),
    }
}

fn expected_outcome(skill_name: &str, taxonomy: &SkillTaxonomy) -> String {
    match taxonomy.lookup(skill_name).map(|e| e.category) {
        Some(SkillCategory::Soft) => format!("Apply {skill_name} in day-to-day teamwork"),
        Some(SkillCategory::Tool) => format!("Use {skill_name} confidently on real tasks"),
        Some(SkillCategory::Technical) => format!("Build a small working project with {skill_name}"),
        Some(SkillCategory::Domain) | None => format!("Build foundational knowledge in {skill_name}"),
    }
}

/// 優先度順（同順位は入力順）に `max_skills` 件まで、1スキル1か月のマイルストーンで並べる。
pub fn build_learning_plan(
    targets: &[LearningTarget],
    catalog: &LearningCatalog,
    taxonomy: &SkillTaxonomy,
    options: LearningOptions,
) -> LearningPlan {
    let mut ordered: Vec<&LearningTarget> = targets.iter().collect();
    ordered.sort_by_key(|t| t.priority);
    ordered.truncate(options.max_skills);

    let mut skills = Vec::with_capacity(ordered.len());
    let mut milestones = Vec::new();
    let mut estimated_weeks = 0;

    for target in ordered {
        let courses = catalog.find_courses(&target.skill_name, taxonomy, options.difficulty, options.max_courses);

        if let Some(first) = courses.first() {
            if !first.is_fallback {
                estimated_weeks += duration_weeks(first.duration.as_deref());
            }
            milestones.push(LearningMilestone {
                month: milestones.len() + 1,
                focus: format!("{} fundamentals", target.skill_name),
                courses: vec![first.title.clone()],
                expected_outcome: expected_outcome(&target.skill_name, taxonomy),
            });
        }

        skills.push(SkillLearningPlan {
            skill_name: target.skill_name.clone(),
            priority: target.priority,
            recommended_courses: courses
                .into_iter()
                .map(|resource| RecommendedCourse {
                    why_recommended: why_recommended(&resource),
                    resource,
                })
                .collect(),
        });
    }

    LearningPlan {
        plan_id: run_id::generate(),
        total_skills_to_learn: skills.len(),
        estimated_weeks,
        estimated_total_time: if skills.is_empty() {
            "none".to_string()
        } else {
            total_time_text(estimated_weeks)
        },
        skills,
        milestones,
    }
}
