//! タクソノミーに基づくスキル抽出
//!
//! 正規化 → トークン化 → マッチャー列（完全一致 → 語幹一致）の順に照合し、
//! 正規スキル名ごとに1件へ重複排除した `SkillSet` を返す。

pub mod job;
pub mod matcher;

use std::collections::BTreeMap;

use serde::Serialize;
use serde::ser::SerializeStruct;
use tracing::{debug, warn};

use crate::normalize::{alias_key, tokenize};
use crate::taxonomy::{SkillCategory, SkillTaxonomy};
pub use job::{JobSkills, extract_job_skills};
pub use matcher::{ExactAliasMatcher, MatchHit, MatchMethod, SkillMatcher, StemMatcher};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillRecord {
    pub skill_name: String,
    pub category: SkillCategory,
    pub confidence: f64,
    pub matched_alias: String,
    pub match_method: MatchMethod,
}

/// 1文書分のスキル集合（正規名順・重複なし）
#[derive(Debug, Clone, PartialEq)]
pub struct SkillSet {
    records: BTreeMap<String, SkillRecord>,
    taxonomy_version: String,
}

impl SkillSet {
    pub fn new(taxonomy_version: impl Into<String>) -> Self {
        Self {
            records: BTreeMap::new(),
            taxonomy_version: taxonomy_version.into(),
        }
    }

    pub fn taxonomy_version(&self) -> &str {
        &self.taxonomy_version
    }

    pub fn contains(&self, skill_name: &str) -> bool {
        self.records.contains_key(skill_name)
    }

    pub fn get(&self, skill_name: &str) -> Option<&SkillRecord> {
        self.records.get(skill_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkillRecord> {
        self.records.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 同名があれば信頼度が高い方を残す
    pub fn insert(&mut self, record: SkillRecord) {
        match self.records.get(&record.skill_name) {
            Some(existing) if existing.confidence >= record.confidence => {}
            _ => {
                self.records.insert(record.skill_name.clone(), record);
            }
        }
    }

    pub fn remove(&mut self, skill_name: &str) -> Option<SkillRecord> {
        self.records.remove(skill_name)
    }
}

impl Serialize for SkillSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let skills: Vec<&SkillRecord> = self.records.values().collect();
        let mut state = serializer.serialize_struct("SkillSet", 2)?;
        state.serialize_field("taxonomy_version", &self.taxonomy_version)?;
        state.serialize_field("skills", &skills)?;
        state.end()
    }
}

/// 重複排除用の候補（信頼度 → 出現位置 → エイリアス の順で優先）
struct Candidate {
    record: SkillRecord,
    position: usize,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        if self.record.confidence != other.record.confidence {
            return self.record.confidence > other.record.confidence;
        }
        if self.position != other.position {
            return self.position < other.position;
        }
        self.record.matched_alias < other.record.matched_alias
    }
}

/// マッチャー列を順に適用するスキル抽出器
pub struct SkillExtractor {
    matchers: Vec<Box<dyn SkillMatcher>>,
}

impl Default for SkillExtractor {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ExactAliasMatcher) as Box<dyn SkillMatcher>,
            Box::new(StemMatcher),
        ])
    }
}

impl std::fmt::Debug for SkillExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let methods: Vec<_> = self.matchers.iter().map(|m| m.method()).collect();
        f.debug_struct("SkillExtractor")
            .field("matchers", &methods)
            .finish()
    }
}

impl SkillExtractor {
    pub fn new(matchers: Vec<Box<dyn SkillMatcher>>) -> Self {
        Self { matchers }
    }

    /// テキストからスキルを抽出する。見つからなければ空集合（エラーにはしない）。
    pub fn extract(&self, text: &str, taxonomy: &SkillTaxonomy) -> SkillSet {
        let tokens = tokenize(text);
        let mut consumed = vec![false; tokens.len()];
        let mut best: BTreeMap<String, Candidate> = BTreeMap::new();

        for matcher in &self.matchers {
            let hits = matcher.find(&tokens, &mut consumed, taxonomy);
            for hit in hits {
                let Some(entry) = taxonomy.entry(&hit.skill_name) else {
                    continue;
                };
                let candidate = Candidate {
                    record: SkillRecord {
                        skill_name: entry.name.clone(),
                        category: entry.category,
                        confidence: matcher.confidence(),
                        matched_alias: hit.alias,
                        match_method: matcher.method(),
                    },
                    position: hit.position,
                };
                match best.get(&entry.name) {
                    Some(current) if !candidate.beats(current) => {}
                    _ => {
                        best.insert(entry.name.clone(), candidate);
                    }
                }
            }
        }

        let records = best
            .into_iter()
            .map(|(name, candidate)| (name, candidate.record))
            .collect::<BTreeMap<_, _>>();

        debug!(
            tokens = tokens.len(),
            skills = records.len(),
            taxonomy_version = taxonomy.version(),
            "skills extracted"
        );

        SkillSet {
            records,
            taxonomy_version: taxonomy.version().to_string(),
        }
    }
}

/// 呼び出し側が明示したスキル名をタクソノミーで解決する。
/// 未知の名前は落として `unrecognized` に返す。
pub fn resolve_skill_names(names: &[String], taxonomy: &SkillTaxonomy) -> (SkillSet, Vec<String>) {
    let mut set = SkillSet::new(taxonomy.version());
    let mut unrecognized = Vec::new();

    for name in names {
        match taxonomy.lookup(name) {
            Some(entry) => set.insert(SkillRecord {
                skill_name: entry.name.clone(),
                category: entry.category,
                confidence: 1.0,
                matched_alias: alias_key(name),
                match_method: MatchMethod::Exact,
            }),
            None => {
                warn!(skill = %name, "unknown skill name dropped");
                unrecognized.push(name.clone());
            }
        }
    }

    (set, unrecognized)
}
