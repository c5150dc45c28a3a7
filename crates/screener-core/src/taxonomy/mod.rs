//! スキルタクソノミー（正規スキル名 → エイリアス・カテゴリ・重要度）
//!
//! プロセス起動時に一度だけ構築し、以後は読み取り専用で `Arc` 共有する。
//! 設定不備（重複エイリアス、空エイリアス、重要度範囲外など）はロード時に失敗させる。

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::AsRefStr;
use tracing::{debug, info};

use crate::normalize::{alias_key, stem};

const BUILTIN_TAXONOMY: &str = include_str!("default_taxonomy.json");

/// 重要度のデフォルト値
pub const DEFAULT_IMPORTANCE: f64 = 0.5;

/// 語幹マッチ対象から外す単一トークンエイリアスの最短長
const MIN_STEM_ALIAS_CHARS: usize = 4;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkillCategory {
    Technical,
    Soft,
    Domain,
    Tool,
}

/// 正規スキル1件。`aliases` は正規化済みのキーで、正規名自身を必ず含む。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillTaxonomyEntry {
    pub name: String,
    pub category: SkillCategory,
    pub aliases: BTreeSet<String>,
    pub importance: f64,
    /// false なら語幹マッチの索引に載せない（bank/banking のような別語を拾わないため）
    pub stem: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse taxonomy: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("taxonomy has no skills")]
    Empty,
    #[error("taxonomy version tag is missing")]
    MissingVersion,
    #[error("skill #{index} has a blank name")]
    BlankSkillName { index: usize },
    #[error("skill {skill} has a blank alias")]
    BlankAlias { skill: String },
    #[error("skill {name} is defined more than once")]
    DuplicateSkill { name: String },
    #[error("alias '{alias}' maps to both {first} and {second}")]
    DuplicateAlias {
        alias: String,
        first: String,
        second: String,
    },
    #[error("skill {skill} has importance {value} outside (0, 1]")]
    InvalidImportance { skill: String, value: f64 },
}

#[derive(Debug, Deserialize)]
struct RawTaxonomy {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    skills: Vec<RawSkill>,
}

#[derive(Debug, Deserialize)]
struct RawSkill {
    name: String,
    category: SkillCategory,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    importance: Option<f64>,
    #[serde(default = "default_stem")]
    stem: bool,
}

fn default_stem() -> bool {
    true
}

/// トークン列として照合するエイリアス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasPattern {
    pub tokens: Vec<String>,
    /// 照合に使ったエイリアス（正規化済み）
    pub alias: String,
    pub skill_name: String,
}

#[derive(Debug, Clone)]
pub struct SkillTaxonomy {
    version: String,
    entries: Vec<SkillTaxonomyEntry>,
    by_name: HashMap<String, usize>,
    by_alias: HashMap<String, usize>,
    exact_patterns: HashMap<String, Vec<AliasPattern>>,
    stem_patterns: HashMap<String, Vec<AliasPattern>>,
}

impl SkillTaxonomy {
    /// 組み込みタクソノミー（`default_taxonomy.json`）
    pub fn builtin() -> Result<Self, TaxonomyError> {
        Self::from_json_str(BUILTIN_TAXONOMY)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TaxonomyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let taxonomy = Self::from_json_str(&raw)?;
        info!(
            path = %path.display(),
            version = %taxonomy.version,
            skills = taxonomy.entries.len(),
            "skill taxonomy loaded from file"
        );
        Ok(taxonomy)
    }

    /// パス指定があればファイルから、なければ組み込みをロードする
    pub fn load(path: Option<&Path>) -> Result<Self, TaxonomyError> {
        match path {
            Some(path) => Self::from_path(path),
            None => {
                let taxonomy = Self::builtin()?;
                info!(
                    version = %taxonomy.version,
                    skills = taxonomy.entries.len(),
                    "builtin skill taxonomy loaded"
                );
                Ok(taxonomy)
            }
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, TaxonomyError> {
        let parsed: RawTaxonomy = serde_json::from_str(raw)?;

        let tag = parsed
            .version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(TaxonomyError::MissingVersion)?
            .to_string();

        if parsed.skills.is_empty() {
            return Err(TaxonomyError::Empty);
        }

        let mut entries = Vec::with_capacity(parsed.skills.len());
        let mut seen_names = HashSet::new();

        for (index, skill) in parsed.skills.into_iter().enumerate() {
            let name = skill.name.trim().to_string();
            let name_key = alias_key(&name);
            if name_key.is_empty() {
                return Err(TaxonomyError::BlankSkillName { index });
            }
            if !seen_names.insert(name_key) {
                return Err(TaxonomyError::DuplicateSkill { name });
            }

            let importance = skill.importance.unwrap_or(DEFAULT_IMPORTANCE);
            if !importance.is_finite() || importance <= 0.0 || importance > 1.0 {
                return Err(TaxonomyError::InvalidImportance {
                    skill: name,
                    value: importance,
                });
            }

            let mut aliases = BTreeSet::new();
            aliases.insert(alias_key(&name));
            for alias in &skill.aliases {
                let key = alias_key(alias);
                if key.is_empty() {
                    return Err(TaxonomyError::BlankAlias { skill: name });
                }
                // 同一スキル内の重複は無視する
                aliases.insert(key);
            }

            entries.push(SkillTaxonomyEntry {
                name,
                category: skill.category,
                aliases,
                importance,
                stem: skill.stem,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_alias: HashMap<String, usize> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            by_name.insert(entry.name.clone(), idx);
            for alias in &entry.aliases {
                if let Some(&other) = by_alias.get(alias) {
                    return Err(TaxonomyError::DuplicateAlias {
                        alias: alias.clone(),
                        first: entries[other].name.clone(),
                        second: entry.name.clone(),
                    });
                }
                by_alias.insert(alias.clone(), idx);
            }
        }

        let exact_patterns = build_pattern_index(&entries, |_, alias| {
            Some(alias.split(' ').map(str::to_string).collect())
        });
        let stem_patterns = build_pattern_index(&entries, |entry, alias| {
            if !entry.stem {
                return None;
            }
            let tokens: Vec<&str> = alias.split(' ').collect();
            if tokens.len() == 1 && tokens[0].chars().count() < MIN_STEM_ALIAS_CHARS {
                return None;
            }
            Some(tokens.into_iter().map(stem).collect())
        });

        let version = format!("{tag}+{}", content_digest(&tag, &entries)?);
        debug!(
            version = %version,
            skills = entries.len(),
            aliases = by_alias.len(),
            "skill taxonomy indexed"
        );

        Ok(Self {
            version,
            entries,
            by_name,
            by_alias,
            exact_patterns,
            stem_patterns,
        })
    }

    /// `<tag>+<内容の SHA-256 先頭12桁>`
    pub fn version(&self) -> &str {
        &self.version
    }

    /// エイリアス（正規名を含む）から正規スキルを引く。抽出時と同じ正規化を適用する。
    pub fn lookup(&self, alias: &str) -> Option<&SkillTaxonomyEntry> {
        self.by_alias
            .get(&alias_key(alias))
            .map(|&idx| &self.entries[idx])
    }

    /// 正規名で完全一致検索
    pub fn entry(&self, name: &str) -> Option<&SkillTaxonomyEntry> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    /// 正規名順の全エントリ
    pub fn entries(&self) -> &[SkillTaxonomyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 先頭トークンが一致するエイリアス（長い順）
    pub fn exact_candidates(&self, first_token: &str) -> &[AliasPattern] {
        self.exact_patterns
            .get(first_token)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 先頭トークンの語幹が一致するエイリアス（長い順）
    pub fn stem_candidates(&self, first_stem: &str) -> &[AliasPattern] {
        self.stem_patterns
            .get(first_stem)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn build_pattern_index(
    entries: &[SkillTaxonomyEntry],
    to_tokens: impl Fn(&SkillTaxonomyEntry, &str) -> Option<Vec<String>>,
) -> HashMap<String, Vec<AliasPattern>> {
    let mut index: HashMap<String, Vec<AliasPattern>> = HashMap::new();
    for entry in entries {
        for alias in &entry.aliases {
            let Some(tokens) = to_tokens(entry, alias) else {
                continue;
            };
            let Some(first) = tokens.first().cloned() else {
                continue;
            };
            let bucket = index.entry(first).or_default();
            if bucket.iter().any(|p| p.tokens == tokens) {
                // 語幹が衝突した場合は正規名順で先のスキルを優先
                continue;
            }
            bucket.push(AliasPattern {
                tokens,
                alias: alias.clone(),
                skill_name: entry.name.clone(),
            });
        }
    }
    for bucket in index.values_mut() {
        bucket.sort_by(|a, b| {
            b.tokens
                .len()
                .cmp(&a.tokens.len())
                .then_with(|| a.skill_name.cmp(&b.skill_name))
                .then_with(|| a.alias.cmp(&b.alias))
        });
    }
    index
}

fn content_digest(tag: &str, entries: &[SkillTaxonomyEntry]) -> Result<String, TaxonomyError> {
    let canonical = serde_json::to_vec(&(tag, entries))?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    let bytes = hasher.finalize();
    let mut hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    hex.truncate(12);
    Ok(hex)
}
