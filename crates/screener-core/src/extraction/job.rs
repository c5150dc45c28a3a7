//! 求人票の必須/歓迎スキル分割
//!
//! 行単位で判定する:
//! - 歓迎マーカーを含む行、または歓迎見出し配下の行 → preferred
//! - 必須マーカーを含む見出しで required に戻る
//! - 両方に現れたスキルは required 扱い

use serde::Serialize;
use tracing::debug;

use super::{SkillExtractor, SkillSet, resolve_skill_names};
use crate::normalize::tokenize;
use crate::taxonomy::SkillTaxonomy;

const PREFERRED_MARKERS: &[&str] = &[
    "preferred",
    "nice to have",
    "bonus",
    "a plus",
    "desirable",
    "optional",
];

const REQUIRED_MARKERS: &[&str] = &[
    "required",
    "requirements",
    "must have",
    "qualifications",
    "responsibilities",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSkills {
    pub required: SkillSet,
    pub preferred: SkillSet,
}

impl JobSkills {
    /// 必須と歓迎を正規化する（両方にあれば必須を残す）
    pub fn new(required: SkillSet, mut preferred: SkillSet) -> Self {
        let overlap: Vec<String> = preferred
            .names()
            .filter(|name| required.contains(name))
            .map(str::to_string)
            .collect();
        for name in overlap {
            preferred.remove(&name);
        }
        Self {
            required,
            preferred,
        }
    }

    /// 明示的なスキル名リストから構築し、未知の名前を返す
    pub fn from_names(
        required: &[String],
        preferred: &[String],
        taxonomy: &SkillTaxonomy,
    ) -> (Self, Vec<String>) {
        let (required, mut unrecognized) = resolve_skill_names(required, taxonomy);
        let (preferred, unknown_preferred) = resolve_skill_names(preferred, taxonomy);
        unrecognized.extend(unknown_preferred);
        (Self::new(required, preferred), unrecognized)
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.preferred.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Required,
    Preferred,
}

fn contains_marker(tokens: &[String], markers: &[&str]) -> bool {
    markers.iter().any(|marker| {
        let marker_tokens = tokenize(marker);
        tokens
            .windows(marker_tokens.len())
            .any(|window| window == marker_tokens.as_slice())
    })
}

/// `Requirements:` や `## Nice to have` のような見出し行
fn is_heading(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('#') || trimmed.ends_with(':')
}

/// 求人本文を行ごとに必須/歓迎へ振り分け、それぞれからスキルを抽出する
pub fn extract_job_skills(
    job_text: &str,
    taxonomy: &SkillTaxonomy,
    extractor: &SkillExtractor,
) -> JobSkills {
    let mut section = Section::Required;
    let mut required_lines = Vec::new();
    let mut preferred_lines = Vec::new();

    for line in job_text.lines() {
        let tokens = tokenize(line);
        if tokens.is_empty() {
            continue;
        }
        let has_preferred = contains_marker(&tokens, PREFERRED_MARKERS);
        let has_required = contains_marker(&tokens, REQUIRED_MARKERS);

        if is_heading(line) {
            if has_preferred {
                section = Section::Preferred;
            } else if has_required {
                section = Section::Required;
            }
        }

        let line_section = if has_preferred {
            Section::Preferred
        } else if has_required {
            Section::Required
        } else {
            section
        };

        match line_section {
            Section::Required => required_lines.push(line),
            Section::Preferred => preferred_lines.push(line),
        }
    }

    let required = extractor.extract(&required_lines.join("\n"), taxonomy);
    let preferred = extractor.extract(&preferred_lines.join("\n"), taxonomy);

    debug!(
        required_lines = required_lines.len(),
        preferred_lines = preferred_lines.len(),
        required = required.len(),
        preferred = preferred.len(),
        "job skills split"
    );

    JobSkills::new(required, preferred)
}
