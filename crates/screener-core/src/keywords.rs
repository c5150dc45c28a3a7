//! 求人票・履歴書のキーワード抽出と重なり分析
//!
//! タクソノミーに載っていない語（業務内容・動作動詞・業界用語）を拾い、
//! 求人票にあって履歴書にない語を「不足キーワード」として返す。

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use strum::AsRefStr;

use crate::normalize::{is_stop_word, normalize_text, stem, tokenize};

pub const DEFAULT_MAX_KEYWORDS: usize = 20;
pub const DEFAULT_MAX_MISSING_KEYWORDS: usize = 15;

const MIN_KEYWORD_CHARS: usize = 3;
/// 不足キーワードとして挙げる単語の最短長
const MIN_MISSING_CHARS: usize = 5;

/// 求人票に頻出する動作動詞。不足キーワードでは他の語より先に挙げる。
const ACTION_VERBS: &[&str] = &[
    "develop",
    "design",
    "implement",
    "manage",
    "lead",
    "create",
    "analyze",
    "build",
    "collaborate",
    "optimize",
    "maintain",
];

/// ストップワード以外に除外する機能語
const FILLER_WORDS: &[&str] = &[
    "every", "few", "may", "might", "must", "need", "only", "same", "shall", "whom", "why",
];

/// 大文字始まりの語の連続（"Machine Learning", "Product Design"）
static CAPITALIZED_PHRASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)+\b").unwrap());

static TECH_PHRASE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b[a-z]+\s+(?:development|engineering|management|analysis|design)\b",
        r"(?i)\b(?:software|web|mobile|cloud|data)\s+[a-z]+\b",
        r"(?i)\b[a-z]+\s+(?:learning|processing|science)\b",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KeywordKind {
    Word,
    Phrase,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Keyword {
    pub keyword: String,
    pub count: usize,
    pub kind: KeywordKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeywordOverlap {
    /// 両方に現れたキーワード（辞書順）
    pub shared: Vec<String>,
    /// Jaccard 係数（どちらも空なら 0）
    pub ratio: f64,
}

/// 履歴書と求人票のキーワード比較結果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeywordAnalysis {
    pub job_keywords: Vec<Keyword>,
    pub resume_keywords: Vec<Keyword>,
    pub shared_keywords: Vec<String>,
    pub overlap_ratio: f64,
    /// 動作動詞 → 求人票での出現順
    pub missing_keywords: Vec<String>,
}

fn is_filler(token: &str) -> bool {
    is_stop_word(token) || FILLER_WORDS.contains(&token)
}

fn is_plain_word(token: &str) -> bool {
    token.chars().all(char::is_alphabetic)
}

/// 出現回数の多い順に単語・フレーズを返す。同数なら単語が先、その中は初出順。
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<Keyword> {
    let mut keywords: Vec<Keyword> = Vec::new();
    let mut index: HashMap<(String, KeywordKind), usize> = HashMap::new();
    let mut bump = |keyword: String, kind: KeywordKind| match index.get(&(keyword.clone(), kind)) {
        Some(&i) => keywords[i].count += 1,
        None => {
            index.insert((keyword.clone(), kind), keywords.len());
            keywords.push(Keyword {
                keyword,
                count: 1,
                kind,
            });
        }
    };

    for token in tokenize(text) {
        if token.chars().count() >= MIN_KEYWORD_CHARS && is_plain_word(&token) && !is_filler(&token) {
            bump(token, KeywordKind::Word);
        }
    }

    for phrase in key_phrases(text) {
        bump(phrase, KeywordKind::Phrase);
    }

    keywords.sort_by(|a, b| b.count.cmp(&a.count));
    keywords.truncate(max_keywords);
    keywords
}

fn key_phrases(text: &str) -> Vec<String> {
    let text: String = unicode_normalization::UnicodeNormalization::nfkc(text).collect();
    let mut phrases = Vec::new();
    let patterns = std::iter::once(&*CAPITALIZED_PHRASE_RE).chain(TECH_PHRASE_RES.iter());
    for pattern in patterns {
        for found in pattern.find_iter(&text) {
            let words: Vec<String> = found
                .as_str()
                .split_whitespace()
                .map(str::to_lowercase)
                .collect();
            if words.iter().any(|w| is_filler(w)) {
                continue;
            }
            let phrase = words.join(" ");
            if phrase.chars().count() >= MIN_KEYWORD_CHARS {
                phrases.push(phrase);
            }
        }
    }
    phrases
}

/// 2つのキーワード列の重なり（大文字小文字は区別しない）
pub fn compare_keyword_overlap<L, R>(left: &[L], right: &[R]) -> KeywordOverlap
where
    L: AsRef<str>,
    R: AsRef<str>,
{
    let key = |k: &str| normalize_text(k).trim().to_string();
    let left: BTreeSet<String> = left.iter().map(|k| key(k.as_ref())).filter(|k| !k.is_empty()).collect();
    let right: BTreeSet<String> = right.iter().map(|k| key(k.as_ref())).filter(|k| !k.is_empty()).collect();

    let shared: Vec<String> = left.intersection(&right).cloned().collect();
    let union = left.union(&right).count();
    let ratio = if union == 0 {
        0.0
    } else {
        shared.len() as f64 / union as f64
    };

    KeywordOverlap { shared, ratio }
}

/// 求人票にあって履歴書にない語。活用違い（developed / development）は同じ語とみなす。
pub fn missing_keywords(resume_text: &str, job_text: &str, limit: usize) -> Vec<String> {
    let resume_tokens = tokenize(resume_text);
    let resume_stems: HashSet<String> = resume_tokens.iter().map(|t| stem(t)).collect();
    let in_resume = |word: &str| resume_stems.contains(&stem(word));

    let job_tokens = tokenize(job_text);
    let job_stems: HashSet<String> = job_tokens.iter().map(|t| stem(t)).collect();

    let mut missing = Vec::new();
    let mut listed: HashSet<String> = HashSet::new();

    for verb in ACTION_VERBS {
        let verb_stem = stem(verb);
        if job_stems.contains(&verb_stem) && !in_resume(verb) && listed.insert(verb_stem) {
            missing.push((*verb).to_string());
        }
    }

    for token in job_tokens {
        if token.chars().count() < MIN_MISSING_CHARS || !is_plain_word(&token) || is_filler(&token) {
            continue;
        }
        if in_resume(&token) || !listed.insert(stem(&token)) {
            continue;
        }
        missing.push(token);
    }

    missing.truncate(limit);
    missing
}

pub fn analyze_keywords(resume_text: &str, job_text: &str) -> KeywordAnalysis {
    let job_keywords = extract_keywords(job_text, DEFAULT_MAX_KEYWORDS);
    let resume_keywords = extract_keywords(resume_text, DEFAULT_MAX_KEYWORDS);

    let job_terms: Vec<&str> = job_keywords.iter().map(|k| k.keyword.as_str()).collect();
    let resume_terms: Vec<&str> = resume_keywords.iter().map(|k| k.keyword.as_str()).collect();
    let overlap = compare_keyword_overlap(&resume_terms, &job_terms);

    KeywordAnalysis {
        job_keywords,
        resume_keywords,
        shared_keywords: overlap.shared,
        overlap_ratio: overlap.ratio,
        missing_keywords: missing_keywords(resume_text, job_text, DEFAULT_MAX_MISSING_KEYWORDS),
    }
}
