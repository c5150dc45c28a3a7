use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::normalize::stem;
use crate::taxonomy::{AliasPattern, SkillTaxonomy};

/// どのマッチャーでスキルを検出したか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Stem,
}

/// マッチャーが見つけた1件（重複排除前）
#[derive(Debug, Clone, PartialEq)]
pub struct MatchHit {
    pub skill_name: String,
    pub alias: String,
    /// トークン位置（先頭トークン）
    pub position: usize,
}

/// トークン列からタクソノミーのスキルを探すマッチャー
///
/// `consumed` は先行マッチャーが使ったトークン。一致したトークンは true にして後続に渡さない。
pub trait SkillMatcher: Send + Sync {
    fn method(&self) -> MatchMethod;

    /// このマッチャーの検出に付与する信頼度
    fn confidence(&self) -> f64;

    fn find(
        &self,
        tokens: &[String],
        consumed: &mut [bool],
        taxonomy: &SkillTaxonomy,
    ) -> Vec<MatchHit>;
}

/// エイリアス完全一致（最長一致、信頼度 1.0）
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactAliasMatcher;

impl SkillMatcher for ExactAliasMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::Exact
    }

    fn confidence(&self) -> f64 {
        1.0
    }

    fn find(
        &self,
        tokens: &[String],
        consumed: &mut [bool],
        taxonomy: &SkillTaxonomy,
    ) -> Vec<MatchHit> {
        scan(tokens, consumed, |i| taxonomy.exact_candidates(&tokens[i]))
    }
}

/// 語幹一致（活用形の吸収、信頼度 0.7）
#[derive(Debug, Default, Clone, Copy)]
pub struct StemMatcher;

impl SkillMatcher for StemMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::Stem
    }

    fn confidence(&self) -> f64 {
        0.7
    }

    fn find(
        &self,
        tokens: &[String],
        consumed: &mut [bool],
        taxonomy: &SkillTaxonomy,
    ) -> Vec<MatchHit> {
        let stems: Vec<String> = tokens.iter().map(|t| stem(t)).collect();
        scan(&stems, consumed, |i| taxonomy.stem_candidates(&stems[i]))
    }
}

/// 左から走査し、各位置で最初（＝最長）に一致した候補を採用する
fn scan<'a>(
    tokens: &[String],
    consumed: &mut [bool],
    candidates: impl Fn(usize) -> &'a [AliasPattern],
) -> Vec<MatchHit> {
    let mut hits = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        if consumed[i] {
            i += 1;
            continue;
        }

        let matched = candidates(i).iter().find(|pattern| {
            let end = i + pattern.tokens.len();
            end <= tokens.len()
                && !consumed[i..end].iter().any(|&c| c)
                && tokens[i..end] == pattern.tokens[..]
        });

        match matched {
            Some(pattern) => {
                let end = i + pattern.tokens.len();
                consumed[i..end].iter_mut().for_each(|c| *c = true);
                hits.push(MatchHit {
                    skill_name: pattern.skill_name.clone(),
                    alias: pattern.alias.clone(),
                    position: i,
                });
                i = end;
            }
            None => i += 1,
        }
    }

    hits
}
