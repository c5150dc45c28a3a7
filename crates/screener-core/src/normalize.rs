use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// トークン: 英数字始まり、`.` は英数字に挟まれた場合のみ（node.js）、末尾の `+` `#` は保持（c++, c#）
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{L}\p{N}](?:[\p{L}\p{N}]|\.[\p{L}\p{N}])*[+#]*").unwrap()
});

/// 埋め込み時に除外するストップワード
static STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "also", "am", "an", "and", "any", "are", "as",
    "at", "be", "been", "being", "both", "but", "by", "can", "could", "did", "do", "does", "each",
    "etc", "for", "from", "had", "has", "have", "he", "her", "his", "how", "i", "if", "in", "into",
    "is", "it", "its", "just", "me", "more", "most", "my", "no", "not", "of", "on", "or", "other",
    "our", "out", "over", "own", "she", "should", "so", "some", "such", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "up", "us", "very", "was", "we", "were", "what", "when", "where", "which", "while",
    "who", "will", "with", "would", "you", "your",
];

/// NFKC 正規化 + 小文字化
pub fn normalize_text(input: &str) -> String {
    input.nfkc().collect::<String>().to_lowercase()
}

/// 正規化済みトークン列に分割する。句読点・記号は区切りとして捨てる。
pub fn tokenize(input: &str) -> Vec<String> {
    let normalized = normalize_text(input);
    TOKEN_RE
        .find_iter(&normalized)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// エイリアスやスキル名の比較キー（トークンを空白1つで連結）
pub fn alias_key(input: &str) -> String {
    tokenize(input).join(" ")
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

/// ストップワードを除いた内容語の列
pub fn content_tokens(input: &str) -> Vec<String> {
    tokenize(input)
        .into_iter()
        .filter(|t| !is_stop_word(t))
        .collect()
}

const SUFFIX_RULES: &[(&str, &str)] = &[
    ("ational", "ate"),
    ("ization", "ize"),
    ("ations", "ate"),
    ("ation", "ate"),
    ("ements", ""),
    ("ement", ""),
    ("ments", ""),
    ("ment", ""),
    ("ings", ""),
    ("ing", ""),
    ("ies", "y"),
    ("ied", "y"),
    ("ers", ""),
    ("er", ""),
    ("ed", ""),
    ("es", ""),
    ("s", ""),
];

/// 軽量な接尾辞除去による語幹化（活用形の吸収用）
///
/// - 4文字未満、または英字以外を含むトークン（c++, node.js, python3）はそのまま返す
/// - 接尾辞を1つだけ剥がし、語幹は3文字以上を保証する
/// - 末尾の e と重子音を落として managing/manage/management を揃える
pub fn stem(token: &str) -> String {
    if token.chars().count() < 4 || !token.chars().all(|c| c.is_ascii_alphabetic()) {
        return token.to_string();
    }

    let mut word = token.to_string();
    for (suffix, replacement) in SUFFIX_RULES {
        let Some(base) = word.strip_suffix(suffix) else {
            continue;
        };
        if *suffix == "s" && (base.ends_with('s') || base.ends_with('u') || base.ends_with('i')) {
            break;
        }
        if base.len() + replacement.len() < 3 {
            break;
        }
        word = format!("{base}{replacement}");
        break;
    }

    if word.len() > 4 && word.ends_with('e') {
        word.pop();
    }

    let bytes = word.as_bytes();
    if word.len() > 4 {
        let last = bytes[bytes.len() - 1];
        let prev = bytes[bytes.len() - 2];
        if last == prev && !matches!(last, b'l' | b's' | b'z') && !is_vowel(last) {
            word.pop();
        }
    }

    word
}

fn is_vowel(b: u8) -> bool {
    matches!(b, b'a' | b'e' | b'i' | b'o' | b'u')
}
