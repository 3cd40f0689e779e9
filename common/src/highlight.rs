//! 回答間の共通単語ハイライト
//!
//! 2つの回答に共通する単語（大文字小文字を区別しない）を抽出し、
//! テキストを「強調する／しない」区間に分割する。

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::warn;

lazy_static! {
    /// 単語 = 文字・数字の連続
    static ref WORD_RE: Regex = Regex::new(r"[\p{L}\p{N}]+").unwrap();
}

/// テキストを小文字の単語集合に分解
pub fn tokenize(text: &str) -> BTreeSet<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// 両方のテキストに現れる単語
pub fn matching_words(a: &str, b: &str) -> BTreeSet<String> {
    let left = tokenize(a);
    let right = tokenize(b);
    left.intersection(&right).cloned().collect()
}

/// ハイライト区間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub marked: bool,
}

impl<'a> Segment<'a> {
    fn plain(text: &'a str) -> Self {
        Self { text, marked: false }
    }
}

fn word_pattern(words: &BTreeSet<String>) -> Option<Regex> {
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    match Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Failed to build highlight pattern: {}", e);
            None
        }
    }
}

/// テキストを区間に分割する
///
/// 単語集合が空なら全体を1区間で返す。区間を連結すると元のテキストに戻る。
pub fn highlight<'a>(text: &'a str, words: &BTreeSet<String>) -> Vec<Segment<'a>> {
    if words.is_empty() {
        return vec![Segment::plain(text)];
    }
    let Some(re) = word_pattern(words) else {
        return vec![Segment::plain(text)];
    };

    let mut segments = Vec::new();
    let mut last = 0;
    for m in re.find_iter(text) {
        if m.start() > last {
            segments.push(Segment::plain(&text[last..m.start()]));
        }
        segments.push(Segment {
            text: m.as_str(),
            marked: words.contains(&m.as_str().to_lowercase()),
        });
        last = m.end();
    }
    if last < text.len() || segments.is_empty() {
        segments.push(Segment::plain(&text[last..]));
    }
    segments
}

/// 強調区間を `mark` で包んだ文字列を返す
pub fn render<F>(text: &str, words: &BTreeSet<String>, mark: F) -> String
where
    F: Fn(&str) -> String,
{
    highlight(text, words)
        .into_iter()
        .map(|seg| if seg.marked { mark(seg.text) } else { seg.text.to_string() })
        .collect()
}
