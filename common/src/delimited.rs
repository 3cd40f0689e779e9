//! 区切りテキスト（CSV）の読み込み
//!
//! カンマ区切り・ダブルクォート囲み（`""` でエスケープ）。
//! クォート内のカンマ・改行はフィールドの一部として扱う。

use crate::error::{Error, Result};

/// CSV文字列をレコード（フィールドの配列）に分解
///
/// 空行は空フィールド1つのレコードとして返す（呼び出し側で除外する）。
pub fn parse_records(content: &str) -> Result<Vec<Vec<String>>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(Error::Parse("CSV".to_string()));
    }

    // 最終行（末尾改行なし）
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}
