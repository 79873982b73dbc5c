//! CSV行の分割（ダブルクォート対応）
//!
//! ワークリストと結果ファイルの両方で使う最小限のパーサー。
//! 値の中の改行には対応しない。

/// CSV行をフィールドに分割
pub fn split_line(line: &str) -> Vec<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = Vec::new();
    let mut in_quotes = false;
    let mut field_start = 0;

    for (i, c) in line.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == ',' && !in_quotes {
            fields.push(trim_quotes(&line[field_start..i]));
            field_start = i + c.len_utf8();
        }
    }

    // 最後のフィールド
    fields.push(trim_quotes(&line[field_start..]));

    fields
}

/// 先頭フィールドのみ取得（結果ファイルの再開判定用）
pub fn first_field(line: &str) -> Option<&str> {
    split_line(line).into_iter().next().filter(|f| !f.is_empty())
}

fn trim_quotes(s: &str) -> &str {
    let s = s.trim();
    if s.starts_with('"') && s.ends_with('"') && s.len() >= 2 {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
