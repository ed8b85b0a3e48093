//! Validation of free-form SQL.
//!
//! The checks run in order: single statement, SELECT/WITH prefix, forbidden
//! keyword scan, FROM/JOIN target scan. All scanning happens on a copy of
//! the input with quoted literals blanked out, so string contents can never
//! produce a false match; the blanking preserves byte offsets.

use crate::allowed::AllowedDatabases;
use crate::error::PolicyError;

/// Write/DDL keywords that must not appear in an admitted query.
const FORBIDDEN: &[&str] = &[
    " insert ",
    " alter ",
    " update ",
    " delete ",
    " attach ",
    " detach ",
    " drop ",
    " create ",
    " truncate ",
    " kill ",
    " optimize ",
    " grant ",
    " revoke ",
    " set ",
    " use ",
];

/// Replace the contents of `'…'` and `"…"` literals (including the quote
/// characters) with spaces, one space per byte, preserving the byte length
/// of the input. Unterminated literals blank to the end of the string.
pub fn strip_quoted_literals(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_single = false;
    let mut in_double = false;
    for ch in s.chars() {
        if in_single {
            if ch == '\'' {
                in_single = false;
            }
            blank(&mut out, ch);
            continue;
        }
        if in_double {
            if ch == '"' {
                in_double = false;
            }
            blank(&mut out, ch);
            continue;
        }
        match ch {
            '\'' => {
                in_single = true;
                out.push(' ');
            }
            '"' => {
                in_double = true;
                out.push(' ');
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Push one space per byte of `ch`, so multibyte characters inside literals
/// do not shift later offsets.
fn blank(out: &mut String, ch: char) {
    for _ in 0..ch.len_utf8() {
        out.push(' ');
    }
}

/// Validate a free-form SQL statement against the read-only, allowed-schema
/// policy.
pub fn validate_freeform_sql(sql: &str, allowed: &AllowedDatabases) -> Result<(), PolicyError> {
    let s = sql.trim();
    if s.is_empty() {
        return Err(PolicyError::EmptySql);
    }
    // Single-statement guarantee; checked on the original text so a
    // semicolon cannot hide anywhere, quoted or not.
    if s.contains(';') {
        return Err(PolicyError::MultipleStatements);
    }

    let sanitized = strip_quoted_literals(s);
    let lower = sanitized.trim().to_lowercase();
    if !(lower.starts_with("select ") || lower.starts_with("with ")) {
        return Err(PolicyError::NotSelect);
    }

    let padded = format!(" {lower} ");
    for kw in FORBIDDEN {
        if padded.contains(kw) {
            return Err(PolicyError::ForbiddenKeyword(kw.trim().to_string()));
        }
    }

    let ctes = collect_cte_names(&sanitized);
    scan_table_targets(&sanitized, allowed, &ctes)
}

/// Collect CTE names: every identifier immediately preceding a
/// whitespace-bounded `AS` that is followed by `(`. Common-table names are
/// legitimate FROM targets and carry no database prefix.
fn collect_cte_names(sanitized: &str) -> Vec<String> {
    let bytes = sanitized.as_bytes();
    let mut names = Vec::new();
    let mut idx = 0;
    while let Some(pos) = find_token(bytes, "as", idx) {
        idx = pos + 2;
        let mut after = pos + 2;
        while after < bytes.len() && bytes[after] == b' ' {
            after += 1;
        }
        if after >= bytes.len() || bytes[after] != b'(' {
            continue;
        }
        // Walk backwards over spaces, then over the identifier.
        let mut end = pos;
        while end > 0 && bytes[end - 1] == b' ' {
            end -= 1;
        }
        let mut start = end;
        while start > 0 && is_ident_byte(bytes[start - 1]) {
            start -= 1;
        }
        if start < end {
            names.push(
                String::from_utf8_lossy(&bytes[start..end])
                    .to_ascii_lowercase()
                    .to_string(),
            );
        }
    }
    names
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Scan the sanitized text for whitespace-bounded `FROM`/`JOIN` tokens and
/// check each following table reference against the allowed set.
///
/// A token whose target opens with `(` introduces a subquery; the subquery
/// body is part of the same text, so its own FROM/JOIN occurrences are
/// visited by this same scan and nothing further happens at the outer token.
fn scan_table_targets(
    sanitized: &str,
    allowed: &AllowedDatabases,
    ctes: &[String],
) -> Result<(), PolicyError> {
    let bytes = sanitized.as_bytes();
    for token in ["from", "join"] {
        let mut idx = 0;
        while let Some(pos) = find_token(bytes, token, idx) {
            let mut start = pos + token.len();
            while start < bytes.len() && bytes[start] == b' ' {
                start += 1;
            }
            if start < bytes.len() && bytes[start] == b'(' {
                // Subquery: inner targets are validated by this same scan.
                idx = start + 1;
                continue;
            }

            let mut end = start;
            while end < bytes.len() && !matches!(bytes[end], b' ' | b'\n' | b'\t' | b',' | b')') {
                end += 1;
            }

            let initial = String::from_utf8_lossy(&bytes[start..end]).trim().to_string();
            if initial.to_ascii_lowercase().starts_with("clusterallreplicas(") {
                // Extend the capture to the balanced closing parenthesis so
                // the second argument is visible, then check it.
                let full_end = balanced_end(bytes, start).unwrap_or(end);
                let full = String::from_utf8_lossy(&bytes[start..full_end]).to_string();
                check_cluster_reference(&full, allowed)?;
                idx = full_end.max(pos + token.len());
                continue;
            }

            idx = end.max(pos + token.len());
            if initial.is_empty() {
                return Err(PolicyError::TargetNotAllowed(initial));
            }
            if ctes.iter().any(|c| c.eq_ignore_ascii_case(&initial)) {
                continue;
            }
            if !allowed.is_table_allowed(&initial) {
                return Err(PolicyError::TargetNotAllowed(initial));
            }
        }
    }
    Ok(())
}

/// Find the next whitespace-bounded, case-insensitive occurrence of `token`
/// at or after `from_idx`. A trailing `(` also counts as a boundary so that
/// `FROM(` is recognized (and handled as a subquery by the caller).
fn find_token(bytes: &[u8], token: &str, from_idx: usize) -> Option<usize> {
    let tok = token.as_bytes();
    let mut i = from_idx;
    while i + tok.len() <= bytes.len() {
        if bytes[i..i + tok.len()].eq_ignore_ascii_case(tok) {
            let before_ok = i == 0 || bytes[i - 1].is_ascii_whitespace();
            let after_ok = match bytes.get(i + tok.len()) {
                None => true,
                Some(&b) => b.is_ascii_whitespace() || b == b'(',
            };
            if before_ok && after_ok {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Index one past the parenthesis that balances the first `(` at or after
/// `start`. Returns `None` when the text ends before the parens balance.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut seen_open = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        match b {
            b'(' => {
                depth += 1;
                seen_open = true;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                if seen_open && depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Check a `clusterAllReplicas(cluster, table)` capture: the second
/// comma-separated argument inside the outermost parentheses must reference
/// an allowed database. A call without a second argument has nothing to
/// check.
fn check_cluster_reference(capture: &str, allowed: &AllowedDatabases) -> Result<(), PolicyError> {
    let open = capture.find('(');
    let close = capture.rfind(')');
    if let (Some(open), Some(close)) = (open, close) {
        if close > open {
            let inner = &capture[open + 1..close];
            if let Some((_, table)) = inner.split_once(',') {
                if !allowed.is_table_allowed(table.trim()) {
                    return Err(PolicyError::ClusterTargetNotAllowed);
                }
            }
        }
    }
    Ok(())
}
