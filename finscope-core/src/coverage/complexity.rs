//! Heuristic cyclomatic complexity estimation
//!
//! This is a static proxy, not a control-flow-graph computation. Comments and
//! string literal contents are blanked out first, then every decision point
//! adds one to a base of one:
//!
//! | Construct | Counted as |
//! |-----------|------------|
//! | `if`, `else` | keyword |
//! | `case` | keyword (each switch branch) |
//! | `for`, `while` | keyword (covers `do ... while`) |
//! | `catch` | keyword |
//! | `&&`, `\|\|`, `??` | short-circuit operator |
//! | `? :` | ternary `?` (not `?.`, `??` or an optional `?:` annotation) |
//!
//! An apostrophe between two letters (`Here's`, `don't`) is JSX text, not the
//! start of a string literal. Only an unterminated block comment or template
//! literal makes a source malformed; stray braces are counted around.
//!
//! The score is deterministic and never decreases when decision points are
//! added to otherwise well-formed source.

use thiserror::Error;

/// Score for source with no decision points.
pub const BASE_COMPLEXITY: u32 = 1;

const DECISION_KEYWORDS: &[&str] = &["if", "else", "case", "for", "while", "catch"];

/// Source text the scanner could not make sense of.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed source at line {line}: {reason}")]
pub struct MalformedSource {
    pub line: usize,
    pub reason: String,
}

/// Complexity scoring for a single source file.
///
/// Swap in a parser-backed implementation with
/// [`CoverageAnalyzer::with_estimator`](super::CoverageAnalyzer::with_estimator).
pub trait ComplexityEstimator: Send + Sync {
    fn name(&self) -> &str;

    /// Score `source`; always at least [`BASE_COMPLEXITY`] on success.
    fn estimate(&self, source: &str) -> Result<u32, MalformedSource>;
}

/// Keyword and operator counting estimator for JS/TS/JSX sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicComplexity;

impl HeuristicComplexity {
    pub fn new() -> Self {
        Self
    }
}

impl ComplexityEstimator for HeuristicComplexity {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn estimate(&self, source: &str) -> Result<u32, MalformedSource> {
        let code = strip_comments_and_strings(source)?;
        Ok(BASE_COMPLEXITY + count_decision_points(&code))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    LineComment,
    BlockComment,
    Quoted(char),
    Template,
}

/// Replace comment bodies and string literal contents with spaces.
///
/// Newlines and string delimiters are kept so line structure survives.
/// Single- and double-quoted strings end at a newline; block comments and
/// template literals must be closed before end of input. A `'` with a letter
/// or digit before it and a letter after it is an apostrophe in text.
pub fn strip_comments_and_strings(source: &str) -> Result<String, MalformedSource> {
    let mut out = String::with_capacity(source.len());
    let mut state = ScanState::Code;
    let mut line = 1;
    let mut opened_at = 1;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            line += 1;
        }

        match state {
            ScanState::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    out.push_str("  ");
                    state = ScanState::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    opened_at = line;
                    state = ScanState::BlockComment;
                }
                '\'' if is_apostrophe(&out, chars.peek()) => out.push(' '),
                '"' | '\'' => {
                    out.push(c);
                    state = ScanState::Quoted(c);
                }
                '`' => {
                    out.push(c);
                    opened_at = line;
                    state = ScanState::Template;
                }
                _ => out.push(c),
            },
            ScanState::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    state = ScanState::Code;
                } else {
                    out.push(' ');
                }
            }
            ScanState::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = ScanState::Code;
                } else {
                    out.push(if c == '\n' { '\n' } else { ' ' });
                }
            }
            ScanState::Quoted(quote) => match c {
                '\\' => {
                    out.push(' ');
                    if let Some(escaped) = chars.next() {
                        if escaped == '\n' {
                            line += 1;
                            out.push('\n');
                        } else {
                            out.push(' ');
                        }
                    }
                }
                '\n' => {
                    out.push('\n');
                    state = ScanState::Code;
                }
                _ if c == quote => {
                    out.push(c);
                    state = ScanState::Code;
                }
                _ => out.push(' '),
            },
            ScanState::Template => match c {
                '\\' => {
                    out.push(' ');
                    if let Some(escaped) = chars.next() {
                        if escaped == '\n' {
                            line += 1;
                            out.push('\n');
                        } else {
                            out.push(' ');
                        }
                    }
                }
                '`' => {
                    out.push(c);
                    state = ScanState::Code;
                }
                '\n' => out.push('\n'),
                _ => out.push(' '),
            },
        }
    }

    match state {
        ScanState::BlockComment => Err(MalformedSource {
            line: opened_at,
            reason: "unterminated block comment".to_string(),
        }),
        ScanState::Template => Err(MalformedSource {
            line: opened_at,
            reason: "unterminated template literal".to_string(),
        }),
        _ => Ok(out),
    }
}

/// `'` inside a word, as in JSX text like `Let's` or `don't`.
///
/// A string literal never directly follows an identifier character.
fn is_apostrophe(before: &str, after: Option<&char>) -> bool {
    before.chars().next_back().is_some_and(char::is_alphanumeric)
        && after.is_some_and(|c| c.is_alphabetic())
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Count decision keywords and operators in stripped code.
fn count_decision_points(code: &str) -> u32 {
    let chars: Vec<char> = code.chars().collect();
    let mut count = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if is_ident_char(c) {
            let start = i;
            while i < chars.len() && is_ident_char(chars[i]) {
                i += 1;
            }
            // Skip member accesses like `result.case`
            let is_member = start > 0 && chars[start - 1] == '.';
            let word: String = chars[start..i].iter().collect();
            if !is_member && DECISION_KEYWORDS.contains(&word.as_str()) {
                count += 1;
            }
            continue;
        }

        let next = chars.get(i + 1).copied();
        match (c, next) {
            ('&', Some('&')) | ('|', Some('|')) | ('?', Some('?')) => {
                count += 1;
                i += 2;
                continue;
            }
            ('?', Some('.')) | ('?', Some(':')) => {
                i += 2;
                continue;
            }
            ('?', _) => count += 1,
            _ => {}
        }
        i += 1;
    }

    count
}

/// Count non-blank lines that contain code.
///
/// Falls back to counting every non-blank line when the source is malformed.
pub fn lines_of_code(source: &str) -> usize {
    match strip_comments_and_strings(source) {
        Ok(code) => code.lines().filter(|l| !l.trim().is_empty()).count(),
        Err(_) => source.lines().filter(|l| !l.trim().is_empty()).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(source: &str) -> u32 {
        HeuristicComplexity::new().estimate(source).unwrap()
    }

    #[test]
    fn test_straight_line_code_is_base() {
        assert_eq!(score("const rate = principal * 0.05;\n"), BASE_COMPLEXITY);
        assert_eq!(score(""), BASE_COMPLEXITY);
    }

    #[test]
    fn test_if_else_and_switch() {
        let source = r#"
function classify(kind, amount) {
  if (amount > 1000) {
    warn();
  } else {
    ok();
  }
  switch (kind) {
    case "loan":
      return 1;
    case "savings":
      return 2;
    case "stock":
      return 3;
  }
}
"#;
        // 1 + if + else + 3 cases
        let complexity = score(source);
        assert!(complexity > 1);
        assert!(complexity >= 1 + 5, "got {complexity}");
        assert_eq!(complexity, 6);
    }

    #[test]
    fn test_operators_and_loops() {
        let source = r#"
const label = rate > 0.1 ? "high" : "low";
const ready = a && b || c;
const name = user?.name ?? "guest";
for (let i = 0; i < n; i++) { total += i; }
while (left > 0) { left--; }
try { run(); } catch (e) { log(e); }
"#;
        // ternary, &&, ||, ??, for, while, catch
        assert_eq!(score(source), 1 + 7);
    }

    #[test]
    fn test_optional_annotations_are_not_ternaries() {
        let source = "interface Props { rate?: number; label?: string }\nfunction f(a?: number) {}\n";
        assert_eq!(score(source), BASE_COMPLEXITY);
    }

    #[test]
    fn test_comments_and_strings_are_ignored() {
        let source = r#"
// if this were code it would count
/* else while for */
const msg = "if (x) { case }";
const tpl = `for ${x} && y`;
"#;
        assert_eq!(score(source), BASE_COMPLEXITY);
    }

    #[test]
    fn test_identifiers_containing_keywords_do_not_count() {
        let source = "const iffy = verified; const format = elsewhere.case; notify();\n";
        assert_eq!(score(source), BASE_COMPLEXITY);
    }

    #[test]
    fn test_more_branches_never_score_lower() {
        let mut source = String::from("function f(x) {\n");
        let mut last = score(&format!("{source}}}\n"));
        for i in 0..10 {
            source.push_str(&format!("  if (x > {i}) {{ x -= 1; }}\n"));
            let current = score(&format!("{source}}}\n"));
            assert!(current > last);
            last = current;
        }
    }

    #[test]
    fn test_deterministic() {
        let source = "if (a) { b ? c : d }";
        assert_eq!(score(source), score(source));
    }

    #[test]
    fn test_malformed_sources() {
        let estimator = HeuristicComplexity::new();
        let err = estimator.estimate("if (a) { /* never closed").unwrap_err();
        assert_eq!(err.reason, "unterminated block comment");
        assert_eq!(err.line, 1);
        let err = estimator.estimate("const a = 1;\nconst t = `open").unwrap_err();
        assert_eq!(err.reason, "unterminated template literal");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unbalanced_braces_still_counted() {
        assert_eq!(score("if (a) { b(); "), 2);
        assert_eq!(score("} if (a) {"), 2);
    }

    #[test]
    fn test_jsx_apostrophes_are_text() {
        let source = r#"
export function Plan({ items, ready }) {
  return (
    <section>
      <h2>Let's budget</h2>
      <p>Here's the plan: {items.map((i) => {
        if (i.done) { return 1; }
        return i.ok ? 2 : 3;
      })}</p>
      {ready && <p>You don't need to wait.</p>}
    </section>
  );
}
"#;
        // if, ternary, &&
        assert_eq!(score(source), 1 + 3);
    }

    #[test]
    fn test_trailing_apostrophe_degrades_line_only() {
        let source = "<p>Students' savings {a ? b : c}</p>\nif (x) { y(); }\n";
        // the possessive opens a quote that ends at the newline
        assert_eq!(score(source), 2);
    }

    #[test]
    fn test_quotes_after_operators_are_strings() {
        assert_eq!(score("const s = 'if' + x;\nf('a && b');\n"), BASE_COMPLEXITY);
    }

    #[test]
    fn test_lines_of_code_skips_comments_and_blanks() {
        let source = "// header\n\nconst a = 1;\n/* block\n   comment */\nconst b = 2; // trailing\n";
        assert_eq!(lines_of_code(source), 2);
    }
}
