//! SQL text scanning.
//!
//! Finds `:named` placeholders outside string literals and comments, and
//! flags interpolation markers (`%s`, `%(name)s`, `{name}`, `?`) anywhere in
//! the text. A query is only ever sent to a driver as text plus bound
//! parameters; nothing here rewrites SQL.

/// Result of scanning one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryScan {
    /// Distinct named placeholders in order of first appearance.
    pub placeholders: Vec<String>,
    /// Interpolation markers found, as written.
    pub markers: Vec<String>,
    /// Upper-cased keywords that open a mutating statement.
    ///
    /// Only the leading word of a statement counts: the first word, the first
    /// word after `;`, a CTE body after `AS (` and the statement that follows
    /// a CTE list. `REPLACE(...)` and a column named `copy` are not writes.
    pub mutating_keywords: Vec<String>,
}

impl QueryScan {
    /// Whether the statement writes or changes schema.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !self.mutating_keywords.is_empty()
    }
}

const MUTATING_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "MERGE", "UPSERT", "REPLACE", "DROP", "ALTER", "CREATE",
    "TRUNCATE", "GRANT", "REVOKE", "COPY",
];

/// Where the scanner is relative to statement boundaries.
#[derive(Default)]
struct Statement {
    /// The next word opens a statement.
    expecting: bool,
    /// Inside a `WITH` list whose main statement has not started.
    cte: bool,
    depth: usize,
    last_word: String,
}

impl Statement {
    fn start() -> Self {
        Self {
            expecting: true,
            ..Self::default()
        }
    }

    fn end(&mut self) {
        *self = Self::start();
    }

    fn open_paren(&mut self) {
        self.depth += 1;
        if self.cte && matches!(self.last_word.as_str(), "AS" | "MATERIALIZED") {
            self.expecting = true;
        }
    }

    fn close_paren(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.cte && self.depth == 0 {
            self.expecting = true;
        }
    }

    /// Consume a word; returns it when it opens a mutating statement.
    fn word(&mut self, upper: String, before_paren: bool) -> Option<String> {
        let leading = std::mem::take(&mut self.expecting);
        let mut opened = None;
        if leading {
            if upper == "WITH" {
                self.cte = true;
            } else if is_statement_keyword(&upper) && self.depth == 0 {
                self.cte = false;
            }
            if MUTATING_KEYWORDS.contains(&upper.as_str()) && !before_paren {
                opened = Some(upper.clone());
            }
        }
        self.last_word = upper;
        opened
    }
}

fn is_statement_keyword(word: &str) -> bool {
    matches!(word, "SELECT" | "VALUES" | "TABLE") || MUTATING_KEYWORDS.contains(&word)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment,
}

/// Scan `query` for placeholders, interpolation markers and mutating keywords.
#[must_use]
pub fn scan_query(query: &str) -> QueryScan {
    let chars: Vec<char> = query.chars().collect();
    let mut scan = QueryScan::default();
    let mut state = State::Code;
    let mut statement = Statement::start();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        // Interpolation markers are flagged in every state: an f-string
        // inside quotes is still an injection.
        if let Some((marker, len)) = interpolation_marker(&chars, i) {
            scan.markers.push(marker);
            i += len;
            continue;
        }

        match state {
            State::Code => match c {
                '\'' => state = State::SingleQuoted,
                '"' => state = State::DoubleQuoted,
                '-' if next == Some('-') => {
                    state = State::LineComment;
                    i += 1;
                }
                '/' if next == Some('*') => {
                    state = State::BlockComment;
                    i += 1;
                }
                ':' if next == Some(':') => i += 1,
                ':' if next.is_some_and(is_ident_start) => {
                    let name = read_ident(&chars, i + 1);
                    i += name.chars().count();
                    if !scan.placeholders.contains(&name) {
                        scan.placeholders.push(name);
                    }
                }
                '?' => scan.markers.push("?".to_string()),
                ';' => statement.end(),
                '(' => statement.open_paren(),
                ')' => statement.close_paren(),
                c if is_ident_start(c) => {
                    let word = read_ident(&chars, i);
                    let len = word.chars().count();
                    let before_paren = chars[i + len..]
                        .iter()
                        .find(|c| !c.is_whitespace())
                        .is_some_and(|&c| c == '(');
                    i += len - 1;
                    if let Some(keyword) = statement.word(word.to_ascii_uppercase(), before_paren) {
                        if !scan.mutating_keywords.contains(&keyword) {
                            scan.mutating_keywords.push(keyword);
                        }
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if c == '\'' {
                    if next == Some('\'') {
                        i += 1;
                    } else {
                        state = State::Code;
                    }
                }
            }
            State::DoubleQuoted => {
                if c == '"' {
                    state = State::Code;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if c == '*' && next == Some('/') {
                    state = State::Code;
                    i += 1;
                }
            }
        }

        i += 1;
    }

    scan
}

/// Marker text and its length in chars, if one starts at `i`.
fn interpolation_marker(chars: &[char], i: usize) -> Option<(String, usize)> {
    match chars[i] {
        '%' => match chars.get(i + 1) {
            Some('(') => {
                let close = chars[i..].iter().position(|&c| c == ')')?;
                // %(name)s
                let end = (i + close + 2).min(chars.len());
                Some((chars[i..end].iter().collect(), end - i))
            }
            Some(&conv @ ('s' | 'd')) => {
                let boundary = chars.get(i + 2).is_none_or(|c| !c.is_alphanumeric());
                boundary.then(|| (format!("%{conv}"), 2))
            }
            _ => None,
        },
        '{' => {
            let close = chars[i..].iter().position(|&c| c == '}');
            let end = close.map_or(i + 1, |p| i + p + 1);
            Some((chars[i..end].iter().collect(), end - i))
        }
        _ => None,
    }
}

const fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn read_ident(chars: &[char], start: usize) -> String {
    chars[start..]
        .iter()
        .take_while(|c| c.is_ascii_alphanumeric() || **c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_named_placeholders() {
        let scan = scan_query("SELECT * FROM orders WHERE id = :id AND owner = :owner OR id = :id");
        assert_eq!(scan.placeholders, vec!["id", "owner"]);
        assert!(scan.markers.is_empty());
        assert!(!scan.is_mutating());
    }

    #[test]
    fn test_casts_and_literals_are_not_placeholders() {
        let scan = scan_query(
            "SELECT created_at::date, ':not_a_param', \"col:x\" FROM t -- :comment\nWHERE a = :a /* :b */",
        );
        assert_eq!(scan.placeholders, vec!["a"]);
    }

    #[test]
    fn test_percent_interpolation() {
        let scan = scan_query("DELETE FROM orders WHERE id = %s");
        assert_eq!(scan.markers, vec!["%s"]);
        assert_eq!(scan.mutating_keywords, vec!["DELETE"]);

        let scan = scan_query("SELECT * FROM t WHERE id = %(order_id)s");
        assert_eq!(scan.markers, vec!["%(order_id)s"]);
    }

    #[test]
    fn test_like_patterns_are_allowed() {
        let scan = scan_query("SELECT * FROM pets WHERE name LIKE '%dog%' AND code LIKE :code");
        assert!(scan.markers.is_empty());
        assert_eq!(scan.placeholders, vec!["code"]);
    }

    #[test]
    fn test_fstring_braces() {
        let scan = scan_query("SELECT * FROM users WHERE name = '{name}'");
        assert_eq!(scan.markers, vec!["{name}"]);

        let scan = scan_query("SELECT * FROM users WHERE id = {}");
        assert_eq!(scan.markers, vec!["{}"]);

        let scan = scan_query("SELECT * FROM users WHERE id = {");
        assert_eq!(scan.markers, vec!["{"]);
    }

    #[test]
    fn test_positional_marker() {
        let scan = scan_query("SELECT * FROM users WHERE id = ?");
        assert_eq!(scan.markers, vec!["?"]);
    }

    #[test]
    fn test_mutating_detection() {
        assert!(scan_query("update orders set paid = true where id = :id").is_mutating());
        assert!(scan_query("SELECT 1; DROP TABLE orders").is_mutating());
        assert!(!scan_query("SELECT 'DELETE' AS label FROM t").is_mutating());
        assert!(!scan_query("SELECT updated_at FROM t").is_mutating());
        assert!(scan_query("-- purge\nTRUNCATE orders").is_mutating());
    }

    #[test]
    fn test_keywords_inside_a_statement_are_not_writes() {
        let scan = scan_query("SELECT REPLACE(name, 'a', 'b') AS clean FROM customers WHERE id = :id");
        assert!(scan.mutating_keywords.is_empty());

        let scan = scan_query("SELECT title, copy FROM ads WHERE id = :id");
        assert!(scan.mutating_keywords.is_empty());

        assert!(!scan_query("SELECT * FROM t FOR UPDATE").is_mutating());
        assert!(!scan_query("SELECT create, drop FROM audit").is_mutating());
    }

    #[test]
    fn test_common_table_expressions() {
        let scan = scan_query("WITH gone AS (DELETE FROM orders RETURNING id) SELECT * FROM gone");
        assert_eq!(scan.mutating_keywords, vec!["DELETE"]);

        let scan = scan_query("WITH a AS (SELECT 1), b AS (SELECT 2) UPDATE t SET x = 1");
        assert_eq!(scan.mutating_keywords, vec!["UPDATE"]);

        let scan = scan_query("WITH a AS (SELECT 1) SELECT count(x), copy FROM a");
        assert!(scan.mutating_keywords.is_empty());
    }
}
