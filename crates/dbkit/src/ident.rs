//! Identifier quoting and parameter naming.
//!
//! [`Quoting`] renders schema/table/column names in a dialect's quote style.
//! Quoting is idempotent: already-quoted parts are unwrapped before being
//! re-quoted, so `dbo.Table` and `[dbo].[Table]` render identically.
//!
//! - Dotted names are split into parts on `.` outside of quotes
//! - Unquoted parts are trimmed of surrounding whitespace
//! - A close character inside a name is escaped by doubling it (`]` as `]]`)
//!
//! # Example
//! ```
//! use dbkit::Quoting;
//!
//! let q = Quoting::SQUARE_BRACKET;
//! assert_eq!(q.quote("dbo.Table"), "[dbo].[Table]");
//! assert_eq!(q.quote("[dbo].[Table]"), "[dbo].[Table]");
//! ```

/// A part of a parsed identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
enum IdentPart {
    Bare(String),
    Quoted(String),
}

impl IdentPart {
    fn name(&self) -> &str {
        match self {
            IdentPart::Bare(s) | IdentPart::Quoted(s) => s,
        }
    }
}

/// Identifier quote characters of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quoting {
    open: char,
    close: char,
}

impl Quoting {
    /// `[name]` (SQL Server, SQLite).
    pub const SQUARE_BRACKET: Quoting = Quoting::new('[', ']');
    /// `` `name` `` (MySQL).
    pub const BACKTICK: Quoting = Quoting::new('`', '`');
    /// `"name"` (PostgreSQL, ANSI).
    pub const DOUBLE_QUOTE: Quoting = Quoting::new('"', '"');

    pub const fn new(open: char, close: char) -> Self {
        Self { open, close }
    }

    pub fn open(&self) -> char {
        self.open
    }

    pub fn close(&self) -> char {
        self.close
    }

    /// Quote a possibly dotted, possibly already-quoted identifier.
    pub fn quote(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 4);
        self.write_quoted(name, &mut out);
        out
    }

    pub(crate) fn write_quoted(&self, name: &str, out: &mut String) {
        for (i, part) in self.parse(name).iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push(self.open);
            for ch in part.name().chars() {
                if ch == self.close {
                    out.push(self.close);
                }
                out.push(ch);
            }
            out.push(self.close);
        }
    }

    /// Strip this dialect's quoting, returning the bare (dotted) name.
    pub fn unquote(&self, name: &str) -> String {
        self.parse(name)
            .iter()
            .map(IdentPart::name)
            .collect::<Vec<_>>()
            .join(".")
    }

    fn parse(&self, s: &str) -> Vec<IdentPart> {
        let mut parts = Vec::new();
        let mut chars = s.trim().chars().peekable();

        loop {
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }

            if chars.peek() == Some(&self.open) {
                chars.next();
                let mut name = String::new();
                while let Some(c) = chars.next() {
                    if c == self.close {
                        // Doubled close character is an escaped literal.
                        if chars.peek() == Some(&self.close) {
                            chars.next();
                            name.push(c);
                        } else {
                            break;
                        }
                    } else {
                        name.push(c);
                    }
                }
                parts.push(IdentPart::Quoted(name));
                // Skip anything up to the separator.
                for c in chars.by_ref() {
                    if c == '.' {
                        break;
                    }
                }
                if chars.peek().is_none() {
                    break;
                }
                continue;
            }

            let mut name = String::new();
            let mut saw_dot = false;
            for c in chars.by_ref() {
                if c == '.' {
                    saw_dot = true;
                    break;
                }
                name.push(c);
            }
            parts.push(IdentPart::Bare(name.trim().to_string()));
            if !saw_dot {
                break;
            }
        }

        parts
    }
}

/// Convert a column name into a placeholder-safe parameter name.
///
/// Any quoting is stripped and every character outside `[A-Za-z0-9_]` becomes `_`.
///
/// ```
/// use dbkit::ident::parameter_name;
///
/// assert_eq!(parameter_name("[Order Date]"), "Order_Date");
/// assert_eq!(parameter_name("dbo.Total"), "dbo_Total");
/// ```
pub fn parameter_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '`' | '"'))
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
