//! Filter grammar: parse filter strings into a small tagged-variant AST.
//!
//! ```text
//! filter   := term ( AND term )*
//! term     := field op literal | field inop list
//! field    := 'attribute.' NAME | 'attributes.' NAME | 'tag.' NAME | 'tags.' NAME
//!           | 'param.' NAME | 'params.' NAME | 'metric.' NAME | 'metrics.' NAME
//!           | NAME
//! op       := '=' | '!=' | '<' | '<=' | '>' | '>=' | LIKE | ILIKE
//! inop     := IN | 'NOT IN'
//! literal  := '...' | numeric
//! list     := '(' literal (',' literal)* ')'
//! ```

use track_core::Error;

/// A field reference in a filter or order-by clause: a variant over
/// {attribute, tag, param, metric}.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// A built-in attribute (`run_id`, `name`, `start_time`, ...).
    Attribute(String),
    /// A tag key.
    Tag(String),
    /// A param key.
    Param(String),
    /// A metric key.
    Metric(String),
}

/// A literal value in a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// A string literal.
    Str(String),
    /// A numeric literal.
    Num(f64),
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// SQL `LIKE`, case-sensitive, `%` wildcard.
    Like,
    /// SQL `ILIKE`, case-insensitive, `%` wildcard.
    ILike,
}

/// A single filter term: a tagged variant over {binary comparison,
/// set-membership}.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// `field op literal`
    Compare { field: Field, op: Op, literal: Literal },
    /// `field IN (...)` / `field NOT IN (...)`
    In { field: Field, values: Vec<String>, negated: bool },
}

/// A parsed filter: a conjunction of terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(pub Vec<Term>);

impl Filter {
    /// Parse a filter string. An empty or whitespace-only string parses to
    /// an empty (always-true) filter.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Filter::default());
        }
        let mut terms = Vec::new();
        for chunk in split_on_and(s)? {
            terms.push(parse_term(chunk.trim(), s)?);
        }
        Ok(Filter(terms))
    }
}

/// Split a filter string on top-level `AND` (case-insensitive), respecting
/// quoted/backtick strings and parenthesized lists.
fn split_on_and(s: &str) -> Result<Vec<&str>, Error> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_quote: Option<u8> = None;
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i];
        match in_quote {
            Some(q) if c == q => in_quote = None,
            Some(_) => {}
            None => match c {
                b'\'' | b'`' | b'"' => in_quote = Some(c),
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ if depth == 0 && is_and_at(s, i) => {
                    parts.push(&s[start..i]);
                    i += 3;
                    start = i;
                    continue;
                }
                _ => {}
            },
        }
        i += 1;
    }
    parts.push(&s[start..]);
    Ok(parts)
}

fn is_and_at(s: &str, i: usize) -> bool {
    let bytes = s.as_bytes();
    if i + 3 > bytes.len() {
        return false;
    }
    let word = &s[i..i + 3];
    if !word.eq_ignore_ascii_case("and") {
        return false;
    }
    let before_ok = i == 0 || bytes[i - 1].is_ascii_whitespace();
    let after_ok = i + 3 == bytes.len() || bytes[i + 3].is_ascii_whitespace();
    before_ok && after_ok
}

/// Attribute names backed by a numeric (millisecond-epoch) value rather
/// than a string. `LIKE`/`ILIKE`/`IN`/`NOT IN` and string literals are not
/// meaningful against these and are rejected at parse time.
const NUMERIC_ATTRS: &[&str] = &["start_time", "end_time", "creation_time", "last_update_time"];

fn canonical_attr_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace(' ', "_")
}

fn is_numeric_attr(field: &Field) -> bool {
    matches!(field, Field::Attribute(name) if NUMERIC_ATTRS.contains(&canonical_attr_name(name).as_str()))
}

fn check_numeric_attr_term(term: &Term, full: &str) -> Result<(), Error> {
    let malformed = |reason: String| Error::MalformedFilter { filter: full.to_string(), reason };
    match term {
        Term::Compare { field, op, literal } if is_numeric_attr(field) => {
            if matches!(op, Op::Like | Op::ILike) {
                return Err(malformed(format!(
                    "{:?} does not support LIKE/ILIKE: it is a numeric attribute",
                    field
                )));
            }
            if matches!(literal, Literal::Str(_)) {
                return Err(malformed(format!(
                    "{:?} expects a numeric literal, got a string",
                    field
                )));
            }
            Ok(())
        }
        Term::In { field, .. } if is_numeric_attr(field) => Err(malformed(format!(
            "{:?} does not support IN/NOT IN: it is a numeric attribute",
            field
        ))),
        _ => Ok(()),
    }
}

fn parse_term(term: &str, full: &str) -> Result<Term, Error> {
    let malformed = |reason: &str| Error::MalformedFilter {
        filter: full.to_string(),
        reason: reason.to_string(),
    };

    let upper = term.to_ascii_uppercase();
    let parsed = parse_term_inner(term, &upper, full, &malformed)?;
    check_numeric_attr_term(&parsed, full)?;
    Ok(parsed)
}

fn parse_term_inner(
    term: &str,
    upper: &str,
    full: &str,
    malformed: &dyn Fn(&str) -> Error,
) -> Result<Term, Error> {
    if let Some(pos) = find_keyword(upper, "NOT IN") {
        let (field_str, rest) = term.split_at(pos);
        let rest = &rest[6..];
        let field = parse_field(field_str.trim())?;
        let values = parse_list(rest.trim(), full)?;
        return Ok(Term::In { field, values, negated: true });
    }
    if let Some(pos) = find_keyword(upper, "IN") {
        let (field_str, rest) = term.split_at(pos);
        let rest = &rest[2..];
        let field = parse_field(field_str.trim())?;
        let values = parse_list(rest.trim(), full)?;
        return Ok(Term::In { field, values, negated: false });
    }

    for (kw, op) in [("ILIKE", Op::ILike), ("LIKE", Op::Like)] {
        if let Some(pos) = find_keyword(upper, kw) {
            let (field_str, rest) = term.split_at(pos);
            let rest = rest[kw.len()..].trim();
            let field = parse_field(field_str.trim())?;
            let literal = parse_literal(rest)?;
            return Ok(Term::Compare { field, op, literal });
        }
    }

    for (sym, op) in [
        ("!=", Op::Ne),
        ("<=", Op::Le),
        (">=", Op::Ge),
        ("=", Op::Eq),
        ("<", Op::Lt),
        (">", Op::Gt),
    ] {
        if let Some(pos) = term.find(sym) {
            let field = parse_field(term[..pos].trim())?;
            let literal = parse_literal(term[pos + sym.len()..].trim())?;
            return Ok(Term::Compare { field, op, literal });
        }
    }

    Err(malformed("no recognized operator"))
}

/// Find a whole-word, case-insensitive keyword outside quotes/parens.
fn find_keyword(upper: &str, keyword: &str) -> Option<usize> {
    let bytes = upper.as_bytes();
    let klen = keyword.len();
    let mut i = 0usize;
    let mut depth = 0i32;
    let mut in_quote: Option<u8> = None;
    while i + klen <= bytes.len() {
        let c = bytes[i];
        match in_quote {
            Some(q) if c == q => {
                in_quote = None;
                i += 1;
                continue;
            }
            Some(_) => {
                i += 1;
                continue;
            }
            None => match c {
                b'\'' | b'`' | b'"' => {
                    in_quote = Some(c);
                    i += 1;
                    continue;
                }
                b'(' => {
                    depth += 1;
                    i += 1;
                    continue;
                }
                b')' => {
                    depth -= 1;
                    i += 1;
                    continue;
                }
                _ => {}
            },
        }
        if depth == 0 && &upper[i..i + klen] == keyword {
            let before_ok = i == 0 || bytes[i - 1] == b' ';
            let after_ok = i + klen == bytes.len() || bytes[i + klen] == b' ' || bytes[i + klen] == b'(';
            if before_ok && after_ok {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

pub(crate) fn parse_field(s: &str) -> Result<Field, Error> {
    let malformed = || Error::MalformedFilter { filter: s.to_string(), reason: "empty field".to_string() };
    if s.is_empty() {
        return Err(malformed());
    }
    let (prefix, rest) = match s.split_once('.') {
        Some((p, r)) => (p.to_ascii_lowercase(), r),
        None => ("attribute".to_string(), s),
    };
    let name = unquote_name(rest.trim());
    match prefix.as_str() {
        "attribute" | "attributes" => Ok(Field::Attribute(name)),
        "tag" | "tags" => Ok(Field::Tag(name)),
        "param" | "params" => Ok(Field::Param(name)),
        "metric" | "metrics" => Ok(Field::Metric(name)),
        _ => Ok(Field::Attribute(unquote_name(s.trim()))),
    }
}

fn unquote_name(s: &str) -> String {
    if s.len() >= 2
        && ((s.starts_with('`') && s.ends_with('`')) || (s.starts_with('"') && s.ends_with('"')))
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

fn parse_literal(s: &str) -> Result<Literal, Error> {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        let inner = &s[1..s.len() - 1];
        return Ok(Literal::Str(inner.replace("''", "'")));
    }
    s.parse::<f64>()
        .map(Literal::Num)
        .map_err(|_| Error::MalformedFilter { filter: s.to_string(), reason: "expected a quoted string or number".to_string() })
}

fn parse_list(s: &str, full: &str) -> Result<Vec<String>, Error> {
    let s = s.trim();
    if !(s.starts_with('(') && s.ends_with(')')) {
        return Err(Error::MalformedFilter {
            filter: full.to_string(),
            reason: "expected a parenthesized list".to_string(),
        });
    }
    let inner = &s[1..s.len() - 1];
    let mut values = Vec::new();
    for item in split_top_level_commas(inner) {
        match parse_literal(item.trim())? {
            Literal::Str(v) => values.push(v),
            Literal::Num(n) => values.push(format_num(n)),
        }
    }
    Ok(values)
}

fn format_num(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn split_top_level_commas(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    let bytes = s.as_bytes();
    for (i, &c) in bytes.iter().enumerate() {
        match c {
            b'\'' => in_quote = !in_quote,
            b',' if !in_quote => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}
