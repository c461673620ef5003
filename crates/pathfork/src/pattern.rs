//! Route template compiler.
//!
//! Turns a template such as `/users/:id{\d+}/files/*` into the tokens the
//! trie inserts: static spans, parametric spans (one node per span, possibly
//! holding several chained parameters) and a trailing wildcard.

use fancy_regex::Regex;

use crate::dispatch::ParamIndex;
use crate::error::RouteError;

/// One trie-insertable piece of a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text, with `::` escapes already resolved.
    Static(String),
    /// A parametric span.
    Param(ParamToken),
    /// `*`, consuming the rest of the path.
    Wildcard,
}

/// A parametric span of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamToken {
    /// Anchored regex source, `None` for a plain `:name` segment.
    pub regex: Option<String>,
    /// Literal text following the last parameter inside the segment.
    pub static_suffix: Option<String>,
    /// The template text this span was parsed from, e.g. `:hour-:minute`.
    pub source: String,
}

/// A template reduced to tokens plus its ordered parameter names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRoute {
    pub tokens: Vec<Token>,
    pub params: Vec<String>,
}

impl CompiledRoute {
    /// The request path this route answers when it holds no parameters.
    pub fn literal_path(&self) -> Option<String> {
        let mut path = String::from("/");
        for token in &self.tokens {
            match token {
                Token::Static(text) => path.push_str(text),
                Token::Param(_) | Token::Wildcard => return None,
            }
        }
        Some(path)
    }
}

/// Result of compiling a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compiled {
    /// A template ready for insertion.
    Route(CompiledRoute),
    /// A template ending in `/:name?`, to be registered once per variant.
    Optional { present: String, absent: String },
}

/// Compile a route template.
pub fn compile(pattern: &str) -> Result<Compiled, RouteError> {
    match pattern.chars().next() {
        None => return Err(RouteError::Empty),
        Some('/' | '*') => {}
        Some(_) => return Err(RouteError::InvalidStart(pattern.to_string())),
    }

    if let Some((present, absent)) = split_optional(pattern)? {
        return Ok(Compiled::Optional { present, absent });
    }

    tokenize(pattern).map(Compiled::Route)
}

/// Convert a template into one anchored regex over the whole path, plus the
/// name-to-group map of its parameters.
///
/// Group `n + 1` of a match holds parameter `n`. Plain parameters match one
/// segment, `{...}` constraints are used as written (minus anchors), `*`
/// captures the rest of the path, and a trailing `/` is always allowed. A
/// `?` marker is accepted on the last segment but the parameter still has
/// to be present.
pub fn to_regex(pattern: &str) -> Result<(Regex, ParamIndex), RouteError> {
    if pattern.is_empty() {
        return Err(RouteError::Empty);
    }

    let segments: Vec<&str> = pattern.split('/').collect();
    let last = segments.len() - 1;
    let mut names = Vec::new();
    let mut parts = Vec::new();

    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if *segment == "*" {
            if i != last {
                return Err(RouteError::WildcardNotLast(pattern.to_string()));
            }
            names.push("*".to_string());
            parts.push("(.*)".to_string());
        } else if segment.contains(':') {
            parts.push(segment_regex(pattern, segment, i == last, &mut names)?);
        } else {
            parts.push(escape_literal(segment));
        }
    }

    let source = format!("^/{}/?$", parts.join("/"));
    let regex = Regex::new(&source).map_err(|e| RouteError::InvalidConstraint {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    Ok((regex, ParamIndex::from_names(names)))
}

/// Regex for one `/`-delimited segment holding parameters.
fn segment_regex(
    pattern: &str,
    segment: &str,
    is_last: bool,
    names: &mut Vec<String>,
) -> Result<String, RouteError> {
    if let Some(open) = segment.find('{') {
        closing_brace(segment, open)
            .ok_or_else(|| RouteError::UnbalancedConstraint(pattern.to_string()))?;
    }

    let bytes = segment.as_bytes();
    let mut out = String::new();
    let mut i = 0;

    while let Some(ch) = segment[i..].chars().next() {
        let name_len = segment[i + ch.len_utf8()..]
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
            .count();

        if ch != ':' || name_len == 0 {
            out.push_str(&escape_literal(&segment[i..i + ch.len_utf8()]));
            i += ch.len_utf8();
            continue;
        }

        let name_start = i + 1;
        i = name_start + name_len;
        names.push(segment[name_start..i].to_string());

        if bytes.get(i) == Some(&b'?') {
            if !is_last {
                return Err(RouteError::OptionalNotLast(pattern.to_string()));
            }
            i += 1;
        }

        match bytes.get(i) {
            Some(b'{') => {
                let close = closing_brace(segment, i)
                    .ok_or_else(|| RouteError::UnbalancedConstraint(pattern.to_string()))?;
                out.push('(');
                out.push_str(trim_anchors(&segment[i + 1..close]));
                out.push(')');
                i = close + 1;
            }
            _ => out.push_str("([^/]+)"),
        }
    }

    Ok(out)
}

/// Detect a trailing `/:name?` and produce the two templates it stands for.
fn split_optional(pattern: &str) -> Result<Option<(String, String)>, RouteError> {
    let bytes = pattern.as_bytes();
    let mut search = 0;

    while let Some(offset) = pattern[search..].find("/:") {
        let start = search + offset;
        let name_start = start + 2;
        let name_end = pattern[name_start..]
            .find(|c: char| matches!(c, '/' | '?' | '{' | '}' | '(' | ')'))
            .map_or(pattern.len(), |o| name_start + o);

        // A constrained parameter may be optional too: `/:id{\d+}?`.
        let param_end = match bytes.get(name_end) {
            Some(b'{') => closing_brace(pattern, name_end).map_or(name_end, |close| close + 1),
            _ => name_end,
        };

        if bytes.get(param_end) == Some(&b'?') {
            let trailing = &pattern[param_end + 1..];
            if !trailing.is_empty() && trailing != "/" {
                return Err(RouteError::OptionalNotLast(pattern.to_string()));
            }

            let present = format!("{}{}", &pattern[..param_end], trailing);
            let mut absent = format!("{}{}", &pattern[..start], trailing);
            if absent.is_empty() {
                absent.push('/');
            }
            return Ok(Some((present, absent)));
        }

        search = name_start;
    }

    Ok(None)
}

fn tokenize(pattern: &str) -> Result<CompiledRoute, RouteError> {
    // The root node owns the leading '/'.
    let body = pattern.strip_prefix('/').unwrap_or(pattern);
    let bytes = body.as_bytes();

    let mut tokens = Vec::new();
    let mut params = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while let Some(ch) = body[i..].chars().next() {
        match ch {
            ':' if bytes.get(i + 1) == Some(&b':') => {
                literal.push(':');
                i += 2;
            }
            ':' => {
                flush_literal(&mut literal, &mut tokens);
                let (token, end) = parse_param(pattern, body, i, &mut params)?;
                tokens.push(Token::Param(token));
                i = end;
            }
            '*' => {
                if i + 1 != body.len() {
                    return Err(RouteError::WildcardNotLast(pattern.to_string()));
                }
                flush_literal(&mut literal, &mut tokens);
                params.push("*".to_string());
                tokens.push(Token::Wildcard);
                i += 1;
            }
            _ => {
                literal.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    flush_literal(&mut literal, &mut tokens);

    Ok(CompiledRoute { tokens, params })
}

fn flush_literal(literal: &mut String, tokens: &mut Vec<Token>) {
    if !literal.is_empty() {
        tokens.push(Token::Static(std::mem::take(literal)));
    }
}

/// Parse the parametric span starting at the `:` at `start`.
///
/// Returns the token and the index just past the span (a `/`, a `*` or the
/// end of `body`).
fn parse_param(
    pattern: &str,
    body: &str,
    start: usize,
    params: &mut Vec<String>,
) -> Result<(ParamToken, usize), RouteError> {
    let bytes = body.as_bytes();
    let mut captures = String::new();
    let mut is_regex = false;
    let mut safe = true;
    let mut delimiter = String::new();
    let mut j = start + 1;

    loop {
        let name_start = j;
        while j < bytes.len() && !matches!(bytes[j], b'{' | b'-' | b'.' | b'/' | b'*' | b':') {
            j += 1;
        }
        params.push(body[name_start..j].to_string());

        if bytes.get(j) == Some(&b'{') {
            let close = closing_brace(body, j)
                .ok_or_else(|| RouteError::UnbalancedConstraint(pattern.to_string()))?;
            captures.push('(');
            captures.push_str(trim_anchors(&body[j + 1..close]));
            captures.push(')');
            j = close + 1;
            is_regex = true;
            safe = true;
        } else if safe || delimiter.is_empty() {
            captures.push_str("(.*?)");
            safe = false;
        } else {
            // Keep the delimiter available for the parameter that follows.
            captures.push_str(&format!("({delimiter}|(?:(?!{delimiter}).)*)"));
        }

        let mut literal = String::new();
        while let Some(ch) = body[j..].chars().next() {
            match ch {
                '/' | '*' => break,
                ':' if bytes.get(j + 1) == Some(&b':') => {
                    literal.push(':');
                    j += 2;
                }
                ':' => break,
                _ => {
                    literal.push(ch);
                    j += ch.len_utf8();
                }
            }
        }
        delimiter = escape_literal(&literal);
        captures.push_str(&delimiter);
        is_regex |= !literal.is_empty();

        if bytes.get(j) == Some(&b':') {
            is_regex = true;
            j += 1;
            continue;
        }

        let token = ParamToken {
            regex: is_regex.then(|| format!("^{captures}$")),
            static_suffix: (!literal.is_empty()).then_some(literal),
            source: body[start..j].to_string(),
        };
        return Ok((token, j));
    }
}

/// Index of the `}` closing the `{` at `open`, honouring backslash escapes.
fn closing_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 1usize;
    let mut i = open + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Strip caller-supplied `^` / `$` anchors; the node regex is anchored as a
/// whole.
fn trim_anchors(constraint: &str) -> &str {
    let constraint = constraint.strip_prefix('^').unwrap_or(constraint);
    match constraint.strip_suffix('$') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => constraint,
    }
}

fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(
            ch,
            '.' | '*' | '+' | '?' | '^' | '$' | '{' | '}' | '(' | ')' | '|' | '[' | ']' | '\\'
        ) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
