use std::fmt;

use thiserror::Error;

/// A segment in a dotted path addressing a subtree of a JSON document.
///
/// Paths use dotted notation with bracketed numeric indices:
///
/// - `a.b.c` → `[Key("a"), Key("b"), Key("c")]`
/// - `a.b[2].c` → `[Key("a"), Key("b"), Index(2), Key("c")]`
/// - `[0].name` → `[Index(0), Key("name")]`
/// - `users.*.id` → `[Key("users"), Wildcard, Key("id")]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object field access by name
    Key(String),
    /// Array element access by index
    Index(usize),
    /// `*` — all values at this level
    Wildcard,
}

/// Errors produced while parsing a dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty path segment in {0:?}")]
    EmptySegment(String),
    #[error("unclosed index bracket in {0:?}")]
    UnclosedBracket(String),
    #[error("invalid array index {0:?}")]
    InvalidIndex(String),
    #[error("unexpected text after index bracket in {0:?}")]
    TrailingGarbage(String),
}

/// A parsed path: the single translator between the dotted surface form,
/// the query form used by the path engine, and the flat key list used by
/// the byte scanner. The three encodings stay isomorphic by construction;
/// the round trip is property-tested.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path(Vec<Segment>);

impl Path {
    /// The root path, addressing the whole document.
    pub fn root() -> Path {
        Path(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Parse dotted notation. The empty string parses to the root path.
    pub fn parse(path: &str) -> Result<Path, PathError> {
        if path.is_empty() {
            return Ok(Path::root());
        }
        let mut segments = Vec::new();
        for chunk in path.split('.') {
            parse_chunk(chunk, path, &mut segments)?;
        }
        Ok(Path(segments))
    }

    /// The flat-keys form consumed by the byte scanner: one string per
    /// segment, indices in bracket form (`["a", "[2]", "c"]`).
    pub fn to_keys(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|seg| match seg {
                Segment::Key(k) => k.clone(),
                Segment::Index(i) => format!("[{}]", i),
                Segment::Wildcard => "*".to_string(),
            })
            .collect()
    }

    /// Rebuild a path from its flat-keys form.
    pub fn from_keys<S: AsRef<str>>(keys: &[S]) -> Result<Path, PathError> {
        let mut segments = Vec::new();
        for key in keys {
            let key = key.as_ref();
            if key == "*" {
                segments.push(Segment::Wildcard);
            } else if key.starts_with('[') {
                if !key.ends_with(']') {
                    return Err(PathError::UnclosedBracket(key.to_string()));
                }
                let digits = &key[1..key.len() - 1];
                let idx = digits
                    .parse::<usize>()
                    .map_err(|_| PathError::InvalidIndex(digits.to_string()))?;
                segments.push(Segment::Index(idx));
            } else if key.is_empty() {
                return Err(PathError::EmptySegment(key.to_string()));
            } else {
                segments.push(Segment::Key(key.to_string()));
            }
        }
        Ok(Path(segments))
    }

    /// The query form for the path engine: every segment dot-separated,
    /// indices as bare numbers (`a.b.2.c`).
    pub fn to_query(&self) -> String {
        self.0
            .iter()
            .map(|seg| match seg {
                Segment::Key(k) => k.clone(),
                Segment::Index(i) => i.to_string(),
                Segment::Wildcard => "*".to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for Path {
    /// Canonical dotted form: keys joined with `.`, indices in brackets
    /// attached to the preceding segment (`a.b[2].c`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for seg in &self.0 {
            match seg {
                Segment::Key(k) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(k);
                }
                Segment::Index(i) => {
                    out.push_str(&format!("[{}]", i));
                }
                Segment::Wildcard => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push('*');
                }
            }
        }
        write!(f, "{}", out)
    }
}

/// Parse one dot-separated chunk: a key or wildcard optionally followed by
/// bracketed indices, or a bare bracketed index group (`[0]`, `[0][1]`).
fn parse_chunk(chunk: &str, whole: &str, segments: &mut Vec<Segment>) -> Result<(), PathError> {
    if chunk.is_empty() {
        return Err(PathError::EmptySegment(whole.to_string()));
    }

    let (head, mut rest) = match chunk.find('[') {
        Some(pos) => chunk.split_at(pos),
        None => (chunk, ""),
    };

    if head == "*" {
        segments.push(Segment::Wildcard);
    } else if !head.is_empty() {
        segments.push(Segment::Key(head.to_string()));
    }

    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return Err(PathError::TrailingGarbage(whole.to_string()));
        }
        let close = rest
            .find(']')
            .ok_or_else(|| PathError::UnclosedBracket(whole.to_string()))?;
        let digits = &rest[1..close];
        let idx = digits
            .parse::<usize>()
            .map_err(|_| PathError::InvalidIndex(digits.to_string()))?;
        segments.push(Segment::Index(idx));
        rest = &rest[close + 1..];
    }

    Ok(())
}
