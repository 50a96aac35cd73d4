//! Typed paths into resource documents.
//!
//! A `DocPath` is an explicit list of object keys and array indices. The
//! string form accepted by [`DocPath::parse`] is the one used by form
//! bindings: dotted keys, `[0]` indices and quoted keys for names that are
//! not plain identifiers, e.g. `metadata.annotations['kubesphere.io/provisioner']`.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use smallvec::SmallVec;

use crate::json_type_name;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSeg {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("invalid path {path:?} at byte {pos}: {reason}")]
    Syntax { path: String, pos: usize, reason: &'static str },
    #[error("cannot descend into {found} at {at}")]
    NotAContainer { at: String, found: &'static str },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocPath {
    segs: SmallVec<[PathSeg; 6]>,
}

fn is_bare_key_char(c: char) -> bool { c.is_ascii_alphanumeric() || c == '_' || c == '-' }

impl DocPath {
    pub fn root() -> Self { Self::default() }

    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { segs: keys.into_iter().map(|k| PathSeg::Key(k.into())).collect() }
    }

    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.segs.push(PathSeg::Key(k.into()));
        self
    }

    pub fn index(mut self, i: usize) -> Self {
        self.segs.push(PathSeg::Index(i));
        self
    }

    pub fn segments(&self) -> &[PathSeg] { &self.segs }
    pub fn is_empty(&self) -> bool { self.segs.is_empty() }
    pub fn len(&self) -> usize { self.segs.len() }

    pub fn last_key(&self) -> Option<&str> {
        match self.segs.last() {
            Some(PathSeg::Key(k)) => Some(k),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<DocPath> {
        if self.segs.is_empty() {
            return None;
        }
        let mut segs = self.segs.clone();
        segs.pop();
        Some(Self { segs })
    }

    /// Parse the binding string form. Wildcards and filters are rejected.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let src = s.strip_prefix('.').unwrap_or(s);
        if src.is_empty() {
            return Err(PathError::Empty);
        }
        let err = |pos: usize, reason: &'static str| PathError::Syntax { path: s.to_string(), pos, reason };
        let mut segs: SmallVec<[PathSeg; 6]> = SmallVec::new();
        let mut cur = String::new();
        // true right after '.' or at start: a bare key must follow
        let mut expect_key = true;
        let mut chars = src.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match c {
                '.' => {
                    if cur.is_empty() && expect_key {
                        return Err(err(i, "empty key"));
                    }
                    if !cur.is_empty() {
                        segs.push(PathSeg::Key(std::mem::take(&mut cur)));
                    }
                    expect_key = true;
                }
                '[' => {
                    if !cur.is_empty() {
                        segs.push(PathSeg::Key(std::mem::take(&mut cur)));
                    } else if expect_key {
                        // a quoted key may open the path
                        let quoted = matches!(chars.peek(), Some((_, '\'' | '"')));
                        if !(segs.is_empty() && quoted) {
                            return Err(err(i, "bracket without a preceding key"));
                        }
                    }
                    match chars.peek().copied() {
                        Some((_, q)) if q == '\'' || q == '"' => {
                            chars.next();
                            let mut key = String::new();
                            let mut closed = false;
                            let mut escaped = false;
                            for (_, kc) in chars.by_ref() {
                                if escaped {
                                    key.push(kc);
                                    escaped = false;
                                } else if kc == '\\' {
                                    escaped = true;
                                } else if kc == q {
                                    closed = true;
                                    break;
                                } else {
                                    key.push(kc);
                                }
                            }
                            if !closed {
                                return Err(err(i, "unterminated quoted key"));
                            }
                            match chars.next() {
                                Some((_, ']')) => {}
                                _ => return Err(err(i, "expected ] after quoted key")),
                            }
                            segs.push(PathSeg::Key(key));
                        }
                        _ => {
                            let mut digits = String::new();
                            let mut closed = false;
                            for (_, dc) in chars.by_ref() {
                                if dc == ']' {
                                    closed = true;
                                    break;
                                }
                                digits.push(dc);
                            }
                            if !closed {
                                return Err(err(i, "unterminated index"));
                            }
                            if digits.is_empty() || !digits.chars().all(|d| d.is_ascii_digit()) {
                                return Err(err(i, "index must be digits"));
                            }
                            let idx = digits.parse::<usize>().map_err(|_| err(i, "index out of range"))?;
                            segs.push(PathSeg::Index(idx));
                        }
                    }
                    expect_key = false;
                }
                '*' | '?' => return Err(err(i, "wildcards and filters are not supported")),
                c if is_bare_key_char(c) => {
                    if !expect_key {
                        return Err(err(i, "expected . or [ after ]"));
                    }
                    cur.push(c);
                }
                _ => return Err(err(i, "unexpected character (quote the key)")),
            }
        }
        if !cur.is_empty() {
            segs.push(PathSeg::Key(cur));
        } else if expect_key {
            return Err(err(src.len(), "trailing ."));
        }
        Ok(Self { segs })
    }

    pub fn get<'a>(&self, root: &'a Json) -> Option<&'a Json> {
        let mut cur = root;
        for seg in self.segs.iter() {
            cur = match (seg, cur) {
                (PathSeg::Key(k), Json::Object(map)) => map.get(k)?,
                (PathSeg::Index(i), Json::Array(arr)) => arr.get(*i)?,
                _ => return None,
            };
        }
        Some(cur)
    }

    pub fn get_mut<'a>(&self, root: &'a mut Json) -> Option<&'a mut Json> {
        let mut cur = root;
        for seg in self.segs.iter() {
            cur = match (seg, cur) {
                (PathSeg::Key(k), Json::Object(map)) => map.get_mut(k)?,
                (PathSeg::Index(i), Json::Array(arr)) => arr.get_mut(*i)?,
                _ => return None,
            };
        }
        Some(cur)
    }

    /// Set `value`, creating missing objects/arrays on the way (nulls count as missing).
    pub fn set(&self, root: &mut Json, value: Json) -> Result<(), PathError> {
        let mut cur = root;
        for (depth, seg) in self.segs.iter().enumerate() {
            let at = || Self { segs: self.segs[..depth].iter().cloned().collect() }.to_string();
            match seg {
                PathSeg::Key(k) => {
                    if cur.is_null() {
                        *cur = Json::Object(serde_json::Map::new());
                    }
                    let found = json_type_name(cur);
                    let map = cur.as_object_mut().ok_or_else(|| PathError::NotAContainer { at: at(), found })?;
                    cur = map.entry(k.clone()).or_insert(Json::Null);
                }
                PathSeg::Index(i) => {
                    if cur.is_null() {
                        *cur = Json::Array(Vec::new());
                    }
                    let found = json_type_name(cur);
                    let arr = cur.as_array_mut().ok_or_else(|| PathError::NotAContainer { at: at(), found })?;
                    if arr.len() <= *i {
                        arr.resize(*i + 1, Json::Null);
                    }
                    cur = &mut arr[*i];
                }
            }
        }
        *cur = value;
        Ok(())
    }

    pub fn remove(&self, root: &mut Json) -> Option<Json> {
        let parent = self.parent()?;
        let container = parent.get_mut(root)?;
        match (self.segs.last()?, container) {
            (PathSeg::Key(k), Json::Object(map)) => map.remove(k),
            (PathSeg::Index(i), Json::Array(arr)) if *i < arr.len() => Some(arr.remove(*i)),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, seg) in self.segs.iter().enumerate() {
            match seg {
                PathSeg::Key(k) if !k.is_empty() && k.chars().all(is_bare_key_char) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(k)?;
                }
                PathSeg::Key(k) => {
                    f.write_str("['")?;
                    for c in k.chars() {
                        if matches!(c, '\'' | '\\') {
                            f.write_str("\\")?;
                        }
                        write!(f, "{}", c)?;
                    }
                    f.write_str("']")?;
                }
                PathSeg::Index(n) => write!(f, "[{}]", n)?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for DocPath {
    type Err = PathError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_accepts_binding_forms() {
        let p = DocPath::parse("metadata.annotations['kubesphere.io/provisioner']").unwrap();
        assert_eq!(
            p.segments(),
            &[
                PathSeg::Key("metadata".into()),
                PathSeg::Key("annotations".into()),
                PathSeg::Key("kubesphere.io/provisioner".into()),
            ]
        );
        let p = DocPath::parse(".spec.template.spec.containers[0].image").unwrap();
        assert_eq!(p.len(), 6);
        assert_eq!(p.segments()[4], PathSeg::Index(0));
        assert_eq!(DocPath::parse("a[1][2]").unwrap().segments()[2], PathSeg::Index(2));
    }

    #[test]
    fn parse_rejects_bad_paths() {
        assert_eq!(DocPath::parse(""), Err(PathError::Empty));
        for bad in ["spec.*", "a..b", "a.", "a[x]", "a[0", "[0]", "a.[0]", "a['k'", "a[0]b", "a/b", "a[?(@.x)]"] {
            assert!(DocPath::parse(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn display_round_trips() {
        for s in ["metadata.annotations['kubesphere.io/provisioner']", "spec.containers[0].image", "parameters.fsType"] {
            assert_eq!(DocPath::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn quoted_keys_round_trip_in_any_position() {
        let paths = [
            DocPath::from_keys(["kubesphere.io/x", "c"]),
            DocPath::from_keys(["metadata", "it's"]),
            DocPath::from_keys(["a\\b", "c d"]).index(2),
        ];
        for p in paths {
            let text = p.to_string();
            assert_eq!(DocPath::parse(&text).unwrap(), p, "{}", text);
        }
        assert_eq!(DocPath::from_keys(["kubesphere.io/x", "c"]).to_string(), "['kubesphere.io/x'].c");
        assert_eq!(DocPath::from_keys(["it's"]).to_string(), "['it\\'s']");
    }

    #[test]
    fn set_creates_intermediates_and_get_reads_back() {
        let mut v = json!({});
        let p = DocPath::parse("spec.overrides[1].clusterName").unwrap();
        p.set(&mut v, json!("c2")).unwrap();
        assert_eq!(v, json!({"spec": {"overrides": [null, {"clusterName": "c2"}]}}));
        assert_eq!(p.get(&v), Some(&json!("c2")));
    }

    #[test]
    fn set_refuses_to_descend_into_scalars() {
        let mut v = json!({"spec": "oops"});
        let e = DocPath::from_keys(["spec", "x"]).set(&mut v, json!(1)).unwrap_err();
        assert_eq!(e, PathError::NotAContainer { at: "spec".into(), found: "string" });
    }

    #[test]
    fn remove_deletes_leaf() {
        let mut v = json!({"parameters": {"a": "1", "b": "2"}});
        let removed = DocPath::from_keys(["parameters", "a"]).remove(&mut v);
        assert_eq!(removed, Some(json!("1")));
        assert_eq!(v, json!({"parameters": {"b": "2"}}));
        assert_eq!(DocPath::from_keys(["nope", "a"]).remove(&mut v), None);
    }
}
