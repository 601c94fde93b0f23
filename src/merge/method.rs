//! The merge combination grammar.
//!
//! A [`MergeMethod`] is a pair of tokens, `"<onMatched> <onUnmatched>"`, that decides what a
//! merge emits for matched left/right pairs and for rows present on one side only. Each token
//! is one of `both`, `thob`, `left`, `right`, `null`, `stack`; `stack` is matched-only.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{DatasetError, DatasetResult};

/// One token of the merge grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeToken {
    /// Matched: left fields override right fields. Unmatched: whichever side is present.
    Both,
    /// Matched: right fields override left fields. Unmatched: whichever side is present.
    Thob,
    /// The left record (unmatched right rows are dropped).
    Left,
    /// The right record (unmatched left rows are dropped).
    Right,
    /// Drop the row.
    Null,
    /// Matched only: `[left, right]`.
    Stack,
}

impl MergeToken {
    /// Every token, in grammar order.
    pub const ALL: [MergeToken; 6] = [
        MergeToken::Both,
        MergeToken::Thob,
        MergeToken::Left,
        MergeToken::Right,
        MergeToken::Null,
        MergeToken::Stack,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::Thob => "thob",
            Self::Left => "left",
            Self::Right => "right",
            Self::Null => "null",
            Self::Stack => "stack",
        }
    }

    fn allowed() -> String {
        Self::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
    }
}

impl FromStr for MergeToken {
    type Err = DatasetError;

    fn from_str(s: &str) -> DatasetResult<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DatasetError::UnknownMergeKeyword {
                token: s.to_string(),
                allowed: Self::allowed(),
            })
    }
}

impl fmt::Display for MergeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated `(onMatched, onUnmatched)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergeMethod {
    on_matched: MergeToken,
    on_unmatched: MergeToken,
}

impl MergeMethod {
    /// `both null`: inner join, left fields win.
    pub const INNER: MergeMethod = MergeMethod {
        on_matched: MergeToken::Both,
        on_unmatched: MergeToken::Null,
    };
    /// `both left`: left outer join.
    pub const LEFT_OUTER: MergeMethod = MergeMethod {
        on_matched: MergeToken::Both,
        on_unmatched: MergeToken::Left,
    };
    /// `both right`: right outer join.
    pub const RIGHT_OUTER: MergeMethod = MergeMethod {
        on_matched: MergeToken::Both,
        on_unmatched: MergeToken::Right,
    };
    /// `both both`: full outer join.
    pub const FULL_OUTER: MergeMethod = MergeMethod {
        on_matched: MergeToken::Both,
        on_unmatched: MergeToken::Both,
    };

    /// Validate a token pair. `stack` is rejected as the unmatched token.
    pub fn new(on_matched: MergeToken, on_unmatched: MergeToken) -> DatasetResult<Self> {
        if on_unmatched == MergeToken::Stack {
            return Err(DatasetError::StackOnUnmatched);
        }
        Ok(Self {
            on_matched,
            on_unmatched,
        })
    }

    pub fn on_matched(&self) -> MergeToken {
        self.on_matched
    }

    pub fn on_unmatched(&self) -> MergeToken {
        self.on_unmatched
    }

    /// Combine a left/right pair. At least one side should be present; `None` means the row
    /// is dropped.
    pub fn combine(&self, left: Option<&Value>, right: Option<&Value>) -> Option<Value> {
        match (left, right) {
            (Some(l), Some(r)) => match self.on_matched {
                MergeToken::Both => Some(overlay(r, l)),
                MergeToken::Thob => Some(overlay(l, r)),
                MergeToken::Left => Some(l.clone()),
                MergeToken::Right => Some(r.clone()),
                MergeToken::Null => None,
                MergeToken::Stack => Some(Value::Array(vec![l.clone(), r.clone()])),
            },
            (l, r) => match self.on_unmatched {
                MergeToken::Both | MergeToken::Thob => l.or(r).cloned(),
                MergeToken::Left => l.cloned(),
                MergeToken::Right => r.cloned(),
                MergeToken::Null | MergeToken::Stack => None,
            },
        }
    }
}

impl Default for MergeMethod {
    fn default() -> Self {
        Self::INNER
    }
}

impl FromStr for MergeMethod {
    type Err = DatasetError;

    fn from_str(s: &str) -> DatasetResult<Self> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        let [matched, unmatched] = tokens.as_slice() else {
            return Err(DatasetError::MalformedMergeMethod {
                input: s.to_string(),
            });
        };
        Self::new(matched.parse()?, unmatched.parse()?)
    }
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.on_matched, self.on_unmatched)
    }
}

/// `top` fields written over `base` fields. Non-object inputs resolve to `top`.
fn overlay(base: &Value, top: &Value) -> Value {
    match (base, top) {
        (Value::Object(b), Value::Object(t)) => {
            let mut out = b.clone();
            for (k, v) in t {
                out.insert(k.clone(), v.clone());
            }
            Value::Object(out)
        }
        _ => top.clone(),
    }
}

/// Custom row combiner: `(left, right) -> row`, `None` drops the row.
pub type CombineFn = Rc<dyn Fn(Option<&Value>, Option<&Value>) -> Option<Value>>;

/// Produces the output row for a matched or unmatched pair.
#[derive(Clone)]
pub enum Combiner {
    /// Keyword grammar.
    Method(MergeMethod),
    /// Caller-supplied function.
    Custom(CombineFn),
}

impl Combiner {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>, Option<&Value>) -> Option<Value> + 'static,
    {
        Self::Custom(Rc::new(f))
    }

    pub fn apply(&self, left: Option<&Value>, right: Option<&Value>) -> Option<Value> {
        match self {
            Self::Method(m) => m.combine(left, right),
            Self::Custom(f) => f(left, right),
        }
    }
}

impl Default for Combiner {
    fn default() -> Self {
        Self::Method(MergeMethod::default())
    }
}

impl From<MergeMethod> for Combiner {
    fn from(m: MergeMethod) -> Self {
        Self::Method(m)
    }
}

impl fmt::Debug for Combiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(m) => write!(f, "Combiner::Method(\"{m}\")"),
            Self::Custom(_) => f.write_str("Combiner::Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MergeMethod, MergeToken};
    use serde_json::json;

    #[test]
    fn parses_two_token_methods() {
        let m: MergeMethod = "stack both".parse().unwrap();
        assert_eq!(m.on_matched(), MergeToken::Stack);
        assert_eq!(m.on_unmatched(), MergeToken::Both);
        assert_eq!(m.to_string(), "stack both");
        assert_eq!("both null".parse::<MergeMethod>().unwrap(), MergeMethod::default());
    }

    #[test]
    fn rejects_unknown_tokens_with_allowed_list() {
        let err = "both outer".parse::<MergeMethod>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unknown merge keyword 'outer'"));
        assert!(msg.contains("both, thob, left, right, null, stack"));
    }

    #[test]
    fn rejects_malformed_and_stack_unmatched() {
        assert!("both".parse::<MergeMethod>().unwrap_err().to_string().contains("malformed"));
        assert!("both left right".parse::<MergeMethod>().is_err());
        let err = "both stack".parse::<MergeMethod>().unwrap_err();
        assert!(err.to_string().contains("only valid for matched rows"));
    }

    #[test]
    fn matched_tokens() {
        let l = json!({"id": 1, "v": "left"});
        let r = json!({"id": 1, "v": "right", "extra": true});
        let combine = |m: &str| m.parse::<MergeMethod>().unwrap().combine(Some(&l), Some(&r));

        assert_eq!(combine("both null"), Some(json!({"id": 1, "v": "left", "extra": true})));
        assert_eq!(combine("thob null"), Some(json!({"id": 1, "v": "right", "extra": true})));
        assert_eq!(combine("left null"), Some(l.clone()));
        assert_eq!(combine("right null"), Some(r.clone()));
        assert_eq!(combine("null null"), None);
        assert_eq!(combine("stack null"), Some(json!([l.clone(), r.clone()])));
    }

    #[test]
    fn unmatched_tokens() {
        let l = json!({"id": 1});
        let r = json!({"id": 2});
        let m = |s: &str| s.parse::<MergeMethod>().unwrap();

        assert_eq!(m("both both").combine(Some(&l), None), Some(l.clone()));
        assert_eq!(m("both thob").combine(None, Some(&r)), Some(r.clone()));
        assert_eq!(m("both left").combine(None, Some(&r)), None);
        assert_eq!(m("both left").combine(Some(&l), None), Some(l.clone()));
        assert_eq!(m("both right").combine(Some(&l), None), None);
        assert_eq!(m("both right").combine(None, Some(&r)), Some(r.clone()));
        assert_eq!(m("both null").combine(Some(&l), None), None);
    }
}
