//! JSON 값의 구조적 비교
//!
//! [`deep_equal`]은 두 문서가 같은지 판단하고, [`differences`]는 다른 경로마다
//! [`Difference`] 하나씩 그 이유를 알려줍니다. 객체 키 순서는 무시하고, 배열은
//! 순서대로 원소별로 비교하며, 숫자는 수치 값으로 비교합니다 (`1`과 `1.0`은 같음).

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Number, Value};

/// 두 문서가 갈라지는 지점 하나
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Difference {
    /// JSON pointer 형식 경로 (`/user/name`, `/childrenNames/1`), 루트는 `""`
    pub path: String,
    /// `path`에서 무엇이 다른지
    pub kind: DifferenceKind,
}

/// 경로에서 발견된 차이의 종류
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DifferenceKind {
    /// 기대 객체에는 있지만 실제 객체에는 없는 키
    MissingKey { expected: Value },
    /// 실제 객체에만 있는 키
    UnexpectedKey { actual: Value },
    /// 배열 길이가 다름 (짧은 쪽 길이까지의 원소는 계속 비교)
    LengthMismatch { expected: usize, actual: usize },
    /// JSON 타입이 다르거나 같은 타입의 스칼라 값이 다름
    ValueMismatch { expected: Value, actual: Value },
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        match &self.kind {
            DifferenceKind::MissingKey { expected } => {
                write!(f, "{path}: missing key, expected {expected}")
            }
            DifferenceKind::UnexpectedKey { actual } => {
                write!(f, "{path}: unexpected key with value {actual}")
            }
            DifferenceKind::LengthMismatch { expected, actual } => {
                write!(f, "{path}: expected {expected} elements, got {actual}")
            }
            DifferenceKind::ValueMismatch { expected, actual } => {
                write!(f, "{path}: expected {expected}, got {actual}")
            }
        }
    }
}

/// `expected`와 `actual`이 구조적으로 같으면 true를 반환합니다.
pub fn deep_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| deep_equal(v, other)))
        }
        _ => false,
    }
}

/// `expected`와 `actual` 사이의 모든 차이를 나열합니다.
///
/// 결과가 비어 있으면 [`deep_equal`]도 true를 반환합니다.
pub fn differences(expected: &Value, actual: &Value) -> Vec<Difference> {
    let mut out = Vec::new();
    let mut path = String::new();
    collect(expected, actual, &mut path, &mut out);
    out
}

fn collect(expected: &Value, actual: &Value, path: &mut String, out: &mut Vec<Difference>) {
    match (expected, actual) {
        (Value::Object(e), Value::Object(a)) => collect_objects(e, a, path, out),
        (Value::Array(e), Value::Array(a)) => {
            if e.len() != a.len() {
                out.push(Difference {
                    path: path.clone(),
                    kind: DifferenceKind::LengthMismatch {
                        expected: e.len(),
                        actual: a.len(),
                    },
                });
            }
            for (index, (ev, av)) in e.iter().zip(a).enumerate() {
                with_segment(path, &index.to_string(), |path| collect(ev, av, path, out));
            }
        }
        _ => {
            if !deep_equal(expected, actual) {
                out.push(Difference {
                    path: path.clone(),
                    kind: DifferenceKind::ValueMismatch {
                        expected: expected.clone(),
                        actual: actual.clone(),
                    },
                });
            }
        }
    }
}

fn collect_objects(
    expected: &Map<String, Value>,
    actual: &Map<String, Value>,
    path: &mut String,
    out: &mut Vec<Difference>,
) {
    for (key, ev) in expected {
        with_segment(path, key, |path| match actual.get(key) {
            Some(av) => collect(ev, av, path, out),
            None => out.push(Difference {
                path: path.clone(),
                kind: DifferenceKind::MissingKey {
                    expected: ev.clone(),
                },
            }),
        });
    }
    for (key, av) in actual {
        if !expected.contains_key(key) {
            with_segment(path, key, |path| {
                out.push(Difference {
                    path: path.clone(),
                    kind: DifferenceKind::UnexpectedKey { actual: av.clone() },
                })
            });
        }
    }
}

/// `f` 실행 동안 경로에 `/segment` (RFC 6901 이스케이프)를 덧붙입니다.
fn with_segment(path: &mut String, segment: &str, f: impl FnOnce(&mut String)) {
    let len = path.len();
    path.push('/');
    path.push_str(&segment.replace('~', "~0").replace('/', "~1"));
    f(path);
    path.truncate(len);
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
