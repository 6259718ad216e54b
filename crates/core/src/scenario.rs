//! 통합 시나리오 - 무엇을 보내고, 무엇이 돌아오고, 무엇이 저장되어야 하는지
//!
//! [`Scenario`]는 생성 후 불변입니다. 기대 저장 레코드는 단순 값이 아니라
//! 페이로드의 순수 함수인 [`Expectation`]입니다. 대부분의 시나리오는 수신기가
//! 페이로드를 그대로 저장하기를 기대하고, `*-formatted-*` 시나리오는 저장 전에
//! 수신기가 형태를 바꾸기를 기대합니다.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use crate::error::ScenarioError;

/// 시나리오 페이로드에 섞이는 무작위 접미사 길이
pub const RANDOM_SUFFIX_LEN: usize = 10;

/// 시나리오 파일에서 실행별 무작위 접미사로 치환되는 자리표시자
pub const SUFFIX_PLACEHOLDER: &str = "${rand}";

/// 시나리오 부수 효과가 쌓이는 Redis 리스트 키 접두사
pub const QUEUE_KEY_PREFIX: &str = "integration:";

/// 페이로드에서 기대 저장 레코드를 얻는 방법
#[derive(Clone)]
pub enum Expectation {
    /// 수신기가 페이로드를 그대로 저장
    Passthrough,
    /// 수신기가 정확히 이 값을 저장
    Static(Value),
    /// 수신기가 페이로드 형태를 바꿈 (`derive`가 같은 변환을 수행)
    Derived {
        name: &'static str,
        derive: fn(&Value) -> Value,
    },
}

impl Expectation {
    /// `payload`에 대한 기대 레코드를 계산합니다.
    pub fn resolve(&self, payload: &Value) -> Value {
        match self {
            Self::Passthrough => payload.clone(),
            Self::Static(value) => value.clone(),
            Self::Derived { derive, .. } => derive(payload),
        }
    }

    /// 목록 출력용 짧은 이름
    pub fn label(&self) -> &str {
        match self {
            Self::Passthrough => "passthrough",
            Self::Static(_) => "static",
            Self::Derived { name, .. } => *name,
        }
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passthrough => f.write_str("Passthrough"),
            Self::Static(v) => f.debug_tuple("Static").field(v).finish(),
            Self::Derived { name, .. } => f.debug_struct("Derived").field("name", name).finish(),
        }
    }
}

/// 통합 테스트 케이스 하나
#[derive(Debug, Clone)]
pub struct Scenario {
    /// 고유 식별자 (URL 경로 세그먼트이자 큐 키 접미사)
    pub name: String,
    /// 설명
    pub description: String,
    /// 요청 본문
    pub payload: Value,
    /// 기대 저장 레코드
    pub expectation: Expectation,
    /// 기대 응답 본문 (비어 있으면 본문 없음)
    pub expected_response: String,
}

impl Scenario {
    /// 수신기가 이 시나리오에 대해 푸시해야 하는 레코드
    pub fn expected(&self) -> Value {
        self.expectation.resolve(&self.payload)
    }

    /// 이 시나리오의 부수 효과를 담는 Redis 리스트 키
    pub fn queue_key(&self) -> String {
        format!("{QUEUE_KEY_PREFIX}{}", self.name)
    }

    /// 보고용 케이스 이름: `"<description> [<name>]"`
    pub fn case_name(&self) -> String {
        format!("{} [{}]", self.description, self.name)
    }
}

/// 순서가 있고 검증된 시나리오 집합
#[derive(Debug, Clone)]
pub struct ScenarioTable {
    scenarios: Vec<Scenario>,
}

impl ScenarioTable {
    /// 이름(경로 안전, 고유)을 검증하고 선언 순서를 유지합니다.
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self, ScenarioError> {
        let mut seen = HashSet::new();
        for scenario in &scenarios {
            validate_name(&scenario.name)?;
            if !seen.insert(scenario.name.as_str()) {
                return Err(ScenarioError::Duplicate(scenario.name.clone()));
            }
        }
        Ok(Self { scenarios })
    }

    /// `suffix`가 섞인 내장 시나리오 테이블
    pub fn builtin(suffix: &str) -> Self {
        Self {
            scenarios: builtin_scenarios(suffix),
        }
    }

    /// 시나리오 정의 JSON 배열 파일을 읽고, 모든 문자열의
    /// [`SUFFIX_PLACEHOLDER`]를 `suffix`로 치환합니다.
    pub async fn from_file(path: impl AsRef<Path>, suffix: &str) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ScenarioError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        Self::from_json(&content, suffix).map_err(|e| match e {
            ScenarioError::LoadFailed { reason, .. } => ScenarioError::LoadFailed {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// 시나리오 정의 JSON 배열을 파싱합니다.
    ///
    /// `expected`가 없으면 페이로드 그대로, `null`을 포함한 값이 있으면 그 값을 기대합니다.
    pub fn from_json(content: &str, suffix: &str) -> Result<Self, ScenarioError> {
        let defs: Vec<ScenarioDef> =
            serde_json::from_str(content).map_err(|e| ScenarioError::LoadFailed {
                path: "<inline>".to_owned(),
                reason: e.to_string(),
            })?;

        let scenarios = defs
            .into_iter()
            .map(|def| {
                let payload = substitute(def.payload, suffix);
                let expectation = match def.expected {
                    Some(expected) => Expectation::Static(substitute(expected, suffix)),
                    None => Expectation::Passthrough,
                };
                Scenario {
                    name: def.name,
                    description: def.description,
                    payload,
                    expectation,
                    expected_response: def.expected_response.replace(SUFFIX_PLACEHOLDER, suffix),
                }
            })
            .collect();

        Self::new(scenarios)
    }

    /// 선언 순서대로의 모든 시나리오
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// `names`에 해당하는 시나리오만 선언 순서대로 고릅니다.
    ///
    /// 빈 필터는 전체를 선택하고, 알 수 없는 이름은 에러입니다.
    pub fn select(&self, names: &[String]) -> Result<Vec<&Scenario>, ScenarioError> {
        if names.is_empty() {
            return Ok(self.scenarios.iter().collect());
        }
        if let Some(unknown) = names
            .iter()
            .find(|n| !self.scenarios.iter().any(|s| &s.name == *n))
        {
            return Err(ScenarioError::Unknown(unknown.clone()));
        }
        Ok(self
            .scenarios
            .iter()
            .filter(|s| names.contains(&s.name))
            .collect())
    }
}

/// 파일에 기록된 시나리오 정의
#[derive(Debug, Deserialize)]
struct ScenarioDef {
    name: String,
    #[serde(default)]
    description: String,
    payload: Value,
    /// 필드가 없으면 `None`, 명시적 `null`은 `Some(Value::Null)`
    #[serde(default, deserialize_with = "present")]
    expected: Option<Value>,
    #[serde(default)]
    expected_response: String,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// [`RANDOM_SUFFIX_LEN`]자리 소문자 ASCII 접미사를 생성합니다.
pub fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..RANDOM_SUFFIX_LEN)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect()
}

fn validate_name(name: &str) -> Result<(), ScenarioError> {
    if name.is_empty() {
        return Err(ScenarioError::InvalidName {
            name: name.to_owned(),
            reason: "must not be empty".to_owned(),
        });
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(ScenarioError::InvalidName {
            name: name.to_owned(),
            reason: format!("character {c:?} is not allowed in a path segment"),
        });
    }
    if name == "." || name == ".." {
        return Err(ScenarioError::InvalidName {
            name: name.to_owned(),
            reason: "dot segments are not allowed".to_owned(),
        });
    }
    Ok(())
}

fn substitute(value: Value, suffix: &str) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace(SUFFIX_PLACEHOLDER, suffix)),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| substitute(v, suffix)).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, substitute(v, suffix)))
                .collect(),
        ),
        other => other,
    }
}

fn builtin_scenarios(suffix: &str) -> Vec<Scenario> {
    vec![
        Scenario {
            name: "basic-usage".to_owned(),
            description: "should return 200 with the payload not formatted.".to_owned(),
            payload: json!({ "message": format!("Hello basic, {suffix}!") }),
            expectation: Expectation::Passthrough,
            expected_response: String::new(),
        },
        Scenario {
            name: "basic-formatted-usage".to_owned(),
            description: "should return 200 with a basic formatting.".to_owned(),
            payload: json!({ "message": format!("Hello formatted, {suffix}!") }),
            expectation: Expectation::Derived {
                name: "json-envelope",
                derive: json_envelope,
            },
            expected_response: String::new(),
        },
        Scenario {
            name: "basic-response".to_owned(),
            description: "should return 200 with a response asked.".to_owned(),
            payload: json!({ "id": suffix }),
            expectation: Expectation::Passthrough,
            expected_response: suffix.to_owned(),
        },
        Scenario {
            name: "advanced-formatted-usage".to_owned(),
            description: "should return 200 with an advanced formatting.".to_owned(),
            payload: json!({
                "id": 12345,
                "name": "John Doe",
                "childrens": [
                    { "name": "Jane", "age": 5 },
                    { "name": "Bob", "age": 8 }
                ],
                "pets": [],
                "favoriteColors": {
                    "primary": null,
                    "secondary": "blue"
                },
                "lastLogin": "2023-06-28T18:30:00Z",
                "notes": null
            }),
            expectation: Expectation::Derived {
                name: "user-profile-summary",
                derive: user_profile_summary,
            },
            expected_response: String::new(),
        },
    ]
}

/// 봉투 형식: `{"contentType": "application/json", "data": <payload>}`
pub fn json_envelope(payload: &Value) -> Value {
    json!({
        "contentType": "application/json",
        "data": payload,
    })
}

/// 수신기의 프로필 템플릿이 만드는 요약
///
/// 선호 색상은 primary, 없으면 secondary입니다.
pub fn user_profile_summary(payload: &Value) -> Value {
    let non_empty = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_array)
            .is_some_and(|a| !a.is_empty())
    };
    let children_names: Vec<Value> = payload
        .get("childrens")
        .and_then(Value::as_array)
        .map(|children| {
            children
                .iter()
                .filter_map(|c| c.get("name").cloned())
                .collect()
        })
        .unwrap_or_default();
    let colors = payload.get("favoriteColors");
    let favorite = colors
        .and_then(|c| c.get("primary"))
        .filter(|v| !v.is_null())
        .or_else(|| colors.and_then(|c| c.get("secondary")))
        .cloned()
        .unwrap_or(Value::Null);

    json!({
        "user": {
            "id": payload.get("id").cloned().unwrap_or(Value::Null),
            "name": payload.get("name").cloned().unwrap_or(Value::Null),
        },
        "hasNotes": payload.get("notes").is_some_and(|n| !n.is_null()),
        "hasChildrens": non_empty("childrens"),
        "childrenNames": children_names,
        "hasPets": non_empty("pets"),
        "favoriteColor": favorite,
    })
}
