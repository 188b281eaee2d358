use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use field_schema_core::{
    ErrorKind, EvaluateOptions, FailureMode, FieldError, FieldErrors, FieldRule, ForeignError,
    FormData, RuleError, Schema, TypedRecord, UNKNOWN_ERROR, UNKNOWN_FIELD, VALUER_NOT_CALLABLE, parse_form,
    parse_object,
};
use regex::Regex;
use serde_json::{Map, Value, json};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn raw_or_null(raw: Option<&Value>) -> Value {
    raw.cloned().unwrap_or_default()
}

fn string() -> FieldRule<String> {
    FieldRule::new(|raw: Option<&Value>, field: &str| match raw {
        Some(Value::String(s)) => Ok(s.clone()),
        other => Err(FieldError::new("expected a string", field, raw_or_null(other))),
    })
}

fn integer() -> FieldRule<i64> {
    FieldRule::new(|raw: Option<&Value>, field: &str| match raw {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| FieldError::new("expected an integer", field, n.clone())),
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| FieldError::new("expected an integer", field, s.as_str())),
        other => Err(FieldError::new("expected an integer", field, raw_or_null(other))),
    })
}

fn date() -> FieldRule<NaiveDate> {
    FieldRule::new(|raw: Option<&Value>, field: &str| {
        let text = raw
            .and_then(Value::as_str)
            .ok_or_else(|| FieldError::new("expected a date", field, raw_or_null(raw)))?;
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|e| FieldError::new("expected a YYYY-MM-DD date", field, text).with_cause(e))
    })
}

/// Optional string: absent or empty becomes `None`.
fn optional_string() -> FieldRule<Option<String>> {
    FieldRule::new(|raw: Option<&Value>, field: &str| match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(FieldError::new("expected a string", field, other.clone())),
    })
}

fn min_length(min: usize) -> impl Fn(&String, &str) -> Option<FieldError> + Send + Sync + 'static {
    move |value: &String, field: &str| {
        (value.chars().count() < min)
            .then(|| FieldError::new(format!("must be at least {min} characters"), field, value.as_str()))
    }
}

fn matches(pattern: &str, message: &'static str) -> impl Fn(&String, &str) -> Option<FieldError> + Send + Sync + 'static {
    let re = Regex::new(pattern).unwrap();
    move |value: &String, field: &str| {
        (!re.is_match(value)).then(|| FieldError::new(message, field, value.as_str()))
    }
}

fn range(min: i64, max: i64) -> impl Fn(&i64, &str) -> Option<FieldError> + Send + Sync + 'static {
    move |value: &i64, field: &str| {
        (!(min..=max).contains(value))
            .then(|| FieldError::new(format!("must be between {min} and {max}"), field, *value))
    }
}

fn signup_schema() -> Schema {
    Schema::new()
        .field(
            "username",
            string()
                .with_validator(min_length(3))
                .with_validator(matches("^[a-z0-9_]+$", "must be lowercase alphanumeric")),
        )
        .field("age", integer().with_validator(range(13, 130)))
        .field("birthday", date())
        .field("bio", optional_string())
}

fn messages(errors: &FieldErrors) -> Vec<(&str, &str)> {
    errors.iter().map(|e| (e.field(), e.message())).collect()
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

// ---------------------------------------------------------------------------
// Accumulation across fields
// ---------------------------------------------------------------------------

#[test]
fn test_errors_from_every_failing_field_are_collected() {
    let schema = Schema::new()
        .field("a", integer())
        .field("b", integer())
        .field("c", integer());

    let errors = parse_object(&schema, &object(json!({ "a": "x", "b": 2, "c": [] }))).unwrap_err();

    assert_eq!(errors.fields(), vec!["a", "c"]);
    assert_eq!(errors[0].value(), &json!("x"));
    assert_eq!(errors[1].value(), &json!([]));
}

#[test]
fn test_failure_never_returns_partial_record() {
    let form: FormData = [("username", "ferris"), ("age", "200"), ("birthday", "2001-02-03")]
        .into_iter()
        .collect();

    let result: Result<TypedRecord, FieldErrors> = parse_form(&signup_schema(), &form);

    let errors = result.unwrap_err();
    assert_eq!(messages(&errors), vec![("age", "must be between 13 and 130")]);
}

// ---------------------------------------------------------------------------
// Constraints within a field
// ---------------------------------------------------------------------------

#[test]
fn test_all_failing_constraints_are_reported() {
    let form: FormData = [("username", "A!"), ("age", "30"), ("birthday", "1994-07-01")]
        .into_iter()
        .collect();

    let errors = parse_form(&signup_schema(), &form).unwrap_err();

    assert_eq!(
        messages(&errors),
        vec![
            ("username", "must be at least 3 characters"),
            ("username", "must be lowercase alphanumeric"),
        ]
    );
    assert!(errors.iter().all(|e| e.kind() == ErrorKind::Data));
}

#[test]
fn test_validators_never_run_after_coercion_failure() {
    let called = Arc::new(AtomicBool::new(false));
    let marker = Arc::clone(&called);
    let schema = Schema::new().field(
        "n",
        integer().with_validator(move |_: &i64, _: &str| {
            marker.store(true, Ordering::SeqCst);
            None
        }),
    );

    let errors = schema.evaluate(&json!({ "n": "not a number" })).unwrap_err();

    assert_eq!(errors.len(), 1);
    assert!(!called.load(Ordering::SeqCst));
}

// ---------------------------------------------------------------------------
// Success
// ---------------------------------------------------------------------------

#[test]
fn test_all_success_yields_typed_record() {
    let form: FormData = [
        ("username", "ferris_42"),
        ("age", "30"),
        ("birthday", "1994-07-01"),
        ("unrelated", "ignored"),
    ]
    .into_iter()
    .collect();

    let record = parse_form(&signup_schema(), &form).unwrap();

    assert_eq!(
        record.fields().collect::<Vec<_>>(),
        vec!["username", "age", "birthday", "bio"]
    );
    assert_eq!(record.get::<String>("username").unwrap(), "ferris_42");
    assert_eq!(record.get::<i64>("age"), Some(&30));
    assert_eq!(
        record.get::<NaiveDate>("birthday"),
        NaiveDate::from_ymd_opt(1994, 7, 1).as_ref()
    );
    assert_eq!(record.get::<Option<String>>("bio"), Some(&None));
    assert!(!record.contains("unrelated"));
}

// ---------------------------------------------------------------------------
// Absent keys
// ---------------------------------------------------------------------------

#[test]
fn test_absent_key_reaches_valuer_as_none() {
    let saw_absent = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&saw_absent);
    let schema = Schema::new().field(
        "missing",
        FieldRule::new(move |raw: Option<&Value>, _: &str| {
            flag.store(raw.is_none(), Ordering::SeqCst);
            Ok(raw.is_none())
        }),
    );

    let record = schema.evaluate(&FormData::new()).unwrap();

    assert!(saw_absent.load(Ordering::SeqCst));
    assert_eq!(record.get::<bool>("missing"), Some(&true));
}

#[test]
fn test_absent_key_rejection_is_up_to_the_valuer() {
    let schema = Schema::new()
        .field("required", string())
        .field("optional", optional_string());

    let errors = schema.evaluate(&json!({})).unwrap_err();

    assert_eq!(messages(&errors), vec![("required", "expected a string")]);
    assert_eq!(errors[0].value(), &Value::Null);
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[test]
fn test_unresolved_valuer_is_reported_per_field() {
    let schema = Schema::new()
        .field("a", integer())
        .unresolved("b", "not_a_rule")
        .field("c", integer());

    let errors = schema.evaluate(&json!({ "a": 1, "b": 2, "c": "bad" })).unwrap_err();

    assert_eq!(
        messages(&errors),
        vec![("b", VALUER_NOT_CALLABLE), ("c", "expected an integer")]
    );
    assert!(errors[0].is_configuration());
    assert!(!errors[1].is_configuration());
}

// ---------------------------------------------------------------------------
// Adapter equivalence
// ---------------------------------------------------------------------------

#[test]
fn test_form_and_object_adapters_agree() {
    let pairs = [
        [("username", "ferris"), ("age", "30"), ("birthday", "1994-07-01")],
        [("username", "x"), ("age", "old"), ("birthday", "1994-13-01")],
    ];

    for pairs in pairs {
        let form: FormData = pairs.into_iter().collect();
        let map: Map<String, Value> = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();

        let from_form = parse_form(&signup_schema(), &form);
        let from_object = parse_object(&signup_schema(), &map);

        match (from_form, from_object) {
            (Ok(a), Ok(b)) => {
                assert_eq!(a.fields().collect::<Vec<_>>(), b.fields().collect::<Vec<_>>());
                assert_eq!(a.get::<String>("username"), b.get::<String>("username"));
                assert_eq!(a.get::<i64>("age"), b.get::<i64>("age"));
            }
            (Err(a), Err(b)) => {
                assert_eq!(messages(&a), messages(&b));
                assert_eq!(
                    a.iter().map(FieldError::value).collect::<Vec<_>>(),
                    b.iter().map(FieldError::value).collect::<Vec<_>>()
                );
            }
            _ => panic!("adapters disagreed on the outcome"),
        }
    }
}

// ---------------------------------------------------------------------------
// Foreign errors
// ---------------------------------------------------------------------------

#[test]
fn test_panicking_valuer_is_wrapped_as_unknown_error() {
    let schema = Schema::new()
        .field(
            "explodes",
            FieldRule::<i64>::new(|_: Option<&Value>, _: &str| panic!("database on fire")),
        )
        .field("fine", integer());

    let errors = schema.evaluate(&json!({ "fine": 1 })).unwrap_err();

    assert_eq!(errors.len(), 1);
    let error = &errors[0];
    assert_eq!(error.field(), UNKNOWN_FIELD);
    assert_eq!(error.message(), UNKNOWN_ERROR);
    assert_eq!(error.kind(), ErrorKind::Unknown);
    let cause = error.cause().expect("cause preserved");
    assert_eq!(
        cause.downcast_ref::<ForeignError>().map(ForeignError::message),
        Some("database on fire")
    );
}

#[test]
fn test_panicking_validator_is_wrapped_as_unknown_error() {
    let schema = Schema::new().field(
        "n",
        integer().with_validator(|_: &i64, _: &str| -> Option<FieldError> {
            std::panic::panic_any(42_u8)
        }),
    );

    let errors = schema.evaluate(&json!({ "n": 1 })).unwrap_err();

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field(), UNKNOWN_FIELD);
    assert_eq!(errors[0].cause().map(|c| c.to_string()).as_deref(), Some("non-string panic payload"));
}

#[test]
fn test_formatted_panic_message_is_kept_as_cause() {
    let schema = Schema::new().field(
        "n",
        FieldRule::<i64>::new(|raw: Option<&Value>, field: &str| {
            panic!("cannot coerce {field} from {}", raw_or_null(raw))
        }),
    );

    let errors = schema.evaluate(&json!({ "n": 5 })).unwrap_err();

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::Unknown);
    assert_eq!(
        errors[0]
            .cause()
            .and_then(|c| c.downcast_ref::<ForeignError>())
            .map(ForeignError::message),
        Some("cannot coerce n from 5")
    );
}

#[test]
fn test_panicking_rule_under_parallel_evaluation() {
    let schema = Schema::new()
        .field("a", integer())
        .field(
            "b",
            FieldRule::<i64>::new(|_: Option<&Value>, _: &str| panic!("worker exploded")),
        )
        .field("c", integer());

    let options = EvaluateOptions::default().with_parallel(true);
    let errors = schema
        .evaluate_with(&json!({ "a": 1, "b": 2, "c": "x" }), &options)
        .unwrap_err();

    assert_eq!(
        messages(&errors),
        vec![(UNKNOWN_FIELD, UNKNOWN_ERROR), ("c", "expected an integer")]
    );
    assert_eq!(
        errors[0].cause().map(|c| c.to_string()).as_deref(),
        Some("worker exploded")
    );
}

#[test]
fn test_failure_without_errors_is_never_reported_as_success() {
    let schema = Schema::new()
        .field(
            "a",
            FieldRule::<i64>::new(|_: Option<&Value>, _: &str| std::panic::panic_any(FieldErrors::new())),
        )
        .field(
            "b",
            FieldRule::<i64>::new(|_: Option<&Value>, _: &str| {
                std::panic::panic_any(RuleError::Constraints(FieldErrors::new()))
            }),
        )
        .field("c", FieldRule::new(|_: Option<&Value>, _: &str| Ok(1_i64)));

    for options in [
        EvaluateOptions::default(),
        EvaluateOptions::default().with_parallel(true),
    ] {
        let errors = schema.evaluate_with(&json!({}), &options).unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.kind() == ErrorKind::Unknown));
    }

    let fail_fast = EvaluateOptions::default().with_mode(FailureMode::FailFast);
    let errors = schema.evaluate_with(&json!({}), &fail_fast).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field(), UNKNOWN_FIELD);
}

#[test]
fn test_coercion_cause_is_kept() {
    let errors = Schema::new()
        .field("d", date())
        .evaluate(&json!({ "d": "2024-02-30" }))
        .unwrap_err();

    assert_eq!(errors[0].message(), "expected a YYYY-MM-DD date");
    assert!(errors[0].cause().is_some());
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[test]
fn test_parallel_evaluation_matches_sequential() {
    let mut schema = Schema::new();
    let mut input = Map::new();
    for i in 0..64 {
        let name = format!("f{i:02}");
        schema = schema.field(name.clone(), integer().with_validator(range(0, 40)));
        input.insert(name, json!(i));
    }

    let sequential = schema.evaluate(&input).unwrap_err();
    let parallel = schema
        .evaluate_with(&input, &EvaluateOptions::default().with_parallel(true))
        .unwrap_err();

    assert_eq!(messages(&sequential), messages(&parallel));
    assert_eq!(sequential.len(), 23);
    assert_eq!(sequential[0].field(), "f41");
}

#[test]
fn test_fail_fast_reports_only_first_failing_field() {
    let options = EvaluateOptions::default()
        .with_mode(FailureMode::FailFast)
        .with_parallel(true);
    let form: FormData = [("username", "A!"), ("age", "1")].into_iter().collect();

    let errors = signup_schema().evaluate_with(&form, &options).unwrap_err();

    assert_eq!(errors.fields(), vec!["username"]);
    assert_eq!(errors.len(), 2);
}
