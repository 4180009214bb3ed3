//! Property-based checks that the typed surface and the schema stay in step.

use chrono::{FixedOffset, TimeZone};
use contract::{
    ActionBody, AgentEnvelope, Body, Envelope, EnvelopeSchema, FinalBody, Fraction,
    MetadataValue, NonEmptyString, ProgressBody, ProgressStatus, Rule, StepIndex, Timestamp,
};
use proptest::prelude::*;
use serde_json::{Map, Number, Value};

fn schema() -> &'static EnvelopeSchema {
    EnvelopeSchema::shared().unwrap()
}

/// Instants from 0000-01-01 to 9999-12-31 with an arbitrary whole-minute offset.
fn timestamp() -> impl Strategy<Value = Timestamp> {
    (
        -62_167_219_200i64..=253_402_300_799i64,
        0u32..1_000_000_000,
        -1439i32..=1439,
    )
        .prop_filter_map("local year outside 0..=9999", |(secs, nanos, minutes)| {
            let offset = FixedOffset::east_opt(minutes * 60)?;
            let instant = offset.timestamp_opt(secs, nanos).single()?;
            Timestamp::new(instant).ok()
        })
}

fn text() -> impl Strategy<Value = String> {
    "\\PC{0,24}"
}

fn non_empty() -> impl Strategy<Value = NonEmptyString> {
    "[A-Za-z0-9_-]{1,16}".prop_map(|s| NonEmptyString::new(s).unwrap())
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        text().prop_map(Value::String),
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        leaf(),
        prop::collection::vec(leaf(), 0..4).prop_map(Value::Array),
        object().prop_map(Value::Object),
    ]
}

fn object() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z]{1,8}", leaf(), 0..4)
        .prop_map(|entries| entries.into_iter().collect())
}

fn step() -> impl Strategy<Value = StepIndex> {
    prop_oneof![
        any::<u64>().prop_map(StepIndex::new),
        (0u32..10_000).prop_map(f64::from).prop_filter_map("integral", |n| {
            StepIndex::try_from(Number::from_f64(n)?).ok()
        }),
        Just(1e20).prop_filter_map("integral", |n| {
            StepIndex::try_from(Number::from_f64(n)?).ok()
        }),
    ]
}

fn status() -> impl Strategy<Value = ProgressStatus> {
    prop_oneof![
        Just(ProgressStatus::Pending),
        Just(ProgressStatus::Running),
        Just(ProgressStatus::Blocked),
        Just(ProgressStatus::Complete),
    ]
}

fn progress_body() -> impl Strategy<Value = ProgressBody> {
    (
        status(),
        text(),
        proptest::option::of(0.0f64..=1.0),
        proptest::option::of(step()),
        proptest::option::of(object()),
    )
        .prop_map(|(status, message, progress, step, details)| {
            let mut body = ProgressBody::new(status, message);
            body.progress = progress.map(|p| Fraction::new(p).unwrap());
            body.step = step;
            body.details = details;
            body
        })
}

fn action_body() -> impl Strategy<Value = ActionBody> {
    (
        "[a-z_]{1,12}",
        json_value(),
        proptest::option::of(text()),
        proptest::option::of(text()),
        proptest::option::of(any::<bool>()),
    )
        .prop_map(|(name, input, id, reason, expect_reply)| {
            let mut body = ActionBody::new(name, input);
            body.id = id;
            body.reason = reason;
            body.expect_reply = expect_reply;
            body
        })
}

fn final_body() -> impl Strategy<Value = FinalBody> {
    (
        text(),
        proptest::option::of(non_empty()),
        proptest::option::of(prop::collection::vec(text(), 0..3)),
        proptest::option::of(object()),
    )
        .prop_map(|(message, error, citations, data)| {
            let mut body = match error {
                Some(error) => FinalBody::failure(message, error),
                None => FinalBody::success(message),
            };
            if let Some(citations) = citations {
                body = body.with_citations(citations);
            }
            if let Some(data) = data {
                body = body.with_data(data);
            }
            body
        })
}

fn metadata_value() -> impl Strategy<Value = MetadataValue> {
    prop_oneof![
        any::<bool>().prop_map(MetadataValue::from),
        any::<i64>().prop_map(|n| MetadataValue::Number(Number::from(n))),
        text().prop_map(MetadataValue::from),
    ]
}

fn agent_envelope() -> impl Strategy<Value = AgentEnvelope> {
    let body = prop_oneof![
        progress_body().prop_map(Body::from),
        action_body().prop_map(Body::from),
        final_body().prop_map(Body::from),
    ];
    (
        non_empty(),
        timestamp(),
        body,
        proptest::option::of(prop::collection::btree_map("[a-z]{1,8}", metadata_value(), 0..4)),
    )
        .prop_map(|(id, timestamp, body, metadata)| {
            let mut envelope = Envelope::new(id, body).with_timestamp(timestamp);
            envelope.metadata = metadata;
            envelope
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: whatever the typed surface can hold, the schema accepts and parses back.
    #[test]
    fn prop_typed_envelopes_round_trip(envelope in agent_envelope()) {
        let value = serde_json::to_value(&envelope).unwrap();
        let report = schema().validate(&value);
        prop_assert!(report.is_valid(), "{} rejected: {}", value, report);

        let parsed = schema().parse(&value).unwrap();
        prop_assert_eq!(&parsed, &envelope);
        prop_assert_eq!(serde_json::to_value(&parsed).unwrap(), value);
    }

    /// Property: every progress value in [0, 1] is accepted on both sides.
    #[test]
    fn prop_progress_in_unit_interval_is_accepted(
        progress in 0.0f64..=1.0,
        body in progress_body(),
        id in non_empty(),
        timestamp in timestamp(),
    ) {
        let body = body.with_progress(Fraction::new(progress).unwrap());
        let envelope = Envelope::new(id, body).with_timestamp(timestamp);
        let value = serde_json::to_value(&envelope).unwrap();

        prop_assert!(schema().is_valid(&value), "{}", value);
        prop_assert!(schema().parse(&value).is_ok());
    }

    /// Property: progress outside [0, 1] is refused on both sides.
    #[test]
    fn prop_progress_outside_unit_interval_is_rejected(
        progress in prop_oneof![-1.0e6f64..-1.0e-9, 1.000_000_001f64..1.0e6],
        envelope in agent_envelope(),
    ) {
        prop_assert!(Fraction::new(progress).is_err());

        let mut value = serde_json::to_value(&envelope).unwrap();
        value["kind"] = Value::from("progress");
        value["body"] = serde_json::json!({"status": "running", "message": "m", "progress": progress});

        let report = schema().validate(&value);
        prop_assert!(report.has(|rule| *rule == Rule::OutOfRange), "{}", report);
        prop_assert!(serde_json::from_value::<AgentEnvelope>(value).is_err());
    }

    /// Property: an unknown key in any closed object is rejected on both sides.
    #[test]
    fn prop_unknown_field_is_rejected_at_every_closed_level(
        envelope in agent_envelope(),
        in_body in any::<bool>(),
        key in "unexpected_[a-z]{1,6}",
        extra in leaf(),
    ) {
        let mut value = serde_json::to_value(&envelope).unwrap();
        let (target, path) = if in_body {
            (&mut value["body"], format!("/body/{}", key))
        } else {
            (&mut value, format!("/{}", key))
        };
        target.as_object_mut().unwrap().insert(key.clone(), extra);

        let report = schema().validate(&value);
        prop_assert!(
            report
                .at(&path)
                .any(|v| matches!(&v.rule, Rule::UnknownField { field } if *field == key)),
            "{} not reported in {}",
            path,
            report
        );
        prop_assert!(serde_json::from_value::<AgentEnvelope>(value).is_err());
    }
}
