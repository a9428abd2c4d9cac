//! Property tests for DynamicRecord
//!
//! Round-trip through JSON text and bytes, rejection of non-transferable
//! values, and the laws of `has_same_defined_properties_as`.

use crashlens_core::domain::{DynamicRecord, ValueMap, ValueNode};
use proptest::prelude::*;

fn leaf() -> impl Strategy<Value = ValueNode> {
    prop_oneof![
        Just(ValueNode::Null),
        any::<bool>().prop_map(ValueNode::Bool),
        any::<i64>().prop_map(ValueNode::Integer),
        (-1.0e9f64..1.0e9f64).prop_map(ValueNode::Float),
        prop::num::f64::NORMAL.prop_map(ValueNode::Float),
        "[a-zA-Z0-9 _\\-]{0,12}".prop_map(ValueNode::String),
    ]
}

fn value() -> impl Strategy<Value = ValueNode> {
    leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(ValueNode::Array),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..6)
                .prop_map(|pairs| ValueNode::Object(pairs.into_iter().collect())),
        ]
    })
}

fn object_seed() -> impl Strategy<Value = ValueMap> {
    prop::collection::vec(("[a-z]{1,6}", value()), 0..8)
        .prop_map(|pairs| pairs.into_iter().collect())
}

proptest! {
    #[test]
    fn object_round_trip_through_text(seed in object_seed()) {
        let record = DynamicRecord::from_map(seed).unwrap();
        let back = DynamicRecord::from_json_str(&record.to_json_string()).unwrap();
        prop_assert_eq!(&record, &back);
        prop_assert!(record.has_same_defined_properties_as(&back));
    }

    #[test]
    fn array_round_trip_preserves_order(items in prop::collection::vec(value(), 0..8)) {
        let record = DynamicRecord::from_array(items.clone()).unwrap();
        let back = DynamicRecord::from_json_bytes(&record.to_json_bytes()).unwrap();
        prop_assert_eq!(back.root(), &ValueNode::Array(items));
    }

    #[test]
    fn non_transferable_property_is_rejected(seed in object_seed(), key in "[a-z]{1,6}") {
        let mut poisoned = seed;
        poisoned.insert(key.clone(), ValueNode::Array(vec![ValueNode::Float(f64::NAN)]));
        let err = DynamicRecord::from_map(poisoned).unwrap_err();
        prop_assert!(err.is_schema_error());

        let mut record = DynamicRecord::new();
        prop_assert!(record.set(key, f64::INFINITY).unwrap_err().is_schema_error());
    }

    #[test]
    fn same_defined_properties_is_reflexive_and_symmetric(a in object_seed(), b in object_seed()) {
        let ra = DynamicRecord::from_map(a).unwrap();
        let rb = DynamicRecord::from_map(b).unwrap();
        prop_assert!(ra.has_same_defined_properties_as(&ra));
        prop_assert_eq!(
            ra.has_same_defined_properties_as(&rb),
            rb.has_same_defined_properties_as(&ra)
        );
    }

    #[test]
    fn changing_values_never_changes_schema_equality(
        a in object_seed(),
        b in object_seed(),
        replacement in leaf(),
    ) {
        let ra = DynamicRecord::from_map(a).unwrap();
        let rb = DynamicRecord::from_map(b).unwrap();
        let before = ra.has_same_defined_properties_as(&rb);

        let mut changed = ra.clone();
        let names: Vec<String> = changed.defined_properties().iter().map(|s| s.to_string()).collect();
        for name in names {
            changed.set(name, replacement.clone()).unwrap();
        }
        prop_assert_eq!(changed.has_same_defined_properties_as(&rb), before);
    }
}

#[test]
fn empty_seed_forms() {
    assert!(DynamicRecord::new().is_empty());
    assert!(DynamicRecord::from_map(ValueMap::new()).unwrap().is_empty());
    assert!(DynamicRecord::from_array(Vec::new()).unwrap().is_empty());
    assert!(!DynamicRecord::from_json_str(r#"{"only": null}"#).unwrap().is_empty());
}

#[test]
fn float_survives_text_round_trip_exactly() {
    for f in [12213.595358316383, 0.1 + 0.2, f64::MIN_POSITIVE, 1.7976931348623157e308, -5e-324] {
        let record = DynamicRecord::from_array(vec![ValueNode::Float(f)]).unwrap();
        let text = record.to_json_string();
        let back = DynamicRecord::from_json_str(&text).unwrap();
        assert_eq!(back, record, "{f} serialized as {text}");
    }
}
