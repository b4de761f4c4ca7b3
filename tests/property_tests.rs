//! Property-based tests for gcloud-log-handler using proptest

use gcloud_log_handler::core::PayloadTree;
use gcloud_log_handler::prelude::*;
use proptest::prelude::*;
use serde_json::Value;
use std::sync::Arc;

fn named_level() -> impl Strategy<Value = Level> {
    prop_oneof![
        Just(Level::DEBUG),
        Just(Level::INFO),
        Just(Level::NOTICE),
        Just(Level::WARN),
        Just(Level::ERROR),
        Just(Level::CRITICAL),
        Just(Level::ALERT),
        Just(Level::EMERGENCY),
    ]
}

// ============================================================================
// Level Tests
// ============================================================================

proptest! {
    /// Display output parses back to the same level
    #[test]
    fn test_level_display_roundtrip(n in -1000i32..1000) {
        let level = Level::new(n);
        let parsed: Level = level.to_string().parse().unwrap();
        prop_assert_eq!(level, parsed);
    }

    /// Level names are accepted in any case
    #[test]
    fn test_level_case_insensitive(level in named_level(), use_lower in any::<bool>()) {
        let name = level.to_string();
        let input = if use_lower { name.to_lowercase() } else { name };
        prop_assert_eq!(input.parse::<Level>().unwrap(), level);
    }

    /// Integers parse to the level with that value
    #[test]
    fn test_level_from_integer(n in any::<i32>()) {
        prop_assert_eq!(n.to_string().parse::<Level>().unwrap(), Level::new(n));
    }
}

// ============================================================================
// Severity Tests
// ============================================================================

proptest! {
    /// Higher levels never map to lower severities
    #[test]
    fn test_severity_monotonic(a in any::<i32>(), b in any::<i32>()) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            Severity::from_level(Level::new(low)) <= Severity::from_level(Level::new(high))
        );
    }

    /// Named levels map onto named severities
    #[test]
    fn test_named_levels_have_names(level in named_level()) {
        prop_assert!(Severity::from_level(level).name().is_some());
    }
}

// ============================================================================
// Payload Tests
// ============================================================================

proptest! {
    /// Deriving a child never changes the parent tree
    #[test]
    fn test_payload_copy_on_write(
        keys in prop::collection::vec("[a-z]{1,6}", 1..8),
        group in "[a-z]{1,6}",
    ) {
        let parent = PayloadTree::new()
            .with_attrs(vec![Attribute::string("base", "v")], None)
            .with_group(&group);
        let snapshot = parent.clone();

        let attrs: Vec<Attribute> = keys.iter().map(|k| Attribute::string(k.clone(), "x")).collect();
        let child = parent.with_attrs(attrs, None);

        prop_assert_eq!(&parent, &snapshot);
        prop_assert_eq!(child.groups(), parent.groups());
    }

    /// Any message survives the trip through the JSON entry
    #[test]
    fn test_message_preserved(message in any::<String>()) {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::new(CloudHandler::new(sink.clone()));
        logger.info(message.clone(), []);

        let json: Value = serde_json::from_str(&sink.entries()[0].to_json().unwrap()).unwrap();
        prop_assert_eq!(json["message"].as_str().unwrap(), message.as_str());
    }

    /// Attributes logged under a group end up under that group
    #[test]
    fn test_group_nesting(
        groups in prop::collection::vec("[a-z]{1,6}", 1..4),
        value in any::<i32>(),
    ) {
        let sink = Arc::new(MemorySink::new());
        let mut logger = Logger::new(CloudHandler::new(sink.clone()));
        for group in &groups {
            logger = logger.with_group(group);
        }
        logger.info("nested", [Attribute::int("v", i64::from(value))]);

        let json: Value = serde_json::from_str(&sink.entries()[0].to_json().unwrap()).unwrap();
        let mut current = &json;
        for group in &groups {
            current = &current[group.as_str()];
        }
        prop_assert_eq!(current["v"].as_f64().unwrap(), f64::from(value));
    }
}

// ============================================================================
// Label Tests
// ============================================================================

proptest! {
    /// The innermost scope wins for every key
    #[test]
    fn test_inner_labels_win(
        key in "[a-z]{1,8}",
        outer in "[a-z0-9]{0,8}",
        inner in "[a-z0-9]{0,8}",
    ) {
        let ctx = Context::background()
            .with_labels([(key.clone(), outer)])
            .with_labels([(key.clone(), inner.clone())]);
        let labels = ctx.labels();
        prop_assert_eq!(labels.get(&key), Some(&inner));
    }
}
