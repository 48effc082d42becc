//! Property-based tests for the event-sourced experiment model
//!
//! - Test derivation invariants over arbitrary event logs
//! - Test data integrity across serialization
//! - Run with ProptestConfig::with_cases(100)

use kepler::experiment::{Experiment, ExperimentCollection, ExperimentStatus, LogEvent, LogKind};
use proptest::prelude::*;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Generate one event appended after the initial Start.
fn arb_event() -> impl Strategy<Value = LogEvent> {
    let key = prop::sample::select(vec!["lr", "acc", "loss", "epochs"]);
    prop_oneof![
        (key.clone(), -1000i64..1000).prop_map(|(k, v)| LogEvent::metric(k, v)),
        (key.clone(), "[a-z]{1,6}").prop_map(|(k, v)| LogEvent::config(k, v)),
        prop::sample::select(vec!["cv", "nlp", "baseline"]).prop_map(|t| LogEvent::tag(t)),
        (key, "[a-z]{1,6}").prop_map(|(k, p)| LogEvent::artifact(k, format!("/tmp/{p}.csv"))),
        (1u64..100, 1u64..100)
            .prop_map(|(c, t)| LogEvent::progress(c, t, "").expect("total is non-zero")),
        "[a-z ]{0,12}".prop_map(|m| LogEvent::info(m)),
        "[a-z ]{0,12}".prop_map(|m| LogEvent::warning(m)),
        "[a-z ]{1,12}".prop_map(|m| LogEvent::error(m, None)),
        prop_oneof![
            Just("Experiment completed".to_string()),
            Just("Experiment interrupted".to_string()),
            "[a-z ]{0,12}",
        ]
        .prop_map(|m| LogEvent::end(m)),
    ]
}

/// Generate an experiment with a Start followed by arbitrary events.
fn arb_experiment(id: &'static str) -> impl Strategy<Value = Experiment> {
    prop::collection::vec(arb_event(), 0..40).prop_map(move |events| {
        let mut experiment = Experiment::new(id, format!("{id}-name"));
        for event in events {
            experiment.push(event);
        }
        experiment
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: status is ERROR iff the log holds at least one Error event
    #[test]
    fn prop_status_error_iff_error_event(exp in arb_experiment("p1")) {
        let has_error = exp.events().iter().any(|e| e.kind() == LogKind::Error);
        prop_assert_eq!(exp.status() == ExperimentStatus::Error, has_error);
    }

    /// Property: without End/Error events the experiment is RUNNING
    #[test]
    fn prop_no_terminal_event_means_running(exp in arb_experiment("p2")) {
        let terminal = exp
            .events()
            .iter()
            .any(|e| matches!(e.kind(), LogKind::End | LogKind::Error));
        if !terminal {
            prop_assert_eq!(exp.status(), ExperimentStatus::Running);
            prop_assert!(exp.end_time().is_none());
        }
    }

    /// Property: tags are unique and add_tag never grows an existing tag set
    #[test]
    fn prop_tags_unique(mut exp in arb_experiment("p3"), tag in "[a-z]{1,4}") {
        let tags: Vec<String> = exp.tags().into_iter().map(String::from).collect();
        let mut deduped = tags.clone();
        deduped.sort();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), tags.len());

        exp.add_tag(tag.clone());
        let once = exp.tags().len();
        exp.add_tag(tag);
        prop_assert_eq!(exp.tags().len(), once);
    }

    /// Property: setting a config key or metric twice keeps the last value
    #[test]
    fn prop_last_writer_wins(
        mut exp in arb_experiment("p4"),
        first in -1000i64..1000,
        second in -1000i64..1000,
    ) {
        exp.set_config("lr", first);
        exp.set_config("lr", second);
        exp.set_metric("acc", first);
        exp.set_metric("acc", second);
        prop_assert_eq!(&exp.config()["lr"], &serde_json::json!(second));
        prop_assert_eq!(&exp.metrics()["acc"], &serde_json::json!(second));
    }

    /// Property: serialization round-trip preserves every derived attribute
    #[test]
    fn prop_round_trip_preserves_derived_values(
        a in arb_experiment("p5-a"),
        b in arb_experiment("p5-b"),
    ) {
        let collection: ExperimentCollection = vec![a, b].into_iter().collect();
        let json = serde_json::to_string(&collection).unwrap();
        let restored: ExperimentCollection = serde_json::from_str(&json).unwrap();

        prop_assert_eq!(restored.count(), collection.count());
        for original in collection.iter() {
            let copy = restored.get(original.id()).unwrap();
            prop_assert_eq!(copy.status(), original.status());
            prop_assert_eq!(copy.config(), original.config());
            prop_assert_eq!(copy.metrics(), original.metrics());
            prop_assert_eq!(copy.tags(), original.tags());
            prop_assert_eq!(copy.artifacts(), original.artifacts());
            prop_assert_eq!(copy.progress(), original.progress());
        }
    }

    /// Property: sorting is a permutation and reverse flips only the comparison
    #[test]
    fn prop_sort_is_permutation(
        a in arb_experiment("p6-a"),
        b in arb_experiment("p6-b"),
        c in arb_experiment("p6-c"),
        field in prop::sample::select(vec!["id", "name", "status", "start_time", "end_time"]),
    ) {
        let collection: ExperimentCollection = vec![a, b, c].into_iter().collect();
        let forward: Vec<&str> = collection.sort_by(field, false).unwrap().into_iter().map(Experiment::id).collect();
        let backward: Vec<&str> = collection.sort_by(field, true).unwrap().into_iter().map(Experiment::id).collect();

        let mut sorted = forward.clone();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, vec!["p6-a", "p6-b", "p6-c"]);
        prop_assert_eq!(backward.len(), forward.len());
    }
}
