// ABOUTME: Integration tests for resilient model JSON parsing
// ABOUTME: Realistic malformed outputs and a truncation sweep over a full weekly plan document
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use fitplan_core::models::{DraftPlan, MacroTargets};
use fitplan_engine::plans::{parse_model_json, RepairStage};
use fitplan_engine::test_utils::sample_plan_json;
use serde_json::{json, Value};

fn targets() -> MacroTargets {
    MacroTargets {
        total_kcal: 2_300,
        protein_g: 150,
        carbs_g: 260,
        fat_g: 72,
    }
}

/// Whether `recovered` could have come from cutting `original` short
fn is_truncation_of(recovered: &Value, original: &Value) -> bool {
    match (recovered, original) {
        (Value::Null, _) => true,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => b.starts_with(a.as_str()),
        (Value::Array(a), Value::Array(b)) => {
            a.len() <= b.len() && a.iter().zip(b).all(|(x, y)| is_truncation_of(x, y))
        }
        (Value::Object(a), Value::Object(b)) => a
            .iter()
            .all(|(key, value)| b.get(key).is_some_and(|orig| is_truncation_of(value, orig))),
        _ => false,
    }
}

#[test]
fn test_full_plan_parses_directly() {
    let text = sample_plan_json(targets());
    let recovered = parse_model_json(&text).unwrap();
    assert_eq!(recovered.stage, RepairStage::Direct);
    let draft = DraftPlan::from_value(&recovered.value);
    assert!(draft.missing_days().is_empty());
}

#[test]
fn test_truncation_never_invents_content() {
    let text = sample_plan_json(targets());
    let original: Value = serde_json::from_str(&text).unwrap();

    let mut recovered_count = 0;
    for (cut, _) in text.char_indices().skip(1) {
        let prefix = &text[..cut];
        let Ok(recovered) = parse_model_json(prefix) else {
            continue;
        };
        recovered_count += 1;
        assert!(
            is_truncation_of(&recovered.value, &original),
            "prefix of {cut} bytes recovered to content not in the original: {}",
            recovered.value
        );
    }
    assert!(recovered_count > text.len() / 2);
}

#[test]
fn test_truncated_plan_keeps_completed_days() {
    let text = sample_plan_json(targets());
    let recovered = parse_model_json(&text[..text.len() / 2]).unwrap();
    assert_eq!(recovered.stage, RepairStage::Recovered);

    let draft = DraftPlan::from_value(&recovered.value);
    let complete = draft
        .days
        .values()
        .filter(|day| day.workout.is_some() && day.nutrition.is_some() && day.recovery.is_some())
        .count();
    assert!(complete >= 2, "only {complete} complete days survived");
    assert!(!draft.missing_days().is_empty());
    for day in draft.days.values().filter_map(|day| day.nutrition.as_ref()) {
        assert!(day.total_kcal == 0 || day.total_kcal == targets().total_kcal);
    }
}

#[test]
fn test_chatty_python_style_output_is_repaired() {
    let text = "Sure! Here is the plan you asked for:\n```json\n{\n  days: {\n    'monday': {'rationale': 'Easy start', 'workout': None,},\n  },\n}\n```\nLet me know if you want changes.";
    let recovered = parse_model_json(text).unwrap();
    assert_eq!(recovered.stage, RepairStage::Repaired);
    assert_eq!(
        recovered.value,
        json!({"days": {"monday": {"rationale": "Easy start", "workout": null}}})
    );
}

#[test]
fn test_apostrophes_in_rationale_survive_trailing_comma_repair() {
    let text = r#"{
  "monday": {
    "rationale": "Pick one of: 'goblet squat', 'leg press'. Don't rush the eccentric.",
    "nutrition": {"total_kcal": 2300, "meals": [{"name": "Greek yoghurt 'n' berries"},]},
  },
}"#;
    let recovered = parse_model_json(text).unwrap();
    assert_eq!(recovered.stage, RepairStage::Repaired);
    assert_eq!(
        recovered.value,
        json!({"monday": {
            "rationale": "Pick one of: 'goblet squat', 'leg press'. Don't rush the eccentric.",
            "nutrition": {"total_kcal": 2300, "meals": [{"name": "Greek yoghurt 'n' berries"}]}
        }})
    );
}
