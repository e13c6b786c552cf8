//! Questionnaire rules: answers in, flags and scores out.

use std::collections::{BTreeMap, BTreeSet};

use bizdiag_config::{Condition, ConditionOp, QuestionnaireRule, ScoreAction, ScoreMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Answers keyed by question id. A `null` answer counts as unanswered.
pub type Answers = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireOutcome {
    pub flags: BTreeSet<String>,
    pub scores: BTreeMap<String, f64>,
}

impl QuestionnaireOutcome {
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.scores.is_empty()
    }
}

fn answer<'a>(answers: &'a Answers, question: &str) -> Option<&'a Value> {
    answers.get(question).filter(|value| !value.is_null())
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn loosely_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn condition_holds(condition: &Condition, answers: &Answers) -> bool {
    let Some(response) = answer(answers, &condition.q) else {
        return false;
    };
    let expected = &condition.value;
    match condition.op {
        ConditionOp::Exists => true,
        ConditionOp::Equals => loosely_equal(response, expected),
        ConditionOp::Contains => match (response, expected) {
            (Value::Array(items), _) => items.iter().any(|item| loosely_equal(item, expected)),
            (Value::String(text), Value::String(needle)) => text.contains(needle.as_str()),
            _ => false,
        },
        ConditionOp::In => expected
            .as_array()
            .is_some_and(|options| options.iter().any(|option| loosely_equal(option, response))),
        ConditionOp::Lte => match (as_number(response), as_number(expected)) {
            (Some(actual), Some(limit)) => actual <= limit,
            _ => false,
        },
        ConditionOp::Gte => match (as_number(response), as_number(expected)) {
            (Some(actual), Some(limit)) => actual >= limit,
            _ => false,
        },
        ConditionOp::Regex => condition
            .pattern()
            .is_some_and(|pattern| pattern.is_match(&as_text(response))),
        ConditionOp::ArrayFirst => response
            .as_array()
            .and_then(|items| items.first())
            .is_some_and(|first| loosely_equal(first, expected)),
    }
}

fn score(action: &ScoreAction, answers: &Answers) -> Option<f64> {
    let value = as_number(answer(answers, &action.from)?)?;
    match action.map {
        ScoreMap::Identity => Some(value),
        ScoreMap::Likert1To5 => (1.0..=5.0)
            .contains(&value)
            .then(|| (value - 1.0) / 4.0),
    }
}

/// Applies every rule whose conditions all hold. Rules without conditions
/// never fire.
pub fn evaluate(rules: &[QuestionnaireRule], answers: &Answers) -> QuestionnaireOutcome {
    let mut outcome = QuestionnaireOutcome::default();
    if answers.is_empty() {
        return outcome;
    }
    for rule in rules {
        if rule.when.is_empty() || !rule.when.iter().all(|condition| condition_holds(condition, answers)) {
            continue;
        }
        outcome.flags.extend(rule.then.add_flags.iter().cloned());
        if let Some(action) = &rule.then.set_score
            && let Some(value) = score(action, answers)
        {
            outcome.scores.insert(action.key.clone(), value);
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use bizdiag_config::RuleAction;
    use serde_json::json;

    use super::*;

    fn rule(q: &str, op: ConditionOp, value: Value, flag: &str) -> QuestionnaireRule {
        QuestionnaireRule {
            id: None,
            when: vec![Condition::new(q, op, value).unwrap()],
            then: RuleAction {
                add_flags: vec![flag.to_string()],
                set_score: None,
            },
        }
    }

    fn answers(value: Value) -> Answers {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn every_operator() {
        let given = answers(json!({
            "close": "no",
            "tool": "spreadsheet",
            "channels": ["instagram", "radio"],
            "notes": "we close books quarterly",
            "seats": "40",
            "turnover": 3
        }));
        let rules = vec![
            rule("close", ConditionOp::Equals, json!("no"), "equals"),
            rule("tool", ConditionOp::In, json!(["paper", "spreadsheet"]), "in"),
            rule("channels", ConditionOp::Contains, json!("radio"), "contains"),
            rule("notes", ConditionOp::Contains, json!("quarterly"), "contains_text"),
            rule("channels", ConditionOp::ArrayFirst, json!("instagram"), "array_first"),
            rule("notes", ConditionOp::Regex, json!("^we close"), "regex"),
            rule("seats", ConditionOp::Gte, json!(40), "gte"),
            rule("turnover", ConditionOp::Lte, json!(2), "lte_miss"),
            rule("missing", ConditionOp::Exists, Value::Null, "exists_miss"),
            rule("turnover", ConditionOp::Equals, json!(3.0), "numeric_equals"),
        ];
        let outcome = evaluate(&rules, &given);
        let flags: Vec<&str> = outcome.flags.iter().map(String::as_str).collect();
        assert_eq!(
            flags,
            vec!["array_first", "contains", "contains_text", "equals", "gte", "in", "numeric_equals", "regex"]
        );
    }

    #[test]
    fn likert_scores_map_to_unit_interval() {
        let scoring = QuestionnaireRule {
            id: Some("staffing".into()),
            when: vec![Condition::new("difficulty", ConditionOp::Exists, Value::Null).unwrap()],
            then: RuleAction {
                add_flags: Vec::new(),
                set_score: Some(ScoreAction {
                    key: "staffing_pressure".into(),
                    from: "difficulty".into(),
                    map: ScoreMap::Likert1To5,
                }),
            },
        };
        let outcome = evaluate(std::slice::from_ref(&scoring), &answers(json!({"difficulty": 4})));
        assert_eq!(outcome.scores.get("staffing_pressure"), Some(&0.75));

        let outcome = evaluate(&[scoring], &answers(json!({"difficulty": 9})));
        assert!(outcome.scores.is_empty());
    }

    #[test]
    fn null_answers_are_unanswered() {
        let rules = vec![rule("close", ConditionOp::Exists, Value::Null, "answered")];
        assert!(evaluate(&rules, &answers(json!({"close": null}))).is_empty());
        assert!(evaluate(&rules, &Answers::new()).is_empty());
    }
}
