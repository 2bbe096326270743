//! Evaluate filter terms against experiments and runs.
//!
//! Built-in attribute names accept a handful of aliases (underscores,
//! spaces, mixed case) so `run_name`, `run name` and `Run Name` all refer
//! to the same field.

use track_core::{Experiment, Run};

use crate::filter::{Field, Filter, Literal, Op, Term};

/// A resolved attribute or leaf value, typed so comparisons know whether
/// to compare numerically or lexically.
enum Value<'a> {
    Str(std::borrow::Cow<'a, str>),
    Num(f64),
    Missing,
}

fn canonical_attr(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace(' ', "_")
}

fn experiment_attribute<'a>(exp: &'a Experiment, name: &str) -> Value<'a> {
    match canonical_attr(name).as_str() {
        "experiment_id" | "id" => Value::Str(exp.experiment_id.as_str().into()),
        "name" | "experiment_name" => Value::Str(exp.name.as_str().into()),
        "artifact_location" => Value::Str(exp.artifact_location.as_str().into()),
        "lifecycle_stage" => Value::Str(exp.lifecycle_stage.as_str().into()),
        "creation_time" | "created" => exp.creation_time.map(|v| Value::Num(v as f64)).unwrap_or(Value::Missing),
        "last_update_time" | "updated" => {
            exp.last_update_time.map(|v| Value::Num(v as f64)).unwrap_or(Value::Missing)
        }
        _ => Value::Missing,
    }
}

fn run_attribute<'a>(run: &'a Run, name: &str) -> Value<'a> {
    match canonical_attr(name).as_str() {
        "run_id" | "run_uuid" | "id" => Value::Str(run.info.run_id.as_str().into()),
        "run_name" => Value::Str(run.info.run_name.as_str().into()),
        "experiment_id" => Value::Str(run.info.experiment_id.as_str().into()),
        "user_id" => Value::Str(run.info.user_id.as_str().into()),
        "status" => Value::Str(run.info.status.as_str().into()),
        "start_time" | "created" => Value::Num(run.info.start_time as f64),
        "end_time" => run.info.end_time.map(|v| Value::Num(v as f64)).unwrap_or(Value::Missing),
        "artifact_uri" => Value::Str(run.info.artifact_uri.as_str().into()),
        "lifecycle_stage" => Value::Str(run.info.lifecycle_stage.as_str().into()),
        _ => Value::Missing,
    }
}

fn resolve_value<'a>(
    field: &Field,
    exp: Option<&'a Experiment>,
    run: Option<&'a Run>,
) -> Value<'a> {
    match field {
        Field::Attribute(name) => match (exp, run) {
            (Some(e), _) => experiment_attribute(e, name),
            (_, Some(r)) => run_attribute(r, name),
            _ => Value::Missing,
        },
        Field::Tag(key) => {
            let tags = exp.map(|e| &e.tags).or_else(|| run.map(|r| &r.data.tags));
            match tags.and_then(|t| t.get(key)) {
                Some(v) => Value::Str(v.as_str().into()),
                None => Value::Missing,
            }
        }
        Field::Param(key) => match run.and_then(|r| r.data.params.get(key)) {
            Some(v) => Value::Str(v.as_str().into()),
            None => Value::Missing,
        },
        Field::Metric(key) => match run.and_then(|r| r.data.metrics.get(key)) {
            Some(v) => Value::Num(*v),
            None => Value::Missing,
        },
    }
}

fn like_match(text: &str, pattern: &str, case_insensitive: bool) -> bool {
    let (text, pattern) = if case_insensitive {
        (text.to_ascii_lowercase(), pattern.to_ascii_lowercase())
    } else {
        (text.to_string(), pattern.to_string())
    };
    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() == 1 {
        return text == pattern;
    }
    let mut pos = 0usize;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            if !text[pos..].starts_with(part) {
                return false;
            }
            pos += part.len();
        } else if i == parts.len() - 1 {
            return text[pos..].ends_with(part);
        } else {
            match text[pos..].find(part) {
                Some(found) => pos += found + part.len(),
                None => return false,
            }
        }
    }
    true
}

fn eval_term(term: &Term, exp: Option<&Experiment>, run: Option<&Run>) -> bool {
    match term {
        Term::Compare { field, op, literal } => {
            let value = resolve_value(field, exp, run);
            match (&value, literal, op) {
                (Value::Missing, _, _) => false,
                (Value::Str(v), Literal::Str(l), Op::Like) => like_match(v, l, false),
                (Value::Str(v), Literal::Str(l), Op::ILike) => like_match(v, l, true),
                (Value::Str(v), Literal::Str(l), Op::Eq) => v.as_ref() == l,
                (Value::Str(v), Literal::Str(l), Op::Ne) => v.as_ref() != l,
                (Value::Str(v), Literal::Str(l), Op::Lt) => v.as_ref() < l.as_str(),
                (Value::Str(v), Literal::Str(l), Op::Le) => v.as_ref() <= l.as_str(),
                (Value::Str(v), Literal::Str(l), Op::Gt) => v.as_ref() > l.as_str(),
                (Value::Str(v), Literal::Str(l), Op::Ge) => v.as_ref() >= l.as_str(),
                (Value::Num(v), Literal::Num(l), Op::Eq) => v == l,
                (Value::Num(v), Literal::Num(l), Op::Ne) => v != l,
                (Value::Num(v), Literal::Num(l), Op::Lt) => v < l,
                (Value::Num(v), Literal::Num(l), Op::Le) => v <= l,
                (Value::Num(v), Literal::Num(l), Op::Gt) => v > l,
                (Value::Num(v), Literal::Num(l), Op::Ge) => v >= l,
                // Type mismatch between the stored value and the literal never matches.
                _ => false,
            }
        }
        Term::In { field, values, negated } => {
            let value = resolve_value(field, exp, run);
            let is_member = match value {
                Value::Str(v) => values.iter().any(|candidate| candidate == v.as_ref()),
                Value::Num(v) => values.iter().any(|candidate| candidate.parse::<f64>().map(|c| c == v).unwrap_or(false)),
                Value::Missing => false,
            };
            is_member != *negated
        }
    }
}

/// Does `filter` match this experiment?
pub fn matches_experiment(filter: &Filter, exp: &Experiment) -> bool {
    filter.0.iter().all(|t| eval_term(t, Some(exp), None))
}

/// Does `filter` match this run?
pub fn matches_run(filter: &Filter, run: &Run) -> bool {
    filter.0.iter().all(|t| eval_term(t, None, Some(run)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use track_core::{LifecycleStage, RunData, RunInfo, RunStatus};

    fn exp() -> Experiment {
        Experiment {
            experiment_id: "1".to_string(),
            name: "my-exp".to_string(),
            artifact_location: "file:///tmp".to_string(),
            lifecycle_stage: LifecycleStage::Active,
            creation_time: Some(100),
            last_update_time: Some(200),
            tags: HashMap::from([("team".to_string(), "ml".to_string())]),
        }
    }

    fn run() -> Run {
        Run {
            info: RunInfo {
                run_id: "r1".to_string(),
                experiment_id: "1".to_string(),
                run_name: "happy-otter-001".to_string(),
                user_id: "alice".to_string(),
                status: RunStatus::Finished,
                start_time: 1000,
                end_time: Some(2000),
                deleted_time: None,
                artifact_uri: "file:///tmp/r1/artifacts".to_string(),
                lifecycle_stage: LifecycleStage::Active,
            },
            data: RunData {
                params: HashMap::from([("lr".to_string(), "0.01".to_string())]),
                tags: HashMap::new(),
                metrics: HashMap::from([("acc".to_string(), 0.95)]),
            },
        }
    }

    #[test]
    fn like_with_wildcard_prefix_and_suffix() {
        let f = Filter::parse("name LIKE 'my-%'").unwrap();
        assert!(matches_experiment(&f, &exp()));
        let f = Filter::parse("name LIKE '%-exp'").unwrap();
        assert!(matches_experiment(&f, &exp()));
        let f = Filter::parse("name LIKE 'other'").unwrap();
        assert!(!matches_experiment(&f, &exp()));
    }

    #[test]
    fn ilike_is_case_insensitive() {
        let f = Filter::parse("name ILIKE 'MY-EXP'").unwrap();
        assert!(matches_experiment(&f, &exp()));
    }

    #[test]
    fn tag_equality() {
        let f = Filter::parse("tags.team = 'ml'").unwrap();
        assert!(matches_experiment(&f, &exp()));
    }

    #[test]
    fn metric_numeric_comparison() {
        let f = Filter::parse("metrics.acc > 0.9").unwrap();
        assert!(matches_run(&f, &run()));
        let f = Filter::parse("metrics.acc > 0.99").unwrap();
        assert!(!matches_run(&f, &run()));
    }

    #[test]
    fn missing_field_never_matches() {
        let f = Filter::parse("params.missing = 'x'").unwrap();
        assert!(!matches_run(&f, &run()));
    }

    #[test]
    fn type_mismatch_never_matches() {
        let f = Filter::parse("metrics.acc = 'not-a-number'").unwrap();
        assert!(!matches_run(&f, &run()));
    }

    #[test]
    fn in_list_membership() {
        let f = Filter::parse("attribute.status IN ('FINISHED','FAILED')").unwrap();
        assert!(matches_run(&f, &run()));
        let f = Filter::parse("attribute.status NOT IN ('FINISHED','FAILED')").unwrap();
        assert!(!matches_run(&f, &run()));
    }

    #[test]
    fn attribute_alias_with_space_and_case() {
        let f = Filter::parse("`Run Name` = 'happy-otter-001'").unwrap();
        assert!(matches_run(&f, &run()));
    }

    #[test]
    fn conjunction_requires_all_terms() {
        let f = Filter::parse("metrics.acc > 0.9 AND params.lr = '0.02'").unwrap();
        assert!(!matches_run(&f, &run()));
    }
}
