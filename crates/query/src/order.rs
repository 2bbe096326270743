//! Ordering: parse `ORDER BY` clauses and sort search results, appending a
//! deterministic id-based tie-break after any caller-supplied terms so
//! result order never depends on directory iteration order.

use std::cmp::Ordering;

use track_core::{Experiment, Run};

use crate::filter::{self, Field};

/// A single `ORDER BY` term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub(crate) field: Field,
    pub(crate) descending: bool,
}

/// Parse a list of `"field [ASC|DESC]"` strings.
pub fn parse_order_by(order_by: &[String]) -> Result<Vec<OrderTerm>, track_core::Error> {
    let mut out = Vec::with_capacity(order_by.len());
    for clause in order_by {
        let clause = clause.trim();
        let (field_str, descending) = if let Some(stripped) = strip_suffix_word(clause, "DESC") {
            (stripped, true)
        } else if let Some(stripped) = strip_suffix_word(clause, "ASC") {
            (stripped, false)
        } else {
            (clause, false)
        };
        out.push(OrderTerm { field: filter::parse_field(field_str.trim())?, descending });
    }
    Ok(out)
}

fn strip_suffix_word<'a>(s: &'a str, word: &str) -> Option<&'a str> {
    if s.len() < word.len() {
        return None;
    }
    let (head, tail) = s.split_at(s.len() - word.len());
    if tail.eq_ignore_ascii_case(word) && head.ends_with(' ') {
        Some(head.trim_end())
    } else {
        None
    }
}

enum Cmp {
    Str(Option<String>),
    Num(Option<f64>),
}

fn exp_key(exp: &Experiment, field: &Field) -> Cmp {
    match field {
        Field::Attribute(name) => match name.to_ascii_lowercase().replace(' ', "_").as_str() {
            "name" => Cmp::Str(Some(exp.name.clone())),
            "creation_time" | "created" => Cmp::Num(exp.creation_time.map(|v| v as f64)),
            "experiment_id" | "id" => Cmp::Str(Some(exp.experiment_id.clone())),
            _ => Cmp::Num(exp.last_update_time.map(|v| v as f64)),
        },
        Field::Tag(key) => Cmp::Str(exp.tags.get(key).cloned()),
        _ => Cmp::Str(None),
    }
}

fn run_key(run: &Run, field: &Field) -> Cmp {
    match field {
        Field::Attribute(name) => match name.to_ascii_lowercase().replace(' ', "_").as_str() {
            "run_name" => Cmp::Str(Some(run.info.run_name.clone())),
            "run_id" | "id" => Cmp::Str(Some(run.info.run_id.clone())),
            "status" => Cmp::Str(Some(run.info.status.as_str().to_string())),
            "end_time" => Cmp::Num(run.info.end_time.map(|v| v as f64)),
            _ => Cmp::Num(Some(run.info.start_time as f64)),
        },
        Field::Tag(key) => Cmp::Str(run.data.tags.get(key).cloned()),
        Field::Param(key) => Cmp::Str(run.data.params.get(key).cloned()),
        Field::Metric(key) => Cmp::Num(run.data.metrics.get(key).copied()),
    }
}

/// Nulls sort last regardless of direction.
fn compare_cmp(a: &Cmp, b: &Cmp, descending: bool) -> Ordering {
    let ord = match (a, b) {
        (Cmp::Str(None), Cmp::Str(None)) | (Cmp::Num(None), Cmp::Num(None)) => return Ordering::Equal,
        (Cmp::Str(None), _) | (Cmp::Num(None), _) => return Ordering::Greater,
        (_, Cmp::Str(None)) | (_, Cmp::Num(None)) => return Ordering::Less,
        (Cmp::Str(x), Cmp::Str(y)) => x.cmp(y),
        (Cmp::Num(x), Cmp::Num(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    };
    if descending {
        ord.reverse()
    } else {
        ord
    }
}

/// Sort experiments by `order_by`, falling back to `last_update_time DESC`
/// then `experiment_id ASC`.
pub fn sort_experiments(items: &mut [Experiment], order_by: &[OrderTerm]) {
    items.sort_by(|a, b| {
        for term in order_by {
            let ord = compare_cmp(&exp_key(a, &term.field), &exp_key(b, &term.field), term.descending);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        b.last_update_time
            .cmp(&a.last_update_time)
            .then_with(|| a.experiment_id.cmp(&b.experiment_id))
    });
}

/// Sort runs by `order_by`, falling back to `start_time DESC` then
/// `run_id ASC`.
pub fn sort_runs(items: &mut [Run], order_by: &[OrderTerm]) {
    items.sort_by(|a, b| {
        for term in order_by {
            let ord = compare_cmp(&run_key(a, &term.field), &run_key(b, &term.field), term.descending);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        b.info
            .start_time
            .cmp(&a.info.start_time)
            .then_with(|| a.info.run_id.cmp(&b.info.run_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use track_core::{LifecycleStage, RunData, RunInfo, RunStatus};

    fn exp(id: &str, updated: i64) -> Experiment {
        Experiment {
            experiment_id: id.to_string(),
            name: id.to_string(),
            artifact_location: "file:///tmp".to_string(),
            lifecycle_stage: LifecycleStage::Active,
            creation_time: Some(0),
            last_update_time: Some(updated),
            tags: HashMap::new(),
        }
    }

    fn run(id: &str, start: i64) -> Run {
        Run {
            info: RunInfo {
                run_id: id.to_string(),
                experiment_id: "1".to_string(),
                run_name: id.to_string(),
                user_id: "u".to_string(),
                status: RunStatus::Running,
                start_time: start,
                end_time: None,
                deleted_time: None,
                artifact_uri: "file:///tmp".to_string(),
                lifecycle_stage: LifecycleStage::Active,
            },
            data: RunData::default(),
        }
    }

    #[test]
    fn default_experiment_order_is_last_update_desc_then_id() {
        let mut items = vec![exp("2", 100), exp("1", 100), exp("3", 50)];
        sort_experiments(&mut items, &[]);
        assert_eq!(
            items.iter().map(|e| e.experiment_id.as_str()).collect::<Vec<_>>(),
            vec!["1", "2", "3"]
        );
    }

    #[test]
    fn default_run_order_is_start_time_desc_then_run_id() {
        let mut items = vec![run("b", 100), run("a", 100), run("c", 50)];
        sort_runs(&mut items, &[]);
        assert_eq!(items.iter().map(|r| r.info.run_id.as_str()).collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn explicit_order_by_takes_precedence() {
        let mut items = vec![run("a", 10), run("b", 20)];
        let order = parse_order_by(&["attribute.start_time ASC".to_string()]).unwrap();
        sort_runs(&mut items, &order);
        assert_eq!(items.iter().map(|r| r.info.run_id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn nulls_sort_last() {
        let mut items = vec![exp("withtime", 10)];
        let mut no_time = exp("notime", 10);
        no_time.last_update_time = None;
        items.push(no_time);
        let order = parse_order_by(&["attribute.last_update_time DESC".to_string()]).unwrap();
        sort_experiments(&mut items, &order);
        assert_eq!(items.last().unwrap().experiment_id, "notime");
    }
}
