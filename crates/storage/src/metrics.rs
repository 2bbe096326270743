//! Per-run metric store: one append-only log file per key, lines of
//! `"<timestamp> <value> <step>"`.

use std::io::Write;
use std::path::Path;

use track_core::{Error, Metric};

use crate::paths::PathResolver;

/// Append a metric sample. Repeated identical samples are permitted;
/// the value must be numeric.
pub fn log_metric(dir: &Path, key: &str, metric: &Metric) -> Result<(), Error> {
    if !metric.value.is_finite() {
        return Err(Error::NonNumericMetricValue {
            key: key.to_string(),
            value: metric.value.to_string(),
        });
    }
    let path = PathResolver::resolve_leaf_key(dir, key)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    writeln!(f, "{} {} {}", metric.timestamp, format_value(metric.value), metric.step)?;
    Ok(())
}

fn format_value(v: f64) -> String {
    if v == v.trunc() && v.is_finite() && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Read the full history for a metric key, in insertion order.
/// Malformed lines (legacy corruption) are skipped rather than
/// failing the whole read.
pub fn get_metric_history(dir: &Path, key: &str) -> Result<Vec<Metric>, Error> {
    let path = PathResolver::resolve_leaf_key(dir, key)?;
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)?;
    let mut out = Vec::new();
    for line in content.lines() {
        if let Some(metric) = parse_line(line) {
            out.push(metric);
        } else if !line.trim().is_empty() {
            tracing::warn!(?path, line, "skipping unparseable metric history line");
        }
    }
    Ok(out)
}

fn parse_line(line: &str) -> Option<Metric> {
    let mut parts = line.split_whitespace();
    let timestamp: i64 = parts.next()?.parse().ok()?;
    let value: f64 = parts.next()?.parse().ok()?;
    // Step is absent in legacy records; default to 0.
    let step: i64 = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    Some(Metric { timestamp, value, step })
}

/// List every metric key that has at least one logged sample.
pub fn list_metric_keys(dir: &Path) -> Result<Vec<String>, Error> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut keys = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                keys.push(name.to_string());
            }
        }
    }
    Ok(keys)
}

/// The "latest" sample for a key: max over (step, timestamp, value).
pub fn latest(history: &[Metric]) -> Option<Metric> {
    history.iter().copied().max_by_key(Metric::order_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn history_preserves_insertion_order() {
        let dir = tempdir().unwrap();
        let samples = [
            Metric { timestamp: 100, value: 1000.0, step: 0 },
            Metric { timestamp: 40, value: 100.0, step: 3 },
            Metric { timestamp: 50, value: 10.0, step: 3 },
            Metric { timestamp: 50, value: 20.0, step: 3 },
        ];
        for m in &samples {
            log_metric(dir.path(), "m", m).unwrap();
        }
        let history = get_metric_history(dir.path(), "m").unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0], samples[0]);
        assert_eq!(latest(&history).unwrap().value, 20.0);
    }

    #[test]
    fn missing_key_returns_empty_history() {
        let dir = tempdir().unwrap();
        assert!(get_metric_history(dir.path(), "missing").unwrap().is_empty());
    }

    #[test]
    fn nan_value_is_rejected() {
        let dir = tempdir().unwrap();
        let err = log_metric(dir.path(), "m", &Metric { timestamp: 1, value: f64::NAN, step: 0 })
            .unwrap_err();
        assert!(matches!(err, Error::NonNumericMetricValue { .. }));
    }

    #[test]
    fn legacy_record_without_step_defaults_to_zero() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("m");
        std::fs::write(&path, "100 1.5\n").unwrap();
        let history = get_metric_history(dir.path(), "m").unwrap();
        assert_eq!(history, vec![Metric { timestamp: 100, value: 1.5, step: 0 }]);
    }

    #[test]
    fn corrupt_line_is_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("m");
        std::fs::write(&path, "100 1.5 0\nnot-a-number garbage\n200 2.5 1\n").unwrap();
        let history = get_metric_history(dir.path(), "m").unwrap();
        assert_eq!(history.len(), 2);
    }
}
