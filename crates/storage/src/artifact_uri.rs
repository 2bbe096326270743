//! Artifact URI composition.
//!
//! Builds the artifact location for a new experiment, and the artifact URI
//! for a new run, from a caller-supplied root URI. The root may be a local
//! path, a `file:` URI, or any scheme URI (`s3://...`, `dbscheme+driver://...`).

use std::path::{Path, PathBuf};

/// Compose an experiment's `artifact_location` from the store's artifact
/// root and the experiment id: `<root>/<experiment_id>`.
pub fn experiment_artifact_location(artifact_root_uri: &str, experiment_id: &str) -> String {
    append_to_uri_path(artifact_root_uri, &[experiment_id])
}

/// Compose a run's `artifact_uri` from its experiment's artifact location
/// and the run id: `<experiment_artifact_location>/<run_id>/artifacts`.
pub fn run_artifact_uri(experiment_artifact_location: &str, run_id: &str) -> String {
    append_to_uri_path(experiment_artifact_location, &[run_id, "artifacts"])
}

/// Append path segments to a URI or local path, preserving scheme,
/// authority, query and fragment verbatim.
fn append_to_uri_path(base: &str, segments: &[&str]) -> String {
    if let Some(parsed) = ParsedUri::parse(base) {
        parsed.with_appended_segments(segments).render()
    } else {
        // No scheme: a local filesystem path. Relative paths resolve
        // against the current working directory.
        let path = Path::new(base);
        let mut joined: PathBuf = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(path)
        };
        for seg in segments {
            joined.push(seg);
        }
        joined.to_string_lossy().into_owned()
    }
}

/// A URI split into the pieces this module needs to preserve: scheme,
/// authority (may be empty, e.g. `file:///...`), path, query and fragment.
struct ParsedUri<'a> {
    scheme: &'a str,
    authority: &'a str,
    path: String,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

impl<'a> ParsedUri<'a> {
    /// Parse `s` as `scheme://authority/path?query#fragment`. Returns
    /// `None` if `s` has no `scheme://` prefix (i.e. it is a local path).
    fn parse(s: &'a str) -> Option<Self> {
        let scheme_end = s.find("://")?;
        let scheme = &s[..scheme_end];
        let rest = &s[scheme_end + 3..];

        let (before_fragment, fragment) = match rest.find('#') {
            Some(i) => (&rest[..i], Some(&rest[i + 1..])),
            None => (rest, None),
        };
        let (authority_and_path, query) = match before_fragment.find('?') {
            Some(i) => (&before_fragment[..i], Some(&before_fragment[i + 1..])),
            None => (before_fragment, None),
        };
        let (authority, path) = match authority_and_path.find('/') {
            Some(i) => (&authority_and_path[..i], authority_and_path[i..].to_string()),
            None => (authority_and_path, String::new()),
        };

        Some(ParsedUri { scheme, authority, path, query, fragment })
    }

    fn with_appended_segments(mut self, segments: &[&str]) -> Self {
        for seg in segments {
            if !self.path.ends_with('/') {
                self.path.push('/');
            }
            self.path.push_str(seg);
        }
        self
    }

    fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(self.scheme);
        out.push_str("://");
        out.push_str(self.authority);
        out.push_str(&self.path);
        if let Some(q) = self.query {
            out.push('?');
            out.push_str(q);
        }
        if let Some(f) = self.fragment {
            out.push('#');
            out.push_str(f);
        }
        out
    }
}
