//! Template variables derived from the process environment.
//!
//! Environment variable names are normalized to PascalCase before they are
//! exposed to templates, so `DRONE_COMMIT_SHA` is referenced as
//! `{{ DroneCommitSha }}`.

use serde::Serialize;
use std::collections::BTreeMap;

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;

/// Variables available to a template render.
///
/// A context is built once per invocation and then only read. Keys are the
/// normalized variable names, values are the raw environment values.
///
/// ## Examples
///
/// ```rust
/// use template_engine::TemplateContext;
///
/// let context = TemplateContext::from_env_vars(vec![
///     ("DRONE_COMMIT".to_string(), "v1.2.3".to_string()),
///     ("DRONE_REPO_NAME".to_string(), "hello-world".to_string()),
/// ]);
///
/// assert_eq!(context.get("DroneCommit"), Some("v1.2.3"));
/// assert_eq!(context.get("DroneRepoName"), Some("hello-world"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TemplateContext {
    variables: BTreeMap<String, String>,
}

impl TemplateContext {
    /// Builds a context from raw environment variable pairs.
    ///
    /// Names are normalized with [`normalize_variable_name`]. Pairs are
    /// applied in lexical order of the raw name, so when two raw names map to
    /// the same key the one that sorts last wins regardless of the order the
    /// environment was enumerated in.
    pub fn from_env_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut raw: Vec<(String, String)> = vars.into_iter().collect();
        raw.sort_by(|a, b| a.0.cmp(&b.0));

        let mut variables = BTreeMap::new();
        for (name, value) in raw {
            let key = normalize_variable_name(&name);
            if key.is_empty() {
                continue;
            }
            variables.insert(key, value);
        }

        Self { variables }
    }

    /// Builds a context from already-normalized names.
    ///
    /// Used when the caller controls the variable names directly, such as in
    /// tests or when rendering with a fixed set of values.
    pub fn from_map(variables: BTreeMap<String, String>) -> Self {
        Self { variables }
    }

    /// Returns the value of a normalized variable name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterates the normalized names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }
}

/// Converts an environment variable name into the PascalCase key used in
/// templates.
///
/// The name is split into words on `_`, `-`, `.` and whitespace, and at
/// camelCase boundaries (`myVar`, `HTTPServer`). Each word has its first
/// character upper-cased and the rest lower-cased, and the words are
/// concatenated.
///
/// ```rust
/// use template_engine::normalize_variable_name;
///
/// assert_eq!(normalize_variable_name("DRONE_COMMIT_SHA"), "DroneCommitSha");
/// assert_eq!(normalize_variable_name("http_proxy"), "HttpProxy");
/// assert_eq!(normalize_variable_name("K8S__VERSION"), "K8sVersion");
/// assert_eq!(normalize_variable_name("myVar"), "MyVar");
/// ```
pub fn normalize_variable_name(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|segment| !segment.is_empty())
        .flat_map(camel_case_words)
        .map(capitalize_segment)
        .collect()
}

/// Splits a delimiter-free segment where a lower-case letter is followed by
/// an upper-case one, and before the last capital of an acronym that runs
/// into a lower-case word.
fn camel_case_words(segment: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = segment.char_indices().collect();
    let mut words = Vec::new();
    let mut start = 0;

    for i in 1..chars.len() {
        let (index, current) = chars[i];
        let previous = chars[i - 1].1;
        let next_is_lower = chars.get(i + 1).is_some_and(|(_, next)| next.is_lowercase());

        let boundary = current.is_uppercase()
            && (previous.is_lowercase() || (previous.is_uppercase() && next_is_lower));
        if boundary {
            words.push(&segment[start..index]);
            start = index;
        }
    }
    words.push(&segment[start..]);

    words
}

fn capitalize_segment(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
