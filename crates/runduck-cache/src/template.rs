use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CacheError, Result};

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("constant regex pattern is valid"));

/// Parameters a read is resolved against.
///
/// `env` is not part of this: it belongs to the accessor. `query` is only
/// sent to the upstream and never shapes a cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pub project: Option<String>,
    pub jobid: Option<String>,
    pub query: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn job(mut self, jobid: impl Into<String>) -> Self {
        self.jobid = Some(jobid.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Substitute `{env}`, `{project}` and `{jobid}` into `template`.
///
/// A placeholder without a value is a configuration error, never an empty
/// substitution: two different reads must not collapse onto one key.
pub fn render(template: &str, env: Option<&str>, params: &Params) -> Result<String> {
    let mut out = String::with_capacity(template.len() + 32);
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(literal(template, &template[last..whole.start()])?);
        let name = name.as_str();
        let value = match name {
            "env" => env,
            "project" => params.project.as_deref(),
            "jobid" => params.jobid.as_deref(),
            other => {
                return Err(CacheError::Configuration(format!(
                    "unknown placeholder '{{{other}}}' in template '{template}'"
                )))
            }
        };
        let value = value.filter(|v| !v.is_empty()).ok_or_else(|| {
            CacheError::Configuration(format!(
                "template '{template}' requires parameter '{name}'"
            ))
        })?;
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(literal(template, &template[last..])?);
    Ok(out)
}

// Text between placeholders must not hold a brace the pattern left behind.
fn literal<'a>(template: &str, text: &'a str) -> Result<&'a str> {
    if text.contains(['{', '}']) {
        return Err(CacheError::Configuration(format!(
            "malformed placeholder in template '{template}'"
        )));
    }
    Ok(text)
}
