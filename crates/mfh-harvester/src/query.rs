use std::fmt;

use serde::{Deserialize, Serialize};

/// One search of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// 0-based position in the batch, distinct for every query of a run
    pub position: usize,
    /// Display name the search string was built from
    pub name: String,
    /// Search string typed into the map
    pub text: String,
}

impl Query {
    pub fn new(position: usize, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            position,
            name: name.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {:?}", self.position, self.text)
    }
}

/// Anything exposing a display name can seed a query.
pub trait Named {
    fn display_name(&self) -> &str;
}

impl Named for String {
    fn display_name(&self) -> &str {
        self
    }
}

impl Named for &str {
    fn display_name(&self) -> &str {
        self
    }
}

/// A place entry as found in query list files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Place {
    Named { name: String },
    Bare(String),
}

impl Named for Place {
    fn display_name(&self) -> &str {
        match self {
            Self::Named { name } | Self::Bare(name) => name,
        }
    }
}

/// Formats display names through a template where `{name}` is substituted.
#[derive(Debug, Clone)]
pub struct QueryTemplate(String);

impl QueryTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn format(&self, name: &str) -> String {
        self.0.replace("{name}", name.trim())
    }

    pub fn build<I, N>(&self, places: I) -> Vec<Query>
    where
        I: IntoIterator<Item = N>,
        N: Named,
    {
        places
            .into_iter()
            .enumerate()
            .map(|(position, place)| {
                let name = place.display_name().trim().to_string();
                let text = self.format(&name);
                Query::new(position, name, text)
            })
            .collect()
    }
}

/// Reads place names from a plain text list, one per line.
///
/// Blank lines and lines starting with `#` are ignored.
pub fn parse_name_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}
