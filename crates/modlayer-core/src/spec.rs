use std::collections::BTreeMap;

use anyhow::anyhow;

/// Parsed component spec: maps component names to archive references.
///
/// A reference is either an absolute `http(s)://` URL or a path relative to
/// the location the spec itself was fetched from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSpec {
    base_url: String,
    components: BTreeMap<String, String>,
}

impl ArchiveSpec {
    pub fn parse(base_url: impl Into<String>, content: &str) -> Self {
        let mut components = BTreeMap::new();
        for line in content.split(['\r', '\n']) {
            if line.trim().is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            components.insert(key.trim().to_string(), value.trim().to_string());
        }

        Self {
            base_url: base_url.into(),
            components,
        }
    }

    /// Parses spec content fetched from `spec_url`, resolving relative
    /// references against the spec's own directory.
    pub fn from_spec_url(spec_url: &str, content: &str) -> Self {
        Self::parse(base_url_of(spec_url), content)
    }

    pub fn archive_reference(&self, component: &str) -> Option<&str> {
        self.components
            .get(component)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn archive_url(&self, component: &str) -> Option<String> {
        let reference = self.archive_reference(component)?;
        if is_absolute_url(reference) {
            return Some(reference.to_string());
        }
        Some(format!("{}{}", self.base_url, reference))
    }

    /// Local file name the component's archive is stored under in its slot.
    pub fn archive_file_name(&self, component: &str) -> anyhow::Result<Option<String>> {
        let Some(reference) = self.archive_reference(component) else {
            return Ok(None);
        };

        let without_fragment = reference.split('#').next().unwrap_or(reference);
        let without_query = without_fragment
            .split('?')
            .next()
            .unwrap_or(without_fragment);
        let path = if is_absolute_url(without_query) {
            let after_scheme = without_query
                .split_once("://")
                .map(|(_, rest)| rest)
                .unwrap_or(without_query);
            after_scheme.split_once('/').map(|(_, path)| path).unwrap_or("")
        } else {
            without_query
        };
        let file_name = path.rsplit('/').next().unwrap_or("").trim();

        if file_name.is_empty() || file_name == "." || file_name == ".." {
            return Err(anyhow!(
                "cannot derive archive file name for component '{component}' from '{reference}'"
            ));
        }
        if file_name.contains('\\') {
            return Err(anyhow!(
                "archive file name for component '{component}' contains a path separator: {file_name}"
            ));
        }

        Ok(Some(file_name.to_string()))
    }
}

fn is_absolute_url(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Spec URL truncated after the last `/` of its path.
fn base_url_of(spec_url: &str) -> String {
    let without_fragment = spec_url.split('#').next().unwrap_or(spec_url);
    let without_query = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);

    let path_start = without_query
        .find("://")
        .map(|index| index + 3)
        .unwrap_or(0);
    match without_query[path_start..].rfind('/') {
        Some(index) => without_query[..path_start + index + 1].to_string(),
        None => format!("{without_query}/"),
    }
}

