//! Grouping of direct scan results by server.
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::path::Path;

use super::DirectResponse;
use super::classify::{OTHERS, Palette};
use crate::config::OutputFormat;
use crate::error::{Error, Result};

/// All distinct domains and addresses seen for one server group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerGroup {
    pub name: String,
    #[serde(skip)]
    pub palette: Palette,
    pub domains: Vec<String>,
    pub ips: Vec<IpAddr>,
}

/// Results grouped by server, groups sorted by name with `others` last.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupedReport {
    pub groups: Vec<ServerGroup>,
}

impl GroupedReport {
    pub fn from_responses(responses: &[DirectResponse]) -> Self {
        let mut by_group: BTreeMap<&str, (Palette, BTreeSet<String>, BTreeSet<IpAddr>)> =
            BTreeMap::new();

        for response in responses {
            let (_, domains, ips) = by_group
                .entry(response.group.as_str())
                .or_insert_with(|| (response.palette, BTreeSet::new(), BTreeSet::new()));
            domains.insert(response.target.to_string());
            ips.extend(response.ips.iter().copied());
        }

        let mut groups: Vec<ServerGroup> = by_group
            .into_iter()
            .map(|(name, (palette, domains, ips))| ServerGroup {
                name: name.to_string(),
                palette: if name == OTHERS { Palette::Grey } else { palette },
                domains: domains.into_iter().collect(),
                ips: ips.into_iter().collect(),
            })
            .collect();

        // Stable: only moves `others` behind everything else.
        groups.sort_by_key(|g| g.name == OTHERS);

        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Colored lines for the terminal summary.
    pub fn terminal_lines(&self) -> Vec<String> {
        let mut lines = vec![String::new()];
        for group in &self.groups {
            let paint = |text: &str| group.palette.paint(text).to_string();

            lines.push(String::new());
            lines.push(paint(&group.name));
            lines.push(String::new());
            lines.extend(group.domains.iter().map(|d| paint(d.as_str())));
            lines.push(String::new());
            lines.extend(group.ips.iter().map(|ip| paint(&ip.to_string())));
            lines.push(String::new());
        }
        lines
    }

    /// Plain text results file: every group's domains, then every group's
    /// addresses, each section headed by `# <group>`.
    pub fn to_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        for group in &self.groups {
            lines.push(format!("# {}", group.name));
            lines.extend(group.domains.iter().cloned());
            lines.push(String::new());
        }
        for group in &self.groups {
            lines.push(format!("# {}", group.name));
            lines.extend(group.ips.iter().map(ToString::to_string));
            lines.push(String::new());
        }
        lines.join("\n")
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the report to `path` in the requested format.
    pub fn write(&self, path: impl AsRef<Path>, format: OutputFormat) -> Result<()> {
        let path = path.as_ref();
        let content = match format {
            OutputFormat::Text => self.to_text(),
            OutputFormat::Json => self.to_json()?,
        };
        std::fs::write(path, content).map_err(|source| Error::WriteOutput {
            path: path.to_path_buf(),
            source,
        })
    }
}
