//! Plugin discovery.
//!
//! Discovery never runs plugin code. A candidate file is first classified by
//! its header ([`inspect_architecture`]); compatible modules are then mapped
//! read-only ([`ModuleImage`]) and their resource directory searched for
//! modern `PIPL` records, falling back to legacy `PiMI` records.
//!
//! Failures are logged and swallowed: a broken module contributes zero
//! records and the scan carries on.
//!
//! # Example
//!
//! ```rust,ignore
//! use filterhost::config::HostConfig;
//! use filterhost::discovery::PluginCatalog;
//!
//! let catalog = PluginCatalog::scan("/opt/filters", &HostConfig::default())?;
//! for record in catalog.iter() {
//!     println!("{} > {}", record.category(), record.title());
//! }
//! ```

pub mod aete;
mod arch;
pub mod fici;
mod image;
pub mod legacy;
pub mod pe;
pub mod pipl;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub use arch::{Architecture, LoadStrategy, inspect_architecture, inspect_bytes};
pub use image::ModuleImage;
pub use pe::{ResourceDirectory, ResourceName};
pub use pipl::FilterMetadata;

use crate::config::HostConfig;
use crate::error::Result;
use crate::observability;
use crate::plugin::PluginRecord;

/// Decode legacy single-byte text (Latin-1), trimming at the first NUL.
pub(crate) fn legacy_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    bytes[..end].iter().map(|&b| b as char).collect()
}

/// Length-prefixed string. A length past the data is clamped.
pub(crate) fn pascal_string(data: &[u8]) -> String {
    match data.split_first() {
        Some((&len, rest)) => legacy_text(&rest[..(len as usize).min(rest.len())]),
        None => String::new(),
    }
}

/// NUL-terminated string.
pub(crate) fn c_string(data: &[u8]) -> String {
    legacy_text(data)
}

/// Parse every filter record out of a module file.
///
/// Returns an empty list for incompatible, unreadable or malformed modules.
pub fn parse_module(path: impl AsRef<Path>, config: &HostConfig) -> Vec<PluginRecord> {
    let path = path.as_ref();
    let architecture = inspect_architecture(path);
    let strategy = LoadStrategy::for_module(config.effective_architecture(), architecture);
    if !strategy.is_compatible() {
        tracing::debug!(path = %path.display(), ?architecture, "skipping incompatible module");
        return Vec::new();
    }

    match ModuleImage::open(path) {
        Ok(image) => parse_image(&image, architecture, config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to map module");
            Vec::new()
        }
    }
}

/// Parse filter records from an already mapped module.
pub fn parse_image(
    image: &ModuleImage,
    architecture: Architecture,
    config: &HostConfig,
) -> Vec<PluginRecord> {
    let Some(resources) = ResourceDirectory::parse(image.bytes()) else {
        tracing::debug!(path = %image.path().display(), "no resource directory");
        return Vec::new();
    };

    let mut found: Vec<FilterMetadata> = Vec::new();
    let ctx = pipl::ParseContext {
        architecture,
        host_signature: config.host_signature,
        resources: &resources,
    };
    for entry in resources.of_type("PIPL") {
        match pipl::parse_pipl(entry.data, &ctx) {
            Some(meta) if meta.is_complete() => found.push(meta),
            Some(_) => tracing::debug!(name = %entry.name, "PIPL record is incomplete"),
            None => tracing::debug!(name = %entry.name, "PIPL record rejected"),
        }
    }

    if resources.of_type("PIPL").next().is_none() {
        for entry in resources.of_type("PiMI") {
            let Some(id) = entry.name.id() else {
                continue;
            };
            match legacy::parse_pimi(entry.data, id, config.host_signature, &resources) {
                Some(meta) if meta.is_complete() => found.push(meta),
                _ => tracing::debug!(id, "PiMI record rejected"),
            }
        }
    }

    let entry_points: Vec<String> = {
        let mut seen = HashSet::new();
        found
            .iter()
            .filter_map(|m| m.entry_point.clone())
            .filter(|e| seen.insert(e.clone()))
            .collect()
    };
    let shared = found.len() > 1;

    found
        .into_iter()
        .filter_map(|meta| {
            let mut record = PluginRecord::new(
                image.path(),
                meta.entry_point?,
                meta.category?,
                meta.title?,
                architecture,
            );
            if let Some(table) = meta.filter_cases {
                record = record.with_filter_cases(table);
            }
            if let Some(grammar) = meta.grammar {
                record = record.with_grammar(grammar);
            }
            if let Some(expression) = meta.enable_expression {
                record = record.with_enable_expression(expression);
            }
            if shared {
                record = record.with_module_entry_points(entry_points.clone());
            }
            Some(record)
        })
        .collect()
}

/// The filters found in a directory.
#[derive(Debug, Default, Clone)]
pub struct PluginCatalog {
    records: Vec<PluginRecord>,
}

impl PluginCatalog {
    /// Scan `dir` for plugin modules.
    ///
    /// Only a missing or unreadable top-level directory is an error; every
    /// per-file problem is logged and skipped.
    pub fn scan(dir: impl AsRef<Path>, config: &HostConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let _span = tracing::debug_span!("plugin_scan", dir = %dir.display()).entered();

        let mut files = Vec::new();
        collect_files(dir, config, &mut files, true)?;
        files.sort();

        let mut catalog = Self::default();
        let mut seen = HashSet::new();
        for path in files {
            for record in parse_module(&path, config) {
                if seen.insert(record.clone()) {
                    catalog.records.push(record);
                } else {
                    tracing::debug!(title = record.title(), "dropping duplicate record");
                }
            }
        }
        observability::record_plugins_discovered(catalog.records.len());
        tracing::info!(count = catalog.records.len(), "plugin scan complete");
        Ok(catalog)
    }

    /// Build a catalog from records already at hand.
    pub fn from_records(records: impl IntoIterator<Item = PluginRecord>) -> Self {
        let mut seen = HashSet::new();
        Self {
            records: records
                .into_iter()
                .filter(|r| seen.insert(r.clone()))
                .collect(),
        }
    }

    /// All records in scan order.
    pub fn records(&self) -> &[PluginRecord] {
        &self.records
    }

    /// Iterate over records.
    pub fn iter(&self) -> impl Iterator<Item = &PluginRecord> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record with the given category and title.
    pub fn find(&self, category: &str, title: &str) -> Option<&PluginRecord> {
        self.records
            .iter()
            .find(|r| r.category() == category && r.title() == title)
    }
}

fn collect_files(
    dir: &Path,
    config: &HostConfig,
    out: &mut Vec<PathBuf>,
    top_level: bool,
) -> Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if !top_level => {
            tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if config.recursive_scan {
                collect_files(&path, config, out, false)?;
            }
        } else if config.is_plugin_file(&path) {
            out.push(path);
        }
    }
    Ok(())
}
