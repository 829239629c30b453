//! Layered INI-style configuration store.
//!
//! All paths, tool versions and per-entity metadata come from here. Several
//! files can be layered on top of each other: later files override earlier
//! values option by option, sections are unioned. Values may reference other
//! values with `${section:option}` (or `${option}` for the same section);
//! references are expanded lazily on first access and cached.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::ConfigError;

/// The section orchestration code may mutate during a single run to smuggle
/// per-run overrides (device, board, top level) into interpolations.
pub const SPECIAL_SECTION: &str = "SPECIAL";

type Sections = IndexMap<String, IndexMap<String, String>>;

/// Read-mostly configuration store with lazy `${...}` interpolation.
#[derive(Debug, Default)]
pub struct Config {
    sections: Sections,
    cache: RefCell<HashMap<(String, String), String>>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one configuration layer from a string and merge it in.
    pub fn load_str(&mut self, text: &str) -> Result<(), ConfigError> {
        let mut current: Option<String> = None;
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim().to_string();
                self.sections.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Syntax {
                    line: idx + 1,
                    text: raw.to_string(),
                });
            };
            let Some(section) = &current else {
                return Err(ConfigError::Syntax {
                    line: idx + 1,
                    text: raw.to_string(),
                });
            };
            self.sections
                .get_mut(section)
                .expect("current section exists")
                .insert(key.trim().to_string(), value.trim().to_string());
        }
        self.clear_cache();
        Ok(())
    }

    /// Read one configuration layer from a file and merge it in.
    pub fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        self.load_str(&text)
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    pub fn has_option(&self, section: &str, option: &str) -> bool {
        self.sections
            .get(section)
            .is_some_and(|s| s.contains_key(option))
    }

    /// Section names in insertion order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Option names of one section in insertion order.
    pub fn options(&self, section: &str) -> Result<impl Iterator<Item = &str>, ConfigError> {
        let section = self
            .sections
            .get(section)
            .ok_or_else(|| ConfigError::MissingSection(section.to_string()))?;
        Ok(section.keys().map(String::as_str))
    }

    /// Raw, uninterpolated value.
    pub fn get_raw(&self, section: &str, option: &str) -> Result<&str, ConfigError> {
        let values = self
            .sections
            .get(section)
            .ok_or_else(|| ConfigError::MissingSection(section.to_string()))?;
        values
            .get(option)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::MissingOption {
                section: section.to_string(),
                option: option.to_string(),
            })
    }

    /// Interpolated value. Expansion results are cached until the next
    /// mutation or explicit [`Config::clear_cache`].
    pub fn get(&self, section: &str, option: &str) -> Result<String, ConfigError> {
        let key = (section.to_string(), option.to_string());
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Ok(hit.clone());
        }
        let mut stack = Vec::new();
        let value = self.expand(section, option, &mut stack)?;
        self.cache.borrow_mut().insert(key, value.clone());
        Ok(value)
    }

    /// Set one value, creating the section on demand.
    pub fn set(&mut self, section: &str, option: &str, value: &str) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(option.to_string(), value.to_string());
        self.clear_cache();
    }

    /// Drop all cached interpolation results.
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    fn expand(
        &self,
        section: &str,
        option: &str,
        stack: &mut Vec<(String, String)>,
    ) -> Result<String, ConfigError> {
        let key = (section.to_string(), option.to_string());
        if stack.contains(&key) {
            return Err(ConfigError::InterpolationCycle {
                section: section.to_string(),
                option: option.to_string(),
            });
        }
        stack.push(key);

        let raw = self.get_raw(section, option)?.to_string();
        let mut result = String::with_capacity(raw.len());
        let mut rest = raw.as_str();
        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let tail = &rest[start + 2..];
            let Some(end) = tail.find('}') else {
                return Err(ConfigError::Interpolation {
                    section: section.to_string(),
                    option: option.to_string(),
                    reference: tail.to_string(),
                });
            };
            let reference = &tail[..end];
            let (ref_section, ref_option) = match reference.split_once(':') {
                Some((s, o)) => (s, o),
                None => (section, reference),
            };
            let expanded =
                self.expand(ref_section, ref_option, stack)
                    .map_err(|err| match err {
                        ConfigError::MissingSection(..) | ConfigError::MissingOption { .. } => {
                            ConfigError::Interpolation {
                                section: section.to_string(),
                                option: option.to_string(),
                                reference: reference.to_string(),
                            }
                        }
                        other => other,
                    })?;
            result.push_str(&expanded);
            rest = &tail[end + 1..];
        }
        result.push_str(rest);

        stack.pop();
        Ok(result)
    }
}
