//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::file::{ConfigFile, ConfigFileError};
use crate::feature::IdentifierField;

/// `id_field` value selecting the GeoJSON top-level `id` member.
pub const FEATURE_ID_KEYWORD: &str = "@id";

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.directory = expand_tilde(v);
            }
        }
    }

    // [http] section
    if let Some(section) = ini.section(Some("http")) {
        if let Some(v) = section.get("timeout") {
            let timeout: u64 = parse_number("http", "timeout", v)?;
            if timeout == 0 {
                return Err(invalid("http", "timeout", v, "must be at least 1 second"));
            }
            config.http.timeout = timeout;
        }
        if let Some(v) = section.get("user_agent") {
            let v = v.trim();
            if !v.is_empty() {
                config.http.user_agent = v.to_string();
            }
        }
        if let Some(v) = section.get("max_retries") {
            config.http.max_retries = parse_number("http", "max_retries", v)?;
        }
        if let Some(v) = section.get("retry_base_delay_ms") {
            config.http.retry_base_delay_ms = parse_number("http", "retry_base_delay_ms", v)?;
        }
    }

    // [retrieval] section
    if let Some(section) = ini.section(Some("retrieval")) {
        if let Some(v) = section.get("max_depth") {
            config.retrieval.max_depth = parse_max_depth(v)?;
        }
        if let Some(v) = section.get("parallelism") {
            let parallelism: usize = parse_number("retrieval", "parallelism", v)?;
            if parallelism == 0 {
                return Err(invalid("retrieval", "parallelism", v, "must be at least 1"));
            }
            config.retrieval.parallelism = parallelism;
        }
        if let Some(v) = section.get("id_field") {
            config.retrieval.id_field = parse_id_field(v)?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = Some(expand_tilde(v));
            }
        }
    }

    Ok(config)
}

/// `0` or `none` disables the cap.
fn parse_max_depth(value: &str) -> Result<Option<u32>, ConfigFileError> {
    let v = value.trim();
    if v.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let depth: u32 = parse_number("retrieval", "max_depth", v)?;
    Ok((depth > 0).then_some(depth))
}

/// Parses an identifier field name as accepted by `[retrieval] id_field`.
pub fn parse_id_field(value: &str) -> Result<IdentifierField, ConfigFileError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(invalid("retrieval", "id_field", value, "must not be empty"));
    }
    if v == FEATURE_ID_KEYWORD {
        return Ok(IdentifierField::FeatureId);
    }
    Ok(IdentifierField::Property(v.to_string()))
}

fn parse_number<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "expected a non-negative integer"))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
