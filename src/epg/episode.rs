//! `episode-num` decoding.
//!
//! `xmltv_ns` codes are `series.episode.part`, each part being `N` or `N/M`,
//! where `N` is zero-based and `M` is a plain total: `"5/12.3.1/2"` is series
//! 6 of 12, episode 4, part 2 of 2. Empty parts are unknown.

use crate::error::{Result, XmlTvError};
use crate::models::Episode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NumberingSystem {
    XmltvNs,
    /// Free text such as `Episode #12A`; nothing is extracted from it
    OnScreen,
    Unsupported,
}

impl NumberingSystem {
    pub(crate) fn from_attr(system: Option<&str>) -> Self {
        match system {
            Some("xmltv_ns") => NumberingSystem::XmltvNs,
            Some("onscreen") => NumberingSystem::OnScreen,
            _ => NumberingSystem::Unsupported,
        }
    }
}

/// Apply an `xmltv_ns` code to `episode`. Fields for empty parts are left untouched.
pub fn decode_xmltv_ns(value: &str, episode: &mut Episode) -> Result<()> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let parts: Vec<&str> = compact.split('.').collect();
    if parts.len() != 3 {
        return Err(invalid(value, format!("expected 3 dot-separated parts, found {}", parts.len())));
    }

    if let Some((number, count)) = decode_part(value, parts[0])? {
        episode.series = Some(number);
        episode.series_count = count.or(episode.series_count);
    }
    if let Some((number, count)) = decode_part(value, parts[1])? {
        episode.episode = Some(number);
        episode.episode_count = count.or(episode.episode_count);
    }
    if let Some((number, count)) = decode_part(value, parts[2])? {
        episode.part = Some(number);
        episode.part_count = count.or(episode.part_count);
    }

    Ok(())
}

/// `"N"` or `"N/M"` into the 1-based number and the optional total.
fn decode_part(value: &str, part: &str) -> Result<Option<(u32, Option<u32>)>> {
    if part.is_empty() {
        return Ok(None);
    }

    let mut components = part.split('/');
    let number = components.next().unwrap_or_default();
    let count = components.next();
    if components.next().is_some() {
        return Err(invalid(value, format!("'{}' has more than one '/'", part)));
    }

    let number = parse_number(value, number)?
        .checked_add(1)
        .ok_or_else(|| invalid(value, format!("'{}' is out of range", part)))?;
    let count = count.map(|c| parse_number(value, c)).transpose()?;

    Ok(Some((number, count)))
}

fn parse_number(value: &str, component: &str) -> Result<u32> {
    component
        .parse::<u32>()
        .map_err(|e| invalid(value, format!("'{}': {}", component, e)))
}

fn invalid(value: &str, reason: String) -> XmlTvError {
    XmlTvError::EpisodeNumber {
        value: value.to_string(),
        reason,
    }
}
