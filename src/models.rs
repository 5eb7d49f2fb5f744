//! Records produced from an XMLTV document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Image attached to a channel or programme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    pub source: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A `<channel>` block. Equality and hashing only look at `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub display_name: String,
    pub url: Option<String>,
    pub icon: Option<Icon>,
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Channel {}

impl Hash for Channel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.id, self.display_name)
    }
}

/// Series/episode/part numbering. All numbers are 1-based; `None` means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub series: Option<u32>,
    pub series_count: Option<u32>,
    pub episode: Option<u32>,
    pub episode_count: Option<u32>,
    pub part: Option<u32>,
    pub part_count: Option<u32>,
    pub title: Option<String>,
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups = [
            ("Series", self.series, self.series_count),
            ("Episode", self.episode, self.episode_count),
            ("Part", self.part, self.part_count),
        ];

        let mut first = true;
        for (label, number, count) in groups {
            if number.is_none() && count.is_none() {
                continue;
            }
            if !first {
                f.write_str(",")?;
            }
            first = false;
            write!(f, "{} {} of {}", label, opt(number), opt(count))?;
        }
        Ok(())
    }
}

fn opt(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Role of a person listed under `<credits>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditType {
    Director,
    Actor,
    Writer,
    Adapter,
    Producer,
    Composer,
    Editor,
    Presenter,
    Commentator,
    Guest,
}

impl CreditType {
    pub const ALL: [CreditType; 10] = [
        CreditType::Director,
        CreditType::Actor,
        CreditType::Writer,
        CreditType::Adapter,
        CreditType::Producer,
        CreditType::Composer,
        CreditType::Editor,
        CreditType::Presenter,
        CreditType::Commentator,
        CreditType::Guest,
    ];

    /// XMLTV tag name for this role
    pub fn tag(&self) -> &'static str {
        match self {
            CreditType::Director => "director",
            CreditType::Actor => "actor",
            CreditType::Writer => "writer",
            CreditType::Adapter => "adapter",
            CreditType::Producer => "producer",
            CreditType::Composer => "composer",
            CreditType::Editor => "editor",
            CreditType::Presenter => "presenter",
            CreditType::Commentator => "commentator",
            CreditType::Guest => "guest",
        }
    }
}

impl FromStr for CreditType {
    type Err = ();

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        CreditType::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or(())
    }
}

impl fmt::Display for CreditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub credit_type: CreditType,
    pub name: String,
}

impl fmt::Display for Credit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - ({})", self.name, self.credit_type)
    }
}

/// Certification rating, e.g. `MPAA` / `TV-G`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub system: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Premiere {
    pub details: String,
}

/// A `<programme>` block.
///
/// `end_date < start_date` is passed through as found in the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Programme {
    pub channel_id: String,
    pub title: Option<String>,
    /// Text of `desc`
    pub short_overview: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub genres: Vec<String>,
    pub countries: Vec<String>,
    pub episode: Episode,
    pub credits: Vec<Credit>,
    pub rating: Option<Rating>,
    pub star_rating: Option<f32>,
    pub premiere: Option<Premiere>,
    pub previously_shown: Option<DateTime<Utc>>,
    pub copyright_date: Option<DateTime<Utc>>,
    pub is_repeat: bool,
    pub icon: Option<Icon>,
}

impl Programme {
    pub(crate) fn new(channel_id: String, start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Self {
        Self {
            channel_id,
            title: None,
            short_overview: None,
            start_date,
            end_date,
            genres: Vec::new(),
            countries: Vec::new(),
            episode: Episode::default(),
            credits: Vec::new(),
            rating: None,
            star_rating: None,
            premiere: None,
            previously_shown: None,
            copyright_date: None,
            is_repeat: false,
            icon: None,
        }
    }

    /// Episode title taken from `sub-title`
    pub fn subtitle(&self) -> Option<&str> {
        self.episode.title.as_deref()
    }
}

/// A `lang` attribute value and how often it occurs in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub name: String,
    pub relevance: usize,
}
