//! XMLTV listings reader
//!
//! Reads TV-guide documents in the XMLTV format and hands out channel and
//! programme records lazily, one block at a time. Supports plain and
//! gzip-compressed (`.xml.gz`) sources.

pub mod config;
pub mod epg;
pub mod error;
pub mod logger;
pub mod models;

pub use config::ReaderConfig;
pub use epg::{Channels, ProgrammeFilter, Programmes, XmlTvReader};
pub use error::{Result, XmlTvError};
pub use logger::{FacadeLogger, ListingLogger, NullLogger};
pub use models::{Channel, Credit, CreditType, Episode, Icon, Language, Premiere, Programme, Rating};
pub use tokio_util::sync::CancellationToken;
