//! EPG (Electronic Program Guide) module
//!
//! Streaming XMLTV reader: a forward-only document walker plus the date,
//! language and episode-number decoding used to assemble channel and
//! programme records.

mod channel;
pub mod dates;
mod episode;
mod language;
mod programme;
mod reader;
mod walker;

// Re-export public types
pub use dates::DateError;
pub use episode::decode_xmltv_ns;
pub use programme::ProgrammeFilter;
pub use reader::{Channels, Programmes, XmlTvReader};
