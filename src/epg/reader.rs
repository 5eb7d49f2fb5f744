//! Entry point: lazy channel/programme listings over an XMLTV source.
//!
//! Every listing call opens its own cursor over the source, so a channel
//! listing and a programme listing can be consumed side by side. Records are
//! assembled one block at a time as the caller pulls them.

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::channel::assemble_channel;
use super::programme::{assemble_programme, ProgrammeFilter};
use super::walker::{DocumentWalker, Element};
use crate::config::ReaderConfig;
use crate::error::Result;
use crate::logger::{FacadeLogger, ListingLogger};
use crate::models::{Channel, Language, Programme};

const ROOT_TAG: &str = "tv";
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

type SourceReader = Box<dyn BufRead + Send>;

#[derive(Debug, Clone)]
enum Source {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

/// Reader over one XMLTV document.
///
/// ```no_run
/// use chrono::{TimeZone, Utc};
/// use xmltv_listings::{CancellationToken, XmlTvReader};
///
/// let reader = XmlTvReader::open("guide.xml.gz").with_language("en");
/// for channel in reader.list_channels()? {
///     let channel = channel?;
///     let start = Utc.with_ymd_and_hms(2015, 11, 26, 0, 0, 0).unwrap();
///     let end = Utc.with_ymd_and_hms(2015, 11, 27, 0, 0, 0).unwrap();
///     let token = CancellationToken::new();
///     for programme in reader.list_programmes(&channel.id, start, end, &token)? {
///         println!("{:?}", programme?.title);
///     }
/// }
/// # Ok::<(), xmltv_listings::XmlTvError>(())
/// ```
#[derive(Clone)]
pub struct XmlTvReader {
    source: Source,
    config: ReaderConfig,
    logger: Arc<dyn ListingLogger>,
}

impl XmlTvReader {
    /// Reader over a file. Nothing is opened until a listing is requested.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_source(Source::File(path.into()))
    }

    /// Reader over a document held in memory.
    pub fn from_bytes(document: impl Into<Vec<u8>>) -> Self {
        let document: Vec<u8> = document.into();
        Self::with_source(Source::Memory(document.into()))
    }

    fn with_source(source: Source) -> Self {
        Self {
            source,
            config: ReaderConfig::default(),
            logger: Arc::new(FacadeLogger),
        }
    }

    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Preferred `lang` for multilingual fields.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.config.language = Some(language.into());
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ListingLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Path of a file-backed reader.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            Source::File(path) => Some(path),
            Source::Memory(_) => None,
        }
    }

    /// Every valid `<channel>` in document order.
    pub fn list_channels(&self) -> Result<Channels> {
        Ok(Channels {
            blocks: BlockScanner::new(self.open_source()?, "channel"),
            language: self.config.preferred_language().map(str::to_owned),
            logger: Arc::clone(&self.logger),
        })
    }

    /// Programmes on `channel_id` overlapping `[start, end)`, in document order.
    ///
    /// `cancel` is checked once per `<programme>` block. Once cancelled, the
    /// remaining blocks are passed over without being assembled, but the scan
    /// still runs to the end of the document.
    pub fn list_programmes(
        &self,
        channel_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Programmes> {
        Ok(Programmes {
            blocks: BlockScanner::new(self.open_source()?, "programme"),
            filter: ProgrammeFilter::new(channel_id, start, end),
            language: self.config.preferred_language().map(str::to_owned),
            logger: Arc::clone(&self.logger),
            cancel: cancel.clone(),
        })
    }

    /// `lang` attribute values across the whole document, most frequent first.
    /// Equal counts are ordered by name.
    pub fn list_languages(&self, cancel: &CancellationToken) -> Result<Vec<Language>> {
        let mut walker = DocumentWalker::new(self.open_source()?);
        let mut counts: HashMap<String, usize> = HashMap::new();

        while let Some(element) = walker.next_element()? {
            if cancel.is_cancelled() {
                continue;
            }
            if let Some(lang) = element.non_empty_attr("lang") {
                *counts.entry(lang.to_string()).or_default() += 1;
            }
        }

        let mut languages: Vec<Language> = counts
            .into_iter()
            .map(|(name, relevance)| Language { name, relevance })
            .collect();
        languages.sort_by(|a, b| b.relevance.cmp(&a.relevance).then_with(|| a.name.cmp(&b.name)));
        Ok(languages)
    }

    /// Fresh cursor over the source, decompressing gzip input when detected.
    fn open_source(&self) -> Result<SourceReader> {
        let capacity = self.config.buffer_capacity.max(2);
        let mut reader: SourceReader = match &self.source {
            Source::File(path) => {
                self.logger.info(format_args!("Loading file {}", path.display()));
                Box::new(BufReader::with_capacity(capacity, File::open(path)?))
            }
            Source::Memory(document) => {
                self.logger.info(format_args!("Loading document ({} bytes)", document.len()));
                Box::new(Cursor::new(Arc::clone(document)))
            }
        };

        if self.config.detect_gzip && reader.fill_buf()?.starts_with(&GZIP_MAGIC) {
            self.logger.debug(format_args!("Source is gzip compressed"));
            reader = Box::new(BufReader::with_capacity(capacity, GzDecoder::new(reader)));
        }

        Ok(reader)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Not yet inside the root element
    Start,
    Scanning,
    Done,
}

/// Finds successive top-level blocks with one tag.
struct BlockScanner {
    walker: DocumentWalker<SourceReader>,
    tag: &'static str,
    state: ScanState,
}

impl BlockScanner {
    fn new(source: SourceReader, tag: &'static str) -> Self {
        Self {
            walker: DocumentWalker::new(source),
            tag,
            state: ScanState::Start,
        }
    }

    fn next_block(&mut self) -> Result<Option<Element>> {
        if self.state == ScanState::Start {
            self.state = match self.walker.seek(ROOT_TAG)? {
                Some(root) if !root.is_empty => ScanState::Scanning,
                _ => ScanState::Done,
            };
        }
        if self.state == ScanState::Done {
            return Ok(None);
        }

        let block = self.walker.seek(self.tag)?;
        if block.is_none() {
            self.state = ScanState::Done;
        }
        Ok(block)
    }
}

/// Lazy sequence of channels; see [`XmlTvReader::list_channels`].
///
/// Yields at most one `Err`, after which the sequence is finished.
pub struct Channels {
    blocks: BlockScanner,
    language: Option<String>,
    logger: Arc<dyn ListingLogger>,
}

impl Iterator for Channels {
    type Item = Result<Channel>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let result = match self.blocks.next_block() {
                Ok(Some(block)) => assemble_channel(
                    &mut self.blocks.walker,
                    &block,
                    self.language.as_deref(),
                    self.logger.as_ref(),
                ),
                Ok(None) => return None,
                Err(e) => Err(e),
            };

            match result {
                Ok(Some(channel)) => return Some(Ok(channel)),
                Ok(None) => continue,
                Err(e) => {
                    self.blocks.state = ScanState::Done;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl FusedIterator for Channels {}

/// Lazy sequence of programmes; see [`XmlTvReader::list_programmes`].
///
/// A fault inside an accepted block is yielded as the single `Err` and ends
/// the sequence.
pub struct Programmes {
    blocks: BlockScanner,
    filter: ProgrammeFilter,
    language: Option<String>,
    logger: Arc<dyn ListingLogger>,
    cancel: CancellationToken,
}

impl Programmes {
    pub fn filter(&self) -> &ProgrammeFilter {
        &self.filter
    }

    fn step(&mut self, block: &Element) -> Result<Option<Programme>> {
        let walker = &mut self.blocks.walker;

        // Cancellation skips the block but keeps scanning; the listing only
        // ends at the end of the document.
        // TODO: end the listing on cancellation once hosts stop relying on the full scan.
        if self.cancel.is_cancelled() {
            walker.skip(block)?;
            return Ok(None);
        }

        assemble_programme(
            walker,
            block,
            &self.filter,
            self.language.as_deref(),
            self.logger.as_ref(),
        )
    }
}

impl Iterator for Programmes {
    type Item = Result<Programme>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let result = match self.blocks.next_block() {
                Ok(Some(block)) => self.step(&block),
                Ok(None) => return None,
                Err(e) => Err(e),
            };

            match result {
                Ok(Some(programme)) => return Some(Ok(programme)),
                Ok(None) => continue,
                Err(e) => {
                    self.blocks.state = ScanState::Done;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl FusedIterator for Programmes {}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
