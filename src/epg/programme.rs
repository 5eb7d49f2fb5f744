//! `<programme>` block assembly and filtering

use chrono::{DateTime, Utc};
use std::io::BufRead;

use super::channel::parse_icon;
use super::dates::{parse_date, sentinel_date};
use super::episode::{decode_xmltv_ns, NumberingSystem};
use super::language::{resolve_multiple, resolve_single};
use super::walker::{DocumentWalker, Element};
use crate::error::Result;
use crate::logger::ListingLogger;
use crate::models::{Credit, CreditType, Episode, Premiere, Programme, Rating};

/// Which programmes a listing request wants: one channel, and programmes
/// overlapping the half-open window `[start, end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgrammeFilter {
    pub channel_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ProgrammeFilter {
    pub fn new(channel_id: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            channel_id: channel_id.into(),
            start,
            end,
        }
    }

    /// Channel ids compare ASCII case-insensitively.
    pub fn accepts(&self, channel_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if !channel_id.eq_ignore_ascii_case(&self.channel_id) {
            return false;
        }
        !(end < self.start || start >= self.end)
    }
}

/// Child tags a programme understands. Anything else is skipped whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgrammeTag {
    Title,
    SubTitle,
    Desc,
    Category,
    Country,
    PreviouslyShown,
    EpisodeNum,
    Date,
    StarRating,
    Rating,
    Credits,
    Icon,
    Premiere,
    Unknown,
}

impl ProgrammeTag {
    fn from_name(name: &str) -> Self {
        match name {
            "title" => ProgrammeTag::Title,
            "sub-title" => ProgrammeTag::SubTitle,
            "desc" => ProgrammeTag::Desc,
            "category" => ProgrammeTag::Category,
            "country" => ProgrammeTag::Country,
            "previously-shown" => ProgrammeTag::PreviouslyShown,
            "episode-num" => ProgrammeTag::EpisodeNum,
            "date" => ProgrammeTag::Date,
            "star-rating" => ProgrammeTag::StarRating,
            "rating" => ProgrammeTag::Rating,
            "credits" => ProgrammeTag::Credits,
            "icon" => ProgrammeTag::Icon,
            "premiere" => ProgrammeTag::Premiere,
            _ => ProgrammeTag::Unknown,
        }
    }
}

/// Build a programme from the block opened at `block`, consuming it entirely.
///
/// The header attributes are checked against `filter` first; a rejected
/// block is skipped without looking at its children. A fault while reading
/// the children is logged with the partly built record and returned.
pub(crate) fn assemble_programme<R: BufRead>(
    walker: &mut DocumentWalker<R>,
    block: &Element,
    filter: &ProgrammeFilter,
    language: Option<&str>,
    logger: &dyn ListingLogger,
) -> Result<Option<Programme>> {
    let mut programme = read_header(block, logger);

    if !filter.accepts(&programme.channel_id, programme.start_date, programme.end_date) {
        walker.skip(block)?;
        return Ok(None);
    }

    match populate(walker, block, &mut programme, language, logger) {
        Ok(()) => Ok(Some(programme)),
        Err(e) => {
            logger.error_with_cause(&e, format_args!("Error parsing programme: {:?}", programme));
            Err(e)
        }
    }
}

fn read_header(block: &Element, logger: &dyn ListingLogger) -> Programme {
    let date = |name| {
        block
            .non_empty_attr(name)
            .and_then(|value| parse_date(value, logger))
            .unwrap_or_else(sentinel_date)
    };

    let channel_id = block.attr("channel").unwrap_or_default().to_string();
    Programme::new(channel_id, date("start"), date("stop"))
}

fn populate<R: BufRead>(
    walker: &mut DocumentWalker<R>,
    block: &Element,
    programme: &mut Programme,
    language: Option<&str>,
    logger: &dyn ListingLogger,
) -> Result<()> {
    while let Some(child) = walker.next_child(block)? {
        match ProgrammeTag::from_name(&child.name) {
            ProgrammeTag::Title => {
                programme.title = non_empty(resolve_single(walker, &child, language)?);
            }
            ProgrammeTag::SubTitle => {
                programme.episode.title = non_empty(resolve_single(walker, &child, language)?);
            }
            ProgrammeTag::Desc => {
                programme.short_overview = non_empty(resolve_single(walker, &child, language)?);
            }
            ProgrammeTag::Category => {
                programme.genres.extend(resolve_multiple(walker, &child, language)?);
            }
            ProgrammeTag::Country => {
                programme.countries.push(resolve_single(walker, &child, language)?);
            }
            ProgrammeTag::PreviouslyShown => {
                // <previously-shown start="20070708000000" />
                if let Some(start) = child.non_empty_attr("start") {
                    programme.previously_shown = parse_date(start, logger);
                    if programme.previously_shown != Some(programme.start_date) {
                        programme.is_repeat = true;
                    }
                }
                walker.skip(&child)?;
            }
            ProgrammeTag::EpisodeNum => read_episode_num(walker, &child, &mut programme.episode)?,
            ProgrammeTag::Date => {
                let value = walker.read_text(&child)?;
                if let Some(date) = parse_date(&value, logger) {
                    programme.copyright_date = Some(date);
                }
            }
            ProgrammeTag::StarRating => {
                if let Some(rating) = read_star_rating(walker, &child)? {
                    programme.star_rating = Some(rating);
                }
            }
            ProgrammeTag::Rating => {
                if let Some(rating) = read_rating(walker, &child)? {
                    programme.rating = Some(rating);
                }
            }
            ProgrammeTag::Credits => read_credits(walker, &child, &mut programme.credits)?,
            ProgrammeTag::Icon => {
                programme.icon = parse_icon(&child);
                walker.skip(&child)?;
            }
            ProgrammeTag::Premiere => {
                let details = resolve_single(walker, &child, language)?;
                programme.premiere = Some(Premiere { details });
            }
            ProgrammeTag::Unknown => walker.skip(&child)?,
        }
    }
    Ok(())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// ```xml
/// <episode-num system="xmltv_ns">.26/0.</episode-num>
/// <episode-num system="onscreen">S01E05</episode-num>
/// ```
fn read_episode_num<R: BufRead>(
    walker: &mut DocumentWalker<R>,
    element: &Element,
    episode: &mut Episode,
) -> Result<()> {
    match NumberingSystem::from_attr(element.attr("system")) {
        NumberingSystem::XmltvNs => {
            let value = walker.read_text(element)?;
            decode_xmltv_ns(&value, episode)
        }
        // on-screen numbering is free text with no reliable fields
        NumberingSystem::OnScreen | NumberingSystem::Unsupported => walker.skip(element),
    }
}

/// Numerator of `<star-rating><value>3/5</value></star-rating>`; unparseable values are ignored.
/// The `value` may sit at any depth.
fn read_star_rating<R: BufRead>(walker: &mut DocumentWalker<R>, element: &Element) -> Result<Option<f32>> {
    let Some(text) = walker.descendant_text(element, "value")? else {
        return Ok(None);
    };

    Ok(text
        .split_once('/')
        .and_then(|(numerator, _)| numerator.trim().parse::<f32>().ok()))
}

/// `<rating system="MPAA"><value>TV-G</value></rating>`
fn read_rating<R: BufRead>(walker: &mut DocumentWalker<R>, element: &Element) -> Result<Option<Rating>> {
    let system = element.attr("system").map(str::to_owned);
    let value = walker.descendant_text(element, "value")?;

    Ok(value.map(|value| Rating { system, value }))
}

fn read_credits<R: BufRead>(
    walker: &mut DocumentWalker<R>,
    element: &Element,
    credits: &mut Vec<Credit>,
) -> Result<()> {
    while let Some(person) = walker.next_child(element)? {
        match person.name.parse::<CreditType>() {
            Ok(credit_type) => {
                let name = walker.read_text(&person)?;
                credits.push(Credit { credit_type, name });
            }
            Err(()) => walker.skip(&person)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::XmlTvError;
    use crate::logger::tests::RecordingLogger;
    use crate::logger::Level;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    fn day_filter(channel: &str, day: u32) -> ProgrammeFilter {
        ProgrammeFilter::new(channel, utc(2015, 11, day, 0), utc(2015, 11, day + 1, 0))
    }

    fn assemble_with(xml: &str, filter: &ProgrammeFilter, logger: &RecordingLogger) -> Result<Option<Programme>> {
        let mut walker = DocumentWalker::new(xml.as_bytes());
        let block = walker.seek("programme").unwrap().unwrap();
        let result = assemble_programme(&mut walker, &block, filter, Some("en"), logger);
        if result.is_ok() {
            assert_eq!(walker.next_element().unwrap().map(|e| e.name).as_deref(), Some("after"));
        }
        result
    }

    fn assemble(xml: &str) -> Programme {
        assemble_with(xml, &day_filter("c4", 26), &RecordingLogger::default())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_filter_window_is_half_open() {
        let filter = day_filter("c4", 26);
        assert!(filter.accepts("c4", utc(2015, 11, 26, 20), utc(2015, 11, 26, 21)));
        assert!(filter.accepts("C4", utc(2015, 11, 25, 23), utc(2015, 11, 26, 0)));
        assert!(!filter.accepts("c4", utc(2015, 11, 27, 0), utc(2015, 11, 27, 1)));
        assert!(!filter.accepts("c4", utc(2015, 11, 25, 22), utc(2015, 11, 25, 23)));
        assert!(!filter.accepts("bbc1", utc(2015, 11, 26, 20), utc(2015, 11, 26, 21)));

        let previous_day = day_filter("c4", 25);
        assert!(!previous_day.accepts("c4", utc(2015, 11, 26, 20), utc(2015, 11, 26, 21)));
    }

    #[test]
    fn test_all_fields() {
        let xml = r#"<tv><programme start="20151126200000 +0000" stop="20151126210000 +0000" channel="c4">
    <title lang="en">The Secret Life of</title>
    <sub-title lang="en">The Secret Life of 5 Year Olds</sub-title>
    <desc lang="en">Cameras follow the youngsters.</desc>
    <credits>
      <director>Jane Smith</director>
      <actor>Alfie</actor>
      <grip>Nobody</grip>
      <presenter>Ann</presenter>
    </credits>
    <date>2015</date>
    <category lang="en">Documentary</category>
    <category lang="en">Family</category>
    <country>UK</country>
    <episode-num system="dd_progid">EP00003026.0666</episode-num>
    <episode-num system="xmltv_ns">0.3/6.</episode-num>
    <episode-num system="onscreen">Episode #4</episode-num>
    <icon src="http://example.com/p.png" width="100"/>
    <previously-shown start="20151119200000"/>
    <premiere>First shown on C4</premiere>
    <rating system="BBFC"><value>PG</value></rating>
    <star-rating><value>3/5</value></star-rating>
    <subtitles type="teletext"/>
  </programme><after/></tv>"#;
        let p = assemble(xml);

        assert_eq!(p.channel_id, "c4");
        assert_eq!(p.start_date, utc(2015, 11, 26, 20));
        assert_eq!(p.end_date, utc(2015, 11, 26, 21));
        assert_eq!(p.title.as_deref(), Some("The Secret Life of"));
        assert_eq!(p.subtitle(), Some("The Secret Life of 5 Year Olds"));
        assert_eq!(p.short_overview.as_deref(), Some("Cameras follow the youngsters."));
        assert_eq!(p.genres, vec!["Documentary", "Family"]);
        assert_eq!(p.countries, vec!["UK"]);
        assert_eq!(p.copyright_date, Some(utc(2015, 1, 1, 0)));
        assert_eq!(p.episode.series, Some(1));
        assert_eq!(p.episode.episode, Some(4));
        assert_eq!(p.episode.episode_count, Some(6));
        assert_eq!(p.episode.part, None);
        assert_eq!(p.icon.as_ref().and_then(|i| i.width), Some(100));
        assert_eq!(p.previously_shown, Some(utc(2015, 11, 19, 20)));
        assert!(p.is_repeat);
        assert_eq!(p.premiere, Some(Premiere { details: "First shown on C4".into() }));
        assert_eq!(p.rating, Some(Rating { system: Some("BBFC".into()), value: "PG".into() }));
        assert_eq!(p.star_rating, Some(3.0));

        let credits: Vec<String> = p.credits.iter().map(|c| c.to_string()).collect();
        assert_eq!(credits, vec!["Jane Smith - (director)", "Alfie - (actor)", "Ann - (presenter)"]);
    }

    #[test]
    fn test_every_credit_type_is_recognised() {
        let people: String = CreditType::ALL
            .iter()
            .map(|t| format!("<{0}>{0} person</{0}><unknown-role>x</unknown-role>", t.tag()))
            .collect();
        let xml = format!(
            r#"<tv><programme start="20151126200000" stop="20151126210000" channel="c4"><credits>{}</credits><title>T</title></programme><after/></tv>"#,
            people
        );
        let p = assemble(&xml);

        assert_eq!(p.credits.len(), CreditType::ALL.len());
        for (credit, credit_type) in p.credits.iter().zip(CreditType::ALL) {
            assert_eq!(credit.credit_type, credit_type);
            assert_eq!(credit.name, format!("{} person", credit_type.tag()));
        }
        assert_eq!(p.title.as_deref(), Some("T"));
    }

    #[test]
    fn test_rejected_block_is_skipped_unparsed() {
        // a malformed episode code would be fatal if the children were read
        let xml = r#"<tv><programme start="20151126200000" stop="20151126210000" channel="other">
    <episode-num system="xmltv_ns">x.y.z</episode-num>
  </programme><after/></tv>"#;
        let logger = RecordingLogger::default();
        let result = assemble_with(xml, &day_filter("c4", 26), &logger).unwrap();
        assert!(result.is_none());

        let xml = xml.replace("other", "c4");
        let result = assemble_with(&xml, &day_filter("c4", 25), &logger).unwrap();
        assert!(result.is_none());
        assert_eq!(logger.count(Level::Error), 0);
    }

    #[test]
    fn test_malformed_episode_number_is_fatal() {
        let xml = r#"<tv><programme start="20151126200000" stop="20151126210000" channel="c4">
    <title>Partial</title>
    <episode-num system="xmltv_ns">one.two.</episode-num>
  </programme><after/></tv>"#;
        let logger = RecordingLogger::default();
        let err = assemble_with(xml, &day_filter("c4", 26), &logger).unwrap_err();

        assert!(matches!(err, XmlTvError::EpisodeNumber { .. }));
        let errors = logger.messages(Level::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Error parsing programme:"));
        assert!(errors[0].contains("Partial"));
    }

    #[test]
    fn test_missing_dates_use_sentinel() {
        let xml = r#"<tv><programme channel="c4" start="not a date"><title>T</title></programme><after/></tv>"#;
        let filter = ProgrammeFilter::new("c4", sentinel_date(), utc(2015, 1, 1, 0));
        let logger = RecordingLogger::default();
        let p = assemble_with(xml, &filter, &logger).unwrap().unwrap();

        assert_eq!(p.start_date, sentinel_date());
        assert_eq!(p.end_date, sentinel_date());
        assert_eq!(logger.count(Level::Warn), 1);
    }

    #[test]
    fn test_end_before_start_passes_through() {
        let xml = r#"<tv><programme channel="c4" start="20151126210000" stop="20151126200000"/><after/></tv>"#;
        let p = assemble(xml);
        assert!(p.end_date < p.start_date);
        assert_eq!(p.title, None);
    }

    #[test]
    fn test_star_rating_edge_cases() {
        let wrap = |inner: &str| {
            format!(
                r#"<tv><programme start="20151126200000" stop="20151126210000" channel="c4">{}<title>T</title></programme><after/></tv>"#,
                inner
            )
        };

        assert_eq!(assemble(&wrap("<star-rating><value>7.5/10</value></star-rating>")).star_rating, Some(7.5));
        assert_eq!(assemble(&wrap("<star-rating><value>bad/10</value></star-rating>")).star_rating, None);
        assert_eq!(assemble(&wrap("<star-rating><value>4</value></star-rating>")).star_rating, None);
        assert_eq!(assemble(&wrap("<star-rating><icon src=\"s.png\"/></star-rating>")).star_rating, None);
        assert_eq!(assemble(&wrap("<rating system=\"VCHIP\"/>")).rating, None);
    }

    #[test]
    fn test_rating_value_found_below_wrappers() {
        let xml = r#"<tv><programme start="20151126200000" stop="20151126210000" channel="c4">
    <star-rating><wrap><value>3/5</value></wrap></star-rating>
    <rating system="MPAA"><icon src="pg.png"/><group><value>PG</value></group></rating>
    <title>T</title>
  </programme><after/></tv>"#;
        let p = assemble(xml);
        assert_eq!(p.star_rating, Some(3.0));
        assert_eq!(p.rating, Some(Rating { system: Some("MPAA".into()), value: "PG".into() }));
        assert_eq!(p.title.as_deref(), Some("T"));
    }

    #[test]
    fn test_previously_shown_same_start_is_not_repeat() {
        let xml = r#"<tv><programme start="20151126200000" stop="20151126210000" channel="c4">
    <previously-shown start="20151126200000"/>
    <previously-shown/>
  </programme><after/></tv>"#;
        let p = assemble(xml);
        assert_eq!(p.previously_shown, Some(utc(2015, 11, 26, 20)));
        assert!(!p.is_repeat);
    }

    #[test]
    fn test_language_preference_applies() {
        let xml = r#"<tv><programme start="20151126200000" stop="20151126210000" channel="c4">
    <title lang="es">Titulo</title>
    <title lang="en">Title</title>
    <country lang="es">Canadá</country>
    <country lang="en">Canada</country>
    <desc>Desc</desc>
    <country>EE.UU</country>
  </programme><after/></tv>"#;
        let p = assemble(xml);
        assert_eq!(p.title.as_deref(), Some("Title"));
        assert_eq!(p.countries, vec!["Canada", "EE.UU"]);
        assert_eq!(p.short_overview.as_deref(), Some("Desc"));
    }
}
