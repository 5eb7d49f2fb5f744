//! `<channel>` block assembly

use std::io::BufRead;

use super::language::resolve_single;
use super::walker::{DocumentWalker, Element};
use crate::error::Result;
use crate::logger::ListingLogger;
use crate::models::{Channel, Icon};

/// Build a channel from the block opened at `block`, consuming it entirely.
///
/// Blocks without an `id`, or without a non-empty `display-name`, are logged
/// and yield `None`.
pub(crate) fn assemble_channel<R: BufRead>(
    walker: &mut DocumentWalker<R>,
    block: &Element,
    language: Option<&str>,
    logger: &dyn ListingLogger,
) -> Result<Option<Channel>> {
    let Some(id) = block.non_empty_attr("id") else {
        logger.error(format_args!("No id found for channel row"));
        walker.skip(block)?;
        return Ok(None);
    };

    let mut channel = Channel {
        id: id.to_string(),
        display_name: String::new(),
        url: None,
        icon: None,
    };

    while let Some(child) = walker.next_child(block)? {
        logger.debug(format_args!(
            "Channel - Name: {}, Result.Id: {}, Result.DisplayName: {}, Result.Url: {:?}",
            child.name, channel.id, channel.display_name, channel.url
        ));

        match child.name.as_str() {
            "display-name" => {
                let name = resolve_single(walker, &child, language)?;
                if channel.display_name.is_empty() {
                    channel.display_name = name;
                }
            }
            "url" => channel.url = Some(walker.read_text(&child)?),
            "icon" => {
                channel.icon = parse_icon(&child);
                walker.skip(&child)?;
            }
            _ => walker.skip(&child)?,
        }
    }

    if channel.display_name.is_empty() {
        logger.error(format_args!("No display-name found for channel {}", channel.id));
        return Ok(None);
    }

    Ok(Some(channel))
}

/// `src`, `width` and `height` of an `<icon>`; `None` when none of them is usable.
pub(crate) fn parse_icon(element: &Element) -> Option<Icon> {
    let dimension = |name| {
        element
            .non_empty_attr(name)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|&n| n > 0)
    };

    let icon = Icon {
        source: element.non_empty_attr("src").map(str::to_owned),
        width: dimension("width"),
        height: dimension("height"),
    };

    if icon.source.is_none() && icon.width.is_none() && icon.height.is_none() {
        None
    } else {
        Some(icon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::tests::RecordingLogger;
    use crate::logger::Level;

    fn assemble(xml: &str, language: Option<&str>, logger: &RecordingLogger) -> Option<Channel> {
        let mut walker = DocumentWalker::new(xml.as_bytes());
        let block = walker.seek("channel").unwrap().unwrap();
        let channel = assemble_channel(&mut walker, &block, language, logger).unwrap();
        // the block is fully consumed
        assert_eq!(walker.next_element().unwrap().map(|e| e.name).as_deref(), Some("after"));
        channel
    }

    #[test]
    fn test_full_channel() {
        let xml = r#"<tv><channel id="UK_RT_2056">
            <display-name lang="en">Channel 4 HD</display-name>
            <display-name lang="cy">S4C</display-name>
            <url>http://www.channel4.com</url>
            <icon src="http://example.com/c4.png" width="120" height="80"/>
            <lcn>104</lcn>
        </channel><after/></tv>"#;
        let logger = RecordingLogger::default();
        let channel = assemble(xml, Some("cy"), &logger).unwrap();

        assert_eq!(channel.id, "UK_RT_2056");
        assert_eq!(channel.display_name, "S4C");
        assert_eq!(channel.url.as_deref(), Some("http://www.channel4.com"));
        let icon = channel.icon.unwrap();
        assert_eq!(icon.source.as_deref(), Some("http://example.com/c4.png"));
        assert_eq!((icon.width, icon.height), (Some(120), Some(80)));
        assert_eq!(logger.count(Level::Error), 0);
    }

    #[test]
    fn test_missing_or_empty_id_rejected() {
        let logger = RecordingLogger::default();
        let xml = r#"<tv><channel><display-name>X</display-name></channel><after/></tv>"#;
        assert!(assemble(xml, None, &logger).is_none());
        let xml = r#"<tv><channel id=""><display-name>X</display-name></channel><after/></tv>"#;
        assert!(assemble(xml, None, &logger).is_none());
        assert_eq!(logger.count(Level::Error), 2);
    }

    #[test]
    fn test_missing_display_name_rejected() {
        let logger = RecordingLogger::default();
        let xml = r#"<tv><channel id="a"><display-name></display-name><url>u</url></channel><after/></tv>"#;
        assert!(assemble(xml, None, &logger).is_none());
        let xml = r#"<tv><channel id="b"/><after/></tv>"#;
        assert!(assemble(xml, None, &logger).is_none());
        assert_eq!(
            logger.messages(Level::Error),
            vec!["No display-name found for channel a", "No display-name found for channel b"]
        );
    }

    #[test]
    fn test_first_display_name_run_wins() {
        let xml = r#"<tv><channel id="a">
            <display-name>First</display-name>
            <url>u</url>
            <display-name>Second</display-name>
        </channel><after/></tv>"#;
        let channel = assemble(xml, None, &RecordingLogger::default()).unwrap();
        assert_eq!(channel.display_name, "First");
    }

    #[test]
    fn test_icon_presence_rules() {
        let mut walker = DocumentWalker::new(r#"<icon/><icon width="x" height="0"/><icon height="40"/>"#.as_bytes());
        let empty = walker.next_element().unwrap().unwrap();
        assert_eq!(parse_icon(&empty), None);
        let junk = walker.next_element().unwrap().unwrap();
        assert_eq!(parse_icon(&junk), None);
        let sized = walker.next_element().unwrap().unwrap();
        assert_eq!(parse_icon(&sized), Some(Icon { source: None, width: None, height: Some(40) }));
    }
}
