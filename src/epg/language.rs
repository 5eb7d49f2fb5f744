//! Picking values out of a language run: consecutive sibling elements with
//! the same tag, each optionally carrying a `lang` attribute.
//!
//! A required language of `None` matches only elements with no `lang`
//! attribute at all.

use std::io::BufRead;

use super::walker::{DocumentWalker, Element};
use crate::error::Result;

/// One value from the run, preferring `required`.
///
/// The first element is the fallback. The first later sibling whose `lang`
/// equals `required` replaces it, unless the first element already matched.
/// Consumes the whole run and leaves the next differently-named sibling unread.
pub(crate) fn resolve_single<R: BufRead>(
    walker: &mut DocumentWalker<R>,
    first: &Element,
    required: Option<&str>,
) -> Result<String> {
    let mut found_match = first.attr("lang") == required;
    let mut result = walker.read_text(first)?;

    while let Some(sibling) = walker.next_sibling_named(&first.name)? {
        if !found_match && sibling.attr("lang") == required {
            result = walker.read_text(&sibling)?;
            found_match = true;
        } else {
            walker.skip(&sibling)?;
        }
    }

    Ok(result)
}

/// Every value in the run, in source order. When at least one element is
/// tagged with `required`, only those are kept.
pub(crate) fn resolve_multiple<R: BufRead>(
    walker: &mut DocumentWalker<R>,
    first: &Element,
    required: Option<&str>,
) -> Result<Vec<String>> {
    let mut values = vec![(first.attr("lang").map(str::to_owned), walker.read_text(first)?)];

    while let Some(sibling) = walker.next_sibling_named(&first.name)? {
        let lang = sibling.attr("lang").map(str::to_owned);
        values.push((lang, walker.read_text(&sibling)?));
    }

    if values.iter().any(|(lang, _)| lang.as_deref() == required) {
        values.retain(|(lang, _)| lang.as_deref() == required);
    }

    Ok(values.into_iter().map(|(_, value)| value).collect())
}
