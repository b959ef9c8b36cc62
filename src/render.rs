//! URLs and `<img>` markup for images.
//!
//! Works on any [`ImageSource`], so a page can render an original and one
//! of its derivatives the same way. Markup is produced with maud, which
//! escapes attribute values.

use maud::{Markup, html};

use crate::source::ImageSource;

/// Public URL of `source`: `base_url` joined with its filename.
///
/// Returns `None` for an image without a filename.
pub fn url(source: &dyn ImageSource, base_url: &str) -> Option<String> {
    let filename = source.filename()?.trim_start_matches('/');
    Some(format!("{}/{filename}", base_url.trim_end_matches('/')))
}

/// Alt text: the title, or the filename for untitled images.
pub fn alt_text(source: &dyn ImageSource) -> Option<&str> {
    source.title().or_else(|| source.filename())
}

/// `<img>` element for `source`. Existence on storage is the caller's
/// concern; see [`DerivativeCache::tag`](crate::derivative::DerivativeCache::tag).
pub fn img_tag(source: &dyn ImageSource, base_url: &str) -> Option<Markup> {
    let src = url(source, base_url)?;
    let alt = alt_text(source).unwrap_or_default();
    Some(html! {
        img src=(src) alt=(alt);
    })
}
