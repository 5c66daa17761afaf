use url::Url;

/// Base of the canonical watch page for a video identifier.
pub const WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

/// Base of the channel page used to look up channel artwork.
pub const CHANNEL_URL_BASE: &str = "https://www.youtube.com/channel/";

/// Builds the canonical watch URL for a video identifier.
pub fn watch_url(video_id: &str) -> String {
    format!("{}{}", WATCH_URL_BASE, video_id)
}

/// Extracts the external content identifier from a feed entry id.
///
/// Entry ids are expected in the three-part `scheme:kind:id` form used by
/// video platform feeds (e.g. `yt:video:dQw4w9WgXcQ`). Any other shape yields
/// `None` and callers decide how to degrade.
///
/// # Examples
///
/// ```
/// use feedcast::util::content_id;
///
/// assert_eq!(content_id("yt:video:abc123"), Some("abc123"));
/// assert_eq!(content_id("tag:example.com,2024:post-1"), None);
/// ```
pub fn content_id(entry_id: &str) -> Option<&str> {
    let mut parts = entry_id.split(':');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(_), Some(id), None) => Some(id),
        _ => None,
    }
}

/// Recovers a video identifier from an entry id containing `yt:video:<id>`.
///
/// The marker may appear anywhere in the id; the identifier runs until the
/// next colon or the end of the string.
pub fn video_id_from_entry_id(entry_id: &str) -> Option<&str> {
    const MARKER: &str = "yt:video:";

    let start = entry_id.find(MARKER)? + MARKER.len();
    entry_id[start..]
        .split(':')
        .next()
        .filter(|id| !id.is_empty())
}

/// Extracts a video identifier from a watch, short-link, embed or legacy `/v/` URL.
///
/// Returns `None` for URLs that do not point at a single video.
pub fn video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let id = match host {
        "youtu.be" => parsed.path_segments()?.next().map(str::to_owned),
        "youtube.com" | "music.youtube.com" => {
            let mut segments = parsed.path_segments()?;
            match segments.next() {
                Some("watch") => parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("embed") | Some("v") => segments.next().map(str::to_owned),
                _ => None,
            }
        }
        _ => None,
    };

    id.filter(|id| !id.is_empty())
}

/// Extracts the `channel_id` query parameter from a channel feed URL.
pub fn channel_id(feed_url: &str) -> Option<String> {
    let parsed = Url::parse(feed_url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "channel_id")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_three_parts() {
        assert_eq!(content_id("yt:video:abc123"), Some("abc123"));
    }

    #[test]
    fn test_content_id_rejects_other_shapes() {
        assert_eq!(content_id("abc123"), None);
        assert_eq!(content_id("yt:abc123"), None);
        assert_eq!(content_id("urn:a:b:c"), None);
        assert_eq!(content_id(""), None);
    }

    #[test]
    fn test_video_id_from_entry_id() {
        assert_eq!(video_id_from_entry_id("yt:video:abc123"), Some("abc123"));
        assert_eq!(video_id_from_entry_id("prefix:yt:video:xyz:tail"), Some("xyz"));
        assert_eq!(video_id_from_entry_id("yt:video:"), None);
        assert_eq!(video_id_from_entry_id("tag:example.com,2024:1"), None);
    }

    #[test]
    fn test_video_id_watch_url() {
        assert_eq!(
            video_id("https://www.youtube.com/watch?v=abc123&t=10s").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_video_id_short_link_and_embed() {
        assert_eq!(video_id("https://youtu.be/abc123").as_deref(), Some("abc123"));
        assert_eq!(
            video_id("https://www.youtube.com/embed/abc123").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            video_id("https://www.youtube.com/v/abc123").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_video_id_rejects_non_video_urls() {
        assert_eq!(video_id("https://www.youtube.com/channel/UC123"), None);
        assert_eq!(video_id("https://example.com/watch?v=abc"), None);
        assert_eq!(video_id("not a url"), None);
    }

    #[test]
    fn test_channel_id_from_feed_url() {
        assert_eq!(
            channel_id("https://www.youtube.com/feeds/videos.xml?channel_id=UC123").as_deref(),
            Some("UC123")
        );
        assert_eq!(
            channel_id("https://www.youtube.com/feeds/videos.xml?playlist_id=PL1"),
            None
        );
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(watch_url("abc123"), "https://www.youtube.com/watch?v=abc123");
    }
}
