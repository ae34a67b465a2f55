//! Display text for a post: entity links plus HTML-safe plain text.

use crate::model::RawPost;

const PROFILE_URL: &str = "https://twitter.com/";
const HASHTAG_URL: &str = "https://twitter.com/hashtag/";

struct Link {
    start: usize,
    end: usize,
    html: String,
}

/// Render a post body as display-ready HTML.
///
/// A retweet shown with `show_retweeted_by` is rendered as the original post
/// attributed to its author (`RT @author: ...`). Anything else renders the
/// top-level body, whose text already carries the API's own `RT @...` prefix
/// for retweets.
pub fn format_text(post: &RawPost, show_retweeted_by: bool) -> String {
    match post.retweeted_status.as_deref() {
        Some(original) if show_retweeted_by => format!(
            "RT {}: {}",
            profile_link(&original.user.screen_name),
            format_body(original)
        ),
        _ => format_body(post),
    }
}

fn format_body(post: &RawPost) -> String {
    let chars: Vec<char> = post.text.chars().collect();
    let mut links = entity_links(post);
    links.sort_by_key(|l| l.start);

    let mut out = String::with_capacity(post.text.len());
    let mut cursor = 0;
    for link in links {
        // Overlapping or out-of-range entities stay plain text.
        if link.start < cursor || link.start >= link.end || link.end > chars.len() {
            continue;
        }
        let plain: String = chars[cursor..link.start].iter().collect();
        out.push_str(&escape_html(&plain));
        out.push_str(&link.html);
        cursor = link.end;
    }
    let rest: String = chars[cursor..].iter().collect();
    out.push_str(&escape_html(&rest));
    out
}

fn entity_links(post: &RawPost) -> Vec<Link> {
    let Some(entities) = &post.entities else {
        return Vec::new();
    };
    let mut links = Vec::new();

    for tag in entities.hashtags.iter().flatten() {
        if let Some([start, end]) = tag.indices {
            let html = anchor(&format!("{HASHTAG_URL}{}", tag.text), &format!("#{}", tag.text));
            links.push(Link { start, end, html });
        }
    }
    for mention in entities.user_mentions.iter().flatten() {
        if let Some([start, end]) = mention.indices {
            links.push(Link {
                start,
                end,
                html: profile_link(&mention.screen_name),
            });
        }
    }
    for url in entities.urls.iter().flatten() {
        if let Some([start, end]) = url.indices {
            let href = url.expanded_url.as_deref().unwrap_or(&url.url);
            let label = url.display_url.as_deref().unwrap_or(&url.url);
            links.push(Link {
                start,
                end,
                html: anchor(href, label),
            });
        }
    }
    for media in post.media() {
        let (Some([start, end]), Some(url)) = (media.indices, media.url.as_deref()) else {
            continue;
        };
        let href = media.expanded_url.as_deref().unwrap_or(url);
        let label = media.display_url.as_deref().unwrap_or(url);
        links.push(Link {
            start,
            end,
            html: anchor(href, label),
        });
    }

    links
}

fn profile_link(screen_name: &str) -> String {
    anchor(&format!("{PROFILE_URL}{screen_name}"), &format!("@{screen_name}"))
}

fn anchor(href: &str, label: &str) -> String {
    format!(
        "<a href=\"{}\" target=\"_blank\">{}</a>",
        escape_html(href),
        escape_html(label)
    )
}

/// Escape markup-significant characters. The API already sends `&amp;`,
/// `&lt;` and `&gt;`, so an `&` that starts a character reference is left alone.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for (i, c) in input.char_indices() {
        match c {
            '&' if starts_char_reference(&input[i..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn starts_char_reference(rest: &str) -> bool {
    let Some(body) = rest.strip_prefix('&') else {
        return false;
    };
    let Some(end) = body.find(';') else {
        return false;
    };
    let name = &body[..end];
    match name.strip_prefix('#') {
        Some(number) => match number.strip_prefix(['x', 'X']) {
            Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()),
        },
        None => {
            !name.is_empty() && name.len() <= 32 && name.chars().all(|c| c.is_ascii_alphanumeric())
        }
    }
}
