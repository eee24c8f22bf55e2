//! `URL:` selectors (Gopher II, section 11)
//!
//! Links to web pages are written as `h` items with a `URL:<address>`
//! selector. Clients that don't know the convention request the selector
//! from us, and get a small HTML page that sends the browser on.

const PREFIX: &'static str = "/URL:";


/// Address a `URL:` selector points to, or `None` for other selectors
///
/// The query string is part of the address. A bare trailing `?` is dropped.
pub fn target(selector: &str) -> Option<&str> {
    if selector.starts_with(PREFIX) {
        let address = &selector[PREFIX.len()..];
        Some(address.strip_suffix('?').unwrap_or(address))
    } else {
        None
    }
}

pub fn page(address: &str) -> String {
    let url = escape(address);
    format!("<HTML>\n\
        <HEAD>\n\
        <META HTTP-EQUIV=\"refresh\" content=\"2;URL={url}\">\n\
        </HEAD>\n\
        <BODY>\n\
        \n\
        You are following an external link to a Web site. \
        You will be automatically\n\
        taken to the site shortly. If you do not get sent there, \
        please click\n\
        <A HREF=\"{url}\">here</A> to go to the web site.\n\
        <P>\n\
        The URL linked is:\n\
        <P>\n\
        <A HREF=\"{url}\">{url}</A>\n\
        <P>\n\
        Thanks for using Gopher!\n\
        </BODY>\n\
        </HTML>", url=url)
}

/// Escapes text for use in HTML attributes and content
pub fn escape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&#34;"),
            '\'' => result.push_str("&#39;"),
            c => result.push(c),
        }
    }
    result
}
