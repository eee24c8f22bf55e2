//! Gopher menu lines and documents.
//!
//! A menu line has the following format:
//!
//! ```text
//! T<label><TAB><selector><TAB><host><TAB><port>
//! ```
//!
//! The type code `T` is run together with the label, there is no separator
//! between them. `Renderer` turns a list of such lines (mixed freely with
//! plain prose) into a complete menu document.
use std::fmt::{self, Display};

mod render;

pub use self::render::{Renderer, DEFAULT_WIDTH};

/// The well-known gopher port, used for links to other hosts
pub const DEFAULT_PORT: u16 = 70;

const INFO_SELECTOR: &'static str = "fake";
const INFO_HOST: &'static str = "example.com";
const INFO_PORT: u16 = 0;


/// Item type of a menu entry
///
/// This is the subset of RFC 1436, Gopher II and Gophernicus types that is
/// commonly understood by clients.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum ItemType {
    /// `0` plain text file
    Text,
    /// `1` gopher submenu
    Menu,
    /// `2` CCSO flat database and other databases
    Ccso,
    /// `3` error message
    Error,
    /// `4` Macintosh BinHex file
    BinHex,
    /// `5` archive file (zip, tar, gzip, etc)
    Archive,
    /// `6` UUEncoded file
    UuEncoded,
    /// `7` search query
    Query,
    /// `8` telnet session
    Telnet,
    /// `9` binary file
    Binary,
    /// `g` GIF graphics file
    Gif,
    /// `I` image file
    Image,
    /// `d` word processing document (ps, pdf, doc, etc)
    Document,
    /// `s` sound file
    Sound,
    /// `;` video file
    Video,
    /// `h` HTML document or `URL:` link
    Html,
    /// `i` informational line
    Info,
}

impl ItemType {
    pub fn code(&self) -> char {
        use self::ItemType::*;
        match *self {
            Text => '0',
            Menu => '1',
            Ccso => '2',
            Error => '3',
            BinHex => '4',
            Archive => '5',
            UuEncoded => '6',
            Query => '7',
            Telnet => '8',
            Binary => '9',
            Gif => 'g',
            Image => 'I',
            Document => 'd',
            Sound => 's',
            Video => ';',
            Html => 'h',
            Info => 'i',
        }
    }

    pub fn from_code(code: char) -> Option<ItemType> {
        use self::ItemType::*;
        let item = match code {
            '0' => Text,
            '1' => Menu,
            '2' => Ccso,
            '3' => Error,
            '4' => BinHex,
            '5' => Archive,
            '6' => UuEncoded,
            '7' => Query,
            '8' => Telnet,
            '9' => Binary,
            'g' => Gif,
            'I' => Image,
            'd' => Document,
            's' => Sound,
            ';' => Video,
            'h' => Html,
            'i' => Info,
            _ => return None,
        };
        Some(item)
    }
}

impl Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Removes characters that would corrupt a menu line
///
/// Tabs and line breaks are deleted, not replaced.
pub fn sanitize(field: &str) -> String {
    field.chars().filter(|&c| c != '\t' && c != '\r' && c != '\n').collect()
}


/// Builds menu lines that point back at the server handling the request
///
/// One builder is created for every request with the host and port the
/// connection was accepted on, so relative selectors resolve to the same
/// server.
#[derive(Debug, Clone)]
pub struct MenuBuilder {
    default_host: String,
    default_port: u16,
}

impl MenuBuilder {
    pub fn new<S: Into<String>>(default_host: S, default_port: u16)
        -> MenuBuilder
    {
        MenuBuilder {
            default_host: default_host.into(),
            default_port: default_port,
        }
    }

    pub fn host(&self) -> &str {
        &self.default_host
    }

    pub fn port(&self) -> u16 {
        self.default_port
    }

    /// Formats one menu line
    ///
    /// When `port` is omitted, links to the default host get the server's
    /// own port and links to any other host get the well-known port 70.
    pub fn entry(&self, item: ItemType, label: &str, selector: &str,
        host: Option<&str>, port: Option<u16>)
        -> String
    {
        let host = host.unwrap_or(&self.default_host);
        let port = match port {
            Some(port) => port,
            None if host == self.default_host => self.default_port,
            None => DEFAULT_PORT,
        };
        format_line(item.code(), label, selector, host, &port.to_string())
    }

    /// Entry pointing at `selector` on this server
    pub fn link(&self, item: ItemType, label: &str, selector: &str)
        -> String
    {
        self.entry(item, label, selector, None, None)
    }

    pub fn text(&self, label: &str, selector: &str) -> String {
        self.link(ItemType::Text, label, selector)
    }

    pub fn dir(&self, label: &str, selector: &str) -> String {
        self.link(ItemType::Menu, label, selector)
    }

    pub fn ccso(&self, label: &str, selector: &str) -> String {
        self.link(ItemType::Ccso, label, selector)
    }

    pub fn binhex(&self, label: &str, selector: &str) -> String {
        self.link(ItemType::BinHex, label, selector)
    }

    pub fn archive(&self, label: &str, selector: &str) -> String {
        self.link(ItemType::Archive, label, selector)
    }

    pub fn uuencoded(&self, label: &str, selector: &str) -> String {
        self.link(ItemType::UuEncoded, label, selector)
    }

    pub fn query(&self, label: &str, selector: &str) -> String {
        self.link(ItemType::Query, label, selector)
    }

    pub fn telnet(&self, label: &str, host: &str, port: u16) -> String {
        self.entry(ItemType::Telnet, label, "", Some(host), Some(port))
    }

    pub fn bin(&self, label: &str, selector: &str) -> String {
        self.link(ItemType::Binary, label, selector)
    }

    pub fn gif(&self, label: &str, selector: &str) -> String {
        self.link(ItemType::Gif, label, selector)
    }

    pub fn image(&self, label: &str, selector: &str) -> String {
        self.link(ItemType::Image, label, selector)
    }

    pub fn doc(&self, label: &str, selector: &str) -> String {
        self.link(ItemType::Document, label, selector)
    }

    pub fn sound(&self, label: &str, selector: &str) -> String {
        self.link(ItemType::Sound, label, selector)
    }

    pub fn video(&self, label: &str, selector: &str) -> String {
        self.link(ItemType::Video, label, selector)
    }

    /// Non-navigable display line
    pub fn info(&self, label: &str) -> String {
        info_line(label)
    }

    /// Page title, an info line with the `TITLE` selector
    pub fn title(&self, label: &str) -> String {
        format_line(ItemType::Info.code(), label, "TITLE",
                    INFO_HOST, &INFO_PORT.to_string())
    }

    /// Link to a web page
    ///
    /// The url is used verbatim after the `URL:` prefix. Host and port are
    /// the originating server, which compliant clients ignore.
    pub fn html(&self, label: &str, url: &str) -> String {
        self.link(ItemType::Html, label, &format!("URL:{}", url))
    }

    /// First line of an error response
    ///
    /// This is plain text rather than an item of type `3`, which at least
    /// lynx fails to display.
    pub fn error(&self, code: u16, message: &str) -> String {
        format!("Error: {} {}", code, message)
    }

    /// Absolute `gopher://` url of a selector on this server
    ///
    /// The item type is inserted as the first path segment, as gopher urls
    /// require (`/page/2` → `gopher://host:70/1/page/2`).
    pub fn url(&self, item: ItemType, selector: &str) -> String {
        let selector = selector.strip_prefix('/').unwrap_or(selector);
        format!("gopher://{}:{}/{}/{}", self.default_host, self.default_port,
                item.code(), selector)
    }
}

pub(crate) fn info_line(label: &str) -> String {
    format_line(ItemType::Info.code(), label, INFO_SELECTOR,
                INFO_HOST, &INFO_PORT.to_string())
}

fn format_line(code: char, label: &str, selector: &str, host: &str,
    port: &str)
    -> String
{
    format!("{}{}\t{}\t{}\t{}", code, sanitize(label), sanitize(selector),
            sanitize(host), sanitize(port))
}

#[cfg(test)]
mod test {
    use super::{MenuBuilder, ItemType, sanitize};

    fn menu() -> MenuBuilder {
        MenuBuilder::new("10.10.10.10", 7007)
    }

    #[test]
    fn test_entry_defaults() {
        assert_eq!(menu().link(ItemType::Text, "Hello World", "/"),
                   "0Hello World\t/\t10.10.10.10\t7007");
        assert_eq!(menu().entry(ItemType::Text, "Hello World", "/",
                                None, None),
                   "0Hello World\t/\t10.10.10.10\t7007");
    }

    #[test]
    fn test_external_host_port() {
        assert_eq!(menu().entry(ItemType::Menu, "Debian", "/",
                                Some("debian.org"), None),
                   "1Debian\t/\tdebian.org\t70");
        assert_eq!(menu().entry(ItemType::Menu, "Debian", "/",
                                Some("debian.org"), Some(7070)),
                   "1Debian\t/\tdebian.org\t7070");
        assert_eq!(menu().entry(ItemType::Menu, "Self", "/",
                                Some("10.10.10.10"), None),
                   "1Self\t/\t10.10.10.10\t7007");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("foo\r\nbar\t"), "foobar");
        let line = menu().entry(ItemType::Text, "a\tb", "/x\r\ny",
                                Some("h\tost"), Some(70));
        assert_eq!(line, "0ab\t/xy\thost\t70");
        assert_eq!(line.matches('\t').count(), 3);
        assert!(!line.contains('\r') && !line.contains('\n'));
    }

    #[test]
    fn test_info_title() {
        assert_eq!(menu().info("foo"), "ifoo\tfake\texample.com\t0");
        assert_eq!(menu().title("Welcome"),
                   "iWelcome\tTITLE\texample.com\t0");
    }

    #[test]
    fn test_html() {
        assert_eq!(menu().html("Floodgap", "https://floodgap.com?a=b"),
                   "hFloodgap\tURL:https://floodgap.com?a=b\
                    \t10.10.10.10\t7007");
    }

    #[test]
    fn test_error() {
        assert_eq!(menu().error(404, "Not Found"), "Error: 404 Not Found");
    }

    #[test]
    fn test_convenience_codes() {
        let m = menu();
        assert!(m.dir("d", "/").starts_with("1d\t"));
        assert!(m.query("q", "/").starts_with("7q\t"));
        assert!(m.video("v", "/").starts_with(";v\t"));
        assert!(m.image("i", "/").starts_with("Ii\t"));
        assert_eq!(m.telnet("bbs", "bbs.example.com", 23),
                   "8bbs\t\tbbs.example.com\t23");
    }

    #[test]
    fn test_url() {
        assert_eq!(MenuBuilder::new("gopher.server.com", 7000)
                       .url(ItemType::Menu, "/page/2"),
                   "gopher://gopher.server.com:7000/1/page/2");
    }

    #[test]
    fn test_item_codes() {
        for &c in ['0', '1', '5', '7', '9', 'g', 'I', 'd', 's', ';', 'h', 'i']
            .iter()
        {
            assert_eq!(ItemType::from_code(c).map(|t| t.code()), Some(c));
        }
        assert_eq!(ItemType::from_code('x'), None);
    }
}
