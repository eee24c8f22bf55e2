use super::info_line;

/// Display width recommended by RFC 1436 for menu labels
pub const DEFAULT_WIDTH: usize = 70;

/// Renders gopher menu documents of a fixed display width
///
/// Rules applied to every document:
///
/// 1. Newlines are normalized to CR/LF whatever the input used.
/// 2. Lines that are not already menu entries become info lines, so prose
///    and entries can be mixed freely.
/// 3. Labels are cut to the display width.
/// 4. The document ends with a line holding a single full stop.
#[derive(Debug, Clone)]
pub struct Renderer {
    width: usize,
}

impl Renderer {
    pub fn new(width: usize) -> Renderer {
        Renderer { width: width }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Renders lines (each may hold several lines) into a menu document
    pub fn render<I, S>(&self, lines: I) -> String
        where I: IntoIterator<Item=S>,
              S: AsRef<str>,
    {
        let raw = lines.into_iter()
            .map(|x| x.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        let mut menu = Vec::new();
        for line in split_lines(&raw) {
            let line = line.trim_end();
            let line = if is_menu_line(line) {
                line.to_string()
            } else {
                info_line(line)
            };
            // +1 for the type code which shares the field with the label
            let mut parts = line.split('\t');
            let label = parts.next().unwrap_or("");
            let mut fields = vec![truncate(label, self.width + 1)];
            fields.extend(parts);
            menu.push(fields.join("\t"));
        }
        if menu.last().map_or(true, |x| x != ".") {
            menu.push(".".to_string());
        }
        menu.push(String::new());
        menu.join("\r\n")
    }

    /// Fills every line of `text` into a paragraph fitting the width
    pub fn wrap(&self, text: &str) -> String {
        split_lines(text)
            .map(|line| fill(line, self.width).join("\r\n"))
            .collect::<Vec<_>>()
            .join("\r\n")
    }

    /// Frames every line of `text` between rows of `ch`
    ///
    /// Lines are centered with `side` on both edges. An empty `ch` drops
    /// the top and bottom rows, an empty `side` the edges.
    ///
    /// ```text
    /// ==========
    /// -  Hello -
    /// ==========
    /// ```
    pub fn banner(&self, text: &str, ch: &str, side: &str) -> String {
        let offset = side.chars().count();
        let mut lines = split_lines(text).map(|line| {
            let centered = center_line(line, self.width, ' ');
            if offset == 0 {
                return centered;
            }
            let len = centered.chars().count();
            let inner = centered.chars()
                .skip(offset)
                .take(len.saturating_sub(2 * offset))
                .collect::<String>();
            format!("{}{}{}", side, inner, side)
        }).collect::<Vec<_>>();
        if !ch.is_empty() {
            let row = repeat_to(ch, self.width);
            lines.insert(0, row.clone());
            lines.push(row);
        }
        lines.join("\r\n")
    }

    /// Centers every line of `text`, padding with `fill`
    pub fn center(&self, text: &str, fill: char) -> String {
        split_lines(text)
            .map(|line| center_line(line, self.width, fill))
            .collect::<Vec<_>>()
            .join("\r\n")
    }

    /// Pads every line of `text` on the left up to the width
    pub fn rjust(&self, text: &str, fill: char) -> String {
        split_lines(text)
            .map(|line| pad(line, self.width, fill, false))
            .collect::<Vec<_>>()
            .join("\r\n")
    }

    /// Pads every line of `text` on the right up to the width
    pub fn ljust(&self, text: &str, fill: char) -> String {
        split_lines(text)
            .map(|line| pad(line, self.width, fill, true))
            .collect::<Vec<_>>()
            .join("\r\n")
    }

    /// Puts `left` and `right` side by side, line by line
    ///
    /// The right text is aligned to the width. Lines that don't fit lose
    /// their start.
    pub fn float_right(&self, left: &str, right: &str, fill: char)
        -> String
    {
        let mut left = split_lines(left);
        let mut right = split_lines(right);
        let mut lines = Vec::new();
        loop {
            let (l, r) = match (left.next(), right.next()) {
                (None, None) => break,
                (l, r) => (l.unwrap_or(""), r.unwrap_or("")),
            };
            let padding = self.width.saturating_sub(r.chars().count());
            let line = pad(l, padding, fill, true) + r;
            let len = line.chars().count();
            lines.push(line.chars()
                .skip(len.saturating_sub(self.width))
                .collect::<String>());
        }
        lines.join("\r\n")
    }

    /// Adds a row of `ch` under `text` as wide as its longest line
    pub fn underline(text: &str, ch: &str) -> String {
        let width = split_lines(text)
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        format!("{}\r\n{}", text, repeat_to(ch, width))
    }
}

impl Default for Renderer {
    fn default() -> Renderer {
        Renderer::new(DEFAULT_WIDTH)
    }
}

/// Matches the `.+\t.*\t.*\t.*` shape of a built menu entry
fn is_menu_line(line: &str) -> bool {
    line.chars().skip(1).filter(|&c| c == '\t').count() >= 3
}

/// Extra fill goes to the left when both the margin and width are odd
fn center_line(line: &str, width: usize, fill: char) -> String {
    let len = line.chars().count();
    if len >= width {
        return line.to_string();
    }
    let margin = width - len;
    let left = margin / 2 + (margin & width & 1);
    let mut result = String::with_capacity(width);
    result.extend(std::iter::repeat(fill).take(left));
    result.push_str(line);
    result.extend(std::iter::repeat(fill).take(margin - left));
    result
}

fn pad(line: &str, width: usize, fill: char, left_align: bool) -> String {
    let len = line.chars().count();
    let padding = std::iter::repeat(fill)
        .take(width.saturating_sub(len))
        .collect::<String>();
    if left_align {
        format!("{}{}", line, padding)
    } else {
        format!("{}{}", padding, line)
    }
}

/// `pattern` repeated and cut to exactly `width` chars
fn repeat_to(pattern: &str, width: usize) -> String {
    pattern.chars().cycle().take(width).collect()
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Line boundaries, `\r\n` counts as a single one
fn is_line_break(c: char) -> bool {
    match c {
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e'
        | '\u{85}' | '\u{2028}' | '\u{2029}' => true,
        _ => false,
    }
}

/// Splits on line breaks without yielding a trailing empty line
fn split_lines(text: &str) -> impl Iterator<Item=&str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.char_indices().find(|&(_, c)| is_line_break(c)) {
            Some((idx, c)) => {
                let line = &rest[..idx];
                let skip = if rest[idx..].starts_with("\r\n") {
                    2
                } else {
                    c.len_utf8()
                };
                rest = &rest[idx + skip..];
                Some(line)
            }
            None => {
                let line = rest;
                rest = "";
                Some(line)
            }
        }
    })
}

/// Greedy word wrap of a single line
///
/// Whitespace between words is kept as is, whitespace at the edges of
/// wrapped lines is dropped and words longer than the width are broken.
fn fill(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for chunk in chunks(line) {
        let is_space = chunk.starts_with(char::is_whitespace);
        let len = chunk.chars().count();
        if is_space {
            if current_len + len <= width
                && (current_len > 0 || lines.is_empty())
            {
                current.push_str(chunk);
                current_len += len;
            } else if current_len > 0 {
                lines.push(current.trim_end().to_string());
                current.clear();
                current_len = 0;
            }
            continue;
        }
        if current_len + len > width && current_len > 0 {
            lines.push(current.trim_end().to_string());
            current.clear();
            current_len = 0;
        }
        let mut word = chunk;
        while word.chars().count() > width - current_len {
            let head = truncate(word, width - current_len);
            current.push_str(head);
            lines.push(current.clone());
            current.clear();
            current_len = 0;
            word = &word[head.len()..];
        }
        current.push_str(word);
        current_len += word.chars().count();
    }
    let last = current.trim_end();
    if !last.is_empty() || lines.is_empty() {
        lines.push(last.to_string());
    }
    lines
}

/// Alternating runs of whitespace and non-whitespace
fn chunks(line: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut start = 0;
    let mut space = None;
    for (idx, ch) in line.char_indices() {
        let is_space = ch.is_whitespace();
        if space.map_or(false, |s| s != is_space) {
            result.push(&line[start..idx]);
            start = idx;
        }
        space = Some(is_space);
    }
    if start < line.len() {
        result.push(&line[start..]);
    }
    result
}

#[cfg(test)]
mod test {
    use super::{Renderer, split_lines, fill};

    fn lines(text: &str) -> Vec<&str> {
        text.split("\r\n").collect()
    }

    #[test]
    fn test_single_line() {
        assert_eq!(Renderer::new(70).render(&["foo"]),
                   "ifoo\tfake\texample.com\t0\r\n.\r\n");
    }

    #[test]
    fn test_empty() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(Renderer::default().render(empty), ".\r\n");
        assert_eq!(Renderer::default().render(&["."]), ".\r\n");
    }

    #[test]
    fn test_menu_line_passthrough() {
        let line = "1Submenu\t/menu\tgopher.server.com\t7000";
        assert_eq!(Renderer::new(70).render(&[line]),
                   format!("{}\r\n.\r\n", line));
    }

    #[test]
    fn test_truncate_label() {
        let r = Renderer::new(10);
        let line = format!("1{}\t/menu\thost\t70", "x".repeat(50));
        assert_eq!(r.render(&[line]),
                   format!("1{}\t/menu\thost\t70\r\n.\r\n", "x".repeat(10)));
        assert_eq!(r.render(&["y".repeat(50)]),
                   format!("i{}\tfake\texample.com\t0\r\n.\r\n",
                           "y".repeat(10)));
    }

    #[test]
    fn test_multiline_blocks() {
        let r = Renderer::default();
        assert_eq!(r.render(&["a\nb", "c\r\n\r\nd  "]),
                   "ia\tfake\texample.com\t0\r\n\
                    ib\tfake\texample.com\t0\r\n\
                    ic\tfake\texample.com\t0\r\n\
                    i\tfake\texample.com\t0\r\n\
                    id\tfake\texample.com\t0\r\n\
                    .\r\n");
    }

    #[test]
    fn test_existing_terminator() {
        assert_eq!(Renderer::default().render(&["a", "."]),
                   "ia\tfake\texample.com\t0\r\n.\r\n");
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("a\r\nb\rc\n\nd\n").collect::<Vec<_>>(),
                   vec!["a", "b", "c", "", "d"]);
        assert_eq!(split_lines("").count(), 0);
        assert_eq!(split_lines("a\x0bb\x0cc\x1ed\u{85}e\u{2028}f")
                   .collect::<Vec<_>>(),
                   vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_form_feed_is_line_break() {
        assert_eq!(Renderer::default().render(&["page 1\x0cpage 2"]),
                   "ipage 1\tfake\texample.com\t0\r\n\
                    ipage 2\tfake\texample.com\t0\r\n\
                    .\r\n");
    }

    #[test]
    fn test_fill() {
        assert_eq!(fill("The quick brown fox", 10),
                   vec!["The quick", "brown fox"]);
        assert_eq!(fill("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(fill("", 10), vec![""]);
        assert_eq!(fill("  indented", 20), vec!["  indented"]);
    }

    #[test]
    fn test_wrap() {
        let r = Renderer::new(10);
        assert_eq!(r.wrap("one two three\nfour"),
                   "one two\r\nthree\r\nfour");
    }

    #[test]
    fn test_banner() {
        let r = Renderer::new(70);
        let banner = r.banner("BANNER", "=", "-");
        let rows = lines(&banner);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|x| x.chars().count() == 70));
        assert_eq!(rows[0], "=".repeat(70));
        assert!(rows[1].starts_with("-   "));
        assert!(rows[1].ends_with("   -"));
        assert!(rows[1].contains("BANNER"));
    }

    #[test]
    fn test_banner_variants() {
        let r = Renderer::new(20);
        let banner = r.banner("BANNER LINE 1\nBANNER LINE 2", "=", "-");
        let rows = lines(&banner);
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|x| x.chars().count() == 20));

        let banner = Renderer::new(40).banner("BANNER", "+-", "%$");
        let rows = lines(&banner);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|x| x.chars().count() == 40));
        assert!(rows[0].starts_with("+-+-"));
        assert!(rows[1].starts_with("%$ "));

        assert_eq!(Renderer::new(10).banner("BANNER", "", ""), "  BANNER  ");
    }

    #[test]
    fn test_center() {
        let r = Renderer::new(10);
        assert_eq!(r.center("foo", ' '), "   foo    ");
        assert_eq!(r.center("ab\nlonger one", '_'),
                   "____ab____\r\nlonger one");
        assert_eq!(Renderer::new(9).center("ab", '_'), "____ab___");
    }

    #[test]
    fn test_justify() {
        let r = Renderer::new(10);
        assert_eq!(r.rjust("line 1\nline two\n", '_'),
                   "____line 1\r\n__line two");
        assert_eq!(r.ljust("line 1\nline two\n", '_'),
                   "line 1____\r\nline two__");
        assert_eq!(r.rjust("much too long", ' '), "much too long");
    }

    #[test]
    fn test_float_right() {
        let r = Renderer::new(20);
        assert_eq!(r.float_right("left 1\nleft 2", "right 1", '_'),
                   "left 1_______right 1\r\nleft 2______________");
        assert_eq!(Renderer::new(10).float_right("0123456789", "abc", ' '),
                   "3456789abc");
    }

    #[test]
    fn test_underline() {
        assert_eq!(Renderer::underline("Super Duper", "_"),
                   "Super Duper\r\n___________");
        assert_eq!(Renderer::underline("Super Duper", "*-"),
                   "Super Duper\r\n*-*-*-*-*-*");
        assert_eq!(Renderer::underline("longer line\nshort", "="),
                   "longer line\nshort\r\n===========");
    }
}
