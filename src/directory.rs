//! Serving a directory tree as gopher menus
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

use crate::menu::{ItemType, MenuBuilder, Renderer, DEFAULT_WIDTH};
use crate::server::{HandlerError, Response};

const TIMESTAMP_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

/// Mime types by file extension
static MIME_TYPES: &'static [(&'static str, &'static str)] = &[
    ("txt", "text/plain"),
    ("text", "text/plain"),
    ("md", "text/markdown"),
    ("rst", "text/x-rst"),
    ("csv", "text/csv"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("css", "text/css"),
    ("xml", "text/xml"),
    ("py", "text/x-python"),
    ("c", "text/x-c"),
    ("h", "text/x-c"),
    ("rs", "text/x-rust"),
    ("gif", "image/gif"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("bmp", "image/bmp"),
    ("ico", "image/vnd.microsoft.icon"),
    ("svg", "image/svg+xml"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("webp", "image/webp"),
    ("pdf", "application/pdf"),
    ("ps", "application/postscript"),
    ("json", "application/json"),
    ("js", "application/javascript"),
    ("zip", "application/zip"),
    ("tar", "application/x-tar"),
    ("doc", "application/msword"),
    ("xls", "application/vnd.ms-excel"),
    ("exe", "application/octet-stream"),
    ("bin", "application/octet-stream"),
    ("so", "application/octet-stream"),
    ("sh", "application/x-sh"),
    ("wasm", "application/wasm"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/x-wav"),
    ("ogg", "audio/ogg"),
    ("flac", "audio/flac"),
    ("aif", "audio/x-aiff"),
    ("aiff", "audio/x-aiff"),
    ("au", "audio/basic"),
    ("mp4", "video/mp4"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("webm", "video/webm"),
];

/// Suffixes that mark a compressed file, whatever is inside
static ENCODINGS: &'static [&'static str] = &["gz", "Z", "bz2", "xz", "br"];

/// Abbreviated compressed tarball suffixes
static COMPRESSED: &'static [&'static str] = &["tgz", "taz", "tz", "tbz2", "txz"];

/// Item types by mime type prefix, first match wins
static ITEM_TYPES: &'static [(&'static str, ItemType)] = &[
    ("text/", ItemType::Text),
    ("image/gif", ItemType::Gif),
    ("image/", ItemType::Image),
    ("application/pdf", ItemType::Document),
    ("application/", ItemType::Binary),
    ("audio/", ItemType::Sound),
    ("video/", ItemType::Video),
];


fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|x| x.to_str())
}

/// Mime type of a file by its extension
pub fn mime_type(path: &Path) -> Option<&'static str> {
    let ext = extension(path)?;
    let ext = ext.to_lowercase();
    MIME_TYPES.iter()
        .find(|&&(e, _)| e == ext)
        .map(|&(_, mime)| mime)
}

fn is_compressed(path: &Path) -> bool {
    match extension(path) {
        Some(ext) => ENCODINGS.contains(&ext)
            || ENCODINGS.contains(&&ext.to_lowercase()[..])
            || COMPRESSED.contains(&&ext.to_lowercase()[..]),
        None => false,
    }
}

/// Item type to list a file with
///
/// Compressed files are archives, everything else goes by mime type.
/// Unknown files are assumed to be text.
pub fn item_type(path: &Path, is_dir: bool) -> ItemType {
    if is_dir {
        return ItemType::Menu;
    }
    if is_compressed(path) {
        return ItemType::Archive;
    }
    let mime = match mime_type(path) {
        Some(mime) => mime,
        None => return ItemType::Text,
    };
    ITEM_TYPES.iter()
        .find(|&&(prefix, _)| mime.starts_with(prefix))
        .map(|&(_, item)| item)
        .unwrap_or(ItemType::Text)
}


/// What a directory path resolved to
#[derive(Debug)]
pub enum Listing {
    /// Contents of a regular file
    File { data: Vec<u8>, content_type: &'static str },
    /// Menu lines listing a directory
    Menu(Vec<String>),
}

impl Listing {
    /// Files are sent as is, menus are rendered
    pub fn into_response(self, renderer: &Renderer) -> Response {
        match self {
            Listing::File { data, content_type } => {
                Response::file(data, content_type)
            }
            Listing::Menu(lines) => Response::text(renderer.render(&lines)),
        }
    }
}

/// A directory on the filesystem mapped onto selectors
///
/// The file `<root>/a/b.txt` is served at `<url_prefix>/a/b.txt`. The
/// handler strips the prefix and passes the rest to `load`.
#[derive(Debug, Clone)]
pub struct Directory {
    root: PathBuf,
    url_prefix: String,
    show_timestamp: bool,
    width: usize,
}

impl Directory {
    pub fn new<P: Into<PathBuf>>(root: P, url_prefix: &str) -> Directory {
        Directory {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            show_timestamp: false,
            width: DEFAULT_WIDTH,
        }
    }

    /// Show modification times, right-aligned to the width
    pub fn show_timestamp(mut self, value: bool) -> Directory {
        self.show_timestamp = value;
        self
    }

    pub fn width(mut self, width: usize) -> Directory {
        self.width = width;
        self
    }

    /// Loads a file or lists a directory, relative to the root
    ///
    /// Paths leaving the root, absolute paths included, are not found.
    pub fn load(&self, relative: &str, menu: &MenuBuilder)
        -> Result<Listing, HandlerError>
    {
        let relative = normalize(relative).ok_or(HandlerError::NotFound)?;
        let path = self.root.join(&relative);
        let meta = fs::metadata(&path).map_err(|_| HandlerError::NotFound)?;
        if meta.is_file() {
            Ok(Listing::File {
                data: fs::read(&path)?,
                content_type: mime_type(&path)
                    .unwrap_or("application/octet-stream"),
            })
        } else if meta.is_dir() {
            Ok(Listing::Menu(self.list(&relative, &path, menu)?))
        } else {
            Err(HandlerError::NotFound)
        }
    }

    fn list(&self, relative: &Path, path: &Path, menu: &MenuBuilder)
        -> Result<Vec<String>, HandlerError>
    {
        let mut lines = Vec::new();
        if let Some(parent) = relative.parent() {
            lines.push(menu.dir("..", &self.selector(parent)));
        }
        let mut entries = fs::read_dir(path)?
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|entry| entry.file_name());
        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = entry.metadata()?;
            let is_dir = meta.is_dir();
            let mut label = name.clone();
            if is_dir {
                label.push('/');
            }
            if self.show_timestamp {
                let stamp = timestamp(meta.modified()?);
                let pad = self.width.saturating_sub(stamp.chars().count());
                label = format!("{:<pad$}{}", label, stamp, pad=pad);
            }
            lines.push(menu.link(item_type(&entry.path(), is_dir), &label,
                                 &self.selector(&relative.join(&name))));
        }
        Ok(lines)
    }

    fn selector(&self, relative: &Path) -> String {
        let mut result = self.url_prefix.clone();
        for part in relative.components() {
            result.push('/');
            result.push_str(&part.as_os_str().to_string_lossy());
        }
        if result.is_empty() {
            result.push('/');
        }
        result
    }
}

/// Relative path with `.` removed, `None` if it leaves the root
fn normalize(relative: &str) -> Option<PathBuf> {
    let mut result = PathBuf::new();
    for part in Path::new(relative.trim_start_matches('/')).components() {
        match part {
            Component::Normal(name) => result.push(name),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
            => return None,
        }
    }
    Some(result)
}

fn timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod test {
    use std::env;
    use std::fs;
    use std::path::{Path, PathBuf};
    use crate::menu::{ItemType, MenuBuilder};
    use crate::server::HandlerError;
    use super::{Directory, Listing, item_type, normalize};

    fn fixture(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("http-gopher-{}-{}",
                                               name, ::std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("test_file.txt"), b"Hello World!").unwrap();
        fs::write(dir.join("sub/image.png"), b"\x89PNG").unwrap();
        dir
    }

    fn menu() -> MenuBuilder {
        MenuBuilder::new("gopher.server.com", 7000)
    }

    #[test]
    fn test_item_type() {
        let t = |name| item_type(Path::new(name), false);
        assert_eq!(item_type(Path::new("music"), true), ItemType::Menu);
        assert_eq!(t("file.txt"), ItemType::Text);
        assert_eq!(t("README"), ItemType::Text);
        assert_eq!(t("file.unknown"), ItemType::Text);
        assert_eq!(t("file.tar.gz"), ItemType::Archive);
        assert_eq!(t("file.Z"), ItemType::Archive);
        assert_eq!(t("file.tgz"), ItemType::Archive);
        assert_eq!(t("file.gif"), ItemType::Gif);
        assert_eq!(t("file.PNG"), ItemType::Image);
        assert_eq!(t("file.pdf"), ItemType::Document);
        assert_eq!(t("file.zip"), ItemType::Binary);
        assert_eq!(t("file.mp3"), ItemType::Sound);
        assert_eq!(t("file.mp4"), ItemType::Video);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(""), Some(PathBuf::new()));
        assert_eq!(normalize("a/./b"), Some(PathBuf::from("a/b")));
        assert_eq!(normalize("/a"), Some(PathBuf::from("a")));
        assert_eq!(normalize(".."), None);
        assert_eq!(normalize("a/../../etc"), None);
    }

    #[test]
    fn test_load_file() {
        let dir = Directory::new(fixture("file"), "/directory");
        match dir.load("test_file.txt", &menu()).unwrap() {
            Listing::File { data, content_type } => {
                assert_eq!(data, b"Hello World!");
                assert_eq!(content_type, "text/plain");
            }
            Listing::Menu(_) => panic!("file expected"),
        }
        assert_matches!(dir.load("..", &menu()),
                        Err(HandlerError::NotFound));
        assert_matches!(dir.load("missing.txt", &menu()),
                        Err(HandlerError::NotFound));
    }

    #[test]
    fn test_load_folder() {
        let dir = Directory::new(fixture("folder"), "/directory");
        let lines = match dir.load("", &menu()).unwrap() {
            Listing::Menu(lines) => lines,
            Listing::File { .. } => panic!("menu expected"),
        };
        assert_eq!(lines, vec![
            "1sub/\t/directory/sub\tgopher.server.com\t7000".to_string(),
            "0test_file.txt\t/directory/test_file.txt\tgopher.server.com\t7000"
                .to_string(),
        ]);
        let lines = match dir.load("sub", &menu()).unwrap() {
            Listing::Menu(lines) => lines,
            Listing::File { .. } => panic!("menu expected"),
        };
        assert_eq!(lines, vec![
            "1..\t/directory\tgopher.server.com\t7000".to_string(),
            "Iimage.png\t/directory/sub/image.png\tgopher.server.com\t7000"
                .to_string(),
        ]);
    }

    #[test]
    fn test_timestamp() {
        let dir = Directory::new(fixture("stamp"), "/directory")
            .show_timestamp(true)
            .width(40);
        let lines = match dir.load("", &menu()).unwrap() {
            Listing::Menu(lines) => lines,
            Listing::File { .. } => panic!("menu expected"),
        };
        let label = lines[1].split('\t').next().unwrap();
        assert_eq!(label.chars().count(), 41);
        assert!(label.starts_with("0test_file.txt  "));
    }
}
