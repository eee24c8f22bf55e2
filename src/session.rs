//! Sessions carried in the `_session` query parameter
//!
//! Gopher has neither headers nor cookies. The session is signed into an
//! opaque token and appended to every internal link of the response; the
//! client hands it back with the next selector it requests. There is no
//! server-side storage at all.
//!
//! The token is signed, not encrypted, and travels over plain gopher
//! connections. Don't put secrets into the session and keep it small, or
//! selectors get unwieldy.
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use regex::bytes::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{self, Map, Value};
use sha2::Sha256;
use url::form_urlencoded;

use crate::server::Response;

/// Name of the query parameter carrying the session
pub const SESSION_PARAM: &'static str = "_session";
const SALT: &'static [u8] = b"gopher-session";

type HmacSha256 = Hmac<Sha256>;


quick_error!{
    #[derive(Debug)]
    pub enum SessionError {
        BadToken {
            display("session token is malformed")
        }
        BadSignature {
            display("session signature does not match")
        }
        Base64(err: base64::DecodeError) {
            from()
            source(err)
            display("session token is not base64: {}", err)
        }
        Json(err: serde_json::Error) {
            from()
            source(err)
            display("session payload is not a json object: {}", err)
        }
        Pattern(err: regex::Error) {
            from()
            source(err)
            display("can't build link pattern: {}", err)
        }
    }
}


/// Session data, a mapping of string keys to json values
///
/// Keys are kept sorted so that a session always encodes to the same token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    data: Map<String, Value>,
}

impl Session {
    pub fn new() -> Session {
        Session::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Value of `key` if it is a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|x| x.as_str())
    }

    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, val: V)
        -> Option<Value>
    {
        self.data.insert(key.into(), val.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn clear(&mut self) {
        self.data.clear()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn iter(&self) -> serde_json::map::Iter {
        self.data.iter()
    }
}


/// Signs sessions into tokens and tokens back into sessions
///
/// A token is `<payload>.<signature>`: the compact json of the session and
/// an HMAC-SHA256 over it, both base64url without padding. The signing key
/// is derived from the secret key and a fixed salt.
#[derive(Clone)]
pub struct SessionCodec {
    mac: HmacSha256,
}

impl SessionCodec {
    pub fn new(secret_key: &[u8]) -> SessionCodec {
        let derived = hmac_sha256(secret_key, SALT);
        SessionCodec { mac: keyed(&derived) }
    }

    fn signature(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    /// Encodes and signs the session
    pub fn dumps(&self, session: &Session) -> Result<String, SessionError> {
        let json = serde_json::to_vec(session)?;
        let payload = URL_SAFE_NO_PAD.encode(&json);
        let signature = URL_SAFE_NO_PAD.encode(
            self.signature(payload.as_bytes()));
        Ok(format!("{}.{}", payload, signature))
    }

    /// Verifies and decodes a token
    pub fn loads(&self, token: &str) -> Result<Session, SessionError> {
        let mut parts = token.rsplitn(2, '.');
        let signature = parts.next().ok_or(SessionError::BadToken)?;
        let payload = parts.next().ok_or(SessionError::BadToken)?;
        let signature = URL_SAFE_NO_PAD.decode(signature)?;
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::BadSignature)?;
        let json = URL_SAFE_NO_PAD.decode(payload)?;
        Ok(serde_json::from_slice(&json)?)
    }

    /// Session from the raw `_session` parameter
    ///
    /// A missing or tampered token gives an empty session, the client
    /// never sees an error for it.
    pub fn open(&self, raw: Option<&str>) -> Session {
        match raw {
            Some(token) if !token.is_empty() => {
                self.loads(token).unwrap_or_else(|e| {
                    debug!("Ignoring session token: {}", e);
                    Session::new()
                })
            }
            _ => Session::new(),
        }
    }

    /// Propagates the session into every internal link of the response
    ///
    /// Must run on the fully rendered body. Lines of the form
    /// `<type><label>\t<selector>\t<host>\t<port>\r` whose host and port are
    /// this server's get `_session` set in the selector's query. Info lines,
    /// links to other servers and `URL:` selectors are left alone, and
    /// nothing happens for an empty session or a passthrough response.
    pub fn save(&self, session: &Session, response: &mut Response,
        host: &str, port: u16)
        -> Result<(), SessionError>
    {
        if session.is_empty() || response.is_passthrough() {
            return Ok(());
        }
        let token = self.dumps(session)?;
        let body = rewrite_links(response.body(), &token, host, port)?;
        response.set_body(body);
        Ok(())
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = keyed(key);
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn keyed(key: &[u8]) -> HmacSha256 {
    match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        // hmac hashes keys longer than the block size and pads shorter ones
        Err(_) => unreachable!("hmac accepts keys of any length"),
    }
}

/// Appends `_session=<token>` to the selector of internal menu links
///
/// Works on raw bytes, lines that are not valid UTF-8 are copied as is.
pub fn rewrite_links(body: &[u8], token: &str, host: &str, port: u16)
    -> Result<Vec<u8>, SessionError>
{
    let pattern = Regex::new(&format!(
        r"(?m)^(?P<type>[^i])(?P<desc>.+)\t(?P<selector>.*)\t{}\t{}\r$",
        regex::escape(host), port))?;
    let result = pattern.replace_all(body, |caps: &Captures| {
        let selector = match std::str::from_utf8(&caps["selector"]) {
            Ok(selector) if !selector.starts_with("URL:") => selector,
            _ => return caps[0].to_vec(),
        };
        let mut line = Vec::with_capacity(caps[0].len() + token.len() + 10);
        line.extend_from_slice(&caps["type"]);
        line.extend_from_slice(&caps["desc"]);
        line.push(b'\t');
        line.extend_from_slice(
            with_query_param(selector, SESSION_PARAM, token).as_bytes());
        line.extend_from_slice(format!("\t{}\t{}\r", host, port).as_bytes());
        line
    });
    Ok(result.into_owned())
}

/// Sets `key` in the query of a selector, replacing any previous value
pub fn with_query_param(selector: &str, key: &str, value: &str) -> String {
    let (rest, fragment) = match selector.find('#') {
        Some(idx) => (&selector[..idx], &selector[idx..]),
        None => (selector, ""),
    };
    let (path, query) = match rest.find('?') {
        Some(idx) => (&rest[..idx], &rest[idx+1..]),
        None => (rest, ""),
    };
    let mut pairs = form_urlencoded::parse(query.as_bytes())
        .filter(|&(ref k, ref v)| !v.is_empty() && k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect::<Vec<_>>();
    pairs.push((key.to_string(), value.to_string()));
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{}?{}{}", path, query, fragment)
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use crate::server::Response;
    use super::{Session, SessionCodec, SessionError, with_query_param};

    fn codec() -> SessionCodec {
        SessionCodec::new(b"s3cr3tk3y")
    }

    fn session() -> Session {
        let mut session = Session::new();
        session.insert("name", "fran");
        session
    }

    #[test]
    fn test_round_trip() {
        let mut s = session();
        s.insert("count", 3);
        s.insert("tags", json!(["a", "b"]));
        s.insert("nested", json!({"x": null, "y": 1.5}));
        let token = codec().dumps(&s).unwrap();
        assert_eq!(codec().open(Some(&token)), s);
    }

    #[test]
    fn test_deterministic() {
        let a = codec().dumps(&session()).unwrap();
        let b = codec().dumps(&session()).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("eyJuYW1lIjoiZnJhbiJ9."));
        assert!(!a.contains('='));
    }

    #[test]
    fn test_open_invalid() {
        assert!(codec().open(None).is_empty());
        assert!(codec().open(Some("")).is_empty());
        assert!(codec().open(Some("garbage")).is_empty());
        let token = codec().dumps(&session()).unwrap();
        let other = SessionCodec::new(b"another key");
        assert!(other.open(Some(&token)).is_empty());
        assert_matches!(other.loads(&token), Err(SessionError::BadSignature));
        let tampered = format!("eyJuYW1lIjoiYm9iIn0{}",
                               &token[token.find('.').unwrap()..]);
        assert!(codec().open(Some(&tampered)).is_empty());
    }

    #[test]
    fn test_query_param() {
        assert_eq!(with_query_param("/menu", "_session", "abc.def"),
                   "/menu?_session=abc.def");
        assert_eq!(with_query_param("/m?a=1&_session=old", "_session", "n"),
                   "/m?a=1&_session=n");
        assert_eq!(with_query_param("/m?q=a b#top", "_session", "n"),
                   "/m?q=a+b&_session=n#top");
    }

    #[test]
    fn test_save_rewrites_internal_links() {
        let body = "iname:\tfake\texample.com\t0\r\n\
                    1Home\t/menu\tgopher.server.com\t7000\r\n\
                    1External\t/\tdebian.org\t70\r\n\
                    hWeb\tURL:http://x.org\tgopher.server.com\t7000\r\n\
                    .\r\n";
        let mut resp = Response::text(body);
        let codec = codec();
        codec.save(&session(), &mut resp, "gopher.server.com", 7000)
            .unwrap();
        let token = codec.dumps(&session()).unwrap();
        let expected = format!(
            "iname:\tfake\texample.com\t0\r\n\
             1Home\t/menu?_session={}\tgopher.server.com\t7000\r\n\
             1External\t/\tdebian.org\t70\r\n\
             hWeb\tURL:http://x.org\tgopher.server.com\t7000\r\n\
             .\r\n", token);
        assert_eq!(String::from_utf8(resp.body().to_vec()).unwrap(),
                   expected);
    }

    #[test]
    fn test_save_round_trip_through_link() {
        let mut resp = Response::text("1Home\t/menu?a=1\th\t70\r\n.\r\n");
        let mut s = session();
        s.insert("visits", 2);
        codec().save(&s, &mut resp, "h", 70).unwrap();
        let body = String::from_utf8(resp.body().to_vec()).unwrap();
        let selector = body.split('\t').nth(1).unwrap();
        let token = selector.split("_session=").nth(1).unwrap();
        assert_eq!(codec().open(Some(token)), s);
    }

    #[test]
    fn test_save_noop() {
        let body = "1Home\t/menu\th\t70\r\n.\r\n";
        let mut resp = Response::text(body);
        codec().save(&Session::new(), &mut resp, "h", 70).unwrap();
        assert_eq!(resp.body(), body.as_bytes());

        let mut resp = Response::file(body.as_bytes().to_vec(), "text/plain");
        codec().save(&session(), &mut resp, "h", 70).unwrap();
        assert_eq!(resp.body(), body.as_bytes());
    }

    #[test]
    fn test_save_keeps_invalid_utf8() {
        let mut resp = Response::text("");
        resp.set_body(b"iLatin-1 caf\xe9\tfake\texample.com\t0\r\n\
                        1Home\t/menu\th\t70\r\n.\r\n".to_vec());
        let codec = codec();
        codec.save(&session(), &mut resp, "h", 70).unwrap();
        let token = codec.dumps(&session()).unwrap();
        let mut expected = b"iLatin-1 caf\xe9\tfake\texample.com\t0\r\n"
            .to_vec();
        expected.extend_from_slice(
            format!("1Home\t/menu?_session={}\th\t70\r\n.\r\n", token)
            .as_bytes());
        assert_eq!(resp.body(), &expected[..]);
    }
}
