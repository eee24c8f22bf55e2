//! Header helpers for the HTTP side of the listener.

#[inline(always)]
pub fn is_content_length(name: &str) -> bool {
    name.eq_ignore_ascii_case("content-length")
}

#[inline(always)]
pub fn is_transfer_encoding(name: &str) -> bool {
    name.eq_ignore_ascii_case("transfer-encoding")
}

#[inline(always)]
pub fn is_host(name: &str) -> bool {
    name.eq_ignore_ascii_case("host")
}

#[inline(always)]
// header value is byte sequence
// we need case insensitive comparison and strip out of the whitespace
pub fn is_identity(val: &[u8]) -> bool {
    trim(val).eq_ignore_ascii_case(b"identity")
}

fn trim(val: &[u8]) -> &[u8] {
    let is_space = |c: &u8| matches!(*c, b'\r' | b'\n' | b' ' | b'\t');
    let start = val.iter().position(|c| !is_space(c)).unwrap_or(val.len());
    let end = val.iter().rposition(|c| !is_space(c)).map_or(start, |x| x+1);
    &val[start..end]
}
