//! `wchar_t` string conversion.
//!
//! The SDK passes every string as a NUL-terminated `wchar_t` array. `wchar_t`
//! is UTF-16 on Windows and UTF-32 everywhere else.

/// The SDK's `LIMWCHAR`.
#[cfg(windows)]
pub type LimWchar = u16;

/// The SDK's `LIMWCHAR`.
#[cfg(not(windows))]
pub type LimWchar = u32;

/// Encode a string as a NUL-terminated wide string.
///
/// Returns `None` if the string contains an interior NUL.
pub fn to_wide(s: &str) -> Option<Vec<LimWchar>> {
    if s.contains('\0') {
        return None;
    }
    let mut wide = encode(s);
    wide.push(0);
    Some(wide)
}

/// Decode a wide string buffer up to its first NUL (or its end).
pub fn from_wide(buf: &[LimWchar]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    decode(&buf[..end])
}

/// Copy `s` into a fixed-size buffer, truncating so that a terminating NUL
/// always fits.
pub fn write_wide(buf: &mut [LimWchar], s: &str) {
    if buf.is_empty() {
        return;
    }
    let encoded = encode(s);
    let n = encoded.len().min(buf.len() - 1);
    buf[..n].copy_from_slice(&encoded[..n]);
    buf[n..].fill(0);
}

#[cfg(windows)]
fn encode(s: &str) -> Vec<LimWchar> {
    s.encode_utf16().collect()
}

#[cfg(windows)]
fn decode(buf: &[LimWchar]) -> String {
    String::from_utf16_lossy(buf)
}

#[cfg(not(windows))]
fn encode(s: &str) -> Vec<LimWchar> {
    s.chars().map(|c| c as LimWchar).collect()
}

#[cfg(not(windows))]
fn decode(buf: &[LimWchar]) -> String {
    buf.iter()
        .map(|&c| char::from_u32(c).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
