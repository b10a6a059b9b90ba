// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Payload text decoding. Symbol payloads are raw bytes; this turns them into
// text without ever dropping a result.

/// Decode raw payload bytes into text.
///
/// Tried in order:
/// 1. UTF-8.
/// 2. ISO-8859-1 (one byte per character), accepted only if the result holds
///    no control characters other than whitespace.
/// 3. An ASCII escape of the raw bytes (`\xNN` for anything non-printable),
///    which round-trips losslessly.
pub fn decode_payload(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_owned();
    }
    if let Some(text) = decode_latin1_printable(bytes) {
        return text;
    }
    bytes.escape_ascii().to_string()
}

/// Reconcile the text a reader already produced with the raw byte segments it
/// decoded it from.
///
/// When the text is exactly the UTF-8 or ISO-8859-1 rendering of `raw`, the
/// reader chose a charset for us and the bytes are re-decoded with
/// [`decode_payload`]; the same happens when the reader's own decoding was
/// lossy (replacement characters). When there are no usable bytes but the text is plainly
/// a one-byte-per-character rendering of binary data, its characters are
/// taken as the bytes. Anything else (mixed-mode payloads, multi-byte
/// charsets) is kept as the reader produced it.
pub fn reconcile_text(text: &str, raw: &[u8]) -> String {
    if !raw.is_empty() {
        let as_utf8 = std::str::from_utf8(raw).is_ok_and(|utf8| utf8 == text);
        let as_latin1 = text.chars().eq(raw.iter().map(|&b| char::from(b)));
        let lossy = text.contains(char::REPLACEMENT_CHARACTER);
        if as_utf8 || as_latin1 || lossy {
            return decode_payload(raw);
        }
    }

    if has_binary_controls(text) {
        if let Some(bytes) = latin1_bytes(text) {
            return decode_payload(&bytes);
        }
    }

    text.to_owned()
}

fn decode_latin1_printable(bytes: &[u8]) -> Option<String> {
    bytes
        .iter()
        .map(|&b| char::from(b))
        .map(|c| (!is_binary_control(c)).then_some(c))
        .collect()
}

fn latin1_bytes(text: &str) -> Option<Vec<u8>> {
    text.chars().map(|c| u8::try_from(c).ok()).collect()
}

fn has_binary_controls(text: &str) -> bool {
    text.chars().any(is_binary_control)
}

fn is_binary_control(c: char) -> bool {
    c.is_control() && !c.is_ascii_whitespace()
}
