//! Byte-bounded message splitting.
//!
//! Sizes are measured the way a segment is written into the JSON envelope,
//! so quotes, backslashes and control characters count with their escapes.

/// Default upper bound for one chunk. Leaves headroom under the 256 KiB
/// queue ceiling for the envelope around it.
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 200_000;

/// Smallest bound that always fits one escaped character (`\u00XX`).
pub const MIN_CHUNK_BYTES: usize = 6;

/// Bytes `c` occupies inside a JSON string literal.
pub fn escaped_width(c: char) -> usize {
    match c {
        '"' | '\\' | '\n' | '\r' | '\t' | '\u{08}' | '\u{0c}' => 2,
        c if (c as u32) < 0x20 => 6,
        c => c.len_utf8(),
    }
}

/// Splits `message` into consecutive segments whose escaped size is at most
/// `max_bytes`.
///
/// Segments never cut a UTF-8 character in half, so a segment may come up
/// a few bytes short of the bound when a character straddles it.
/// Concatenating the segments yields `message` again. A message within the
/// bound (including the empty message) yields exactly one segment.
/// Bounds below [`MIN_CHUNK_BYTES`] are raised to it.
pub fn split(message: &str, max_bytes: usize) -> Chunks<'_> {
    Chunks {
        rest: message,
        max_bytes: max_bytes.max(MIN_CHUNK_BYTES),
        emitted_any: false,
    }
}

/// Iterator returned by [`split`].
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    rest: &'a str,
    max_bytes: usize,
    emitted_any: bool,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            if self.emitted_any {
                return None;
            }
            self.emitted_any = true;
            return Some(self.rest);
        }

        let mut width = 0;
        let mut end = self.rest.len();
        for (index, c) in self.rest.char_indices() {
            width += escaped_width(c);
            if width > self.max_bytes {
                end = index;
                break;
            }
        }

        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        self.emitted_any = true;
        Some(head)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.rest.is_empty() {
            let left = usize::from(!self.emitted_any);
            return (left, Some(left));
        }
        // Escaping never shrinks a character, and every segment holds at least one.
        let lower = self.rest.len().div_ceil(self.max_bytes);
        (lower, Some(self.rest.len()))
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}
