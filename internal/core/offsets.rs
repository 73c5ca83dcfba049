// Copyright © SoftInput contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offset types and string-slicing helpers.
//!
//! The input-method protocol reports positions as **character offsets**
//! (Unicode scalar values). Two distinct coordinate spaces exist:
//!
//! * [`AbsoluteOffset`] — counted from the start of the logical document.
//! * [`BlockRelativeOffset`] — counted from the start of the editing block
//!   (paragraph) that currently contains the cursor. This is the space the
//!   focused surface reports its positions in.
//!
//! Mixing the two silently breaks multi-paragraph editors, so the only way
//! to move between them is the explicit conversion pair
//! [`BlockRelativeOffset::to_absolute`] / [`AbsoluteOffset::to_block_relative`].

use derive_more::{Display, From, Into};

/// A character offset counted from the start of the logical document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, From, Into, Display)]
pub struct AbsoluteOffset(pub usize);

/// A character offset counted from the start of the current editing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, From, Into, Display)]
pub struct BlockRelativeOffset(pub usize);

impl AbsoluteOffset {
    /// Converts to the block-relative space anchored at `block_origin`.
    ///
    /// Returns `None` when the offset lies before the block origin, which
    /// means the position is not addressable in the surface's current block.
    pub fn to_block_relative(self, block_origin: AbsoluteOffset) -> Option<BlockRelativeOffset> {
        self.0.checked_sub(block_origin.0).map(BlockRelativeOffset)
    }

    pub fn saturating_sub(self, chars: usize) -> AbsoluteOffset {
        AbsoluteOffset(self.0.saturating_sub(chars))
    }
}

impl BlockRelativeOffset {
    /// Converts to the document-global space anchored at `block_origin`.
    pub fn to_absolute(self, block_origin: AbsoluteOffset) -> AbsoluteOffset {
        AbsoluteOffset(block_origin.0 + self.0)
    }
}

impl core::ops::Add<usize> for AbsoluteOffset {
    type Output = AbsoluteOffset;
    fn add(self, chars: usize) -> AbsoluteOffset {
        AbsoluteOffset(self.0 + chars)
    }
}

impl core::ops::Sub<AbsoluteOffset> for AbsoluteOffset {
    /// The distance in characters between two absolute offsets.
    type Output = usize;
    fn sub(self, other: AbsoluteOffset) -> usize {
        self.0 - other.0
    }
}

// ===== Character/byte slicing helpers =====
//
// Rust strings are indexed in bytes; the protocol speaks in characters.
// These helpers are the only place the two meet.

/// Number of characters in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset after `chars` characters, or the string length if `chars`
/// exceeds the number of characters in the string.
pub fn byte_offset_for_char(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map(|(idx, _)| idx).unwrap_or(text.len())
}

/// Number of characters before the byte offset `byte`.
///
/// `byte` must lie on a character boundary; offsets beyond the string length
/// are clamped to the end.
pub fn char_offset_for_byte(text: &str, byte: usize) -> usize {
    let byte = byte.min(text.len());
    debug_assert!(text.is_char_boundary(byte));
    text[..byte].chars().count()
}

/// Slices `text` by character offsets, clamping both ends to the available
/// range (and swapping is *not* performed; `start > end` yields "").
pub fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let start = byte_offset_for_char(text, start);
    let end = byte_offset_for_char(text, end);
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_offset_for_char_multibyte() {
        let text = "héllo";
        assert_eq!(byte_offset_for_char(text, 0), 0);
        assert_eq!(byte_offset_for_char(text, 1), 1); // after 'h'
        assert_eq!(byte_offset_for_char(text, 2), 3); // after 'é'
        assert_eq!(byte_offset_for_char(text, 5), 6); // end
        assert_eq!(byte_offset_for_char(text, 10), 6); // beyond → end
    }

    #[test]
    fn char_offset_for_byte_multibyte() {
        let text = "héllo";
        assert_eq!(char_offset_for_byte(text, 0), 0);
        assert_eq!(char_offset_for_byte(text, 1), 1);
        assert_eq!(char_offset_for_byte(text, 3), 2);
        assert_eq!(char_offset_for_byte(text, 6), 5);
        assert_eq!(char_offset_for_byte(text, 42), 5); // beyond → end
    }

    #[test]
    fn slice_chars_clamps() {
        assert_eq!(slice_chars("héllo", 1, 3), "él");
        assert_eq!(slice_chars("héllo", 3, 100), "lo");
        assert_eq!(slice_chars("héllo", 4, 2), "");
    }

    #[test]
    fn block_relative_round_trip() {
        let origin = AbsoluteOffset(12);
        let rel = BlockRelativeOffset(5);
        let abs = rel.to_absolute(origin);
        assert_eq!(abs, AbsoluteOffset(17));
        assert_eq!(abs.to_block_relative(origin), Some(rel));
        // Before the block origin there is no block-relative address.
        assert_eq!(AbsoluteOffset(3).to_block_relative(origin), None);
    }
}
