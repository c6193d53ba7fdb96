//! Source positions

/// A half-open byte range in one source file, with the 1-based line of its
/// first byte. Diagnostics report the line; the byte range feeds the
/// snippet renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    /// 1-based source line of `start`
    pub line: u32,
}

impl Span {
    /// Span covering `start..end` on `line`.
    pub fn new(start: usize, end: usize, line: u32) -> Self {
        Span { start, end, line }
    }

    /// A zero-width span for nodes synthesized during analysis.
    pub fn synthetic(line: u32) -> Self {
        Span {
            start: 0,
            end: 0,
            line,
        }
    }
}
