use crate::ansi::StyledSegment;
use crate::view::TextView;

/// A view that discards everything handed to it.
///
/// Useful for measuring the overhead of the pipeline itself without any
/// rendering work, and for tests that only care about queue behavior.
#[derive(Clone, Copy, Default)]
pub struct NoopView;

impl TextView for NoopView {
    fn set_max_lines(&self, _max_lines: usize) {}

    fn render(&self, _segments: &[StyledSegment<'_>]) {}
}
