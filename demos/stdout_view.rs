use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, info_span, warn};

use tracing_textview::ansi::StyledSegment;
use tracing_textview::init::init_with_options;
use tracing_textview::options::TextViewOptions;
use tracing_textview::view::TextView;

/// A terminal stand-in for a UI text widget: keeps the most recent lines
/// and reprints them with their decoded colors.
struct StdoutView {
    lines: Mutex<VecDeque<String>>,
    max_lines: AtomicUsize,
}

impl StdoutView {
    fn new() -> Self {
        StdoutView {
            lines: Mutex::new(VecDeque::new()),
            max_lines: AtomicUsize::new(100),
        }
    }
}

impl TextView for StdoutView {
    fn set_max_lines(&self, max_lines: usize) {
        self.max_lines.store(max_lines, Ordering::SeqCst);
    }

    fn render(&self, segments: &[StyledSegment<'_>]) {
        let mut rendered = String::new();
        for segment in segments {
            match segment.foreground.map(|color| color.to_rgb()) {
                Some((r, g, b)) => {
                    rendered.push_str(&format!("\u{1b}[38;2;{r};{g};{b}m{}\u{1b}[0m", segment.text));
                }
                None => rendered.push_str(segment.text),
            }
        }
        print!("{rendered}");

        let mut lines = self.lines.lock().unwrap();
        lines.push_back(rendered);
        while lines.len() > self.max_lines.load(Ordering::SeqCst) {
            lines.pop_front();
        }
    }
}

fn main() {
    let mut options = TextViewOptions::default();
    options.formatter_name = Some("themed".into());
    options.themed.common.include_scopes = true;
    options.themed.common.timestamp_format = Some("%H:%M:%S".into());

    let logger = init_with_options(options).expect("build text view pipeline");
    logger.add_view(Arc::new(StdoutView::new()));

    let span = info_span!("startup", version = 3);
    let _guard = span.enter();
    info!(target: "App.Program", event_id = 10, "Request received");
    warn!(target: "App.Network", event_id = 2, "retrying");

    logger.shutdown();
}
