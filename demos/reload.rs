use std::sync::Arc;
use tracing::info;

use tracing_textview::init::init_with_options;
use tracing_textview::noop_view::NoopView;
use tracing_textview::options::TextViewOptions;
use tracing_textview::processor::QueueFullMode;

/// Shows a configuration reload switching formatter and backpressure
/// policy while the pipeline keeps running.
fn main() {
    let logger = init_with_options(TextViewOptions::default()).expect("build text view pipeline");
    logger.add_view(Arc::new(NoopView));

    info!(target: "App", event_id = 1, "formatted by the simple formatter");

    let mut reloaded = TextViewOptions::default();
    reloaded.formatter_name = Some("json".into());
    reloaded.queue_full_mode = QueueFullMode::DropWrite;
    reloaded.max_queue_length = 512;
    logger.reload(reloaded).expect("reload options");

    info!(target: "App", event_id = 2, "formatted by the json formatter");

    println!(
        "enqueued: {}, dropped: {}",
        logger.processor().enqueued_lines.load(std::sync::atomic::Ordering::Relaxed),
        logger.processor().dropped_lines.load(std::sync::atomic::Ordering::Relaxed),
    );

    logger.shutdown();
}
