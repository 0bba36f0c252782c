use crate::formatter::{Formatter, FormatterRegistry};
use crate::json::JsonFormatter;
use crate::layer::{SeverityFilter, TextViewLayer};
use crate::options::{
    FormatterOptions, OptionsError, OptionsHandle, SimpleFormatterOptions, TextViewOptions,
    ThemedFormatterOptions,
};
use crate::processor::LogProcessor;
use crate::simple::SimpleFormatter;
use crate::systemd::SystemdFormatter;
use crate::theme::ThemeProvider;
use crate::themed::ThemedFormatter;
use crate::view::{TextView, TextViewRegistry};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Per-formatter option snapshots, swapped on reload.
struct FormatterSettings {
    simple: Arc<OptionsHandle<SimpleFormatterOptions>>,
    json: Arc<OptionsHandle<FormatterOptions>>,
    systemd: Arc<OptionsHandle<FormatterOptions>>,
    themed: Arc<OptionsHandle<ThemedFormatterOptions>>,
}

/// The assembled logging provider: queue, dispatch thread, formatter and
/// theme registries, and the view set.
///
/// Construction validates the configuration and hands back the provider
/// together with the [`TextViewLayer`] to install in a subscriber stack.
/// Views register against this provider explicitly; there is no
/// process-wide registration state.
pub struct TextViewLogger {
    options: OptionsHandle<TextViewOptions>,
    processor: Arc<LogProcessor>,
    views: Arc<TextViewRegistry>,
    formatters: Arc<FormatterRegistry>,
    themes: Arc<ThemeProvider>,
    filter: Arc<OptionsHandle<SeverityFilter>>,
    settings: FormatterSettings,
}

impl TextViewLogger {
    /// Build the pipeline with themes resolved from the environment.
    pub fn new(options: TextViewOptions) -> Result<(Self, TextViewLayer), OptionsError> {
        Self::with_theme_provider(options, Arc::new(ThemeProvider::new()))
    }

    /// Build the pipeline over an explicit [`ThemeProvider`]; used by
    /// tests and embedders that control color support themselves.
    pub fn with_theme_provider(
        options: TextViewOptions,
        themes: Arc<ThemeProvider>,
    ) -> Result<(Self, TextViewLayer), OptionsError> {
        options.validate()?;
        themes.reload(options.themed.theme.as_deref());

        let settings = FormatterSettings {
            simple: Arc::new(OptionsHandle::new(options.simple.clone())),
            json: Arc::new(OptionsHandle::new(options.json.clone())),
            systemd: Arc::new(OptionsHandle::new(options.systemd.clone())),
            themed: Arc::new(OptionsHandle::new(options.themed.clone())),
        };

        let formatters = Arc::new(FormatterRegistry::new(vec![
            Arc::new(SimpleFormatter::new(Arc::clone(&settings.simple))) as Arc<dyn Formatter>,
            Arc::new(JsonFormatter::new(Arc::clone(&settings.json))),
            Arc::new(SystemdFormatter::new(Arc::clone(&settings.systemd))),
            Arc::new(ThemedFormatter::new(Arc::clone(&settings.themed), Arc::clone(&themes))),
        ]));
        formatters.reload(options.formatter_name.as_deref());

        let views = Arc::new(TextViewRegistry::new());
        let processor = Arc::new(LogProcessor::new(
            Arc::clone(&views),
            options.max_queue_length,
            options.queue_full_mode,
        ));

        let filter = Arc::new(OptionsHandle::new(SeverityFilter::new(
            options.min_level,
            options.category_levels.iter().map(|(category, level)| (category.clone(), *level)),
        )));

        let layer = TextViewLayer::new(
            Arc::clone(&processor),
            Arc::clone(&formatters),
            Arc::clone(&filter),
        );
        let logger = TextViewLogger {
            options: OptionsHandle::new(options),
            processor,
            views,
            formatters,
            themes,
            filter,
            settings,
        };
        Ok((logger, layer))
    }

    /// Attach a display surface. Its retention cap is set from the
    /// current options before it starts receiving lines.
    pub fn add_view(&self, view: Arc<dyn TextView>) {
        view.set_max_lines(self.options.get().max_messages);
        self.views.add(view);
    }

    pub fn remove_view(&self, view: &Arc<dyn TextView>) {
        self.views.remove(view);
    }

    /// Re-validate and apply a new configuration. Snapshots swap in
    /// place: the queue, views, and formatters keep their identity, and
    /// lines already queued are unaffected.
    pub fn reload(&self, options: TextViewOptions) -> Result<(), OptionsError> {
        options.validate()?;

        self.processor.set_max_queue_length(options.max_queue_length);
        self.processor.set_full_mode(options.queue_full_mode);

        self.settings.simple.set(options.simple.clone());
        self.settings.json.set(options.json.clone());
        self.settings.systemd.set(options.systemd.clone());
        self.settings.themed.set(options.themed.clone());

        self.themes.reload(options.themed.theme.as_deref());
        self.formatters.reload(options.formatter_name.as_deref());
        self.filter.set(SeverityFilter::new(
            options.min_level,
            options.category_levels.iter().map(|(category, level)| (category.clone(), *level)),
        ));
        self.views.set_max_lines(options.max_messages);

        self.options.set(options);
        Ok(())
    }

    pub fn processor(&self) -> &Arc<LogProcessor> {
        &self.processor
    }

    /// Drain and stop the pipeline. Idempotent; also runs when the
    /// processor is dropped.
    pub fn shutdown(&self) {
        self.processor.shutdown();
    }
}

/// Initialize the global `tracing` subscriber with a text view pipeline
/// built from `options`, returning the provider for view registration and
/// reloads.
pub fn init_with_options(options: TextViewOptions) -> Result<TextViewLogger, OptionsError> {
    let (logger, layer) = TextViewLogger::new(options)?;
    let subscriber = Registry::default().with(layer);
    tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    Ok(logger)
}

/// Initialize with defaults. The recommended entrypoint for applications
/// that configure nothing beyond attaching views.
pub fn init() -> Result<TextViewLogger, OptionsError> {
    init_with_options(TextViewOptions::default())
}
