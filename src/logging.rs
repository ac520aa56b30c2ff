//! Logger bootstrap: `env_logger` on native, the browser console on wasm.

use crate::config::LogLevel;

/// Install the global logger at `level`. Later calls only adjust the level.
#[cfg(not(target_arch = "wasm32"))]
pub fn init(level: LogLevel) {
    let filter = level.to_level_filter();
    let result = env_logger::Builder::new()
        .filter_level(filter)
        // RUST_LOG still overrides per module.
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
    if result.is_err() {
        log::set_max_level(filter);
    }
}

#[cfg(target_arch = "wasm32")]
pub fn init(level: LogLevel) {
    static LOGGER: ConsoleLogger = ConsoleLogger;
    let filter = level.to_level_filter();
    if log::set_logger(&LOGGER).is_err() {
        log::debug!("Console logger already installed");
    }
    log::set_max_level(filter);
}

/// Writes records to `console.*` by level.
#[cfg(target_arch = "wasm32")]
struct ConsoleLogger;

#[cfg(target_arch = "wasm32")]
impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}: {}", record.level(), record.target(), record.args());
        let value = wasm_bindgen::JsValue::from_str(&line);
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&value),
            log::Level::Warn => web_sys::console::warn_1(&value),
            log::Level::Info => web_sys::console::info_1(&value),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&value),
        }
    }

    fn flush(&self) {}
}
