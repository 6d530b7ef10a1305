//! `tracing` setup.
//!
//! native: plain `tracing-subscriber` fmt to stderr, filtered by `RUST_LOG`
//! (or the configured directive). wasm: the same fmt layer, written to the
//! browser console through `ConsoleMakeWriter`, with no timestamps since
//! `SystemTime` is unavailable there.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVE: &str = "calmpage=info";

fn filter(directive: Option<&str>) -> EnvFilter {
    match directive {
        Some(d) => EnvFilter::try_new(d).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

/// installs the global subscriber. later calls are no-ops.
#[cfg(not(target_arch = "wasm32"))]
pub fn init(directive: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(directive))
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(target_arch = "wasm32")]
pub fn init(directive: Option<&str>) {
    console_error_panic_hook::set_once();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(directive))
        .with_writer(console::ConsoleMakeWriter)
        .without_time()
        .with_level(true)
        .try_init();
}

#[cfg(target_arch = "wasm32")]
mod console {
    use std::io;

    use tracing::{Level, Metadata};
    use tracing_subscriber::fmt::MakeWriter;

    /// one writer per event; the line is emitted when the writer drops.
    pub struct ConsoleMakeWriter;

    pub struct ConsoleWriter {
        level: Level,
        buf: Vec<u8>,
    }

    impl io::Write for ConsoleWriter {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.buf.extend_from_slice(bytes);
            Ok(bytes.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for ConsoleWriter {
        fn drop(&mut self) {
            if self.buf.is_empty() {
                return;
            }
            let line = String::from_utf8_lossy(&self.buf);
            let line = wasm_bindgen::JsValue::from_str(line.trim_end());
            match self.level {
                Level::ERROR => web_sys::console::error_1(&line),
                Level::WARN => web_sys::console::warn_1(&line),
                Level::DEBUG | Level::TRACE => web_sys::console::debug_1(&line),
                _ => web_sys::console::log_1(&line),
            }
        }
    }

    impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
        type Writer = ConsoleWriter;

        fn make_writer(&'a self) -> Self::Writer {
            ConsoleWriter { level: Level::INFO, buf: Vec::new() }
        }

        fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
            ConsoleWriter { level: *meta.level(), buf: Vec::new() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_directive_falls_back() {
        // must not panic; an invalid directive degrades to the default filter
        let f = filter(Some("calmpage=[nonsense"));
        assert!(f.to_string().contains("calmpage"));
    }

    #[test]
    fn init_twice_is_fine() {
        init(Some("calmpage=debug"));
        init(None);
        tracing::info!(target: "calmpage", "logging initialised");
    }
}
