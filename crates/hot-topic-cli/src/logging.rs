//! Subscriber setup from `logging` config and `--verbose`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

use hot_topic_core::config::LoggingConfig;

/// Filter precedence: `RUST_LOG`, then `logging.level`, then `--verbose`.
/// `logging.filters` directives are appended in every case.
pub fn build_filter(logging: &LoggingConfig, verbose: bool) -> EnvFilter {
    let base = std::env::var("RUST_LOG")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| logging.level.clone())
        .unwrap_or_else(|| if verbose { "debug" } else { "info" }.to_string());

    let mut filter = EnvFilter::try_new(&base).unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in &logging.filters {
        match directive.parse::<Directive>() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("ignoring log filter '{directive}': {e}"),
        }
    }
    filter
}

pub fn init(logging: &LoggingConfig, verbose: bool) {
    let filter = build_filter(logging, verbose);
    let to_stdout = logging.output == "stdout";

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match (logging.format.as_str(), to_stdout) {
        ("json", true) => builder.json().with_writer(std::io::stdout).init(),
        ("json", false) => builder.json().with_writer(std::io::stderr).init(),
        (_, true) => builder.with_writer(std::io::stdout).init(),
        (_, false) => builder.with_writer(std::io::stderr).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_and_filters() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let logging = LoggingConfig {
            level: Some("warn".into()),
            filters: vec!["hot_topic_gateway=trace".into(), "not a directive ===".into()],
            ..LoggingConfig::default()
        };
        let rendered = build_filter(&logging, true).to_string();
        assert!(rendered.contains("warn"));
        assert!(rendered.contains("hot_topic_gateway=trace"));
    }

    #[test]
    fn test_verbose_fallback() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let rendered = build_filter(&LoggingConfig::default(), true).to_string();
        assert_eq!(rendered, "debug");
    }
}
