//! Unit tests for configuration defaults and parsing helpers.

use std::time::Duration;

use rstest::rstest;

use super::*;

#[rstest]
fn defaults_match_the_documented_values() {
    let config = Config::default();

    assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    assert_eq!(config.log_format(), LogFormat::Compact);
    assert_eq!(config.plugin_log_level(), PluginLogLevel::Info);
    assert_eq!(config.fetch_interval(), Duration::from_millis(20));
    assert!(config.positional_data_enabled());
    assert_eq!(config.system_plugin_dir(), default_system_plugin_dir().as_ref());
}

#[rstest]
fn zero_interval_is_clamped() {
    let config = Config {
        fetch_interval_ms: 0,
        ..Config::default()
    };

    assert_eq!(config.fetch_interval(), Duration::from_millis(1));
}

#[rstest]
#[case("json", LogFormat::Json)]
#[case("compact", LogFormat::Compact)]
#[case("COMPACT", LogFormat::Compact)]
fn log_format_parses_case_insensitively(#[case] text: &str, #[case] expected: LogFormat) {
    assert_eq!(text.parse::<LogFormat>().ok(), Some(expected));
}

#[rstest]
fn unknown_log_format_is_rejected() {
    let result: Result<LogFormat, LogFormatParseError> = "pretty".parse();
    assert!(result.is_err());
}

#[rstest]
fn log_format_displays_in_snake_case() {
    assert_eq!(LogFormat::Compact.to_string(), "compact");
}

#[rstest]
#[case(LogFormat::Compact, false)]
#[case(LogFormat::Json, true)]
fn only_json_output_is_timestamped(#[case] format: LogFormat, #[case] expected: bool) {
    assert_eq!(format.timestamps(), expected);
}

#[rstest]
#[case(PluginLogLevel::Off, "lyre_plugins::plugin_log=off")]
#[case(PluginLogLevel::Info, "lyre_plugins::plugin_log=info")]
#[case(PluginLogLevel::Trace, "lyre_plugins::plugin_log=trace")]
fn plugin_log_level_renders_a_target_directive(
    #[case] level: PluginLogLevel,
    #[case] expected: &str,
) {
    assert_eq!(level.directive_for("lyre_plugins::plugin_log"), expected);
}

#[rstest]
fn plugin_log_level_parses_case_insensitively() {
    assert_eq!("WARN".parse::<PluginLogLevel>().ok(), Some(PluginLogLevel::Warn));
    assert!("loud".parse::<PluginLogLevel>().is_err());
}

#[rstest]
fn user_plugin_dir_ends_in_the_lyre_namespace() {
    if let Some(path) = default_user_plugin_dir() {
        assert!(path.ends_with("lyre/plugins"), "unexpected path {path}");
    }
}

#[rstest]
fn config_flags_cover_every_field() {
    for flag in [
        "--system-plugin-dir",
        "--user-plugin-dir",
        "--log-filter",
        "--log-format",
        "--plugin-log-level",
        "--fetch-interval-ms",
        "--disable-positional-data",
    ] {
        assert!(CONFIG_CLI_FLAGS.contains(&flag), "missing {flag}");
    }
    for switch in CONFIG_CLI_SWITCHES {
        assert!(CONFIG_CLI_FLAGS.contains(switch), "switch {switch} not a flag");
    }
}
