//! Tests for splitting configuration flags from command tokens.

use std::ffi::OsString;

use rstest::rstest;

use crate::config::split_config_arguments;

fn args(tokens: &[&str]) -> Vec<OsString> {
    tokens.iter().map(OsString::from).collect()
}

#[rstest]
#[case::no_flags(
    &["lyre-probe", "list"],
    &["lyre-probe"],
    &["lyre-probe", "list"],
)]
#[case::separate_value(
    &["lyre-probe", "--log-filter", "debug", "watch", "--ticks", "3"],
    &["lyre-probe", "--log-filter", "debug"],
    &["lyre-probe", "watch", "--ticks", "3"],
)]
#[case::inline_value(
    &["lyre-probe", "--log-format=compact", "list"],
    &["lyre-probe", "--log-format=compact"],
    &["lyre-probe", "list"],
)]
#[case::switch_takes_no_value(
    &["lyre-probe", "--disable-positional-data", "watch"],
    &["lyre-probe", "--disable-positional-data"],
    &["lyre-probe", "watch"],
)]
#[case::command_flags_stay_with_the_command(
    &["lyre-probe", "--output", "json", "--log-filter", "debug", "list"],
    &["lyre-probe"],
    &["lyre-probe", "--output", "json", "--log-filter", "debug", "list"],
)]
#[case::config_path(
    &["lyre-probe", "--config-path", "/etc/lyre.toml", "--user-plugin-dir", "/tmp/p", "install", "x.so"],
    &["lyre-probe", "--config-path", "/etc/lyre.toml", "--user-plugin-dir", "/tmp/p"],
    &["lyre-probe", "install", "x.so"],
)]
fn splits_leading_configuration_flags(
    #[case] input: &[&str],
    #[case] config: &[&str],
    #[case] command: &[&str],
) {
    let split = split_config_arguments(&args(input));

    assert_eq!(split.config_arguments, args(config));
    assert_eq!(split.command_arguments, args(command));
}

#[rstest]
fn empty_arguments_split_into_nothing() {
    let split = split_config_arguments(&[]);

    assert!(split.config_arguments.is_empty());
    assert!(split.command_arguments.is_empty());
}

#[rstest]
fn trailing_flag_without_value_is_kept() {
    let split = split_config_arguments(&args(&["lyre-probe", "--log-filter"]));

    assert_eq!(split.config_arguments, args(&["lyre-probe", "--log-filter"]));
    assert_eq!(split.command_arguments, args(&["lyre-probe"]));
}
