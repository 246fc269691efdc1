use std::fs;

use cucumber_engine::{
    config::{ConfigError, FormatKind},
    step::{Context, Matcher, Registry},
    writer::Phase,
    Config, Engine, Error, ExitCode, Profiles, SnippetInterface,
};
use futures::{future::LocalBoxFuture, FutureExt as _};

fn pass(_: &mut (), _: Context) -> LocalBoxFuture<'_, anyhow::Result<()>> {
    async { Ok(()) }.boxed_local()
}

fn profiles() -> Profiles {
    Profiles::from_json(include_str!("fixtures/cucumber.json")).unwrap()
}

fn engine_error(config: &Config) -> Error {
    Engine::from_config(Registry::<()>::new(), config).unwrap_err()
}

#[test]
fn loads_named_profiles() {
    let profiles = profiles();

    let default = profiles.profile(Profiles::DEFAULT).unwrap();
    assert_eq!(default.snippet_interface().unwrap(), SnippetInterface::AsyncAwait);
    assert_eq!(default.parallel, 1);
    default.validate().unwrap();

    let ci = profiles.profile("ci").unwrap();
    assert_eq!(ci.parallel, 4);
    assert!(ci.fail_fast && ci.strict && ci.publish_quiet);
    let formats = ci.formats().unwrap();
    assert_eq!(formats[0].kind, FormatKind::Progress);
    assert_eq!(formats[1].kind, FormatKind::Json);
    assert!(formats[1].destination.is_some());
}

#[test]
fn invalid_profile_is_a_configuration_error() {
    let broken = profiles().profile("broken").unwrap().clone();

    let err = engine_error(&broken);

    assert_eq!(err.exit_code(), ExitCode::Config);
    assert_eq!(i32::from(err.exit_code()), 3);
    assert!(matches!(
        err,
        Error::Config(ConfigError::SnippetInterface(_)),
    ));
}

#[test]
fn rejects_unknown_formatters_and_missing_destinations() {
    let err = engine_error(&Config {
        format: vec!["pretty".into()],
        ..Config::default()
    });
    assert_eq!(err.to_string(), "invalid configuration: unknown formatter `pretty`");

    let err = engine_error(&Config {
        format: vec!["json:".into()],
        ..Config::default()
    });
    assert!(matches!(
        err,
        Error::Config(ConfigError::MissingDestination(FormatKind::Json)),
    ));
}

#[test]
fn rejects_shared_destinations_and_bad_values() {
    for (config, expected) in [
        (
            Config {
                format: vec!["html:r.out".into(), "json:r.out".into()],
                ..Config::default()
            },
            "several formatters write to `r.out`",
        ),
        (Config { parallel: 0, ..Config::default() }, "`parallel` must be"),
        (
            Config { tags: Some("not".into()), ..Config::default() },
            "invalid `tags`",
        ),
    ] {
        let err = engine_error(&config);
        assert_eq!(err.exit_code(), ExitCode::Config);
        assert!(err.to_string().contains(expected), "{err}");
    }
}

#[tokio::test]
async fn unwritable_destination_fails_only_its_formatter() {
    let dir = tempfile::tempdir().unwrap();
    let summary = dir.path().join("out/summary.txt");
    let mut registry = Registry::<()>::new();
    _ = registry.given(Matcher::literal("a step"), pass).unwrap();

    let mut engine = Engine::from_config(
        registry,
        &Config {
            format: vec![
                format!("html:{}", dir.path().display()),
                format!("summary:{}", summary.display()),
            ],
            ..Config::default()
        },
    )
    .unwrap();
    let report = engine
        .run("Feature: F\n  Scenario: S\n    Given a step\n")
        .await
        .unwrap();

    assert_eq!(report.exit_code, ExitCode::Success);
    assert_eq!(report.warnings.len(), 1, "{:?}", report.warnings);
    let warning = &report.warnings[0];
    assert_eq!(warning.formatter, "html");
    assert_eq!(warning.phase, Phase::Publish);
    assert!(warning.message.contains("cannot open"), "{}", warning.message);
    let rendered = fs::read_to_string(&summary).unwrap();
    assert!(rendered.contains("1 scenario"), "{rendered}");
}
