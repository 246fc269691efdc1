use std::{collections::HashMap, fs};

use anyhow::ensure;
use cucumber_engine::{
    step::{Context, Matcher, Registry},
    Engine, ExitCode, Outcome, OutcomeKind,
};
use futures::{future::LocalBoxFuture, FutureExt as _};

#[derive(Debug, Default)]
struct World {
    users: HashMap<String, String>,
    page: Option<String>,
    logged_in: Option<String>,
}

type Step<'w> = LocalBoxFuture<'w, anyhow::Result<()>>;

fn registered_user(w: &mut World, ctx: Context) -> Step<'_> {
    async move {
        let (name, password) = (ctx.parse::<String>(0)?, ctx.parse(1)?);
        _ = w.users.insert(name, password);
        Ok(())
    }
    .boxed_local()
}

fn on_login_page(w: &mut World, _: Context) -> Step<'_> {
    w.page = Some("login".into());
    futures::future::ok(()).boxed_local()
}

fn log_in(w: &mut World, ctx: Context) -> Step<'_> {
    async move {
        let name = ctx.arg(0).unwrap_or_default();
        let password = ctx.arg(1).unwrap_or_default();
        ensure!(w.page.as_deref() == Some("login"), "not on the login page");
        ensure!(
            w.users.get(name).map(String::as_str) == Some(password),
            "wrong credentials for `{name}`",
        );
        w.logged_in = Some(name.to_owned());
        w.page = Some("dashboard".into());
        Ok(())
    }
    .boxed_local()
}

fn see_dashboard(w: &mut World, _: Context) -> Step<'_> {
    async move {
        ensure!(w.page.as_deref() == Some("dashboard"), "no dashboard");
        Ok(())
    }
    .boxed_local()
}

fn registry() -> Registry<World> {
    let mut registry = Registry::new();
    _ = registry
        .given(
            Matcher::expression(
                "a registered user {string} with password {string}",
            )
            .unwrap(),
            registered_user,
        )
        .unwrap()
        .given(Matcher::literal("I am on the login page"), on_login_page)
        .unwrap()
        .when(
            Matcher::regex(r#"I log in as "(\w+)" with password "(\w+)""#)
                .unwrap(),
            log_in,
        )
        .unwrap()
        .then(Matcher::literal("I see the dashboard"), see_dashboard)
        .unwrap();
    registry
}

fn feature() -> String {
    fs::read_to_string("tests/features/login.feature").unwrap()
}

#[tokio::test]
async fn undefined_step_fails_only_its_scenario() {
    let report = Engine::new(registry())
        .run_sources([("tests/features/login.feature", feature())])
        .await
        .unwrap();

    let scenarios = report.result.scenarios().collect::<Vec<_>>();
    assert_eq!(scenarios.len(), 2);

    let (feature, valid) = scenarios[0];
    assert_eq!(feature.name, "Login");
    assert_eq!(feature.tags, ["auth"]);
    assert_eq!(valid.name, "Valid credentials");
    assert_eq!(valid.outcome, Outcome::Passed);
    assert_eq!(valid.steps.len(), 4, "background step is included");
    assert!(valid.steps[0].step.background);

    let (_, unknown) = scenarios[1];
    assert_eq!(unknown.outcome, Outcome::Undefined);
    assert_eq!(
        unknown
            .steps
            .iter()
            .map(|s| s.outcome.kind())
            .collect::<Vec<_>>(),
        [
            OutcomeKind::Passed,
            OutcomeKind::Passed,
            OutcomeKind::Undefined,
            OutcomeKind::Skipped,
        ],
    );

    assert_eq!(report.exit_code, ExitCode::Execution);
    assert_ne!(i32::from(report.exit_code), 0);
    assert!(report.warnings.is_empty());
    assert_eq!(
        report.failure_summary(),
        "tests/features/login.feature:15: Login > Unknown action > \
         When I do something weird: undefined\n",
    );
}

#[tokio::test]
async fn step_errors_are_contained_in_scenario() {
    let report = Engine::new(registry())
        .run(
            "Feature: Login\n\
             \n\
             Scenario: wrong password\n\
               Given a registered user \"bob\" with password \"right\"\n\
               And I am on the login page\n\
               When I log in as \"bob\" with password \"wrong\"\n\
               Then I see the dashboard\n\
             \n\
             Scenario: right password\n\
               Given a registered user \"bob\" with password \"right\"\n\
               And I am on the login page\n\
               When I log in as \"bob\" with password \"right\"\n\
               Then I see the dashboard\n",
        )
        .await
        .unwrap();

    let outcomes = report
        .result
        .scenarios()
        .map(|(_, sc)| sc.outcome.kind())
        .collect::<Vec<_>>();
    assert_eq!(outcomes, [OutcomeKind::Failed, OutcomeKind::Passed]);

    let failed = &report.result.features[0].scenarios[0].steps[2];
    assert_eq!(
        failed.outcome.to_string(),
        "failed: wrong credentials for `bob`",
    );
    assert_eq!(
        report.result.features[0].scenarios[0].steps[3].outcome,
        Outcome::Skipped,
    );
}
