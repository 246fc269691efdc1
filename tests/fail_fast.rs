use std::time::Duration;

use cucumber_engine::{
    parser,
    step::{Context, Matcher, Registry},
    Engine, ExitCode, Outcome, OutcomeKind, TagExpression,
};
use futures::{future::LocalBoxFuture, FutureExt as _};
use tokio::time;

type Step<'w> = LocalBoxFuture<'w, anyhow::Result<()>>;

fn panics(_: &mut (), _: Context) -> Step<'_> {
    async {
        let nothing: Result<(), &str> = Err("this is a panic message");
        nothing.unwrap();
        Ok(())
    }
    .boxed_local()
}

fn nothing(_: &mut (), _: Context) -> Step<'_> {
    async { Ok(()) }.boxed_local()
}

fn wait(_: &mut (), ctx: Context) -> Step<'_> {
    async move {
        time::sleep(Duration::from_millis(ctx.parse(0)?)).await;
        Ok(())
    }
    .boxed_local()
}

fn engine() -> Engine<()> {
    let mut registry = Registry::new();
    _ = registry
        .given(Matcher::literal("a step that panics"), panics)
        .unwrap()
        .then(Matcher::literal("nothing happens"), nothing)
        .unwrap()
        .given(Matcher::regex(r"I wait (\d+) ms").unwrap(), wait)
        .unwrap();
    Engine::new(registry)
}

fn document() -> cucumber_engine::Document {
    parser::parse(include_str!("features/fail_fast.feature")).unwrap()
}

#[tokio::test]
async fn stops_after_first_failure() {
    let report = engine().fail_fast(true).run_document(&document()).await;
    let scenarios = &report.result.features[0].scenarios;

    assert!(report.result.cancelled);
    assert_eq!(scenarios[0].outcome.kind(), OutcomeKind::Failed);
    assert_eq!(scenarios[0].steps[1].outcome, Outcome::Skipped);
    for sc in &scenarios[1..] {
        assert!(!sc.executed, "`{}` should not have started", sc.name);
        assert_eq!(sc.outcome, Outcome::Skipped);
        assert!(sc.steps.iter().all(|s| s.outcome == Outcome::Skipped));
    }
    assert_eq!(report.result.scenario_stats().failed, 1);
    assert_eq!(report.result.scenario_stats().skipped, 2);
    assert_eq!(report.exit_code, ExitCode::Execution);
}

#[tokio::test]
async fn runs_everything_without_fail_fast() {
    let report = engine().run_document(&document()).await;

    assert!(!report.result.cancelled);
    assert_eq!(
        report
            .result
            .scenarios()
            .map(|(_, sc)| sc.outcome.kind())
            .collect::<Vec<_>>(),
        [OutcomeKind::Failed, OutcomeKind::Passed, OutcomeKind::Passed],
    );
}

#[tokio::test]
async fn cancellation_skips_remaining_steps() {
    let mut engine = engine().filter("@slow".parse::<TagExpression>().unwrap());
    let cancellation = engine.cancellation();
    let document = document();

    let (report, ()) = futures::join!(engine.run_document(&document), async {
        time::sleep(Duration::from_millis(15)).await;
        cancellation.cancel();
    });

    let scenarios = report.result.scenarios().collect::<Vec<_>>();
    assert_eq!(scenarios.len(), 1, "filtered-out scenarios are omitted");
    let waiting = scenarios[0].1;
    assert!(waiting.executed);
    assert_eq!(
        waiting.steps.iter().map(|s| s.outcome.kind()).collect::<Vec<_>>(),
        [
            OutcomeKind::Passed,
            OutcomeKind::Passed,
            OutcomeKind::Skipped,
            OutcomeKind::Skipped,
        ],
    );
    assert_eq!(report.exit_code, ExitCode::Execution);
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let mut engine = engine();
    engine.cancellation().cancel();

    let report = engine.run_document(&document()).await;

    assert!(report.result.cancelled);
    assert!(report.result.scenarios().all(|(_, sc)| !sc.executed));
    assert_eq!(report.result.step_stats().skipped, 7);
}

#[tokio::test]
async fn rerun_after_fail_fast_is_independent() {
    let mut engine = engine().fail_fast(true);
    let first = engine.run_document(&document()).await;
    assert!(first.result.cancelled);

    let second = engine
        .run("Feature: P\n  Scenario: ok\n    Then nothing happens\n")
        .await
        .unwrap();

    assert_eq!(second.exit_code, ExitCode::Success);
    assert!(!second.result.cancelled);
    assert!(second.result.features[0].scenarios[0].executed);
}
