use cucumber_engine::{
    parser,
    step::{Context, Matcher, Pending, Registry},
    Engine, ExitCode, Outcome, Runner, TagExpression,
};
use futures::{future::LocalBoxFuture, FutureExt as _};

type Step<'w> = LocalBoxFuture<'w, anyhow::Result<()>>;

fn nothing(_: &mut (), _: Context) -> Step<'_> {
    async { Ok(()) }.boxed_local()
}

fn pending(_: &mut (), _: Context) -> Step<'_> {
    async { Err(Pending.into()) }.boxed_local()
}

fn engine() -> Engine<()> {
    let mut registry = Registry::new();
    _ = registry
        .given(Matcher::literal("nothing happens"), nothing)
        .unwrap()
        .given(Matcher::literal("a pending step"), pending)
        .unwrap();
    Engine::new(registry)
}

fn names(expr: &str) -> Vec<String> {
    let doc = parser::parse(include_str!("features/tags.feature")).unwrap();
    let runner = Runner::new().filter(expr.parse::<TagExpression>().unwrap());
    runner
        .selected(&doc)
        .into_iter()
        .filter_map(|id| doc.scenario(id))
        .map(|(_, sc)| sc.name.clone())
        .collect()
}

#[test]
fn selects_by_own_inherited_and_examples_tags() {
    assert_eq!(names("@smoke"), ["smoke test", "outline 1"]);
    assert_eq!(names("@api and not @wip").len(), 3);
    assert_eq!(names("@wip or (@smoke and not @api)"), ["work in progress"]);
    assert!(names("@nightly").is_empty());
}

#[tokio::test]
async fn filtered_out_scenarios_are_not_reported() {
    let report = engine()
        .filter("not @wip".parse::<TagExpression>().unwrap())
        .run(include_str!("features/tags.feature"))
        .await
        .unwrap();

    assert_eq!(report.result.scenario_stats().total(), 3);
    assert!(report
        .result
        .scenarios()
        .all(|(_, sc)| sc.outcome == Outcome::Passed));
    assert_eq!(report.exit_code, ExitCode::Success);
}

#[tokio::test]
async fn pending_scenarios_fail_strict_runs_only() {
    let wip = || "@wip".parse::<TagExpression>().unwrap();

    let lenient = engine()
        .filter(wip())
        .run(include_str!("features/tags.feature"))
        .await
        .unwrap();
    assert_eq!(lenient.result.scenarios().next().unwrap().1.outcome, Outcome::Pending);
    assert_eq!(lenient.exit_code, ExitCode::Success);

    let strict = engine()
        .filter(wip())
        .strict(true)
        .run(include_str!("features/tags.feature"))
        .await
        .unwrap();
    assert_eq!(strict.exit_code, ExitCode::Execution);
}
