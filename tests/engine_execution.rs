//! Integration tests for the execution engine

mod common;

use common::{create_test_config, engine_for, engine_with_ctx, lines, load, quiet_logger};
use rask::error::{ExecutionError, RaskError};
use rask::runner::{ExecutionEngine, ExecutionOptions, ShellContext};
use std::time::{Duration, Instant};

fn exec_err(result: Result<(), RaskError>) -> ExecutionError {
    match result {
        Err(RaskError::Execution(err)) => err,
        other => panic!("expected an execution error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failing_task_uses_every_attempt() {
    let (dir, config) = create_test_config(
        r#"
scripts:
  flaky: echo x >> attempts; exit 1
"#,
    );

    let engine = engine_for(&config);
    let options = ExecutionOptions::default().with_tries(3);
    let err = exec_err(engine.run("flaky", options).await);

    match err {
        ExecutionError::Exit { task, code, .. } => {
            assert_eq!(task, "flaky");
            assert_eq!(code, Some(1));
        }
        other => panic!("expected Exit, got {:?}", other),
    }
    assert_eq!(lines(&dir.path().join("attempts")).len(), 3);
}

#[tokio::test]
async fn test_retry_stops_at_first_success() {
    // Fails on the first attempt, succeeds on the second.
    let (dir, config) = create_test_config(
        r#"
scripts:
  flaky: "n=$(wc -l < attempts 2>/dev/null || echo 0); echo x >> attempts; [ \"$n\" -ge 1 ]"
"#,
    );

    let engine = engine_for(&config);
    let options = ExecutionOptions::default().with_tries(5);
    let result = engine.run("flaky", options).await;

    assert!(result.is_ok());
    assert_eq!(lines(&dir.path().join("attempts")).len(), 2);
}

#[tokio::test]
async fn test_pre_and_post_hooks_run_in_order() {
    let (dir, config) = create_test_config(
        r#"
scripts:
  build: echo main >> out
  prebuild: echo pre >> out
  postbuild: echo post >> out
"#,
    );

    let engine = engine_for(&config);
    engine.run("build", ExecutionOptions::default()).await.unwrap();

    assert_eq!(lines(&dir.path().join("out")), vec!["pre", "main", "post"]);
}

#[tokio::test]
async fn test_failed_pre_hook_stops_the_plan() {
    let (dir, config) = create_test_config(
        r#"
scripts:
  build: echo main >> out
  prebuild: "false"
"#,
    );

    let engine = engine_for(&config);
    let err = exec_err(engine.run("build", ExecutionOptions::default()).await);

    assert!(matches!(err, ExecutionError::Exit { .. }));
    assert!(lines(&dir.path().join("out")).is_empty());
}

#[tokio::test]
async fn test_bail_batch_stops_scheduling_after_failure() {
    let (dir, config) = create_test_config(
        r#"
scripts:
  a: echo a >> out
  b: echo b >> out && false
  c: echo c >> out
"#,
    );

    let engine = engine_for(&config);
    let options = ExecutionOptions::default().with_queue(Some(1));
    let tasks = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let err = exec_err(engine.concurrent(&tasks, options).await);

    // Task c was never started; the reported error is b's.
    assert_eq!(lines(&dir.path().join("out")), vec!["a", "b"]);
    match err {
        ExecutionError::Exit { task, .. } => assert_eq!(task, "b"),
        other => panic!("expected Exit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_no_bail_batch_runs_everything() {
    let (dir, config) = create_test_config(
        r#"
scripts:
  a: echo a >> out
  b: echo b >> out && false
  c: echo c >> out
"#,
    );

    let engine = engine_for(&config);
    let options = ExecutionOptions::default()
        .with_queue(Some(1))
        .with_bail(false);
    let tasks = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let err = exec_err(engine.concurrent(&tasks, options).await);

    assert_eq!(lines(&dir.path().join("out")), vec!["a", "b", "c"]);
    match err {
        ExecutionError::Exit { task, .. } => assert_eq!(task, "b"),
        other => panic!("expected Exit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_setup_starts_once_across_a_batch() {
    let (dir, config) = create_test_config(
        r#"
scripts:
  a: sleep 0.3
  b: sleep 0.3
  c: sleep 0.3
  svc: echo started >> setup_log; sleep 5
"#,
    );

    let engine = engine_for(&config);
    let options = ExecutionOptions::default()
        .with_queue(Some(2))
        .with_setup(Some("svc".to_string()));
    let tasks = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    engine.concurrent(&tasks, options).await.unwrap();

    assert_eq!(lines(&dir.path().join("setup_log")), vec!["started"]);
}

#[tokio::test]
async fn test_setup_premature_exit_aborts_the_batch() {
    let (_dir, config) = create_test_config(
        r#"
scripts:
  slow: sleep 5
  svc: exit 7
"#,
    );

    let engine = engine_for(&config);
    let options = ExecutionOptions::default().with_setup(Some("svc".to_string()));
    let tasks = vec!["slow".to_string(), "slow".to_string()];

    let start = Instant::now();
    let err = exec_err(engine.concurrent(&tasks, options).await);

    match err {
        ExecutionError::SetupExited { task, code } => {
            assert_eq!(task, "svc");
            assert_eq!(code, Some(7));
        }
        other => panic!("expected SetupExited, got {:?}", other),
    }
    // The sleeping siblings were killed rather than waited out.
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_env_matrix_spawns_one_instance_per_entry() {
    let (dir, config) = create_test_config(
        r#"
scripts:
  emit: echo "$STAGE" >> out
"#,
    );

    let engine = engine_for(&config);
    let sets = rask::runner::parse_env_sets(
        Some(r#"[{"STAGE": "dev"}, {"STAGE": "ci"}, {"STAGE": "prod"}]"#),
        None,
    )
    .unwrap();
    engine
        .envs("emit", sets, ExecutionOptions::default())
        .await
        .unwrap();

    let mut seen = lines(&dir.path().join("out"));
    seen.sort();
    assert_eq!(seen, vec!["ci", "dev", "prod"]);
}

#[tokio::test]
async fn test_custom_flags_reach_only_the_main_command() {
    let (dir, config) = create_test_config(
        r#"
scripts:
  foo: echo main >> out
  prefoo: echo pre >> out
  postfoo: echo post >> out
"#,
    );

    let project = load(&config);
    let mut ctx = ShellContext::new().with_working_dir(project.root.clone());
    rask::runner::merge_custom_flags(
        &mut ctx,
        &["--bar".to_string(), "baz".to_string()],
    );
    let engine = ExecutionEngine::new(project, ctx, quiet_logger());
    engine.run("foo", ExecutionOptions::default()).await.unwrap();

    // The appended flags become extra words of the main echo only.
    assert_eq!(
        lines(&dir.path().join("out")),
        vec!["pre", "main --bar baz", "post"]
    );
}

#[tokio::test]
async fn test_buffer_mode_still_reports_failures() {
    let (_dir, config) = create_test_config(
        r#"
scripts:
  fail: echo some-output; exit 4
"#,
    );

    let engine = engine_for(&config);
    let options = ExecutionOptions::default().with_buffer(true);
    let err = exec_err(engine.run("fail", options).await);

    assert!(matches!(err, ExecutionError::Exit { code: Some(4), .. }));
}

#[tokio::test]
async fn test_archetype_expansion_in_a_real_project() {
    let (dir, config) = create_test_config(
        r#"
archetypes:
  - shared
scripts: {}
"#,
    );
    common::create_archetype(
        dir.path(),
        "shared",
        r#"
scripts:
  where: echo node_modules/shared/bin >> out
"#,
    );

    let project = load(&config);
    let expected = project
        .root
        .join("node_modules")
        .join("shared")
        .display()
        .to_string();
    let mut ctx = ShellContext::new().with_working_dir(project.root.clone());
    ctx.expand_archetype = true;
    let engine = ExecutionEngine::new(project, ctx, quiet_logger());
    engine.run("where", ExecutionOptions::default()).await.unwrap();

    let out = lines(&dir.path().join("out"));
    assert_eq!(out, vec![format!("{}/bin", expected)]);
}

#[tokio::test]
async fn test_env_additions_reach_batch_members() {
    let (dir, config) = create_test_config(
        r#"
scripts:
  emit: echo "$SHARED_VALUE" >> out
"#,
    );

    let project = load(&config);
    let mut ctx = ShellContext::new().with_working_dir(project.root.clone());
    ctx.set_env("SHARED_VALUE".to_string(), "from-context".to_string());
    let engine = engine_with_ctx(&config, ctx);
    engine.run("emit", ExecutionOptions::default()).await.unwrap();

    assert_eq!(lines(&dir.path().join("out")), vec!["from-context"]);
}
