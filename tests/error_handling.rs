//! Integration tests for the error channel: tagged errors, selective
//! recovery, and the separation between failures and defects.

use std::fmt;
use undertow::{
    assert_die, assert_fail, assert_success, run_sync, CatchTags, Defect, DefectKind, Effect,
    Either, Exit, Tagged,
};

#[derive(Debug, Clone, PartialEq)]
enum AppError {
    Auth,
    Parse(String),
}

impl Tagged for AppError {
    fn tag(&self) -> &str {
        match self {
            AppError::Auth => "AuthError",
            AppError::Parse(_) => "ParseError",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Auth => write!(f, "not authorized"),
            AppError::Parse(input) => write!(f, "cannot parse {:?}", input),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Auth,
    Parse,
    Boom,
    Ok,
}

fn errors(outcome: Outcome) -> Effect<String, AppError> {
    match outcome {
        Outcome::Auth => Effect::fail(AppError::Auth),
        Outcome::Parse => Effect::fail(AppError::Parse("12x".into())),
        Outcome::Boom => Effect::die("Boom"),
        Outcome::Ok => Effect::succeed("Success".to_string()),
    }
}

#[test]
fn catch_all_handles_every_tag() {
    for outcome in [Outcome::Auth, Outcome::Parse] {
        let handled: Effect<String> =
            errors(outcome).catch_all(|e| Effect::succeed(format!("Handled {}", e.tag())));
        assert_success!(run_sync(handled));
    }
}

#[test]
fn catch_tag_handles_only_its_tag() {
    let handle = |outcome| {
        errors(outcome).catch_tag("AuthError", |_| Effect::succeed("Handled Auth".to_string()))
    };

    assert_success!(run_sync(handle(Outcome::Auth)), "Handled Auth".to_string());
    assert_fail!(run_sync(handle(Outcome::Parse)), AppError::Parse("12x".into()));
    assert_success!(run_sync(handle(Outcome::Ok)), "Success".to_string());
}

#[test]
fn catch_tags_maps_each_tag() {
    let handlers = || {
        CatchTags::new()
            .on("AuthError", |_| Effect::succeed("Handled Unauthorized".to_string()))
            .on("ParseError", |_| Effect::succeed("Handled invalid input".to_string()))
    };

    assert_success!(
        run_sync(errors(Outcome::Auth).catch_tags(handlers())),
        "Handled Unauthorized".to_string()
    );
    assert_success!(
        run_sync(errors(Outcome::Parse).catch_tags(handlers())),
        "Handled invalid input".to_string()
    );
}

#[test]
fn or_else_and_or_else_fail() {
    let replaced: Effect<String> = errors(Outcome::Parse).or_else(|| Effect::succeed("Handled".into()));
    assert_success!(run_sync(replaced), "Handled".to_string());

    let renamed: Effect<String, String> = errors(Outcome::Auth).or_else_fail(|| "fail".to_string());
    assert_fail!(run_sync(renamed), "fail".to_string());
}

#[test]
fn map_error_renders_message() {
    let mapped: Effect<String, String> = errors(Outcome::Parse).map_error(|e| e.to_string());
    assert_fail!(run_sync(mapped), "cannot parse \"12x\"".to_string());
}

#[test]
fn match_exit_describes_both_channels() {
    let describe = |outcome| {
        errors(outcome).match_exit(|value| format!("ok: {}", value), |e| format!("err: {}", e))
    };
    assert_success!(run_sync(describe(Outcome::Ok)), "ok: Success".to_string());
    assert_success!(run_sync(describe(Outcome::Auth)), "err: not authorized".to_string());
}

#[test]
fn either_reifies_failures() {
    assert_success!(
        run_sync(errors(Outcome::Auth).either()),
        Either::<AppError, String>::Left(AppError::Auth)
    );
    assert_success!(
        run_sync(errors(Outcome::Ok).either()),
        Either::<AppError, String>::Right("Success".to_string())
    );
}

#[test]
fn defects_escape_every_error_handler() {
    let handled = errors(Outcome::Boom)
        .catch_tag("AuthError", |_| Effect::succeed("auth".to_string()))
        .catch_tags(CatchTags::new().on("ParseError", |_| Effect::succeed("parse".to_string())))
        .catch_all(|_| Effect::<String, AppError>::succeed("all".to_string()))
        .or_else(|| Effect::<String, String>::succeed("else".to_string()))
        .map_error(|e| e.len());

    assert_eq!(run_sync(handled), Exit::Die(Defect::new("Boom")));
}

#[test]
fn either_and_match_exit_do_not_absorb_defects() {
    assert_die!(run_sync(errors(Outcome::Boom).either()), DefectKind::Raised);
    assert_die!(
        run_sync(errors(Outcome::Boom).match_exit(|_| 0, |_| 1)),
        DefectKind::Raised
    );
}

#[test]
fn catch_defect_is_the_explicit_escape_hatch() {
    let recovered = errors(Outcome::Boom)
        .catch_defect(|defect| Effect::succeed(format!("recovered from {}", defect)));
    assert_success!(run_sync(recovered), "recovered from Boom".to_string());
}

#[test]
fn failure_short_circuits_later_steps() {
    let log = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let (first, second) = (log.clone(), log.clone());

    let program: Effect<(), AppError> = Effect::sync(move || first.lock().unwrap().push("1"))
        .zip_right(Effect::fail(AppError::Auth))
        .flat_map(move |_: ()| {
            second.lock().unwrap().push("2");
            Effect::succeed(())
        });

    assert_fail!(run_sync(program), AppError::Auth);
    assert_eq!(*log.lock().unwrap(), vec!["1"]);
}

#[test]
fn gen_can_fail_or_die_early() {
    let program = |outcome: Outcome| -> Effect<String, AppError> {
        Effect::gen(move |cx| async move {
            match outcome {
                Outcome::Auth => cx.bind(Effect::fail(AppError::Auth)).await?,
                Outcome::Parse => return Err(AppError::Parse("x".into()).into()),
                Outcome::Boom => cx.bind(Effect::<(), AppError>::die("Boom")).await?,
                Outcome::Ok => {}
            }
            Ok("Success".to_string())
        })
    };

    assert_fail!(run_sync(program(Outcome::Auth)), AppError::Auth);
    assert_fail!(run_sync(program(Outcome::Parse)), AppError::Parse("x".into()));
    assert_die!(run_sync(program(Outcome::Boom)));
    assert_success!(run_sync(program(Outcome::Ok)), "Success".to_string());
}
