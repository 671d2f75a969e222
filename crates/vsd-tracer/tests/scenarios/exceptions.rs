use test_log::test;
use vsd_tracer::debugger::ContinueStatus;
use vsd_tracer::supervisor::RunConfig;

use crate::common::client::Record;
use crate::common::mock::Step;
use crate::common::{ROOT, run_script};

const BREAKPOINT: u32 = 0x8000_0003;
const ACCESS_VIOLATION: u32 = 0xC000_0005;

fn created() -> Step {
    Step::Created {
        pid: ROOT,
        image: Some("crash.exe"),
    }
}

#[test(tokio::test)]
async fn access_violation_kills_root() {
    let script = vec![
        created(),
        Step::Exception {
            pid: ROOT,
            code: BREAKPOINT,
            first_chance: true,
        },
        Step::Exception {
            pid: ROOT,
            code: ACCESS_VIOLATION,
            first_chance: true,
        },
        Step::Exception {
            pid: ROOT,
            code: ACCESS_VIOLATION,
            first_chance: false,
        },
        Step::Exited {
            pid: ROOT,
            code: ACCESS_VIOLATION,
        },
    ];

    let (outcome, client, journal) = run_script(script, RunConfig::default()).await;

    assert_eq!(outcome.exit_code, ACCESS_VIOLATION as i32);
    assert_eq!(
        client.lifecycle()[1],
        Record::Stopped {
            pid: ROOT,
            exit_code: Some(ACCESS_VIOLATION),
            error: Some("Unhandled Exception: EXCEPTION_ACCESS_VIOLATION".to_owned()),
        }
    );

    let statuses: Vec<_> = journal
        .lock()
        .continued
        .iter()
        .map(|&(_, status)| status)
        .collect();

    assert_eq!(
        statuses,
        [
            ContinueStatus::Continue,
            ContinueStatus::Continue,
            ContinueStatus::ExceptionNotHandled,
            ContinueStatus::ExceptionNotHandled,
            ContinueStatus::Continue,
        ]
    );
}

#[test(tokio::test)]
async fn first_chance_exception_is_passed_through() {
    let script = vec![
        created(),
        Step::Exception {
            pid: ROOT,
            code: 0xE06D_7363,
            first_chance: true,
        },
        Step::narrow_string(ROOT, "recovered"),
        Step::Exited { pid: ROOT, code: 0 },
    ];

    let (outcome, client, journal) = run_script(script, RunConfig::default()).await;

    assert_eq!(outcome.exit_code, 0);
    assert_eq!(
        client.lifecycle()[1],
        Record::Stopped {
            pid: ROOT,
            exit_code: Some(0),
            error: None,
        }
    );
    assert_eq!(
        journal.lock().continued[1],
        (ROOT, ContinueStatus::ExceptionNotHandled)
    );
}

#[test(tokio::test)]
async fn only_initial_breakpoint_is_swallowed() {
    let script = vec![
        created(),
        Step::Exception {
            pid: ROOT,
            code: BREAKPOINT,
            first_chance: true,
        },
        Step::Exception {
            pid: ROOT,
            code: BREAKPOINT,
            first_chance: true,
        },
        Step::Exited { pid: ROOT, code: 0 },
    ];

    let (_, _, journal) = run_script(script, RunConfig::default()).await;

    let journal = journal.lock();
    assert_eq!(journal.continued[1], (ROOT, ContinueStatus::Continue));
    assert_eq!(journal.continued[2], (ROOT, ContinueStatus::ExceptionNotHandled));
}

#[test(tokio::test)]
async fn unknown_exception_code_is_rendered_in_hex() {
    let script = vec![
        created(),
        Step::Exception {
            pid: ROOT,
            code: 0x1234_5678,
            first_chance: false,
        },
        Step::Exited {
            pid: ROOT,
            code: 0x1234_5678,
        },
    ];

    let (_, client, _) = run_script(script, RunConfig::default()).await;

    assert_eq!(
        client.lifecycle()[1],
        Record::Stopped {
            pid: ROOT,
            exit_code: Some(0x1234_5678),
            error: Some("Unhandled Exception: 0x12345678".to_owned()),
        }
    );
}

#[test(tokio::test)]
async fn faulting_module_is_named() {
    let script = vec![
        created(),
        Step::Loaded {
            pid: ROOT,
            base: 0x1000_0000,
            image: Some("C:/app/other.dll"),
        },
        // mock faults are raised at 0xdeadbeef
        Step::Loaded {
            pid: ROOT,
            base: 0xdead_b000,
            image: Some("C:/app/faulty.dll"),
        },
        Step::Exception {
            pid: ROOT,
            code: ACCESS_VIOLATION,
            first_chance: false,
        },
        Step::Exited {
            pid: ROOT,
            code: ACCESS_VIOLATION,
        },
    ];

    let (_, client, _) = run_script(script, RunConfig::default()).await;

    assert_eq!(
        client.lifecycle()[1],
        Record::Stopped {
            pid: ROOT,
            exit_code: Some(ACCESS_VIOLATION),
            error: Some(
                "Unhandled Exception: EXCEPTION_ACCESS_VIOLATION in C:/app/faulty.dll".to_owned()
            ),
        }
    );
}
