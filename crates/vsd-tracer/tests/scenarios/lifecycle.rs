use std::path::PathBuf;

use test_log::test;
use vsd_tracer::debugger::{ContinueStatus, DebugScope};
use vsd_tracer::supervisor::RunConfig;

use crate::common::client::{Record, RecordingClient};
use crate::common::mock::{MockDebugger, Out, Step};
use crate::common::{Program, ROOT, run_script, supervisor, trace_everything};

const CHILD: u32 = 200;

fn started(pid: u32, path: &str) -> Record {
    Record::Started {
        pid,
        path: PathBuf::from(path),
    }
}

fn stopped(pid: u32, exit_code: u32) -> Record {
    Record::Stopped {
        pid,
        exit_code: Some(exit_code),
        error: None,
    }
}

#[test(tokio::test)]
async fn echo_and_exit() {
    let script = vec![
        Step::Created {
            pid: ROOT,
            image: Some("C:/Windows/System32/cmd.exe"),
        },
        Step::Thread { pid: ROOT },
        Step::Output(Out::Stdout, b"hi\r\n".to_vec()),
        Step::Exited { pid: ROOT, code: 0 },
    ];

    let (outcome, client, journal) = run_script(script, RunConfig::default()).await;

    assert_eq!(outcome.exit_code, 0);
    assert_eq!(
        client.records(),
        [
            started(ROOT, "C:/Windows/System32/cmd.exe"),
            Record::Stdout("hi\r\n".to_owned()),
            stopped(ROOT, 0),
        ]
    );

    let journal = journal.lock();
    assert!(
        journal
            .continued
            .iter()
            .all(|&(_, status)| status == ContinueStatus::Continue)
    );
    assert_eq!(journal.continued.len(), 3);
    assert!(journal.terminated.is_empty());
    assert!(journal.session_dropped);
    assert_eq!(journal.closed_processes, [ROOT]);
}

#[test(tokio::test)]
async fn launch_receives_scope_and_command_line() {
    let program = Program::new();
    let script = vec![
        Step::Created {
            pid: ROOT,
            image: Some("app.exe"),
        },
        Step::Exited { pid: ROOT, code: 0 },
    ];
    let (debugger, journal) = MockDebugger::new(ROOT, script);

    let config = RunConfig {
        debug_scope: DebugScope::Tree,
        ..RunConfig::default()
    };

    supervisor(debugger, RecordingClient::default(), config)
        .run(program.command().arg("a").arg("b c"))
        .await
        .unwrap();

    let journal = journal.lock();
    let launched = journal.launched.as_ref().unwrap();

    assert_eq!(launched.scope, DebugScope::Tree);
    assert!(launched.program.is_absolute());
    assert_eq!(
        launched.cmdline,
        format!("\"{}\" a \"b c\"", launched.program.display())
    );
}

#[test(tokio::test)]
async fn timeouts_keep_the_loop_running() {
    let script = vec![
        Step::Timeout,
        Step::Created {
            pid: ROOT,
            image: Some("app.exe"),
        },
        Step::Timeout,
        Step::Timeout,
        Step::Exited { pid: ROOT, code: 7 },
    ];

    let (outcome, client, _) = run_script(script, RunConfig::default()).await;

    assert_eq!(outcome.exit_code, 7);
    assert_eq!(client.lifecycle(), [started(ROOT, "app.exe"), stopped(ROOT, 7)]);
}

#[test(tokio::test)]
async fn descendants_outliving_root_are_stopped() {
    let script = vec![
        Step::Created {
            pid: ROOT,
            image: Some("app.exe"),
        },
        Step::Created {
            pid: CHILD,
            image: Some("worker.exe"),
        },
        Step::Exited { pid: ROOT, code: 1 },
        Step::Exited {
            pid: CHILD,
            code: u32::MAX,
        },
    ];

    let (outcome, client, journal) = run_script(script, trace_everything()).await;

    assert_eq!(outcome.exit_code, 1);
    assert_eq!(
        client.lifecycle(),
        [
            started(ROOT, "app.exe"),
            started(CHILD, "worker.exe"),
            stopped(ROOT, 1),
            stopped(CHILD, u32::MAX),
        ]
    );

    let journal = journal.lock();
    assert_eq!(journal.terminated, [(CHILD, u32::MAX)]);

    let mut closed = journal.closed_processes.clone();
    closed.sort_unstable();
    assert_eq!(closed, [ROOT, CHILD]);
}

#[test(tokio::test)]
async fn run_lasts_until_every_process_exited() {
    let script = vec![
        Step::Created {
            pid: ROOT,
            image: Some("app.exe"),
        },
        Step::Created {
            pid: CHILD,
            image: Some("worker.exe"),
        },
        Step::Exited { pid: CHILD, code: 0 },
        Step::narrow_string(ROOT, "still there"),
        Step::Exited { pid: ROOT, code: 0 },
    ];

    let (outcome, client, journal) = run_script(script, trace_everything()).await;

    assert_eq!(outcome.exit_code, 0);
    assert_eq!(client.debug_strings(), [(ROOT, "still there".to_owned())]);
    assert!(journal.lock().terminated.is_empty());
}

#[test(tokio::test)]
async fn every_started_process_is_stopped_once() {
    let script = vec![
        Step::Created {
            pid: ROOT,
            image: Some("app.exe"),
        },
        Step::Created {
            pid: CHILD,
            image: Some("worker.exe"),
        },
        Step::Created {
            pid: CHILD + 1,
            image: Some("worker.exe"),
        },
        Step::Exited { pid: CHILD, code: 0 },
        // exit reported twice
        Step::Exited { pid: CHILD, code: 0 },
        Step::Exited {
            pid: CHILD + 1,
            code: 0,
        },
        Step::Exited { pid: ROOT, code: 0 },
    ];

    let (_, client, _) = run_script(script, trace_everything()).await;

    for pid in [ROOT, CHILD, CHILD + 1] {
        let started = client
            .lifecycle()
            .iter()
            .filter(|record| matches!(record, Record::Started { pid: p, .. } if *p == pid))
            .count();
        let stopped = client
            .lifecycle()
            .iter()
            .filter(|record| matches!(record, Record::Stopped { pid: p, .. } if *p == pid))
            .count();

        assert_eq!((started, stopped), (1, 1), "process {pid}");
    }
}

#[test(tokio::test)]
async fn unresolvable_image_falls_back_to_unknown() {
    let script = vec![
        Step::Created {
            pid: ROOT,
            image: None,
        },
        Step::Exited { pid: ROOT, code: 0 },
    ];

    let (_, client, journal) = run_script(script, RunConfig::default()).await;

    assert_eq!(client.lifecycle()[0], started(ROOT, "Unknown"));

    let journal = journal.lock();
    assert_eq!(journal.opened_images, journal.closed_images);
}

#[test(tokio::test)]
async fn debugging_error_ends_process() {
    let script = vec![
        Step::Created {
            pid: ROOT,
            image: Some("app.exe"),
        },
        Step::Rip {
            pid: ROOT,
            message: "The handle is invalid.",
            exit_code: Some(5),
        },
    ];

    let (outcome, client, _) = run_script(script, RunConfig::default()).await;

    assert_eq!(outcome.exit_code, 5);
    assert_eq!(
        client.lifecycle()[1],
        Record::Stopped {
            pid: ROOT,
            exit_code: Some(5),
            error: Some("RIP: The handle is invalid.".to_owned()),
        }
    );
}

#[test(tokio::test)]
async fn stop_requested_before_launch_terminates_root() {
    let program = Program::new();
    let script = vec![
        Step::Created {
            pid: ROOT,
            image: Some("app.exe"),
        },
        Step::Exited {
            pid: ROOT,
            code: u32::MAX,
        },
    ];
    let (debugger, journal) = MockDebugger::new(ROOT, script);

    let supervisor = supervisor(debugger, RecordingClient::default(), RunConfig::default());
    supervisor.stop_handle().stop();

    let (outcome, _) = supervisor.run(program.command()).await.unwrap();

    assert_eq!(outcome.exit_code, -1);

    let journal = journal.lock();
    assert_eq!(journal.close_requests, 1);
    assert_eq!(journal.terminated, [(ROOT, u32::MAX)]);
}

#[test(tokio::test)]
async fn stop_without_root_stopper_terminates_root() {
    let program = Program::new();
    let script = vec![
        Step::Created {
            pid: ROOT,
            image: Some("app.exe"),
        },
        Step::narrow_string(ROOT, "still running"),
        Step::Exited {
            pid: ROOT,
            code: u32::MAX,
        },
    ];
    let (debugger, journal) = MockDebugger::new(ROOT, script);

    let supervisor = supervisor(
        debugger.refusing_stopper(),
        RecordingClient::default(),
        RunConfig::default(),
    );
    supervisor.stop_handle().stop();

    let (outcome, _) = supervisor.run(program.command()).await.unwrap();

    assert_eq!(outcome.exit_code, -1);

    let journal = journal.lock();
    assert_eq!(journal.close_requests, 0);
    assert_eq!(journal.terminated, [(ROOT, u32::MAX)]);
}

#[test(tokio::test)]
async fn stop_after_run_is_noop() {
    let program = Program::new();
    let script = vec![
        Step::Created {
            pid: ROOT,
            image: Some("app.exe"),
        },
        Step::Exited { pid: ROOT, code: 0 },
    ];
    let (debugger, journal) = MockDebugger::new(ROOT, script);

    let supervisor = supervisor(debugger, RecordingClient::default(), RunConfig::default());
    let stop = supervisor.stop_handle();

    supervisor.run(program.command()).await.unwrap();
    stop.stop();

    let journal = journal.lock();
    assert_eq!(journal.close_requests, 0);
    assert!(journal.terminated.is_empty());
}
