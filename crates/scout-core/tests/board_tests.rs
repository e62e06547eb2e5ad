//! Task board tests
//!
//! Exercises the action protocol, rendering, and listener notification of
//! TaskBoardStore, including concurrent access from several threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use scout_core::board::{ApplyRequest, TaskBoardStore, TaskStatus};

fn init(store: &TaskBoardStore, session: &str, run: &str, tasks: &str) -> String {
    store.apply(session, run, &ApplyRequest::new("init").with_tasks(tasks))
}

mod protocol_tests {
    use super::*;

    #[test]
    fn test_round_trip_init_render() {
        let store = TaskBoardStore::new();
        store.create_session("s1", "Research");
        assert_eq!(init(&store, "s1", "Run 1", "A\nB\nC"), "SUCCESS: initialized 3 tasks for Run 1");

        assert_eq!(
            store.render("s1"),
            "🗂 Research\n\nRun 1:\n- [ ] 1. A\n- [ ] 2. B\n- [ ] 3. C"
        );
    }

    #[test]
    fn test_init_drops_blank_lines() {
        let store = TaskBoardStore::new();
        assert_eq!(init(&store, "s1", "Run 1", "\n  A  \n\n\nB\n"), "SUCCESS: initialized 2 tasks for Run 1");
        let session = store.get_session("s1").unwrap();
        let texts: Vec<&str> = session.run("Run 1").unwrap().tasks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B"]);
    }

    #[test]
    fn test_init_gate() {
        let store = TaskBoardStore::new();
        let requests = [
            ApplyRequest::new("add").with_text("x"),
            ApplyRequest::new("update").with_task_id(1).with_text("x"),
            ApplyRequest::new("complete").with_task_id(1),
            ApplyRequest::new("delete").with_task_id(1),
            ApplyRequest::new("replace").with_tasks("x"),
            ApplyRequest::new("clear"),
        ];
        for request in &requests {
            let result = store.apply("s1", "Run 1", request);
            assert_eq!(
                result,
                "ERROR: Task list not initialized for this run. First call must be action=init.",
                "action {} should be gated",
                request.action
            );
        }
        let session = store.get_session("s1").unwrap();
        let run = session.run("Run 1").unwrap();
        assert!(!run.initialized);
        assert!(run.tasks.is_empty());
    }

    #[test]
    fn test_complete_with_notes_scenario() {
        let store = TaskBoardStore::new();
        init(&store, "s1", "Run 1", "A\nB");

        let result = store.apply(
            "s1",
            "Run 1",
            &ApplyRequest::new("complete").with_task_id(2).with_notes("done via search"),
        );
        assert_eq!(result, "SUCCESS: completed task 2");

        let session = store.get_session("s1").unwrap();
        let run = session.run("Run 1").unwrap();
        assert_eq!(run.task(1).unwrap().status, TaskStatus::Todo);
        assert_eq!(run.task(2).unwrap().status, TaskStatus::Done);
        assert_eq!(run.task(2).unwrap().notes, "done via search");

        let rendered = store.render("s1");
        assert!(rendered.contains("- [ ] 1. A\n- [x] 2. B\n  note: done via search"));
    }

    #[test]
    fn test_validation_errors() {
        let store = TaskBoardStore::new();
        init(&store, "s1", "Run 1", "A");

        assert_eq!(store.apply("s1", "Run 1", &ApplyRequest::new("  ")), "ERROR: action is required");
        assert_eq!(
            store.apply("s1", "Run 1", &ApplyRequest::new("add")),
            "ERROR: text is required for action=add"
        );
        assert_eq!(
            store.apply("s1", "Run 1", &ApplyRequest::new("Delete")),
            "ERROR: task_id is required for action=delete"
        );
        assert_eq!(
            store.apply("s1", "Run 1", &ApplyRequest::new("update").with_task_id(9)),
            "ERROR: task_id 9 not found"
        );
        assert!(store
            .apply("s1", "Run 1", &ApplyRequest::new("archive"))
            .starts_with("ERROR: unsupported action. Use one of: init, list, add"));
    }

    #[test]
    fn test_update_patches_only_given_fields() {
        let store = TaskBoardStore::new();
        init(&store, "s1", "Run 1", "Search arxiv");
        store.apply(
            "s1",
            "Run 1",
            &ApplyRequest::new("update").with_task_id(1).with_status("DOING"),
        );
        let session = store.get_session("s1").unwrap();
        let task = session.run("Run 1").unwrap().task(1).unwrap().clone();
        assert_eq!(task.text, "Search arxiv");
        assert_eq!(task.status, TaskStatus::Doing);
        assert!(store.render("s1").contains("- [~] 1. Search arxiv"));
    }

    #[test]
    fn test_unknown_status_kept_verbatim() {
        let store = TaskBoardStore::new();
        init(&store, "s1", "Run 1", "");
        store.apply("s1", "Run 1", &ApplyRequest::new("add").with_text("Wait").with_status("blocked"));
        let session = store.get_session("s1").unwrap();
        assert_eq!(session.run("Run 1").unwrap().task(1).unwrap().status.as_str(), "blocked");
        assert!(store.render("s1").contains("- [ ] 1. Wait"));
    }

    #[test]
    fn test_runs_render_in_insertion_order() {
        let store = TaskBoardStore::new();
        init(&store, "s1", "Run 2 (self-critique)", "Check");
        store.ensure_run("s1", "Run 1");
        init(&store, "s1", "Run 3", "");

        assert_eq!(
            store.render("s1"),
            "🗂 Task List\n\nRun 2 (self-critique):\n- [ ] 1. Check\n\nRun 1:\n- (not initialized)\n\nRun 3:\n- (no tasks)"
        );
    }
}

mod id_tests {
    use super::*;

    #[test]
    fn test_ids_never_reused_after_delete() {
        let store = TaskBoardStore::new();
        init(&store, "s1", "Run 1", "A\nB\nC");
        store.apply("s1", "Run 1", &ApplyRequest::new("delete").with_task_id(3));
        assert_eq!(
            store.apply("s1", "Run 1", &ApplyRequest::new("add").with_text("D")),
            "SUCCESS: added task 4"
        );
    }

    #[test]
    fn test_id_monotonicity_over_mixed_sequence() {
        let store = TaskBoardStore::new();
        init(&store, "s1", "Run 1", "A\nB");
        let steps = [
            ApplyRequest::new("add").with_text("C"),
            ApplyRequest::new("delete").with_task_id(1),
            ApplyRequest::new("add").with_text("D"),
            ApplyRequest::new("replace").with_tasks("X\nY\nZ"),
            ApplyRequest::new("delete").with_task_id(2),
            ApplyRequest::new("add").with_text("W"),
            ApplyRequest::new("clear"),
            ApplyRequest::new("add").with_text("V"),
            ApplyRequest::new("add").with_text("U"),
            ApplyRequest::new("delete").with_task_id(1),
        ];
        for step in &steps {
            store.apply("s1", "Run 1", step);
            let session = store.get_session("s1").unwrap();
            let run = session.run("Run 1").unwrap();
            let mut ids: Vec<u64> = run.tasks.iter().map(|t| t.id).collect();
            assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids out of order: {:?}", ids);
            ids.dedup();
            assert_eq!(ids.len(), run.tasks.len());
            assert!(run.tasks.iter().all(|t| t.id < run.next_id));
        }
    }
}

mod listener_tests {
    use super::*;

    #[test]
    fn test_notification_matches_render() {
        let store = Arc::new(TaskBoardStore::new());
        init(&store, "s1", "Run 1", "A");

        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        store.register_listener("s1", Arc::new(move |board: &str| sink.lock().push(board.to_string())));

        store.apply("s1", "Run 1", &ApplyRequest::new("add").with_text("B"));
        let rendered = store.render("s1");

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], rendered);
    }

    #[test]
    fn test_failing_listener_does_not_block_others() {
        let store = TaskBoardStore::new();
        init(&store, "s1", "Run 1", "A");

        let hits = Arc::new(AtomicUsize::new(0));
        store.register_listener("s1", Arc::new(|_: &str| panic!("ui went away")));
        let counter = hits.clone();
        store.register_listener("s1", Arc::new(move |_: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let result = store.apply("s1", "Run 1", &ApplyRequest::new("add").with_text("B"));
        assert_eq!(result, "SUCCESS: added task 2");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_list_and_failures_do_not_notify() {
        let store = TaskBoardStore::new();
        init(&store, "s1", "Run 1", "A");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let id = store.register_listener("s1", Arc::new(move |_: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        store.apply("s1", "Run 1", &ApplyRequest::new("list"));
        store.apply("s1", "Run 1", &ApplyRequest::new("delete").with_task_id(42));
        store.apply("s1", "Run 1", &ApplyRequest::new("bogus"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        assert!(store.unregister_listener("s1", id));
        store.apply("s1", "Run 1", &ApplyRequest::new("add").with_text("B"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(!store.unregister_listener("s1", id));
    }

    #[test]
    fn test_listener_may_read_the_store() {
        let store = Arc::new(TaskBoardStore::new());
        init(&store, "s1", "Run 1", "A");
        let reentrant = store.clone();
        let seen = Arc::new(Mutex::new(String::new()));
        let sink = seen.clone();
        store.register_listener("s1", Arc::new(move |_: &str| {
            *sink.lock() = reentrant.render("s1");
        }));

        store.apply("s1", "Run 1", &ApplyRequest::new("complete").with_task_id(1));
        assert!(seen.lock().contains("- [x] 1. A"));
    }
}

mod idempotence_tests {
    use super::*;

    #[test]
    fn test_render_and_list_are_stable() {
        let store = TaskBoardStore::new();
        init(&store, "s1", "Run 1", "A\nB");
        let first = store.render("s1");
        let listed = store.apply("s1", "Run 1", &ApplyRequest::new("list"));
        assert_eq!(first, store.render("s1"));
        assert_eq!(first, listed);
    }

    #[test]
    fn test_missing_session() {
        let store = TaskBoardStore::new();
        assert_eq!(store.render("nope"), "Task list session not found.");
    }
}

mod concurrency_tests {
    use super::*;

    #[test]
    fn test_concurrent_adds_get_unique_ids() {
        let store = Arc::new(TaskBoardStore::new());
        init(&store, "s1", "Run 1", "");
        let notifications = Arc::new(AtomicUsize::new(0));
        let counter = notifications.clone();
        store.register_listener("s1", Arc::new(move |_: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let text = format!("w{}-{}", worker, i);
                        let result = store.apply("s1", "Run 1", &ApplyRequest::new("add").with_text(text));
                        assert!(result.starts_with("SUCCESS: added task "));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let session = store.get_session("s1").unwrap();
        let run = session.run("Run 1").unwrap();
        let ids: Vec<u64> = run.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, (1..=200).collect::<Vec<u64>>());
        assert_eq!(notifications.load(Ordering::SeqCst), 200);
    }

    #[test]
    fn test_sessions_are_independent() {
        let store = Arc::new(TaskBoardStore::new());
        let handles: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|session| {
                let store = store.clone();
                std::thread::spawn(move || {
                    init(&store, session, "Run 1", "one\ntwo");
                    store.apply(session, "Run 1", &ApplyRequest::new("complete").with_task_id(1));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        for session in ["a", "b", "c"] {
            assert!(store.render(session).contains("- [x] 1. one\n- [ ] 2. two"));
        }
    }
}
