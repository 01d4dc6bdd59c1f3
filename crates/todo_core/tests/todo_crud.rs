use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use todo_core::{
    open_store_with_clock, ManualClock, RepoError, SortField, SortOrder, StorageConfig,
    TodoDraft, TodoListQuery, TodoPatch, TodoRepository, TodoStore, TodoValidationError,
};

const START_MS: i64 = 1_700_000_000_000;

struct Backend {
    name: &'static str,
    store: TodoStore,
    clock: ManualClock,
    _dir: Option<TempDir>,
}

fn memory_backend() -> Backend {
    let clock = ManualClock::at_ms(START_MS);
    let store = open_store_with_clock(&StorageConfig::Memory, Arc::new(clock.clone())).unwrap();
    Backend {
        name: "memory",
        store,
        clock,
        _dir: None,
    }
}

fn sqlite_backend() -> Backend {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::at_ms(START_MS);
    let config = StorageConfig::Sqlite {
        path: dir.path().join("todos.db"),
    };
    let store = open_store_with_clock(&config, Arc::new(clock.clone())).unwrap();
    Backend {
        name: "sqlite",
        store,
        clock,
        _dir: Some(dir),
    }
}

fn backends() -> Vec<Backend> {
    vec![memory_backend(), sqlite_backend()]
}

fn draft(title: &str, description: Option<&str>, completed: bool) -> TodoDraft {
    TodoDraft {
        title: title.to_string(),
        description: description.map(str::to_string),
        completed,
        due_date: None,
    }
}

fn all() -> TodoListQuery {
    TodoListQuery {
        limit: 100,
        ..TodoListQuery::default()
    }
}

#[test]
fn create_sets_defaults_and_equal_timestamps() {
    for backend in backends() {
        let repo = &backend.store;
        let todo = repo.create_todo(&TodoDraft::new("  Buy milk  ")).unwrap();

        assert_eq!(todo.title, "Buy milk", "{}", backend.name);
        assert_eq!(todo.description, None, "{}", backend.name);
        assert!(!todo.completed, "{}", backend.name);
        assert_eq!(todo.created_at, START_MS, "{}", backend.name);
        assert_eq!(todo.created_at, todo.updated_at, "{}", backend.name);

        let loaded = repo.get_todo(todo.id).unwrap();
        assert_eq!(loaded, todo, "{}", backend.name);
    }
}

#[test]
fn create_with_empty_title_fails_and_persists_nothing() {
    for backend in backends() {
        let repo = &backend.store;
        repo.create_todo(&TodoDraft::new("keep")).unwrap();
        let before = repo.list_todos(&all()).unwrap().total;

        for title in ["", "   "] {
            let err = repo.create_todo(&TodoDraft::new(title)).unwrap_err();
            assert!(
                matches!(err, RepoError::Validation(TodoValidationError::EmptyTitle)),
                "{}: {err}",
                backend.name
            );
        }

        let after = repo.list_todos(&all()).unwrap().total;
        assert_eq!(before, after, "{}", backend.name);
    }
}

#[test]
fn get_missing_is_not_found() {
    for backend in backends() {
        let err = backend.store.get_todo(42).unwrap_err();
        assert!(
            matches!(err, RepoError::NotFound(42)),
            "{}: {err}",
            backend.name
        );
    }
}

#[test]
fn replace_overwrites_every_field_and_is_idempotent() {
    for backend in backends() {
        let repo = &backend.store;
        let created = repo
            .create_todo(&TodoDraft {
                title: "draft".to_string(),
                description: Some("old".to_string()),
                completed: true,
                due_date: Some(START_MS + 86_400_000),
            })
            .unwrap();

        backend.clock.advance_ms(1_000);
        let payload = draft("final", None, false);
        let replaced = repo.replace_todo(created.id, &payload).unwrap();

        assert_eq!(replaced.id, created.id, "{}", backend.name);
        assert_eq!(replaced.title, "final", "{}", backend.name);
        assert_eq!(replaced.description, None, "{}", backend.name);
        assert!(!replaced.completed, "{}", backend.name);
        assert_eq!(replaced.due_date, None, "{}", backend.name);
        assert_eq!(replaced.created_at, created.created_at, "{}", backend.name);
        assert_eq!(replaced.updated_at, START_MS + 1_000, "{}", backend.name);
        assert_eq!(repo.get_todo(created.id).unwrap(), replaced, "{}", backend.name);

        let again = repo.replace_todo(created.id, &payload).unwrap();
        assert_eq!(again, replaced, "{}", backend.name);
    }
}

#[test]
fn replace_checks_title_before_existence() {
    for backend in backends() {
        let repo = &backend.store;
        let todo = repo.create_todo(&TodoDraft::new("x")).unwrap();

        let err = repo.replace_todo(todo.id, &TodoDraft::new("")).unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)), "{}", backend.name);
        assert_eq!(repo.get_todo(todo.id).unwrap(), todo, "{}", backend.name);

        let err = repo.replace_todo(999, &TodoDraft::new("")).unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)), "{}", backend.name);

        let err = repo.replace_todo(999, &TodoDraft::new("ok")).unwrap_err();
        assert!(matches!(err, RepoError::NotFound(999)), "{}", backend.name);
    }
}

#[test]
fn patch_touches_only_supplied_fields() {
    for backend in backends() {
        let repo = &backend.store;
        let created = repo
            .create_todo(&TodoDraft {
                title: "Write report".to_string(),
                description: Some("quarterly".to_string()),
                completed: false,
                due_date: Some(START_MS + 5_000),
            })
            .unwrap();

        backend.clock.advance_ms(10);
        let patched = repo
            .patch_todo(
                created.id,
                &TodoPatch {
                    completed: Some(true),
                    ..TodoPatch::default()
                },
            )
            .unwrap();
        assert!(patched.completed, "{}", backend.name);
        assert_eq!(patched.title, created.title, "{}", backend.name);
        assert_eq!(patched.description, created.description, "{}", backend.name);
        assert_eq!(patched.due_date, created.due_date, "{}", backend.name);
        assert_eq!(patched.updated_at, START_MS + 10, "{}", backend.name);

        backend.clock.advance_ms(10);
        let cleared = repo
            .patch_todo(
                created.id,
                &TodoPatch {
                    title: Some(" Write annual report ".to_string()),
                    description: Some(None),
                    ..TodoPatch::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.title, "Write annual report", "{}", backend.name);
        assert_eq!(cleared.description, None, "{}", backend.name);
        assert!(cleared.completed, "{}", backend.name);
        assert_eq!(cleared.due_date, created.due_date, "{}", backend.name);
        assert_eq!(repo.get_todo(created.id).unwrap(), cleared, "{}", backend.name);
    }
}

#[test]
fn patch_rejects_empty_title_and_missing_id() {
    for backend in backends() {
        let repo = &backend.store;
        let todo = repo.create_todo(&TodoDraft::new("stay")).unwrap();

        let empty_title = TodoPatch {
            title: Some("  ".to_string()),
            ..TodoPatch::default()
        };
        let err = repo.patch_todo(todo.id, &empty_title).unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)), "{}", backend.name);
        assert_eq!(repo.get_todo(todo.id).unwrap(), todo, "{}", backend.name);

        let err = repo
            .patch_todo(todo.id + 100, &TodoPatch::default())
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)), "{}", backend.name);
    }
}

#[test]
fn updated_at_never_moves_backwards() {
    for backend in backends() {
        let repo = &backend.store;
        let todo = repo.create_todo(&TodoDraft::new("clock skew")).unwrap();

        backend.clock.set_ms(START_MS - 60_000);
        let patched = repo
            .patch_todo(
                todo.id,
                &TodoPatch {
                    completed: Some(true),
                    ..TodoPatch::default()
                },
            )
            .unwrap();
        assert_eq!(patched.updated_at, todo.updated_at, "{}", backend.name);
        assert!(patched.created_at <= patched.updated_at, "{}", backend.name);

        let replaced = repo
            .replace_todo(todo.id, &TodoDraft::new("clock skew"))
            .unwrap();
        assert_eq!(replaced.updated_at, todo.updated_at, "{}", backend.name);
    }
}

#[test]
fn delete_is_hard_and_not_repeatable() {
    for backend in backends() {
        let repo = &backend.store;
        let todo = repo.create_todo(&TodoDraft::new("temporary")).unwrap();

        repo.delete_todo(todo.id).unwrap();
        assert!(
            matches!(repo.get_todo(todo.id).unwrap_err(), RepoError::NotFound(_)),
            "{}",
            backend.name
        );
        assert!(
            matches!(repo.delete_todo(todo.id).unwrap_err(), RepoError::NotFound(_)),
            "{}",
            backend.name
        );
        assert_eq!(repo.list_todos(&all()).unwrap().total, 0, "{}", backend.name);
    }
}

#[test]
fn ids_stay_unique_across_deletions() {
    for backend in backends() {
        let repo = &backend.store;
        let mut seen = HashSet::new();
        for round in 0..5 {
            let todo = repo.create_todo(&TodoDraft::new(format!("t{round}"))).unwrap();
            assert!(seen.insert(todo.id), "{}: id reused", backend.name);
            if round % 2 == 0 {
                repo.delete_todo(todo.id).unwrap();
            }
        }
    }
}

#[test]
fn pagination_slices_are_contiguous_and_stable() {
    for backend in backends() {
        let repo = &backend.store;
        for n in 0..5 {
            repo.create_todo(&TodoDraft::new(format!("item {n}"))).unwrap();
            if n % 2 == 1 {
                backend.clock.advance_ms(1);
            }
        }

        let page = |limit, offset| {
            repo.list_todos(&TodoListQuery {
                limit,
                offset,
                ..TodoListQuery::default()
            })
            .unwrap()
        };

        let first = page(2, 0);
        let second = page(2, 2);
        let both = page(4, 0);

        assert_eq!(first.total, 5, "{}", backend.name);
        assert_eq!(second.total, 5, "{}", backend.name);
        let joined: Vec<_> = first.items.iter().chain(second.items.iter()).cloned().collect();
        assert_eq!(joined, both.items, "{}", backend.name);

        let ids: Vec<_> = both.items.iter().map(|todo| todo.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted, "{}: ties must keep creation order", backend.name);

        let past_end = page(10, 50);
        assert!(past_end.items.is_empty(), "{}", backend.name);
        assert_eq!(past_end.total, 5, "{}", backend.name);
    }
}

#[test]
fn completed_filter_total_ignores_limit() {
    for backend in backends() {
        let repo = &backend.store;
        for n in 0..6 {
            repo.create_todo(&draft(&format!("task {n}"), None, n % 3 == 0))
                .unwrap();
        }

        let page = repo
            .list_todos(&TodoListQuery {
                completed: Some(true),
                limit: 1,
                ..TodoListQuery::default()
            })
            .unwrap();
        assert_eq!(page.total, 2, "{}", backend.name);
        assert_eq!(page.items.len(), 1, "{}", backend.name);
        assert!(page.items.iter().all(|todo| todo.completed), "{}", backend.name);
    }
}

#[test]
fn buy_milk_scenario() {
    for backend in backends() {
        let repo = &backend.store;
        let a = repo.create_todo(&TodoDraft::new("Buy milk")).unwrap();
        backend.clock.advance_ms(1);
        let b = repo.create_todo(&draft("Buy eggs", None, true)).unwrap();

        let search = repo
            .list_todos(&TodoListQuery {
                search: Some("buy".to_string()),
                ..TodoListQuery::default()
            })
            .unwrap();
        assert_eq!(search.total, 2, "{}", backend.name);

        let completed_only = TodoListQuery {
            completed: Some(true),
            ..TodoListQuery::default()
        };
        let done = repo.list_todos(&completed_only).unwrap();
        assert_eq!(done.total, 1, "{}", backend.name);
        assert_eq!(done.items[0].id, b.id, "{}", backend.name);

        backend.clock.advance_ms(1);
        repo.patch_todo(
            a.id,
            &TodoPatch {
                completed: Some(true),
                ..TodoPatch::default()
            },
        )
        .unwrap();

        let done = repo.list_todos(&completed_only).unwrap();
        assert_eq!(done.total, 2, "{}", backend.name);
        let ids: Vec<_> = done.items.iter().map(|todo| todo.id).collect();
        assert_eq!(ids, vec![a.id, b.id], "{}", backend.name);
    }
}

#[test]
fn search_matches_description_and_treats_wildcards_literally() {
    for backend in backends() {
        let repo = &backend.store;
        repo.create_todo(&draft("Groceries", Some("BUY Bread"), false))
            .unwrap();
        repo.create_todo(&draft("Discount 50% off", None, false)).unwrap();
        repo.create_todo(&draft("Discount 50 off", None, false)).unwrap();

        let search = |needle: &str| {
            repo.list_todos(&TodoListQuery {
                search: Some(needle.to_string()),
                ..TodoListQuery::default()
            })
            .unwrap()
        };

        assert_eq!(search("bread").total, 1, "{}", backend.name);
        assert_eq!(search("50%").total, 1, "{}", backend.name);
        assert_eq!(search("_").total, 0, "{}", backend.name);
        assert_eq!(search("DISCOUNT").total, 2, "{}", backend.name);
    }
}

#[test]
fn sort_by_updated_at_descending() {
    for backend in backends() {
        let repo = &backend.store;
        let first = repo.create_todo(&TodoDraft::new("first")).unwrap();
        backend.clock.advance_ms(5);
        let second = repo.create_todo(&TodoDraft::new("second")).unwrap();
        backend.clock.advance_ms(5);
        let third = repo.create_todo(&TodoDraft::new("third")).unwrap();
        backend.clock.advance_ms(5);
        repo.patch_todo(
            first.id,
            &TodoPatch {
                completed: Some(true),
                ..TodoPatch::default()
            },
        )
        .unwrap();

        let page = repo
            .list_todos(&TodoListQuery {
                sort: SortField::UpdatedAt,
                order: SortOrder::Desc,
                ..TodoListQuery::default()
            })
            .unwrap();
        let ids: Vec<_> = page.items.iter().map(|todo| todo.id).collect();
        assert_eq!(ids, vec![first.id, third.id, second.id], "{}", backend.name);

        let page = repo
            .list_todos(&TodoListQuery {
                order: SortOrder::Desc,
                ..TodoListQuery::default()
            })
            .unwrap();
        let ids: Vec<_> = page.items.iter().map(|todo| todo.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id], "{}", backend.name);
    }
}

#[test]
fn zero_limit_query_is_rejected_by_repository() {
    for backend in backends() {
        let err = backend
            .store
            .list_todos(&TodoListQuery {
                limit: 0,
                ..TodoListQuery::default()
            })
            .unwrap_err();
        assert!(
            matches!(
                err,
                RepoError::Validation(TodoValidationError::InvalidLimit(0))
            ),
            "{}: {err}",
            backend.name
        );
    }
}
