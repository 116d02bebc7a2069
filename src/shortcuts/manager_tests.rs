use super::*;
use crate::shortcuts::persistence::{MemoryBackend, StoredEntry};
use crate::shortcuts::reserved::MenuItem;
use crate::shortcuts::{Key, Modifiers, RecorderState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

// =============================================================================
// Test doubles
// =============================================================================

#[derive(Default)]
struct HookLog {
    installed: bool,
    installs: usize,
    bindings: Vec<Shortcut>,
}

/// Records what the manager asks of the OS hook.
#[derive(Clone, Default)]
struct RecordingHook(Arc<Mutex<HookLog>>);

impl KeyEventHook for RecordingHook {
    fn install(&mut self) -> Result<()> {
        let mut log = self.0.lock();
        log.installed = true;
        log.installs += 1;
        Ok(())
    }

    fn uninstall(&mut self) {
        let mut log = self.0.lock();
        log.installed = false;
        log.bindings.clear();
    }

    fn is_installed(&self) -> bool {
        self.0.lock().installed
    }

    fn update_bindings(&mut self, bindings: &[Shortcut]) {
        self.0.lock().bindings = bindings.to_vec();
    }
}

struct FailingHook;

impl KeyEventHook for FailingHook {
    fn install(&mut self) -> Result<()> {
        Err(ShortcutError::HookUnavailable("no accessibility permission".to_string()))
    }
    fn uninstall(&mut self) {}
    fn is_installed(&self) -> bool {
        false
    }
    fn update_bindings(&mut self, _bindings: &[Shortcut]) {}
}

#[derive(Default)]
struct MockMenus(Mutex<Vec<MenuItem>>);

impl ReservedCatalogProvider for MockMenus {
    fn menu_items(&self) -> Vec<MenuItem> {
        self.0.lock().clone()
    }
}

struct Fixture {
    manager: ShortcutManager,
    backend: Arc<MemoryBackend>,
    menus: Arc<MockMenus>,
    hook: RecordingHook,
}

fn fixture() -> Fixture {
    let backend = Arc::new(MemoryBackend::new());
    let menus = Arc::new(MockMenus::default());
    let hook = RecordingHook::default();
    let manager = ShortcutManager::builder()
        .store(ShortcutStore::new(backend.clone(), "shortcut_"))
        .shared_provider(menus.clone())
        .hook(hook.clone())
        .platform(Platform::MacOS)
        .build();
    Fixture {
        manager,
        backend,
        menus,
        hook,
    }
}

fn shortcut(s: &str) -> Shortcut {
    Shortcut::parse(s).unwrap()
}

fn press(s: &str) -> KeyEvent {
    let shortcut = shortcut(s);
    KeyEvent::down(shortcut.key.code(), shortcut.modifiers)
}

/// on_change callback that records every value it receives.
fn change_log() -> (
    Arc<Mutex<Vec<Option<Shortcut>>>>,
    impl Fn(Option<Shortcut>) + Send + Sync + 'static,
) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    (log, move |value| sink.lock().push(value))
}

/// Run `f` on its own thread and fail if it does not finish, rather than
/// hanging the test run on a re-entered lock.
fn within_deadline<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(Duration::from_secs(5))
        .expect("manager call did not return")
}

fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    (count, move || {
        c.fetch_add(1, Ordering::SeqCst);
    })
}

// =============================================================================
// Persistence through the manager
// =============================================================================

#[test]
fn set_then_remove_round_trips() {
    let f = fixture();
    let name = Name::new("toggle");
    let report = f.manager.set_shortcut(&name, shortcut("cmd+shift+k")).unwrap();
    assert_eq!(report.durability, Durability::Durable);
    assert_eq!(f.manager.current_shortcut(&name), Some(shortcut("cmd+shift+k")));
    assert_eq!(f.manager.store().load(&name), Some(shortcut("cmd+shift+k")));

    f.manager.remove(&name);
    assert_eq!(f.manager.current_shortcut(&name), None);
    assert_eq!(f.manager.store().stored(&name), StoredEntry::Unbound);
}

#[test]
fn reset_restores_default_or_unbinds() {
    let f = fixture();
    let with_default = f
        .manager
        .declare(&Name::with_default("palette", shortcut("cmd+shift+p")));
    let plain = Name::new("plain");

    f.manager.set_shortcut(&with_default, shortcut("cmd+alt+p")).unwrap();
    f.manager.set_shortcut(&plain, shortcut("cmd+alt+l")).unwrap();

    let report = f.manager.reset(&Name::new("palette"));
    assert_eq!(report.shortcut, Some(shortcut("cmd+shift+p")));
    assert_eq!(report.previous, Some(shortcut("cmd+alt+p")));
    assert_eq!(f.manager.current_shortcut(&with_default), Some(shortcut("cmd+shift+p")));

    f.manager.reset(&plain);
    assert_eq!(f.manager.current_shortcut(&plain), None);
    assert_eq!(f.manager.store().stored(&plain), StoredEntry::Missing);
}

#[test]
fn reset_all_covers_stored_but_undeclared_names() {
    let f = fixture();
    f.backend.insert_raw("shortcut_legacy", &shortcut("cmd+j").encode());
    let declared = f
        .manager
        .declare(&Name::with_default("toggle", shortcut("cmd+shift+t")));
    f.manager.remove(&declared);

    let reports = f.manager.reset_all();
    assert_eq!(reports.len(), 2);
    assert_eq!(f.manager.current_shortcut(&declared), Some(shortcut("cmd+shift+t")));
    assert!(f.manager.store().stored_names().is_empty());
}

#[test]
fn store_failure_keeps_binding_in_memory() {
    let f = fixture();
    let name = Name::new("toggle");
    f.backend.set_unavailable(true);

    let report = f.manager.set_shortcut(&name, shortcut("cmd+shift+k")).unwrap();
    assert_eq!(report.durability, Durability::MemoryOnly);
    assert_eq!(f.manager.current_shortcut(&name), Some(shortcut("cmd+shift+k")));
}

#[test]
fn direct_set_rejects_invalid_combination() {
    let f = fixture();
    let result = f
        .manager
        .set_shortcut(&Name::new("x"), Shortcut::new(Key::K, Modifiers::SHIFT));
    assert_eq!(result, Err(ShortcutError::InvalidCombination));
}

#[test]
fn set_default_applies_without_stored_value() {
    let f = fixture();
    let name = Name::new("toggle");
    assert_eq!(f.manager.current_shortcut(&name), None);
    let declared = f.manager.set_default(&name, shortcut("cmd+alt+t"));
    assert_eq!(declared.default_shortcut(), Some(shortcut("cmd+alt+t")));
    assert_eq!(f.manager.current_shortcut(&name), Some(shortcut("cmd+alt+t")));
}

// =============================================================================
// Recorder
// =============================================================================

#[test]
fn recording_commits_and_notifies_once() {
    let f = fixture();
    let name = Name::new("toggle");
    let (changes, on_change) = change_log();
    let _session = f.manager.start_recording(&name, Scope::Local, on_change);

    assert_eq!(
        f.manager
            .handle_key_event(KeyEvent::flags_changed(Modifiers::COMMAND), true),
        KeyEventOutcome::Recorder(RecorderOutcome::Updated)
    );
    let outcome = f.manager.handle_key_event(press("cmd+shift+k"), true);
    let KeyEventOutcome::Recorder(RecorderOutcome::Committed(report)) = outcome else {
        panic!("expected commit, got {outcome:?}");
    };
    assert_eq!(report.shortcut, Some(shortcut("cmd+shift+k")));
    assert_eq!(report.durability, Durability::Durable);

    assert_eq!(*changes.lock(), vec![Some(shortcut("cmd+shift+k"))]);
    assert_eq!(f.manager.current_shortcut(&name), Some(shortcut("cmd+shift+k")));
    assert_eq!(f.manager.store().load(&name), Some(shortcut("cmd+shift+k")));
    assert!(f.manager.recording_snapshot().is_none());
}

#[test]
fn system_reserved_candidate_is_rejected_and_session_keeps_listening() {
    let f = fixture();
    let name = Name::new("toggle");
    let (changes, on_change) = change_log();
    let rejections = f.manager.rejections();
    let _session = f.manager.start_recording(&name, Scope::Local, on_change);

    let outcome = f.manager.handle_key_event(press("cmd+space"), true);
    assert_eq!(
        outcome,
        KeyEventOutcome::Recorder(RecorderOutcome::Rejected(Rejection::ReservedBySystem {
            label: "Spotlight".to_string()
        }))
    );
    assert_eq!(f.manager.current_shortcut(&name), None);
    assert_eq!(f.manager.store().stored(&name), StoredEntry::Missing);
    assert!(changes.lock().is_empty());

    let snapshot = f.manager.recording_snapshot().unwrap();
    assert_eq!(snapshot.state, RecorderState::Listening);
    assert!(snapshot.last_rejection.is_some());

    let notice = rejections.try_recv().unwrap();
    assert_eq!(notice.name, name);
    assert_eq!(notice.shortcut, shortcut("cmd+space"));

    // Retry in the same session.
    let outcome = f.manager.handle_key_event(press("cmd+alt+k"), true);
    assert!(matches!(
        outcome,
        KeyEventOutcome::Recorder(RecorderOutcome::Committed(_))
    ));
}

#[test]
fn menu_shortcuts_are_checked_fresh_each_time() {
    let f = fixture();
    let _session = f
        .manager
        .start_recording(&Name::new("toggle"), Scope::Local, |_| {});

    f.menus
        .0
        .lock()
        .push(MenuItem::submenu(
            "Edit",
            vec![MenuItem::new("Find", Some(shortcut("cmd+alt+f")))],
        ));
    let outcome = f.manager.handle_key_event(press("cmd+alt+f"), true);
    assert_eq!(
        outcome,
        KeyEventOutcome::Recorder(RecorderOutcome::Rejected(Rejection::ReservedByMenu {
            title: "Find".to_string()
        }))
    );

    f.menus.0.lock().clear();
    let outcome = f.manager.handle_key_event(press("cmd+alt+f"), true);
    assert!(matches!(
        outcome,
        KeyEventOutcome::Recorder(RecorderOutcome::Committed(_))
    ));
}

#[test]
fn modifierless_candidate_is_invalid() {
    let f = fixture();
    let _session = f
        .manager
        .start_recording(&Name::new("toggle"), Scope::Local, |_| {});
    let outcome = f
        .manager
        .handle_key_event(KeyEvent::down(Key::K.code(), Modifiers::SHIFT), true);
    assert_eq!(
        outcome,
        KeyEventOutcome::Recorder(RecorderOutcome::Rejected(Rejection::InvalidCombination))
    );

    // Function keys may stand alone.
    let outcome = f
        .manager
        .handle_key_event(KeyEvent::down(Key::F1.code(), Modifiers::empty()), true);
    assert!(matches!(
        outcome,
        KeyEventOutcome::Recorder(RecorderOutcome::Committed(_))
    ));
}

#[test]
fn cancel_leaves_everything_unchanged() {
    let f = fixture();
    let name = Name::new("toggle");
    f.manager.set_shortcut(&name, shortcut("cmd+shift+k")).unwrap();
    let (fired, handler) = counter();
    let _listener = f.manager.register(&name, Scope::Global, handler);
    let stored_before = f.manager.store().stored(&name);
    let bindings_before = f.hook.0.lock().bindings.clone();
    let names_before = f.manager.names();

    for cancel in 0..3 {
        let (changes, on_change) = change_log();
        let session = f.manager.start_recording(&name, Scope::Local, on_change);
        f.manager
            .handle_key_event(KeyEvent::flags_changed(Modifiers::OPTION), true);
        match cancel {
            0 => {
                f.manager
                    .handle_key_event(KeyEvent::down(Key::ESCAPE.code(), Modifiers::empty()), true);
            }
            1 => {
                f.manager.focus_lost();
            }
            _ => {
                assert!(session.cancel());
            }
        }
        assert!(!session.is_active());
        assert!(changes.lock().is_empty());
        assert_eq!(f.manager.current_shortcut(&name), Some(shortcut("cmd+shift+k")));
        assert_eq!(f.manager.store().stored(&name), stored_before);
        assert_eq!(f.hook.0.lock().bindings, bindings_before);
        assert_eq!(f.manager.names(), names_before);
    }

    assert_eq!(f.manager.post(&shortcut("cmd+shift+k"), false), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn cancelled_session_does_not_declare_its_name() {
    let f = fixture();
    f.backend
        .insert_raw("shortcut_fresh", &shortcut("cmd+alt+f").encode());
    let session = f
        .manager
        .start_recording(&Name::new("fresh"), Scope::Local, |_| {});
    assert_eq!(
        f.manager.recording_snapshot().and_then(|s| s.bound),
        Some(shortcut("cmd+alt+f"))
    );
    assert!(session.cancel());
    assert!(f.manager.names().is_empty());
}

#[test]
fn recording_uses_declared_default_of_plain_name() {
    let f = fixture();
    f.manager
        .declare(&Name::with_default("toggle", shortcut("cmd+shift+k")));
    let _session = f
        .manager
        .start_recording(&Name::new("toggle"), Scope::Local, |_| {});
    let snapshot = f.manager.recording_snapshot().unwrap();
    assert_eq!(snapshot.bound, Some(shortcut("cmd+shift+k")));
    assert_eq!(snapshot.name.default_shortcut(), Some(shortcut("cmd+shift+k")));
}

#[test]
fn lookup_before_declaration_keeps_default() {
    let f = fixture();
    assert_eq!(f.manager.current_shortcut(&Name::new("toggle")), None);

    let declared = f
        .manager
        .declare(&Name::with_default("toggle", shortcut("cmd+shift+k")));
    assert_eq!(declared.default_shortcut(), Some(shortcut("cmd+shift+k")));
    assert_eq!(
        f.manager.current_shortcut(&Name::new("toggle")),
        Some(shortcut("cmd+shift+k"))
    );
}

#[test]
fn modifier_key_presses_do_not_commit() {
    let f = fixture();
    let name = Name::new("toggle");
    let (changes, on_change) = change_log();
    let _session = f.manager.start_recording(&name, Scope::Local, on_change);

    // Left command, then left shift, reported as plain key-downs.
    for (code, modifiers) in [
        (55, Modifiers::COMMAND),
        (56, Modifiers::COMMAND | Modifiers::SHIFT),
    ] {
        let outcome = f.manager.handle_key_event(KeyEvent::down(code, modifiers), true);
        assert_eq!(outcome, KeyEventOutcome::Recorder(RecorderOutcome::Updated));
    }
    assert_eq!(f.manager.recorder_state(), RecorderState::Listening);
    assert_eq!(
        f.manager.recording_snapshot().map(|s| s.live_modifiers),
        Some(Modifiers::COMMAND | Modifiers::SHIFT)
    );
    assert!(changes.lock().is_empty());
    assert_eq!(f.manager.current_shortcut(&name), None);

    f.manager.handle_key_event(press("cmd+shift+j"), true);
    assert_eq!(*changes.lock(), vec![Some(shortcut("cmd+shift+j"))]);
    assert_eq!(f.manager.recorder_state(), RecorderState::Idle);
}

#[test]
fn dropping_session_handle_cancels_silently() {
    let f = fixture();
    let (changes, on_change) = change_log();
    let session = f
        .manager
        .start_recording(&Name::new("toggle"), Scope::Local, on_change);
    assert!(f.manager.recording_snapshot().is_some());
    drop(session);
    assert!(f.manager.recording_snapshot().is_none());
    assert!(changes.lock().is_empty());
}

#[test]
fn second_session_silently_replaces_first() {
    let f = fixture();
    let (first_changes, first_cb) = change_log();
    let (second_changes, second_cb) = change_log();
    let first = f
        .manager
        .start_recording(&Name::new("first"), Scope::Local, first_cb);
    let second = f
        .manager
        .start_recording(&Name::new("second"), Scope::Local, second_cb);

    assert!(!first.is_active());
    assert!(second.is_active());
    // Dropping the stale handle must not cancel the new session.
    drop(first);
    assert!(second.is_active());

    f.manager.handle_key_event(press("cmd+alt+s"), true);
    assert!(first_changes.lock().is_empty());
    assert_eq!(*second_changes.lock(), vec![Some(shortcut("cmd+alt+s"))]);
    assert_eq!(f.manager.current_shortcut(&Name::new("first")), None);
}

#[test]
fn clearing_key_commits_absent() {
    let f = fixture();
    let name = Name::with_default("toggle", shortcut("cmd+shift+k"));
    let (changes, on_change) = change_log();
    let _session = f.manager.start_recording(&name, Scope::Local, on_change);

    let outcome = f
        .manager
        .handle_key_event(KeyEvent::down(Key::BACKSPACE.code(), Modifiers::empty()), true);
    let KeyEventOutcome::Recorder(RecorderOutcome::Committed(report)) = outcome else {
        panic!("expected commit, got {outcome:?}");
    };
    assert_eq!(report.shortcut, None);
    assert_eq!(report.previous, Some(shortcut("cmd+shift+k")));
    assert_eq!(*changes.lock(), vec![None]);
    assert_eq!(f.manager.current_shortcut(&name), None);
    assert_eq!(f.manager.store().stored(&name), StoredEntry::Unbound);
}

#[test]
fn conflict_needs_explicit_override() {
    let f = fixture();
    let a = Name::new("a");
    let b = Name::new("b");
    f.manager.set_shortcut(&a, shortcut("cmd+shift+k")).unwrap();

    let (changes, on_change) = change_log();
    let _session = f.manager.start_recording(&b, Scope::Local, on_change);
    let outcome = f.manager.handle_key_event(press("cmd+shift+k"), true);
    assert_eq!(
        outcome,
        KeyEventOutcome::Recorder(RecorderOutcome::Rejected(Rejection::ConflictsWithName(
            a.clone()
        )))
    );
    assert_eq!(f.manager.current_shortcut(&b), None);
    assert_eq!(f.manager.current_shortcut(&a), Some(shortcut("cmd+shift+k")));
    assert!(changes.lock().is_empty());

    let report = f.manager.confirm_override().unwrap();
    assert_eq!(report.unbound, Some(a.clone()));
    assert_eq!(f.manager.current_shortcut(&a), None);
    assert_eq!(f.manager.current_shortcut(&b), Some(shortcut("cmd+shift+k")));
    assert_eq!(f.manager.store().stored(&a), StoredEntry::Unbound);
    assert_eq!(*changes.lock(), vec![Some(shortcut("cmd+shift+k"))]);
}

#[test]
fn declined_override_leaves_session_listening() {
    let f = fixture();
    let a = Name::new("a");
    let b = Name::new("b");
    f.manager.set_shortcut(&a, shortcut("cmd+shift+k")).unwrap();
    let _session = f.manager.start_recording(&b, Scope::Local, |_| {});
    f.manager.handle_key_event(press("cmd+shift+k"), true);

    f.manager.decline_override().unwrap();
    assert_eq!(f.manager.decline_override(), Err(ShortcutError::NoPendingOverride));
    assert_eq!(f.manager.confirm_override(), Err(ShortcutError::NoPendingOverride));
    assert_eq!(f.manager.current_shortcut(&a), Some(shortcut("cmd+shift+k")));
    assert_eq!(
        f.manager.recording_snapshot().map(|s| s.state),
        Some(RecorderState::Listening)
    );
}

#[test]
fn idle_session_times_out() {
    let manager = ShortcutManager::builder()
        .recording_timeout(Some(Duration::from_millis(1)))
        .build();
    let (changes, on_change) = change_log();
    let session = manager.start_recording(&Name::new("toggle"), Scope::Local, on_change);
    std::thread::sleep(Duration::from_millis(20));
    assert!(manager.recording_snapshot().is_none());
    assert!(!session.is_active());
    assert!(changes.lock().is_empty());
}

#[test]
fn validate_reports_conflicts_without_recording() {
    let f = fixture();
    let a = Name::new("a");
    f.manager.set_shortcut(&a, shortcut("cmd+shift+k")).unwrap();
    assert_eq!(
        f.manager.validate(&Name::new("b"), &shortcut("cmd+shift+k")),
        Err(ShortcutError::ConflictsWithName(a.clone()))
    );
    assert_eq!(f.manager.validate(&a, &shortcut("cmd+shift+k")), Ok(()));
    assert!(matches!(
        f.manager.validate(&a, &shortcut("cmd+tab")),
        Err(ShortcutError::ReservedBySystem { .. })
    ));
}

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn global_and_local_scope_dispatch() {
    let f = fixture();
    let name = Name::new("toggle");
    f.manager.set_shortcut(&name, shortcut("cmd+shift+k")).unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    let o1 = order.clone();
    let o2 = order.clone();
    let o3 = order.clone();
    let _g1 = f
        .manager
        .register(&name, Scope::Global, move || o1.lock().push("global-1"));
    let _l1 = f
        .manager
        .register(&name, Scope::Local, move || o2.lock().push("local"));
    let _g2 = f
        .manager
        .register(&name, Scope::Global, move || o3.lock().push("global-2"));

    assert_eq!(f.manager.post(&shortcut("cmd+shift+k"), false), 2);
    assert_eq!(*order.lock(), vec!["global-1", "global-2"]);

    order.lock().clear();
    assert_eq!(f.manager.post(&shortcut("cmd+shift+k"), true), 3);
    assert_eq!(*order.lock(), vec!["global-1", "local", "global-2"]);

    assert_eq!(f.manager.post(&shortcut("cmd+shift+j"), true), 0);
}

#[test]
fn disabling_name_suppresses_without_unregistering() {
    let f = fixture();
    let name = Name::new("toggle");
    f.manager.set_shortcut(&name, shortcut("cmd+shift+k")).unwrap();
    let (fired, handler) = counter();
    let _handle = f.manager.register(&name, Scope::Global, handler);

    f.manager.set_enabled(name.clone(), false);
    assert_eq!(f.manager.post(&shortcut("cmd+shift+k"), true), 0);
    assert!(!f.manager.is_enabled(name.clone()));

    f.manager.set_enabled(name.clone(), true);
    assert_eq!(f.manager.post(&shortcut("cmd+shift+k"), true), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn releasing_handle_detaches_and_is_idempotent() {
    let f = fixture();
    let name = Name::new("toggle");
    f.manager.set_shortcut(&name, shortcut("cmd+shift+k")).unwrap();
    let (fired, handler) = counter();
    let handle = f.manager.register(&name, Scope::Local, handler);

    handle.release();
    handle.release();
    assert_eq!(f.manager.post(&shortcut("cmd+shift+k"), true), 0);
    drop(handle);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn handler_may_release_its_own_handle() {
    let f = fixture();
    let name = Name::new("once");
    f.manager.set_shortcut(&name, shortcut("cmd+alt+o")).unwrap();

    let slot: Arc<Mutex<Option<ListenerHandle>>> = Arc::new(Mutex::new(None));
    let inner_slot = slot.clone();
    let handle = f.manager.register(&name, Scope::Local, move || {
        // Take out of the slot first; dropping runs the detach.
        let handle = inner_slot.lock().take();
        drop(handle);
    });
    *slot.lock() = Some(handle);

    assert_eq!(f.manager.post(&shortcut("cmd+alt+o"), true), 1);
    assert_eq!(f.manager.post(&shortcut("cmd+alt+o"), true), 0);
}

#[test]
fn superseded_session_callback_may_own_a_handle() {
    let f = fixture();
    let name = Name::new("toggle");
    f.manager.set_shortcut(&name, shortcut("cmd+shift+k")).unwrap();
    let (fired, handler) = counter();
    let listener = f.manager.register(&name, Scope::Local, handler);
    let _first = f
        .manager
        .start_recording(&Name::new("first"), Scope::Local, move |_| {
            let _owned = &listener;
        });

    let manager = f.manager.clone();
    let second = within_deadline(move || {
        manager.start_recording(&Name::new("second"), Scope::Local, |_| {})
    });
    assert!(second.is_active());
    assert!(second.cancel());

    // The handle went away with the first session's callback.
    assert_eq!(f.manager.post(&shortcut("cmd+shift+k"), true), 0);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn removed_callbacks_are_dropped_outside_the_lock() {
    let f = fixture();
    let name = Name::new("toggle");
    let listener_count = |f: &Fixture| f.manager.inner.lock().dispatch.listener_count(&name);

    // Cancelled session owning a handle.
    let owned = f.manager.register(&name, Scope::Local, || {});
    let _session = f.manager.start_recording(&name, Scope::Local, move |_| {
        let _owned = &owned;
    });
    let manager = f.manager.clone();
    assert!(within_deadline(move || manager.cancel_recording()));
    assert_eq!(listener_count(&f), 0);

    // Released listener whose handler owns another handle.
    let inner = f.manager.register(&name, Scope::Local, || {});
    let outer = f.manager.register(&name, Scope::Local, move || {
        let _owned = &inner;
    });
    assert_eq!(listener_count(&f), 2);
    within_deadline(move || drop(outer));
    assert_eq!(listener_count(&f), 0);

    // Full reset with the same shape.
    let inner = f.manager.register(&name, Scope::Local, || {});
    let _outer = f.manager.register(&name, Scope::Local, move || {
        let _owned = &inner;
    });
    let manager = f.manager.clone();
    within_deadline(move || manager.reset_for_testing());
    assert_eq!(listener_count(&f), 0);
}

#[test]
fn key_events_dispatch_by_phase_and_ignore_repeats() {
    let f = fixture();
    let name = Name::new("push-to-talk");
    f.manager.set_shortcut(&name, shortcut("cmd+alt+t")).unwrap();
    let (downs, on_down) = counter();
    let (ups, on_up) = counter();
    let _d = f.manager.register(&name, Scope::Global, on_down);
    let _u = f
        .manager
        .register_for_phase(&name, Scope::Global, KeyPhase::Up, on_up);

    let down = press("cmd+alt+t");
    assert_eq!(f.manager.handle_key_event(down, false), KeyEventOutcome::Dispatched(1));
    assert_eq!(f.manager.handle_key_event(down.repeat(), false), KeyEventOutcome::Ignored);
    let up = KeyEvent::up(down.key_code, down.modifiers);
    assert_eq!(f.manager.handle_key_event(up, false), KeyEventOutcome::Dispatched(1));

    assert_eq!(downs.load(Ordering::SeqCst), 1);
    assert_eq!(ups.load(Ordering::SeqCst), 1);
}

#[test]
fn dispatch_is_paused_while_recording() {
    let f = fixture();
    let name = Name::new("toggle");
    f.manager.set_shortcut(&name, shortcut("cmd+shift+k")).unwrap();
    let (fired, handler) = counter();
    let _handle = f.manager.register(&name, Scope::Global, handler);

    let session = f
        .manager
        .start_recording(&Name::new("other"), Scope::Local, |_| {});
    assert_eq!(f.manager.post(&shortcut("cmd+shift+k"), true), 0);
    drop(session);
    assert_eq!(f.manager.post(&shortcut("cmd+shift+k"), true), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn same_shortcut_on_two_names_fires_both() {
    let f = fixture();
    let (a_fired, a_handler) = counter();
    let (b_fired, b_handler) = counter();
    f.manager.set_shortcut(&Name::new("a"), shortcut("cmd+alt+x")).unwrap();
    f.manager.set_shortcut(&Name::new("b"), shortcut("cmd+alt+x")).unwrap();
    let _a = f.manager.register(&Name::new("a"), Scope::Local, a_handler);
    let _b = f.manager.register(&Name::new("b"), Scope::Local, b_handler);

    assert_eq!(f.manager.post(&shortcut("cmd+alt+x"), true), 2);
    assert_eq!(a_fired.load(Ordering::SeqCst), 1);
    assert_eq!(b_fired.load(Ordering::SeqCst), 1);
}

#[test]
fn rebinding_moves_dispatch_to_new_shortcut() {
    let f = fixture();
    let name = Name::new("toggle");
    f.manager.set_shortcut(&name, shortcut("cmd+shift+k")).unwrap();
    let (fired, handler) = counter();
    let _handle = f.manager.register(&name, Scope::Local, handler);

    let _session = f.manager.start_recording(&name, Scope::Local, |_| {});
    f.manager.handle_key_event(press("cmd+alt+j"), true);

    assert_eq!(f.manager.post(&shortcut("cmd+shift+k"), true), 0);
    assert_eq!(f.manager.post(&shortcut("cmd+alt+j"), true), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

// =============================================================================
// OS hook lifecycle
// =============================================================================

#[test]
fn hook_installed_only_for_bound_global_listeners() {
    let f = fixture();
    let name = Name::new("toggle");

    let local = f.manager.register(&name, Scope::Local, || {});
    assert!(!f.manager.hook_installed());

    // Global listener on an unbound Name needs nothing from the OS.
    let global = f.manager.register(&name, Scope::Global, || {});
    assert!(!f.manager.hook_installed());

    f.manager.set_shortcut(&name, shortcut("cmd+shift+k")).unwrap();
    assert!(f.manager.hook_installed());
    assert_eq!(f.hook.0.lock().bindings, vec![shortcut("cmd+shift+k")]);

    f.manager.set_enabled(name.clone(), false);
    assert!(!f.manager.hook_installed());
    f.manager.set_enabled(name.clone(), true);
    assert!(f.manager.hook_installed());

    global.release();
    assert!(!f.manager.hook_installed());
    drop(local);
}

#[test]
fn global_recording_installs_hook_and_withdraws_bindings() {
    let f = fixture();
    let bound = Name::new("bound");
    f.manager.set_shortcut(&bound, shortcut("cmd+shift+k")).unwrap();
    let _listener = f.manager.register(&bound, Scope::Global, || {});
    assert_eq!(f.hook.0.lock().bindings, vec![shortcut("cmd+shift+k")]);

    let session = f
        .manager
        .start_recording(&Name::new("new"), Scope::Global, |_| {});
    assert!(f.manager.hook_installed());
    assert!(f.hook.0.lock().bindings.is_empty());

    // The recorder can capture a combination that is currently free.
    let outcome = f.manager.handle_key_event(press("cmd+alt+n"), false);
    assert!(matches!(
        outcome,
        KeyEventOutcome::Recorder(RecorderOutcome::Committed(_))
    ));
    assert!(!session.is_active());
    assert_eq!(f.hook.0.lock().bindings, vec![shortcut("cmd+shift+k")]);
}

#[test]
fn local_recording_ignores_background_events() {
    let f = fixture();
    let _session = f
        .manager
        .start_recording(&Name::new("toggle"), Scope::Local, |_| {});
    assert_eq!(
        f.manager.handle_key_event(press("cmd+alt+n"), false),
        KeyEventOutcome::Ignored
    );
    assert!(f.manager.recording_snapshot().is_some());
}

#[test]
fn hook_failure_is_not_fatal() {
    let manager = ShortcutManager::builder().hook(FailingHook).build();
    let name = Name::new("toggle");
    manager.set_shortcut(&name, shortcut("cmd+shift+k")).unwrap();
    let (fired, handler) = counter();
    let _handle = manager.register(&name, Scope::Global, handler);

    assert!(!manager.hook_installed());
    // Local delivery still works.
    assert_eq!(manager.post(&shortcut("cmd+shift+k"), true), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn reset_for_testing_clears_everything_but_the_store() {
    let f = fixture();
    let name = Name::new("toggle");
    f.manager.set_shortcut(&name, shortcut("cmd+shift+k")).unwrap();
    let _listener = f.manager.register(&name, Scope::Global, || {});
    let _session = f.manager.start_recording(&name, Scope::Local, |_| {});

    f.manager.reset_for_testing();
    assert!(f.manager.names().is_empty());
    assert!(f.manager.recording_snapshot().is_none());
    assert!(!f.manager.hook_installed());
    assert_eq!(f.hook.0.lock().installs, 1);
    // Lazily reloaded from the store.
    assert_eq!(f.manager.current_shortcut(&name), Some(shortcut("cmd+shift+k")));
}
