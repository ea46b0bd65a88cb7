use super::*;

use wire::{Sample, Stroke};

const DEBOUNCE: Duration = Duration::from_millis(2500);

fn autosave() -> Autosave {
    Autosave::new(DEBOUNCE)
}

fn pending_with_stroke() -> (ChangeSet, Stroke) {
    let stroke = Stroke::new("#d94b4b", vec![Sample::new(1.0, 1.0, 0.5)], 4.0);
    let mut pending = ChangeSet::new();
    pending.stage_stroke(stroke.clone());
    (pending, stroke)
}

#[test]
fn starts_saved_with_no_deadline() {
    let mut autosave = autosave();
    assert!(autosave.is_saved());
    assert!(autosave.poll(Instant::now(), &ChangeSet::new()).is_none());
}

#[test]
fn poll_before_the_window_elapses_returns_nothing() {
    let t0 = Instant::now();
    let (pending, _) = pending_with_stroke();
    let mut autosave = autosave();

    autosave.note_local_change(t0);
    assert!(!autosave.is_saved());
    assert!(autosave.poll(t0 + DEBOUNCE / 2, &pending).is_none());
}

#[test]
fn poll_after_the_window_snapshots_pending_and_marks_in_flight() {
    let t0 = Instant::now();
    let (pending, stroke) = pending_with_stroke();
    let mut autosave = autosave();

    autosave.note_local_change(t0);
    let submitted = autosave.poll(t0 + DEBOUNCE, &pending).unwrap();
    assert!(submitted.strokes_to_save.contains_key(&stroke.id));
    assert!(autosave.is_in_flight());

    // No second submission while the first is outstanding.
    assert!(autosave.poll(t0 + DEBOUNCE * 2, &pending).is_none());
}

#[test]
fn a_later_edit_restarts_the_window() {
    let t0 = Instant::now();
    let (pending, _) = pending_with_stroke();
    let mut autosave = autosave();

    autosave.note_local_change(t0);
    autosave.note_local_change(t0 + Duration::from_millis(2000));

    // The original deadline has passed, but the window was pushed out.
    assert!(autosave.poll(t0 + Duration::from_millis(2600), &pending).is_none());
    assert!(autosave.poll(t0 + Duration::from_millis(4500), &pending).is_some());
}

#[test]
fn edits_during_a_round_trip_do_not_rearm_until_resolution() {
    let t0 = Instant::now();
    let (mut pending, _) = pending_with_stroke();
    let mut autosave = autosave();

    autosave.note_local_change(t0);
    let submitted = autosave.poll(t0 + DEBOUNCE, &pending).unwrap();

    // New edit while in flight: noted, but no new deadline yet.
    let (extra_pending, extra) = pending_with_stroke();
    pending.merge(extra_pending);
    autosave.note_local_change(t0 + DEBOUNCE + Duration::from_millis(100));
    assert!(autosave.poll(t0 + DEBOUNCE * 3, &pending).is_none());

    // Resolution clears the submitted entry and re-arms for the rest.
    let resolved_at = t0 + DEBOUNCE + Duration::from_millis(200);
    autosave.on_applied(resolved_at, &submitted, &mut pending);
    assert!(!autosave.is_saved());
    let second = autosave.poll(resolved_at + DEBOUNCE, &pending).unwrap();
    assert!(second.strokes_to_save.contains_key(&extra.id));
    assert_eq!(second.len(), 1);
}

#[test]
fn ack_with_nothing_left_marks_saved() {
    let t0 = Instant::now();
    let (mut pending, _) = pending_with_stroke();
    let mut autosave = autosave();

    autosave.note_local_change(t0);
    let submitted = autosave.poll(t0 + DEBOUNCE, &pending).unwrap();
    autosave.on_applied(t0 + DEBOUNCE, &submitted, &mut pending);

    assert!(pending.is_empty());
    assert!(autosave.is_saved());
    assert!(!autosave.is_in_flight());
}

#[test]
fn failure_keeps_pending_and_retries_after_a_fresh_window() {
    let t0 = Instant::now();
    let (pending, _) = pending_with_stroke();
    let mut autosave = autosave();

    autosave.note_local_change(t0);
    assert!(autosave.poll(t0 + DEBOUNCE, &pending).is_some());

    let failed_at = t0 + DEBOUNCE + Duration::from_millis(50);
    autosave.on_failure(failed_at);
    assert!(!autosave.is_in_flight());
    assert!(!autosave.is_saved());

    assert!(autosave.poll(failed_at + DEBOUNCE / 2, &pending).is_none());
    assert!(autosave.poll(failed_at + DEBOUNCE, &pending).is_some());
}

#[test]
fn elapsed_window_over_an_empty_pending_set_just_marks_saved() {
    let t0 = Instant::now();
    let mut autosave = autosave();

    autosave.note_local_change(t0);
    // The edit was undone locally before the window elapsed.
    assert!(autosave.poll(t0 + DEBOUNCE, &ChangeSet::new()).is_none());
    assert!(autosave.is_saved());
}
