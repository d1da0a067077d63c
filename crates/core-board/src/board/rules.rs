//! The flip rule table: the cleanup prologue and phases A/B of §4.5. Every
//! function here runs with the board's monitor held; none of them may suspend —
//! the only suspension point is the `Rule 1-D` wait, which is represented by
//! returning a receiver rather than awaiting inside this module.

use core_cell::Coordinate;
use tokio::sync::oneshot;

use super::{invariant_violation, state::BoardState};

/// What `phase_a` decided. `Suspend` hands back the receiver half of a freshly
/// enqueued waiter completion; the caller awaits it *after* releasing the
/// monitor.
pub(crate) enum PhaseOutcome {
    Done,
    Suspend(oneshot::Receiver<()>),
}

/// Prologue: runs the deferred cleanup from the actor's previous two-card play,
/// if any is owed. No-op if `actor_id` has no pending cleanup.
pub(crate) fn cleanup(state: &mut BoardState, actor_id: &str) {
    let Some((p1, p2)) = state.actor_mut(actor_id).take_cleanup() else {
        return;
    };

    if state.cell(p1).matches(state.cell(p2)) {
        // Rule 3-A: matched removal.
        state.cell_mut(p1).remove();
        state.cell_mut(p2).remove();
        state.waiters.wake_all(p1);
        state.waiters.wake_all(p2);
        state.changes.publish();
        tracing::trace!(target: "board.dispatch", actor_id, %p1, %p2, rule = "3-A", "cleanup: matched removal");
    } else {
        // Rule 3-B: flip down anything still face-up and uncontrolled.
        let mut changed = false;
        for p in [p1, p2] {
            let present_face_up = state.cell(p).is_present() && state.cell(p).face_up();
            if present_face_up && !state.is_controlled(p) {
                state.cell_mut(p).set_face_up(false);
                changed = true;
            }
        }
        if changed {
            state.changes.publish();
        }
        tracing::trace!(target: "board.dispatch", actor_id, %p1, %p2, rule = "3-B", changed, "cleanup: mismatch flip-down");
    }

    // Either branch: the pair is no longer held, even if it had lingered in
    // `controlled` since Rule 2-D.
    state.release_all(actor_id);
    state.waiters.wake_all(p1);
    state.waiters.wake_all(p2);
}

/// Phase A: first card of a turn. Dispatched when the actor currently controls
/// nothing.
pub(crate) fn phase_a(state: &mut BoardState, coord: Coordinate, actor_id: &str) -> PhaseOutcome {
    if state.cell(coord).is_removed() {
        tracing::trace!(target: "board.dispatch", actor_id, %coord, rule = "1-A", "no card");
        return PhaseOutcome::Done; // Rule 1-A
    }

    if !state.cell(coord).face_up() {
        // Rule 1-B
        state.cell_mut(coord).set_face_up(true);
        state.claim(actor_id, coord);
        state.changes.publish();
        tracing::trace!(target: "board.dispatch", actor_id, %coord, rule = "1-B", "face down -> claimed");
        return PhaseOutcome::Done;
    }

    match state.owner_of(coord) {
        None => {
            // Rule 1-C: face-up, nobody controls it. No visible face change.
            state.claim(actor_id, coord);
            tracing::trace!(target: "board.dispatch", actor_id, %coord, rule = "1-C", "face up, uncontrolled -> claimed");
            PhaseOutcome::Done
        }
        Some(owner) if owner == actor_id => invariant_violation(format!(
            "phase A reached for {coord} already controlled by the calling actor"
        )),
        Some(_other) => {
            // Rule 1-D: contended. Suspend; the caller re-enters phase A on wake.
            tracing::trace!(target: "board.dispatch", actor_id, %coord, rule = "1-D", "contended -> suspend");
            PhaseOutcome::Suspend(state.waiters.enqueue(coord))
        }
    }
}

/// Phase B: second card of a turn. Dispatched when the actor currently controls
/// exactly one cell. Never suspends.
pub(crate) fn phase_b(state: &mut BoardState, coord: Coordinate, actor_id: &str) {
    let first = state
        .actor(actor_id)
        .and_then(|slot| slot.first_controlled())
        .unwrap_or_else(|| invariant_violation("phase B reached with no first controlled cell"));

    if coord == first || state.is_controlled(coord) {
        // Rule 2-B: self-reselection or contention. Relinquish, no wait.
        state.release(actor_id, first);
        state.waiters.wake_all(first);
        tracing::trace!(target: "board.dispatch", actor_id, %first, %coord, rule = "2-B", "contended or reselected -> relinquish");
        return;
    }

    if state.cell(coord).is_removed() {
        // Rule 2-A
        state.release(actor_id, first);
        state.waiters.wake_all(first);
        tracing::trace!(target: "board.dispatch", actor_id, %first, %coord, rule = "2-A", "no card -> relinquish");
        return;
    }

    if !state.cell(coord).face_up() {
        // Rule 2-C
        state.cell_mut(coord).set_face_up(true);
        state.changes.publish();
        tracing::trace!(target: "board.dispatch", actor_id, %first, %coord, rule = "2-C", "face down -> flipped up");
    }

    // Rule 2-D vs 2-E: always discriminated, whether or not 2-C just ran.
    if state.cell(first).matches(state.cell(coord)) {
        // Rule 2-D: matched pair stays jointly "mine" until the next cleanup.
        state.claim(actor_id, coord);
        state.actor_mut(actor_id).set_cleanup((first, coord));
        tracing::trace!(target: "board.dispatch", actor_id, %first, %coord, rule = "2-D", "match -> held pending cleanup");
    } else {
        // Rule 2-E: mismatch. Both cards become face-up and uncontrolled.
        state.actor_mut(actor_id).set_cleanup((first, coord));
        state.release(actor_id, first);
        state.waiters.wake_all(first);
        state.waiters.wake_all(coord);
        tracing::trace!(target: "board.dispatch", actor_id, %first, %coord, rule = "2-E", "mismatch -> released pending cleanup");
    }
}
