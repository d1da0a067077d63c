//! The Board Core: the public, lock-holding API wrapped around [`state::BoardState`].
//!
//! Every mutating operation acquires `inner` (a `tokio::sync::Mutex`, the
//! board's single monitor), does its work, and either returns or — for Rule
//! 1-D — releases the lock and awaits a waiter completion before looping back
//! to re-evaluate from scratch. This is the only retry loop in the crate.

mod rules;
mod state;

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use core_cell::Coordinate;
use tokio::sync::Mutex;

use crate::error::{BoardError, BoardFileError};
use rules::PhaseOutcome;
use state::BoardState;

/// A rendered per-actor snapshot: the wire-format text described in the crate
/// docs (`"{R}x{C}"` header, then one `none` / `down` / `up {c}` / `my {c}`
/// line per cell, row-major, joined by `\n`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorView(String);

impl ActorView {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ActorView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn render_view(state: &BoardState, actor_id: &str) -> ActorView {
    let mut lines = Vec::with_capacity(state.rows * state.cols + 1);
    lines.push(format!("{}x{}", state.rows, state.cols));
    for coord in state.all_coordinates() {
        let cell = state.cell(coord);
        let line = if cell.is_removed() {
            "none".to_string()
        } else if !cell.face_up() {
            "down".to_string()
        } else {
            let content = cell.content().unwrap_or_default();
            if state.owner_of(coord) == Some(actor_id) {
                format!("my {content}")
            } else {
                format!("up {content}")
            }
        };
        lines.push(line);
    }
    ActorView(lines.join("\n"))
}

/// Panics after logging — reserved for states the rule table guarantees can
/// never occur. These are bugs, not caller-facing errors; see the crate docs'
/// error handling section.
pub(crate) fn invariant_violation(msg: impl Into<String>) -> ! {
    let msg = msg.into();
    tracing::error!(%msg, "board invariant violation");
    panic!("board invariant violation: {msg}");
}

/// A concurrent Memory Scramble board. Cheaply `Clone`-able; every clone shares
/// the same underlying monitor and grid.
#[derive(Clone)]
pub struct Board {
    // Dimensions are fixed at construction (invariant 1 in the crate docs), so
    // they live outside the monitor entirely rather than behind the `Mutex`.
    rows: usize,
    cols: usize,
    inner: Arc<Mutex<BoardState>>,
}

impl Board {
    /// Builds a board directly from dimensions and row-major content. `None`
    /// entries start out already removed — mostly useful for tests.
    pub fn new(rows: usize, cols: usize, cells: Vec<Option<String>>) -> Self {
        assert!(rows >= 1 && cols >= 1, "board dimensions must be >= 1");
        assert_eq!(
            cells.len(),
            rows * cols,
            "expected {} cells, got {}",
            rows * cols,
            cells.len()
        );
        Self {
            rows,
            cols,
            inner: Arc::new(Mutex::new(BoardState::new(rows, cols, cells))),
        }
    }

    /// Parses board-file text per the data contract and builds a board from it.
    pub fn from_str(text: &str) -> Result<Self, BoardFileError> {
        let (rows, cols, cells) = crate::boardfile::parse_str(text)?;
        Ok(Self::new(rows, cols, cells))
    }

    /// Reads and parses a board file from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BoardFileError> {
        let (rows, cols, cells) = crate::boardfile::parse_file(path)?;
        Ok(Self::new(rows, cols, cells))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Performs one flip for `actor_id` at `coord`, then returns that actor's
    /// view. Fatal (`Err`) only for an out-of-bounds coordinate; every in-bounds
    /// game-rule outcome, including the "soft failures" of Rules 1-A/2-A/2-B, is
    /// `Ok`.
    #[tracing::instrument(skip(self), fields(row = coord.row, col = coord.col, actor_id))]
    pub async fn flip(&self, coord: Coordinate, actor_id: &str) -> Result<ActorView, BoardError> {
        let mut resumed = false;
        loop {
            let mut guard = self.inner.lock().await;

            if !guard.in_bounds(coord) {
                return Err(BoardError::OutOfBounds {
                    coord,
                    rows: guard.rows,
                    cols: guard.cols,
                });
            }

            if !resumed {
                rules::cleanup(&mut guard, actor_id);
            }
            resumed = false;

            let controlled = guard.actor_mut(actor_id).count();
            match controlled {
                0 => match rules::phase_a(&mut guard, coord, actor_id) {
                    PhaseOutcome::Done => return Ok(render_view(&guard, actor_id)),
                    PhaseOutcome::Suspend(rx) => {
                        drop(guard);
                        // The sender side lives in `WaiterRegistry`; it is only
                        // ever dropped by `wake_all`, so a recv error here would
                        // itself be an invariant violation.
                        if rx.await.is_err() {
                            invariant_violation(
                                "waiter completion sender dropped without waking",
                            );
                        }
                        resumed = true;
                    }
                },
                1 => {
                    rules::phase_b(&mut guard, coord, actor_id);
                    return Ok(render_view(&guard, actor_id));
                }
                _ => invariant_violation(format!(
                    "actor {actor_id} reached the flip dispatcher already controlling 2 cells"
                )),
            }
        }
    }

    /// Returns `actor_id`'s current view without mutating anything. Allocates
    /// the actor's slot lazily if this is the first time it's been mentioned.
    pub async fn view(&self, actor_id: &str) -> ActorView {
        let mut guard = self.inner.lock().await;
        guard.actor_mut(actor_id); // lazy allocation, per §4.7
        render_view(&guard, actor_id)
    }

    /// Suspends until the next publish-inducing mutation, then returns
    /// `actor_id`'s view.
    pub async fn wait_for_change(&self, actor_id: &str) -> ActorView {
        let rx = {
            let mut guard = self.inner.lock().await;
            guard.changes.subscribe()
        };
        let _ = rx.await;
        self.view(actor_id).await
    }

    /// Applies a content mapping across every distinct content value present on
    /// the board, preserving pairwise match consistency. `actor_id` is purely
    /// informational (e.g. for logging) and never gates the operation.
    ///
    /// `f` is invoked once per distinct content value with the monitor
    /// released, so other flips may proceed concurrently while it runs. If any
    /// call fails, the board is left completely unchanged and the error
    /// propagates to the caller.
    #[tracing::instrument(skip(self, f), fields(actor_id))]
    pub async fn transform<F, Fut, E>(&self, actor_id: &str, f: F) -> Result<ActorView, E>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let distinct: Vec<String> = {
            let guard = self.inner.lock().await;
            let mut seen = std::collections::HashSet::new();
            for coord in guard.all_coordinates() {
                if let Some(content) = guard.cell(coord).content() {
                    seen.insert(content.to_string());
                }
            }
            seen.into_iter().collect()
        };

        let mut mapping = std::collections::HashMap::with_capacity(distinct.len());
        for x in distinct {
            let y = f(x.clone()).await?;
            mapping.insert(x, y);
        }

        {
            let mut guard = self.inner.lock().await;
            let mut changed = false;
            let coords: Vec<_> = guard.all_coordinates().collect();
            for coord in coords {
                if let Some(current) = guard.cell(coord).content() {
                    if let Some(replacement) = mapping.get(current) {
                        let replacement = replacement.clone();
                        guard.cell_mut(coord).set_content(replacement);
                        changed = true;
                    }
                }
            }
            if changed {
                guard.changes.publish();
            }
        }

        Ok(self.view(actor_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perfect_board() -> Board {
        Board::new(
            3,
            3,
            vec![
                Some("X".into()),
                Some("X".into()),
                Some("Y".into()),
                Some("Y".into()),
                Some("Z".into()),
                Some("Z".into()),
                Some("W".into()),
                Some("W".into()),
                Some("Q".into()),
            ],
        )
    }

    fn line(view: &ActorView, n: usize) -> String {
        view.as_str().lines().nth(n).unwrap().to_string()
    }

    #[tokio::test]
    async fn match_and_remove() {
        let board = perfect_board();
        board.flip(Coordinate::new(0, 0), "a").await.unwrap();
        board.flip(Coordinate::new(0, 1), "a").await.unwrap();
        let v = board.flip(Coordinate::new(2, 2), "a").await.unwrap();
        assert_eq!(line(&v, 1), "none");
        assert_eq!(line(&v, 2), "none");
        assert_eq!(line(&v, 9), "my Q");
    }

    #[tokio::test]
    async fn mismatch_flip_down() {
        let board = perfect_board();
        board.flip(Coordinate::new(0, 0), "a").await.unwrap();
        board.flip(Coordinate::new(1, 1), "a").await.unwrap();
        let v = board.flip(Coordinate::new(2, 2), "a").await.unwrap();
        assert_eq!(line(&v, 1), "down");
        assert_eq!(line(&v, 5), "down");
        assert_eq!(line(&v, 9), "my Q");
    }

    #[tokio::test]
    async fn third_party_takeover() {
        let board = perfect_board();
        board.flip(Coordinate::new(0, 0), "a").await.unwrap();
        board.flip(Coordinate::new(1, 1), "a").await.unwrap(); // mismatch, both uncontrolled
        let vb = board.flip(Coordinate::new(0, 0), "b").await.unwrap();
        assert_eq!(line(&vb, 1), "my X");
        let va = board.view("a").await;
        assert_eq!(line(&va, 1), "up X");
    }

    #[tokio::test]
    async fn waiter_resolution() {
        let board = perfect_board();
        board.flip(Coordinate::new(0, 0), "a").await.unwrap();

        let board2 = board.clone();
        let b_task = tokio::spawn(async move { board2.flip(Coordinate::new(0, 0), "b").await });

        // Give b a chance to enqueue before a relinquishes.
        tokio::task::yield_now().await;
        board.flip(Coordinate::new(1, 1), "a").await.unwrap();

        let vb = b_task.await.unwrap().unwrap();
        assert_eq!(line(&vb, 1), "my X");
    }

    #[tokio::test]
    async fn anti_deadlock() {
        let board = perfect_board();
        board.flip(Coordinate::new(0, 0), "a").await.unwrap();
        board.flip(Coordinate::new(1, 0), "b").await.unwrap();
        let va = board.flip(Coordinate::new(1, 0), "a").await.unwrap();
        assert_eq!(line(&va, 1), "up X");
        let vb = board.view("b").await;
        assert_eq!(line(&vb, 4), "my Y");
    }

    #[tokio::test]
    async fn transform_preserves_matches() {
        let board = perfect_board();
        board
            .transform("a", |x| async move { Ok::<_, std::convert::Infallible>(format!("{x}!")) })
            .await
            .unwrap();
        board.flip(Coordinate::new(0, 0), "a").await.unwrap();
        let matched = board.flip(Coordinate::new(0, 1), "a").await.unwrap();
        // Rule 2-D: a matched pair stays jointly "mine" until a's next flip.
        assert_eq!(line(&matched, 1), "my X!");
        assert_eq!(line(&matched, 2), "my X!");
        let cleaned = board.flip(Coordinate::new(2, 2), "a").await.unwrap();
        assert_eq!(line(&cleaned, 1), "none");
        assert_eq!(line(&cleaned, 2), "none");
    }

    #[tokio::test]
    async fn transform_failure_leaves_board_untouched() {
        let board = perfect_board();
        let before = board.view("a").await;
        let result = board
            .transform("a", |_x| async move { Err::<String, _>("boom") })
            .await;
        assert!(result.is_err());
        let after = board.view("a").await;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn out_of_bounds_is_an_error_not_a_panic() {
        let board = perfect_board();
        let err = board.flip(Coordinate::new(9, 9), "a").await.unwrap_err();
        assert!(matches!(err, BoardError::OutOfBounds { .. }));
    }

    #[tokio::test]
    async fn unknown_actor_view_has_nothing_controlled() {
        let board = perfect_board();
        let v = board.view("nobody").await;
        assert_eq!(line(&v, 1), "down");
    }

    #[test]
    fn waiter_and_publish_events_are_traced() {
        use std::sync::{Arc, Mutex};
        use tracing::dispatcher::{with_default, Dispatch};
        use tracing_subscriber::filter::LevelFilter;
        use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
        use tracing_subscriber::Registry;

        #[derive(Clone, Default)]
        struct TargetCapture {
            targets: Arc<Mutex<Vec<String>>>,
        }

        impl<S: tracing::Subscriber> Layer<S> for TargetCapture {
            fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
                self.targets
                    .lock()
                    .unwrap()
                    .push(event.metadata().target().to_string());
            }
        }

        let capture = TargetCapture::default();
        let targets = capture.targets.clone();
        let subscriber = Registry::default().with(capture.with_filter(LevelFilter::TRACE));
        let dispatch = Dispatch::new(subscriber);

        with_default(&dispatch, || {
            // A throwaway current-thread runtime keeps every poll — including
            // the spawned waiter below — on this thread, so the thread-local
            // dispatcher installed by `with_default` stays in scope for the
            // whole scenario.
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            rt.block_on(async {
                let board = perfect_board();
                board.flip(Coordinate::new(0, 0), "a").await.unwrap(); // Rule 1-B: publish

                let board2 = board.clone();
                let b_task =
                    tokio::spawn(async move { board2.flip(Coordinate::new(0, 0), "b").await });
                tokio::task::yield_now().await; // let b enqueue (Rule 1-D) before a relinquishes

                board.flip(Coordinate::new(1, 1), "a").await.unwrap(); // mismatch: wakes b's waiter
                b_task.await.unwrap().unwrap();
            });
        });

        let recorded = targets.lock().unwrap();
        assert!(recorded.iter().any(|t| t.contains("waiter")));
        assert!(recorded.iter().any(|t| t.contains("changebus")));
    }

    #[tokio::test]
    async fn wait_for_change_does_not_wake_on_rule_1c_takeover() {
        let board = perfect_board();
        board.flip(Coordinate::new(0, 0), "a").await.unwrap();
        board.flip(Coordinate::new(1, 1), "a").await.unwrap(); // mismatch -> uncontrolled face-up

        let board2 = board.clone();
        let waiter = tokio::spawn(async move { board2.wait_for_change("observer").await });
        tokio::task::yield_now().await;

        // Rule 1-C: face-up, uncontrolled takeover publishes nothing.
        board.flip(Coordinate::new(0, 0), "b").await.unwrap();
        assert!(!waiter.is_finished());

        // A real mutation (b's second card flipping face up, Rule 2-C) does publish.
        board.flip(Coordinate::new(1, 0), "b").await.unwrap();
        let v = tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("wait_for_change should have resolved")
            .unwrap();
        let _ = v; // just needed it to resolve at all
    }
}
