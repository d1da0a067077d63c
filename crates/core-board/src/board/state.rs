//! The data actually protected by the board's monitor: the grid, every actor's
//! claims, the reverse ownership index, and the two suspension registries.
//!
//! Nothing in this module is `pub` outside the crate — `Board` in `mod.rs` is
//! the only caller, and it only ever touches a `BoardState` while holding the
//! `tokio::sync::Mutex` that wraps it.

use std::collections::HashMap;

use core_actor::ActorSlot;
use core_cell::{Cell, Coordinate};
use core_sync::{ChangeBus, WaiterRegistry};

#[derive(Debug)]
pub(crate) struct BoardState {
    pub(crate) rows: usize,
    pub(crate) cols: usize,
    grid: Vec<Cell>,
    actors: HashMap<String, ActorSlot>,
    /// Reverse index: which actor currently controls a given coordinate. Kept in
    /// lockstep with each `ActorSlot::controlled` by `claim`/`release`/`release_all`
    /// below — those are the only mutators either structure should go through.
    owner: HashMap<Coordinate, String>,
    pub(crate) waiters: WaiterRegistry,
    pub(crate) changes: ChangeBus,
}

impl BoardState {
    pub(crate) fn new(rows: usize, cols: usize, cells: Vec<Option<String>>) -> Self {
        debug_assert_eq!(cells.len(), rows * cols);
        let grid = cells
            .into_iter()
            .map(|content| match content {
                Some(c) => Cell::new(c),
                None => {
                    let mut cell = Cell::default();
                    cell.remove();
                    cell
                }
            })
            .collect();
        Self {
            rows,
            cols,
            grid,
            actors: HashMap::new(),
            owner: HashMap::new(),
            waiters: WaiterRegistry::new(),
            changes: ChangeBus::new(),
        }
    }

    pub(crate) fn in_bounds(&self, coord: Coordinate) -> bool {
        coord.in_bounds(self.rows, self.cols)
    }

    pub(crate) fn cell(&self, coord: Coordinate) -> &Cell {
        &self.grid[coord.index(self.cols)]
    }

    pub(crate) fn cell_mut(&mut self, coord: Coordinate) -> &mut Cell {
        &mut self.grid[coord.index(self.cols)]
    }

    pub(crate) fn all_coordinates(&self) -> impl Iterator<Item = Coordinate> + '_ {
        let cols = self.cols;
        (0..self.grid.len()).map(move |i| Coordinate::new(i / cols, i % cols))
    }

    pub(crate) fn actor_mut(&mut self, actor_id: &str) -> &mut ActorSlot {
        self.actors.entry(actor_id.to_string()).or_default()
    }

    pub(crate) fn actor(&self, actor_id: &str) -> Option<&ActorSlot> {
        self.actors.get(actor_id)
    }

    /// Who, if anyone, currently controls `coord`.
    pub(crate) fn owner_of(&self, coord: Coordinate) -> Option<&str> {
        self.owner.get(&coord).map(String::as_str)
    }

    pub(crate) fn is_controlled(&self, coord: Coordinate) -> bool {
        self.owner.contains_key(&coord)
    }

    /// Grants `actor_id` exclusive control of `coord`. Keeps the reverse index and
    /// the actor's own `controlled` list in sync; panics (an invariant
    /// violation) if `coord` is already controlled by anyone.
    pub(crate) fn claim(&mut self, actor_id: &str, coord: Coordinate) {
        if let Some(existing) = self.owner.insert(coord, actor_id.to_string()) {
            super::invariant_violation(format!(
                "{coord} claimed by {actor_id} while already controlled by {existing}"
            ));
        }
        self.actor_mut(actor_id).claim(coord);
    }

    /// Releases a single coordinate from `actor_id`'s control.
    pub(crate) fn release(&mut self, actor_id: &str, coord: Coordinate) {
        self.owner.remove(&coord);
        self.actor_mut(actor_id).release(coord);
    }

    /// Releases every coordinate `actor_id` controls.
    pub(crate) fn release_all(&mut self, actor_id: &str) {
        for coord in self.actor_mut(actor_id).release_all() {
            self.owner.remove(&coord);
        }
    }
}
