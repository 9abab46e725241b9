use rand::Rng;
use tracing::{debug, warn};

use turnsweeper_common::{
    models::{CellView, GameParams, Pos},
    protocol::CellUpdate,
};

/// Per-sweep acceptance odds of the mine placement loop. Placement repeats
/// row-major sweeps, minting a mine on each unmined candidate with
/// probability 1/13, until the quota is met. This is deliberately not a
/// uniform subset draw; it reproduces the clustering behavior of the
/// original placement loop.
const PLACEMENT_ODDS: u32 = 13;

#[derive(Debug, Default)]
pub struct Cell {
    pub has_mine: bool,
    pub revealed: bool,
    pub flagged: bool,
}

impl Cell {
    /// Client-facing view. A revealed cell shows its contents; an unrevealed
    /// cell shows at most its flag, never its mine.
    fn view(&self, adjacent: u8) -> CellView {
        if self.revealed {
            if self.has_mine {
                CellView::Mine
            } else {
                CellView::Revealed { adjacent }
            }
        } else if self.flagged {
            CellView::Flagged
        } else {
            CellView::Hidden
        }
    }
}

/// Result of a single reveal command.
#[derive(Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Already revealed, flagged, or out of bounds; nothing changed.
    Unchanged,
    /// The target cell is mined. The caller ends the game and decides what
    /// to uncover for display.
    MineHit,
    /// A safe cell (and possibly a cascaded region) was revealed.
    Revealed { adjacent: u8, won: bool },
}

/// The authoritative grid. Mines are placed lazily by the first reveal so
/// that the first-clicked cell can be excluded.
#[derive(Debug)]
pub struct MineField {
    width: usize,
    height: usize,
    mine_count: usize,
    mines_placed: bool,
    revealed_safe: usize,
    cells: Vec<Cell>,
}

impl MineField {
    /// Allocates a fresh unrevealed, unflagged, mine-free grid. A mine count
    /// at or above the cell count is clamped to `cells - 1` so at least one
    /// safe cell exists. Dimension validation happens at the boundary; this
    /// constructor trusts its caller on that.
    pub fn new(params: GameParams) -> Self {
        let cell_count = params.width * params.height;
        let mine_count = if params.mines >= cell_count {
            warn!(
                "mine count {} exceeds usable cells, clamping to {}",
                params.mines,
                cell_count - 1
            );
            cell_count - 1
        } else {
            params.mines
        };

        Self {
            width: params.width,
            height: params.height,
            mine_count,
            mines_placed: false,
            revealed_safe: 0,
            cells: (0..cell_count).map(|_| Cell::default()).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn mine_count(&self) -> usize {
        self.mine_count
    }

    pub fn mines_placed(&self) -> bool {
        self.mines_placed
    }

    /// Number of non-mine cells on the board; revealing all of them wins.
    pub fn safe_total(&self) -> usize {
        self.width * self.height - self.mine_count
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: Pos) -> usize {
        pos.x + pos.y * self.width
    }

    /// Sweeps the grid row-major, minting each unmined non-excluded cell
    /// with probability 1/13, repeating until the quota is met. No-op after
    /// the first call: exactly one cell, the first ever revealed, is
    /// guaranteed mine-free. Callers must serialize this with all other
    /// mutations (one lock per session).
    pub fn place_mines(&mut self, excluding: Pos, rng: &mut impl Rng) {
        if self.mines_placed {
            return;
        }

        let mut placed = 0;
        while placed < self.mine_count {
            for y in 0..self.height {
                for x in 0..self.width {
                    if placed == self.mine_count {
                        break;
                    }

                    let pos = Pos { x, y };
                    if pos == excluding {
                        continue;
                    }

                    let idx = self.index(pos);
                    if !self.cells[idx].has_mine && rng.random_ratio(1, PLACEMENT_ODDS) {
                        self.cells[idx].has_mine = true;
                        placed += 1;
                    }
                }
            }
        }

        self.mines_placed = true;
        debug!("placed {} mines, excluding ({}, {})", placed, excluding.x, excluding.y);
    }

    /// Mines among the in-bounds Chebyshev-distance-1 neighbors.
    pub fn adjacent_mines(&self, pos: Pos) -> u8 {
        let mut count = 0;

        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }

                let nx = pos.x as i32 + dx;
                let ny = pos.y as i32 + dy;

                if nx >= 0
                    && nx < self.width as i32
                    && ny >= 0
                    && ny < self.height as i32
                    && self.cells[self.index(Pos {
                        x: nx as usize,
                        y: ny as usize,
                    })]
                    .has_mine
                {
                    count += 1;
                }
            }
        }

        count
    }

    /// Reveals a cell by direct player action. A flagged cell must be
    /// unflagged first; a revealed cell stays as it is. On a mine hit the
    /// field is left untouched and the caller uncovers the mined set via
    /// [`Self::reveal_mines`]. Otherwise zero-adjacency cells flood-fill
    /// their neighborhood; the cascade ignores flags, only the initial
    /// player-chosen cell is protected by one.
    pub fn reveal(&mut self, pos: Pos, updates: &mut Vec<CellUpdate>) -> RevealOutcome {
        if !self.in_bounds(pos) {
            return RevealOutcome::Unchanged;
        }

        let idx = self.index(pos);
        if self.cells[idx].revealed || self.cells[idx].flagged {
            return RevealOutcome::Unchanged;
        }

        if self.cells[idx].has_mine {
            return RevealOutcome::MineHit;
        }

        self.reveal_cascade(pos, updates);

        RevealOutcome::Revealed {
            adjacent: self.adjacent_mines(pos),
            won: self.revealed_safe == self.safe_total(),
        }
    }

    fn reveal_cascade(&mut self, pos: Pos, updates: &mut Vec<CellUpdate>) {
        let idx = self.index(pos);
        if self.cells[idx].revealed || self.cells[idx].has_mine {
            return;
        }

        self.cells[idx].revealed = true;
        self.revealed_safe += 1;

        let adjacent = self.adjacent_mines(pos);
        updates.push(CellUpdate {
            pos,
            value: self.cells[idx].view(adjacent),
        });

        if adjacent != 0 {
            return;
        }

        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }

                let nx = pos.x as i32 + dx;
                let ny = pos.y as i32 + dy;

                if nx >= 0 && nx < self.width as i32 && ny >= 0 && ny < self.height as i32 {
                    self.reveal_cascade(
                        Pos {
                            x: nx as usize,
                            y: ny as usize,
                        },
                        updates,
                    );
                }
            }
        }
    }

    /// Uncovers every mined cell for end-of-game display. Safe cells stay
    /// hidden.
    pub fn reveal_mines(&mut self, updates: &mut Vec<CellUpdate>) {
        for y in 0..self.height {
            for x in 0..self.width {
                let pos = Pos { x, y };
                let idx = self.index(pos);

                if self.cells[idx].has_mine && !self.cells[idx].revealed {
                    self.cells[idx].revealed = true;
                    updates.push(CellUpdate {
                        pos,
                        value: CellView::Mine,
                    });
                }
            }
        }
    }

    /// Toggles a flag, returning the new state. `None` if the cell is
    /// revealed or out of bounds.
    pub fn toggle_flag(&mut self, pos: Pos) -> Option<bool> {
        if !self.in_bounds(pos) {
            return None;
        }

        let idx = self.index(pos);
        if self.cells[idx].revealed {
            return None;
        }

        self.cells[idx].flagged = !self.cells[idx].flagged;
        Some(self.cells[idx].flagged)
    }

    /// Installs an explicit mine layout, bypassing random placement. Test
    /// rigs use this to build deterministic boards.
    #[cfg(test)]
    pub(crate) fn place_mines_at(&mut self, positions: &[Pos]) {
        for &pos in positions {
            let idx = self.index(pos);
            self.cells[idx].has_mine = true;
        }
        self.mines_placed = true;
    }

    /// Row-indexed client view of the whole board, for init messages.
    pub fn snapshot(&self) -> Vec<Vec<CellView>> {
        (0..self.height)
            .map(|y| {
                (0..self.width)
                    .map(|x| {
                        let pos = Pos { x, y };
                        let adjacent = self.adjacent_mines(pos);
                        self.cells[self.index(pos)].view(adjacent)
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn field(width: usize, height: usize, mines: usize) -> MineField {
        MineField::new(GameParams {
            width,
            height,
            mines,
        })
    }

    /// Board used by most reveal tests: 3x3 with a single mine at (2, 2).
    fn corner_mine_field() -> MineField {
        let mut field = field(3, 3, 1);
        field.place_mines_at(&[Pos { x: 2, y: 2 }]);
        field
    }

    #[test]
    fn placement_excludes_first_click_and_meets_quota() {
        for seed in 0..20 {
            let mut field = field(9, 9, 10);
            let mut rng = StdRng::seed_from_u64(seed);
            field.place_mines(Pos { x: 4, y: 4 }, &mut rng);

            assert!(field.mines_placed());
            assert!(!field.cells[field.index(Pos { x: 4, y: 4 })].has_mine);
            assert_eq!(field.cells.iter().filter(|c| c.has_mine).count(), 10);
        }
    }

    #[test]
    fn placement_happens_exactly_once() {
        let mut field = field(9, 9, 10);
        let mut rng = StdRng::seed_from_u64(1);
        field.place_mines(Pos { x: 0, y: 0 }, &mut rng);

        let layout: Vec<bool> = field.cells.iter().map(|c| c.has_mine).collect();

        let mut rng = StdRng::seed_from_u64(2);
        field.place_mines(Pos { x: 8, y: 8 }, &mut rng);

        let unchanged: Vec<bool> = field.cells.iter().map(|c| c.has_mine).collect();
        assert_eq!(layout, unchanged);
    }

    #[test]
    fn mine_count_clamped_to_leave_a_safe_cell() {
        let field = field(5, 5, 25);
        assert_eq!(field.mine_count(), 24);
        assert_eq!(field.safe_total(), 1);

        let field = MineField::new(GameParams {
            width: 3,
            height: 3,
            mines: 100,
        });
        assert_eq!(field.mine_count(), 8);
    }

    #[test]
    fn corner_click_floods_whole_safe_region_and_wins() {
        let mut field = corner_mine_field();
        let mut updates = Vec::new();

        let outcome = field.reveal(Pos { x: 0, y: 0 }, &mut updates);

        assert_eq!(
            outcome,
            RevealOutcome::Revealed {
                adjacent: 0,
                won: true
            }
        );
        assert_eq!(updates.len(), 8);
        assert_eq!(field.revealed_safe, field.safe_total());
        assert!(!field.cells[field.index(Pos { x: 2, y: 2 })].revealed);
    }

    #[test]
    fn reveal_is_idempotent() {
        let mut field = corner_mine_field();
        let mut updates = Vec::new();
        field.reveal(Pos { x: 0, y: 0 }, &mut updates);

        let before = field.revealed_safe;
        let mut updates = Vec::new();
        let outcome = field.reveal(Pos { x: 1, y: 1 }, &mut updates);

        assert_eq!(outcome, RevealOutcome::Unchanged);
        assert!(updates.is_empty());
        assert_eq!(field.revealed_safe, before);
    }

    #[test]
    fn flag_blocks_direct_reveal_but_not_cascade() {
        let mut field = corner_mine_field();
        assert_eq!(field.toggle_flag(Pos { x: 1, y: 1 }), Some(true));

        let mut updates = Vec::new();
        let outcome = field.reveal(Pos { x: 1, y: 1 }, &mut updates);
        assert_eq!(outcome, RevealOutcome::Unchanged);

        let mut updates = Vec::new();
        field.reveal(Pos { x: 0, y: 0 }, &mut updates);
        assert!(
            updates
                .iter()
                .any(|u| u.pos.x == 1 && u.pos.y == 1 && matches!(u.value, CellView::Revealed { .. }))
        );
    }

    #[test]
    fn mine_hit_leaves_reveal_to_caller() {
        let mut field = corner_mine_field();
        let mut updates = Vec::new();

        assert_eq!(
            field.reveal(Pos { x: 2, y: 2 }, &mut updates),
            RevealOutcome::MineHit
        );
        assert!(updates.is_empty());
        assert!(!field.cells[field.index(Pos { x: 2, y: 2 })].revealed);

        field.reveal_mines(&mut updates);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].value, CellView::Mine);
    }

    #[test]
    fn cascade_stops_at_numbered_boundary() {
        // 5x5, single mine in the middle: every safe cell is connected to
        // the corner through zero-adjacency cells or the numbered ring, so
        // one click clears the board.
        let mut field = field(5, 5, 1);
        field.place_mines_at(&[Pos { x: 2, y: 2 }]);

        let mut updates = Vec::new();
        let outcome = field.reveal(Pos { x: 0, y: 0 }, &mut updates);

        assert_eq!(updates.len(), 24);
        assert!(matches!(outcome, RevealOutcome::Revealed { won: true, .. }));
    }

    #[test]
    fn cascade_terminates_on_maximum_board() {
        // Ceiling-sized board with no mines: the flood fill must visit all
        // 2800 cells exactly once and reach a fixed point.
        let mut field = field(56, 50, 0);
        field.place_mines_at(&[]);

        let mut updates = Vec::new();
        let outcome = field.reveal(Pos { x: 0, y: 0 }, &mut updates);

        assert_eq!(updates.len(), 56 * 50);
        assert!(matches!(outcome, RevealOutcome::Revealed { won: true, .. }));
    }

    #[test]
    fn win_signal_raised_exactly_once() {
        // 2x2 with one mine: no cascade, three separate reveals. Only the
        // final one may carry the win signal.
        let mut field = field(2, 2, 1);
        field.place_mines_at(&[Pos { x: 1, y: 1 }]);

        let safe = [
            Pos { x: 0, y: 0 },
            Pos { x: 1, y: 0 },
            Pos { x: 0, y: 1 },
        ];
        let mut wins = 0;
        for pos in safe {
            let mut updates = Vec::new();
            if let RevealOutcome::Revealed { won: true, .. } = field.reveal(pos, &mut updates) {
                wins += 1;
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(field.revealed_safe, field.safe_total());
    }

    #[test]
    fn flag_toggles_only_while_hidden() {
        let mut field = corner_mine_field();

        assert_eq!(field.toggle_flag(Pos { x: 2, y: 2 }), Some(true));
        assert_eq!(field.toggle_flag(Pos { x: 2, y: 2 }), Some(false));
        assert_eq!(field.toggle_flag(Pos { x: 9, y: 9 }), None);

        let mut updates = Vec::new();
        field.reveal(Pos { x: 0, y: 0 }, &mut updates);
        assert_eq!(field.toggle_flag(Pos { x: 0, y: 0 }), None);
    }

    #[test]
    fn snapshot_hides_unrevealed_mines() {
        let mut field = corner_mine_field();
        field.toggle_flag(Pos { x: 0, y: 1 });

        let rows = field.snapshot();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2][2], CellView::Hidden);
        assert_eq!(rows[1][0], CellView::Flagged);
    }
}
