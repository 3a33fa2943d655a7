//! Grid geometry for the workspace.
//!
//! Slots tile the window in a near-square grid: N=4 gives 2×2, N=6
//! gives 3×2. Remainder pixels go to the last column/row so the tiles
//! cover the window exactly.

use sg_domain::Bounds;

/// Bounds of one slot in a `max_agents`-slot grid over a
/// `window_w × window_h` window.
pub fn slot_bounds(window_w: u32, window_h: u32, max_agents: usize, slot: usize) -> Bounds {
    let n = max_agents.max(1);
    let slot = slot.min(n - 1);

    let cols = (n as f64).sqrt().ceil() as u32;
    let rows = (n as u32).div_ceil(cols);

    let col = (slot as u32) % cols;
    let row = (slot as u32) / cols;

    let cell_w = window_w / cols;
    let cell_h = window_h / rows;

    let w = if col == cols - 1 {
        window_w - cell_w * (cols - 1)
    } else {
        cell_w
    };
    let h = if row == rows - 1 {
        window_h - cell_h * (rows - 1)
    } else {
        cell_h
    };

    Bounds::new(col * cell_w, row * cell_h, w, h)
}

/// Bounds for every slot of the grid.
pub fn grid(window_w: u32, window_h: u32, max_agents: usize) -> Vec<Bounds> {
    (0..max_agents)
        .map(|slot| slot_bounds(window_w, window_h, max_agents, slot))
        .collect()
}

/// The whole window, for the fullscreen slot.
pub fn fullscreen(window_w: u32, window_h: u32) -> Bounds {
    Bounds::new(0, 0, window_w, window_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_slots_tile_two_by_two() {
        let g = grid(1280, 720, 4);
        assert_eq!(g[0], Bounds::new(0, 0, 640, 360));
        assert_eq!(g[1], Bounds::new(640, 0, 640, 360));
        assert_eq!(g[2], Bounds::new(0, 360, 640, 360));
        assert_eq!(g[3], Bounds::new(640, 360, 640, 360));
    }

    #[test]
    fn odd_window_sizes_still_cover_exactly() {
        let g = grid(1283, 723, 4);
        // Right column and bottom row absorb the remainder.
        assert_eq!(g[1].x + g[1].w, 1283);
        assert_eq!(g[3].y + g[3].h, 723);
    }

    #[test]
    fn six_slots_tile_three_by_two() {
        let g = grid(1200, 600, 6);
        assert_eq!(g.len(), 6);
        assert_eq!(g[0], Bounds::new(0, 0, 400, 300));
        assert_eq!(g[5], Bounds::new(800, 300, 400, 300));
    }

    #[test]
    fn single_slot_takes_the_window() {
        assert_eq!(slot_bounds(800, 600, 1, 0), Bounds::new(0, 0, 800, 600));
    }

    #[test]
    fn fullscreen_is_the_whole_window() {
        assert_eq!(fullscreen(1280, 720), Bounds::new(0, 0, 1280, 720));
    }
}
