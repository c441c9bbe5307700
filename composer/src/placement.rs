use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::PlacementError,
    geom::{BoundingBox, OccupiedRegion},
};

pub const DEFAULT_EXHAUSTIVE_LIMIT: u64 = 1 << 20;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 256;

/// How anchors are searched once a scene already holds boxes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// Enumerate every anchor and pick uniformly among the free ones.
    Exhaustive,
    /// Random anchors until one is free; exhaustive once the attempts run out.
    Rejection { max_attempts: u32 },
    /// Exhaustive while the anchor grid holds at most `exhaustive_limit`
    /// positions, rejection above that.
    Auto {
        exhaustive_limit: u64,
        max_attempts: u32,
    },
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Auto {
            exhaustive_limit: DEFAULT_EXHAUSTIVE_LIMIT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Regions claimed by the boxes placed so far in one scene.
#[derive(Clone, Debug, Default)]
pub struct Occupancy {
    margin: i32,
    regions: Vec<OccupiedRegion>,
}

impl Occupancy {
    pub fn new(margin: i32) -> Self {
        Self {
            margin,
            regions: Vec::new(),
        }
    }

    pub fn margin(&self) -> i32 {
        self.margin
    }

    pub fn regions(&self) -> &[OccupiedRegion] {
        &self.regions
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn record(&mut self, bbox: &BoundingBox) {
        self.regions.push(OccupiedRegion::around(bbox, self.margin));
    }

    pub fn with(mut self, bbox: &BoundingBox) -> Self {
        self.record(bbox);
        self
    }

    /// Whether a `w`x`h` box at `(x, y)`, grown by the same margin, hits any
    /// recorded region.
    pub fn blocks(&self, x: u32, y: u32, w: u32, h: u32) -> bool {
        let candidate = OccupiedRegion::with_margin(x, y, w, h, self.margin);
        self.regions.iter().any(|r| candidate.intersects(r))
    }
}

/// Uniform anchor for a `w`x`h` box inside a `cw`x`ch` area, ignoring
/// occupancy. `None` if the box does not fit.
pub fn uniform_anchor<R: Rng + ?Sized>(
    w: u32,
    h: u32,
    cw: u32,
    ch: u32,
    rng: &mut R,
) -> Option<(u32, u32)> {
    if w > cw || h > ch {
        return None;
    }
    Some((rng.random_range(0..=cw - w), rng.random_range(0..=ch - h)))
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PlacementPlanner {
    strategy: Strategy,
}

impl PlacementPlanner {
    pub fn new(strategy: Strategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn place<R: Rng + ?Sized>(
        &self,
        w: u32,
        h: u32,
        cw: u32,
        ch: u32,
        occupancy: &Occupancy,
        rng: &mut R,
    ) -> Result<(u32, u32), PlacementError> {
        let no_anchor = || PlacementError::NoValidAnchor {
            width: w,
            height: h,
            canvas_width: cw,
            canvas_height: ch,
            occupied: occupancy.len(),
        };

        if occupancy.is_empty() {
            return uniform_anchor(w, h, cw, ch, rng).ok_or_else(no_anchor);
        }
        if w > cw || h > ch {
            return Err(no_anchor());
        }

        let anchors = (cw - w + 1) as u64 * (ch - h + 1) as u64;
        let found = match self.strategy {
            Strategy::Exhaustive => exhaustive(w, h, cw, ch, occupancy, rng),
            Strategy::Rejection { max_attempts } => {
                rejection(w, h, cw, ch, occupancy, max_attempts, rng)
                    .or_else(|| exhaustive(w, h, cw, ch, occupancy, rng))
            }
            Strategy::Auto {
                exhaustive_limit,
                max_attempts,
            } => {
                if anchors <= exhaustive_limit {
                    exhaustive(w, h, cw, ch, occupancy, rng)
                } else {
                    rejection(w, h, cw, ch, occupancy, max_attempts, rng)
                        .or_else(|| exhaustive(w, h, cw, ch, occupancy, rng))
                }
            }
        };
        found.ok_or_else(no_anchor)
    }
}

/// Every anchor whose box clears the recorded regions, column-major.
fn free_anchors(
    w: u32,
    h: u32,
    cw: u32,
    ch: u32,
    occupancy: &Occupancy,
) -> impl Iterator<Item = (u32, u32)> + '_ {
    (0..=cw - w)
        .flat_map(move |x| (0..=ch - h).map(move |y| (x, y)))
        .filter(move |&(x, y)| !occupancy.blocks(x, y, w, h))
}

/// Counts the free anchors, then walks again to a uniformly drawn one.
fn exhaustive<R: Rng + ?Sized>(
    w: u32,
    h: u32,
    cw: u32,
    ch: u32,
    occupancy: &Occupancy,
    rng: &mut R,
) -> Option<(u32, u32)> {
    let free = free_anchors(w, h, cw, ch, occupancy).count();
    debug!(free, "exhaustive anchor search");
    if free == 0 {
        return None;
    }
    let k = rng.random_range(0..free);
    free_anchors(w, h, cw, ch, occupancy).nth(k)
}

fn rejection<R: Rng + ?Sized>(
    w: u32,
    h: u32,
    cw: u32,
    ch: u32,
    occupancy: &Occupancy,
    max_attempts: u32,
    rng: &mut R,
) -> Option<(u32, u32)> {
    (0..max_attempts)
        .filter_map(|_| uniform_anchor(w, h, cw, ch, rng))
        .find(|&(x, y)| !occupancy.blocks(x, y, w, h))
}
