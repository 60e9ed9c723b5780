use std::{
    collections::HashMap,
    fmt,
};

use itertools::Itertools;
use rand::Rng;
use thiserror::Error;

/// Whole revolutions included in every spin so the wheel visibly turns even
/// when the winning sector sits right under the pointer.
pub const MIN_FULL_SPINS: u32 = 2;

/// The greedy shuffle occasionally corners itself even when a conflict-free
/// arrangement exists; a bounded number of fresh passes makes that outcome
/// vanishingly rare without risking an unbounded loop.
const MAX_SHUFFLE_ATTEMPTS: usize = 32;

/// Opaque equality token. Only compared against neighboring sectors; the
/// actual styling lives in the rendering layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColorKey(String);

impl ColorKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct PrizeClass {
    pub label: String,
    pub color: ColorKey,
    pub weight: u32,
    pub multiplier: u64,
}

impl PrizeClass {
    pub fn new(
        label: impl Into<String>,
        color: impl Into<String>,
        weight: u32,
        multiplier: u64,
    ) -> Self {
        Self {
            label: label.into(),
            color: ColorKey::new(color),
            weight,
            multiplier,
        }
    }
}

/// One slot of the wheel. `protocol_index` is the position in the ledger's
/// own enumeration and never changes once assigned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sector {
    pub label: String,
    pub color: ColorKey,
    pub multiplier: u64,
    pub protocol_index: u32,
}

/// The sample wheel shipped by the wager contract: five classes, twenty
/// sectors.
pub fn default_prize_table() -> Vec<PrizeClass> {
    vec![
        PrizeClass::new("0x", "red", 10, 0),
        PrizeClass::new("1x", "blue", 4, 1),
        PrizeClass::new("2x", "green", 3, 2),
        PrizeClass::new("4x", "orange", 2, 4),
        PrizeClass::new("8x", "yellow", 1, 8),
    ]
}

/// The visual ordering of all sectors, generated once at startup. Regenerating
/// it mid-session would scramble the positions a player has already seen, so
/// there is deliberately no way to mutate a layout after construction.
#[derive(Clone, Debug)]
pub struct WheelLayout {
    sectors: Vec<Sector>,
    positions: HashMap<u32, usize>,
}

impl WheelLayout {
    /// Expands the prize table into sectors (protocol indices assigned in
    /// table order, matching the ledger's enumeration) and shuffles them so
    /// that adjacent sectors differ in color wherever the table allows it.
    ///
    /// The shuffle is greedy: each slot is drawn uniformly from the remaining
    /// sectors whose color differs from the previously placed one, treating
    /// the sequence as circular when the last slot is filled. A pass that
    /// dead-ends (forced to place two like colors next to each other) is
    /// retried up to `MAX_SHUFFLE_ATTEMPTS` times; the arrangement with the
    /// fewest violations wins, so a class holding a majority of the wheel
    /// degrades to the minimal unavoidable adjacency instead of an error.
    pub fn generate(table: &[PrizeClass], rng: &mut impl Rng) -> Self {
        let mut pool = Vec::new();
        let mut protocol_index = 0u32;
        for class in table {
            for _ in 0..class.weight {
                pool.push(Sector {
                    label: class.label.clone(),
                    color: class.color.clone(),
                    multiplier: class.multiplier,
                    protocol_index,
                });
                protocol_index += 1;
            }
        }

        let mut best: Option<(usize, Vec<Sector>)> = None;
        for _ in 0..MAX_SHUFFLE_ATTEMPTS {
            let candidate = shuffle_once(&pool, rng);
            let violations = circular_violations(&candidate);
            if violations == 0 {
                best = Some((0, candidate));
                break;
            }
            let improves = best
                .as_ref()
                .is_none_or(|(fewest, _)| violations < *fewest);
            if improves {
                best = Some((violations, candidate));
            }
        }
        let sectors = best.map(|(_, sectors)| sectors).unwrap_or_default();

        let positions = sectors
            .iter()
            .enumerate()
            .map(|(slot, s)| (s.protocol_index, slot))
            .collect();
        Self { sectors, positions }
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Visual slot holding the sector the ledger knows as `protocol_index`.
    pub fn position_of(&self, protocol_index: u32) -> Option<usize> {
        self.positions.get(&protocol_index).copied()
    }

    pub fn sector_at(&self, slot: usize) -> Option<&Sector> {
        self.sectors.get(slot)
    }

    /// Angular width of one sector in degrees.
    pub fn sector_angle(&self) -> f64 {
        if self.sectors.is_empty() {
            0.0
        } else {
            360.0 / self.sectors.len() as f64
        }
    }

    /// Angular center of a visual slot, measured from the pointer reference.
    pub fn slot_center(&self, slot: usize) -> f64 {
        (slot as f64 + 0.5) * self.sector_angle()
    }

    /// Count of circularly adjacent sector pairs sharing a color.
    pub fn adjacency_violations(&self) -> usize {
        circular_violations(&self.sectors)
    }
}

/// One greedy anti-adjacency pass over the sector pool.
fn shuffle_once(pool: &[Sector], rng: &mut impl Rng) -> Vec<Sector> {
    let total = pool.len();
    let mut remaining = pool.to_vec();
    let mut sectors: Vec<Sector> = Vec::with_capacity(total);
    while !remaining.is_empty() {
        let prev_color = sectors.last().map(|s| s.color.clone());
        let first_color = sectors.first().map(|s| s.color.clone());
        let closing = !sectors.is_empty() && sectors.len() + 1 == total;

        let differs_from_prev =
            |s: &Sector| prev_color.as_ref().is_none_or(|c| s.color != *c);
        // The final slot also neighbors the first sector.
        let mut candidates: Vec<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                differs_from_prev(s)
                    && (!closing
                        || first_color.as_ref().is_none_or(|c| s.color != *c))
            })
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            candidates = remaining
                .iter()
                .enumerate()
                .filter(|(_, s)| differs_from_prev(s))
                .map(|(i, _)| i)
                .collect();
        }
        if candidates.is_empty() {
            candidates = (0..remaining.len()).collect();
        }

        let pick = candidates[rng.random_range(0..candidates.len())];
        sectors.push(remaining.swap_remove(pick));
    }
    sectors
}

fn circular_violations(sectors: &[Sector]) -> usize {
    if sectors.len() < 2 {
        return 0;
    }
    sectors
        .iter()
        .circular_tuple_windows()
        .filter(|(a, b)| a.color == b.color)
        .count()
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("ledger reported sector index {0} which is not present in the wheel layout")]
pub struct UnknownProtocolIndex(pub u32);

/// Rotation bookkeeping for the lifetime of a session. The accumulated angle
/// only ever grows; reducing it modulo 360 is a rendering concern.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RotationState {
    pub accumulated_angle: f64,
    pub current_visual_index: usize,
}

impl RotationState {
    pub fn apply(self, plan: &RotationPlan) -> Self {
        Self {
            accumulated_angle: plan.target_angle,
            current_visual_index: plan.visual_index,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotationPlan {
    pub target_angle: f64,
    pub visual_index: usize,
}

/// Maps a settlement outcome onto a forward-only rotation target that parks
/// the winning sector's center under the pointer at the top of the wheel.
#[derive(Clone, Copy, Debug)]
pub struct RotationPlanner {
    pub min_full_spins: u32,
}

impl Default for RotationPlanner {
    fn default() -> Self {
        Self {
            min_full_spins: MIN_FULL_SPINS,
        }
    }
}

impl RotationPlanner {
    pub fn plan(
        &self,
        layout: &WheelLayout,
        state: RotationState,
        protocol_index: u32,
    ) -> Result<RotationPlan, UnknownProtocolIndex> {
        let visual_index = layout
            .position_of(protocol_index)
            .ok_or(UnknownProtocolIndex(protocol_index))?;

        let current = state.accumulated_angle;
        // Finish the partial revolution already on the clock, add the minimum
        // full spins, then park the sector center at the pointer. Every term
        // past `current` is positive, so the target is strictly ahead.
        let target = current
            + f64::from(self.min_full_spins) * 360.0
            + (360.0 - current.rem_euclid(360.0))
            + (360.0 - layout.slot_center(visual_index));

        Ok(RotationPlan {
            target_angle: target,
            visual_index,
        })
    }
}
