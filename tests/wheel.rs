#![allow(non_snake_case)]
use std::collections::{
    HashMap,
    HashSet,
};

use proptest::prelude::*;
use rand::{
    SeedableRng,
    rngs::StdRng,
};
use spinwheel::wheel::{
    PrizeClass,
    RotationPlanner,
    RotationState,
    WheelLayout,
    default_prize_table,
};

const ANGLE_TOLERANCE: f64 = 1e-6;

fn table_from_weights(weights: &[u32]) -> Vec<PrizeClass> {
    weights
        .iter()
        .enumerate()
        .map(|(i, w)| PrizeClass::new(format!("{i}x"), format!("color{i}"), *w, i as u64))
        .collect()
}

fn angle_aligns(target: f64, expected: f64) -> bool {
    let diff = (target.rem_euclid(360.0) - expected.rem_euclid(360.0)).rem_euclid(360.0);
    diff < ANGLE_TOLERANCE || diff > 360.0 - ANGLE_TOLERANCE
}

#[test]
fn generate__sample_table_covers_indices_zero_to_nineteen() {
    // given
    let table = default_prize_table();
    let mut rng = StdRng::seed_from_u64(7);

    // when
    let layout = WheelLayout::generate(&table, &mut rng);

    // then
    assert_eq!(layout.len(), 20);
    let indices: HashSet<u32> =
        layout.sectors().iter().map(|s| s.protocol_index).collect();
    assert_eq!(indices, (0..20).collect::<HashSet<u32>>());
}

#[test]
fn generate__sample_table_has_no_adjacent_colors() {
    let table = default_prize_table();
    for seed in 0..50u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let layout = WheelLayout::generate(&table, &mut rng);
        assert_eq!(
            layout.adjacency_violations(),
            0,
            "seed {seed} produced adjacent same-color sectors"
        );
    }
}

#[test]
fn generate__color_multiset_matches_weights() {
    // given
    let table = default_prize_table();
    let mut rng = StdRng::seed_from_u64(3);

    // when
    let layout = WheelLayout::generate(&table, &mut rng);

    // then
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for sector in layout.sectors() {
        *counts.entry(sector.color.as_str()).or_default() += 1;
    }
    for class in &table {
        assert_eq!(counts.get(class.color.as_str()), Some(&class.weight));
    }
}

#[test]
fn generate__majority_class_yields_minimal_violations() {
    // A class holding 15 of 20 sectors cannot avoid touching itself; the
    // layout must still build and stay index-complete.
    let table = table_from_weights(&[15, 3, 2]);
    let mut rng = StdRng::seed_from_u64(11);
    let layout = WheelLayout::generate(&table, &mut rng);

    assert_eq!(layout.len(), 20);
    let indices: HashSet<u32> =
        layout.sectors().iter().map(|s| s.protocol_index).collect();
    assert_eq!(indices.len(), 20);
    // Five other sectors split the fifteen into at most five runs, leaving
    // at least ten shared edges inside those runs.
    assert!(layout.adjacency_violations() >= 10);
}

#[test]
fn position_of__is_the_inverse_of_the_visual_order() {
    let table = default_prize_table();
    let mut rng = StdRng::seed_from_u64(21);
    let layout = WheelLayout::generate(&table, &mut rng);

    for (slot, sector) in layout.sectors().iter().enumerate() {
        assert_eq!(layout.position_of(sector.protocol_index), Some(slot));
    }
    assert_eq!(layout.position_of(999), None);
}

#[test]
fn plan__unknown_protocol_index_is_rejected() {
    // given
    let layout =
        WheelLayout::generate(&default_prize_table(), &mut StdRng::seed_from_u64(5));
    let planner = RotationPlanner::default();

    // when
    let result = planner.plan(&layout, RotationState::default(), 20);

    // then
    assert!(result.is_err());
}

#[test]
fn plan__first_spin_lands_scenario_sector_under_pointer() {
    // given
    let layout =
        WheelLayout::generate(&default_prize_table(), &mut StdRng::seed_from_u64(5));
    let planner = RotationPlanner::default();
    let state = RotationState::default();

    // when
    let plan = planner.plan(&layout, state, 5).unwrap();

    // then
    assert!(plan.target_angle > 0.0);
    assert_eq!(Some(plan.visual_index), layout.position_of(5));
    let expected = 360.0 - layout.slot_center(plan.visual_index);
    assert!(angle_aligns(plan.target_angle, expected));
}

#[test]
fn plan__includes_minimum_full_revolutions() {
    let layout =
        WheelLayout::generate(&default_prize_table(), &mut StdRng::seed_from_u64(9));
    let planner = RotationPlanner::default();
    let mut state = RotationState::default();

    for index in [0u32, 19, 7, 7, 3] {
        let plan = planner.plan(&layout, state, index).unwrap();
        assert!(plan.target_angle - state.accumulated_angle > 720.0);
        state = state.apply(&plan);
    }
}

proptest! {
    #[test]
    fn generate__every_protocol_index_appears_once(
        seed in any::<u64>(),
        weights in prop::collection::vec(1u32..6, 2..6),
    ) {
        let table = table_from_weights(&weights);
        let total: u32 = weights.iter().sum();
        let mut rng = StdRng::seed_from_u64(seed);

        let layout = WheelLayout::generate(&table, &mut rng);

        prop_assert_eq!(layout.len() as u32, total);
        let indices: HashSet<u32> =
            layout.sectors().iter().map(|s| s.protocol_index).collect();
        prop_assert_eq!(indices, (0..total).collect::<HashSet<u32>>());
    }

    #[test]
    fn generate__no_adjacent_colors_without_majority_class(
        seed in any::<u64>(),
        weights in prop::collection::vec(1u32..6, 2..6),
    ) {
        let total: u32 = weights.iter().sum();
        let heaviest = weights.iter().copied().max().unwrap_or(0);
        // A class over half the wheel cannot avoid touching itself.
        prop_assume!(heaviest * 2 <= total);

        let table = table_from_weights(&weights);
        let mut rng = StdRng::seed_from_u64(seed);
        let layout = WheelLayout::generate(&table, &mut rng);

        prop_assert_eq!(layout.adjacency_violations(), 0);
    }

    #[test]
    fn plan__accumulated_angle_strictly_increases(
        seed in any::<u64>(),
        outcomes in prop::collection::vec(0u32..20, 1..30),
    ) {
        let layout = WheelLayout::generate(
            &default_prize_table(),
            &mut StdRng::seed_from_u64(seed),
        );
        let planner = RotationPlanner::default();
        let mut state = RotationState::default();

        for index in outcomes {
            let plan = planner.plan(&layout, state, index).unwrap();
            prop_assert!(plan.target_angle > state.accumulated_angle);

            let expected = 360.0 - layout.slot_center(plan.visual_index);
            prop_assert!(
                angle_aligns(plan.target_angle, expected),
                "target {} does not align sector center {}",
                plan.target_angle,
                expected,
            );
            state = state.apply(&plan);
        }
    }
}
