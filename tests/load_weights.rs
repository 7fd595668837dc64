use cacbin::quadrature::{observed_weight, predicted_weight};
use cacbin::{
    hex8_nodes, CouplingConfig, ElementFamily, EntityStore, EstimationMode, GeometryEstimator, InteractionCounts,
    ModeKind, NeighborStatistics, Ownership, QuadratureCountEstimator,
};
use rand::Rng;

fn random_store(rng: &mut impl Rng, particles: usize, elements: usize) -> EntityStore {
    let mut store = EntityStore::new();
    for _ in 0..particles {
        let p = [rng.gen_range(0.0..50.0), rng.gen_range(0.0..50.0), rng.gen_range(0.0..50.0)];
        store.push_particle(p, Ownership::Local).unwrap();
    }
    for _ in 0..elements {
        let lo = [rng.gen_range(0.0..40.0), rng.gen_range(0.0..40.0), rng.gen_range(0.0..40.0)];
        let hi = [
            lo[0] + rng.gen_range(0.1..40.0),
            lo[1] + rng.gen_range(0.1..40.0),
            lo[2] + rng.gen_range(0.1..40.0),
        ];
        let scale = [rng.gen_range(1..20), rng.gen_range(1..20), rng.gen_range(1..20)];
        let poly = rng.gen_range(1..4);
        let nodes: Vec<[f64; 3]> = (0..poly).flat_map(|_| hex8_nodes(lo, hi)).collect();
        store.push_element(ElementFamily::Hex8, scale, poly, &nodes, Ownership::Local).unwrap();
    }
    store
}

#[test]
fn test_weights_at_least_one_predictive() {
    let mut rng = rand::thread_rng();
    let mut store = random_store(&mut rng, 100, 100);
    for cutoff in [0.5, 2.5, 10.0, 100.0] {
        let est = QuadratureCountEstimator::new(&CouplingConfig::new(cutoff), &store).unwrap();
        let summary = est.estimate(&mut store, EstimationMode::Predictive).unwrap();
        assert_eq!(summary.mode, ModeKind::Predictive);
        assert!(store.load_weights().iter().all(|&w| w >= 1));
        assert_eq!(summary.total, store.load_weights().iter().sum::<u64>());
    }
}

#[test]
fn test_weights_at_least_one_observed() {
    let mut rng = rand::thread_rng();
    let mut store = random_store(&mut rng, 60, 20);
    let counts: Vec<InteractionCounts> = (0..store.local_count())
        .map(|_| InteractionCounts::new(rng.gen_range(0..3), rng.gen_range(0..3), rng.gen_range(0..3)))
        .collect();

    for outer_only in [false, true] {
        let mut cfg = CouplingConfig::new(2.5);
        cfg.outer_shell_only = outer_only;
        let est = QuadratureCountEstimator::new(&cfg, &store).unwrap();
        let mode = EstimationMode::select(Some(NeighborStatistics::new(counts.clone())), store.local_count());
        let summary = est.estimate(&mut store, mode).unwrap();
        assert_eq!(summary.mode, ModeKind::Observed);
        assert!(store.load_weights().iter().all(|&w| w >= 1));
    }
}

#[test]
fn test_band_counts_at_least_one() {
    let mut rng = rand::thread_rng();
    let store = random_store(&mut rng, 0, 200);
    for one_layer in [false, true] {
        let geometry = GeometryEstimator::new(rng.gen_range(0.01..50.0), one_layer);
        for e in store.locals() {
            let cacbin::EntityKind::Element(family) = e.kind else { unreachable!() };
            let layout = geometry.surface_layout(family, e.copy_nodes(0), e.scale);
            assert!(layout.band_counts.iter().all(|&n| n >= 1));
            assert!(layout.interior_scales.iter().all(|&s| (0.0..=1.0).contains(&s)));
            if one_layer {
                assert_eq!(layout.band_counts, [1, 1, 1]);
            }
        }
    }
}

#[test]
fn test_spec_formula_examples() {
    for rank in 1..6u32 {
        for poly in 1..4u32 {
            let r = rank as u64;
            assert_eq!(predicted_weight(rank, [0, 0, 0], poly), r * r * r * poly as u64);
        }
    }
    for poly in 1..4u32 {
        assert_eq!(predicted_weight(2, [1, 0, 0], poly), 16 * poly as u64);
    }
    assert_eq!(observed_weight(InteractionCounts::new(0, 5, 3), false, 0, 0), 6);
}

#[test]
fn test_statistics_consumed_by_rebuild() {
    let mut store = EntityStore::new();
    store.push_particle([1.0; 3], Ownership::Local).unwrap();
    store
        .push_element(ElementFamily::Hex8, [8, 8, 8], 1, &hex8_nodes([0.0; 3], [16.0; 3]), Ownership::Local)
        .unwrap();
    let est = QuadratureCountEstimator::new(&CouplingConfig::new(2.5), &store).unwrap();

    let mut pending = Some(NeighborStatistics::new(vec![
        InteractionCounts::new(3, 4, 0),
        InteractionCounts::new(100, 50, 7),
    ]));

    let mode = EstimationMode::select(pending.take(), store.local_count());
    est.estimate(&mut store, mode).unwrap();
    assert_eq!(store.load_weights(), &[7, 150]);

    // Nothing fresh for the next rebuild: back to geometry.
    let mode = EstimationMode::select(pending.take(), store.local_count());
    let summary = est.estimate(&mut store, mode).unwrap();
    assert_eq!(summary.mode, ModeKind::Predictive);
    assert_eq!(store.load_weights(), &[1, 216]);
}

#[test]
fn test_statistics_ignored_after_entity_count_change() {
    let mut store = EntityStore::new();
    store.push_particle([1.0; 3], Ownership::Local).unwrap();
    let stats = NeighborStatistics::new(vec![InteractionCounts::new(5, 5, 5)]);
    store.push_particle([2.0; 3], Ownership::Local).unwrap();

    let est = QuadratureCountEstimator::new(&CouplingConfig::new(2.5), &store).unwrap();
    let mode = EstimationMode::select(Some(stats), store.local_count());
    assert_eq!(mode, EstimationMode::Predictive);
    est.estimate(&mut store, mode).unwrap();
    assert_eq!(store.load_weights(), &[1, 1]);
}
