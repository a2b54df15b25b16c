use ndarray::aview1;
use protomap::{euclidean, Kmeans, Kohonen, PrefetchEvaluator, PrefetchModel};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_kmeans_partitions_training_set(
        data in prop::collection::vec(prop::collection::vec(0.0f32..5.0, 3), 1..30),
        k in 1usize..6,
        seed in any::<u64>(),
    ) {
        // Skip if k > n
        if k <= data.len() {
            let mut model = Kmeans::new(k).with_seed(seed).initialize(3, &data, &[]).unwrap();
            model.train().unwrap();

            let mut seen = vec![0usize; data.len()];
            for c in 0..k {
                for &i in model.store().members(c) {
                    prop_assert!(i < data.len());
                    seen[i] += 1;
                }
            }
            prop_assert!(seen.iter().all(|&count| count == 1));
        }
    }

    #[test]
    fn prop_distance_symmetric(
        pair in (1usize..16).prop_flat_map(|d| (
            prop::collection::vec(-100.0f32..100.0, d),
            prop::collection::vec(-100.0f32..100.0, d),
        )),
    ) {
        let (a, b) = pair;
        let ab = euclidean(aview1(&a), aview1(&b)).unwrap();
        let ba = euclidean(aview1(&b), aview1(&a)).unwrap();
        prop_assert_eq!(ab, ba);
        prop_assert!(ab >= 0.0);
        prop_assert_eq!(euclidean(aview1(&a), aview1(&a)).unwrap(), 0.0);
    }

    #[test]
    fn prop_distance_rejects_mismatch(
        a in prop::collection::vec(0.0f32..1.0, 1..8),
        extra in 1usize..4,
    ) {
        let b = vec![0.0f32; a.len() + extra];
        prop_assert!(euclidean(aview1(&a), aview1(&b)).is_err());
    }

    #[test]
    fn prop_som_schedule_decays_to_zero(
        n in 1usize..20,
        epochs in 1usize..200,
        rate in 0.01f64..1.0,
    ) {
        let som = Kohonen::new(n, epochs).with_initial_learning_rate(rate);
        for t in 0..epochs {
            prop_assert!(som.learning_rate(t + 1) <= som.learning_rate(t));
            prop_assert!(som.radius(t + 1) <= som.radius(t));
        }
        prop_assert_eq!(som.learning_rate(epochs), 0.0);
        prop_assert_eq!(som.radius(epochs), 0.0);
    }

    #[test]
    fn prop_score_counts_bounded(
        rows in (1usize..10).prop_flat_map(|d| prop::collection::vec(
            (prop::collection::vec(0.0f32..1.0, d), prop::collection::vec(0u8..2, d)),
            1..10,
        )),
        threshold in 0.0f64..1.0,
    ) {
        let requests: Vec<Vec<f32>> = rows
            .iter()
            .map(|(_, r)| r.iter().map(|&x| f32::from(x)).collect())
            .collect();
        let score = PrefetchEvaluator::new(threshold)
            .score(rows.iter().zip(&requests).map(|((p, _), r)| (aview1(p), aview1(r))))
            .unwrap();

        prop_assert!(score.hits <= score.requests);
        prop_assert!(score.hits <= score.prefetched);
        prop_assert!(score.requests <= score.features);
        if let Some(h) = score.hitrate() {
            prop_assert!((0.0..=1.0).contains(&h));
        }
        if let Some(a) = score.accuracy() {
            prop_assert!((0.0..=1.0).contains(&a));
        }
    }
}
