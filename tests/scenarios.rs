use clump_tune::cluster::ClusterSelectionMethod;
use clump_tune::{
    export, generate_clusters, load_embedding, ClusterTrainer, CostStrategy, DistanceMetric,
    Error, ParameterDomain, ParameterSet, RandomSearch, Scorer, SearchSpace, TrainerConfig, Tpe,
    TrialLog, DEFAULT_RANDOM_STATE,
};
use ndarray::Array2;
use ndarray_npy::write_npy;
use rand::prelude::*;

/// Two groups of `n_per` points around `+3` and `-3` in every dimension.
fn two_blobs(n_per: usize, dim: usize, seed: u64) -> (Vec<Vec<f32>>, Vec<i64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(2 * n_per);
    let mut labels = Vec::with_capacity(2 * n_per);
    for (label, sign) in [(0i64, 1.0f32), (1, -1.0)] {
        for _ in 0..n_per {
            data.push((0..dim).map(|_| sign * 3.0 + rng.random::<f32>() - 0.5).collect());
            labels.push(label);
        }
    }
    (data, labels)
}

fn blob_params() -> ParameterSet {
    ParameterSet {
        n_neighbors: 10,
        n_components: 2,
        min_cluster_size: 25,
        cluster_selection_epsilon: 0.0,
        cluster_selection_method: ClusterSelectionMethod::Eom,
        metric: DistanceMetric::Euclidean,
    }
}

#[test]
fn two_blobs_are_recovered() {
    let (data, truth) = two_blobs(40, 8, 1);
    let clusters = generate_clusters(&data, &blob_params(), DEFAULT_RANDOM_STATE).unwrap();
    let record = Scorer::default().score(&clusters, &truth, &blob_params()).unwrap();

    assert_eq!(record.stats.cluster_size, 2);
    assert_eq!(record.stats.penalty, 0.0);
    assert!((record.external.adjusted_rand_score - 1.0).abs() < 1e-9);
    assert!(record.stats.relative_validity > 0.0);

    let ari = Scorer::new(CostStrategy::RandScore)
        .score(&clusters, &truth, &blob_params())
        .unwrap();
    assert!((ari.score + 1.0).abs() < 1e-9);
}

#[test]
fn uniform_noise_is_mostly_noise() {
    let mut rng = StdRng::seed_from_u64(2);
    let data: Vec<Vec<f32>> = (0..100)
        .map(|_| (0..10).map(|_| rng.random::<f32>()).collect())
        .collect();
    let truth: Vec<i64> = (0..100).map(|i| i % 2).collect();

    let settings = [
        (15, 5, ClusterSelectionMethod::Eom, DistanceMetric::Euclidean),
        (15, 5, ClusterSelectionMethod::Leaf, DistanceMetric::Manhattan),
        (15, 10, ClusterSelectionMethod::Eom, DistanceMetric::Chebyshev),
    ];
    for (n_neighbors, n_components, method, metric) in settings {
        let params = ParameterSet {
            n_neighbors,
            n_components,
            min_cluster_size: 15,
            cluster_selection_epsilon: 0.0,
            cluster_selection_method: method,
            metric,
        };
        let clusters = generate_clusters(&data, &params, DEFAULT_RANDOM_STATE).unwrap();
        let record = Scorer::default().score(&clusters, &truth, &params).unwrap();
        assert!(record.stats.penalty >= 0.8, "{params}: penalty {}", record.stats.penalty);
        assert!(record.stats.cluster_size <= 2, "{params}: {} labels", record.stats.cluster_size);
    }
}

#[test]
fn consecutive_trials_do_not_share_state() {
    let (data, truth) = two_blobs(40, 8, 3);
    let scorer = Scorer::default();
    let noisy = ParameterSet {
        min_cluster_size: 60,
        ..blob_params()
    };

    let good = generate_clusters(&data, &blob_params(), 0).unwrap();
    let bad = generate_clusters(&data, &noisy, 0).unwrap();
    let first = scorer.score(&good, &truth, &blob_params()).unwrap();
    let second = scorer.score(&bad, &truth, &noisy).unwrap();

    assert_eq!(first.stats.cluster_size, 2);
    assert_eq!(second.stats.cluster_size, 1);
    assert_eq!(second.params.min_cluster_size, 60);
    assert_eq!(first.params.min_cluster_size, 25);
    assert!(first.score < second.score);
}

#[test]
fn empty_log_exports_full_schema() {
    let table = export(&TrialLog::new(), &CostStrategy::default(), None).unwrap();
    assert_eq!(table.columns().len(), 24);
    assert_eq!(table.n_rows(), 0);

    let mut out = Vec::new();
    table.write_csv(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert_eq!(text.trim_end().split(',').count(), 24);
}

#[test]
fn tpe_run_end_to_end() {
    let (data, truth) = two_blobs(30, 6, 4);
    let space = SearchSpace::default_space()
        .with("n_neighbors", ParameterDomain::IntRange { low: 5, high: 15 })
        .with("min_cluster_size", ParameterDomain::IntRange { low: 5, high: 25 });

    let mut trainer = ClusterTrainer::new(space, CostStrategy::RandScore, data, truth).unwrap();
    trainer
        .train(15, &mut Tpe::new(42).with_startup(5))
        .unwrap();

    assert_eq!(trainer.logs().len(), 15);
    let best_loss = trainer
        .logs()
        .iter()
        .map(|r| r.score)
        .fold(f64::INFINITY, f64::min);
    assert!(best_loss < -0.5, "best loss {best_loss}");

    let best = trainer.best().unwrap();
    assert_eq!(best.best_clusters.n_points(), 60);
    let table = trainer.export(Some("blobs")).unwrap();
    assert_eq!(table.columns().len(), 20);
    assert_eq!(table.n_rows(), 15);
}

/// Two isotropic Gaussian groups of `n_per` points centered at `+3` and `-3`.
fn gaussian_blobs(n_per: usize, dim: usize, seed: u64) -> (Vec<Vec<f32>>, Vec<i64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut normal = move || {
        // Box-Muller
        let u1 = rng.random::<f32>().max(1e-7);
        let u2 = rng.random::<f32>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
    };
    let mut data = Vec::with_capacity(2 * n_per);
    let mut labels = Vec::with_capacity(2 * n_per);
    for (label, sign) in [(0i64, 1.0f32), (1, -1.0)] {
        for _ in 0..n_per {
            data.push((0..dim).map(|_| sign * 3.0 + 0.5 * normal()).collect());
            labels.push(label);
        }
    }
    (data, labels)
}

#[test]
fn default_cost_search_finds_both_blobs() {
    let (data, truth) = gaussian_blobs(50, 8, 11);
    let strategy = CostStrategy::default();
    let mut trainer =
        ClusterTrainer::new(SearchSpace::default_space(), strategy, data, truth).unwrap();
    trainer.train(25, &mut Tpe::new(0)).unwrap();

    let best = trainer
        .logs()
        .iter()
        .min_by(|a, b| a.score.total_cmp(&b.score))
        .unwrap();
    assert_eq!(best.stats.cluster_size, 2);
    assert_eq!(best.stats.penalty, 0.0);
    assert!((best.external.adjusted_rand_score - 1.0).abs() < 1e-9);
    assert_eq!(trainer.best_params(), Some(&best.params));

    let clusters = trainer.best_clusters().unwrap();
    assert_eq!(clusters.n_clusters(), 2);
    assert_eq!(clusters.noise_count(), 0);
}

#[test]
fn same_seed_same_search() {
    let (data, truth) = two_blobs(20, 4, 5);
    let space = SearchSpace::default_space()
        .with("n_neighbors", ParameterDomain::IntRange { low: 4, high: 8 })
        .with("min_cluster_size", ParameterDomain::IntRange { low: 4, high: 10 });

    let run = || {
        let mut trainer =
            ClusterTrainer::new(space.clone(), CostStrategy::default(), data.clone(), truth.clone())
                .unwrap();
        trainer.train(5, &mut RandomSearch::new(8)).unwrap();
        trainer.logs().clone()
    };
    assert_eq!(run(), run());
}

#[test]
fn config_file_and_npy_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let (data, truth) = two_blobs(20, 4, 6);

    let flat: Vec<f32> = data.iter().flatten().copied().collect();
    let array = Array2::from_shape_vec((data.len(), 4), flat).unwrap();
    let npy = dir.path().join("emb.npy");
    write_npy(&npy, &array).unwrap();

    let config_path = dir.path().join("trainer.json");
    std::fs::write(
        &config_path,
        r#"{"strategy": "rand_score", "max_evals": 3, "algorithm": "random", "seed": 4,
            "space": {
                "n_neighbors": {"type": "int_range", "low": 4, "high": 6},
                "n_components": {"type": "int_range", "low": 2, "high": 3},
                "min_cluster_size": {"type": "int_range", "low": 4, "high": 8},
                "cluster_selection_epsilon": {"type": "uniform", "low": 0.0, "high": 0.1},
                "cluster_selection_method": {"type": "choice", "options": ["eom", "leaf"]},
                "metric": {"type": "choice", "options": ["euclidean"]}
            }}"#,
    )
    .unwrap();

    let config = TrainerConfig::from_json_file(&config_path).unwrap();
    let embeddings = load_embedding(&npy).unwrap();
    assert_eq!(embeddings, data);

    let mut trainer = config.trainer(embeddings, truth).unwrap();
    trainer
        .train(config.max_evals, config.search_algorithm().as_mut())
        .unwrap();

    let csv = dir.path().join("logs.csv");
    let table = trainer.save_logs_to_csv(&csv, None).unwrap();
    assert_eq!(table.n_rows(), 3);
    assert_eq!(std::fs::read_to_string(&csv).unwrap().lines().count(), 4);
}

#[test]
fn label_count_must_match_embeddings() {
    let (data, truth) = two_blobs(10, 3, 7);
    let err = ClusterTrainer::new(
        SearchSpace::default_space(),
        CostStrategy::default(),
        data,
        truth[..5].to_vec(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::LengthMismatch { expected: 20, found: 5 }));
}
