use screenmatch::lowlevel::{reduce, Candidate, ScoredCandidate};
use screenmatch::{ConsensusConfig, MatchMethod, MatchQuality, ScoreWeights};

fn quality(structural: f32, edge: f32, histogram: f32) -> MatchQuality {
    MatchQuality {
        structural_similarity: structural,
        pixel_difference: 0.5,
        edge_similarity: edge,
        histogram_similarity: histogram,
    }
}

fn candidate(x: usize, y: usize, method: MatchMethod, scale: f32, confidence: f32) -> Candidate {
    Candidate {
        x,
        y,
        width: 24,
        height: 24,
        confidence,
        method,
        scale,
    }
}

#[test]
fn close_copies_merge_into_one_match_at_mean_center() {
    // Two copies 5px apart, each seen by two methods.
    let q = quality(0.9, 0.8, 0.9);
    let cands = vec![
        ScoredCandidate::new(candidate(50, 40, MatchMethod::Zncc, 1.0, 0.97), q),
        ScoredCandidate::new(candidate(50, 40, MatchMethod::SqDiffNormed, 1.0, 0.95), q),
        ScoredCandidate::new(candidate(55, 40, MatchMethod::Zncc, 1.0, 0.96), q),
        ScoredCandidate::new(candidate(55, 40, MatchMethod::SqDiffNormed, 1.0, 0.94), q),
    ];

    let out = reduce(&cands, &ConsensusConfig::default());
    assert_eq!(out.len(), 1);
    let m = out[0];
    assert_eq!(m.consensus_count, 4);
    let expected_cx = ((50.0 + 12.0) + (55.0 + 12.0)) / 2.0;
    assert!((m.center_x() - expected_cx).abs() < 1e-4);
    assert!((m.center_y() - 52.0).abs() < 1e-4);
    assert_eq!(m.method, MatchMethod::Zncc);
    assert_eq!(m.confidence, 0.97);
}

#[test]
fn same_method_pair_is_valid_consensus() {
    let q = quality(0.8, 0.7, 0.6);
    let cands = vec![
        ScoredCandidate::new(candidate(10, 10, MatchMethod::Zncc, 0.95, 0.9), q),
        ScoredCandidate::new(candidate(11, 10, MatchMethod::Zncc, 1.05, 0.9), q),
    ];
    let out = reduce(&cands, &ConsensusConfig::default());
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].consensus_count, 2);
    assert!((out[0].scale - 1.0).abs() < 1e-6);
    assert_eq!(out[0].x, 10.5);
}

#[test]
fn distinct_method_requirement_is_opt_in() {
    let q = quality(0.8, 0.7, 0.6);
    let cands = vec![
        ScoredCandidate::new(candidate(10, 10, MatchMethod::Zncc, 1.0, 0.9), q),
        ScoredCandidate::new(candidate(12, 11, MatchMethod::Zncc, 1.05, 0.9), q),
        ScoredCandidate::new(candidate(200, 10, MatchMethod::Zncc, 1.0, 0.9), q),
        ScoredCandidate::new(candidate(201, 10, MatchMethod::Ncc, 1.0, 0.9), q),
    ];
    let strict = ConsensusConfig {
        require_distinct_methods: true,
        ..ConsensusConfig::default()
    };
    assert_eq!(reduce(&cands, &ConsensusConfig::default()).len(), 2);
    let out = reduce(&cands, &strict);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].x, 200.5);
}

#[test]
fn larger_min_consensus_drops_small_groups() {
    let q = quality(0.8, 0.7, 0.6);
    let cands = vec![
        ScoredCandidate::new(candidate(10, 10, MatchMethod::Zncc, 1.0, 0.9), q),
        ScoredCandidate::new(candidate(10, 10, MatchMethod::SqDiffNormed, 1.0, 0.9), q),
        ScoredCandidate::new(candidate(100, 10, MatchMethod::Zncc, 0.95, 0.9), q),
        ScoredCandidate::new(candidate(100, 10, MatchMethod::Zncc, 1.0, 0.9), q),
        ScoredCandidate::new(candidate(100, 10, MatchMethod::SqDiffNormed, 1.0, 0.9), q),
    ];
    let cfg = ConsensusConfig {
        min_consensus: 3,
        ..ConsensusConfig::default()
    };
    let out = reduce(&cands, &cfg);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].consensus_count, 3);
    assert_eq!(out[0].x, 100.0);
}

#[test]
fn custom_weights_change_the_representative() {
    // One member wins on confidence, the other on structure.
    let cands = vec![
        ScoredCandidate::new(
            candidate(10, 10, MatchMethod::Zncc, 1.0, 0.99),
            quality(0.2, 0.2, 0.2),
        ),
        ScoredCandidate::new(
            candidate(12, 10, MatchMethod::SqDiffNormed, 1.0, 0.81),
            quality(0.95, 0.95, 0.95),
        ),
    ];

    let by_default = reduce(&cands, &ConsensusConfig::default());
    assert_eq!(by_default[0].method, MatchMethod::SqDiffNormed);

    let confidence_only = ConsensusConfig {
        weights: ScoreWeights {
            structural: 0.0,
            edge: 0.0,
            confidence: 1.0,
            histogram: 0.0,
        },
        ..ConsensusConfig::default()
    };
    let by_confidence = reduce(&cands, &confidence_only);
    assert_eq!(by_confidence[0].method, MatchMethod::Zncc);
    assert_eq!(by_confidence[0].score, 0.99);
}

#[test]
fn ties_keep_group_order() {
    let q = quality(0.5, 0.5, 0.5);
    let cands = vec![
        ScoredCandidate::new(candidate(300, 0, MatchMethod::Zncc, 1.0, 0.9), q),
        ScoredCandidate::new(candidate(301, 0, MatchMethod::SqDiffNormed, 1.0, 0.9), q),
        ScoredCandidate::new(candidate(0, 0, MatchMethod::Zncc, 1.0, 0.9), q),
        ScoredCandidate::new(candidate(1, 0, MatchMethod::SqDiffNormed, 1.0, 0.9), q),
    ];
    let out = reduce(&cands, &ConsensusConfig::default());
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].score, out[1].score);
    assert_eq!(out[0].x, 0.5);
    assert_eq!(out[1].x, 300.5);
}

#[test]
fn empty_input_yields_empty_output() {
    assert!(reduce(&[], &ConsensusConfig::default()).is_empty());
}
