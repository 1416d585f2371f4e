use clap::Parser;
use screenmatch::io::load_rgb_image;
use screenmatch::{
    AnnotatedImageSink, ConsensusConfig, Match, MatchConfig, MatchMethod, Matcher,
    PreprocessConfig, QualityConfig, QualityGate, ScoreWeights,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "ScreenMatch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for the search stages.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum MethodConfig {
    Zncc,
    Ncc,
    SqdiffNormed,
}

impl From<MethodConfig> for MatchMethod {
    fn from(value: MethodConfig) -> Self {
        match value {
            MethodConfig::Zncc => MatchMethod::Zncc,
            MethodConfig::Ncc => MatchMethod::Ncc,
            MethodConfig::SqdiffNormed => MatchMethod::SqDiffNormed,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PreprocessConfigJson {
    clip_limit: f32,
    tile_grid: [usize; 2],
    blur: bool,
    cache_capacity: usize,
}

impl Default for PreprocessConfigJson {
    fn default() -> Self {
        let cfg = PreprocessConfig::default();
        Self {
            clip_limit: cfg.clip_limit,
            tile_grid: [cfg.tile_grid.0, cfg.tile_grid.1],
            blur: cfg.blur,
            cache_capacity: cfg.cache_capacity,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct QualityConfigJson {
    block_radius: usize,
    offset: f32,
    canny_low: f32,
    canny_high: f32,
    histogram_bins: usize,
    contour_blend: bool,
    early_exit_below: Option<f32>,
}

impl Default for QualityConfigJson {
    fn default() -> Self {
        let cfg = QualityConfig::default();
        Self {
            block_radius: cfg.block_radius,
            offset: cfg.offset,
            canny_low: cfg.canny_low,
            canny_high: cfg.canny_high,
            histogram_bins: cfg.histogram_bins,
            contour_blend: cfg.contour_blend,
            early_exit_below: cfg.early_exit_below,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct WeightsJson {
    structural: f32,
    edge: f32,
    confidence: f32,
    histogram: f32,
}

impl Default for WeightsJson {
    fn default() -> Self {
        let w = ScoreWeights::default();
        Self {
            structural: w.structural,
            edge: w.edge,
            confidence: w.confidence,
            histogram: w.histogram,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GateJson {
    min_confidence: Option<f32>,
    min_structural: Option<f32>,
    min_edge: Option<f32>,
    min_pixel: Option<f32>,
    min_histogram: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MatchConfigJson {
    scales: Vec<f32>,
    methods: Vec<MethodConfig>,
    min_score: f32,
    min_var_i: f64,
    parallel: bool,
    distance_threshold: f32,
    min_consensus: usize,
    require_distinct_methods: bool,
    weights: WeightsJson,
    gate: GateJson,
}

impl Default for MatchConfigJson {
    fn default() -> Self {
        let cfg = MatchConfig::default();
        Self {
            scales: cfg.scales,
            methods: vec![MethodConfig::Zncc, MethodConfig::SqdiffNormed],
            min_score: cfg.min_score,
            min_var_i: cfg.min_var_i,
            parallel: cfg.parallel,
            distance_threshold: cfg.consensus.distance_threshold,
            min_consensus: cfg.consensus.min_consensus,
            require_distinct_methods: cfg.consensus.require_distinct_methods,
            weights: WeightsJson::default(),
            gate: GateJson::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    source_path: String,
    target_path: String,
    output_path: Option<String>,
    debug_dir: Option<String>,
    preprocess: PreprocessConfigJson,
    quality: QualityConfigJson,
    #[serde(rename = "match")]
    match_cfg: MatchConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_path: String::new(),
            target_path: String::new(),
            output_path: None,
            debug_dir: None,
            preprocess: PreprocessConfigJson::default(),
            quality: QualityConfigJson::default(),
            match_cfg: MatchConfigJson::default(),
        }
    }
}

impl Config {
    fn to_match_config(&self) -> MatchConfig {
        let m = &self.match_cfg;
        MatchConfig {
            scales: m.scales.clone(),
            methods: m.methods.iter().copied().map(MatchMethod::from).collect(),
            min_score: m.min_score,
            min_var_i: m.min_var_i,
            parallel: m.parallel,
            preprocess: PreprocessConfig {
                clip_limit: self.preprocess.clip_limit,
                tile_grid: (self.preprocess.tile_grid[0], self.preprocess.tile_grid[1]),
                blur: self.preprocess.blur,
                cache_capacity: self.preprocess.cache_capacity,
            },
            quality: QualityConfig {
                block_radius: self.quality.block_radius,
                offset: self.quality.offset,
                canny_low: self.quality.canny_low,
                canny_high: self.quality.canny_high,
                histogram_bins: self.quality.histogram_bins,
                contour_blend: self.quality.contour_blend,
                early_exit_below: self.quality.early_exit_below,
            },
            consensus: ConsensusConfig {
                distance_threshold: m.distance_threshold,
                min_consensus: m.min_consensus,
                require_distinct_methods: m.require_distinct_methods,
                weights: ScoreWeights {
                    structural: m.weights.structural,
                    edge: m.weights.edge,
                    confidence: m.weights.confidence,
                    histogram: m.weights.histogram,
                },
            },
            gate: QualityGate {
                min_confidence: m.gate.min_confidence,
                min_structural: m.gate.min_structural,
                min_edge: m.gate.min_edge,
                min_pixel: m.gate.min_pixel,
                min_histogram: m.gate.min_histogram,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct QualityRecord {
    structural_similarity: f32,
    pixel_difference: f32,
    edge_similarity: f32,
    histogram_similarity: f32,
}

#[derive(Debug, Serialize)]
struct MatchRecord {
    x: f32,
    y: f32,
    width: usize,
    height: usize,
    center_x: f32,
    center_y: f32,
    confidence: f32,
    method: &'static str,
    scale: f32,
    consensus_count: usize,
    score: f32,
    quality: QualityRecord,
}

impl From<Match> for MatchRecord {
    fn from(value: Match) -> Self {
        Self {
            x: value.x,
            y: value.y,
            width: value.width,
            height: value.height,
            center_x: value.center_x(),
            center_y: value.center_y(),
            confidence: value.confidence,
            method: value.method.name(),
            scale: value.scale,
            consensus_count: value.consensus_count,
            score: value.score,
            quality: QualityRecord {
                structural_similarity: value.quality.structural_similarity,
                pixel_difference: value.quality.pixel_difference,
                edge_similarity: value.quality.edge_similarity,
                histogram_similarity: value.quality.histogram_similarity,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    best: Option<MatchRecord>,
    matches: Vec<MatchRecord>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("screenmatch=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.source_path.is_empty() || config.target_path.is_empty() {
        return Err("source_path and target_path must be set in the config".into());
    }

    let source = load_rgb_image(&config.source_path)?;
    let target = load_rgb_image(&config.target_path)?;

    let mut matcher = Matcher::new(config.to_match_config());
    if let Some(dir) = &config.debug_dir {
        fs::create_dir_all(dir)?;
        matcher = matcher.with_debug_sink(Box::new(AnnotatedImageSink::new(dir)));
    }

    let matches = matcher.find_matches(&source, &target)?;
    tracing::info!(count = matches.len(), "search finished");

    let best = matches.first().copied().map(MatchRecord::from);
    let matches = matches.into_iter().map(MatchRecord::from).collect();
    let output = Output { best, matches };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
