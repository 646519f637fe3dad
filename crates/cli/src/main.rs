mod provenance;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::fmt::SubscriberBuilder;
use tracing_subscriber::EnvFilter;
use wavefront::geojson::{parse_polygons, polygons_to_geojson, wave_polygons_to_geojson};
use wavefront::sample::{draw_area_radial, RadialCfg, ReplayToken, VertexCount};
use wavefront::{
    ManualClock, Polygon, Position, StaticArea, WaveConfig, WaveDirection, WaveFrontCalculator,
};

#[derive(Parser)]
#[command(name = "wavefront-cli")]
#[command(about = "Split event areas and replay waves over them")]
struct Cmd {
    #[command(subcommand)]
    action: Action,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Direction {
    East,
    West,
}

fn wave_config(speed: f64, direction: Direction) -> WaveConfig {
    WaveConfig {
        speed_mps: speed,
        direction: match direction {
            Direction::East => WaveDirection::East,
            Direction::West => WaveDirection::West,
        },
        ..WaveConfig::default()
    }
}

#[derive(Subcommand)]
enum Action {
    /// Cut a GeoJSON area at a longitude and write the west/east fragments
    Split {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        #[arg(long)]
        left: PathBuf,
        #[arg(long)]
        right: PathBuf,
    },
    /// Replay a wave over a GeoJSON area and print one JSON line per instant
    Simulate {
        #[arg(long)]
        input: PathBuf,
        /// Ground speed in m/s
        #[arg(long, default_value_t = 50.0)]
        speed: f64,
        #[arg(long, value_enum, default_value_t = Direction::East)]
        direction: Direction,
        /// Elapsed seconds since the start, comma separated
        #[arg(long, value_delimiter = ',', default_values_t = [0.0, 60.0, 600.0])]
        at: Vec<f64>,
        /// Observer as `lat,lng`
        #[arg(long, value_parser = parse_lat_lng, allow_negative_numbers = true)]
        observer: Option<Position>,
        /// Write the snapshot at the last instant as GeoJSON
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Draw a seeded random area and write it as GeoJSON
    Sample {
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 0)]
        index: u64,
        #[arg(long, default_value_t = 12)]
        vertices: usize,
        /// Radius in degrees
        #[arg(long, default_value_t = 0.05)]
        radius: f64,
        /// Center as `lat,lng`
        #[arg(long, value_parser = parse_lat_lng, allow_negative_numbers = true)]
        center: Option<Position>,
        #[arg(long)]
        convex: bool,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    SubscriberBuilder::default()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Split {
            input,
            lng,
            left,
            right,
        } => split(&input, lng, &left, &right),
        Action::Simulate {
            input,
            speed,
            direction,
            at,
            observer,
            out,
        } => {
            let steps = simulate(&input, wave_config(speed, direction), &at, observer, out.as_deref())?;
            for step in steps {
                println!("{}", serde_json::to_string(&step)?);
            }
            Ok(())
        }
        Action::Sample {
            seed,
            index,
            vertices,
            radius,
            center,
            convex,
            out,
        } => {
            let cfg = RadialCfg {
                vertex_count: VertexCount::Fixed(vertices),
                radius_deg: radius,
                center: center.unwrap_or(RadialCfg::default().center),
                convex,
                ..RadialCfg::default()
            };
            sample(cfg, ReplayToken { seed, index }, &out)
        }
    }
}

fn parse_lat_lng(s: &str) -> std::result::Result<Position, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `lat,lng`, got `{s}`"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude: {e}"))?;
    let lng: f64 = lng.trim().parse().map_err(|e| format!("longitude: {e}"))?;
    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {lat} out of range"));
    }
    Ok(Position::new(lat, lng))
}

fn read_area(input: &Path) -> Result<Vec<Polygon>> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let polygons =
        parse_polygons(&text).with_context(|| format!("parsing {}", input.display()))?;
    if polygons.is_empty() {
        bail!("{} contains no polygon", input.display());
    }
    Ok(polygons)
}

fn write_output(out: &Path, text: &str) -> Result<()> {
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    std::fs::write(out, text).with_context(|| format!("writing {}", out.display()))
}

fn split(input: &Path, lng: f64, left: &Path, right: &Path) -> Result<()> {
    let polygons = read_area(input)?;
    let (mut west, mut east) = (Vec::new(), Vec::new());
    for poly in &polygons {
        let res = wavefront::geo::split_by_longitude(poly, lng);
        west.extend(res.left);
        east.extend(res.right);
    }
    tracing::info!(
        input = %input.display(),
        lng,
        rings = polygons.len(),
        left = west.len(),
        right = east.len(),
        "split"
    );
    let params = json!({ "input": input, "lng": lng });
    for (path, fragments) in [(left, &west), (right, &east)] {
        write_output(path, &polygons_to_geojson(fragments)?)?;
        provenance::write_sidecar(path, "split", params.clone())?;
    }
    Ok(())
}

/// One line of `simulate` output.
#[derive(Debug, Serialize)]
struct Step {
    elapsed_s: f64,
    progression: f64,
    traversed: usize,
    remaining: usize,
    /// `[lat, lng]`
    center: [f64; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    hit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_before_hit_s: Option<f64>,
}

fn simulate(
    input: &Path,
    cfg: WaveConfig,
    at: &[f64],
    observer: Option<Position>,
    out: Option<&Path>,
) -> Result<Vec<Step>> {
    if let Some(t) = at.iter().find(|t| !(t.is_finite() && **t >= 0.0)) {
        bail!("elapsed time must be a non-negative number of seconds, got {t}");
    }
    let area = StaticArea::from_polygons(read_area(input)?)?;
    let start = Instant::now();
    let clock = Arc::new(ManualClock::new(start));
    let mut calc = WaveFrontCalculator::new(area, Arc::clone(&clock), start, cfg)?;
    if let Some(p) = observer {
        calc = calc.with_observer(move || Some(p));
    }
    tracing::info!(
        input = %input.display(),
        speed = cfg.speed_mps,
        direction = ?cfg.direction,
        duration_s = calc.wave_duration().as_secs_f64(),
        "simulate"
    );

    let mut steps = Vec::with_capacity(at.len());
    let mut last = None;
    for &t in at {
        clock.set(start + Duration::from_secs_f64(t));
        let snapshot = calc.wave_polygons();
        let center = calc.wave_front_center_position();
        steps.push(Step {
            elapsed_s: t,
            progression: calc.progression(),
            traversed: snapshot.as_ref().map_or(0, |s| s.traversed_polygons.len()),
            remaining: snapshot.as_ref().map_or(0, |s| s.remaining_polygons.len()),
            center: [center.lat, center.lng],
            hit: observer.map(|_| calc.has_user_been_hit_in_current_position()),
            time_before_hit_s: calc.time_before_user_hit().map(|d| d.as_secs_f64()),
        });
        last = snapshot;
    }

    if let Some(out) = out {
        let Some(snapshot) = last else {
            bail!("no snapshot at the last instant (wave not started)");
        };
        write_output(out, &wave_polygons_to_geojson(&snapshot)?)?;
        provenance::write_sidecar(
            out,
            "simulate",
            json!({
                "input": input,
                "speed_mps": cfg.speed_mps,
                "direction": cfg.direction,
                "at": at,
                "observer": observer.map(|p| [p.lat, p.lng]),
            }),
        )?;
    }
    Ok(steps)
}

fn sample(cfg: RadialCfg, tok: ReplayToken, out: &Path) -> Result<()> {
    let poly = draw_area_radial(cfg, tok);
    tracing::info!(seed = tok.seed, index = tok.index, vertices = poly.len(), "sample");
    write_output(out, &polygons_to_geojson(std::slice::from_ref(&poly))?)?;
    provenance::write_sidecar(
        out,
        "sample",
        json!({
            "seed": tok.seed,
            "index": tok.index,
            "radius_deg": cfg.radius_deg,
            "center": [cfg.center.lat, cfg.center.lng],
            "convex": cfg.convex,
        }),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::tempdir;

    const SQUARE: &str = r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},
        "geometry":{"type":"Polygon","coordinates":[[[0,0],[2,0],[2,2],[0,2],[0,0]]]}}]}"#;

    #[test]
    fn lat_lng_flags_parse() {
        let p = parse_lat_lng("48.85, -2.35").unwrap();
        assert_eq!((p.lat, p.lng), (48.85, -2.35));
        assert!(parse_lat_lng("48.85").is_err());
        assert!(parse_lat_lng("91,0").is_err());
    }

    #[test]
    fn direction_flag_reaches_the_wave_config() {
        let cmd = Cmd::try_parse_from([
            "wavefront-cli",
            "simulate",
            "--input",
            "area.geojson",
            "--direction",
            "west",
        ])
        .unwrap();
        let Action::Simulate {
            speed, direction, ..
        } = cmd.action
        else {
            panic!("expected simulate");
        };
        let cfg = wave_config(speed, direction);
        assert_eq!(cfg.direction, WaveDirection::West);
        assert_eq!(cfg.speed_mps, 50.0);
        assert_eq!(wave_config(speed, Direction::East).direction, WaveDirection::East);
    }

    #[test]
    fn split_writes_both_sides_with_sidecars() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("area.geojson");
        std::fs::write(&input, SQUARE).unwrap();
        let left = dir.path().join("out/left.geojson");
        let right = dir.path().join("out/right.geojson");
        split(&input, 1.0, &left, &right).unwrap();

        let west = parse_polygons(&std::fs::read_to_string(&left).unwrap()).unwrap();
        let east = parse_polygons(&std::fs::read_to_string(&right).unwrap()).unwrap();
        assert_eq!(west.len(), 1);
        assert_eq!(east.len(), 1);
        assert!((west[0].area() - 2.0).abs() < 1e-9);
        assert!(dir.path().join("out/left.provenance.json").exists());
        assert!(dir.path().join("out/right.provenance.json").exists());
    }

    #[test]
    fn simulate_reports_progress_and_writes_snapshot() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("area.geojson");
        std::fs::write(&input, SQUARE).unwrap();
        let out = dir.path().join("wave.geojson");
        let cfg = WaveConfig {
            speed_mps: 1000.0,
            ..WaveConfig::default()
        };
        let steps = simulate(
            &input,
            cfg,
            &[0.0, 60.0, 1e6],
            Some(Position::new(1.0, 1.0)),
            Some(&out),
        )
        .unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].progression, 0.0);
        assert_eq!(steps[0].hit, Some(false));
        assert!(steps[1].progression > 0.0 && steps[1].progression < 100.0);
        assert_eq!(steps[2].progression, 100.0);
        assert_eq!(steps[2].remaining, 0);
        assert_eq!(steps[2].hit, Some(true));

        let v: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(v["features"][0]["properties"]["state"], "traversed");
        assert!(dir.path().join("wave.provenance.json").exists());
    }

    #[test]
    fn simulate_rejects_negative_times() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("area.geojson");
        std::fs::write(&input, SQUARE).unwrap();
        assert!(simulate(&input, WaveConfig::default(), &[-1.0], None, None).is_err());
    }

    #[test]
    fn sample_is_reproducible() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.geojson");
        let b = dir.path().join("b.geojson");
        let tok = ReplayToken { seed: 5, index: 2 };
        sample(RadialCfg::default(), tok, &a).unwrap();
        sample(RadialCfg::default(), tok, &b).unwrap();
        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
        assert_eq!(parse_polygons(&std::fs::read_to_string(&a).unwrap()).unwrap().len(), 1);
    }
}
