use std::sync::Arc;
use std::time::{Duration, Instant};

use super::*;
use crate::consts::MIN_WAVE_DURATION;
use crate::error::GeoError;
use crate::geo::util::{calculate_distance, meters_per_degree_longitude};
use crate::geo::{BoundingBox, Polygon, Position, Side};
use approx::assert_relative_eq;
use proptest::prelude::*;

const SPEED: f64 = 100.0;

fn area_box() -> BoundingBox {
    BoundingBox::from_corners(10.0, 20.0, 15.0, 30.0)
}

/// Calculator over the placeholder rectangle of `area_box`, clock parked at start.
fn setup(
    direction: WaveDirection,
) -> (
    WaveFrontCalculator<Arc<StaticArea>, Arc<ManualClock>>,
    Arc<StaticArea>,
    Arc<ManualClock>,
    Instant,
) {
    let start = Instant::now();
    let area = Arc::new(StaticArea::placeholder(area_box()));
    let clock = Arc::new(ManualClock::new(start));
    let cfg = WaveConfig {
        speed_mps: SPEED,
        direction,
        ..WaveConfig::default()
    };
    let calc = WaveFrontCalculator::new(Arc::clone(&area), Arc::clone(&clock), start, cfg).unwrap();
    (calc, area, clock, start)
}

fn expected_duration() -> Duration {
    Duration::from_secs_f64(calculate_distance(20.0, 30.0, 10.0) / SPEED)
}

fn total_area(polys: &[Polygon]) -> f64 {
    polys.iter().map(Polygon::area).sum()
}

#[test]
fn config_is_validated() {
    let start = Instant::now();
    let bad_speed = WaveConfig {
        speed_mps: 0.0,
        ..WaveConfig::default()
    };
    assert!(matches!(
        WaveFrontCalculator::new(
            StaticArea::placeholder(area_box()),
            ManualClock::new(start),
            start,
            bad_speed
        ),
        Err(GeoError::InvalidSpeed { .. })
    ));
    let bad_samples = WaveConfig {
        front_samples: 1,
        ..WaveConfig::default()
    };
    assert!(matches!(
        bad_samples.validate(),
        Err(GeoError::InvalidSampling { samples: 1 })
    ));
    assert!(WaveConfig::default().validate().is_ok());
}

#[test]
fn nothing_happens_before_start() {
    let (calc, _, _, _) = setup(WaveDirection::East);
    assert!(!calc.has_started());
    assert_eq!(calc.elapsed(), Duration::ZERO);
    assert_eq!(calc.progression(), 0.0);
    assert!(calc.wave_polygons().is_none());
    assert!(!calc.is_running());
    assert!(!calc.is_done());
    assert!(!calc.has_been_hit(&Position::new(12.0, 20.5)));
}

#[test]
fn duration_uses_the_widest_parallel() {
    let (calc, _, _, _) = setup(WaveDirection::East);
    assert_relative_eq!(
        calc.max_east_west_distance(),
        calculate_distance(20.0, 30.0, 10.0),
        max_relative = 1e-12
    );
    let d = calc.wave_duration();
    assert_relative_eq!(d.as_secs_f64(), expected_duration().as_secs_f64(), max_relative = 1e-9);
    // cached
    assert_eq!(calc.wave_duration(), d);
    calc.clear_duration_cache();
    assert_eq!(calc.wave_duration(), d);
}

#[test]
fn wide_area_is_crossed_the_long_way() {
    let start = Instant::now();
    let wide = BoundingBox::from_corners(0.0, -170.0, 10.0, 170.0);
    let clock = Arc::new(ManualClock::new(start));
    let cfg = WaveConfig {
        speed_mps: SPEED,
        ..WaveConfig::default()
    };
    let calc =
        WaveFrontCalculator::new(StaticArea::placeholder(wide), Arc::clone(&clock), start, cfg)
            .unwrap();
    let expected = 340.0 * meters_per_degree_longitude(0.0);
    assert_relative_eq!(calc.max_east_west_distance(), expected, max_relative = 1e-12);

    clock.advance(Duration::from_secs_f64(expected / SPEED / 2.0));
    assert_relative_eq!(calc.progression(), 50.0, epsilon = 1e-6);
    assert_relative_eq!(calc.current_wave_longitude(), 0.0, epsilon = 1e-6);
    assert!(calc.has_been_hit(&Position::new(5.0, -5.0)));
    assert!(!calc.has_been_hit(&Position::new(5.0, 5.0)));
}

#[test]
fn degenerate_area_still_has_a_duration() {
    let start = Instant::now();
    let point = BoundingBox::from_corners(1.0, 1.0, 1.0, 1.0);
    let calc = WaveFrontCalculator::new(
        StaticArea::new(point, Vec::new()),
        ManualClock::new(start),
        start,
        WaveConfig::default(),
    )
    .unwrap();
    assert_eq!(calc.wave_duration(), MIN_WAVE_DURATION);
}

#[test]
fn progression_tracks_elapsed_time() {
    let (calc, _, clock, _) = setup(WaveDirection::East);
    let d = expected_duration();
    clock.advance(d / 2);
    assert!(calc.is_running());
    assert_relative_eq!(calc.progression(), 50.0, epsilon = 1e-6);
    clock.advance(d * 2);
    assert_eq!(calc.progression(), 100.0);
    assert!(calc.is_done());
    assert!(!calc.is_running());
}

#[test]
fn front_bends_towards_the_pole() {
    let (calc, _, clock, _) = setup(WaveDirection::East);
    clock.advance(expected_duration() / 2);
    let south = calc.closest_wave_longitude(10.0);
    let north = calc.closest_wave_longitude(15.0);
    assert_relative_eq!(south, 25.0, epsilon = 1e-6);
    assert!(north > south);
    assert!(north <= 30.0);
    // widest parallel of a northern box is its southern edge
    assert_relative_eq!(calc.current_wave_longitude(), south);

    let line = calc.wave_front_line().unwrap();
    assert_eq!(line.len(), WaveConfig::default().front_samples);
    assert_relative_eq!(line.positions()[0].lat, 10.0);
    assert_relative_eq!(line.positions()[line.len() - 1].lat, 15.0);
}

#[test]
fn front_after_ten_minutes_on_the_mid_parallel() {
    let (calc, _, clock, _) = setup(WaveDirection::East);
    clock.advance(Duration::from_secs(600));
    let span = calculate_distance(20.0, 30.0, 12.5);
    let expected = 20.0 + (SPEED * 600.0 / span) * (30.0 - 20.0);
    assert_relative_eq!(calc.closest_wave_longitude(12.5), expected, epsilon = 1e-9);
    assert_relative_eq!(expected, 20.552, epsilon = 1e-3);
}

#[test]
fn westward_front_starts_on_the_east_edge() {
    let (calc, _, clock, _) = setup(WaveDirection::West);
    clock.advance(Duration::from_millis(1));
    assert!(calc.closest_wave_longitude(12.0) > 29.99);
    clock.advance(expected_duration() / 2);
    assert!(calc.closest_wave_longitude(10.0) < 25.0 + 1e-3);
}

#[test]
fn front_line_includes_the_equator_when_crossed() {
    let start = Instant::now();
    let bbox = BoundingBox::from_corners(-1.3, 0.0, 2.0, 1.0);
    let cfg = WaveConfig {
        front_samples: 4,
        ..WaveConfig::default()
    };
    let calc = WaveFrontCalculator::new(
        StaticArea::placeholder(bbox),
        ManualClock::new(start + Duration::from_secs(5)),
        start,
        cfg,
    )
    .unwrap();
    let line = calc.wave_front_line().unwrap();
    assert_eq!(line.len(), 5);
    assert!(line.positions().iter().any(|p| p.lat == 0.0));
}

#[test]
fn snapshot_splits_the_area_at_the_front() {
    let (calc, _, clock, _) = setup(WaveDirection::East);
    clock.advance(expected_duration() / 2);
    let snap = calc.wave_polygons().unwrap();
    assert_eq!(snap.mode, MergeMode::Recompose);
    assert_eq!(snap.traversed_polygons.len(), 1);
    assert_eq!(snap.remaining_polygons.len(), 1);
    let traversed = total_area(&snap.traversed_polygons);
    let remaining = total_area(&snap.remaining_polygons);
    assert_relative_eq!(traversed + remaining, 50.0, epsilon = 1e-6);
    // the bent front has covered a bit more than half the rectangle
    assert!(traversed > 25.0 && traversed < 26.0, "traversed {traversed}");
    let cut = snap.cut_id.unwrap();
    assert!(snap
        .traversed_polygons
        .iter()
        .all(|p| p.side() == Some(Side::Left(cut))));
    assert!(snap
        .remaining_polygons
        .iter()
        .all(|p| p.side() == Some(Side::Right(cut))));

    // same instant: same snapshot
    let again = calc.wave_polygons().unwrap();
    assert!(Arc::ptr_eq(&snap, &again));
}

#[test]
fn westward_snapshot_traverses_the_east_side() {
    let (calc, _, clock, _) = setup(WaveDirection::West);
    clock.advance(expected_duration() / 10);
    let snap = calc.wave_polygons().unwrap();
    let traversed = total_area(&snap.traversed_polygons);
    assert!(traversed > 4.9 && traversed < 5.2, "traversed {traversed}");
    assert!(snap
        .traversed_polygons
        .iter()
        .all(|p| matches!(p.side(), Some(Side::Right(_)))));
}

#[test]
fn forward_steps_add_and_geometry_changes_recompose() {
    let (calc, area, clock, start) = setup(WaveDirection::East);
    let d = expected_duration();
    clock.advance(d / 4);
    assert_eq!(calc.wave_polygons().unwrap().mode, MergeMode::Recompose);

    clock.advance(d / 4);
    let second = calc.wave_polygons().unwrap();
    assert_eq!(second.mode, MergeMode::Add);
    assert_eq!(second.traversed_polygons.len(), 2);
    assert_relative_eq!(
        total_area(&second.traversed_polygons) + total_area(&second.remaining_polygons),
        50.0,
        epsilon = 1e-6
    );

    clock.advance(d / 4);
    let third = calc.wave_polygons().unwrap();
    assert_eq!(third.mode, MergeMode::Add);
    assert_eq!(third.traversed_polygons.len(), 3);

    // time going backwards rebuilds from the area
    clock.set(start + d / 4);
    let back = calc.wave_polygons().unwrap();
    assert_eq!(back.mode, MergeMode::Recompose);
    assert_eq!(back.traversed_polygons.len(), 1);

    clock.advance(d / 4);
    area.set_polygons(vec![bbox_ring(&area_box())]);
    assert_eq!(calc.wave_polygons().unwrap().mode, MergeMode::Recompose);

    clock.advance(d / 4);
    calc.invalidate_geometry();
    assert_eq!(calc.wave_polygons().unwrap().mode, MergeMode::Recompose);
}

#[test]
fn no_rings_means_no_snapshot() {
    let start = Instant::now();
    let calc = WaveFrontCalculator::new(
        StaticArea::new(area_box(), Vec::new()),
        ManualClock::new(start + Duration::from_secs(10)),
        start,
        WaveConfig::default(),
    )
    .unwrap();
    assert!(calc.wave_polygons().is_none());
}

#[test]
fn completed_wave_traverses_everything() {
    let (calc, _, clock, _) = setup(WaveDirection::East);
    clock.advance(expected_duration() * 2);
    let snap = calc.wave_polygons().unwrap();
    assert!(snap.remaining_polygons.is_empty());
    assert_relative_eq!(total_area(&snap.traversed_polygons), 50.0, epsilon = 1e-9);
}

#[test]
fn observer_is_hit_when_the_front_passes() {
    let (calc, _, clock, start) = setup(WaveDirection::East);
    let obs = Position::new(12.0, 25.0);
    let travel = 0.5 * calculate_distance(20.0, 30.0, 12.0) / SPEED;

    let at = calc.hit_instant(&obs).unwrap();
    assert_relative_eq!((at - start).as_secs_f64(), travel, epsilon = 1e-6);
    let before = calc.time_before_hit(&obs).unwrap();
    assert_relative_eq!(before.as_secs_f64(), travel, epsilon = 1e-6);
    assert!(!calc.has_been_hit(&obs));

    clock.advance(Duration::from_secs_f64(travel - 1.0));
    assert!(!calc.has_been_hit(&obs));
    assert_relative_eq!(calc.time_before_hit(&obs).unwrap().as_secs_f64(), 1.0, epsilon = 1e-6);

    clock.advance(Duration::from_secs(2));
    assert!(calc.has_been_hit(&obs));
    assert_eq!(calc.time_before_hit(&obs), Some(Duration::ZERO));
}

#[test]
fn observer_outside_the_area_is_never_hit() {
    let (calc, _, clock, _) = setup(WaveDirection::East);
    clock.advance(expected_duration() * 2);
    assert!(!calc.has_been_hit(&Position::new(20.0, 25.0)));
    assert!(calc.has_been_hit(&Position::new(14.0, 29.0)));
}

#[test]
fn user_queries_follow_the_observer_source() {
    let (calc, _, clock, _) = setup(WaveDirection::East);
    assert_eq!(calc.time_before_user_hit(), None);
    assert!(!calc.has_user_been_hit_in_current_position());

    let calc = calc.with_observer(|| Some(Position::new(11.0, 21.0)));
    assert!(calc.time_before_user_hit().unwrap() > Duration::ZERO);
    clock.advance(expected_duration());
    assert!(calc.has_user_been_hit_in_current_position());
    assert_eq!(calc.time_before_user_hit(), Some(Duration::ZERO));
}

#[test]
fn front_center_sits_on_the_front() {
    let (calc, _, clock, _) = setup(WaveDirection::East);
    clock.advance(expected_duration() / 2);
    let c = calc.wave_front_center_position();
    assert!(c.lat >= 10.0 && c.lat <= 15.0);
    assert_relative_eq!(c.lng, calc.closest_wave_longitude(c.lat), epsilon = 1e-12);

    let calc = calc.with_observer(|| Some(Position::new(12.0, 29.0)));
    let c = calc.wave_front_center_position();
    assert_relative_eq!(c.lat, 12.0);
}

#[test]
fn front_center_before_start_uses_the_box_center() {
    let (calc, _, _, _) = setup(WaveDirection::East);
    let c = calc.wave_front_center_position();
    assert_relative_eq!(c.lat, 12.5);
    assert_relative_eq!(c.lng, 20.0);
}

proptest! {
    #[test]
    fn progression_is_monotone_and_clamped(
        steps in prop::collection::vec(0u64..5_000, 1..20),
    ) {
        let (calc, _, clock, _) = setup(WaveDirection::East);
        let mut last = calc.progression();
        for s in steps {
            clock.advance(Duration::from_secs(s));
            let p = calc.progression();
            prop_assert!((0.0..=100.0).contains(&p));
            prop_assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn distance_is_symmetric(a in -180.0f64..180.0, b in -180.0f64..180.0, lat in -89.0f64..89.0) {
        prop_assert_eq!(calculate_distance(a, b, lat), calculate_distance(b, a, lat));
        prop_assert!(calculate_distance(a, b, lat) >= 0.0);
    }

    #[test]
    fn snapshots_conserve_area(frac in 0.01f64..0.99) {
        let (calc, _, clock, _) = setup(WaveDirection::East);
        clock.advance(expected_duration().mul_f64(frac));
        let snap = calc.wave_polygons().unwrap();
        let total = total_area(&snap.traversed_polygons) + total_area(&snap.remaining_polygons);
        prop_assert!((total - 50.0).abs() < 1e-6, "total {}", total);
    }
}
