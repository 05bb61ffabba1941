use hexwave::visual::{
    build_stars, length_factor, out_of_bounds, population, star_angle, step_star, Star, Viewport,
};

const VIEW: Viewport = Viewport {
    width: 800,
    height: 600,
};
const MARGIN: f32 = 500.0;

fn assert_angle_consistent(star: &Star) {
    let expected = (star.y.abs() / star.x.abs()).atan();
    if star.x != 0.0 {
        assert!((star.angle - expected).abs() < 1e-5, "{star:?}");
    }
    assert!((0.0..=std::f32::consts::FRAC_PI_2).contains(&star.angle));
}

fn assert_in_central_third(star: &Star) {
    assert!(star.x.abs() <= VIEW.w() / 6.0, "{star:?}");
    assert!(star.y.abs() <= VIEW.h() / 6.0, "{star:?}");
}

#[test]
fn population_scales_with_width() {
    assert_eq!(population(VIEW, 15.0), 54);
    assert_eq!(population(Viewport::new(1600, 300), 15.0), 107);

    let mut rng = fastrand::Rng::with_seed(3);
    let stars = build_stars(VIEW, 15.0, &mut rng);
    assert_eq!(stars.len(), 54);
    for s in &stars {
        assert!(s.x.abs() <= 400.0 && s.y.abs() <= 300.0);
        assert!(s.size >= 0.3 && s.size <= 3.3);
        assert_eq!(s.high, 0.0);
        assert_angle_consistent(s);
    }
}

#[test]
fn star_angle_is_zero_at_centre() {
    assert_eq!(star_angle(0.0, 0.0), 0.0);
    assert!((star_angle(-3.0, 3.0) - std::f32::consts::FRAC_PI_4).abs() < 1e-6);
}

#[test]
fn star_past_the_margin_respawns_near_centre() {
    let mut rng = fastrand::Rng::with_seed(11);
    for start in [(401.0 + MARGIN, 0.0), (-10.0, -(301.0 + MARGIN)), (950.0, 850.0)] {
        let mut star = Star::new(start.0, start.1, 2.0);
        assert!(out_of_bounds(&star, VIEW, MARGIN));
        step_star(&mut star, 0.0, VIEW, MARGIN, &mut rng);
        assert_in_central_third(&star);
        assert_angle_consistent(&star);
        assert_eq!(star.size, 2.0);
    }
}

#[test]
fn star_inside_bounds_keeps_flying_outward() {
    let mut rng = fastrand::Rng::with_seed(5);
    let mut star = Star::new(-30.0, 40.0, 1.5);
    let before = star.distance();
    step_star(&mut star, 0.0, VIEW, MARGIN, &mut rng);
    assert!(star.distance() > before);
    assert!(star.x < 0.0 && star.y > 0.0);
}

#[test]
fn streak_starts_at_pre_move_position() {
    let mut rng = fastrand::Rng::with_seed(1);
    let mut star = Star::new(100.0, -50.0, 1.0);
    star.high = 5.0;
    let streak = step_star(&mut star, 4000.0, VIEW, MARGIN, &mut rng);
    assert_eq!(streak.from, (100.0, -50.0));
    // Streak points back toward the centre.
    assert!(streak.to.0 < 100.0 && streak.to.1 > -50.0);
    assert_eq!(streak.brightness, 225);
    assert!(star.high < 5.0);
}

#[test]
fn streak_length_never_exceeds_distance() {
    for d in [0.0f32, 1.0, 50.0, 300.0, 900.0] {
        for v in [0.0f32, 1_000.0, 10_000.0, 50_000.0] {
            let l = length_factor(d, v);
            assert!(l >= 1.0);
            assert!(l <= 1.0 + d + 1e-3, "d={d} v={v} l={l}");
        }
    }
}

#[test]
fn population_is_stable_under_many_steps() {
    let mut rng = fastrand::Rng::with_seed(9);
    let mut stars = build_stars(VIEW, 15.0, &mut rng);
    let n = stars.len();
    for _ in 0..500 {
        for s in stars.iter_mut() {
            step_star(s, 12_000.0, VIEW, MARGIN, &mut rng);
            assert!(!out_of_bounds(s, VIEW, MARGIN));
        }
    }
    assert_eq!(stars.len(), n);
}
