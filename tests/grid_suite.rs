use hexwave::visual::{
    apply_envelope, axial_layout, band_index, build_grid, chaos_factor, distort_offset,
    paint_highlight, rotate_tiles, rotate_vertex, rotation_angle, shade_tile, tile_alpha,
    tile_color, tile_count, Canvas, GeometryError, Tile,
};
use std::collections::HashSet;

#[test]
fn grid_generation_is_deterministic() {
    let a = build_grid(4, 12.0).unwrap();
    let b = build_grid(4, 12.0).unwrap();
    assert_eq!(a, b);
}

#[test]
fn tile_count_follows_hexagonal_rings() {
    for n in 1..=6u32 {
        let expected = 1 + 3 * n as usize * (n as usize + 1);
        assert_eq!(tile_count(n), expected);

        let tiles = build_grid(n, 10.0).unwrap();
        assert_eq!(tiles.len(), expected, "rings={n}");
        let unique = tiles.iter().map(|t| t.axial).collect::<HashSet<_>>();
        assert_eq!(unique.len(), expected, "duplicate coordinates for rings={n}");
        assert!(tiles.iter().enumerate().all(|(i, t)| t.num == i));
    }
}

#[test]
fn first_ring_order() {
    assert_eq!(
        axial_layout(1).unwrap(),
        vec![(0, 0), (0, 1), (0, -1), (1, -1), (-1, 1), (1, 0), (-1, 0)]
    );
}

#[test]
fn invalid_geometry_is_rejected() {
    assert_eq!(build_grid(0, 10.0), Err(GeometryError::InvalidRingCount(0)));
    assert_eq!(build_grid(3, 0.0), Err(GeometryError::InvalidTileSize(0.0)));
    assert_eq!(build_grid(3, -4.0), Err(GeometryError::InvalidTileSize(-4.0)));
    assert!(matches!(
        build_grid(3, f32::NAN),
        Err(GeometryError::InvalidTileSize(_))
    ));
}

#[test]
fn outer_tiles_decay_faster() {
    let tiles = build_grid(6, 10.0).unwrap();
    assert_eq!(tiles[42].decay, 2.0);
    assert_eq!(tiles[43].decay, 1.5);
    assert!(!tiles[42].is_outer());
    assert!(tiles[43].is_outer());
}

#[test]
fn centre_tile_is_centred() {
    let tile = Tile::new(0, (0, 0), 20.0);
    assert_eq!(tile.center, (0.0, 0.0));
    for v in tile.vertices {
        assert!(((v.0 * v.0 + v.1 * v.1).sqrt() - 20.0).abs() < 1e-3);
    }
}

#[test]
fn envelope_only_rises_on_attack() {
    let mut rng = fastrand::Rng::with_seed(42);
    let mut tile = Tile::new(3, (0, 1), 10.0);
    for _ in 0..2000 {
        let val = rng.f32() * 260.0;
        let before = tile.high;
        let out = apply_envelope(&mut tile, val);
        if val > before {
            assert_eq!(tile.high, val);
            assert_eq!(out, val);
        } else {
            assert!(tile.high <= before);
            assert!(tile.high >= 0.0);
            assert_eq!(out, tile.high);
        }
    }
}

#[test]
fn envelope_decays_to_zero_and_stays_there() {
    let mut tile = Tile::new(0, (0, 0), 10.0);
    apply_envelope(&mut tile, 5.0);
    assert_eq!(apply_envelope(&mut tile, 0.0), 3.0);
    assert_eq!(apply_envelope(&mut tile, 0.0), 1.0);
    assert_eq!(apply_envelope(&mut tile, 0.0), 0.0);
    assert_eq!(apply_envelope(&mut tile, 0.0), 0.0);
}

#[test]
fn alpha_is_monotone_and_bounded() {
    let mut prev = tile_alpha(0.0);
    assert!(prev < 0.03);
    let mut v = 0.5;
    while v < 1000.0 {
        let a = tile_alpha(v);
        assert!(a >= prev, "alpha dropped at {v}");
        prev = a;
        v += 0.5;
    }
    assert!(tile_alpha(1000.0) > 0.999);
    assert!(tile_alpha(1000.0) <= 1.0);
}

#[test]
fn chaos_factor_stays_in_range() {
    let mut v = 0.0f32;
    while v < 200_000.0 {
        let c = chaos_factor(v);
        assert!((-20.0..=2.0).contains(&c), "out of range at {v}: {c}");
        v += 7.0;
    }
    assert_eq!(chaos_factor(f32::NAN), 0.0);
    assert_eq!(chaos_factor(f32::INFINITY), 0.0);
}

#[test]
fn band_index_clamps_to_spectrum() {
    assert_eq!(band_index(0, 127, 128), Some(0));
    assert_eq!(band_index(126, 127, 128), Some(127));
    assert_eq!(band_index(126, 127, 16), Some(15));
    assert_eq!(band_index(5, 127, 0), None);
}

#[test]
fn empty_spectrum_reads_as_silence() {
    let mut tile = Tile::new(10, (1, 1), 10.0);
    assert!(shade_tile(&mut tile, &[], 127).is_none());
}

#[test]
fn rotation_couples_axes_through_updated_x() {
    let s = 0.25f32;
    assert_eq!(rotate_vertex((1.0, 0.0), s), (1.0, s));
    let (x, y) = rotate_vertex((0.0, 1.0), s);
    assert_eq!(x, -s);
    assert!((y - (1.0 - s * s)).abs() < 1e-6);
}

#[test]
fn loud_input_reverses_rotation() {
    assert_eq!(rotation_angle(0.0), 0.001);
    assert_eq!(rotation_angle(10_000.0), 0.001);
    let loud = rotation_angle(20_000.0);
    assert!((loud - (0.001 - (0.025f32).sin())).abs() < 1e-7);
    assert!(loud < 0.0);
}

#[test]
fn rotate_tiles_moves_vertices_not_centres() {
    let mut tiles = build_grid(1, 10.0).unwrap();
    let before = tiles.clone();
    rotate_tiles(&mut tiles, 0.0);
    for (a, b) in before.iter().zip(&tiles) {
        assert_eq!(a.center, b.center);
        assert_ne!(a.vertices, b.vertices);
    }
}

#[test]
fn colour_bands() {
    assert_eq!(tile_color(0.0), [255, 64, 64]);
    assert_eq!(tile_color(200.0), [144, 224, 255]);
}

#[test]
fn loud_band_shades_cubes_and_highlights() {
    let mut tile = Tile::new(0, (0, 0), 10.0);
    let shade = shade_tile(&mut tile, &[255; 128], 127).unwrap();
    assert_eq!(shade.val, 255.0);
    assert!(shade.cubed);
    assert!(shade.outline);
    assert_eq!(tile.cubed, 255.0);
    assert_eq!(tile.highlight, 100.0);

    let mut canvas = Canvas::new(64, 64);
    paint_highlight(&mut canvas, &mut tile, 0.0);
    assert_eq!(tile.highlight, 99.5);
    assert!(!canvas.is_clear());
}

#[test]
fn faint_band_has_no_outline() {
    let mut tile = Tile::new(0, (0, 0), 10.0);
    // (60/255)^2 * 255 = 14.1
    let shade = shade_tile(&mut tile, &[60; 128], 127).unwrap();
    assert!(!shade.outline);
    assert!(!shade.cubed);
    assert_eq!(tile.highlight, 0.0);
}

#[test]
fn distortion_pushes_outward() {
    assert_eq!(distort_offset((0.0, 0.0), 200.0, 3000.0), (0.0, 0.0));
    assert_eq!(distort_offset((100.0, 0.0), 200.0, 0.0), (0.0, 0.0));

    let (dx, dy) = distort_offset((100.0, 0.0), 200.0, 3000.0);
    assert!(dx > 0.0);
    assert!(dy.abs() < 1e-6);
    let (dx, _) = distort_offset((-100.0, 0.0), 200.0, 3000.0);
    assert!(dx < 0.0);
}

#[test]
fn distortion_ignores_negative_envelope() {
    assert_eq!(distort_offset((50.0, 50.0), -10.0, 3000.0), (0.0, 0.0));
}
