use glam::Vec2;
use rand::SeedableRng;
use rand::rngs::StdRng;

use fluid2d::analysis::{FluidMetrics, divergence_stats};
use fluid2d::input::{self, DENSITY_RADIUS, DENSITY_STRENGTH, PointerTracker, VELOCITY_STRENGTH};
use fluid2d::render::{self, density_color};
use fluid2d::{FieldKind, FieldView, Grid, Renderer};

#[test]
fn test_first_drag_sample_only_anchors() {
    let mut tracker = PointerTracker::new();
    assert!(tracker.drag(Vec2::new(0.5, 0.5), false).is_empty());
    assert!(tracker.is_dragging());
}

#[test]
fn test_drag_emits_unit_direction_velocity() {
    let mut tracker = PointerTracker::new();
    tracker.drag(Vec2::new(0.5, 0.5), false);
    let impulses = tracker.drag(Vec2::new(0.6, 0.5), false);

    assert_eq!(impulses.len(), 2);
    assert_eq!(impulses[0].field, FieldKind::UVelocity);
    assert!((impulses[0].strength - VELOCITY_STRENGTH).abs() < 1e-4);
    assert_eq!(impulses[1].field, FieldKind::VVelocity);
    assert!(impulses[1].strength.abs() < 1e-4);
    assert_eq!(impulses[0].position, Vec2::new(0.6, 0.5));

    // No movement, no impulse
    assert!(tracker.drag(Vec2::new(0.6, 0.5), false).is_empty());

    tracker.release();
    assert!(!tracker.is_dragging());
    assert!(tracker.drag(Vec2::new(0.1, 0.1), false).is_empty());
}

#[test]
fn test_shift_drag_adds_density_to_selected_channel() {
    let mut tracker = PointerTracker::new();
    tracker.drag(Vec2::new(0.2, 0.2), true);
    let impulses = tracker.drag(Vec2::new(0.3, 0.2), true);
    assert_eq!(impulses.len(), 1);
    assert_eq!(impulses[0].field, FieldKind::ADensity);
    assert_eq!(impulses[0].strength, DENSITY_STRENGTH);
    assert_eq!(impulses[0].radius, DENSITY_RADIUS);

    tracker.toggle_density_field();
    let impulses = tracker.drag(Vec2::new(0.4, 0.2), true);
    assert_eq!(impulses[0].field, FieldKind::BDensity);

    tracker.toggle_density_field();
    assert_eq!(tracker.density_field(), FieldKind::ADensity);
}

#[test]
fn test_drag_outside_canvas_is_clamped() {
    let mut tracker = PointerTracker::new();
    tracker.drag(Vec2::new(0.9, 0.5), false);
    let impulses = tracker.drag(Vec2::new(1.4, 0.5), false);
    assert_eq!(impulses[0].position, Vec2::new(1.0, 0.5));
}

#[test]
fn test_streams_emit_density_and_scaled_velocity() {
    let mut rng = StdRng::seed_from_u64(7);
    for stream in input::default_streams() {
        let impulses = stream.impulses(&mut rng);
        assert_eq!(impulses.len(), 3);
        assert_eq!(impulses[0].field, stream.field);
        assert_eq!(impulses[0].strength, stream.density_strength);

        let velocity = Vec2::new(impulses[1].strength, impulses[2].strength);
        assert!((velocity.length() - stream.velocity_strength).abs() < 1e-4);
    }
}

#[test]
fn test_density_colours() {
    assert_eq!(density_color(0.0, 0.0), [0, 0, 0]);
    assert_eq!(density_color(1.0, 0.0), [255, 0, 0]);
    assert_eq!(density_color(0.0, 1.0), [0, 0, 255]);
    assert_eq!(density_color(5.0, 2.0), [255, 255, 255]);
    assert_eq!(density_color(-1.0, 0.5), [0, 0, 127]);
}

fn sample_density(grid: Grid) -> Vec<f32> {
    let mut data = vec![0.0; grid.buffer_len()];
    data[grid.index(1, 1, 0)] = 1.0;
    data[grid.index(grid.sim_size, grid.sim_size, 1)] = 1.0;
    data
}

#[test]
fn test_texture_covers_interior() {
    let grid = Grid::new(4);
    let data = sample_density(grid);
    let view = FieldView::new(grid, &data);

    let image = render::to_color_image(&view);
    assert_eq!(image.size, [4, 4]);
    assert_eq!(image.pixels[0], egui::Color32::from_rgb(255, 0, 0));
    assert_eq!(image.pixels[15], egui::Color32::from_rgb(0, 0, 255));
    assert_eq!(image.pixels[5], egui::Color32::from_rgb(0, 0, 0));
}

#[test]
fn test_renderer_scales_to_output() {
    let grid = Grid::new(4);
    let data = sample_density(grid);
    let view = FieldView::new(grid, &data);

    let image = Renderer::new(16, 16).render_density(&view);
    assert_eq!(image.dimensions(), (16, 16));
    assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0]);
    assert_eq!(image.get_pixel(3, 3).0, [255, 0, 0]);
    assert_eq!(image.get_pixel(15, 15).0, [0, 0, 255]);
    assert_eq!(image.get_pixel(8, 0).0, [0, 0, 0]);
}

#[test]
fn test_metrics_on_known_fields() {
    let grid = Grid::new(8);
    let mut density = vec![0.0; grid.buffer_len()];
    density[grid.index(2, 2, 0)] = 2.0;
    density[grid.index(3, 3, 1)] = 0.5;
    // Ghost cells do not count towards mass
    density[grid.index(0, 0, 0)] = 100.0;

    let mut velocity = vec![0.0; grid.buffer_len()];
    velocity[grid.index(2, 2, 0)] = 3.0;
    velocity[grid.index(2, 2, 1)] = 4.0;

    let metrics = FluidMetrics::analyze(grid, &density, &velocity, 7);
    assert_eq!(metrics.frame, 7);
    assert_eq!(metrics.mass_a, 2.0);
    assert_eq!(metrics.mass_b, 0.5);
    assert_eq!(metrics.total_mass(), 2.5);
    assert_eq!(metrics.max_density, 2.0);
    assert_eq!(metrics.max_speed, 5.0);
    assert_eq!(metrics.kinetic_energy, 0.5 * 2.0 * 25.0);
    assert!(metrics.max_divergence > 0.0);
}

#[test]
fn test_uniform_flow_has_no_divergence() {
    let grid = Grid::new(8);
    let mut velocity = vec![0.0; grid.buffer_len()];
    for y in 0..grid.stride {
        for x in 0..grid.stride {
            velocity[grid.index(x, y, 0)] = 1.5;
            velocity[grid.index(x, y, 1)] = -0.5;
        }
    }
    assert_eq!(divergence_stats(grid, &velocity), (0.0, 0.0));
}
