#![cfg(feature = "cpu")]

use fluid2d::{BoundaryKind, ComputeBackend, CpuBackend, Grid, Kernel, SourceEvent};

fn patterned(grid: Grid) -> Vec<f32> {
    let mut data = vec![0.0; grid.buffer_len()];
    for y in 1..=grid.sim_size {
        for x in 1..=grid.sim_size {
            data[grid.index(x, y, 0)] = (x * 10 + y) as f32;
            data[grid.index(x, y, 1)] = 100.0 + (x + y * 7) as f32;
        }
    }
    data
}

#[test]
fn test_velocity_boundary_negates_normal_component() {
    let n = 8;
    let mut backend = CpuBackend::new(n);
    let grid = backend.grid();
    let mut vel = patterned(grid);

    backend
        .dispatch(Kernel::SetBoundary {
            dest: &mut vel,
            kind: BoundaryKind::Velocity,
        })
        .unwrap();

    for i in 1..=n {
        // U flips at left/right walls, V is copied
        assert_eq!(vel[grid.index(0, i, 0)], -vel[grid.index(1, i, 0)]);
        assert_eq!(vel[grid.index(n + 1, i, 0)], -vel[grid.index(n, i, 0)]);
        assert_eq!(vel[grid.index(0, i, 1)], vel[grid.index(1, i, 1)]);
        assert_eq!(vel[grid.index(n + 1, i, 1)], vel[grid.index(n, i, 1)]);

        // V flips at top/bottom walls, U is copied
        assert_eq!(vel[grid.index(i, 0, 1)], -vel[grid.index(i, 1, 1)]);
        assert_eq!(vel[grid.index(i, n + 1, 1)], -vel[grid.index(i, n, 1)]);
        assert_eq!(vel[grid.index(i, 0, 0)], vel[grid.index(i, 1, 0)]);
        assert_eq!(vel[grid.index(i, n + 1, 0)], vel[grid.index(i, n, 0)]);
    }

    for c in 0..2 {
        let corner = vel[grid.index(0, 0, c)];
        let expected = 0.5 * (vel[grid.index(1, 0, c)] + vel[grid.index(0, 1, c)]);
        assert_eq!(corner, expected);

        let corner = vel[grid.index(n + 1, n + 1, c)];
        let expected = 0.5 * (vel[grid.index(n, n + 1, c)] + vel[grid.index(n + 1, n, c)]);
        assert_eq!(corner, expected);
    }
}

#[test]
fn test_density_boundary_reflects_both_channels() {
    let n = 6;
    let mut backend = CpuBackend::new(n);
    let grid = backend.grid();
    let mut dens = patterned(grid);

    for kind in [BoundaryKind::Density, BoundaryKind::Scalar] {
        backend
            .dispatch(Kernel::SetBoundary {
                dest: &mut dens,
                kind,
            })
            .unwrap();

        for c in 0..2 {
            for i in 1..=n {
                assert_eq!(dens[grid.index(0, i, c)], dens[grid.index(1, i, c)]);
                assert_eq!(dens[grid.index(n + 1, i, c)], dens[grid.index(n, i, c)]);
                assert_eq!(dens[grid.index(i, 0, c)], dens[grid.index(i, 1, c)]);
                assert_eq!(dens[grid.index(i, n + 1, c)], dens[grid.index(i, n, c)]);
            }
        }
    }
}

#[test]
fn test_add_source_scales_by_dt() {
    let mut backend = CpuBackend::new(4);
    let grid = backend.grid();
    let src = patterned(grid);
    let mut dest = vec![1.0; grid.buffer_len()];

    backend
        .dispatch(Kernel::AddSource {
            dest: &mut dest,
            src: &src,
            dt: 0.5,
        })
        .unwrap();

    for (d, s) in dest.iter().zip(&src) {
        assert_eq!(*d, 1.0 + 0.5 * s);
    }
}

#[test]
fn test_zero_velocity_advection_is_identity() {
    let n = 8;
    let mut backend = CpuBackend::new(n);
    let grid = backend.grid();
    let src = patterned(grid);
    let vel = vec![0.0; grid.buffer_len()];
    let mut dest = backend.allocate("dest").unwrap();

    backend
        .dispatch(Kernel::Advect {
            dest: &mut dest,
            src: &src,
            vel: &vel,
            dt0: 0.8,
        })
        .unwrap();

    for y in 1..=n {
        for x in 1..=n {
            for c in 0..2 {
                assert_eq!(dest[grid.index(x, y, c)], src[grid.index(x, y, c)]);
            }
        }
    }
}

#[test]
fn test_uniform_velocity_shifts_field() {
    let n = 16;
    let mut backend = CpuBackend::new(n);
    let grid = backend.grid();
    let src = patterned(grid);
    let mut vel = vec![0.0; grid.buffer_len()];
    for y in 0..grid.stride {
        for x in 0..grid.stride {
            // One cell to the right per step with dt0 = 1
            vel[grid.index(x, y, 0)] = 1.0;
        }
    }
    let mut dest = backend.allocate("dest").unwrap();

    backend
        .dispatch(Kernel::Advect {
            dest: &mut dest,
            src: &src,
            vel: &vel,
            dt0: 1.0,
        })
        .unwrap();

    for y in 2..n {
        for x in 2..=n {
            assert_eq!(dest[grid.index(x, y, 0)], src[grid.index(x - 1, y, 0)]);
        }
    }
}

#[test]
fn test_diffuse_without_rate_copies_source() {
    let n = 8;
    let mut backend = CpuBackend::new(n);
    let grid = backend.grid();
    let src = patterned(grid);
    let mut dest = vec![3.0; grid.buffer_len()];

    backend
        .dispatch(Kernel::DiffuseSweep {
            dest: &mut dest,
            src: &src,
            a: 0.0,
            denominator: 1.0,
        })
        .unwrap();

    for y in 1..=n {
        for x in 1..=n {
            assert_eq!(dest[grid.index(x, y, 1)], src[grid.index(x, y, 1)]);
        }
    }
}

#[test]
fn test_scatter_touches_only_its_channel_and_radius() {
    let n = 32;
    let mut backend = CpuBackend::new(n);
    let grid = backend.grid();
    let mut dest = backend.allocate("dest").unwrap();

    let event = SourceEvent {
        x: 10,
        y: 12,
        strength: 2.0,
        max_radius_sqrd: 9,
    };
    backend.upload_events(&[event]).unwrap();
    backend
        .dispatch(Kernel::ScatterEvents {
            dest: &mut dest,
            channel: 1,
            count: 1,
        })
        .unwrap();

    for y in 0..grid.stride {
        for x in 0..grid.stride {
            assert_eq!(dest[grid.index(x, y, 0)], 0.0);
            let dx = x as i32 - 10;
            let dy = y as i32 - 12;
            let value = dest[grid.index(x, y, 1)];
            if dx * dx + dy * dy > 9 {
                assert_eq!(value, 0.0, "({x}, {y}) outside the radius");
            } else {
                assert!(value > 0.0, "({x}, {y}) inside the radius");
            }
        }
    }
    assert_eq!(dest[grid.index(10, 12, 1)], 2.0);
}

#[test]
fn test_projection_reduces_divergence() {
    let n = 32;
    let mut backend = CpuBackend::new(n);
    let grid = backend.grid();
    let h = 0.5 / n as f32;

    // Gradient of a Gaussian bump: curl free, so projection removes nearly all of it
    let mut vel = vec![0.0; grid.buffer_len()];
    for y in 1..=n {
        for x in 1..=n {
            let dx = x as f32 - 16.5;
            let dy = y as f32 - 16.5;
            let phi = (-(dx * dx + dy * dy) / 16.0).exp();
            vel[grid.index(x, y, 0)] = -dx / 8.0 * phi;
            vel[grid.index(x, y, 1)] = -dy / 8.0 * phi;
        }
    }
    let (before, _) = fluid2d::analysis::divergence_stats(grid, &vel);

    let mut tmp = backend.allocate("tmp").unwrap();
    backend
        .dispatch(Kernel::ProjectDivergence {
            tmp: &mut tmp,
            vel: &vel,
            h,
        })
        .unwrap();
    backend
        .dispatch(Kernel::SetBoundary {
            dest: &mut tmp,
            kind: BoundaryKind::Scalar,
        })
        .unwrap();
    for _ in 0..100 {
        backend
            .dispatch(Kernel::ProjectPressure { tmp: &mut tmp })
            .unwrap();
        backend
            .dispatch(Kernel::SetBoundary {
                dest: &mut tmp,
                kind: BoundaryKind::Scalar,
            })
            .unwrap();
    }
    backend
        .dispatch(Kernel::ProjectSubtract {
            vel: &mut vel,
            tmp: &tmp,
            h: 0.5 * n as f32,
        })
        .unwrap();

    let (after, _) = fluid2d::analysis::divergence_stats(grid, &vel);
    assert!(
        after < 0.5 * before,
        "divergence {before} -> {after} not reduced"
    );
}

#[test]
fn test_mismatched_buffer_is_rejected() {
    let mut backend = CpuBackend::new(8);
    let mut short = vec![0.0; 10];
    let err = backend.clear(&mut short).unwrap_err();
    assert!(matches!(
        err,
        fluid2d::BackendError::SizeMismatch { actual: 10, .. }
    ));
}
