#![cfg(feature = "cpu")]

use fluid2d::{
    CpuBackend, FieldKind, FluidError, FluidSim, MAX_EVENTS_PER_FIELD, SimulationParameters,
    SourceEvent,
};

fn small_sim(n: usize) -> FluidSim<CpuBackend> {
    let params = SimulationParameters::new(n, 0.0, 0.0);
    FluidSim::new(CpuBackend::new(n), params).unwrap()
}

#[test]
fn test_eleventh_event_is_rejected() {
    let mut sim = small_sim(16);

    for i in 0..MAX_EVENTS_PER_FIELD {
        sim.inject(FieldKind::ADensity, 0.5, 0.5, i as f32, 0.1)
            .unwrap();
    }

    let err = sim
        .inject(FieldKind::ADensity, 0.5, 0.5, 1.0, 0.1)
        .unwrap_err();
    match err {
        FluidError::CapacityExceeded { field, capacity } => {
            assert_eq!(field, FieldKind::ADensity);
            assert_eq!(capacity, 10);
        }
        other => panic!("expected CapacityExceeded, got {other:?}"),
    }

    assert_eq!(sim.pending_events(FieldKind::ADensity), MAX_EVENTS_PER_FIELD);
    // Other queues are independent
    assert_eq!(sim.pending_events(FieldKind::BDensity), 0);
    sim.inject(FieldKind::BDensity, 0.5, 0.5, 1.0, 0.1).unwrap();
}

#[test]
fn test_step_consumes_queues() {
    let mut sim = small_sim(16);
    for field in FieldKind::ALL {
        sim.inject(field, 0.25, 0.75, 1.0, 0.1).unwrap();
    }

    sim.step(0.01).unwrap();

    for field in FieldKind::ALL {
        assert_eq!(sim.pending_events(field), 0, "{field} queue not drained");
    }
    for _ in 0..MAX_EVENTS_PER_FIELD {
        sim.inject(FieldKind::UVelocity, 0.5, 0.5, 1.0, 0.1).unwrap();
    }
}

#[test]
fn test_invalid_injection_leaves_queue_untouched() {
    let mut sim = small_sim(16);
    sim.inject(FieldKind::VVelocity, 0.5, 0.5, 1.0, 0.1).unwrap();

    let bad = [
        (1.5, 0.5, 1.0, 0.1),
        (0.5, -0.1, 1.0, 0.1),
        (f32::NAN, 0.5, 1.0, 0.1),
        (0.5, 0.5, f32::INFINITY, 0.1),
        (0.5, 0.5, 1.0, -0.2),
    ];
    for (x, y, strength, radius) in bad {
        let result = sim.inject(FieldKind::VVelocity, x, y, strength, radius);
        assert!(
            matches!(result, Err(FluidError::InvalidInjection(_))),
            "({x}, {y}, {strength}, {radius}) should be rejected"
        );
    }

    assert_eq!(sim.pending_events(FieldKind::VVelocity), 1);
}

#[test]
fn test_normalized_coordinates_map_to_grid() {
    let event = SourceEvent::from_normalized(64, 0.5, 0.25, 2.0, 0.1).unwrap();
    assert_eq!(event.x, 32);
    assert_eq!(event.y, 16);
    assert_eq!(event.strength, 2.0);
    // trunc(0.1² * 64²) = trunc(40.96)
    assert_eq!(event.max_radius_sqrd, 40);

    let edge = SourceEvent::from_normalized(64, 1.0, 0.0, 1.0, 0.0).unwrap();
    assert_eq!(edge.x, 64);
    assert_eq!(edge.y, 0);
    assert_eq!(edge.max_radius_sqrd, 0);
}

#[test]
fn test_falloff_is_radial_and_bounded() {
    let event = SourceEvent {
        x: 10,
        y: 10,
        strength: 1.0,
        max_radius_sqrd: 40,
    };

    assert_eq!(event.falloff(0), 1.0);
    assert!(event.falloff(40) > 0.0);
    assert!(event.falloff(20) > event.falloff(30));
    assert_eq!(event.falloff(41), 0.0);

    // A zero radius still hits the centre cell
    let point = SourceEvent {
        max_radius_sqrd: 0,
        ..event
    };
    assert_eq!(point.falloff(0), 1.0);
    assert_eq!(point.falloff(1), 0.0);
}

#[test]
fn test_field_selectors() {
    assert_eq!("a".parse::<FieldKind>().unwrap(), FieldKind::ADensity);
    assert_eq!("B".parse::<FieldKind>().unwrap(), FieldKind::BDensity);
    assert_eq!("u".parse::<FieldKind>().unwrap(), FieldKind::UVelocity);
    assert_eq!(" v ".parse::<FieldKind>().unwrap(), FieldKind::VVelocity);

    assert!(matches!(
        "x".parse::<FieldKind>(),
        Err(FluidError::InvalidFieldSelector(_))
    ));
}

#[test]
fn test_field_table() {
    use fluid2d::field::{ChannelRule, Storage};

    assert_eq!(FieldKind::ADensity.storage(), Storage::Density);
    assert_eq!(FieldKind::BDensity.channel(), 1);
    assert_eq!(FieldKind::UVelocity.rule(), ChannelRule::NegateX);
    assert_eq!(FieldKind::VVelocity.rule(), ChannelRule::NegateY);
    assert_eq!(FieldKind::BDensity.rule(), ChannelRule::Reflect);
}
