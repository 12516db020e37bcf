use qtape::prelude::*;

#[test]
fn test_partitions_in_recording_order() -> CircuitResult<()> {
    let tape = QuantumTape::build(|| {
        basis_state(&[1, 0], wires![0, "a"]?)?;
        rx(0.432, 0)?;
        rot(0.543, 0.2, 0.1, 0)?;
        cnot(0, "a")?;
        rx(0.133, 4)?;
        expval(&pauli_x("a")?)?;
        probs(Some(wires![0, "a"]?), None)?;
        Ok(())
    })?;

    let names = tape.operations().iter().map(QueueItem::name).collect::<Vec<_>>();
    assert_eq!(names, vec!["BasisState", "RX", "Rot", "CNOT", "RX"]);
    assert_eq!(tape.measurements().len(), 2);
    assert_eq!(tape.wires(), wires![0, "a", 4]?);
    assert_eq!(tape.num_wires(), 3);
    assert_eq!(tape.output_dim(), 5);
    assert!(!tape.is_sampled());

    // the observable is owned by its measurement
    assert_eq!(tape.queue().len(), 8);
    assert_eq!(tape.len(), 7);
    assert_eq!(tape.get(5).map(|item| item.name()), Some("expval".to_string()));
    assert!(tape.get(7).is_none());
    Ok(())
}

#[test]
fn test_iteration_is_restartable() -> CircuitResult<()> {
    let tape = QuantumTape::build(|| {
        rx(0.1, 0)?;
        cnot(0, 1)?;
        expval(&pauli_z(1)?)?;
        Ok(())
    })?;
    let first = tape.iter().collect::<Vec<_>>();
    let second = (&tape).into_iter().collect::<Vec<_>>();
    assert_eq!(first, second);
    assert_eq!(first, tape.circuit());
    assert_eq!(first.len(), 3);
    assert!(first[2].as_measurement().is_some());

    let mut count = 0;
    for item in &tape {
        assert!(!item.wires().is_empty());
        count += 1;
    }
    assert_eq!(count, 3);
    Ok(())
}

#[test]
fn test_measurement_before_operation() {
    let result = QuantumTape::build(|| {
        expval(&pauli_z(0)?)?;
        rx(0.1, 0)?;
        Ok(())
    });
    assert!(matches!(result, Err(CircuitError::RecordingOrder(_))));
    assert!(!QueuingContext::recording());
}

#[test]
fn test_state_prep_after_operation() {
    let result = QuantumTape::build(|| {
        rx(0.1, 0)?;
        basis_state(&[1], Wires::single(0))?;
        Ok(())
    });
    match result {
        Err(CircuitError::RecordingOrder(msg)) => assert!(msg.contains("State preparation")),
        other => panic!("expected a recording order error, got {:?}", other),
    }
}

#[test]
fn test_state_prep_after_measurement() {
    let result = QuantumTape::build(|| {
        expval(&pauli_z(0)?)?;
        basis_state(&[1], Wires::single(0))?;
        Ok(())
    });
    match result {
        Err(CircuitError::RecordingOrder(msg)) => assert!(msg.contains("BasisState")),
        other => panic!("expected a recording order error, got {:?}", other),
    }
    assert!(!QueuingContext::recording());
}

#[test]
fn test_failed_recording_restores_context() {
    let result = QuantumTape::build(|| {
        rx(0.1, 0)?;
        Err(CircuitError::new("user function failed"))
    });
    assert!(result.is_err());
    assert!(!QueuingContext::recording());
    assert!(QueuingContext::active_context().is_none());
}

#[test]
fn test_nested_tape() -> CircuitResult<()> {
    let inner = QuantumTape::new();
    let outer = QuantumTape::build(|| {
        rx(0.1, 0)?;
        inner.record(|| {
            ry(0.2, 1)?;
            rz(0.3, 1)?;
            Ok(())
        })?;
        cnot(0, 1)?;
        expval(&pauli_z(0)?)?;
        Ok(())
    })?;

    let ops = outer.operations();
    assert_eq!(ops.len(), 3);
    assert_eq!(ops[1].as_tape(), Some(&inner));
    assert_eq!(inner.operations().len(), 2);
    assert_eq!(outer.num_params(), 3);
    assert_eq!(
        outer.get_parameters(false),
        vec![Param::from(0.1), Param::from(0.2), Param::from(0.3)]
    );

    outer.set_parameters([1.0, 2.0, 3.0], false)?;
    assert_eq!(inner.get_parameters(false), vec![Param::from(2.0), Param::from(3.0)]);
    Ok(())
}

#[test]
fn test_reentering_appends() -> CircuitResult<()> {
    let tape = QuantumTape::build(|| {
        rx(0.1, 0)?;
        Ok(())
    })?;
    tape.set_trainable_params(Vec::<usize>::new())?;
    tape.record(|| {
        ry(0.2, 0)?;
        expval(&pauli_z(0)?)?;
        Ok(())
    })?;
    assert_eq!(tape.operations().len(), 2);
    assert_eq!(tape.trainable_params(), vec![0, 1]);
    Ok(())
}

#[test]
fn test_stop_recording() -> CircuitResult<()> {
    let tape = QuantumTape::new();
    let scratch = tape.record(|| {
        rx(0.1, 0)?;
        let scratch = tape.stop_recording(|| {
            assert!(!QueuingContext::recording());
            ry(0.2, 0)?;
            QuantumTape::build(|| {
                rz(0.3, 1)?;
                Ok(())
            })
        })?;
        assert_eq!(QueuingContext::active_context().as_ref(), Some(&tape));
        cnot(0, 1)?;
        Ok(scratch)
    })?;

    let names = tape.operations().iter().map(QueueItem::name).collect::<Vec<_>>();
    assert_eq!(names, vec!["RX", "CNOT"]);
    assert_eq!(scratch.operations().len(), 1);
    Ok(())
}

#[test]
fn test_stop_recording_requires_active_tape() -> CircuitResult<()> {
    let tape = QuantumTape::new();
    let err = tape.stop_recording(|| Ok(())).unwrap_err();
    assert!(matches!(err, CircuitError::Queuing(_)));

    let other = QuantumTape::new();
    tape.record(|| {
        assert!(other.stop_recording(|| Ok(())).is_err());
        Ok(())
    })?;
    Ok(())
}

fn is_queued(op: &OperatorRef) -> bool {
    QueuingContext::is_queued(&QueueItem::Operator(op.clone()))
}

#[test]
fn test_constructors_outside_recording() -> CircuitResult<()> {
    let op = rx(0.5, 0)?;
    let m = expval(&pauli_z(0)?)?;
    assert_eq!(op.name(), "RX");
    assert_eq!(m.return_type(), ReturnType::Expectation);
    assert!(!is_queued(&op));
    assert!(QueuingContext::update_info(
        &QueueItem::Operator(op),
        Default::default()
    )
    .is_err());
    Ok(())
}

#[test]
fn test_queuing_context_queries() -> CircuitResult<()> {
    let tape = QuantumTape::build(|| {
        let op = rx(0.5, 0)?;
        assert!(is_queued(&op));
        let item = QueueItem::Operator(op);
        assert!(QueuingContext::get_info(&item)?.owner.is_none());
        assert!(QueuingContext::remove(&item));
        assert!(!QueuingContext::is_queued(&item));
        assert!(!QueuingContext::remove(&item));
        ry(0.1, 0)?;
        Ok(())
    })?;
    let names = tape.operations().iter().map(QueueItem::name).collect::<Vec<_>>();
    assert_eq!(names, vec!["RY"]);
    Ok(())
}

#[test]
fn test_scenario_probs_only() -> CircuitResult<()> {
    let tape = QuantumTape::build(|| {
        probs(Some(wires![0, 1]?), None)?;
        Ok(())
    })?;
    assert_eq!(tape.output_dim(), 4);
    assert!(tape.operations().is_empty());
    assert_eq!(tape.measurements().len(), 1);
    assert!(tape.measurements()[0].obs().is_none());
    Ok(())
}
