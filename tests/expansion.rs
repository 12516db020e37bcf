use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use qtape::prelude::*;

fn names(tape: &QuantumTape) -> Vec<String> {
    tape.operations().iter().map(QueueItem::name).collect()
}

fn nested_tape() -> CircuitResult<QuantumTape> {
    QuantumTape::build(|| {
        basis_state(&[1, 1], wires![0, "a"]?)?;
        QuantumTape::new().record(|| {
            rot(0.543, 0.1, 0.4, 0)?;
            Ok(())
        })?;
        cnot(0, "a")?;
        ry(0.2, "a")?;
        probs(Some(Wires::single(0)), None)?;
        probs(Some(Wires::single("a")), None)?;
        Ok(())
    })
}

fn assert_close(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .for_each(|(x, y)| assert!((x - y).abs() < 1e-8, "{:?} != {:?}", a, b));
}

#[test]
fn test_scenario_three_gate_decomposition() -> CircuitResult<()> {
    let tape = QuantumTape::build(|| {
        rot(0.1, 0.2, 0.3, 0)?;
        expval(&pauli_z(0)?)?;
        Ok(())
    })?;
    tape.set_trainable_params([1])?;

    let expanded = tape.expand()?;
    assert_eq!(names(&expanded), vec!["RZ", "RY", "RZ"]);
    assert_eq!(
        expanded.get_parameters(false),
        vec![Param::from(0.1), Param::from(0.2), Param::from(0.3)]
    );
    assert_eq!(expanded.trainable_params(), vec![0, 1, 2]);
    assert_eq!(expanded.measurements(), tape.measurements());

    // the source tape is untouched
    assert_eq!(names(&tape), vec!["Rot"]);
    assert_eq!(tape.trainable_params(), vec![1]);
    Ok(())
}

#[test]
fn test_nested_tape_is_flattened() -> CircuitResult<()> {
    let tape = QuantumTape::build(|| {
        QuantumTape::new().record(|| {
            rx(0.1, 0)?;
            ry(0.2, 1)?;
            Ok(())
        })?;
        expval(&pauli_z(0)?)?;
        Ok(())
    })?;
    assert_eq!(tape.operations().len(), 1);

    let expanded = tape.expand_with(&ExpandOptions::new().stop_at(|_| true))?;
    assert_eq!(names(&expanded), vec!["RX", "RY"]);
    assert_eq!(expanded.num_params(), 2);
    Ok(())
}

#[test]
fn test_nesting_and_decomposition() -> CircuitResult<()> {
    let tape = nested_tape()?;
    let expanded = tape.expand()?;
    assert_eq!(
        names(&expanded),
        vec!["PauliX", "PauliX", "Rot", "CNOT", "RY"]
    );
    assert_eq!(expanded.measurements().len(), 2);
    assert_eq!(expanded.wires(), wires![0, "a"]?);
    Ok(())
}

#[test]
fn test_depth_expansion() -> CircuitResult<()> {
    let tape = nested_tape()?;
    let expanded = tape.expand_with(&ExpandOptions::new().depth(3))?;
    assert_eq!(
        names(&expanded),
        vec![
            "RZ", "RX", "RZ", "RZ", "RX", "RZ", "RZ", "RY", "RZ", "CNOT", "RY"
        ]
    );
    let params = expanded.get_parameters(false);
    assert_eq!(params.len(), 10);
    assert_eq!(
        &params[..3],
        &[Param::from(FRAC_PI_2), Param::from(PI), Param::from(FRAC_PI_2)]
    );
    Ok(())
}

#[test]
fn test_stopping_criterion_with_depth() -> CircuitResult<()> {
    let tape = nested_tape()?;
    let options = ExpandOptions::new()
        .depth(2)
        .stop_at(|item| item.name() == "PauliX");
    let expanded = tape.expand_with(&options)?;
    assert_eq!(
        names(&expanded),
        vec!["PauliX", "PauliX", "RZ", "RY", "RZ", "CNOT", "RY"]
    );
    Ok(())
}

#[test]
fn test_depth_zero_keeps_everything() -> CircuitResult<()> {
    let tape = nested_tape()?;
    let expanded = tape.expand_with(&ExpandOptions::new().depth(0))?;
    assert_eq!(expanded.operations(), tape.operations());
    assert_eq!(expanded.trainable_params(), tape.trainable_params());
    Ok(())
}

#[test]
fn test_inverted_operation_expansion() -> CircuitResult<()> {
    let tape = QuantumTape::build(|| {
        crz(0.5, 0, 1)?.inv();
        Ok(())
    })?;
    let expanded = tape.expand()?;
    assert_eq!(
        names(&expanded),
        vec!["CNOT.inv", "PhaseShift.inv", "CNOT.inv", "PhaseShift.inv"]
    );
    assert_eq!(
        expanded.get_parameters(false),
        vec![Param::from(-0.25), Param::from(0.25)]
    );
    Ok(())
}

#[test]
fn test_measurement_expansion() -> CircuitResult<()> {
    let tape = QuantumTape::build(|| {
        basis_state(&[1, 1], wires![0, "a"]?)?;
        cnot(0, "a")?;
        ry(0.2, "a")?;
        probs(Some(Wires::single(0)), None)?;
        expval(&compose(&pauli_z("a")?, &hadamard("b")?)?)?;
        var(&hermitian(
            Param::real_matrix(2, 2, &[1.0, 2.0, 2.0, 4.0]),
            Wires::single("c"),
        )?)?;
        Ok(())
    })?;

    let expanded = tape.expand_with(&ExpandOptions::new().expand_measurements(true))?;
    assert_eq!(
        names(&expanded),
        vec!["PauliX", "PauliX", "CNOT", "RY", "RY", "QubitUnitary"]
    );
    assert_eq!(
        expanded.get_parameters(false)[1],
        Param::from(-FRAC_PI_4)
    );

    let measurements = expanded.measurements();
    assert_eq!(measurements.len(), 3);
    assert!(measurements.iter().all(|m| m.obs().is_none()));
    assert_eq!(measurements[0], tape.measurements()[0]);
    assert!(measurements[0].get_eigvals().is_none());
    assert_close(
        &measurements[1].get_eigvals().unwrap_or_default(),
        &[1.0, -1.0, -1.0, 1.0],
    );
    assert_close(&measurements[2].get_eigvals().unwrap_or_default(), &[0.0, 5.0]);
    assert_eq!(measurements[1].wires(), wires!["a", "b"]?);
    assert_eq!(measurements[2].return_type(), ReturnType::Variance);
    Ok(())
}

#[test]
fn test_expansion_depth_bound() -> CircuitResult<()> {
    let tape = QuantumTape::build(|| {
        pauli_x(0)?;
        Ok(())
    })?;
    let sizes = (0..4)
        .map(|depth| {
            tape.expand_with(&ExpandOptions::new().depth(depth))
                .map(|t| names(&t))
        })
        .collect::<CircuitResult<Vec<_>>>()?;
    assert_eq!(sizes[0], vec!["PauliX"]);
    assert_eq!(sizes[1], vec!["PhaseShift", "RX", "PhaseShift"]);
    assert_eq!(sizes[2], vec!["RZ", "RX", "RZ"]);
    assert_eq!(sizes[3], sizes[2]);
    Ok(())
}
