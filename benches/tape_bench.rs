#[macro_use]
extern crate bencher;
extern crate qtape;

use bencher::Bencher;

use qtape::prelude::*;

fn layered_circuit(layers: usize, n: i64) -> CircuitResult<QuantumTape> {
    QuantumTape::build(|| {
        for layer in 0..layers {
            for w in 0..n {
                rot(0.1 * layer as f64, 0.2, 0.3, w)?;
            }
            for w in 0..n - 1 {
                cnot(w, w + 1)?;
            }
        }
        for w in 0..n {
            expval(&pauli_z(w)?)?;
        }
        Ok(())
    })
}

fn bench_record(bencher: &mut Bencher) {
    bencher.iter(|| layered_circuit(10, 8).unwrap());
}

fn bench_expand(bencher: &mut Bencher) {
    let tape = layered_circuit(10, 8).unwrap();
    let options = ExpandOptions::new().depth(2);
    bencher.iter(|| tape.expand_with(&options).unwrap());
}

fn bench_hash(bencher: &mut Bencher) {
    let tape = layered_circuit(10, 8).unwrap();
    bencher.iter(|| {
        tape.set_parameters(vec![0.5; tape.num_params()], false)
            .unwrap();
        tape.hash()
    });
}

fn bench_set_parameters(bencher: &mut Bencher) {
    let tape = layered_circuit(10, 8).unwrap();
    tape.set_trainable_params((0..tape.num_params()).step_by(2))
        .unwrap();
    let values = vec![0.25; tape.num_trainable_params()];
    bencher.iter(|| tape.set_parameters(values.iter().copied(), true).unwrap());
}

benchmark_group!(
    benches,
    bench_record,
    bench_expand,
    bench_hash,
    bench_set_parameters,
);
benchmark_main!(benches);
