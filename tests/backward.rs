//! Gradient tests: analytic VJPs against central finite differences.

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sfs_tensor::einsum::einsum2_vjp;
use sfs_tensor::{EinArg, KernelError, Primitive, Record, Tensor, Value};

const STEP: f64 = 1e-6;

fn random_tensor(rng: &mut StdRng, shape: &[usize]) -> Tensor<f64> {
    Tensor::from_fn(shape, |_| rng.gen_range(-1.0..1.0))
}

/// Compare `record.vjp(position, w)` with the finite-difference gradient of
/// `Σ w ⊙ primitive(inputs)` with respect to the tensor at `position`.
fn check_gradient(primitive: Primitive<char>, inputs: Vec<Value>, position: usize, seed: u64) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = StdRng::seed_from_u64(seed);

    let record = Record::new(primitive.clone(), inputs.clone()).unwrap();
    let weights = random_tensor(&mut rng, record.output.shape());
    let analytic = record.vjp(position, &Value::Real(weights.clone())).unwrap();
    let analytic = analytic.as_real().unwrap();

    let slot = match primitive {
        Primitive::Einsum2 { .. } => position / 2,
        _ => position,
    };
    let x = inputs[slot].as_real().unwrap().clone();
    assert_eq!(analytic.shape(), x.shape());

    let loss = |perturbed: Tensor<f64>| -> f64 {
        let mut args = inputs.clone();
        args[slot] = Value::Real(perturbed);
        let y = primitive.apply(&args).unwrap();
        y.as_real()
            .unwrap()
            .zip_with(&weights, |a, b| a * b)
            .unwrap()
            .sum()
    };

    let data = x.to_vec();
    for i in 0..data.len() {
        let mut plus = data.clone();
        let mut minus = data.clone();
        plus[i] += STEP;
        minus[i] -= STEP;
        let numeric = (loss(Tensor::from_vec(plus, x.shape()).unwrap())
            - loss(Tensor::from_vec(minus, x.shape()).unwrap()))
            / (2.0 * STEP);
        let exact = analytic.to_vec()[i];
        assert_relative_eq!(exact, numeric, max_relative = 1e-5, epsilon = 1e-8);
    }
}

fn einsum_primitive(labels: &[&[char]], output: &[char]) -> Primitive<char> {
    Primitive::Einsum2 {
        labels: labels.iter().map(|l| l.to_vec()).collect(),
        output: output.to_vec(),
    }
}

// ============================================================================
// einsum2
// ============================================================================

#[test]
fn test_backward_matmul_ones() {
    let a = Tensor::<f64>::from_data(&[1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
    let b = Tensor::<f64>::from_data(&[1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
    let g = Tensor::<f64>::from_data(&[1.0; 4], &[2, 2]).unwrap();
    let args = [
        EinArg::Tensor(&a),
        EinArg::Labels(&['i', 'j'][..]),
        EinArg::Tensor(&b),
        EinArg::Labels(&['j', 'k'][..]),
        EinArg::Labels(&['i', 'k'][..]),
    ];

    // grad_A = G @ Bᵀ = [[4,6],[4,6]], grad_B = Aᵀ @ G = [[3,3],[7,7]]
    assert_eq!(einsum2_vjp(&args, 0, &g).unwrap().to_vec(), vec![4.0, 4.0, 6.0, 6.0]);
    assert_eq!(einsum2_vjp(&args, 2, &g).unwrap().to_vec(), vec![3.0, 7.0, 3.0, 7.0]);
}

#[test]
fn test_backward_einsum_finite_differences() {
    let mut rng = StdRng::seed_from_u64(42);
    let cases: Vec<(Vec<&[char]>, &[char], Vec<Vec<usize>>)> = vec![
        (vec![&['i', 'j'][..], &['j', 'k'][..]], &['i', 'k'][..], vec![vec![2, 3], vec![3, 4]]),
        (vec![&['i', 'j', 'k'][..], &['k', 'j'][..]], &['i'][..], vec![vec![2, 3, 2], vec![2, 3]]),
        (
            vec![&['b', 'i'][..], &['b', 'i'][..], &['i'][..]],
            &['b'][..],
            vec![vec![3, 2], vec![3, 2], vec![2]],
        ),
        // private label summed, broadcast back in the gradient
        (vec![&['i', 'x'][..], &['i'][..]], &['i'][..], vec![vec![2, 4], vec![2]]),
        // repeated label, diagonal embedding in the gradient
        (vec![&['i', 'i', 'j'][..], &['j'][..]], &['i'][..], vec![vec![3, 3, 2], vec![2]]),
    ];

    for (case, (labels, output, shapes)) in cases.into_iter().enumerate() {
        let inputs: Vec<Value> = shapes
            .iter()
            .map(|s| Value::Real(random_tensor(&mut rng, s)))
            .collect();
        for operand in 0..labels.len() {
            check_gradient(einsum_primitive(&labels, output), inputs.clone(), 2 * operand, case as u64);
        }
    }
}

#[test]
fn test_backward_einsum_label_positions() {
    let a = Tensor::<f64>::zeros(&[2]);
    let g = Tensor::<f64>::zeros(&[2]);
    let args = [EinArg::Tensor(&a), EinArg::Labels(&['i'][..]), EinArg::Labels(&['i'][..])];
    assert_eq!(
        einsum2_vjp(&args, 1, &g).unwrap_err(),
        KernelError::NonDifferentiableArgument { position: 1 }
    );
    assert_eq!(
        einsum2_vjp(&args, 7, &g).unwrap_err(),
        KernelError::ArgumentOutOfRange { position: 7, arity: 3 }
    );
}

// ============================================================================
// Axis utilities
// ============================================================================

#[test]
fn test_backward_swapaxes() {
    let mut rng = StdRng::seed_from_u64(1);
    let x = Value::Real(random_tensor(&mut rng, &[2, 3, 4]));
    check_gradient(Primitive::SwapAxes { axis1: 0, axis2: 2 }, vec![x], 0, 10);
}

#[test]
fn test_backward_trace() {
    let mut rng = StdRng::seed_from_u64(2);
    let square = Value::Real(random_tensor(&mut rng, &[3, 3]));
    check_gradient(Primitive::Trace { offset: 0 }, vec![square], 0, 20);

    let batched = Value::Real(random_tensor(&mut rng, &[3, 4, 2]));
    check_gradient(Primitive::Trace { offset: -1 }, vec![batched.clone()], 0, 21);
    check_gradient(Primitive::Trace { offset: 2 }, vec![batched], 0, 22);
}

// ============================================================================
// Special functions
// ============================================================================

#[test]
fn test_backward_expm1d() {
    let x = Tensor::from_data(&[-2.0, -0.3, 0.0, 1e-3, 0.7, 3.0], &[6]).unwrap();
    check_gradient(Primitive::Expm1d, vec![Value::Real(x)], 0, 30);
}

#[test]
fn test_backward_expi() {
    let x = Tensor::from_data(&[-4.0, -1.5, -0.5, 0.25, 1.0, 2.5], &[6]).unwrap();
    check_gradient(Primitive::Expi, vec![Value::Real(x)], 0, 40);
}

#[test]
fn test_backward_transformed_expi() {
    // closed-form group followed by series group
    let x = Tensor::from_data(&[0.9, 0.5, 0.2, 0.05, 0.015, 0.01], &[6]).unwrap();
    check_gradient(Primitive::TransformedExpi, vec![Value::Real(x)], 0, 50);
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn test_backward_chain_of_records() {
    // L = expm1d(trace(A @ B)), chaining records by hand
    let mut rng = StdRng::seed_from_u64(9);
    let a = random_tensor(&mut rng, &[3, 2]);
    let b = random_tensor(&mut rng, &[2, 3]);

    let product = Record::new(
        einsum_primitive(&[&['i', 'j'], &['j', 'k']], &['i', 'k']),
        vec![Value::Real(a.clone()), Value::Real(b.clone())],
    )
    .unwrap();
    let traced = Record::<char>::new(Primitive::Trace { offset: 0 }, vec![product.output.clone()]).unwrap();
    let activated = Record::<char>::new(Primitive::Expm1d, vec![traced.output.clone()]).unwrap();

    let g_trace = activated.vjp(0, &Value::Real(Tensor::scalar(1.0))).unwrap();
    let g_product = traced.vjp(0, &g_trace).unwrap();
    let g_a = product.vjp(0, &g_product).unwrap();

    let loss = |a: &Tensor<f64>| -> f64 {
        let t: f64 = (0..3)
            .map(|i| (0..2).map(|j| a.get(&[i, j]) * b.get(&[j, i])).sum::<f64>())
            .sum();
        sfs_tensor::expm1d(t)
    };
    let data = a.to_vec();
    for i in 0..data.len() {
        let mut plus = data.clone();
        let mut minus = data.clone();
        plus[i] += STEP;
        minus[i] -= STEP;
        let numeric = (loss(&Tensor::from_vec(plus, &[3, 2]).unwrap())
            - loss(&Tensor::from_vec(minus, &[3, 2]).unwrap()))
            / (2.0 * STEP);
        assert_relative_eq!(g_a.as_real().unwrap().to_vec()[i], numeric, max_relative = 1e-5, epsilon = 1e-8);
    }
}
