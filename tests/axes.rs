//! Axis permutation, trace and antidiagonal-sum tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sfs_tensor::{eye, sum_antidiagonals, swapaxes, trace, KernelError, Tensor};

fn random_tensor(rng: &mut StdRng, shape: &[usize]) -> Tensor<f64> {
    Tensor::from_fn(shape, |_| rng.gen_range(-1.0..1.0))
}

#[test]
fn test_swapaxes_involution() {
    let mut rng = StdRng::seed_from_u64(17);
    let a = random_tensor(&mut rng, &[2, 3, 4, 5]);
    for i in 0..4 {
        for j in 0..4 {
            let twice = swapaxes(&swapaxes(&a, i, j).unwrap(), i, j).unwrap();
            assert_eq!(twice, a);
        }
    }
}

#[test]
fn test_swapaxes_same_axis_is_identity() {
    let a = Tensor::<f64>::from_fn(&[2, 3], |ix| (ix[0] * 3 + ix[1]) as f64);
    assert_eq!(swapaxes(&a, 1, 1).unwrap(), a);
}

#[test]
fn test_trace_square_matrices() {
    let one = Tensor::<f64>::from_data(&[7.5], &[1, 1]).unwrap();
    assert_eq!(trace(&one, 0).unwrap().item().unwrap(), 7.5);

    let mut rng = StdRng::seed_from_u64(4);
    let a = random_tensor(&mut rng, &[4, 4]);
    let expected: f64 = (0..4).map(|i| a.get(&[i, i])).sum();
    assert_eq!(trace(&a, 0).unwrap().item().unwrap(), expected);
}

#[test]
fn test_trace_of_batched_tensor() {
    let mut rng = StdRng::seed_from_u64(8);
    let a = random_tensor(&mut rng, &[3, 3, 2, 2]);
    let t = trace(&a, 0).unwrap();
    assert_eq!(t.shape(), &[2, 2]);
    for k in 0..2 {
        for l in 0..2 {
            let expected: f64 = (0..3).map(|i| a.get(&[i, i, k, l])).sum();
            assert_eq!(t.get(&[k, l]), expected);
        }
    }
}

#[test]
fn test_trace_on_transposed_view() {
    let a = Tensor::<f64>::from_fn(&[2, 3], |ix| (10 * ix[0] + ix[1]) as f64);
    let at = swapaxes(&a, 0, 1).unwrap();
    // Σ at[i, i+1] = a[1, 0]
    assert_eq!(trace(&at, 1).unwrap().item().unwrap(), 10.0);
}

#[test]
fn test_eye_square() {
    let e = eye::<f64>(3, 3, 0);
    for i in 0..3 {
        for j in 0..3 {
            assert_eq!(e.get(&[i, j]), if i == j { 1.0 } else { 0.0 });
        }
    }
}

#[test]
fn test_sum_antidiagonals_matches_reversed_traces() {
    let mut rng = StdRng::seed_from_u64(23);
    let a = random_tensor(&mut rng, &[3, 4]);
    let (sums, labels) = sum_antidiagonals(&a, &[0u32, 1], &0, &1, 9).unwrap();
    assert_eq!(labels, vec![9]);
    assert_eq!(sums.shape(), &[6]);

    // Reverse axis 0 and take every diagonal trace
    let reversed = Tensor::from_fn(&[3, 4], |ix| a.get(&[2 - ix[0], ix[1]]));
    for (s, k) in (-2isize..4).enumerate() {
        let expected = trace(&reversed, k).unwrap().item().unwrap();
        assert!((sums.get(&[s]) - expected).abs() < 1e-14);
    }
}

#[test]
fn test_sum_antidiagonals_axis_order_independent() {
    let mut rng = StdRng::seed_from_u64(29);
    let a = random_tensor(&mut rng, &[2, 5, 3]);
    let labels = ["u", "v", "w"];
    let (forward, l1) = sum_antidiagonals(&a, &labels, &"w", &"u", "s").unwrap();
    let (backward, l2) = sum_antidiagonals(&a, &labels, &"u", &"w", "s").unwrap();
    assert_eq!(l1, vec!["s", "v"]);
    assert_eq!(l1, l2);
    assert_eq!(forward.shape(), &[4, 5]);
    for (x, y) in forward.to_vec().iter().zip(backward.to_vec()) {
        assert!((x - y).abs() < 1e-14);
    }
}

#[test]
fn test_axis_errors() {
    let a = Tensor::<f64>::zeros(&[2, 2]);
    assert!(matches!(
        swapaxes(&a, 2, 0),
        Err(KernelError::AxisOutOfRange { axis: 2, ndim: 2 })
    ));
    assert!(matches!(
        trace(&Tensor::<f64>::scalar(1.0), 0),
        Err(KernelError::InvalidShape { .. })
    ));
    assert!(sum_antidiagonals(&a, &['a', 'b', 'c'], &'a', &'b', 'n').is_err());
}
