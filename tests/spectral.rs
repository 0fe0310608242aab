//! FFT, regular sizing and convolution-contraction tests.

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sfs_tensor::spectral::fftn_vjp;
use sfs_tensor::{einsum2, fft_einsum, fftn, ifftn, next_regular, Complex64, KernelError, Tensor};

fn random_tensor(rng: &mut StdRng, shape: &[usize]) -> Tensor<f64> {
    Tensor::from_fn(shape, |_| rng.gen_range(-1.0..1.0))
}

fn assert_close(a: &Tensor<f64>, b: &Tensor<f64>) {
    assert_eq!(a.shape(), b.shape());
    for (x, y) in a.to_vec().iter().zip(b.to_vec()) {
        assert_abs_diff_eq!(*x, y, epsilon = 1e-10);
    }
}

#[test]
fn test_next_regular_is_minimal_and_smooth() {
    let smooth = |mut n: usize| {
        for p in [2, 3, 5] {
            while n % p == 0 {
                n /= p;
            }
        }
        n == 1
    };
    for target in 1..500 {
        let n = next_regular(target).unwrap();
        assert!(n >= target);
        assert!(smooth(n));
        assert!((target..n).all(|m| !smooth(m)));
    }
    assert_eq!(next_regular(1 << 20).unwrap(), 1 << 20);
    assert!(matches!(next_regular(0), Err(KernelError::InvalidTarget { target: 0 })));
    assert!(matches!(
        next_regular(usize::MAX),
        Err(KernelError::InvalidTarget { target: usize::MAX })
    ));
}

#[test]
fn test_fft_einsum_simple_convolution() {
    let a = Tensor::<f64>::from_data(&[1.0, 2.0, 3.0], &[3]).unwrap();
    let b = Tensor::<f64>::from_data(&[0.0, 1.0, 0.5], &[3]).unwrap();
    let c = fft_einsum(&a, &["t"], &b, &["t"], &["t"], &["t"]).unwrap();
    let expected = Tensor::from_data(&[0.0, 1.0, 2.5, 4.0, 1.5], &[5]).unwrap();
    assert_close(&c, &expected);
}

/// Brute force: out[i, s, k] = Σ_j Σ_{p+q=s} a[i, j, p] b[j, k, q]
#[test]
fn test_fft_einsum_with_contracted_labels() {
    let mut rng = StdRng::seed_from_u64(99);
    let a = random_tensor(&mut rng, &[2, 3, 4]);
    let b = random_tensor(&mut rng, &[3, 2, 5]);

    let out = fft_einsum(
        &a,
        &['i', 'j', 't'],
        &b,
        &['j', 'k', 't'],
        &['i', 't', 'k'],
        &['t'],
    )
    .unwrap();
    assert_eq!(out.shape(), &[2, 8, 2]);

    let expected = Tensor::from_fn(&[2, 8, 2], |ix| {
        let (i, s, k) = (ix[0], ix[1], ix[2]);
        let mut acc = 0.0;
        for j in 0..3 {
            for p in 0..4 {
                if s >= p && s - p < 5 {
                    acc += a.get(&[i, j, p]) * b.get(&[j, k, s - p]);
                }
            }
        }
        acc
    });
    assert_close(&out, &expected);
}

#[test]
fn test_fft_einsum_two_spectral_labels() {
    let mut rng = StdRng::seed_from_u64(5);
    let a = random_tensor(&mut rng, &[3, 2]);
    let b = random_tensor(&mut rng, &[2, 4]);

    let out = fft_einsum(&a, &['x', 'y'], &b, &['x', 'y'], &['x', 'y'], &['x', 'y']).unwrap();
    assert_eq!(out.shape(), &[4, 5]);

    let expected = Tensor::from_fn(&[4, 5], |ix| {
        let mut acc = 0.0;
        for p in 0..3 {
            for q in 0..2 {
                let (r, s) = (ix[0].wrapping_sub(p), ix[1].wrapping_sub(q));
                if r < 2 && s < 4 {
                    acc += a.get(&[p, q]) * b.get(&[r, s]);
                }
            }
        }
        acc
    });
    assert_close(&out, &expected);
}

#[test]
fn test_fft_einsum_without_spectral_labels_is_einsum() {
    let mut rng = StdRng::seed_from_u64(6);
    let a = random_tensor(&mut rng, &[3, 4]);
    let b = random_tensor(&mut rng, &[4, 2]);

    let via_fft = fft_einsum(&a, &['i', 'j'], &b, &['j', 'k'], &['i', 'k'], &[]).unwrap();
    let direct = einsum2!(a, ['i', 'j'], b, ['j', 'k'], ['i', 'k']).unwrap();
    assert_close(&via_fft, &direct);
}

#[test]
fn test_fft_einsum_rejects_missing_label() {
    let a = Tensor::<f64>::zeros(&[3, 2]);
    let b = Tensor::<f64>::zeros(&[3]);
    assert!(matches!(
        fft_einsum(&a, &['t', 'u'], &b, &['t'], &['t'], &['u']),
        Err(KernelError::MissingSpectralLabel { .. })
    ));
}

#[test]
fn test_ifftn_roundtrip_complex() {
    let mut rng = StdRng::seed_from_u64(12);
    let x = Tensor::<Complex64>::from_fn(&[3, 4, 5], |_| Complex64::new(rng.gen(), rng.gen()));
    let y = fftn(&x, &[3, 5], &[0, 2]).unwrap();
    let back = ifftn(&y, &[0, 2]).unwrap();
    for (a, b) in back.to_vec().iter().zip(x.to_vec()) {
        assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
        assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-12);
    }
}

#[test]
fn test_fftn_vjp_adjoint_identity_random() {
    let mut rng = StdRng::seed_from_u64(31);
    let x = Tensor::<Complex64>::from_fn(&[4, 3], |_| Complex64::new(rng.gen(), rng.gen()));
    let y = Tensor::<Complex64>::from_fn(&[6, 2], |_| Complex64::new(rng.gen(), rng.gen()));

    let fx = fftn(&x, &[6, 2], &[0, 1]).unwrap();
    let lhs: Complex64 = fx.to_vec().iter().zip(y.to_vec()).map(|(a, b)| a * b).sum();
    let vy = fftn_vjp(&y, &[4, 3], &[0, 1]).unwrap();
    let rhs: Complex64 = x.to_vec().iter().zip(vy.to_vec()).map(|(a, b)| a * b).sum();

    assert_abs_diff_eq!(lhs.re, rhs.re, epsilon = 1e-10);
    assert_abs_diff_eq!(lhs.im, rhs.im, epsilon = 1e-10);
}
