//! 5-smooth transform sizes.

use crate::error::{KernelError, Result};

/// Smallest integer `>= target` whose only prime factors are 2, 3 and 5.
///
/// These sizes keep mixed-radix FFTs on their fast paths.
///
/// ```rust
/// use sfs_tensor::next_regular;
///
/// assert_eq!(next_regular(7).unwrap(), 8);
/// assert_eq!(next_regular(11).unwrap(), 12);
/// assert_eq!(next_regular(1).unwrap(), 1);
/// ```
pub fn next_regular(target: usize) -> Result<usize> {
    if target == 0 {
        return Err(KernelError::InvalidTarget { target });
    }
    if target <= 6 || target.is_power_of_two() {
        return Ok(target);
    }

    let mut best: Option<usize> = None;
    let mut p5 = 1usize;
    while p5 < target {
        let mut p35 = p5;
        while p35 < target {
            // p2 = next power of two >= ceil(target / p35)
            let quotient = target.div_ceil(p35);
            if let Some(n) = quotient.checked_next_power_of_two().and_then(|p2| p2.checked_mul(p35)) {
                if n == target {
                    return Ok(n);
                }
                best = Some(best.map_or(n, |b| b.min(n)));
            }
            p35 = match p35.checked_mul(3) {
                Some(next) => next,
                None => break,
            };
            if p35 == target {
                return Ok(p35);
            }
        }
        if p35 >= target {
            best = Some(best.map_or(p35, |b| b.min(p35)));
        }
        p5 = match p5.checked_mul(5) {
            Some(next) => next,
            None => break,
        };
        if p5 == target {
            return Ok(p5);
        }
    }
    if p5 >= target {
        best = Some(best.map_or(p5, |b| b.min(p5)));
    }

    best.ok_or(KernelError::InvalidTarget { target })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_regular(mut n: usize) -> bool {
        for p in [2, 3, 5] {
            while n % p == 0 {
                n /= p;
            }
        }
        n == 1
    }

    #[test]
    fn test_spot_values() {
        assert_eq!(next_regular(1).unwrap(), 1);
        assert_eq!(next_regular(6).unwrap(), 6);
        assert_eq!(next_regular(7).unwrap(), 8);
        assert_eq!(next_regular(11).unwrap(), 12);
        assert_eq!(next_regular(13).unwrap(), 15);
        assert_eq!(next_regular(17).unwrap(), 18);
        assert_eq!(next_regular(26).unwrap(), 27);
        assert_eq!(next_regular(1 << 20).unwrap(), 1 << 20);
        assert_eq!(next_regular(1_000_001).unwrap(), 1_012_500);
    }

    #[test]
    fn test_matches_exhaustive_search() {
        for target in 1..2000 {
            let expected = (target..).find(|&n| is_regular(n)).unwrap();
            assert_eq!(next_regular(target).unwrap(), expected, "target {}", target);
        }
    }

    #[test]
    fn test_zero_target() {
        assert_eq!(next_regular(0), Err(KernelError::InvalidTarget { target: 0 }));
    }

    #[test]
    fn test_no_regular_above_usize_max() {
        assert_eq!(
            next_regular(usize::MAX),
            Err(KernelError::InvalidTarget { target: usize::MAX })
        );
        assert_eq!(
            next_regular(usize::MAX - 1),
            Err(KernelError::InvalidTarget { target: usize::MAX - 1 })
        );
    }

    #[test]
    fn test_large_target_does_not_overflow() {
        let target = (1usize << 62) + 1;
        let n = next_regular(target).unwrap();
        assert!(n >= target);
        assert!(is_regular(n));
    }
}
