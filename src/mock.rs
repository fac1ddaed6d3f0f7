//! # Synthetic photometry
//!
//! [`mock_measure`] turns catalog magnitudes into instrumental measurements
//! through an invertible linear model, so solver tests and benchmarks can
//! check that fitting recovers known coefficients.
//!
//! ## Model
//!
//! For a star with standard magnitudes `A`, `B` and color `C = A - B`:
//!
//! ```text
//! c = C / Tab + Zab + N(0, Sab)
//! a = A - C * Ta + Za + N(0, Sa)
//! b = a - c
//! ```
//!
//! Fitting a [`SimpleTransform`](crate::transform::SimpleTransform) on the
//! output recovers `Ta`, `Tab`, and `Tb = Ta - 1 + 1/Tab` up to the noise.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::constants::Auid;
use crate::diffphot_errors::DiffPhotError;
use crate::magnitude::MagErr;
use crate::provider::{BandSlot, EnsembleStar};

/// Instrumental quality stamped on synthetic measurements, comfortably
/// inside the standard predicate gates.
const MOCK_SNR_DB: f64 = 30.0;
const MOCK_PEAK_RATIO: f64 = 0.5;

/// One linear channel of the synthetic camera: the transform coefficient a
/// fit should recover, the instrumental zero point, and the Gaussian noise
/// sigma.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockChannel {
    pub coefficient: f64,
    pub zero_point: f64,
    pub sigma: f64,
}

impl MockChannel {
    pub fn new(coefficient: f64, zero_point: f64, sigma: f64) -> Self {
        Self {
            coefficient,
            zero_point,
            sigma,
        }
    }
}

/// Synthesize instrumental measurements for a list of catalog stars.
///
/// # Arguments
///
/// * `rng` – Noise source; seed it for reproducible fixtures.
/// * `standards` – `(auid, standard A, standard B)` rows, in output order.
/// * `color` – Channel mapping standard color to instrumental color,
///   `c = C / coefficient + zero_point + noise`.
/// * `magnitude` – Channel mapping the first band to its instrumental
///   magnitude, `a = A - C * coefficient + zero_point + noise`.
///
/// # Return
///
/// One [`EnsembleStar`] per input row, standard magnitudes copied through
/// and instrumental slots synthesized. Instrumental uncertainties are the
/// channel sigmas, with the second band carrying both in quadrature.
///
/// # Errors
///
/// [`DiffPhotError::NoiseInjectionError`] when a channel sigma is negative
/// or not finite.
pub fn mock_measure<R: Rng + ?Sized>(
    rng: &mut R,
    standards: &[(Auid, MagErr, MagErr)],
    color: MockChannel,
    magnitude: MockChannel,
) -> Result<Vec<EnsembleStar>, DiffPhotError> {
    let color_noise = Normal::new(0.0, color.sigma)?;
    let magnitude_noise = Normal::new(0.0, magnitude.sigma)?;

    let mut stars = Vec::with_capacity(standards.len());
    for (auid, standard_a, standard_b) in standards {
        let index = standard_a.mag - standard_b.mag;
        let c = index / color.coefficient + color.zero_point + color_noise.sample(rng);
        let a = standard_a.mag - index * magnitude.coefficient
            + magnitude.zero_point
            + magnitude_noise.sample(rng);
        let b = a - c;

        stars.push(EnsembleStar {
            auid: auid.clone(),
            standard_a: *standard_a,
            standard_b: *standard_b,
            instr_a: mock_slot(a, magnitude.sigma),
            instr_b: mock_slot(b, magnitude.sigma.hypot(color.sigma)),
        });
    }
    Ok(stars)
}

fn mock_slot(mag: f64, err: f64) -> BandSlot {
    BandSlot {
        magnitude: MagErr::new(mag, err),
        snr: MOCK_SNR_DB,
        peak_ratio: MOCK_PEAK_RATIO,
    }
}

#[cfg(test)]
mod mock_test {
    use super::*;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn standards() -> Vec<(Auid, MagErr, MagErr)> {
        (0..10)
            .map(|i| {
                let auid = format!("star-{i}");
                let i = f64::from(i);
                (
                    auid,
                    MagErr::new(10.0 + 0.2 * i, 0.04),
                    MagErr::new(9.0 + 0.4 * i, 0.04),
                )
            })
            .collect()
    }

    #[test]
    fn test_zero_noise_follows_model() {
        let mut rng = StdRng::seed_from_u64(1);
        let stars = mock_measure(
            &mut rng,
            &standards(),
            MockChannel::new(0.9, 0.02, 0.0),
            MockChannel::new(1.1, 5.0, 0.0),
        )
        .unwrap();

        assert_eq!(stars.len(), 10);
        for star in &stars {
            let index = star.standard_a.mag - star.standard_b.mag;
            let c = index / 0.9 + 0.02;
            let a = star.standard_a.mag - index * 1.1 + 5.0;
            approx::assert_relative_eq!(star.instr_a.magnitude.mag, a, max_relative = 1.0e-12);
            approx::assert_relative_eq!(
                star.instr_a.magnitude.mag - star.instr_b.magnitude.mag,
                c,
                max_relative = 1.0e-12
            );
        }
    }

    #[test]
    fn test_same_seed_reproduces_measurements() {
        let color = MockChannel::new(0.9, 0.02, 0.05);
        let magnitude = MockChannel::new(1.1, 5.0, 0.05);

        let mut first = StdRng::seed_from_u64(42);
        let mut second = StdRng::seed_from_u64(42);
        let mut third = StdRng::seed_from_u64(7);

        let a = mock_measure(&mut first, &standards(), color, magnitude).unwrap();
        let b = mock_measure(&mut second, &standards(), color, magnitude).unwrap();
        let c = mock_measure(&mut third, &standards(), color, magnitude).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_negative_sigma_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = mock_measure(
            &mut rng,
            &standards(),
            MockChannel::new(0.9, 0.02, -1.0),
            MockChannel::new(1.1, 5.0, 0.05),
        )
        .unwrap_err();

        assert!(matches!(err, DiffPhotError::NoiseInjectionError(_)));
    }

    #[test]
    fn test_mock_passes_quality_gates() {
        use crate::provider::{QualityPredicate, SaturationLimit, SnrFloor};

        let mut rng = StdRng::seed_from_u64(3);
        let stars = mock_measure(
            &mut rng,
            &standards(),
            MockChannel::new(0.9, 0.02, 0.05),
            MockChannel::new(1.1, 5.0, 0.05),
        )
        .unwrap();

        let saturation = SaturationLimit { threshold: 0.9 };
        let snr = SnrFloor { min_db: 10.0 };
        for star in &stars {
            assert!(saturation.accept(star));
            assert!(snr.accept(star));
        }
    }
}
