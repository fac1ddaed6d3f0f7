use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use diffphot::constants::{Auid, BandPair};
use diffphot::magnitude::MagErr;
use diffphot::mock::{mock_measure, MockChannel};
use diffphot::transform::SimpleTransform;

fn pair() -> BandPair {
    ("B".to_string(), "V".to_string())
}

/// Ten standards spanning colors from 1.0 down to -0.8.
fn standards() -> Vec<(Auid, MagErr, MagErr)> {
    let errs = [0.04, 0.03, 0.06, 0.06, 0.06, 0.04, 0.03, 0.06, 0.06, 0.06];
    (0..10u32)
        .map(|i| {
            let err = errs[i as usize];
            let a = 10.0 + 0.2 * f64::from(i);
            let b = 9.0 + 0.4 * f64::from(i);
            (
                format!("star-{i}"),
                MagErr::new(a, err),
                MagErr::new(b, err),
            )
        })
        .collect()
}

#[test]
fn test_fit_recovers_mock_channel_coefficients() {
    let mut rng = StdRng::seed_from_u64(42); // fixed seed keeps the draw reproducible
    let stars = mock_measure(
        &mut rng,
        &standards(),
        MockChannel::new(0.9, 0.02, 0.01),
        MockChannel::new(1.1, 5.0, 0.01),
    )
    .unwrap();

    let xfm = SimpleTransform::fit(&pair(), &stars).unwrap();

    // the magnitude channel sets ta, the color channel tab,
    // and tb follows as ta - 1 + 1/tab
    assert_abs_diff_eq!(xfm.ta.value, 1.1, epsilon = 0.05);
    assert_abs_diff_eq!(xfm.tab.value, 0.9, epsilon = 0.05);
    assert_abs_diff_eq!(xfm.tb.value, 1.1 - 1.0 + 1.0 / 0.9, epsilon = 0.05);
    assert!(xfm.ta.err > 0.0 && xfm.tb.err > 0.0 && xfm.tab.err > 0.0);
}

#[test]
fn test_fitted_transform_standardizes_held_out_star() {
    let mut rng = StdRng::seed_from_u64(42);
    let stars = mock_measure(
        &mut rng,
        &standards(),
        MockChannel::new(0.9, 0.02, 0.01),
        MockChannel::new(1.1, 5.0, 0.01),
    )
    .unwrap();
    let xfm = SimpleTransform::fit(&pair(), &stars).unwrap();

    // a star the fit never saw, placed exactly on the model at (B, V) =
    // (10.5, 9.5), same color as the comparison star
    let instr_a = 10.5 - 1.0 * 1.1 + 5.0;
    let instr_b = instr_a - (1.0 / 0.9 + 0.02);
    let target = (MagErr::new(instr_a, 0.01), MagErr::new(instr_b, 0.01));

    let derived = xfm.apply(target, &stars[0]);

    assert_abs_diff_eq!(derived.a_first.mag, 10.5, epsilon = 0.1);
    assert_abs_diff_eq!(derived.b_first.mag, 9.5, epsilon = 0.1);
    assert_abs_diff_eq!(derived.a_second.mag, 10.5, epsilon = 0.1);
    assert_abs_diff_eq!(derived.b_second.mag, 9.5, epsilon = 0.1);
    assert_abs_diff_eq!(derived.color.mag, 1.0, epsilon = 0.1);
    assert!(derived.a_first.err > 0.01);
}
