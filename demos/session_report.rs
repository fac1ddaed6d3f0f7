//! Reduce a synthetic two-band session and print the AAVSO report.
//!
//! Run with:
//!   cargo run --example session_report
//!
//! Diagnostics go to stderr, the report itself to stdout, so the output can
//! be redirected straight into a submission file:
//!   cargo run --example session_report > webobs.csv

use std::io;

use rand::rngs::StdRng;
use rand::SeedableRng;

use hifitime::{Duration, Epoch};

use diffphot::catalog::{Measurement, Sequence, SequenceEntry};
use diffphot::constants::{Auid, StarSet, DEFAULT_SATURATION_LIMIT, DEFAULT_SNR_FLOOR_DB};
use diffphot::diffphot_errors::DiffPhotError;
use diffphot::magnitude::MagErr;
use diffphot::mock::{mock_measure, MockChannel};
use diffphot::params::ReductionParams;
use diffphot::provider::{standard_predicates, BatchDataProvider};
use diffphot::reduction::reduce_session;
use diffphot::report::AavsoReport;
use diffphot::session::{batch_images, ImageRecord};
use diffphot::settings::SessionSettings;

const TARGET: &str = "000-TGT-001";
const CYCLES: u32 = 6;

/// Ten calibrated standards on a color ramp, plus the program star.
///
/// The last tuple is the target; it rides through the same mock channels as
/// the ensemble so its derived magnitudes land back on (B, V) =
/// (9.35, 8.95).
fn standards() -> Vec<(Auid, MagErr, MagErr)> {
    let mut stars: Vec<(Auid, MagErr, MagErr)> = (0..10u32)
        .map(|i| {
            let a = 10.0 + 0.2 * f64::from(i);
            let b = 9.0 + 0.4 * f64::from(i);
            (
                format!("000-BBC-{:03}", i + 1),
                MagErr::new(a, 0.02),
                MagErr::new(b, 0.02),
            )
        })
        .collect();
    stars.push((
        TARGET.to_string(),
        MagErr::new(9.35, 0.02),
        MagErr::new(8.95, 0.02),
    ));
    stars
}

/// Mock a full observing session: `CYCLES` B,V cycles at ten-minute
/// cadence, every star re-measured through the noisy channels per cycle.
fn synthetic_session() -> Result<BatchDataProvider, DiffPhotError> {
    let stars = standards();

    let mut images = Vec::new();
    for k in 0..CYCLES {
        let start = Epoch::from_gregorian_utc_at_midnight(2023, 7, 4)
            + Duration::from_seconds(600.0 * f64::from(k));
        let airmass = 1.12 + 0.03 * f64::from(k);
        images.push(ImageRecord::new(
            2 * k + 1,
            "B",
            start,
            Duration::from_seconds(30.0),
            airmass,
            -10.0,
            format!("frame-{:04}.fits", 2 * k + 1),
        ));
        images.push(ImageRecord::new(
            2 * k + 2,
            "V",
            start + Duration::from_seconds(60.0),
            Duration::from_seconds(30.0),
            airmass,
            -10.0,
            format!("frame-{:04}.fits", 2 * k + 2),
        ));
    }
    let session = batch_images(&images);

    let mut rng = StdRng::seed_from_u64(42);
    let mut measurements = Vec::new();
    for k in 0..CYCLES {
        let measured = mock_measure(
            &mut rng,
            &stars,
            MockChannel::new(0.9, 0.02, 0.01),
            MockChannel::new(1.1, 5.0, 0.01),
        )?;
        for star in &measured {
            measurements.push(Measurement::new(
                2 * k + 1,
                star.auid.clone(),
                star.instr_a.magnitude,
                1.0e5,
                30.0,
                0.5,
            ));
            measurements.push(Measurement::new(
                2 * k + 2,
                star.auid.clone(),
                star.instr_b.magnitude,
                1.0e5,
                30.0,
                0.5,
            ));
        }
    }

    let mut sequence = Sequence::new("RR Lyr", "X28382AB", TARGET);
    for (auid, a, b) in stars.iter().filter(|(auid, _, _)| auid != TARGET) {
        sequence.insert(
            SequenceEntry::new(auid.clone())
                .with_magnitude("B", *a)
                .with_magnitude("V", *b),
        );
    }

    Ok(BatchDataProvider::new(
        &images,
        session,
        measurements,
        sequence,
        standard_predicates(
            DEFAULT_SATURATION_LIMIT,
            DEFAULT_SNR_FLOOR_DB,
            StarSet::default(),
        ),
    ))
}

fn main() -> Result<(), DiffPhotError> {
    let provider = synthetic_session()?;

    // the comparison star shares the target's color of 0.4
    let settings = SessionSettings::from_json_str(
        r#"{
            "bands": ["B", "V"],
            "diff_photometry": {
                "BV": {"comp": "000-BBC-004", "check": "000-BBC-005"}
            }
        }"#,
    )?;
    let params = ReductionParams::default();

    let reduction = reduce_session(&provider, &settings, &params)?;
    for series in &reduction.pair_series {
        eprintln!(
            "pair {}{}: {} batches fitted, {} skipped",
            series.band_pair.0,
            series.band_pair.1,
            series.rows.len(),
            series.skipped.len()
        );
        if let Some(first) = series.rows.first() {
            eprintln!("  batch {}: {}", first.batch_id, first.transform);
        }
    }
    for series in &reduction.selected {
        eprintln!("band {}: {} rows after outlier rejection", series.band, series.len());
    }

    let stdout = io::stdout();
    AavsoReport::new(
        stdout.lock(),
        provider.target_name(),
        provider.chart_id(),
        "DEMO1",
    )
    .render(&reduction.selected)?;
    Ok(())
}
