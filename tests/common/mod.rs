use diffphot::catalog::{Measurement, Sequence, SequenceEntry};
use diffphot::constants::{ImageId, StarSet, DEFAULT_SATURATION_LIMIT, DEFAULT_SNR_FLOOR_DB};
use diffphot::magnitude::MagErr;
use diffphot::provider::{standard_predicates, BatchDataProvider};
use diffphot::session::{batch_images, ImageRecord};
use diffphot::settings::SessionSettings;

use hifitime::{Duration, Epoch};

pub const TARGET: &str = "000-TGT-001";
pub const COMP: &str = "000-BBC-001";
pub const CHECK: &str = "000-BBC-002";
pub const STAR_3: &str = "000-BBC-003";

pub fn image(id: ImageId, band: &str, minutes: f64, airmass: f64) -> ImageRecord {
    ImageRecord::new(
        id,
        band,
        Epoch::from_gregorian_utc_at_midnight(2023, 7, 4) + Duration::from_seconds(60.0 * minutes),
        Duration::from_seconds(30.0),
        airmass,
        -10.0,
        format!("frame-{id:04}.fits"),
    )
}

pub fn measurement(image_id: ImageId, auid: &str, mag: f64) -> Measurement {
    Measurement::new(image_id, auid, MagErr::new(mag, 0.02), 1.0e5, 30.0, 0.5)
}

/// The RR Lyr field: three calibrated ensemble stars and the program star.
pub fn sequence() -> Sequence {
    let mut seq = Sequence::new("RR Lyr", "X28382AB", TARGET);
    seq.insert(
        SequenceEntry::new(COMP)
            .with_magnitude("B", MagErr::new(10.1, 0.02))
            .with_magnitude("V", MagErr::new(9.7, 0.02)),
    );
    seq.insert(
        SequenceEntry::new(CHECK)
            .with_magnitude("B", MagErr::new(10.8, 0.02))
            .with_magnitude("V", MagErr::new(10.2, 0.02)),
    );
    seq.insert(
        SequenceEntry::new(STAR_3)
            .with_magnitude("B", MagErr::new(11.5, 0.02))
            .with_magnitude("V", MagErr::new(10.6, 0.02)),
    );
    seq
}

/// Instrumental `(b, v)` magnitudes of the field under the linear model
/// `b = B - (2.0 + 1.1 C) + eps_b` and `v = b - C / 0.9 + eps_c` with small
/// per-star residuals. The target sits at B = 9.35, V = 8.95 and shares the
/// comparison star's color.
pub fn instrumentals() -> Vec<(&'static str, f64, f64)> {
    vec![
        (COMP, 7.670, 7.219556),
        (CHECK, 8.128, 7.470333),
        (STAR_3, 8.514, 7.512),
        (TARGET, 6.91, 6.465556),
    ]
}

/// Session settings reducing the B,V pair through [`COMP`] and [`CHECK`].
pub fn field_settings() -> SessionSettings {
    SessionSettings::from_json_str(
        r#"{
            "bands": ["B", "V"],
            "diff_photometry": {
                "BV": {"comp": "000-BBC-001", "check": "000-BBC-002"}
            }
        }"#,
    )
    .unwrap()
}

/// A clean session of `cycles` B,V batches at ten-minute cadence with
/// slowly rising airmass. `zero_shift` offsets every instrumental
/// magnitude, the way a different night's zero point would.
pub fn field_provider(cycles: u32, zero_shift: f64) -> BatchDataProvider {
    let mut images = Vec::new();
    for k in 0..cycles {
        let airmass = 1.1 + 0.05 * f64::from(k);
        images.push(image(2 * k + 1, "B", 10.0 * f64::from(k), airmass));
        images.push(image(2 * k + 2, "V", 10.0 * f64::from(k) + 1.0, airmass));
    }
    let session = batch_images(&images);
    assert_eq!(session.len(), cycles as usize);

    let stars = instrumentals();
    let mut measurements = Vec::new();
    for k in 0..cycles {
        for &(auid, b_mag, v_mag) in &stars {
            measurements.push(measurement(2 * k + 1, auid, b_mag + zero_shift));
            measurements.push(measurement(2 * k + 2, auid, v_mag + zero_shift));
        }
    }

    BatchDataProvider::new(
        &images,
        session,
        measurements,
        sequence(),
        standard_predicates(
            DEFAULT_SATURATION_LIMIT,
            DEFAULT_SNR_FLOOR_DB,
            StarSet::default(),
        ),
    )
}
