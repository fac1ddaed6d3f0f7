//! # Session images and batching
//!
//! A photometric session is a time-sorted list of single-band exposures
//! cycling through the session's filters. [`batch_images`] groups them into
//! [`Batch`]es, each covering every band exactly once in the canonical order
//! established by the session's leading cycle.
//!
//! The grouping is greedy and non-backtracking: a window that does not match
//! the canonical order loses only its first image, so a single dropped or
//! extra exposure costs at most a handful of frames and matching resumes at
//! the next complete cycle. A session whose filter ordering is irregular
//! throughout degrades to near-zero batches; callers detect that through the
//! batch count, not through an error.

use hifitime::{Duration, Epoch};
use itertools::Itertools;
use tracing::warn;

use crate::constants::{Band, BatchId, BatchImages, ImageId};

/// One calibrated exposure of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    /// Session-scoped unique identifier.
    pub image_id: ImageId,
    /// Filter the exposure was taken through.
    pub band: Band,
    /// Mid-exposure time.
    pub time: Epoch,
    /// Exposure duration.
    pub exposure: Duration,
    /// Airmass at mid-exposure.
    pub airmass: f64,
    /// CCD temperature in degrees Celsius.
    pub temperature: f64,
    /// Path of the calibrated frame.
    pub path: camino::Utf8PathBuf,
}

impl ImageRecord {
    pub fn new(
        image_id: ImageId,
        band: impl Into<Band>,
        time: Epoch,
        exposure: Duration,
        airmass: f64,
        temperature: f64,
        path: impl Into<camino::Utf8PathBuf>,
    ) -> Self {
        Self {
            image_id,
            band: band.into(),
            time,
            exposure,
            airmass,
            temperature,
            path: path.into(),
        }
    }
}

/// One complete band cycle: exactly one image per session band, in the
/// canonical order. Aggregates are simple means of the members; ranges are
/// member max − min.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Dense 1-based identifier, in emission order.
    pub batch_id: BatchId,
    /// Member image ids, in canonical band order.
    pub images: BatchImages,
    /// Mean of the member times.
    pub time: Epoch,
    /// Spread of the member times.
    pub time_range: Duration,
    /// Mean of the member airmasses.
    pub airmass: f64,
    /// Spread of the member airmasses.
    pub airmass_range: f64,
    /// Mean of the member CCD temperatures.
    pub temperature: f64,
    /// Spread of the member CCD temperatures.
    pub temperature_range: f64,
}

impl Batch {
    fn from_window(batch_id: BatchId, window: &[ImageRecord]) -> Self {
        let n = window.len() as f64;
        let t0 = window[0].time;

        let offsets: Vec<f64> = window
            .iter()
            .map(|img| (img.time - t0).to_seconds())
            .collect();
        let mean_offset = offsets.iter().sum::<f64>() / n;
        let min_offset = offsets.iter().copied().fold(f64::INFINITY, f64::min);
        let max_offset = offsets.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let airmasses: Vec<f64> = window.iter().map(|img| img.airmass).collect();
        let temperatures: Vec<f64> = window.iter().map(|img| img.temperature).collect();

        Self {
            batch_id,
            images: window.iter().map(|img| img.image_id).collect(),
            time: t0 + Duration::from_seconds(mean_offset),
            time_range: Duration::from_seconds(max_offset - min_offset),
            airmass: mean(&airmasses),
            airmass_range: range(&airmasses),
            temperature: mean(&temperatures),
            temperature_range: range(&temperatures),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn range(values: &[f64]) -> f64 {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    max - min
}

/// Result of batching one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionBatches {
    /// Canonical band order established by the leading cycle.
    pub band_order: Vec<Band>,
    /// Emitted batches, ids dense from 1.
    pub batches: Vec<Batch>,
    /// Images dropped by advance-by-1 recovery, in drop order. Images of an
    /// incomplete trailing window are not batched and not counted here.
    pub skipped: Vec<ImageId>,
}

impl SessionBatches {
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Batch by id. Ids are dense from 1, so this is an index lookup.
    pub fn batch(&self, batch_id: BatchId) -> Option<&Batch> {
        self.batches.get(batch_id.checked_sub(1)? as usize)
    }
}

/// Group a time-sorted image list into complete band cycles.
///
/// Let `N` be the number of distinct bands present and `order` the band
/// sequence of the first `N` images. A window of `N` consecutive images
/// whose bands equal `order` element-wise becomes the next batch; otherwise
/// the window's first image is skipped (logged) and matching retries one
/// position later. Terminates when fewer than `N` images remain.
///
/// # Arguments
///
/// * `images` – Session exposures in strictly ascending time order.
///
/// # Return
///
/// A [`SessionBatches`] with the established band order, the emitted
/// batches, and the skipped image ids. Empty input yields an empty result.
pub fn batch_images(images: &[ImageRecord]) -> SessionBatches {
    let n = images.iter().map(|img| img.band.as_str()).unique().count();
    if n == 0 {
        return SessionBatches::default();
    }

    let order: Vec<Band> = images[..n].iter().map(|img| img.band.clone()).collect();

    let mut batches = Vec::with_capacity(images.len() / n);
    let mut skipped = Vec::new();
    let mut next = 0usize;
    let mut batch_id: BatchId = 1;

    while next + n <= images.len() {
        let window = &images[next..next + n];
        if window
            .iter()
            .zip(order.iter())
            .all(|(img, band)| img.band == *band)
        {
            batches.push(Batch::from_window(batch_id, window));
            batch_id += 1;
            next += n;
        } else {
            let img = &images[next];
            warn!(
                "image {} ({}) breaks the band cycle, skipped",
                img.image_id, img.band
            );
            skipped.push(img.image_id);
            next += 1;
        }
    }

    SessionBatches {
        band_order: order,
        batches,
        skipped,
    }
}
