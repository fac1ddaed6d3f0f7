//! # AAVSO extended-format report
//!
//! [`AavsoReport`] renders the selected per-band series as an AAVSO
//! extended-format submission, one comma-delimited observation line per
//! batch and band.
//!
//! See <https://www.aavso.org/aavso-extended-file-format> for the format
//! specification. Times are Julian dates, magnitudes carry three decimals,
//! uncertainties two significant figures, and airmasses five. The check
//! star column reports the magnitude derived through the same transform
//! chain as the target, so the submission carries its own validation. When
//! no check star is configured both check columns read `na`.

use std::io::Write;

use crate::diffphot_errors::DiffPhotError;
use crate::selection::BandSeries;

/// Software identification for the report header.
pub const REPORT_SOFTWARE: &str = concat!("diffphot ", env!("CARGO_PKG_VERSION"));

/// Format `value` to `digits` significant figures with trailing zeros
/// trimmed, the way `%g` prints.
fn sig_figs(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return format!("{value}");
    }
    let magnitude = value.abs().log10().floor() as i32;
    if magnitude < -4 || magnitude >= digits as i32 {
        let precision = digits.saturating_sub(1);
        return format!("{value:.precision$e}");
    }
    let decimals = (digits as i32 - 1 - magnitude).max(0) as usize;
    let formatted = format!("{value:.decimals$}");
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

/// Writer of AAVSO extended-format photometry reports.
pub struct AavsoReport<W: Write> {
    writer: W,
    target: String,
    chart: String,
    obscode: String,
}

impl<W: Write> AavsoReport<W> {
    /// # Arguments
    ///
    /// * `writer` – Destination of the report text.
    /// * `target` – Program star name, upper-cased on output.
    /// * `chart` – AAVSO chart id the sequence came from.
    /// * `obscode` – Observer code for the header.
    pub fn new(writer: W, target: &str, chart: &str, obscode: &str) -> Self {
        Self {
            writer,
            target: target.to_uppercase(),
            chart: chart.to_string(),
            obscode: obscode.to_string(),
        }
    }

    /// Write the directive block and the column header.
    pub fn header(&mut self) -> Result<(), DiffPhotError> {
        writeln!(self.writer, "#TYPE=Extended")?;
        writeln!(self.writer, "#OBSCODE={}", self.obscode)?;
        writeln!(self.writer, "#SOFTWARE={REPORT_SOFTWARE}")?;
        writeln!(self.writer, "#DELIM=,")?;
        writeln!(self.writer, "#DATE=JD")?;
        writeln!(self.writer, "#OBSTYPE=CCD")?;
        writeln!(
            self.writer,
            "#NAME,DATE,MAG,MERR,FILT,TRANS,MTYPE,CNAME,CMAG,KNAME,KMAG,AMASS,GROUP,CHART,NOTES"
        )?;
        Ok(())
    }

    /// Write one observation line per row of `series`.
    ///
    /// The FILT column is the first character of the band name, the GROUP
    /// column the batch id.
    pub fn body(&mut self, series: &BandSeries) -> Result<(), DiffPhotError> {
        let filter = series.band.chars().next().unwrap_or('?');
        for row in &series.rows {
            let (check_name, check_mag) = match &row.check {
                Some(check) => (check.auid.as_str(), format!("{:6.3}", check.derived.mag)),
                None => ("na", "na".to_string()),
            };
            writeln!(
                self.writer,
                "{},{:14.6},{:6.3},{},{},NO,STD,{},{:6.3},{},{},{},{},{},Transform_method=simple",
                self.target,
                row.time.to_jde_utc_days(),
                row.magnitude.mag,
                sig_figs(row.magnitude.err, 2),
                filter,
                row.comparison,
                row.comparison_magnitude.mag,
                check_name,
                check_mag,
                sig_figs(row.airmass, 5),
                row.batch_id,
                self.chart,
            )?;
        }
        Ok(())
    }

    /// Render a whole report: header, then every series in order.
    pub fn render(&mut self, series: &[BandSeries]) -> Result<(), DiffPhotError> {
        self.header()?;
        for s in series {
            self.body(s)?;
        }
        Ok(())
    }
}
