//! The boundary between the time tool module and its fit subsystem.
//!
//! The module owns a fit subsystem through [FitSubsystem] and lends it a [SignalMonitor]
//! on every analysis call, so intermediate signals can be mirrored into plots without the
//! fit knowing what a plot is.
use ndarray::ArrayView1;
use std::ops::Range;

use super::config::FexSettings;
use super::payload::{FrameView, PvWaveformView};

/// Linear fit of signal against reference: signal = p0 + p1 * reference
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatioFit {
    p0: f64,
    p1: f64,
}

impl RatioFit {
    pub fn new(p0: f64, p1: f64) -> Self {
        Self { p0, p1 }
    }

    /// Least squares fit of `signal` against `reference` over `region`
    pub fn fit(signal: ArrayView1<f64>, reference: ArrayView1<f64>, region: Range<usize>) -> Self {
        let end = region.end.min(signal.len()).min(reference.len());
        let region = region.start.min(end)..end;
        let n = region.len() as f64;
        if n == 0.0 {
            return Self::default();
        }
        let (mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0);
        for k in region {
            let (x, y) = (reference[k], signal[k]);
            sx += x;
            sy += y;
            sxx += x * x;
            sxy += x * y;
        }
        let denom = n * sxx - sx * sx;
        if denom == 0.0 {
            return Self::new(sy / n, 0.0);
        }
        let p1 = (n * sxy - sx * sy) / denom;
        Self::new((sy - p1 * sx) / n, p1)
    }

    pub fn p0(&self) -> f64 {
        self.p0
    }

    pub fn p1(&self) -> f64 {
        self.p1
    }
}

/// Outputs of one fit, in the order they are published
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FitResult {
    pub amplitude: f64,
    pub filtered_position: f64,
    pub filtered_pos_ps: f64,
    pub filtered_fwhm: f64,
    pub next_amplitude: f64,
    pub ref_amplitude: f64,
    pub status: bool,
}

impl FitResult {
    pub fn scalars(&self) -> [f64; 6] {
        [
            self.amplitude,
            self.filtered_position,
            self.filtered_pos_ps,
            self.filtered_fwhm,
            self.next_amplitude,
            self.ref_amplitude,
        ]
    }
}

/// Hooks through which a fit subsystem exposes its intermediate signals
pub trait SignalMonitor {
    fn monitor_raw_sig(&mut self, sig: ArrayView1<f64>, sb: ArrayView1<f64>);
    fn monitor_ref_sig(&mut self, reference: ArrayView1<f64>);
    fn monitor_sub_sig(&mut self, sub: ArrayView1<f64>);
    fn monitor_sub_sig_u(&mut self, sub: ArrayView1<f64>);
    /// Only the columns in `columns` carry filtered values
    fn monitor_flt_sig(&mut self, flt: ArrayView1<f64>, columns: Range<usize>);
    fn monitor_corr(&mut self, previous: &RatioFit, current: &RatioFit);
}

/// Monitor that discards everything
#[derive(Debug, Default)]
pub struct NullMonitor;

impl SignalMonitor for NullMonitor {
    fn monitor_raw_sig(&mut self, _sig: ArrayView1<f64>, _sb: ArrayView1<f64>) {}
    fn monitor_ref_sig(&mut self, _reference: ArrayView1<f64>) {}
    fn monitor_sub_sig(&mut self, _sub: ArrayView1<f64>) {}
    fn monitor_sub_sig_u(&mut self, _sub: ArrayView1<f64>) {}
    fn monitor_flt_sig(&mut self, _flt: ArrayView1<f64>, _columns: Range<usize>) {}
    fn monitor_corr(&mut self, _previous: &RatioFit, _current: &RatioFit) {}
}

/// Capability contract of a time tool fit subsystem
pub trait FitSubsystem {
    fn settings(&self) -> &FexSettings;

    /// Drop all accumulated state (references, sidebands, previous fits) and reload
    /// the settings. Called on every detector reconfiguration and plot teardown.
    fn reinitialize(&mut self);

    /// Fill freshly created plots with whatever state the fit already holds
    fn init_plots(&mut self, monitor: &mut dyn SignalMonitor);

    fn analyze_frame(
        &mut self,
        frame: &FrameView<'_>,
        bykik: bool,
        no_laser: bool,
        monitor: &mut dyn SignalMonitor,
    );

    /// Sideband and reference are optional; a missing one is treated as absent input
    fn analyze_projections(
        &mut self,
        signal: &PvWaveformView<'_>,
        sideband: Option<&PvWaveformView<'_>>,
        reference: Option<&PvWaveformView<'_>>,
        bykik: bool,
        no_laser: bool,
        monitor: &mut dyn SignalMonitor,
    );

    /// Result of the most recent analysis call
    fn result(&self) -> FitResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn test_ratio_fit_line() {
        let reference = Array1::from(vec![1.0, 2.0, 3.0, 4.0]);
        let signal = reference.mapv(|x| 0.5 + 2.0 * x);
        let fit = RatioFit::fit(signal.view(), reference.view(), 0..4);
        assert!((fit.p0() - 0.5).abs() < 1e-12);
        assert!((fit.p1() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_fit_flat_reference() {
        let reference = Array1::from(vec![2.0; 3]);
        let signal = Array1::from(vec![1.0, 2.0, 3.0]);
        let fit = RatioFit::fit(signal.view(), reference.view(), 0..10);
        assert_eq!(fit, RatioFit::new(2.0, 0.0));
    }
}
