use ndarray::{Array1, ArrayView1, Zip};
use std::ops::Range;

use super::config::FexSettings;
use super::fit::{FitResult, FitSubsystem, RatioFit, SignalMonitor};
use super::payload::{FrameView, PvWaveformView};

/// Reference time tool fit.
///
/// The signal is divided by a running reference built from laser-absent shots, filtered
/// with a fixed kernel, and the strongest edge of the filtered signal is reported.
#[derive(Debug, Clone)]
pub struct Fex {
    settings: FexSettings,
    sideband: Option<Array1<f64>>,
    reference: Option<Array1<f64>>,
    previous_fit: Option<RatioFit>,
    result: FitResult,
}

impl Fex {
    pub fn new(settings: FexSettings) -> Self {
        Self {
            settings,
            sideband: None,
            reference: None,
            previous_fit: None,
            result: FitResult::default(),
        }
    }

    pub fn reference(&self) -> Option<ArrayView1<f64>> {
        self.reference.as_ref().map(|r| r.view())
    }

    fn columns_of(&self, wf: &PvWaveformView<'_>) -> Array1<f64> {
        Array1::from_iter((0..self.settings.columns).map(|k| wf.get(k).unwrap_or(0) as f64))
    }

    fn filter_region(&self) -> Range<usize> {
        let start = self.settings.spec_begin + self.settings.nwts();
        start.min(self.settings.spec_end)..self.settings.spec_end
    }

    /// Fold a new sideband measurement into the running average and return the average
    fn update_sideband(&mut self, sb: Array1<f64>) -> Array1<f64> {
        let conv = self.settings.sb_convergence;
        let avg = match self.sideband.take() {
            Some(prev) if prev.len() == sb.len() => prev * (1.0 - conv) + sb * conv,
            _ => sb,
        };
        self.sideband = Some(avg.clone());
        avg
    }

    fn update_reference(&mut self, raw: &Array1<f64>) {
        let conv = self.settings.ref_convergence;
        let reference = match self.reference.take() {
            Some(prev) if prev.len() == raw.len() => prev * (1.0 - conv) + raw * conv,
            _ => raw.clone(),
        };
        self.reference = Some(reference);
    }

    fn process(
        &mut self,
        sig: Array1<f64>,
        sb: Option<Array1<f64>>,
        reference: Option<Array1<f64>>,
        bykik: bool,
        no_laser: bool,
        monitor: &mut dyn SignalMonitor,
    ) {
        self.result = FitResult::default();

        let sb = match sb {
            Some(sb) => self.update_sideband(sb),
            None => Array1::zeros(sig.len()),
        };
        monitor.monitor_raw_sig(sig.view(), sb.view());
        let raw = &sig - &sb;

        if let Some(reference) = reference {
            self.reference = Some(reference);
        } else if no_laser {
            self.update_reference(&raw);
        }
        if let Some(reference) = &self.reference {
            monitor.monitor_ref_sig(reference.view());
        }

        // Vetoed shots only feed the raw mirror
        if no_laser || bykik {
            return;
        }
        let reference = match &self.reference {
            Some(r) if r.len() == raw.len() => r.clone(),
            _ => return,
        };

        let sub = Zip::from(&raw)
            .and(&reference)
            .map_collect(|r, f| if *f != 0.0 { r / f - 1.0 } else { 0.0 });
        let sub_u = &raw - &reference;
        monitor.monitor_sub_sig(sub.view());
        monitor.monitor_sub_sig_u(sub_u.view());

        let fit = RatioFit::fit(
            raw.view(),
            reference.view(),
            self.settings.spec_begin..self.settings.spec_end,
        );
        if let Some(previous) = &self.previous_fit {
            monitor.monitor_corr(previous, &fit);
        }
        self.previous_fit = Some(fit);

        let region = self.filter_region();
        let flt = self.filter(sub.view(), region.clone());
        monitor.monitor_flt_sig(flt.view(), region.clone());

        self.find_edge(flt.view(), region);
        self.result.ref_amplitude = mean_over(
            reference.view(),
            self.settings.spec_begin..self.settings.spec_end,
        );
    }

    /// Kernel ends on the output column: flt[k] = sum_i w[i] * sub[k + 1 + i - nwts]
    fn filter(&self, sub: ArrayView1<f64>, region: Range<usize>) -> Array1<f64> {
        let nwts = self.settings.nwts();
        let mut flt = Array1::<f64>::zeros(sub.len());
        for k in region.start..region.end.min(sub.len()) {
            flt[k] = self
                .settings
                .weights
                .iter()
                .enumerate()
                .map(|(i, w)| w * sub[k + 1 + i - nwts])
                .sum();
        }
        flt
    }

    fn find_edge(&mut self, flt: ArrayView1<f64>, region: Range<usize>) {
        let region = region.start..region.end.min(flt.len());
        // First maximum, so a flat signal reports the start of the region
        let peak = match region
            .clone()
            .reduce(|best, k| if flt[k] > flt[best] { k } else { best })
        {
            Some(p) => p,
            None => return,
        };
        let amplitude = flt[peak];

        // Parabolic refinement around the peak bin
        let mut position = peak as f64;
        if peak > region.start && peak + 1 < region.end {
            let (ym, y0, yp) = (flt[peak - 1], flt[peak], flt[peak + 1]);
            let denom = ym - 2.0 * y0 + yp;
            if denom != 0.0 {
                position += 0.5 * (ym - yp) / denom;
            }
        }

        let half = 0.5 * amplitude;
        let mut left = peak;
        while left > region.start && flt[left - 1] > half {
            left -= 1;
        }
        let mut right = peak;
        while right + 1 < region.end && flt[right + 1] > half {
            right += 1;
        }
        let left_edge = if left > region.start {
            crossing(left - 1, flt[left - 1], flt[left], half)
        } else {
            left as f64
        };
        let right_edge = if right + 1 < region.end {
            crossing(right, flt[right], flt[right + 1], half)
        } else {
            right as f64
        };

        let next_amplitude = region
            .clone()
            .filter(|k| *k < left || *k > right)
            .map(|k| flt[k])
            .fold(f64::NEG_INFINITY, f64::max);

        self.result = FitResult {
            amplitude,
            filtered_position: position,
            filtered_pos_ps: polynomial(&self.settings.calib_poly, position),
            filtered_fwhm: right_edge - left_edge,
            next_amplitude: if next_amplitude.is_finite() {
                next_amplitude
            } else {
                0.0
            },
            ref_amplitude: 0.0,
            status: amplitude > 0.0,
        };
    }
}

/// Position between bins `k` and `k + 1` where a line through (y0, y1) crosses `level`
fn crossing(k: usize, y0: f64, y1: f64, level: f64) -> f64 {
    if y1 == y0 {
        return k as f64;
    }
    k as f64 + (level - y0) / (y1 - y0)
}

fn polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

fn mean_over(values: ArrayView1<f64>, region: Range<usize>) -> f64 {
    let end = region.end.min(values.len());
    let start = region.start.min(end);
    if start == end {
        return 0.0;
    }
    values.slice(ndarray::s![start..end]).sum() / (end - start) as f64
}

impl FitSubsystem for Fex {
    fn settings(&self) -> &FexSettings {
        &self.settings
    }

    fn reinitialize(&mut self) {
        spdlog::debug!(
            "Reinitializing time tool fit for {}",
            self.settings.base_name
        );
        self.sideband = None;
        self.reference = None;
        self.previous_fit = None;
        self.result = FitResult::default();
    }

    fn init_plots(&mut self, monitor: &mut dyn SignalMonitor) {
        if let Some(reference) = &self.reference {
            monitor.monitor_ref_sig(reference.view());
        }
    }

    fn analyze_frame(
        &mut self,
        frame: &FrameView<'_>,
        bykik: bool,
        no_laser: bool,
        monitor: &mut dyn SignalMonitor,
    ) {
        let cols = self.settings.columns;
        let [sig_lo, sig_hi] = self.settings.sig_roi;
        let [sb_lo, sb_hi] = self.settings.sb_roi;

        let mut sig = Array1::<f64>::zeros(cols);
        let mut sb = Array1::<f64>::zeros(cols);
        // Both arrays are freshly allocated and therefore contiguous
        let nsig = match sig.as_slice_mut() {
            Some(out) => frame.project_rows(sig_lo..sig_hi, out),
            None => 0,
        };
        let nsb = match sb.as_slice_mut() {
            Some(out) => frame.project_rows(sb_lo..sb_hi, out),
            None => 0,
        };
        let sb = if nsb > 0 && nsig > 0 {
            Some(sb * (nsig as f64 / nsb as f64))
        } else {
            None
        };
        self.process(sig, sb, None, bykik, no_laser, monitor);
    }

    fn analyze_projections(
        &mut self,
        signal: &PvWaveformView<'_>,
        sideband: Option<&PvWaveformView<'_>>,
        reference: Option<&PvWaveformView<'_>>,
        bykik: bool,
        no_laser: bool,
        monitor: &mut dyn SignalMonitor,
    ) {
        let sig = self.columns_of(signal);
        let sb = sideband.map(|wf| self.columns_of(wf));
        let reference = reference.map(|wf| self.columns_of(wf));
        self.process(sig, sb, reference, bykik, no_laser, monitor);
    }

    fn result(&self) -> FitResult {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::NullMonitor;
    use crate::payload::{encode_frame, encode_pv_waveform};
    use crate::plots::PlotSet;
    use crate::source_id::ClockTime;

    fn settings() -> FexSettings {
        FexSettings {
            columns: 16,
            spec_begin: 0,
            spec_end: 16,
            weights: vec![1.0],
            ..Default::default()
        }
    }

    #[test]
    fn test_no_reference_no_status() {
        let mut fex = Fex::new(settings());
        let bytes = encode_pv_waveform(1, ClockTime::default(), &[100; 16]);
        let wf = PvWaveformView::parse(&bytes).unwrap();
        fex.analyze_projections(&wf, None, None, false, false, &mut NullMonitor);
        assert!(!fex.result().status);
        assert!(fex.reference().is_none());
    }

    #[test]
    fn test_edge_found_after_reference() {
        let mut fex = Fex::new(settings());
        let flat = encode_pv_waveform(1, ClockTime::default(), &[100; 16]);
        let flat = PvWaveformView::parse(&flat).unwrap();
        fex.analyze_projections(&flat, None, None, false, true, &mut NullMonitor);
        assert!(fex.reference().is_some());

        let mut samples = [100u32; 16];
        samples[8] = 150;
        let bumped = encode_pv_waveform(1, ClockTime::default(), &samples);
        let bumped = PvWaveformView::parse(&bumped).unwrap();
        fex.analyze_projections(&bumped, None, None, false, false, &mut NullMonitor);
        let result = fex.result();
        assert!(result.status);
        assert!((result.amplitude - 0.5).abs() < 1e-12);
        assert!((result.filtered_position - 8.0).abs() < 1e-12);
        assert!((result.filtered_pos_ps - 8.0).abs() < 1e-12);
        assert!((result.ref_amplitude - 100.0).abs() < 1e-12);
        assert!(result.filtered_fwhm > 0.0);
        assert_eq!(result.next_amplitude, 0.0);
    }

    #[test]
    fn test_reinitialize_drops_reference() {
        let mut fex = Fex::new(settings());
        let flat = encode_pv_waveform(1, ClockTime::default(), &[100; 16]);
        let flat = PvWaveformView::parse(&flat).unwrap();
        fex.analyze_projections(&flat, None, None, false, true, &mut NullMonitor);
        fex.reinitialize();
        assert!(fex.reference().is_none());
        assert_eq!(fex.result(), FitResult::default());
    }

    #[test]
    fn test_flat_signal_reports_first_column() {
        let mut fex = Fex::new(settings());
        let flat = encode_pv_waveform(1, ClockTime::default(), &[100; 16]);
        let flat = PvWaveformView::parse(&flat).unwrap();
        fex.analyze_projections(&flat, None, None, false, true, &mut NullMonitor);
        fex.analyze_projections(&flat, None, None, false, false, &mut NullMonitor);
        let result = fex.result();
        assert!(!result.status);
        assert_eq!(result.amplitude, 0.0);
        assert_eq!(result.filtered_position, 1.0);
    }

    fn frame_settings() -> FexSettings {
        FexSettings {
            columns: 8,
            sig_roi: [0, 2],
            sb_roi: [2, 3],
            spec_begin: 0,
            spec_end: 8,
            weights: vec![1.0],
            ..Default::default()
        }
    }

    /// 8 x 3 frame with a pedestal of 10: two signal rows and one sideband row
    fn frame_bytes(signal_bump: u16) -> Vec<u8> {
        let mut pixels = vec![110u16; 16];
        pixels.extend([60u16; 8]);
        pixels[4] += signal_bump;
        pixels[12] += signal_bump;
        encode_frame(8, 3, 10, &pixels)
    }

    #[test]
    fn test_frame_projection_and_edge() {
        let mut fex = Fex::new(frame_settings());
        let mut plots = PlotSet::new(8);

        // Rows sum to 200 per column, the single sideband row of 50 is scaled by 2
        let reference = frame_bytes(0);
        let reference = FrameView::parse(&reference).unwrap();
        fex.analyze_frame(&reference, false, true, &mut plots);
        assert!(!fex.result().status);
        assert_eq!(fex.reference().unwrap().to_vec(), vec![100.0; 8]);

        let bumped = frame_bytes(100);
        let bumped = FrameView::parse(&bumped).unwrap();
        fex.analyze_frame(&bumped, false, false, &mut plots);
        let result = fex.result();
        assert!(result.status);
        assert!((result.amplitude - 2.0).abs() < 1e-12);
        assert!((result.filtered_position - 4.0).abs() < 1e-12);
        assert!((result.ref_amplitude - 100.0).abs() < 1e-12);

        let raw = plots.raw_signal.borrow();
        assert_eq!(raw.bin(4), Some(300.0));
        assert_eq!(raw.bin(3), Some(100.0));
        assert_eq!(plots.sub_signal.borrow().bin(4), Some(2.0));
        assert_eq!(plots.sub_signal_u.borrow().bin(4), Some(200.0));
        assert_eq!(plots.ref_signal.borrow().bin(0), Some(100.0));
    }

    #[test]
    fn test_vetoed_shot_only_fills_raw() {
        let mut fex = Fex::new(settings());
        let mut plots = PlotSet::new(16);
        let flat = encode_pv_waveform(1, ClockTime::default(), &[100; 16]);
        let flat = PvWaveformView::parse(&flat).unwrap();
        fex.analyze_projections(&flat, None, None, false, true, &mut plots);

        let mut samples = [100u32; 16];
        samples[8] = 150;
        let bumped = encode_pv_waveform(1, ClockTime::default(), &samples);
        let bumped = PvWaveformView::parse(&bumped).unwrap();
        for _ in 0..2 {
            fex.analyze_projections(&bumped, None, None, true, false, &mut plots);
        }

        assert!(!fex.result().status);
        assert_eq!(plots.raw_signal.borrow().bin(8), Some(150.0));
        assert!(plots.sub_signal.borrow().contents().iter().all(|v| *v == 0.0));
        assert!(plots.flt_signal.borrow().contents().iter().all(|v| *v == 0.0));
        assert!(plots.p0_corr.borrow().is_empty());
        assert!(plots.p1_corr.borrow().is_empty());
    }

    #[test]
    fn test_correlation_lags_one_event() {
        let mut fex = Fex::new(settings());
        let mut plots = PlotSet::new(16);
        let flat = encode_pv_waveform(1, ClockTime::default(), &[100; 16]);
        let flat = PvWaveformView::parse(&flat).unwrap();
        fex.analyze_projections(&flat, None, None, false, true, &mut plots);

        // Against a flat reference the fit reduces to p0 = mean signal, p1 = 0
        let mut first = [100u32; 16];
        first[8] = 150;
        let first = encode_pv_waveform(1, ClockTime::default(), &first);
        let first = PvWaveformView::parse(&first).unwrap();
        fex.analyze_projections(&first, None, None, false, false, &mut plots);
        assert!(plots.p0_corr.borrow().is_empty());

        let mut second = [100u32; 16];
        second[8] = 200;
        let second = encode_pv_waveform(1, ClockTime::default(), &second);
        let second = PvWaveformView::parse(&second).unwrap();
        fex.analyze_projections(&second, None, None, false, false, &mut plots);

        let p0: Vec<(f64, f64)> = plots.p0_corr.borrow().points().copied().collect();
        let p1: Vec<(f64, f64)> = plots.p1_corr.borrow().points().copied().collect();
        assert_eq!(p0, vec![(103.125, 106.25)]);
        assert_eq!(p1, vec![(0.0, 0.0)]);
    }

    #[test]
    fn test_polynomial() {
        assert_eq!(polynomial(&[1.0, 2.0, 3.0], 2.0), 17.0);
        assert_eq!(polynomial(&[], 2.0), 0.0);
    }
}
