use ndarray::ArrayView1;
use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

use super::constants::SCAN_POINTS;
use super::entry::{DescScan, DescTH1F, EntryRef, EntryScan, EntryTH1F, SharedScan, SharedTH1F};
use super::fit::{RatioFit, SignalMonitor};
use super::source_id::ClockTime;

fn signal_hist(name: &str, cols: usize) -> SharedTH1F {
    Rc::new(RefCell::new(EntryTH1F::new(DescTH1F::new(
        name,
        "ADU",
        "Bin",
        cols,
        0.0,
        cols as f64,
    ))))
}

fn corr_scan(name: &str) -> SharedScan {
    Rc::new(RefCell::new(EntryScan::new(DescScan::new(
        name,
        "Reference",
        "Signal",
        SCAN_POINTS,
    ))))
}

/// The seven plots of the time tool: five signal mirrors and two fit correlations
#[derive(Debug, Clone)]
pub struct PlotSet {
    columns: usize,
    pub ref_signal: SharedTH1F,
    pub raw_signal: SharedTH1F,
    pub sub_signal: SharedTH1F,
    pub sub_signal_u: SharedTH1F,
    pub flt_signal: SharedTH1F,
    pub p0_corr: SharedScan,
    pub p1_corr: SharedScan,
}

impl PlotSet {
    pub fn new(columns: usize) -> Self {
        Self {
            columns,
            ref_signal: signal_hist("Ref Signal#Signal#0#0#0", columns),
            raw_signal: signal_hist("Raw Signal#Signal#0#0#c0", columns),
            sub_signal: signal_hist("Sub Signal#Signal#1#0#c0", columns),
            sub_signal_u: signal_hist("Sub Signal U#Signal#1#0#c000", columns),
            flt_signal: signal_hist("Flt Signal#Signal#1#0#c00000", columns),
            p0_corr: corr_scan("P0#Reference"),
            p1_corr: corr_scan("P1#Reference"),
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Handles to every plot, histograms first
    pub fn entries(&self) -> [EntryRef; 7] {
        [
            EntryRef::TH1F(self.ref_signal.clone()),
            EntryRef::TH1F(self.raw_signal.clone()),
            EntryRef::TH1F(self.sub_signal.clone()),
            EntryRef::TH1F(self.sub_signal_u.clone()),
            EntryRef::TH1F(self.flt_signal.clone()),
            EntryRef::Scan(self.p0_corr.clone()),
            EntryRef::Scan(self.p1_corr.clone()),
        ]
    }

    /// Mark a single-count marker in the subtracted signal. Returns false when the bin
    /// falls outside the plot.
    pub fn mark_edge(&self, bin: i64) -> bool {
        if bin < 0 || bin >= self.columns as i64 {
            return false;
        }
        self.sub_signal.borrow_mut().content(1.0, bin as usize);
        true
    }

    /// Stamp every plot as valid for the event at `clock`
    pub fn valid(&self, clock: ClockTime) {
        for hist in [
            &self.ref_signal,
            &self.raw_signal,
            &self.sub_signal,
            &self.sub_signal_u,
            &self.flt_signal,
        ] {
            hist.borrow_mut().valid(clock);
        }
        self.p0_corr.borrow_mut().valid(clock);
        self.p1_corr.borrow_mut().valid(clock);
    }

    fn mirror(hist: &SharedTH1F, wf: ArrayView1<f64>, columns: Range<usize>) {
        let mut hist = hist.borrow_mut();
        for k in columns.start..columns.end.min(wf.len()) {
            hist.content(wf[k], k);
        }
    }
}

impl SignalMonitor for PlotSet {
    fn monitor_raw_sig(&mut self, sig: ArrayView1<f64>, sb: ArrayView1<f64>) {
        let mut hist = self.raw_signal.borrow_mut();
        for k in 0..self.columns.min(sig.len()).min(sb.len()) {
            hist.content(sig[k] - sb[k], k);
        }
    }

    fn monitor_ref_sig(&mut self, reference: ArrayView1<f64>) {
        Self::mirror(&self.ref_signal, reference, 0..self.columns);
    }

    fn monitor_sub_sig(&mut self, sub: ArrayView1<f64>) {
        Self::mirror(&self.sub_signal, sub, 0..self.columns);
    }

    fn monitor_sub_sig_u(&mut self, sub: ArrayView1<f64>) {
        Self::mirror(&self.sub_signal_u, sub, 0..self.columns);
    }

    fn monitor_flt_sig(&mut self, flt: ArrayView1<f64>, columns: Range<usize>) {
        Self::mirror(&self.flt_signal, flt, columns);
    }

    fn monitor_corr(&mut self, previous: &RatioFit, current: &RatioFit) {
        self.p0_corr.borrow_mut().addy(current.p0(), previous.p0());
        self.p1_corr.borrow_mut().addy(current.p1(), previous.p1());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn test_mirrors_overwrite() {
        let mut plots = PlotSet::new(4);
        let sig = Array1::from(vec![5.0, 6.0, 7.0, 8.0, 9.0]);
        let sb = Array1::from(vec![1.0; 5]);
        plots.monitor_raw_sig(sig.view(), sb.view());
        plots.monitor_raw_sig(sig.view(), sb.view());
        assert_eq!(plots.raw_signal.borrow().contents(), &[4.0, 5.0, 6.0, 7.0]);

        plots.monitor_flt_sig(sig.view(), 2..10);
        assert_eq!(plots.flt_signal.borrow().contents(), &[0.0, 0.0, 7.0, 8.0]);
    }

    #[test]
    fn test_corr_is_previous_against_current() {
        let mut plots = PlotSet::new(4);
        plots.monitor_corr(&RatioFit::new(1.0, 2.0), &RatioFit::new(3.0, 4.0));
        let p0: Vec<(f64, f64)> = plots.p0_corr.borrow().points().copied().collect();
        let p1: Vec<(f64, f64)> = plots.p1_corr.borrow().points().copied().collect();
        assert_eq!(p0, vec![(1.0, 3.0)]);
        assert_eq!(p1, vec![(2.0, 4.0)]);
    }

    #[test]
    fn test_mark_edge_bounds() {
        let plots = PlotSet::new(4);
        assert!(!plots.mark_edge(-1));
        assert!(!plots.mark_edge(4));
        assert!(plots.mark_edge(3));
        assert_eq!(plots.sub_signal.borrow().bin(3), Some(1.0));
    }
}
