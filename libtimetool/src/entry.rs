//! Plot entries and the container (Cds) that displays them.
//!
//! Entries are shared handles: the module that creates an entry keeps one handle and
//! the Cds keeps another while the entry is registered. Identity, not content, decides
//! which registered entry a `remove` refers to.
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::source_id::ClockTime;

/// Description of a fixed-binning 1-D histogram
#[derive(Debug, Clone, PartialEq)]
pub struct DescTH1F {
    pub name: String,
    pub xtitle: String,
    pub ytitle: String,
    pub nbins: usize,
    pub xlow: f64,
    pub xup: f64,
}

impl DescTH1F {
    pub fn new(name: &str, xtitle: &str, ytitle: &str, nbins: usize, xlow: f64, xup: f64) -> Self {
        Self {
            name: name.to_string(),
            xtitle: xtitle.to_string(),
            ytitle: ytitle.to_string(),
            nbins,
            xlow,
            xup,
        }
    }
}

/// 1-D histogram whose bins are overwritten, not accumulated
#[derive(Debug, Clone)]
pub struct EntryTH1F {
    desc: DescTH1F,
    content: Vec<f64>,
    valid: Option<ClockTime>,
}

impl EntryTH1F {
    pub fn new(desc: DescTH1F) -> Self {
        let content = vec![0.0; desc.nbins];
        Self {
            desc,
            content,
            valid: None,
        }
    }

    pub fn desc(&self) -> &DescTH1F {
        &self.desc
    }

    /// Set the value of a bin. Out of range bins are ignored.
    pub fn content(&mut self, value: f64, bin: usize) {
        if let Some(b) = self.content.get_mut(bin) {
            *b = value;
        }
    }

    pub fn bin(&self, bin: usize) -> Option<f64> {
        self.content.get(bin).copied()
    }

    pub fn contents(&self) -> &[f64] {
        &self.content
    }

    /// Mark the entry as fresh for the event at `clock`
    pub fn valid(&mut self, clock: ClockTime) {
        self.valid = Some(clock);
    }

    pub fn time(&self) -> Option<ClockTime> {
        self.valid
    }
}

/// Description of a scan (correlation) plot
#[derive(Debug, Clone, PartialEq)]
pub struct DescScan {
    pub name: String,
    pub xtitle: String,
    pub ytitle: String,
    pub npoints: usize,
}

impl DescScan {
    pub fn new(name: &str, xtitle: &str, ytitle: &str, npoints: usize) -> Self {
        Self {
            name: name.to_string(),
            xtitle: xtitle.to_string(),
            ytitle: ytitle.to_string(),
            npoints,
        }
    }
}

/// Scatter of (x, y) points, keeping the most recent `npoints`
#[derive(Debug, Clone)]
pub struct EntryScan {
    desc: DescScan,
    points: VecDeque<(f64, f64)>,
    valid: Option<ClockTime>,
}

impl EntryScan {
    pub fn new(desc: DescScan) -> Self {
        let npoints = desc.npoints.max(1);
        Self {
            desc,
            points: VecDeque::with_capacity(npoints),
            valid: None,
        }
    }

    pub fn desc(&self) -> &DescScan {
        &self.desc
    }

    /// Add a point with ordinate `y` at abscissa `x`
    pub fn addy(&mut self, y: f64, x: f64) {
        if self.points.len() >= self.desc.npoints.max(1) {
            self.points.pop_front();
        }
        self.points.push_back((x, y));
    }

    pub fn points(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn valid(&mut self, clock: ClockTime) {
        self.valid = Some(clock);
    }

    pub fn time(&self) -> Option<ClockTime> {
        self.valid
    }
}

pub type SharedTH1F = Rc<RefCell<EntryTH1F>>;
pub type SharedScan = Rc<RefCell<EntryScan>>;

/// A handle to any plot entry
#[derive(Debug, Clone)]
pub enum EntryRef {
    TH1F(SharedTH1F),
    Scan(SharedScan),
}

impl EntryRef {
    /// Two handles refer to the same entry object
    pub fn same_entry(&self, other: &EntryRef) -> bool {
        match (self, other) {
            (Self::TH1F(a), Self::TH1F(b)) => Rc::ptr_eq(a, b),
            (Self::Scan(a), Self::Scan(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::TH1F(h) => h.borrow().desc().name.clone(),
            Self::Scan(s) => s.borrow().desc().name.clone(),
        }
    }

    pub fn time(&self) -> Option<ClockTime> {
        match self {
            Self::TH1F(h) => h.borrow().time(),
            Self::Scan(s) => s.borrow().time(),
        }
    }
}

/// Container of displayed plot entries, owned by the host
pub trait Cds {
    fn add(&self, entry: EntryRef);
    /// Unregister an entry. Unknown entries are ignored.
    fn remove(&self, entry: &EntryRef);
}

/// In-memory Cds, keeping registered entries in insertion order
#[derive(Debug, Default)]
pub struct MemoryCds {
    entries: RefCell<Vec<EntryRef>>,
}

impl MemoryCds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn contains(&self, entry: &EntryRef) -> bool {
        self.entries.borrow().iter().any(|e| e.same_entry(entry))
    }

    pub fn entries(&self) -> Vec<EntryRef> {
        self.entries.borrow().clone()
    }
}

impl Cds for MemoryCds {
    fn add(&self, entry: EntryRef) {
        self.entries.borrow_mut().push(entry);
    }

    fn remove(&self, entry: &EntryRef) {
        self.entries.borrow_mut().retain(|e| !e.same_entry(entry));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_th1f_overwrites_and_skips_out_of_range() {
        let mut h = EntryTH1F::new(DescTH1F::new("h", "ADU", "Bin", 4, 0.0, 4.0));
        h.content(3.0, 1);
        h.content(5.0, 1);
        h.content(9.0, 4);
        assert_eq!(h.contents(), &[0.0, 5.0, 0.0, 0.0]);
    }

    #[test]
    fn test_scan_keeps_latest_points() {
        let mut s = EntryScan::new(DescScan::new("P0", "Reference", "Signal", 2));
        s.addy(1.0, 10.0);
        s.addy(2.0, 20.0);
        s.addy(3.0, 30.0);
        let points: Vec<(f64, f64)> = s.points().copied().collect();
        assert_eq!(points, vec![(20.0, 2.0), (30.0, 3.0)]);
    }

    #[test]
    fn test_cds_remove_by_identity() {
        let desc = DescTH1F::new("same", "ADU", "Bin", 2, 0.0, 2.0);
        let a = EntryRef::TH1F(Rc::new(RefCell::new(EntryTH1F::new(desc.clone()))));
        let b = EntryRef::TH1F(Rc::new(RefCell::new(EntryTH1F::new(desc))));
        let cds = MemoryCds::new();
        cds.add(a.clone());
        cds.add(b.clone());
        cds.remove(&a);
        assert_eq!(cds.len(), 1);
        assert!(cds.contains(&b));
        assert!(!cds.contains(&a));
    }
}
