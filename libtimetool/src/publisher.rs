use std::rc::Rc;

use super::cache::FeatureCache;
use super::constants::CACHE_SLOT_SUFFIXES;
use super::fit::FitResult;
use super::plots::PlotSet;
use super::source_id::ClockTime;

/// Six contiguous feature cache slots, addressed by offset from `base`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSlots {
    base: usize,
    base_name: String,
}

impl CacheSlots {
    /// Register the six time tool features under `base_name`
    pub fn allocate(cache: &dyn FeatureCache, base_name: &str) -> Self {
        let mut suffixes = CACHE_SLOT_SUFFIXES.iter();
        let base = match suffixes.next() {
            Some(first) => cache.add(&format!("{base_name}{first}")),
            None => 0,
        };
        for suffix in suffixes {
            cache.add(&format!("{base_name}{suffix}"));
        }
        Self {
            base,
            base_name: base_name.to_string(),
        }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Slot names in publish order
    pub fn names(&self) -> Vec<String> {
        CACHE_SLOT_SUFFIXES
            .iter()
            .map(|suffix| format!("{}{}", self.base_name, suffix))
            .collect()
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        self.base..self.base + CACHE_SLOT_SUFFIXES.len()
    }
}

/// ResultPublisher writes fit results into the feature cache and stamps the plots.
///
/// The cache is write-only from here: slots are registered once per cache and base name
/// and never read back.
#[derive(Default)]
pub struct ResultPublisher {
    cache: Option<Rc<dyn FeatureCache>>,
    slots: Option<CacheSlots>,
}

impl ResultPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a cache. Slots are kept when it is the cache already attached, and
    /// forgotten when it is a different one.
    pub fn attach_cache(&mut self, cache: Rc<dyn FeatureCache>) {
        let same = matches!(
            &self.cache,
            Some(current) if Rc::as_ptr(current) as *const () == Rc::as_ptr(&cache) as *const ()
        );
        if !same {
            self.slots = None;
        }
        self.cache = Some(cache);
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// Make sure slots exist for `base_name`, registering them if needed.
    ///
    /// The cache has no way to release a slot, so slots are reused across plot
    /// teardowns as long as the cache and base name do not change.
    pub fn allocate_slots(&mut self, base_name: &str) -> Option<&CacheSlots> {
        let cache = match &self.cache {
            Some(c) => c,
            None => {
                spdlog::warn!("No feature cache attached; {base_name} results will not be cached");
                return None;
            }
        };
        let reuse = matches!(&self.slots, Some(slots) if slots.base_name() == base_name);
        if !reuse {
            let slots = CacheSlots::allocate(cache.as_ref(), base_name);
            spdlog::info!(
                "Registered {} feature cache slots starting at {}",
                base_name,
                slots.base()
            );
            self.slots = Some(slots);
        }
        self.slots.as_ref()
    }

    pub fn slots(&self) -> Option<&CacheSlots> {
        self.slots.as_ref()
    }

    /// Write the six results in their fixed order, mark the edge in the subtracted signal
    /// when the fit succeeded, and stamp every plot with `clock`.
    pub fn publish(
        &self,
        result: &FitResult,
        plots: &PlotSet,
        indicator_offset: f64,
        clock: ClockTime,
    ) {
        if let (Some(cache), Some(slots)) = (&self.cache, &self.slots) {
            for (index, value) in slots.indices().zip(result.scalars()) {
                cache.cache(index, value);
            }
        }

        if result.status {
            let bin = (result.filtered_position + indicator_offset).floor();
            if bin.is_finite() && !plots.mark_edge(bin as i64) {
                spdlog::debug!("Edge indicator bin {bin} is outside the plot");
            }
        }

        plots.valid(clock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Cache that records every call in order
    #[derive(Default)]
    struct RecordingCache {
        names: RefCell<Vec<String>>,
        writes: RefCell<Vec<(usize, f64)>>,
    }

    impl FeatureCache for RecordingCache {
        fn add(&self, name: &str) -> usize {
            let mut names = self.names.borrow_mut();
            names.push(name.to_string());
            100 + names.len() - 1
        }

        fn cache(&self, index: usize, value: f64) {
            self.writes.borrow_mut().push((index, value));
        }
    }

    fn result(position: f64, status: bool) -> FitResult {
        FitResult {
            amplitude: 1.0,
            filtered_position: position,
            filtered_pos_ps: 3.0,
            filtered_fwhm: 4.0,
            next_amplitude: 5.0,
            ref_amplitude: 6.0,
            status,
        }
    }

    #[test]
    fn test_publish_order() {
        let cache = Rc::new(RecordingCache::default());
        let mut publisher = ResultPublisher::new();
        publisher.attach_cache(cache.clone());
        publisher.allocate_slots("TT01");
        assert_eq!(
            cache.names.borrow().as_slice(),
            &[
                "TT01:AMI:AMPL",
                "TT01:AMI:FLTPOS",
                "TT01:AMI:FLTPOS_PS",
                "TT01:AMI:FLTPOSFWHM",
                "TT01:AMI:AMPLNXT",
                "TT01:AMI:REFAMPL"
            ]
        );

        let plots = PlotSet::new(10);
        publisher.publish(&result(2.0, false), &plots, 0.0, ClockTime::new(1, 0));
        assert_eq!(
            cache.writes.borrow().as_slice(),
            &[
                (100, 1.0),
                (101, 2.0),
                (102, 3.0),
                (103, 4.0),
                (104, 5.0),
                (105, 6.0)
            ]
        );
        // No marker without a successful fit
        assert_eq!(plots.sub_signal.borrow().bin(2), Some(0.0));
        for entry in plots.entries() {
            assert_eq!(entry.time(), Some(ClockTime::new(1, 0)));
        }
    }

    #[test]
    fn test_marker_bounds() {
        let publisher = ResultPublisher::new();
        let plots = PlotSet::new(10);
        publisher.publish(&result(2.5, true), &plots, 4.0, ClockTime::new(2, 0));
        assert_eq!(plots.sub_signal.borrow().bin(6), Some(1.0));

        let plots = PlotSet::new(10);
        publisher.publish(&result(2.0, true), &plots, -3.5, ClockTime::new(3, 0));
        publisher.publish(&result(9.0, true), &plots, 1.0, ClockTime::new(4, 0));
        assert!(plots.sub_signal.borrow().contents().iter().all(|v| *v == 0.0));
        assert_eq!(plots.p1_corr.borrow().time(), Some(ClockTime::new(4, 0)));
    }

    #[test]
    fn test_slots_reused_across_allocations() {
        let cache = Rc::new(RecordingCache::default());
        let mut publisher = ResultPublisher::new();
        publisher.attach_cache(cache.clone());
        publisher.allocate_slots("TT01");
        publisher.allocate_slots("TT01");
        assert_eq!(cache.names.borrow().len(), 6);
        publisher.allocate_slots("TT02");
        assert_eq!(cache.names.borrow().len(), 12);
        assert_eq!(publisher.slots().unwrap().base(), 106);
    }

    #[test]
    fn test_reattaching_same_cache_keeps_slots() {
        let cache = Rc::new(RecordingCache::default());
        let mut publisher = ResultPublisher::new();
        for _ in 0..3 {
            publisher.attach_cache(cache.clone());
            publisher.allocate_slots("TT01");
        }
        assert_eq!(cache.names.borrow().len(), 6);
        assert_eq!(publisher.slots().unwrap().base(), 100);

        let other = Rc::new(RecordingCache::default());
        publisher.attach_cache(other.clone());
        assert!(publisher.slots().is_none());
        publisher.allocate_slots("TT01");
        assert_eq!(other.names.borrow().len(), 6);
        assert_eq!(cache.names.borrow().len(), 6);
    }

    #[test]
    fn test_no_cache_tolerated() {
        let mut publisher = ResultPublisher::new();
        assert!(publisher.allocate_slots("TT01").is_none());
        let plots = PlotSet::new(4);
        publisher.publish(&result(1.0, true), &plots, 0.0, ClockTime::new(5, 0));
        assert_eq!(plots.ref_signal.borrow().time(), Some(ClockTime::new(5, 0)));
    }
}
