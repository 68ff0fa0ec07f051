use std::rc::Rc;

use super::cache::FeatureCache;
use super::channel_map::{ChannelResolver, Resolution};
use super::entry::Cds;
use super::fit::FitSubsystem;
use super::fragment_buffer::EventFragmentBuffer;
use super::gate::GatePolicy;
use super::invoker::{Analysis, FitInvoker};
use super::module::UserModule;
use super::payload::Fragment;
use super::plots::PlotSet;
use super::publisher::{CacheSlots, ResultPublisher};
use super::source_id::ClockTime;

const MODULE_NAME: &str = "TimeTool";

/// TimeToolModule extracts timing-correction features, one event at a time.
///
/// Configuration fragments resolve the waveform channels; event fragments are captured into
/// an [EventFragmentBuffer]; at the end of the event the timing record is gated, the fit is
/// run on the best available input, and results go to the feature cache and the plots.
pub struct TimeToolModule {
    invoker: FitInvoker,
    channels: ChannelResolver,
    publisher: ResultPublisher,
    cds: Option<Rc<dyn Cds>>,
    clock: ClockTime,
}

impl TimeToolModule {
    pub fn new(fit: Box<dyn FitSubsystem>) -> Self {
        Self {
            invoker: FitInvoker::new(fit),
            channels: ChannelResolver::new(),
            publisher: ResultPublisher::new(),
            cds: None,
            clock: ClockTime::default(),
        }
    }

    /// Drop the fit subsystem's accumulated state
    pub fn reinitialize(&mut self) {
        self.invoker.reinitialize();
    }

    pub fn channels(&self) -> &ChannelResolver {
        &self.channels
    }

    pub fn plots(&self) -> Option<&PlotSet> {
        self.invoker.plots()
    }

    pub fn cache_slots(&self) -> Option<&CacheSlots> {
        self.publisher.slots()
    }

    /// Capture one event fragment into `buffer`
    pub fn capture<'a>(&self, buffer: &mut EventFragmentBuffer<'a>, fragment: &Fragment<'a>) {
        buffer.capture(fragment, self.invoker.settings().phy, &self.channels);
    }

    /// Analyze the captured event and publish the results.
    ///
    /// Nothing is analyzed until plots exist, and nothing without a timing record. The
    /// buffer is always cleared before returning.
    pub fn analyze(&mut self, buffer: &mut EventFragmentBuffer<'_>) -> Option<Analysis> {
        let mut analysis = None;
        if self.cds.is_some() && buffer.timing().is_some() {
            let gate = GatePolicy::from_settings(self.invoker.settings()).evaluate(buffer.timing());
            analysis = self.invoker.try_analyze(buffer, &gate);
        }

        if let (Some(done), Some(plots)) = (&analysis, self.invoker.plots()) {
            self.publisher.publish(
                &done.result,
                plots,
                self.invoker.settings().indicator_offset,
                self.clock,
            );
        }

        buffer.clear();
        analysis
    }

    /// Capture and analyze a whole event
    pub fn process_event(&mut self, fragments: &[Fragment<'_>]) -> Option<Analysis> {
        let mut buffer = EventFragmentBuffer::new();
        for fragment in fragments {
            self.capture(&mut buffer, fragment);
        }
        self.analyze(&mut buffer)
    }
}

impl UserModule for TimeToolModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn reset(&mut self, cache: Rc<dyn FeatureCache>) {
        self.publisher.attach_cache(cache);
        self.invoker.reinitialize();
    }

    fn clock(&mut self, clock: ClockTime) {
        self.clock = clock;
    }

    fn configure(&mut self, fragment: &Fragment<'_>) {
        let settings = self.invoker.settings();
        let (base_name, phy) = (settings.base_name.clone(), settings.phy);
        match self.channels.resolve(fragment, &base_name, phy) {
            Resolution::Reconfigure => {
                spdlog::info!("Detector configuration found, reinitializing {base_name}");
                self.invoker.reinitialize();
            }
            Resolution::Mapped(role, id) => {
                spdlog::info!("Mapped {base_name}{} to record id {id}", role.suffix());
            }
            Resolution::Ignored => (),
        }
    }

    fn create(&mut self, cds: Rc<dyn Cds>) {
        // A second create without clear would leave the old plots registered
        if self.cds.is_some() {
            self.clear();
        }

        let settings = self.invoker.settings();
        let plots = PlotSet::new(settings.columns);
        let base_name = settings.base_name.clone();
        for entry in plots.entries() {
            cds.add(entry);
        }
        self.cds = Some(cds);

        self.publisher.allocate_slots(&base_name);

        self.invoker.reinitialize();
        self.invoker.attach_plots(plots);
    }

    fn clear(&mut self) {
        if let Some(cds) = self.cds.take() {
            if let Some(plots) = self.invoker.detach_plots() {
                for entry in plots.entries() {
                    cds.remove(&entry);
                }
            }
        }
        self.invoker.reinitialize();
    }

    fn accept(&mut self, fragments: &[Fragment<'_>]) -> bool {
        self.process_event(fragments);
        true
    }
}
