use super::channel_map::ChannelRole;
use super::config::FexSettings;
use super::fit::{FitResult, FitSubsystem, NullMonitor, SignalMonitor};
use super::fragment_buffer::EventFragmentBuffer;
use super::gate::GateDecision;
use super::plots::PlotSet;

/// Which input the fit consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisBranch {
    Frame,
    Projections,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Analysis {
    pub branch: AnalysisBranch,
    pub result: FitResult,
}

/// FitInvoker owns the fit subsystem and the plots it mirrors its signals into,
/// and picks the analysis branch for each event.
pub struct FitInvoker {
    fit: Box<dyn FitSubsystem>,
    plots: Option<PlotSet>,
}

impl FitInvoker {
    pub fn new(fit: Box<dyn FitSubsystem>) -> Self {
        Self { fit, plots: None }
    }

    pub fn settings(&self) -> &FexSettings {
        self.fit.settings()
    }

    pub fn reinitialize(&mut self) {
        self.fit.reinitialize();
    }

    /// Wire a new plot set into the fit
    pub fn attach_plots(&mut self, mut plots: PlotSet) {
        self.fit.init_plots(&mut plots);
        self.plots = Some(plots);
    }

    pub fn detach_plots(&mut self) -> Option<PlotSet> {
        self.plots.take()
    }

    pub fn plots(&self) -> Option<&PlotSet> {
        self.plots.as_ref()
    }

    /// Run the fit on whatever the event provides.
    ///
    /// Frames take priority when the detector writes images; otherwise the signal
    /// waveform is used when the detector writes projections. Returns None when neither
    /// input is available, which is a normal outcome for events without time tool data.
    pub fn try_analyze(
        &mut self,
        buffer: &EventFragmentBuffer<'_>,
        gate: &GateDecision,
    ) -> Option<Analysis> {
        if !gate.passed {
            return None;
        }
        let mut null = NullMonitor;
        let monitor: &mut dyn SignalMonitor = match self.plots.as_mut() {
            Some(plots) => plots,
            None => &mut null,
        };
        let (write_image, write_projections) = {
            let settings = self.fit.settings();
            (settings.write_image, settings.write_projections)
        };

        let branch = match (buffer.frame(), buffer.waveform(ChannelRole::Signal)) {
            (Some(frame), _) if write_image => {
                self.fit
                    .analyze_frame(frame, gate.bykik, gate.no_laser, monitor);
                AnalysisBranch::Frame
            }
            (_, Some(signal)) if write_projections => {
                self.fit.analyze_projections(
                    signal,
                    buffer.waveform(ChannelRole::Sideband),
                    buffer.waveform(ChannelRole::Reference),
                    gate.bykik,
                    gate.no_laser,
                    monitor,
                );
                AnalysisBranch::Projections
            }
            _ => return None,
        };

        Some(Analysis {
            branch,
            result: self.fit.result(),
        })
    }
}
