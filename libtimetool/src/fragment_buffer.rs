use super::channel_map::{ChannelResolver, ChannelRole};
use super::payload::{EvrDataView, Fragment, FrameView, PvWaveformView};
use super::source_id::TypeId;

/// EventFragmentBuffer holds views of the payloads relevant to the time tool for the
/// event currently being delivered.
///
/// Fragments arrive in any order; each one is matched on its own. Slots hold borrowed
/// views only, so capturing never copies payload data. The buffer must be cleared once
/// the event is analyzed so no view outlives its event.
#[derive(Debug, Default)]
pub struct EventFragmentBuffer<'a> {
    frame: Option<FrameView<'a>>,
    signal: Option<PvWaveformView<'a>>,
    sideband: Option<PvWaveformView<'a>>,
    reference: Option<PvWaveformView<'a>>,
    timing: Option<EvrDataView<'a>>,
}

impl<'a> EventFragmentBuffer<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a fragment if it is one we want.
    ///
    /// Frames and discrete records are taken only from the owned source `phy`, and
    /// discrete records only when their id is mapped in `channels`. Timing records are
    /// taken from any source. A later fragment for an occupied slot replaces the earlier one.
    pub fn capture(&mut self, fragment: &Fragment<'a>, phy: u32, channels: &ChannelResolver) {
        let owned = fragment.src.phy == phy;
        match fragment.type_id {
            TypeId::Frame if owned => match FrameView::parse(fragment.payload) {
                Ok(frame) => self.frame = Some(frame),
                Err(e) => spdlog::warn!("Skipping frame: {e}"),
            },
            TypeId::Epics if owned => {
                let wf = match PvWaveformView::parse(fragment.payload) {
                    Ok(wf) => wf,
                    Err(e) => {
                        spdlog::warn!("Skipping discrete record: {e}");
                        return;
                    }
                };
                match channels.role_of(wf.pv_id()) {
                    Some(ChannelRole::Signal) => self.signal = Some(wf),
                    Some(ChannelRole::Sideband) => self.sideband = Some(wf),
                    Some(ChannelRole::Reference) => self.reference = Some(wf),
                    None => (),
                }
            }
            TypeId::EvrData => match EvrDataView::parse(fragment.payload) {
                Ok(evr) => self.timing = Some(evr),
                Err(e) => spdlog::warn!("Skipping timing record: {e}"),
            },
            _ => (),
        }
    }

    pub fn frame(&self) -> Option<&FrameView<'a>> {
        self.frame.as_ref()
    }

    pub fn waveform(&self, role: ChannelRole) -> Option<&PvWaveformView<'a>> {
        match role {
            ChannelRole::Signal => self.signal.as_ref(),
            ChannelRole::Sideband => self.sideband.as_ref(),
            ChannelRole::Reference => self.reference.as_ref(),
        }
    }

    pub fn timing(&self) -> Option<&EvrDataView<'a>> {
        self.timing.as_ref()
    }

    /// Drop every captured view
    pub fn clear(&mut self) {
        self.frame = None;
        self.signal = None;
        self.sideband = None;
        self.reference = None;
        self.timing = None;
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
            && self.signal.is_none()
            && self.sideband.is_none()
            && self.reference.is_none()
            && self.timing.is_none()
    }
}
