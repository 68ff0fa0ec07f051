use std::rc::Rc;

use super::cache::FeatureCache;
use super::config::FexSettings;
use super::entry::Cds;
use super::fex::Fex;
use super::payload::Fragment;
use super::source_id::ClockTime;
use super::timetool::TimeToolModule;

/// The contract between a host and an analysis module.
///
/// The host calls `reset` when a feature cache becomes available, delivers the fragments
/// of a configure transition through `configure`, tears down and recreates plots with
/// `clear`/`create`, and then, for every event, sets the `clock` and hands over the
/// event's fragments with `accept`.
pub trait UserModule {
    fn name(&self) -> &str;
    fn reset(&mut self, cache: Rc<dyn FeatureCache>);
    fn clock(&mut self, clock: ClockTime);
    fn configure(&mut self, fragment: &Fragment<'_>);
    fn create(&mut self, cds: Rc<dyn Cds>);
    fn clear(&mut self);
    /// Returns whether the event should continue down the host's pipeline
    fn accept(&mut self, fragments: &[Fragment<'_>]) -> bool;
}

/// Module factory handed to hosts
pub fn create_module(settings: FexSettings) -> Box<dyn UserModule> {
    Box::new(TimeToolModule::new(Box::new(Fex::new(settings))))
}
