use std::rc::Rc;
use std::sync::mpsc::Sender;

use super::cache::MemoryCache;
use super::config::Config;
use super::entry::MemoryCds;
use super::error::ProcessorError;
use super::fex::Fex;
use super::module::UserModule;
use super::stream::{read_stream_file, StreamReader, TransitionKind};
use super::summary::ReplaySummary;
use super::timetool::TimeToolModule;
use super::worker_status::WorkerStatus;

/// The main loop of the time tool replay.
///
/// Plays a recorded stream through a TimeToolModule the way an online host would: every
/// configure transition resets the cache, reconfigures the module and rebuilds its plots;
/// every event sets the clock and hands over the event's fragments. Progress is reported
/// through `tx`.
pub fn process(config: Config, tx: Sender<WorkerStatus>) -> Result<ReplaySummary, ProcessorError> {
    config.fex.validate()?;
    let bytes = read_stream_file(&config.stream_path)?;
    spdlog::info!(
        "Total stream size: {}",
        human_bytes::human_bytes(bytes.len() as f64)
    );

    let cache = Rc::new(MemoryCache::new());
    let cds = Rc::new(MemoryCds::new());
    let mut module = TimeToolModule::new(Box::new(Fex::new(config.fex.clone())));
    let mut reader = StreamReader::new(&bytes);
    let mut summary = ReplaySummary::new();
    let mut configured = false;

    let flush_frac: f32 = 0.01;
    let flush_val = (reader.total_size() as f64 * flush_frac as f64) as usize;
    let mut last_flush = 0;
    let mut progress: f32 = 0.0;

    tx.send(WorkerStatus::new(0.0, 0, 0))?;
    while let Some(transition) = reader.next_transition()? {
        match transition.kind {
            TransitionKind::Configure => {
                spdlog::info!("Configure at {}", transition.clock);
                module.reset(cache.clone());
                for fragment in transition.fragments.iter() {
                    module.configure(fragment);
                }
                module.clear();
                module.create(cds.clone());
                summary.configures += 1;
                if let Some(slots) = module.cache_slots() {
                    summary.features = slots.names();
                }
                configured = true;
            }
            TransitionKind::L1Accept => {
                summary.events += 1;
                if !configured {
                    spdlog::warn!(
                        "Event at {} arrived before any configure; skipping",
                        transition.clock
                    );
                    continue;
                }
                module.clock(transition.clock);
                if module.process_event(&transition.fragments).is_some() {
                    summary.analyzed += 1;
                    if let Some(slots) = module.cache_slots() {
                        let values = slots
                            .indices()
                            .map(|index| cache.value(index).unwrap_or(f64::NAN))
                            .collect();
                        summary.record(transition.clock, values);
                    }
                }
            }
        }

        if reader.position() - last_flush > flush_val {
            last_flush = reader.position();
            progress = reader.position() as f32 / reader.total_size() as f32;
            tx.send(WorkerStatus::new(progress, summary.events, summary.analyzed))?;
        }
    }
    module.clear();
    summary.cache_slots = cache.len();

    spdlog::info!(
        "{} events replayed, {} analyzed, over {} configures.",
        summary.events,
        summary.analyzed,
        summary.configures
    );
    if progress < 1.0 {
        tx.send(WorkerStatus::new(1.0, summary.events, summary.analyzed))?;
    }

    if let Some(path) = &config.summary_path {
        summary.write(path)?;
        spdlog::info!("Summary written to {}", path.to_string_lossy());
    }
    Ok(summary)
}
