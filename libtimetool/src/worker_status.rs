#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    pub progress: f32,
    pub events: u64,
    pub analyzed: u64,
}

impl WorkerStatus {
    pub fn new(progress: f32, events: u64, analyzed: u64) -> Self {
        Self {
            progress,
            events,
            analyzed,
        }
    }
}
