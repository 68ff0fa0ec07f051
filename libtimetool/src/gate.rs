use super::config::FexSettings;
use super::payload::EvrDataView;

/// Outcome of scanning an event's timing record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GateDecision {
    /// A timing record was present, so the event can be analyzed
    pub passed: bool,
    /// The veto (bykik) code was latched. Handed to the fit, never used to skip the event.
    pub bykik: bool,
    /// The laser code was latched, inverted when the configured code is negative
    pub no_laser: bool,
}

/// GatePolicy evaluates event codes against the configured veto and laser codes.
///
/// Both codes are matched on their absolute value. The sign of the laser code selects its
/// meaning: positive marks laser-absent shots, negative marks laser-present shots, in which
/// case the flag is inverted after the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    veto_code: u32,
    laser_code: u32,
    invert_laser: bool,
}

impl GatePolicy {
    pub fn new(event_code_bykik: i32, event_code_no_laser: i32) -> Self {
        Self {
            veto_code: event_code_bykik.unsigned_abs(),
            laser_code: event_code_no_laser.unsigned_abs(),
            invert_laser: event_code_no_laser < 0,
        }
    }

    pub fn from_settings(settings: &FexSettings) -> Self {
        Self::new(settings.event_code_bykik, settings.event_code_no_laser)
    }

    /// Scan every code of the record once. A missing record fails the gate.
    pub fn evaluate(&self, record: Option<&EvrDataView<'_>>) -> GateDecision {
        let record = match record {
            Some(r) => r,
            None => return GateDecision::default(),
        };
        let mut bykik = false;
        let mut no_laser = false;
        for code in record.event_codes() {
            if code == self.veto_code {
                bykik = true;
            }
            if code == self.laser_code {
                no_laser = true;
            }
        }
        if self.invert_laser {
            no_laser = !no_laser;
        }
        GateDecision {
            passed: true,
            bykik,
            no_laser,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{encode_evr, FifoEvent};

    fn record(codes: &[u32]) -> Vec<u8> {
        let events: Vec<FifoEvent> = codes.iter().map(|c| FifoEvent::new(*c)).collect();
        encode_evr(&events)
    }

    #[test]
    fn test_laser_code_sign_inverts() {
        let bytes = record(&[7]);
        let evr = EvrDataView::parse(&bytes).unwrap();
        assert!(GatePolicy::new(162, 7).evaluate(Some(&evr)).no_laser);
        assert!(!GatePolicy::new(162, -7).evaluate(Some(&evr)).no_laser);

        let empty = record(&[]);
        let evr = EvrDataView::parse(&empty).unwrap();
        assert!(!GatePolicy::new(162, 7).evaluate(Some(&evr)).no_laser);
        assert!(GatePolicy::new(162, -7).evaluate(Some(&evr)).no_laser);
    }

    #[test]
    fn test_veto_does_not_stop_scan() {
        let bytes = record(&[162, 40, 7]);
        let evr = EvrDataView::parse(&bytes).unwrap();
        let decision = GatePolicy::new(-162, 7).evaluate(Some(&evr));
        assert_eq!(
            decision,
            GateDecision {
                passed: true,
                bykik: true,
                no_laser: true
            }
        );
    }

    #[test]
    fn test_missing_record_fails() {
        let decision = GatePolicy::new(162, 7).evaluate(None);
        assert!(!decision.passed);
    }

    #[test]
    fn test_evaluate_is_repeatable() {
        let bytes = record(&[1, 162, 3]);
        let evr = EvrDataView::parse(&bytes).unwrap();
        let gate = GatePolicy::new(162, -3);
        assert_eq!(gate.evaluate(Some(&evr)), gate.evaluate(Some(&evr)));
    }
}
