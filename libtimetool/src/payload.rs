//! Typed views over fragment payloads.
//!
//! A [Fragment] is a (type, source, bytes) triple borrowed from the host's event buffer.
//! The views in this module check the payload size against their header before handing
//! out any data, and decode every field with explicit little endian reads, so no view
//! ever depends on the alignment of the underlying buffer.
use byteorder::{ByteOrder, LittleEndian};
use std::ops::Range;

use super::constants::*;
use super::error::PayloadError;
use super::source_id::{ClockTime, Src, TypeId};

/// One typed, sourced payload delivered within an event
#[derive(Debug, Clone, Copy)]
pub struct Fragment<'a> {
    pub src: Src,
    pub type_id: TypeId,
    pub version: u16,
    pub payload: &'a [u8],
}

impl<'a> Fragment<'a> {
    pub fn new(src: Src, type_id: TypeId, payload: &'a [u8]) -> Self {
        Self {
            src,
            type_id,
            version: 1,
            payload,
        }
    }
}

fn check_min(kind: &'static str, payload: &[u8], expected: usize) -> Result<(), PayloadError> {
    if payload.len() < expected {
        Err(PayloadError::Truncated {
            kind,
            given: payload.len(),
            expected,
        })
    } else {
        Ok(())
    }
}

/// A camera frame: 16 byte header followed by row-major 16-bit pixels
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    width: usize,
    height: usize,
    depth: u32,
    offset: u32,
    pixels: &'a [u8],
}

impl<'a> FrameView<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self, PayloadError> {
        check_min("frame", payload, FRAME_HEADER_SIZE)?;
        let width = LittleEndian::read_u32(&payload[0..4]) as usize;
        let height = LittleEndian::read_u32(&payload[4..8]) as usize;
        let depth = LittleEndian::read_u32(&payload[8..12]);
        let offset = LittleEndian::read_u32(&payload[12..16]);
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(2))
            .and_then(|n| n.checked_add(FRAME_HEADER_SIZE))
            .unwrap_or(usize::MAX);
        if payload.len() != expected {
            return Err(PayloadError::SizeMismatch {
                kind: "frame",
                given: payload.len(),
                expected,
            });
        }
        Ok(Self {
            width,
            height,
            depth,
            offset,
            pixels: &payload[FRAME_HEADER_SIZE..],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Pedestal added to every pixel by the camera
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn pixel(&self, row: usize, col: usize) -> Option<u16> {
        if row >= self.height || col >= self.width {
            return None;
        }
        let idx = 2 * (row * self.width + col);
        Some(LittleEndian::read_u16(&self.pixels[idx..idx + 2]))
    }

    /// Sum the pedestal-subtracted pixels of `rows` into `out`, column by column.
    ///
    /// Rows outside the frame and columns beyond `out.len()` are ignored. Returns the
    /// number of rows that were summed.
    pub fn project_rows(&self, rows: Range<usize>, out: &mut [f64]) -> usize {
        let rows = rows.start.min(self.height)..rows.end.min(self.height);
        let ncols = self.width.min(out.len());
        let offset = self.offset as f64;
        for row in rows.clone() {
            let line = &self.pixels[2 * row * self.width..2 * (row + 1) * self.width];
            for (col, value) in out.iter_mut().enumerate().take(ncols) {
                *value += LittleEndian::read_u16(&line[2 * col..2 * col + 2]) as f64 - offset;
            }
        }
        rows.len()
    }
}

/// Discrete-value record definition, sent at configure time
#[derive(Debug, Clone, Copy)]
pub struct PvCtrlView<'a> {
    pv_id: i16,
    dbr_type: i16,
    num_elements: i16,
    name: &'a str,
}

impl<'a> PvCtrlView<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self, PayloadError> {
        check_min("discrete record definition", payload, PV_CTRL_HEADER_SIZE)?;
        let pv_id = LittleEndian::read_i16(&payload[0..2]);
        let dbr_type = LittleEndian::read_i16(&payload[2..4]);
        let num_elements = LittleEndian::read_i16(&payload[4..6]);
        let raw_name = &payload[8..PV_CTRL_HEADER_SIZE];
        let end = raw_name.iter().position(|b| *b == 0).unwrap_or(PV_NAME_SIZE);
        let name = std::str::from_utf8(&raw_name[..end]).map_err(|_| PayloadError::BadName)?;
        Ok(Self {
            pv_id,
            dbr_type,
            num_elements,
            name,
        })
    }

    pub fn pv_id(&self) -> i16 {
        self.pv_id
    }

    pub fn dbr_type(&self) -> i16 {
        self.dbr_type
    }

    pub fn num_elements(&self) -> i16 {
        self.num_elements
    }

    pub fn name(&self) -> &'a str {
        self.name
    }
}

/// Discrete-value record data: a time-stamped array of 32-bit samples
#[derive(Debug, Clone, Copy)]
pub struct PvWaveformView<'a> {
    pv_id: i16,
    status: i16,
    severity: i16,
    stamp: ClockTime,
    samples: &'a [u8],
}

impl<'a> PvWaveformView<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self, PayloadError> {
        check_min("discrete record", payload, PV_TIME_HEADER_SIZE)?;
        let pv_id = LittleEndian::read_i16(&payload[0..2]);
        let num_elements = LittleEndian::read_i16(&payload[4..6]);
        if num_elements < 0 {
            return Err(PayloadError::BadElementCount(num_elements));
        }
        let status = LittleEndian::read_i16(&payload[8..10]);
        let severity = LittleEndian::read_i16(&payload[10..12]);
        let stamp = ClockTime::new(
            LittleEndian::read_u32(&payload[12..16]),
            LittleEndian::read_u32(&payload[16..20]),
        );
        let data_size = num_elements as usize * PV_SAMPLE_SIZE;
        check_min(
            "discrete record",
            payload,
            PV_TIME_HEADER_SIZE + data_size,
        )?;
        Ok(Self {
            pv_id,
            status,
            severity,
            stamp,
            samples: &payload[PV_TIME_HEADER_SIZE..PV_TIME_HEADER_SIZE + data_size],
        })
    }

    pub fn pv_id(&self) -> i16 {
        self.pv_id
    }

    pub fn status(&self) -> i16 {
        self.status
    }

    pub fn severity(&self) -> i16 {
        self.severity
    }

    pub fn stamp(&self) -> ClockTime {
        self.stamp
    }

    pub fn len(&self) -> usize {
        self.samples.len() / PV_SAMPLE_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        if index >= self.len() {
            return None;
        }
        let start = index * PV_SAMPLE_SIZE;
        Some(LittleEndian::read_u32(
            &self.samples[start..start + PV_SAMPLE_SIZE],
        ))
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + 'a {
        self.samples
            .chunks_exact(PV_SAMPLE_SIZE)
            .map(LittleEndian::read_u32)
    }
}

/// One entry of the timing system FIFO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FifoEvent {
    pub timestamp_high: u32,
    pub timestamp_low: u32,
    pub event_code: u32,
}

impl FifoEvent {
    pub fn new(event_code: u32) -> Self {
        Self {
            timestamp_high: 0,
            timestamp_low: 0,
            event_code,
        }
    }
}

/// The timing record: every event code latched for this event
#[derive(Debug, Clone, Copy)]
pub struct EvrDataView<'a> {
    fifo: &'a [u8],
}

impl<'a> EvrDataView<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self, PayloadError> {
        check_min("timing record", payload, EVR_HEADER_SIZE)?;
        let n_events = LittleEndian::read_u32(&payload[0..4]) as usize;
        let size = EVR_HEADER_SIZE + n_events.saturating_mul(EVR_FIFO_EVENT_SIZE);
        check_min("timing record", payload, size)?;
        Ok(Self {
            fifo: &payload[EVR_HEADER_SIZE..size],
        })
    }

    pub fn num_fifo_events(&self) -> usize {
        self.fifo.len() / EVR_FIFO_EVENT_SIZE
    }

    pub fn fifo_event(&self, index: usize) -> Option<FifoEvent> {
        if index >= self.num_fifo_events() {
            return None;
        }
        Some(Self::decode(
            &self.fifo[index * EVR_FIFO_EVENT_SIZE..(index + 1) * EVR_FIFO_EVENT_SIZE],
        ))
    }

    pub fn iter(&self) -> impl Iterator<Item = FifoEvent> + 'a {
        self.fifo.chunks_exact(EVR_FIFO_EVENT_SIZE).map(Self::decode)
    }

    pub fn event_codes(&self) -> impl Iterator<Item = u32> + 'a {
        self.iter().map(|fe| fe.event_code)
    }

    fn decode(bytes: &[u8]) -> FifoEvent {
        FifoEvent {
            timestamp_high: LittleEndian::read_u32(&bytes[0..4]),
            timestamp_low: LittleEndian::read_u32(&bytes[4..8]),
            event_code: LittleEndian::read_u32(&bytes[8..12]),
        }
    }
}

/// Encode a frame payload
pub fn encode_frame(width: u32, height: u32, offset: u32, pixels: &[u16]) -> Vec<u8> {
    let mut bytes = vec![0u8; FRAME_HEADER_SIZE + 2 * pixels.len()];
    LittleEndian::write_u32(&mut bytes[0..4], width);
    LittleEndian::write_u32(&mut bytes[4..8], height);
    LittleEndian::write_u32(&mut bytes[8..12], 12);
    LittleEndian::write_u32(&mut bytes[12..16], offset);
    LittleEndian::write_u16_into(pixels, &mut bytes[FRAME_HEADER_SIZE..]);
    bytes
}

/// Encode a discrete record definition. Names longer than the name field are cut.
pub fn encode_pv_ctrl(pv_id: i16, num_elements: i16, name: &str) -> Vec<u8> {
    let mut bytes = vec![0u8; PV_CTRL_HEADER_SIZE];
    LittleEndian::write_i16(&mut bytes[0..2], pv_id);
    LittleEndian::write_i16(&mut bytes[2..4], DBR_LONG);
    LittleEndian::write_i16(&mut bytes[4..6], num_elements);
    let name = name.as_bytes();
    let len = name.len().min(PV_NAME_SIZE - 1);
    bytes[8..8 + len].copy_from_slice(&name[..len]);
    bytes
}

/// Encode a discrete record carrying `samples`. At most `i16::MAX` samples are kept.
pub fn encode_pv_waveform(pv_id: i16, stamp: ClockTime, samples: &[u32]) -> Vec<u8> {
    let samples = &samples[..samples.len().min(i16::MAX as usize)];
    let mut bytes = vec![0u8; PV_TIME_HEADER_SIZE + PV_SAMPLE_SIZE * samples.len()];
    LittleEndian::write_i16(&mut bytes[0..2], pv_id);
    LittleEndian::write_i16(&mut bytes[2..4], DBR_LONG);
    LittleEndian::write_i16(&mut bytes[4..6], samples.len() as i16);
    LittleEndian::write_u32(&mut bytes[12..16], stamp.seconds);
    LittleEndian::write_u32(&mut bytes[16..20], stamp.nanoseconds);
    LittleEndian::write_u32_into(samples, &mut bytes[PV_TIME_HEADER_SIZE..]);
    bytes
}

/// Encode a timing record
pub fn encode_evr(events: &[FifoEvent]) -> Vec<u8> {
    let mut bytes = vec![0u8; EVR_HEADER_SIZE + EVR_FIFO_EVENT_SIZE * events.len()];
    LittleEndian::write_u32(&mut bytes[0..4], events.len() as u32);
    for (chunk, fe) in bytes[EVR_HEADER_SIZE..]
        .chunks_exact_mut(EVR_FIFO_EVENT_SIZE)
        .zip(events)
    {
        LittleEndian::write_u32(&mut chunk[0..4], fe.timestamp_high);
        LittleEndian::write_u32(&mut chunk[4..8], fe.timestamp_low);
        LittleEndian::write_u32(&mut chunk[8..12], fe.event_code);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_projection() {
        // 3 rows x 4 columns, pedestal of 10
        let pixels: Vec<u16> = (0..12).map(|v| 10 + v as u16).collect();
        let bytes = encode_frame(4, 3, 10, &pixels);
        let frame = FrameView::parse(&bytes).unwrap();
        assert_eq!(frame.pixel(2, 3), Some(21));
        assert_eq!(frame.pixel(3, 0), None);

        let mut out = vec![0.0; 4];
        let nrows = frame.project_rows(1..10, &mut out);
        assert_eq!(nrows, 2);
        assert_eq!(out, vec![12.0, 14.0, 16.0, 18.0]);
    }

    #[test]
    fn test_frame_size_checked() {
        let mut bytes = encode_frame(4, 3, 0, &[0; 12]);
        bytes.pop();
        assert!(matches!(
            FrameView::parse(&bytes),
            Err(PayloadError::SizeMismatch { .. })
        ));
        assert!(matches!(
            FrameView::parse(&bytes[..8]),
            Err(PayloadError::Truncated { .. })
        ));
    }

    #[test]
    fn test_pv_ctrl_name() {
        let bytes = encode_pv_ctrl(3, 10, "TT01:SIGNAL_WF");
        let pv = PvCtrlView::parse(&bytes).unwrap();
        assert_eq!(pv.pv_id(), 3);
        assert_eq!(pv.name(), "TT01:SIGNAL_WF");
        assert_eq!(pv.num_elements(), 10);
    }

    #[test]
    fn test_pv_waveform_truncated() {
        let bytes = encode_pv_waveform(5, ClockTime::new(1, 2), &[1, 2, 3]);
        let wf = PvWaveformView::parse(&bytes).unwrap();
        assert_eq!(wf.len(), 3);
        assert_eq!(wf.get(2), Some(3));
        assert_eq!(wf.get(3), None);
        assert_eq!(wf.stamp(), ClockTime::new(1, 2));
        assert!(PvWaveformView::parse(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_evr_codes() {
        let bytes = encode_evr(&[FifoEvent::new(40), FifoEvent::new(162)]);
        let evr = EvrDataView::parse(&bytes).unwrap();
        assert_eq!(evr.num_fifo_events(), 2);
        assert_eq!(evr.event_codes().collect::<Vec<u32>>(), vec![40, 162]);
        assert_eq!(evr.fifo_event(2), None);
        assert!(EvrDataView::parse(&bytes[..10]).is_err());
    }
}
