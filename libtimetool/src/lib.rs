//! # libtimetool
//!
//! libtimetool is an online feature extractor for the time tool, the diagnostic that measures
//! the arrival time of an x-ray pulse relative to an optical laser pulse on a shot-by-shot
//! basis. It is written to sit inside a streaming detector data acquisition host: the host
//! delivers the fragments of each event (camera frames, projected waveforms, timing system
//! records) in any order, and libtimetool turns them into six timing-correction features
//! and a set of diagnostic plots.
//!
//! ## Event flow
//!
//! For every event:
//!
//! - Fragments are matched against the owned detector source and the resolved waveform
//! channels and captured into an `EventFragmentBuffer`.
//! - At the end of the event the timing record is gated: the veto (bykik) code and the laser
//! code are looked up among the latched event codes.
//! - The fit subsystem is run on the full frame when the detector writes images, otherwise on
//! the projected signal waveform (with optional sideband and reference).
//! - The results are written to the feature cache and all plots are stamped with the event clock.
//!
//! Events lacking data simply produce no results; nothing in the per-event path fails.
//!
//! ## Configuration
//!
//! The replay tool (`timetool_cli`) reads a YAML configuration:
//!
//! ```yml
//! stream_path: /path/to/run_0001.xtc
//! summary_path: /path/to/run_0001.yml
//! fex:
//!   base_name: TT01
//!   phy: 6400
//!   event_code_bykik: 162
//!   event_code_no_laser: 67
//!   indicator_offset: 0.0
//!   write_image: true
//!   write_projections: false
//!   columns: 1024
//!   sig_roi: [400, 600]
//!   sb_roi: [100, 300]
//!   spec_begin: 0
//!   spec_end: 1024
//!   weights: [1.0]
//!   calib_poly: [0.0, 1.0]
//!   ref_convergence: 1.0
//!   sb_convergence: 1.0
//! ```
//!
//! Any `fex` field may be omitted to use its default. A negative `event_code_no_laser` flips
//! its meaning: the code then marks shots *with* laser.
//!
//! ### Discrete record names
//!
//! Projected waveforms are discrete-value records named after the base name:
//!
//! - `<base_name>:SIGNAL_WF`
//! - `<base_name>:SIDEBAND_WF`
//! - `<base_name>:REFERENCE_WF`
//!
//! ## Output
//!
//! Six feature cache slots are registered, in this order:
//!
//! ```text
//! <base_name>:AMI:AMPL          edge amplitude
//! <base_name>:AMI:FLTPOS        edge position (pixel)
//! <base_name>:AMI:FLTPOS_PS     edge position (ps)
//! <base_name>:AMI:FLTPOSFWHM    edge width (pixel)
//! <base_name>:AMI:AMPLNXT       second highest edge amplitude
//! <base_name>:AMI:REFAMPL       mean reference amplitude
//! ```
//!
//! Downstream consumers address them by offset from the first slot.
pub mod cache;
pub mod channel_map;
pub mod config;
pub mod constants;
pub mod entry;
pub mod error;
pub mod fex;
pub mod fit;
pub mod fragment_buffer;
pub mod gate;
pub mod invoker;
pub mod module;
pub mod payload;
pub mod plots;
pub mod process;
pub mod publisher;
pub mod source_id;
pub mod stream;
pub mod summary;
pub mod timetool;
pub mod worker_status;
