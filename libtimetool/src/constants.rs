// Payload type identifiers as they appear in the fragment header
pub const TYPE_ID_FRAME: u16 = 2;
pub const TYPE_ID_EPICS: u16 = 13;
pub const TYPE_ID_OPAL1K_CONFIG: u16 = 21;
pub const TYPE_ID_EVR_DATA: u16 = 30;

// Transition kinds in a replay stream
pub const TRANSITION_CONFIGURE: u32 = 1;
pub const TRANSITION_L1ACCEPT: u32 = 2;

// Sizes in bytes
pub const TRANSITION_HEADER_SIZE: usize = 16;
pub const FRAGMENT_HEADER_SIZE: usize = 16;
pub const FRAME_HEADER_SIZE: usize = 16;
pub const PV_NAME_SIZE: usize = 64;
pub const PV_CTRL_HEADER_SIZE: usize = 8 + PV_NAME_SIZE;
pub const PV_TIME_HEADER_SIZE: usize = 20;
pub const PV_SAMPLE_SIZE: usize = 4;
/// DBR type code of a 32-bit integer record
pub const DBR_LONG: i16 = 5;
pub const EVR_HEADER_SIZE: usize = 4;
pub const EVR_FIFO_EVENT_SIZE: usize = 12;

/// Columns of an Opal1k sensor
pub const DEFAULT_COLUMNS: usize = 1024;

/// Number of points kept by a correlation scan
pub const SCAN_POINTS: usize = 100;

// Discrete record name suffixes, appended to the module base name
pub const SIGNAL_WF_SUFFIX: &str = ":SIGNAL_WF";
pub const SIDEBAND_WF_SUFFIX: &str = ":SIDEBAND_WF";
pub const REFERENCE_WF_SUFFIX: &str = ":REFERENCE_WF";

/// Feature cache slot names, in publish order. Downstream consumers address
/// these by offset from the first slot.
pub const CACHE_SLOT_SUFFIXES: [&str; 6] = [
    ":AMI:AMPL",
    ":AMI:FLTPOS",
    ":AMI:FLTPOS_PS",
    ":AMI:FLTPOSFWHM",
    ":AMI:AMPLNXT",
    ":AMI:REFAMPL",
];
