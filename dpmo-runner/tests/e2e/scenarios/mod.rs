//! E2E scenario test modules.
//!
//! - `power_cycles`: G3 / S5 / S3 based variants run to PASS
//! - `warm_resets`: ResetGeneral and ResetUefi2Os, including resets through S5
//! - `faults`: spontaneous transitions, hung boots, unreadable power status
//! - `report`: diagnostics and firmware log capture per cycle
//! - `config_error`: runs rejected before any observer starts

mod config_error;
mod faults;
mod power_cycles;
mod report;
mod warm_resets;
