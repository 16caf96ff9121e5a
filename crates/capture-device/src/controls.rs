//! Capture control values and incremental updates

use crate::{CaptureError, SyncRole};
use serde::{Deserialize, Serialize};

/// Default fixed frame rate for synchronized capture
pub const DEFAULT_FRAME_RATE: f64 = 24.0;

/// The node's full control state, pushed to the hardware on configure and on
/// live control updates.
///
/// Mutations are incremental merges: applying a partial update never clears
/// a previously-set field that the update does not mention. `sync_role` is a
/// derived field; the session controller overwrites it immediately before
/// any hardware start regardless of what callers supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlValues {
    /// Fixed frame rate (Hz); must match on both nodes for sync capture
    pub frame_rate: f64,
    /// Auto-exposure enable; cleared when a manual exposure is set
    pub ae_enable: Option<bool>,
    /// Manual exposure time in microseconds
    pub exposure_time_us: Option<u32>,
    /// Analogue sensor gain
    pub analogue_gain: Option<f32>,
    /// Autofocus mode (hardware enum value)
    pub af_mode: Option<u8>,
    /// Manual lens position (dioptres)
    pub lens_position: Option<f32>,
    /// One-shot autofocus trigger; sticky until hardware consumes it
    pub af_trigger: Option<bool>,
    /// Hardware synchronization role
    pub sync_role: SyncRole,
}

impl ControlValues {
    /// Initial control set for a node with the given sync role
    pub fn new(sync_role: SyncRole) -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            ae_enable: None,
            exposure_time_us: None,
            analogue_gain: None,
            af_mode: None,
            lens_position: None,
            af_trigger: None,
            sync_role,
        }
    }

    /// Merge a partial update into this control set.
    ///
    /// A manual `exposure` disables auto-exposure; `auto_exposure: true`
    /// re-enables it. Fields absent from the update are left untouched.
    pub fn merge(&mut self, update: &ControlUpdate) {
        if let Some(exposure) = update.exposure {
            self.ae_enable = Some(false);
            self.exposure_time_us = Some(exposure);
        }
        if let Some(gain) = update.gain {
            self.analogue_gain = Some(gain);
        }
        if let Some(rate) = update.framerate {
            self.frame_rate = rate;
        }
        if update.auto_exposure == Some(true) {
            self.ae_enable = Some(true);
        }
        if let Some(mode) = update.af_mode {
            self.af_mode = Some(mode);
        }
        if let Some(pos) = update.lens_position {
            self.lens_position = Some(pos);
        }
        if update.af_trigger == Some(true) {
            self.af_trigger = Some(true);
        }
    }
}

/// Partial control update as received from the control surface.
///
/// Field names follow the wire payload accepted by both nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlUpdate {
    /// Manual exposure time in microseconds
    pub exposure: Option<u32>,
    /// Analogue gain
    pub gain: Option<f32>,
    /// Frame rate (Hz)
    pub framerate: Option<f64>,
    /// Re-enable auto exposure
    pub auto_exposure: Option<bool>,
    /// Autofocus mode
    pub af_mode: Option<u8>,
    /// Manual lens position
    pub lens_position: Option<f32>,
    /// One-shot autofocus trigger
    pub af_trigger: Option<bool>,
}

impl ControlUpdate {
    /// Reject out-of-range values before they reach the merge
    pub fn validate(&self) -> Result<(), CaptureError> {
        if let Some(rate) = self.framerate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(CaptureError::InvalidControl(format!(
                    "framerate must be positive, got {rate}"
                )));
            }
        }
        if let Some(gain) = self.gain {
            if !gain.is_finite() || gain <= 0.0 {
                return Err(CaptureError::InvalidControl(format!(
                    "gain must be positive, got {gain}"
                )));
            }
        }
        if let Some(pos) = self.lens_position {
            if !pos.is_finite() || pos < 0.0 {
                return Err(CaptureError::InvalidControl(format!(
                    "lens_position must be non-negative, got {pos}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_manual_exposure_disables_ae() {
        let mut ctrls = ControlValues::new(SyncRole::Server);
        ctrls.merge(&ControlUpdate {
            exposure: Some(5000),
            ..Default::default()
        });

        assert_eq!(ctrls.ae_enable, Some(false));
        assert_eq!(ctrls.exposure_time_us, Some(5000));
    }

    #[test]
    fn test_auto_exposure_reenables_ae() {
        let mut ctrls = ControlValues::new(SyncRole::Server);
        ctrls.merge(&ControlUpdate {
            exposure: Some(5000),
            ..Default::default()
        });
        ctrls.merge(&ControlUpdate {
            auto_exposure: Some(true),
            ..Default::default()
        });

        assert_eq!(ctrls.ae_enable, Some(true));
        // Manual exposure value survives, only the enable flag flips
        assert_eq!(ctrls.exposure_time_us, Some(5000));
    }

    #[test]
    fn test_merge_never_clears_unrelated_fields() {
        let mut ctrls = ControlValues::new(SyncRole::Client);
        ctrls.merge(&ControlUpdate {
            exposure: Some(8000),
            lens_position: Some(2.5),
            ..Default::default()
        });
        ctrls.merge(&ControlUpdate {
            gain: Some(4.0),
            ..Default::default()
        });

        assert_eq!(ctrls.exposure_time_us, Some(8000));
        assert_eq!(ctrls.lens_position, Some(2.5));
        assert_eq!(ctrls.analogue_gain, Some(4.0));
        assert_eq!(ctrls.sync_role, SyncRole::Client);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let update = ControlUpdate {
            framerate: Some(0.0),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = ControlUpdate {
            gain: Some(-1.0),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_wire_payload_field_names() {
        let update: ControlUpdate =
            serde_json::from_str(r#"{"exposure": 5000, "af_trigger": true}"#).unwrap();
        assert_eq!(update.exposure, Some(5000));
        assert_eq!(update.af_trigger, Some(true));
        assert!(update.gain.is_none());
    }

    fn arb_update() -> impl Strategy<Value = ControlUpdate> {
        (
            proptest::option::of(1u32..100_000),
            proptest::option::of(1.0f32..16.0),
            proptest::option::of(1.0f64..60.0),
            proptest::option::of(any::<bool>()),
            proptest::option::of(0u8..3),
            proptest::option::of(0.0f32..10.0),
            proptest::option::of(any::<bool>()),
        )
            .prop_map(
                |(exposure, gain, framerate, auto_exposure, af_mode, lens_position, af_trigger)| {
                    ControlUpdate {
                        exposure,
                        gain,
                        framerate,
                        auto_exposure,
                        af_mode,
                        lens_position,
                        af_trigger,
                    }
                },
            )
    }

    proptest! {
        /// The result of a sequence of merges equals the left-fold of the
        /// ordered partials, and a set field only changes when a later
        /// partial mentions it.
        #[test]
        fn prop_merge_is_ordered_left_fold(updates in proptest::collection::vec(arb_update(), 0..16)) {
            let mut merged = ControlValues::new(SyncRole::Server);
            for u in &updates {
                merged.merge(u);
            }

            let folded = updates.iter().fold(
                ControlValues::new(SyncRole::Server),
                |mut acc, u| { acc.merge(u); acc },
            );
            prop_assert_eq!(&merged, &folded);

            // A key set by some partial and untouched afterwards survives
            if let Some(last_gain_idx) = updates.iter().rposition(|u| u.gain.is_some()) {
                prop_assert_eq!(merged.analogue_gain, updates[last_gain_idx].gain);
            }
        }
    }
}
