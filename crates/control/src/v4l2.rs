use crate::ids::{ControlBitmaps, Selector};
use crate::transport::{ControlTransport, Request};
use common::{Result, UvcError};
use std::collections::HashMap;
use std::sync::Arc;
use v4l::{
    Device,
    control::{Control, Value},
};

// V4L2 control IDs (from videodev2.h)
const V4L2_CID_BRIGHTNESS: u32 = 0x0098_0900;
const V4L2_CID_CONTRAST: u32 = 0x0098_0901;
const V4L2_CID_SATURATION: u32 = 0x0098_0902;
const V4L2_CID_HUE: u32 = 0x0098_0903;
const V4L2_CID_AUTO_WHITE_BALANCE: u32 = 0x0098_090c;
const V4L2_CID_GAMMA: u32 = 0x0098_0910;
const V4L2_CID_GAIN: u32 = 0x0098_0913;
const V4L2_CID_POWER_LINE_FREQUENCY: u32 = 0x0098_0918;
const V4L2_CID_HUE_AUTO: u32 = 0x0098_0919;
const V4L2_CID_WHITE_BALANCE_TEMPERATURE: u32 = 0x0098_091a;
const V4L2_CID_SHARPNESS: u32 = 0x0098_091b;
const V4L2_CID_BACKLIGHT_COMPENSATION: u32 = 0x0098_091c;
const V4L2_CID_EXPOSURE_AUTO: u32 = 0x009a_0901;
const V4L2_CID_EXPOSURE_ABSOLUTE: u32 = 0x009a_0902;
const V4L2_CID_EXPOSURE_AUTO_PRIORITY: u32 = 0x009a_0903;
const V4L2_CID_PAN_ABSOLUTE: u32 = 0x009a_0908;
const V4L2_CID_TILT_ABSOLUTE: u32 = 0x009a_0909;
const V4L2_CID_FOCUS_ABSOLUTE: u32 = 0x009a_090a;
const V4L2_CID_FOCUS_AUTO: u32 = 0x009a_090c;
const V4L2_CID_ZOOM_ABSOLUTE: u32 = 0x009a_090d;
const V4L2_CID_PRIVACY: u32 = 0x009a_0910;
const V4L2_CID_IRIS_ABSOLUTE: u32 = 0x009a_0911;
const V4L2_CID_IRIS_RELATIVE: u32 = 0x009a_0912;

/// V4L2 controls backing a selector, one per field in wire order.
fn cids(selector: Selector) -> &'static [u32] {
    use Selector::*;
    match selector {
        Brightness => &[V4L2_CID_BRIGHTNESS],
        Contrast => &[V4L2_CID_CONTRAST],
        Saturation => &[V4L2_CID_SATURATION],
        Hue => &[V4L2_CID_HUE],
        WhiteBalanceTemperatureAuto => &[V4L2_CID_AUTO_WHITE_BALANCE],
        Gamma => &[V4L2_CID_GAMMA],
        Gain => &[V4L2_CID_GAIN],
        PowerLineFrequency => &[V4L2_CID_POWER_LINE_FREQUENCY],
        HueAuto => &[V4L2_CID_HUE_AUTO],
        WhiteBalanceTemperature => &[V4L2_CID_WHITE_BALANCE_TEMPERATURE],
        Sharpness => &[V4L2_CID_SHARPNESS],
        BacklightCompensation => &[V4L2_CID_BACKLIGHT_COMPENSATION],
        AeMode => &[V4L2_CID_EXPOSURE_AUTO],
        ExposureAbsolute => &[V4L2_CID_EXPOSURE_ABSOLUTE],
        AePriority => &[V4L2_CID_EXPOSURE_AUTO_PRIORITY],
        PanTiltAbsolute => &[V4L2_CID_PAN_ABSOLUTE, V4L2_CID_TILT_ABSOLUTE],
        FocusAbsolute => &[V4L2_CID_FOCUS_ABSOLUTE],
        FocusAuto => &[V4L2_CID_FOCUS_AUTO],
        ZoomAbsolute => &[V4L2_CID_ZOOM_ABSOLUTE],
        Privacy => &[V4L2_CID_PRIVACY],
        IrisAbsolute => &[V4L2_CID_IRIS_ABSOLUTE],
        IrisRelative => &[V4L2_CID_IRIS_RELATIVE],
        _ => &[],
    }
}

/// Every selector with a V4L2 counterpart.
const MAPPED: [Selector; 22] = [
    Selector::Brightness,
    Selector::Contrast,
    Selector::Saturation,
    Selector::Hue,
    Selector::WhiteBalanceTemperatureAuto,
    Selector::Gamma,
    Selector::Gain,
    Selector::PowerLineFrequency,
    Selector::HueAuto,
    Selector::WhiteBalanceTemperature,
    Selector::Sharpness,
    Selector::BacklightCompensation,
    Selector::AeMode,
    Selector::ExposureAbsolute,
    Selector::AePriority,
    Selector::PanTiltAbsolute,
    Selector::FocusAbsolute,
    Selector::FocusAuto,
    Selector::ZoomAbsolute,
    Selector::Privacy,
    Selector::IrisAbsolute,
    Selector::IrisRelative,
];

#[derive(Debug, Clone, Copy)]
struct Range {
    minimum: i64,
    maximum: i64,
    default: i64,
}

/// Control transport over a V4L2 device node (uvcvideo exposes UVC
/// selectors as V4L2 control IDs).
pub struct V4l2Transport {
    device: Arc<Device>,
    ranges: HashMap<u32, Range>,
}

impl V4l2Transport {
    pub fn new(device: Arc<Device>) -> Result<Self> {
        let ranges = device
            .query_controls()?
            .into_iter()
            .map(|desc| {
                (
                    desc.id,
                    Range {
                        minimum: desc.minimum,
                        maximum: desc.maximum,
                        default: desc.default,
                    },
                )
            })
            .collect::<HashMap<_, _>>();
        tracing::debug!(count = ranges.len(), "V4L2 controls enumerated");
        Ok(Self { device, ranges })
    }

    /// Bitmaps advertising every selector whose V4L2 controls are all exposed.
    pub fn bitmaps(&self) -> ControlBitmaps {
        let mut bitmaps = ControlBitmaps::default();
        for selector in MAPPED {
            if cids(selector).iter().all(|cid| self.ranges.contains_key(cid)) {
                bitmaps.insert(selector);
            }
        }
        bitmaps
    }

    fn mapped(selector: Selector) -> Result<&'static [u32]> {
        match cids(selector) {
            [] => Err(UvcError::NotFound(format!(
                "{:?} has no V4L2 counterpart",
                selector
            ))),
            cids => Ok(cids),
        }
    }

    fn range(&self, cid: u32) -> Result<Range> {
        self.ranges
            .get(&cid)
            .copied()
            .ok_or_else(|| UvcError::NotFound(format!("V4L2 control {:#010x}", cid)))
    }

    fn current(&self, cid: u32) -> Result<i32> {
        match self.device.control(cid)?.value {
            Value::Integer(v) => Ok(saturate(v)),
            Value::Boolean(b) => Ok(i32::from(b)),
            other => Err(UvcError::not_supported(format!(
                "V4L2 control {:#010x} has value {:?}",
                cid, other
            ))),
        }
    }
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl ControlTransport for V4l2Transport {
    fn read(&mut self, selector: Selector, request: Request) -> Result<Vec<i32>> {
        Self::mapped(selector)?
            .iter()
            .map(|&cid| match request {
                Request::Min => self.range(cid).map(|r| saturate(r.minimum)),
                Request::Max => self.range(cid).map(|r| saturate(r.maximum)),
                Request::Def => self.range(cid).map(|r| saturate(r.default)),
                Request::Cur => self.current(cid),
            })
            .collect()
    }

    fn write(&mut self, selector: Selector, fields: &[i32]) -> Result<()> {
        let cids = Self::mapped(selector)?;
        if cids.len() != fields.len() {
            return Err(UvcError::invalid(format!(
                "{:?} expects {} fields, got {}",
                selector,
                cids.len(),
                fields.len()
            )));
        }
        for (&cid, &value) in cids.iter().zip(fields) {
            self.device.set_control(Control {
                id: cid,
                value: Value::Integer(i64::from(value)),
            })?;
        }
        Ok(())
    }
}
