use crate::layout::{Field, FieldLayout};

/// Unit whose control bitmap advertises a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    CameraTerminal,
    ProcessingUnit,
}

/// CT and PU capability bitmaps as advertised by the device descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlBitmaps {
    pub camera_terminal: u64,
    pub processing_unit: u64,
}

impl ControlBitmaps {
    pub fn new(camera_terminal: u64, processing_unit: u64) -> Self {
        Self {
            camera_terminal,
            processing_unit,
        }
    }

    pub fn all() -> Self {
        Self::new(u64::MAX, u64::MAX)
    }

    pub fn contains(&self, selector: Selector) -> bool {
        let bits = match selector.unit() {
            Unit::CameraTerminal => self.camera_terminal,
            Unit::ProcessingUnit => self.processing_unit,
        };
        bits & (1 << selector.bit()) != 0
    }

    pub fn insert(&mut self, selector: Selector) {
        let bit = 1 << selector.bit();
        match selector.unit() {
            Unit::CameraTerminal => self.camera_terminal |= bit,
            Unit::ProcessingUnit => self.processing_unit |= bit,
        }
    }
}

/// Hardware control as addressed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    ScanningMode,
    AeMode,
    AePriority,
    ExposureAbsolute,
    ExposureRelative,
    FocusAbsolute,
    FocusRelative,
    IrisAbsolute,
    IrisRelative,
    ZoomAbsolute,
    ZoomRelative,
    PanTiltAbsolute,
    PanTiltRelative,
    RollAbsolute,
    RollRelative,
    FocusAuto,
    Privacy,
    FocusSimple,
    DigitalWindow,
    RegionOfInterest,
    Brightness,
    Contrast,
    Hue,
    Saturation,
    Sharpness,
    Gamma,
    WhiteBalanceTemperature,
    WhiteBalanceComponent,
    BacklightCompensation,
    Gain,
    PowerLineFrequency,
    HueAuto,
    WhiteBalanceTemperatureAuto,
    WhiteBalanceComponentAuto,
    DigitalMultiplier,
    DigitalMultiplierLimit,
    AnalogVideoStandard,
    AnalogLockStatus,
    ContrastAuto,
}

impl Selector {
    pub fn unit(self) -> Unit {
        use Selector::*;
        match self {
            ScanningMode | AeMode | AePriority | ExposureAbsolute | ExposureRelative
            | FocusAbsolute | FocusRelative | IrisAbsolute | IrisRelative | ZoomAbsolute
            | ZoomRelative | PanTiltAbsolute | PanTiltRelative | RollAbsolute | RollRelative
            | FocusAuto | Privacy | FocusSimple | DigitalWindow | RegionOfInterest => {
                Unit::CameraTerminal
            }
            _ => Unit::ProcessingUnit,
        }
    }

    /// Bit position in the owning unit's bitmap.
    pub fn bit(self) -> u32 {
        use Selector::*;
        match self {
            ScanningMode => 0,
            AeMode => 1,
            AePriority => 2,
            ExposureAbsolute => 3,
            ExposureRelative => 4,
            FocusAbsolute => 5,
            FocusRelative => 6,
            IrisAbsolute => 7,
            IrisRelative => 8,
            ZoomAbsolute => 9,
            ZoomRelative => 10,
            PanTiltAbsolute => 11,
            PanTiltRelative => 12,
            RollAbsolute => 13,
            RollRelative => 14,
            FocusAuto => 17,
            Privacy => 18,
            FocusSimple => 19,
            DigitalWindow => 20,
            RegionOfInterest => 21,

            Brightness => 0,
            Contrast => 1,
            Hue => 2,
            Saturation => 3,
            Sharpness => 4,
            Gamma => 5,
            WhiteBalanceTemperature => 6,
            WhiteBalanceComponent => 7,
            BacklightCompensation => 8,
            Gain => 9,
            PowerLineFrequency => 10,
            HueAuto => 11,
            WhiteBalanceTemperatureAuto => 12,
            WhiteBalanceComponentAuto => 13,
            DigitalMultiplier => 14,
            DigitalMultiplierLimit => 15,
            AnalogVideoStandard => 16,
            AnalogLockStatus => 17,
            ContrastAuto => 18,
        }
    }

    /// Field layout on the wire. `None` for selectors this cache never transfers.
    pub fn layout(self) -> Option<FieldLayout> {
        use FieldLayout::*;
        use Selector::*;
        let layout = match self {
            ScanningMode | AeMode | AePriority | FocusAuto | Privacy | FocusSimple
            | IrisRelative => Single(Field::U8),
            ExposureAbsolute => Single(Field::U32),
            ExposureRelative => Single(Field::I8),
            FocusAbsolute | IrisAbsolute | ZoomAbsolute => Single(Field::U16),
            FocusRelative => Pair(Field::I8, Field::U8),
            ZoomRelative => Triple(Field::I8, Field::U8, Field::U8),
            PanTiltAbsolute => Axes(Field::I32),
            RollAbsolute => Single(Field::I16),
            PanTiltRelative | RollRelative | DigitalWindow | RegionOfInterest => return None,

            Brightness | Hue => Single(Field::I16),
            Contrast | Saturation | Sharpness | Gamma | WhiteBalanceTemperature
            | BacklightCompensation | Gain | DigitalMultiplier | DigitalMultiplierLimit => {
                Single(Field::U16)
            }
            WhiteBalanceComponent => Single(Field::U32),
            PowerLineFrequency | HueAuto | WhiteBalanceTemperatureAuto
            | WhiteBalanceComponentAuto | AnalogVideoStandard | AnalogLockStatus
            | ContrastAuto => Single(Field::U8),
        };
        Some(layout)
    }
}

/// How the cache treats reads and writes for a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Lazily fetched limits, clamp on set.
    Ranged,
    /// Writes 0/1 directly, no clamping.
    Boolean,
    /// One axis of a two-axis selector.
    Axis(usize),
    /// Negative values select the device default.
    PowerLine,
    /// Always `AccessDenied`.
    Unimplemented,
}

/// Control as exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    ScanningMode,
    AutoExposureMode,
    AutoExposurePriority,
    ExposureAbsolute,
    ExposureRelative,
    FocusAbsolute,
    FocusRelative,
    FocusSimple,
    FocusAuto,
    IrisAbsolute,
    IrisRelative,
    ZoomAbsolute,
    ZoomRelative,
    PanAbsolute,
    TiltAbsolute,
    PanRelative,
    TiltRelative,
    RollAbsolute,
    RollRelative,
    Privacy,
    DigitalWindow,
    RegionOfInterest,
    Brightness,
    Contrast,
    ContrastAuto,
    Hue,
    HueAuto,
    Saturation,
    Sharpness,
    Gamma,
    WhiteBalanceTemperature,
    WhiteBalanceTemperatureAuto,
    WhiteBalanceComponent,
    WhiteBalanceComponentAuto,
    BacklightCompensation,
    Gain,
    PowerLineFrequency,
    DigitalMultiplier,
    DigitalMultiplierLimit,
    AnalogVideoStandard,
    AnalogLockStatus,
}

impl ControlId {
    pub const ALL: [ControlId; 41] = [
        ControlId::ScanningMode,
        ControlId::AutoExposureMode,
        ControlId::AutoExposurePriority,
        ControlId::ExposureAbsolute,
        ControlId::ExposureRelative,
        ControlId::FocusAbsolute,
        ControlId::FocusRelative,
        ControlId::FocusSimple,
        ControlId::FocusAuto,
        ControlId::IrisAbsolute,
        ControlId::IrisRelative,
        ControlId::ZoomAbsolute,
        ControlId::ZoomRelative,
        ControlId::PanAbsolute,
        ControlId::TiltAbsolute,
        ControlId::PanRelative,
        ControlId::TiltRelative,
        ControlId::RollAbsolute,
        ControlId::RollRelative,
        ControlId::Privacy,
        ControlId::DigitalWindow,
        ControlId::RegionOfInterest,
        ControlId::Brightness,
        ControlId::Contrast,
        ControlId::ContrastAuto,
        ControlId::Hue,
        ControlId::HueAuto,
        ControlId::Saturation,
        ControlId::Sharpness,
        ControlId::Gamma,
        ControlId::WhiteBalanceTemperature,
        ControlId::WhiteBalanceTemperatureAuto,
        ControlId::WhiteBalanceComponent,
        ControlId::WhiteBalanceComponentAuto,
        ControlId::BacklightCompensation,
        ControlId::Gain,
        ControlId::PowerLineFrequency,
        ControlId::DigitalMultiplier,
        ControlId::DigitalMultiplierLimit,
        ControlId::AnalogVideoStandard,
        ControlId::AnalogLockStatus,
    ];

    pub fn selector(self) -> Selector {
        match self {
            ControlId::ScanningMode => Selector::ScanningMode,
            ControlId::AutoExposureMode => Selector::AeMode,
            ControlId::AutoExposurePriority => Selector::AePriority,
            ControlId::ExposureAbsolute => Selector::ExposureAbsolute,
            ControlId::ExposureRelative => Selector::ExposureRelative,
            ControlId::FocusAbsolute => Selector::FocusAbsolute,
            ControlId::FocusRelative => Selector::FocusRelative,
            ControlId::FocusSimple => Selector::FocusSimple,
            ControlId::FocusAuto => Selector::FocusAuto,
            ControlId::IrisAbsolute => Selector::IrisAbsolute,
            ControlId::IrisRelative => Selector::IrisRelative,
            ControlId::ZoomAbsolute => Selector::ZoomAbsolute,
            ControlId::ZoomRelative => Selector::ZoomRelative,
            ControlId::PanAbsolute | ControlId::TiltAbsolute => Selector::PanTiltAbsolute,
            ControlId::PanRelative | ControlId::TiltRelative => Selector::PanTiltRelative,
            ControlId::RollAbsolute => Selector::RollAbsolute,
            ControlId::RollRelative => Selector::RollRelative,
            ControlId::Privacy => Selector::Privacy,
            ControlId::DigitalWindow => Selector::DigitalWindow,
            ControlId::RegionOfInterest => Selector::RegionOfInterest,
            ControlId::Brightness => Selector::Brightness,
            ControlId::Contrast => Selector::Contrast,
            ControlId::ContrastAuto => Selector::ContrastAuto,
            ControlId::Hue => Selector::Hue,
            ControlId::HueAuto => Selector::HueAuto,
            ControlId::Saturation => Selector::Saturation,
            ControlId::Sharpness => Selector::Sharpness,
            ControlId::Gamma => Selector::Gamma,
            ControlId::WhiteBalanceTemperature => Selector::WhiteBalanceTemperature,
            ControlId::WhiteBalanceTemperatureAuto => Selector::WhiteBalanceTemperatureAuto,
            ControlId::WhiteBalanceComponent => Selector::WhiteBalanceComponent,
            ControlId::WhiteBalanceComponentAuto => Selector::WhiteBalanceComponentAuto,
            ControlId::BacklightCompensation => Selector::BacklightCompensation,
            ControlId::Gain => Selector::Gain,
            ControlId::PowerLineFrequency => Selector::PowerLineFrequency,
            ControlId::DigitalMultiplier => Selector::DigitalMultiplier,
            ControlId::DigitalMultiplierLimit => Selector::DigitalMultiplierLimit,
            ControlId::AnalogVideoStandard => Selector::AnalogVideoStandard,
            ControlId::AnalogLockStatus => Selector::AnalogLockStatus,
        }
    }

    pub fn behavior(self) -> Behavior {
        match self {
            ControlId::FocusAuto
            | ControlId::Privacy
            | ControlId::ContrastAuto
            | ControlId::HueAuto
            | ControlId::WhiteBalanceTemperatureAuto
            | ControlId::WhiteBalanceComponentAuto => Behavior::Boolean,
            ControlId::PanAbsolute => Behavior::Axis(0),
            ControlId::TiltAbsolute => Behavior::Axis(1),
            ControlId::PanRelative
            | ControlId::TiltRelative
            | ControlId::RollRelative
            | ControlId::DigitalWindow
            | ControlId::RegionOfInterest => Behavior::Unimplemented,
            ControlId::PowerLineFrequency => Behavior::PowerLine,
            _ => Behavior::Ranged,
        }
    }
}
