use crate::ids::{Behavior, ControlBitmaps, ControlId, Selector};
use crate::layout::FieldLayout;
use crate::record::{ControlLimits, ControlRecord};
use crate::transport::{ControlTransport, Request};
use common::{Result, UvcError};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

const PAN_TILT: [ControlId; 2] = [ControlId::PanAbsolute, ControlId::TiltAbsolute];

fn field(fields: &[i32], index: usize) -> Result<i32> {
    fields.get(index).copied().ok_or_else(|| {
        UvcError::invalid(format!(
            "device returned {} fields, needed index {}",
            fields.len(),
            index
        ))
    })
}

struct ControlState {
    transport: Box<dyn ControlTransport>,
    records: HashMap<ControlId, ControlRecord>,
}

impl ControlState {
    fn record(&mut self, id: ControlId) -> &mut ControlRecord {
        self.records.entry(id).or_default()
    }

    fn read(&mut self, selector: Selector, request: Request) -> Result<Vec<i32>> {
        self.transport.read(selector, request)
    }

    /// Fetch min/max/def once per connection. A record whose limits are both
    /// zero is fetched again on next use.
    fn populate(&mut self, id: ControlId, layout: FieldLayout) -> Result<()> {
        if self.record(id).is_populated() {
            return Ok(());
        }
        let selector = id.selector();
        let min = self.read(selector, Request::Min)?;
        let max = self.read(selector, Request::Max)?;
        let def = self.read(selector, Request::Def)?;

        match layout {
            FieldLayout::Axes(_) => {
                for (axis, axis_id) in PAN_TILT.into_iter().enumerate() {
                    let (lo, hi, d) = (field(&min, axis)?, field(&max, axis)?, field(&def, axis)?);
                    let record = self.record(axis_id);
                    record.min = lo;
                    record.max = hi;
                    record.def = d;
                }
            }
            _ => {
                let (lo, hi, d) = (layout.pack(&min)?, layout.pack(&max)?, layout.pack(&def)?);
                let record = self.record(id);
                record.min = lo;
                record.max = hi;
                record.def = d;
            }
        }
        tracing::debug!(control = ?id, limits = ?self.record(id).limits(), "Control limits fetched");
        Ok(())
    }

    fn read_axes(&mut self, selector: Selector) -> Result<[i32; 2]> {
        let cur = self.read(selector, Request::Cur)?;
        let axes = [field(&cur, 0)?, field(&cur, 1)?];
        for (axis_id, value) in PAN_TILT.into_iter().zip(axes) {
            self.record(axis_id).current = Some(value);
        }
        Ok(axes)
    }
}

/// Lazily cached, clamped access to a device's hardware controls.
///
/// Every operation runs under one mutex, so requests to the device's single
/// control endpoint never interleave.
pub struct DeviceControls {
    bitmaps: ControlBitmaps,
    state: Mutex<ControlState>,
}

impl std::fmt::Debug for DeviceControls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceControls")
            .field("bitmaps", &self.bitmaps)
            .finish_non_exhaustive()
    }
}

impl DeviceControls {
    pub fn new(transport: Box<dyn ControlTransport>, bitmaps: ControlBitmaps) -> Self {
        Self {
            bitmaps,
            state: Mutex::new(ControlState {
                transport,
                records: HashMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn bitmaps(&self) -> ControlBitmaps {
        self.bitmaps
    }

    pub fn supports(&self, id: ControlId) -> bool {
        self.layout(id).is_ok()
    }

    fn layout(&self, id: ControlId) -> Result<FieldLayout> {
        if id.behavior() == Behavior::Unimplemented || !self.bitmaps.contains(id.selector()) {
            return Err(UvcError::AccessDenied);
        }
        id.selector().layout().ok_or(UvcError::AccessDenied)
    }

    pub fn obtain_limit(&self, id: ControlId) -> Result<ControlLimits> {
        let layout = self.layout(id)?;
        let mut state = self.state();
        state.populate(id, layout)?;
        Ok(state.record(id).limits())
    }

    /// Clamp `value` into the control's range and write it.
    ///
    /// Boolean controls write 0/1 without touching the limits. Power-line
    /// frequency treats a negative value as "use the device default".
    pub fn set(&self, id: ControlId, value: i32) -> Result<()> {
        let layout = self.layout(id)?;
        let selector = id.selector();
        let mut state = self.state();

        let written = match id.behavior() {
            Behavior::Boolean => {
                let flag = i32::from(value != 0);
                state.transport.write(selector, &[flag])?;
                flag
            }
            Behavior::Axis(axis) => {
                state.populate(id, layout)?;
                let clamped = state.record(id).clamp(value);
                let mut fields = state.read_axes(selector)?;
                fields[axis] = clamped;
                state.transport.write(selector, &fields)?;
                clamped
            }
            Behavior::PowerLine if value < 0 => {
                let def = state.read(selector, Request::Def)?;
                let def = layout.pack(&def)?;
                state.transport.write(selector, &layout.unpack(def)?)?;
                def
            }
            Behavior::Ranged | Behavior::PowerLine => {
                state.populate(id, layout)?;
                let record = *state.record(id);
                let fields = layout.clamp(value, record.min, record.max)?;
                state.transport.write(selector, &fields)?;
                layout.pack(&fields)?
            }
            Behavior::Unimplemented => return Err(UvcError::AccessDenied),
        };

        tracing::debug!(control = ?id, requested = value, written, "Control set");
        state.record(id).current = Some(written);
        Ok(())
    }

    /// Read the current value from the device.
    pub fn get(&self, id: ControlId) -> Result<i32> {
        let layout = self.layout(id)?;
        let selector = id.selector();
        let mut state = self.state();

        let value = match id.behavior() {
            Behavior::Boolean => {
                let cur = state.read(selector, Request::Cur)?;
                i32::from(field(&cur, 0)? != 0)
            }
            Behavior::Axis(axis) => {
                state.populate(id, layout)?;
                return Ok(state.read_axes(selector)?[axis]);
            }
            Behavior::Ranged | Behavior::PowerLine => {
                state.populate(id, layout)?;
                let cur = state.read(selector, Request::Cur)?;
                layout.pack(&cur)?
            }
            Behavior::Unimplemented => return Err(UvcError::AccessDenied),
        };
        state.record(id).current = Some(value);
        Ok(value)
    }

    pub fn set_enabled(&self, id: ControlId, enabled: bool) -> Result<()> {
        self.set(id, i32::from(enabled))
    }

    pub fn is_enabled(&self, id: ControlId) -> Result<bool> {
        Ok(self.get(id)? != 0)
    }

    /// Write the device default.
    pub fn reset(&self, id: ControlId) -> Result<()> {
        let limits = self.obtain_limit(id)?;
        self.set(id, limits.def)
    }

    /// Last value written or read, without touching the device.
    pub fn current(&self, id: ControlId) -> Option<i32> {
        self.state().records.get(&id).and_then(|r| r.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Default)]
    struct Device {
        limits: HashMap<(Selector, Request), Vec<i32>>,
        writes: Vec<(Selector, Vec<i32>)>,
        queries: usize,
    }

    #[derive(Clone, Default)]
    struct FakeTransport(Arc<Mutex<Device>>);

    impl FakeTransport {
        fn with(&self, selector: Selector, request: Request, fields: &[i32]) -> &Self {
            self.0
                .lock()
                .unwrap()
                .limits
                .insert((selector, request), fields.to_vec());
            self
        }

        fn writes(&self) -> Vec<(Selector, Vec<i32>)> {
            self.0.lock().unwrap().writes.clone()
        }

        fn queries(&self) -> usize {
            self.0.lock().unwrap().queries
        }
    }

    impl ControlTransport for FakeTransport {
        fn read(&mut self, selector: Selector, request: Request) -> Result<Vec<i32>> {
            let mut dev = self.0.lock().unwrap();
            dev.queries += 1;
            dev.limits
                .get(&(selector, request))
                .cloned()
                .ok_or_else(|| UvcError::NotFound(format!("{:?}", selector)))
        }

        fn write(&mut self, selector: Selector, fields: &[i32]) -> Result<()> {
            let mut dev = self.0.lock().unwrap();
            dev.writes.push((selector, fields.to_vec()));
            dev.limits.insert((selector, Request::Cur), fields.to_vec());
            Ok(())
        }
    }

    fn brightness_device() -> FakeTransport {
        let fake = FakeTransport::default();
        fake.with(Selector::Brightness, Request::Min, &[-64])
            .with(Selector::Brightness, Request::Max, &[64])
            .with(Selector::Brightness, Request::Def, &[0])
            .with(Selector::Brightness, Request::Cur, &[12]);
        fake
    }

    // ===== Limits =====

    #[test]
    fn test_limits_fetched_once() {
        let fake = brightness_device();
        let controls = DeviceControls::new(Box::new(fake.clone()), ControlBitmaps::all());

        let limits = controls.obtain_limit(ControlId::Brightness).unwrap();
        assert_eq!(limits, ControlLimits { min: -64, max: 64, def: 0 });
        assert_eq!(fake.queries(), 3, "MIN, MAX and DEF are each read once");

        controls.obtain_limit(ControlId::Brightness).unwrap();
        controls.set(ControlId::Brightness, 5).unwrap();
        assert_eq!(fake.queries(), 3, "Populated records are never re-queried");
    }

    #[test]
    fn test_unadvertised_control_is_denied() {
        let fake = brightness_device();
        let controls = DeviceControls::new(Box::new(fake.clone()), ControlBitmaps::default());

        assert!(matches!(
            controls.obtain_limit(ControlId::Brightness),
            Err(UvcError::AccessDenied)
        ));
        assert!(matches!(
            controls.set(ControlId::Brightness, 1),
            Err(UvcError::AccessDenied)
        ));
        assert!(matches!(
            controls.get(ControlId::Brightness),
            Err(UvcError::AccessDenied)
        ));
        assert_eq!(fake.queries(), 0, "Denied controls never reach the device");
        assert!(!controls.supports(ControlId::Brightness));
    }

    // ===== Clamping =====

    #[test]
    fn test_set_clamps_into_range() {
        let fake = brightness_device();
        let controls = DeviceControls::new(Box::new(fake.clone()), ControlBitmaps::all());

        controls.set(ControlId::Brightness, -1000).unwrap();
        controls.set(ControlId::Brightness, 1000).unwrap();
        controls.set(ControlId::Brightness, 7).unwrap();

        let writes: Vec<_> = fake.writes().into_iter().map(|(_, f)| f).collect();
        assert_eq!(writes, vec![vec![-64], vec![64], vec![7]]);
        assert_eq!(controls.current(ControlId::Brightness), Some(7));
    }

    #[test]
    fn test_get_reads_current_not_default() {
        let fake = brightness_device();
        let controls = DeviceControls::new(Box::new(fake), ControlBitmaps::all());
        assert_eq!(controls.get(ControlId::Brightness).unwrap(), 12);
    }

    #[test]
    fn test_first_get_populates_limits() {
        let fake = brightness_device();
        let controls = DeviceControls::new(Box::new(fake.clone()), ControlBitmaps::all());

        assert_eq!(controls.get(ControlId::Brightness).unwrap(), 12);
        assert_eq!(
            fake.queries(),
            4,
            "First get reads MIN, MAX and DEF before CUR"
        );

        let limits = controls.obtain_limit(ControlId::Brightness).unwrap();
        assert_eq!(limits, ControlLimits { min: -64, max: 64, def: 0 });
        assert_eq!(fake.queries(), 4, "Limits filled by get are reused");

        controls.get(ControlId::Brightness).unwrap();
        assert_eq!(fake.queries(), 5, "Later gets only read CUR");
    }

    // ===== Special controls =====

    #[test]
    fn test_boolean_skips_limits() {
        let fake = FakeTransport::default();
        let controls = DeviceControls::new(Box::new(fake.clone()), ControlBitmaps::all());

        controls.set(ControlId::FocusAuto, 42).unwrap();
        assert_eq!(fake.queries(), 0, "Boolean set never asks for limits");
        assert_eq!(fake.writes(), vec![(Selector::FocusAuto, vec![1])]);
        assert!(controls.is_enabled(ControlId::FocusAuto).unwrap());

        controls.set_enabled(ControlId::FocusAuto, false).unwrap();
        assert!(!controls.is_enabled(ControlId::FocusAuto).unwrap());
    }

    #[test]
    fn test_relative_pan_tilt_is_always_denied() {
        let controls =
            DeviceControls::new(Box::new(FakeTransport::default()), ControlBitmaps::all());
        for id in [
            ControlId::PanRelative,
            ControlId::TiltRelative,
            ControlId::RollRelative,
            ControlId::DigitalWindow,
            ControlId::RegionOfInterest,
        ] {
            assert!(matches!(controls.set(id, 1), Err(UvcError::AccessDenied)));
            assert!(matches!(controls.get(id), Err(UvcError::AccessDenied)));
            assert!(matches!(controls.obtain_limit(id), Err(UvcError::AccessDenied)));
        }
    }

    #[test]
    fn test_power_line_negative_uses_default() {
        let fake = FakeTransport::default();
        fake.with(Selector::PowerLineFrequency, Request::Def, &[2]);
        let controls = DeviceControls::new(Box::new(fake.clone()), ControlBitmaps::all());

        controls.set(ControlId::PowerLineFrequency, -1).unwrap();
        assert_eq!(fake.writes(), vec![(Selector::PowerLineFrequency, vec![2])]);
    }

    #[test]
    fn test_device_failure_is_returned() {
        let controls =
            DeviceControls::new(Box::new(FakeTransport::default()), ControlBitmaps::all());
        assert!(matches!(
            controls.set(ControlId::Gain, 3),
            Err(UvcError::NotFound(_))
        ));
        assert_eq!(controls.current(ControlId::Gain), None);
    }
}
