use crate::ids::Selector;
use common::Result;

/// Value requested from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Request {
    Min,
    Max,
    Def,
    Cur,
}

/// Control transfer primitives of a connected device.
///
/// Fields are in wire order and carry as many entries as the selector's
/// [`FieldLayout`](crate::layout::FieldLayout) has fields.
pub trait ControlTransport: Send {
    fn read(&mut self, selector: Selector, request: Request) -> Result<Vec<i32>>;
    fn write(&mut self, selector: Selector, fields: &[i32]) -> Result<()>;
}

impl<T: ControlTransport + ?Sized> ControlTransport for Box<T> {
    fn read(&mut self, selector: Selector, request: Request) -> Result<Vec<i32>> {
        (**self).read(selector, request)
    }

    fn write(&mut self, selector: Selector, fields: &[i32]) -> Result<()> {
        (**self).write(selector, fields)
    }
}
