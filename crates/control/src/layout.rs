use common::{Result, UvcError};

/// Wire type of one control field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
}

impl Field {
    /// Reinterpret the low bits of `value` as this field type.
    pub fn truncate(self, value: i32) -> i32 {
        match self {
            Field::U8 => value as u8 as i32,
            Field::I8 => value as i8 as i32,
            Field::U16 => value as u16 as i32,
            Field::I16 => value as i16 as i32,
            Field::U32 | Field::I32 => value,
        }
    }
}

/// How a control's fields pack into the single integer the cache stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLayout {
    Single(Field),
    /// Two 8-bit fields packed as `(f1 << 8) + f2`.
    Pair(Field, Field),
    /// Three 8-bit fields packed as `(f1 << 16) + (f2 << 8) + f3`.
    Triple(Field, Field, Field),
    /// Two independent values sharing one selector, each with its own record.
    Axes(Field),
}

impl FieldLayout {
    pub fn field_count(&self) -> usize {
        match self {
            FieldLayout::Single(_) => 1,
            FieldLayout::Pair(..) | FieldLayout::Axes(_) => 2,
            FieldLayout::Triple(..) => 3,
        }
    }

    fn fields(&self) -> Vec<Field> {
        match *self {
            FieldLayout::Single(f) => vec![f],
            FieldLayout::Pair(a, b) => vec![a, b],
            FieldLayout::Triple(a, b, c) => vec![a, b, c],
            FieldLayout::Axes(f) => vec![f, f],
        }
    }

    fn check_len(&self, fields: &[i32]) -> Result<()> {
        if fields.len() != self.field_count() {
            return Err(UvcError::invalid(format!(
                "expected {} control fields, got {}",
                self.field_count(),
                fields.len()
            )));
        }
        Ok(())
    }

    /// Pack raw fields read from the device. Signed leading fields sign-extend.
    /// `Axes` layouts are not packed; use the per-axis records instead.
    pub fn pack(&self, raw: &[i32]) -> Result<i32> {
        self.check_len(raw)?;
        let fields = self.fields();
        let v: Vec<i32> = fields.iter().zip(raw).map(|(f, r)| f.truncate(*r)).collect();
        match self {
            FieldLayout::Single(_) => Ok(v[0]),
            FieldLayout::Pair(..) => Ok((v[0] << 8) + v[1]),
            FieldLayout::Triple(..) => Ok((v[0] << 16) + (v[1] << 8) + v[2]),
            FieldLayout::Axes(_) => Err(per_axis()),
        }
    }

    /// Split a packed value back into `field_count()` typed fields.
    pub fn unpack(&self, packed: i32) -> Result<Vec<i32>> {
        match *self {
            FieldLayout::Single(f) => Ok(vec![f.truncate(packed)]),
            FieldLayout::Pair(a, b) => Ok(vec![a.truncate(packed >> 8), b.truncate(packed)]),
            FieldLayout::Triple(a, b, c) => Ok(vec![
                a.truncate(packed >> 16),
                b.truncate(packed >> 8),
                c.truncate(packed),
            ]),
            FieldLayout::Axes(_) => Err(per_axis()),
        }
    }

    /// Clamp `value` into `[min, max]` and return the fields to write.
    /// Compound layouts clamp each field against the matching field of the limits.
    pub fn clamp(&self, value: i32, min: i32, max: i32) -> Result<Vec<i32>> {
        match self {
            FieldLayout::Single(f) => {
                Ok(vec![f.truncate(value.clamp(min.min(max), max.max(min)))])
            }
            FieldLayout::Axes(_) => Err(per_axis()),
            _ => {
                let lo = self.unpack(min)?;
                let hi = self.unpack(max)?;
                Ok(self
                    .unpack(value)?
                    .into_iter()
                    .zip(lo.into_iter().zip(hi))
                    .map(|(v, (lo, hi))| v.clamp(lo.min(hi), hi.max(lo)))
                    .collect())
            }
        }
    }
}

fn per_axis() -> UvcError {
    UvcError::invalid("axes are stored per axis")
}
