//! The fixed-field statistics record being joined.

use std::fmt;

use crate::error::{Error, Result};

/// Largest value the 3-bit `mode` field can hold.
pub const MODE_MAX: u8 = 0b111;

/// One statistics record.
///
/// `mode` is kept private so the 3-bit range holds for every value of this
/// type; read it with [`Record::mode`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Record {
    pub id: i64,
    pub count: i32,
    pub cost: f32,
    pub primary: bool,
    mode: u8,
}

impl Record {
    /// Builds a record, keeping only the low 3 bits of `mode`.
    pub fn new(id: i64, count: i32, cost: f32, primary: bool, mode: u8) -> Self {
        Self {
            id,
            count,
            cost,
            primary,
            mode: mode & MODE_MAX,
        }
    }

    /// Builds a record, rejecting a `mode` that does not fit in 3 bits.
    pub fn try_new(id: i64, count: i32, cost: f32, primary: bool, mode: u8) -> Result<Self> {
        if mode > MODE_MAX {
            return Err(Error::InvalidArgument(format!(
                "mode {mode} does not fit in 3 bits"
            )));
        }
        Ok(Self::new(id, count, cost, primary, mode))
    }

    #[inline]
    pub fn mode(&self) -> u8 {
        self.mode
    }

    #[cfg(test)]
    fn set_mode(&mut self, mode: u8) {
        self.mode = mode & MODE_MAX;
    }

    /// Folds `other` into `self`: counts and costs add up, `primary` survives
    /// only if both are primary, `mode` keeps the larger value.
    ///
    /// The operation is commutative and associative, so the aggregate of a
    /// group does not depend on the order its members arrive in. `count`
    /// wraps like the 32-bit field it models.
    #[inline]
    pub fn combine(&mut self, other: &Record) {
        self.count = self.count.wrapping_add(other.count);
        self.cost += other.cost;
        self.primary &= other.primary;
        self.mode = self.mode.max(other.mode);
    }

    #[cfg(test)]
    fn combined(mut self, other: &Record) -> Record {
        self.combine(other);
        self
    }

    /// Field-wise equality with `cost` compared within `epsilon`.
    pub fn approx_eq(&self, other: &Record, epsilon: f32) -> bool {
        self.id == other.id
            && self.count == other.count
            && (self.cost - other.cost).abs() < epsilon
            && self.primary == other.primary
            && self.mode == other.mode
    }
}

/// Formats a float as `d.ddde±XX`, the shape printf's `%.3e` produces.
fn scientific(value: f32) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let rendered = format!("{:.3e}", value as f64);
    match rendered.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exponent.abs())
        }
        None => rendered,
    }
}

/// Preview line: hex id, count, scientific cost, `y`/`n` primary and the
/// mode as three binary digits, separated by tabs.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:x}\t{}\t{}\t{}\t{:03b}",
            self.id as u64,
            self.count,
            scientific(self.cost),
            if self.primary { "y" } else { "n" },
            self.mode
        )
    }
}
