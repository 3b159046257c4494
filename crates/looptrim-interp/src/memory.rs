//! Sparse buffer memory.
//!
//! Every buffer is an unbounded map from index to value. Cells that were
//! never written read from the buffer's [`Fill`]. A store of the value a cell
//! would read anyway leaves no trace, so two memories compare equal exactly
//! when every load would return the same value.

use std::collections::BTreeMap;

use looptrim::ir::Type;

use crate::Value;

/// What unwritten cells of a buffer contain.
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    /// The zero of the loaded type.
    Zero,
    /// The same value everywhere.
    Constant(Value),
    /// A pseudo-random value in `[0, modulus)` derived from the index.
    Hashed { seed: u64, modulus: u64 },
}

impl Fill {
    fn at(&self, index: i64, ty: Type) -> Value {
        match self {
            Fill::Zero => Value::zero(ty),
            Fill::Constant(v) => *v,
            Fill::Hashed { seed, modulus } => {
                let h = mix(*seed, index as u64);
                Value::from_raw(ty, h % (*modulus).max(1))
            }
        }
    }
}

/// One step of the splitmix64 finalizer.
pub(crate) fn mix(h: u64, v: u64) -> u64 {
    let mut z = h ^ v.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    fill: Fill,
    cells: BTreeMap<i64, Value>,
}

impl Buffer {
    pub fn new(fill: Fill) -> Self {
        Self {
            fill,
            cells: BTreeMap::new(),
        }
    }

    pub fn get(&self, index: i64, ty: Type) -> Value {
        self.cells
            .get(&index)
            .copied()
            .unwrap_or_else(|| self.fill.at(index, ty))
    }

    pub fn set(&mut self, index: i64, ty: Type, value: Value) {
        if self.fill.at(index, ty) == value {
            self.cells.remove(&index);
        } else {
            self.cells.insert(index, value);
        }
    }

    /// Cells whose content differs from the fill.
    pub fn written(&self) -> impl Iterator<Item = (i64, &Value)> {
        self.cells.iter().map(|(i, v)| (*i, v))
    }
}

/// All buffers of a program. Buffers that were never declared read as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Memory {
    buffers: BTreeMap<String, Buffer>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name` with the given fill.
    pub fn with_buffer(mut self, name: impl Into<String>, fill: Fill) -> Self {
        self.buffers.insert(name.into(), Buffer::new(fill));
        self
    }

    pub fn buffer(&self, name: &str) -> Option<&Buffer> {
        self.buffers.get(name)
    }

    pub fn load(&self, name: &str, index: i64, ty: Type) -> Value {
        match self.buffers.get(name) {
            Some(buffer) => buffer.get(index, ty),
            None => Value::zero(ty),
        }
    }

    pub fn store(&mut self, name: &str, index: i64, ty: Type, value: Value) {
        self.buffers
            .entry(name.to_string())
            .or_insert_with(|| Buffer::new(Fill::Zero))
            .set(index, ty, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const I32: Type = Type::int(32);

    #[test]
    fn unknown_buffers_read_zero() {
        let mem = Memory::new();
        assert_eq!(mem.load("a", 5, I32), Value::Int(0));
        assert!(mem.buffer("a").is_none());
    }

    #[test]
    fn hashed_fill_is_deterministic_and_bounded() {
        let mem = Memory::new().with_buffer("a", Fill::Hashed { seed: 7, modulus: 4 });
        for i in -20..20 {
            let v = mem.load("a", i, I32);
            assert_eq!(v, mem.load("a", i, I32));
            assert!(matches!(v, Value::Int(0..=3)), "cell {i} read {v:?}");
        }
    }

    #[test]
    fn storing_the_fill_value_leaves_no_trace() {
        let mut written = Memory::new().with_buffer("a", Fill::Constant(Value::Int(3)));
        let untouched = written.clone();
        written.store("a", 0, I32, Value::Int(3));
        assert_eq!(written, untouched);
        written.store("a", 0, I32, Value::Int(4));
        assert_ne!(written, untouched);
        written.store("a", 0, I32, Value::Int(3));
        assert_eq!(written, untouched);
    }

    #[test]
    fn stores_create_buffers() {
        let mut mem = Memory::new();
        mem.store("out", 2, I32, Value::Int(9));
        assert_eq!(mem.load("out", 2, I32), Value::Int(9));
        let cells: Vec<_> = mem.buffer("out").unwrap().written().collect();
        assert_eq!(cells, vec![(2, &Value::Int(9))]);
    }
}
