use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_ASSET_COUNT: usize = 10;
pub const WEIGHT_CAP_PERCENT: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSlot {
    pub index: usize,
    pub symbol: Option<String>,
    pub minimum_weight_percent: u32,
}

impl AssetSlot {
    fn empty(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    TooManyAssets { requested: usize },
    SlotOutOfRange { index: usize, len: usize },
    EmptySymbol { index: usize },
    DuplicateSymbol { symbol: String, held_by: usize },
    WeightOutOfRange { index: usize, requested: i64, max: u32 },
}

impl fmt::Display for AllocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyAssets { requested } => write!(
                f,
                "asset count must be 0..={MAX_ASSET_COUNT} (got {requested})"
            ),
            Self::SlotOutOfRange { index, len } => {
                write!(f, "slot {index} out of range ({len} slots)")
            }
            Self::EmptySymbol { index } => write!(f, "slot {index}: symbol must be non-empty"),
            Self::DuplicateSymbol { symbol, held_by } => {
                write!(f, "symbol {symbol} is already selected in slot {held_by}")
            }
            Self::WeightOutOfRange {
                index,
                requested,
                max,
            } => write!(
                f,
                "slot {index}: minimum weight must be 0..={max} (got {requested})"
            ),
        }
    }
}

impl std::error::Error for AllocationError {}

/// Fixed-length set of asset slots whose minimum weights never sum past 100.
///
/// Totals are always recomputed from the slots; nothing is cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllocationState {
    slots: Vec<AssetSlot>,
}

impl AllocationState {
    pub fn with_asset_count(count: usize) -> Result<Self, AllocationError> {
        if count > MAX_ASSET_COUNT {
            return Err(AllocationError::TooManyAssets { requested: count });
        }
        Ok(Self {
            slots: (0..count).map(AssetSlot::empty).collect(),
        })
    }

    /// Replaces every slot with `count` fresh ones. Prior selections are not kept.
    pub fn set_asset_count(&mut self, count: usize) -> Result<(), AllocationError> {
        *self = Self::with_asset_count(count)?;
        Ok(())
    }

    pub fn asset_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[AssetSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Result<&AssetSlot, AllocationError> {
        self.slots.get(index).ok_or(AllocationError::SlotOutOfRange {
            index,
            len: self.slots.len(),
        })
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut AssetSlot, AllocationError> {
        let len = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(AllocationError::SlotOutOfRange { index, len })
    }

    pub fn set_slot_symbol(
        &mut self,
        index: usize,
        symbol: impl AsRef<str>,
    ) -> Result<(), AllocationError> {
        self.slot(index)?;
        let symbol = symbol.as_ref().trim();
        if symbol.is_empty() {
            return Err(AllocationError::EmptySymbol { index });
        }

        if let Some(other) = self
            .slots
            .iter()
            .find(|s| s.index != index && s.symbol.as_deref() == Some(symbol))
        {
            return Err(AllocationError::DuplicateSymbol {
                symbol: symbol.to_string(),
                held_by: other.index,
            });
        }

        self.slot_mut(index)?.symbol = Some(symbol.to_string());
        Ok(())
    }

    pub fn clear_slot_symbol(&mut self, index: usize) -> Result<(), AllocationError> {
        self.slot_mut(index)?.symbol = None;
        Ok(())
    }

    /// Clamps `percent` into `[0, max_for(index)]` and returns the stored value.
    pub fn set_slot_minimum_weight(
        &mut self,
        index: usize,
        percent: i64,
    ) -> Result<u32, AllocationError> {
        let max = self.max_for(index)?;
        let applied = percent.clamp(0, max as i64) as u32;
        self.slot_mut(index)?.minimum_weight_percent = applied;
        Ok(applied)
    }

    /// Like `set_slot_minimum_weight` but rejects values outside `[0, max_for(index)]`
    /// instead of clamping them. For one-shot callers that never see the clamped value.
    pub fn require_slot_minimum_weight(
        &mut self,
        index: usize,
        percent: i64,
    ) -> Result<u32, AllocationError> {
        let max = self.max_for(index)?;
        if !(0..=i64::from(max)).contains(&percent) {
            return Err(AllocationError::WeightOutOfRange {
                index,
                requested: percent,
                max,
            });
        }
        self.set_slot_minimum_weight(index, percent)
    }

    /// Headroom for one slot: 100 minus what every other slot already claims.
    pub fn max_for(&self, index: usize) -> Result<u32, AllocationError> {
        self.slot(index)?;
        let others: u32 = self
            .slots
            .iter()
            .filter(|s| s.index != index)
            .map(|s| s.minimum_weight_percent)
            .sum();
        Ok(WEIGHT_CAP_PERCENT.saturating_sub(others))
    }

    pub fn total_minimum_weight(&self) -> u32 {
        self.slots.iter().map(|s| s.minimum_weight_percent).sum()
    }

    pub fn is_fully_selected(&self) -> bool {
        self.slots.iter().all(|s| s.symbol.is_some())
    }

    pub fn selected_symbols(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().filter_map(|s| s.symbol.as_deref())
    }

    /// Candidates still selectable for `index`: everything not held by another slot.
    pub fn available_candidates<'a>(
        &self,
        index: usize,
        candidates: &'a [String],
    ) -> Result<Vec<&'a str>, AllocationError> {
        self.slot(index)?;
        let taken: Vec<&str> = self
            .slots
            .iter()
            .filter(|s| s.index != index)
            .filter_map(|s| s.symbol.as_deref())
            .collect();
        Ok(candidates
            .iter()
            .map(String::as_str)
            .filter(|c| !taken.contains(c))
            .collect())
    }
}
