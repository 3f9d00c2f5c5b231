// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Bijection between external qubit identifiers and bit positions of the state vector index.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{error::Result, SimError};

/// Maps qubit ids onto bit positions. The positions in use are always exactly `0..len()`.
#[derive(Debug, Clone, Default)]
pub struct QubitMap {
    map: FxHashMap<usize, usize>,
}

impl QubitMap {
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maps `id` onto the next free bit position, which is the current number of qubits.
    /// # Errors
    /// Returns `SimError::DuplicateQubit` if `id` is already mapped.
    pub fn allocate(&mut self, id: usize) -> Result<usize> {
        if self.map.contains_key(&id) {
            return Err(SimError::DuplicateQubit(id));
        }
        let position = self.map.len();
        self.map.insert(id, position);
        Ok(position)
    }

    /// Removes `id` and returns the position it occupied. Higher positions move down by one so the
    /// remaining positions stay contiguous, matching the vector once that bit is removed from it.
    /// # Errors
    /// Returns `SimError::UnknownQubit` if `id` is not mapped.
    pub fn deallocate(&mut self, id: usize) -> Result<usize> {
        let position = self.map.remove(&id).ok_or(SimError::UnknownQubit(id))?;
        for value in self.map.values_mut() {
            if *value > position {
                *value -= 1;
            }
        }
        Ok(position)
    }

    /// # Errors
    /// Returns `SimError::UnknownQubit` if `id` is not mapped.
    pub fn position_of(&self, id: usize) -> Result<usize> {
        self.map.get(&id).copied().ok_or(SimError::UnknownQubit(id))
    }

    /// Resolves a list of ids to positions, preserving order.
    /// # Errors
    /// Returns `SimError::UnknownQubit` for the first id that is not mapped.
    pub fn positions_of(&self, ids: &[usize]) -> Result<Vec<usize>> {
        ids.iter().map(|&id| self.position_of(id)).collect()
    }

    /// Bit mask with the positions of all the given ids set.
    /// # Errors
    /// Returns `SimError::UnknownQubit` for the first id that is not mapped.
    pub fn mask_of(&self, ids: &[usize]) -> Result<usize> {
        ids.iter()
            .try_fold(0_usize, |mask, &id| Ok(mask | (1 << self.position_of(id)?)))
    }

    /// Moves `id` to `new_position`; the qubit currently there takes the old position of `id`.
    /// # Errors
    /// Returns `SimError::UnknownQubit` if `id` is not mapped, or
    /// `SimError::InternalConsistency` if `new_position` is not an occupied position.
    pub fn remap(&mut self, id: usize, new_position: usize) -> Result<()> {
        let old_position = self.position_of(id)?;
        if new_position >= self.map.len() {
            return Err(SimError::InternalConsistency(format!(
                "cannot move qubit {id} to position {new_position}, only {} positions exist",
                self.map.len()
            )));
        }
        if old_position == new_position {
            return Ok(());
        }
        let other = self
            .map
            .iter()
            .find_map(|(&key, &value)| (value == new_position).then_some(key))
            .ok_or_else(|| {
                SimError::InternalConsistency(format!("no qubit occupies position {new_position}"))
            })?;
        self.map.insert(other, old_position);
        self.map.insert(id, new_position);
        Ok(())
    }

    /// Replaces the whole mapping so that `ordering[i]` occupies position `i`.
    /// # Errors
    /// Returns `SimError::IncompleteOrdering` unless `ordering` is a permutation of the mapped ids.
    pub fn assign_ordering(&mut self, ordering: &[usize]) -> Result<()> {
        self.check_complete_ordering(ordering)?;
        for (position, &id) in ordering.iter().enumerate() {
            self.map.insert(id, position);
        }
        Ok(())
    }

    /// Verifies `ordering` lists every mapped id exactly once.
    /// # Errors
    /// Returns `SimError::IncompleteOrdering` otherwise.
    pub fn check_complete_ordering(&self, ordering: &[usize]) -> Result<()> {
        let incomplete = SimError::IncompleteOrdering {
            expected: self.map.len(),
            actual: ordering.len(),
        };
        if ordering.len() != self.map.len() {
            return Err(incomplete);
        }
        let mut seen = FxHashSet::default();
        if ordering
            .iter()
            .all(|id| self.map.contains_key(id) && seen.insert(*id))
        {
            Ok(())
        } else {
            Err(incomplete)
        }
    }

    /// Ids sorted by the position they occupy.
    #[must_use]
    pub fn ids_by_position(&self) -> Vec<usize> {
        let mut ids = vec![0; self.map.len()];
        for (&id, &position) in &self.map {
            ids[position] = id;
        }
        ids
    }

    #[must_use]
    pub fn to_map(&self) -> FxHashMap<usize, usize> {
        self.map.clone()
    }

    /// Checks that the mapped positions are exactly `0..len()`.
    pub(crate) fn is_bijective(&self) -> bool {
        let mut seen = vec![false; self.map.len()];
        self.map.values().all(|&position| {
            position < seen.len() && !std::mem::replace(&mut seen[position], true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_appends_positions() {
        let mut map = QubitMap::default();
        assert_eq!(map.allocate(7).unwrap(), 0);
        assert_eq!(map.allocate(3).unwrap(), 1);
        assert_eq!(map.allocate(11).unwrap(), 2);
        assert_eq!(map.allocate(3), Err(SimError::DuplicateQubit(3)));
        assert_eq!(map.ids_by_position(), vec![7, 3, 11]);
        assert!(map.is_bijective());
    }

    #[test]
    fn deallocate_compacts_positions() {
        let mut map = QubitMap::default();
        for id in 0..4 {
            map.allocate(id).unwrap();
        }
        assert_eq!(map.deallocate(1).unwrap(), 1);
        assert_eq!(map.position_of(0).unwrap(), 0);
        assert_eq!(map.position_of(2).unwrap(), 1);
        assert_eq!(map.position_of(3).unwrap(), 2);
        assert_eq!(map.deallocate(1), Err(SimError::UnknownQubit(1)));
        assert!(map.is_bijective());

        // A retired id is a brand new qubit when allocated again.
        assert_eq!(map.allocate(1).unwrap(), 3);
    }

    #[test]
    fn remap_swaps_occupants() {
        let mut map = QubitMap::default();
        for id in [10, 20, 30] {
            map.allocate(id).unwrap();
        }
        map.remap(10, 2).unwrap();
        assert_eq!(map.ids_by_position(), vec![30, 20, 10]);
        assert!(matches!(
            map.remap(20, 3),
            Err(SimError::InternalConsistency(_))
        ));
        assert_eq!(map.remap(40, 0), Err(SimError::UnknownQubit(40)));
        assert!(map.is_bijective());
    }

    #[test]
    fn ordering_must_be_complete() {
        let mut map = QubitMap::default();
        for id in [1, 2, 3] {
            map.allocate(id).unwrap();
        }
        assert!(map.check_complete_ordering(&[3, 1, 2]).is_ok());
        assert!(map.check_complete_ordering(&[3, 1]).is_err());
        assert!(map.check_complete_ordering(&[3, 1, 1]).is_err());
        assert!(map.check_complete_ordering(&[3, 1, 4]).is_err());

        map.assign_ordering(&[3, 1, 2]).unwrap();
        assert_eq!(map.ids_by_position(), vec![3, 1, 2]);
        assert_eq!(map.mask_of(&[3, 2]).unwrap(), 0b101);
    }
}
