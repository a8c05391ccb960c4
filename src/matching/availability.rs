//! Availability index over the specialist pool
//!
//! Builds a lookup from `(weekday, site, time-slot)` to the specialists
//! free at that slot. The index is built once per run from a point-in-time
//! read of the whole pool and never mutated afterwards.

use std::collections::HashMap;
use std::fmt;

use crate::models::{AvailabilitySlot, ScheduleSlot, SpecialistAvailability};

/// Composite key identifying one accompaniment opportunity window.
///
/// The same key is derived from both sides: a teacher's schedule slot
/// (`dia`/`sede`/`hora`) and a specialist's availability tuple
/// (`dia`/`sede`/`franja`). Components are trimmed so stray whitespace
/// in an upload does not split buckets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub dia: String,
    pub sede: String,
    pub franja: String,
}

impl SlotKey {
    pub fn new(dia: &str, sede: &str, franja: &str) -> Self {
        Self {
            dia: dia.trim().to_string(),
            sede: sede.trim().to_string(),
            franja: franja.trim().to_string(),
        }
    }

    /// Key for a teacher's schedule slot
    pub fn for_schedule(slot: &ScheduleSlot) -> Self {
        Self::new(&slot.dia, &slot.sede, &slot.hora)
    }

    /// Key for a specialist's availability tuple
    pub fn for_availability(slot: &AvailabilitySlot) -> Self {
        Self::new(&slot.dia, &slot.sede, &slot.franja)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.dia, self.sede, self.franja)
    }
}

/// One specialist entry within a bucket
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub dni: String,
    pub nombre: String,
    /// The availability tuple that put this candidate in the bucket
    pub detalle: AvailabilitySlot,
}

/// Immutable lookup from slot key to ordered candidate list.
///
/// Ordering rule ("first inserted wins"): candidates appear in each bucket
/// in pool insertion order — record order first, then tuple order within a
/// record. The head of a bucket is the deterministic tie-break winner for
/// fresh matches. This is a deliberate policy, pinned down by tests, not
/// an artifact of iteration order.
#[derive(Debug, Default)]
pub struct AvailabilityIndex {
    buckets: HashMap<SlotKey, Vec<Candidate>>,
    specialists: usize,
}

impl AvailabilityIndex {
    /// Build the index from the full availability pool.
    ///
    /// Specialist ids are coerced to trimmed strings before indexing since
    /// source data mixes numeric and string ids for the same person.
    pub fn build(pool: &[SpecialistAvailability]) -> Self {
        let mut buckets: HashMap<SlotKey, Vec<Candidate>> = HashMap::new();

        for record in pool {
            let dni = record.dni.trim().to_string();
            if dni.is_empty() {
                tracing::warn!(
                    nombre = %record.nombre_completo,
                    "skipping availability record without a specialist id"
                );
                continue;
            }
            for tuple in &record.disponibilidad {
                let key = SlotKey::for_availability(tuple);
                buckets.entry(key).or_default().push(Candidate {
                    dni: dni.clone(),
                    nombre: record.nombre_completo.clone(),
                    detalle: tuple.clone(),
                });
            }
        }

        Self {
            buckets,
            specialists: pool.len(),
        }
    }

    /// Candidates free at the given key, in insertion order. Empty slice
    /// when nobody is free.
    pub fn candidates(&self, key: &SlotKey) -> &[Candidate] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Find a specific specialist within the bucket for `key`
    pub fn find(&self, key: &SlotKey, dni: &str) -> Option<&Candidate> {
        self.candidates(key).iter().find(|c| c.dni == dni)
    }

    /// Number of distinct slot keys
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of pool records the index was built from
    pub fn pool_size(&self) -> usize {
        self.specialists
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specialist(dni: &str, nombre: &str, slots: &[(&str, &str, &str)]) -> SpecialistAvailability {
        SpecialistAvailability {
            dni: dni.to_string(),
            nombre_completo: nombre.to_string(),
            disponibilidad: slots
                .iter()
                .map(|(d, s, f)| AvailabilitySlot {
                    dia: d.to_string(),
                    sede: s.to_string(),
                    franja: f.to_string(),
                })
                .collect(),
            modalidad: None,
            sede_preferida: None,
            segmento: None,
        }
    }

    #[test]
    fn test_build_groups_by_key() {
        let pool = vec![
            specialist("E1", "Ana", &[("LUNES", "SUR", "08:00 - 10:00")]),
            specialist("E2", "Beto", &[("LUNES", "SUR", "08:00 - 10:00")]),
            specialist("E3", "Carla", &[("MARTES", "SUR", "08:00 - 10:00")]),
        ];
        let index = AvailabilityIndex::build(&pool);

        let key = SlotKey::new("LUNES", "SUR", "08:00 - 10:00");
        let candidates = index.candidates(&key);
        assert_eq!(candidates.len(), 2);
        assert_eq!(index.len(), 2);
        assert_eq!(index.pool_size(), 3);
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let pool = vec![
            specialist("E9", "Zoe", &[("LUNES", "SUR", "08:00 - 10:00")]),
            specialist("E1", "Ana", &[("LUNES", "SUR", "08:00 - 10:00")]),
        ];
        let index = AvailabilityIndex::build(&pool);

        let key = SlotKey::new("LUNES", "SUR", "08:00 - 10:00");
        let candidates = index.candidates(&key);
        // First inserted wins the head position regardless of id ordering
        assert_eq!(candidates[0].dni, "E9");
        assert_eq!(candidates[1].dni, "E1");
    }

    #[test]
    fn test_key_components_are_trimmed() {
        let pool = vec![specialist("E1", "Ana", &[(" LUNES ", "SUR", "08:00 - 10:00 ")])];
        let index = AvailabilityIndex::build(&pool);

        let key = SlotKey::new("LUNES", "SUR", "08:00 - 10:00");
        assert_eq!(index.candidates(&key).len(), 1);
    }

    #[test]
    fn test_dni_coerced_to_trimmed_string() {
        let record = specialist("  40228311 ", "Ana", &[("LUNES", "SUR", "08:00 - 10:00")]);
        let index = AvailabilityIndex::build(&[record]);

        let key = SlotKey::new("LUNES", "SUR", "08:00 - 10:00");
        assert_eq!(index.candidates(&key)[0].dni, "40228311");
    }

    #[test]
    fn test_missing_key_yields_empty_slice() {
        let index = AvailabilityIndex::build(&[]);
        let key = SlotKey::new("LUNES", "SUR", "08:00 - 10:00");
        assert!(index.candidates(&key).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_find_specialist_in_bucket() {
        let pool = vec![
            specialist("E1", "Ana", &[("LUNES", "SUR", "08:00 - 10:00")]),
            specialist("E2", "Beto", &[("LUNES", "SUR", "08:00 - 10:00")]),
        ];
        let index = AvailabilityIndex::build(&pool);
        let key = SlotKey::new("LUNES", "SUR", "08:00 - 10:00");

        assert!(index.find(&key, "E2").is_some());
        assert!(index.find(&key, "E7").is_none());
    }
}
