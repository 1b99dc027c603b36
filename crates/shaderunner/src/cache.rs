//! Per-stage storage of the last successfully compiled shader objects.

use anyhow::{bail, Result};
use shaderunner_gl::{ShaderStage, StageSet};

/// One slot per pipeline stage.
///
/// A slot is only ever replaced by a newer successful compile, so its
/// content always belongs to the currently linked program.
pub struct ShaderCache<S> {
    slots: [Option<S>; ShaderStage::COUNT],
}

impl<S> Default for ShaderCache<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ShaderCache<S> {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    pub fn get(&self, stage: ShaderStage) -> Option<&S> {
        self.slots[stage.index()].as_ref()
    }

    pub fn contains(&self, stage: ShaderStage) -> bool {
        self.slots[stage.index()].is_some()
    }

    /// Store `shader` for `stage`, returning the object it replaces.
    pub fn insert(&mut self, stage: ShaderStage, shader: S) -> Option<S> {
        self.slots[stage.index()].replace(shader)
    }

    /// Cached objects for `stages`, in link order.
    pub fn select(&self, stages: StageSet) -> Result<Vec<&S>> {
        self.select_with(stages, &[])
    }

    /// Like [`select`](Self::select), preferring objects from `fresh`
    /// (indexed by stage slot) over the cached ones.
    pub fn select_with<'a>(
        &'a self,
        stages: StageSet,
        fresh: &'a [Option<S>],
    ) -> Result<Vec<&'a S>> {
        stages
            .stages()
            .map(|stage| {
                let fresh = fresh.get(stage.index()).and_then(Option::as_ref);
                match fresh.or_else(|| self.get(stage)) {
                    Some(shader) => Ok(shader),
                    None => bail!("no compiled {stage} shader to link"),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_follows_stage_order() {
        let mut cache = ShaderCache::new();
        cache.insert(ShaderStage::Fragment, "frag");
        cache.insert(ShaderStage::Vertex, "vert");
        let selected = cache.select(StageSet::graphics()).unwrap();
        assert_eq!(selected, vec![&"vert", &"frag"]);
    }

    #[test]
    fn select_fails_on_an_empty_slot() {
        let mut cache = ShaderCache::new();
        cache.insert(ShaderStage::Vertex, 1);
        let err = cache.select(StageSet::graphics()).unwrap_err();
        assert!(err.to_string().contains("fragment"));
    }

    #[test]
    fn fresh_objects_take_precedence() {
        let mut cache = ShaderCache::new();
        cache.insert(ShaderStage::Vertex, 1);
        cache.insert(ShaderStage::Fragment, 2);
        let fresh = [None, Some(20), None];
        let selected = cache.select_with(StageSet::graphics(), &fresh).unwrap();
        assert_eq!(selected, vec![&1, &20]);
        assert_eq!(cache.get(ShaderStage::Fragment), Some(&2));
    }

    #[test]
    fn insert_returns_the_replaced_object() {
        let mut cache = ShaderCache::new();
        assert_eq!(cache.insert(ShaderStage::Geometry, 1), None);
        assert_eq!(cache.insert(ShaderStage::Geometry, 2), Some(1));
        assert!(cache.contains(ShaderStage::Geometry));
        assert!(!cache.contains(ShaderStage::Vertex));
    }
}
