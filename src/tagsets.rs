use crate::tags::Tag;

use ahash::AHashMap;

/// Id of an interned tag-set. Stable for the lifetime of its [`TagSetTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagSetId(u32);

impl TagSetId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Unordered set of recognized tags attached to a way.
///
/// Kept sorted and free of duplicates, so that structural equality is set
/// equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TagSet {
    tags: Vec<Tag>,
}

impl TagSet {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&mut self, tag: Tag) {
        if let Err(pos) = self.tags.binary_search(&tag) {
            self.tags.insert(pos, tag);
        }
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.tags.binary_search(&tag).is_ok()
    }

    pub fn as_slice(&self) -> &[Tag] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterates the tags in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = Tag> + '_ {
        self.tags.iter().copied()
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut tags: Vec<Tag> = iter.into_iter().collect();
        tags.sort_unstable();
        tags.dedup();
        Self { tags }
    }
}

/// Append-only table deduplicating equal tag-sets.
#[derive(Debug, Default)]
pub struct TagSetTable {
    // Append only, entries are never modified after insertion
    sets: Vec<TagSet>,
    dedup: AHashMap<TagSet, TagSetId>,
}

impl TagSetTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Inserts a tag-set into the table and returns its id.
    ///
    /// If an equal set was already inserted before, the set is deduplicated
    /// and the id of the previous set is returned.
    pub fn intern(&mut self, set: TagSet) -> TagSetId {
        if let Some(&id) = self.dedup.get(&set) {
            return id;
        }
        let id = TagSetId(self.sets.len() as u32);
        self.sets.push(set.clone());
        self.dedup.insert(set, id);
        id
    }

    pub fn get(&self, id: TagSetId) -> &TagSet {
        &self.sets[id.index()]
    }

    /// Number of distinct tag-sets.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
