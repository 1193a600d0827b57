use chanview_types::settings::{PinnedSet, Settings, TagAssignment, ThreadKey};
use tracing::{debug, error, warn};

use crate::{error::Error, settings::SettingsStore};

/// Pins, tags and the other user settings, written through to a
/// [`SettingsStore`] after every change.
///
/// A failed save is returned as [`Error::Save`] but the change stays in
/// memory; the next successful save persists it.
#[derive(Debug)]
pub struct TagStore<P> {
    settings: Settings,
    store: P,
}

impl<P: SettingsStore> TagStore<P> {
    /// Loads the stored snapshot, or starts from defaults if it can't be read.
    pub fn load(store: P) -> Self {
        let settings = match store.load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("{}, using defaults", Error::Load(e));
                Settings::default()
            }
        };
        TagStore { settings, store }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    fn persist(&mut self) -> Result<(), Error> {
        self.store.save(&self.settings).map_err(|e| {
            error!("Failed to save settings: {}", e);
            Error::Save(e)
        })
    }

    pub fn pinned(&self) -> &PinnedSet {
        &self.settings.pinned_threads
    }

    pub fn is_pinned(&self, key: &ThreadKey) -> bool {
        self.settings.pinned_threads.contains(key)
    }

    /// Returns whether the thread is pinned afterwards.
    pub fn toggle_pin(&mut self, key: &ThreadKey) -> Result<bool, Error> {
        let pinned = if self.settings.pinned_threads.remove(key) {
            false
        } else {
            self.settings.pinned_threads.insert(key.clone());
            true
        };
        debug!("Thread {} pinned: {}", key, pinned);
        self.persist()?;
        Ok(pinned)
    }

    pub fn tag_catalog(&self) -> &[String] {
        &self.settings.thread_tags
    }

    pub fn assignments(&self) -> &TagAssignment {
        &self.settings.tagged_threads
    }

    pub fn tags_for(&self, key: &ThreadKey) -> &[String] {
        self.settings
            .tagged_threads
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.settings.thread_tags.iter().any(|t| t == tag)
    }

    /// Adds or removes `tag` on a thread; returns whether it is set afterwards.
    /// The tag has to be defined first.
    pub fn toggle_tag(&mut self, key: &ThreadKey, tag: &str) -> Result<bool, Error> {
        if !self.is_defined(tag) {
            return Err(Error::UnknownTag(tag.to_string()));
        }
        let tags = self
            .settings
            .tagged_threads
            .entry(key.clone())
            .or_default();
        let tagged = match tags.iter().position(|t| t == tag) {
            Some(idx) => {
                tags.remove(idx);
                false
            }
            None => {
                tags.push(tag.to_string());
                true
            }
        };
        if tags.is_empty() {
            self.settings.tagged_threads.remove(key);
        }
        self.persist()?;
        Ok(tagged)
    }

    /// Adds a tag to the catalog; `Ok(false)` if it already exists.
    pub fn define_tag(&mut self, tag: &str) -> Result<bool, Error> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(Error::InvalidTag(tag.to_string()));
        }
        if self.is_defined(tag) {
            return Ok(false);
        }
        self.settings.thread_tags.push(tag.to_string());
        self.persist()?;
        Ok(true)
    }

    /// Removes a tag from the catalog and from every thread carrying it.
    pub fn delete_tag(&mut self, tag: &str) -> Result<bool, Error> {
        if !self.is_defined(tag) {
            return Ok(false);
        }
        self.settings.thread_tags.retain(|t| t != tag);
        self.settings.tagged_threads.retain(|_, tags| {
            tags.retain(|t| t != tag);
            !tags.is_empty()
        });
        self.persist()?;
        Ok(true)
    }

    pub fn is_favorite(&self, board: &str) -> bool {
        self.settings.favorite_boards.iter().any(|b| b == board)
    }

    pub fn toggle_favorite_board(&mut self, board: &str) -> Result<bool, Error> {
        let favorite = if self.is_favorite(board) {
            self.settings.favorite_boards.retain(|b| b != board);
            false
        } else {
            self.settings.favorite_boards.push(board.to_string());
            true
        };
        self.persist()?;
        Ok(favorite)
    }

    pub fn set_hover_zoom(&mut self, on: bool) -> Result<(), Error> {
        self.settings.hover_zoom = on;
        self.persist()
    }

    pub fn set_autoplay(&mut self, on: bool) -> Result<(), Error> {
        self.settings.autoplay = on;
        self.persist()
    }

    pub fn set_high_contrast(&mut self, on: bool) -> Result<(), Error> {
        self.settings.high_contrast = on;
        self.persist()
    }

    pub fn set_auto_refresh(&mut self, on: bool) -> Result<(), Error> {
        self.settings.auto_refresh = on;
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;

    fn key(no: u64) -> ThreadKey {
        ThreadKey::new("g", no)
    }

    fn store_with_tags(tags: &[&str]) -> TagStore<MemoryStore> {
        let mut store = TagStore::load(MemoryStore::new());
        for tag in tags {
            store.define_tag(tag).unwrap();
        }
        store
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_toggle_pin_persists_each_change() {
        let mut store = TagStore::load(MemoryStore::new());
        assert!(store.toggle_pin(&key(1)).unwrap());
        assert!(store.is_pinned(&key(1)));
        assert!(store.store().saved().unwrap().pinned_threads.contains(&key(1)));
        assert!(!store.toggle_pin(&key(1)).unwrap());
        assert!(store.store().saved().unwrap().pinned_threads.is_empty());
        assert_eq!(store.store().save_count(), 2);
    }

    #[test]
    fn test_toggle_unknown_tag_is_rejected() {
        let mut store = store_with_tags(&["later"]);
        let saves = store.store().save_count();
        assert!(matches!(
            store.toggle_tag(&key(1), "Later"),
            Err(Error::UnknownTag(tag)) if tag == "Later"
        ));
        assert!(!store.is_defined("Later"));
        assert!(store.assignments().is_empty());
        assert_eq!(store.store().save_count(), saves);
    }

    #[test]
    fn test_toggle_tag_off_removes_empty_entry() {
        let mut store = store_with_tags(&["later", "funny"]);
        assert!(store.toggle_tag(&key(1), "later").unwrap());
        assert!(store.toggle_tag(&key(1), "funny").unwrap());
        assert_eq!(store.tags_for(&key(1)), ["later", "funny"]);
        assert!(!store.toggle_tag(&key(1), "later").unwrap());
        assert!(!store.toggle_tag(&key(1), "funny").unwrap());
        assert!(!store.assignments().contains_key(&key(1)));
    }

    #[test]
    fn test_define_tag_is_a_case_sensitive_set() {
        let mut store = store_with_tags(&[]);
        assert!(store.define_tag("  later ").unwrap());
        assert!(!store.define_tag("later").unwrap());
        assert!(store.define_tag("Later").unwrap());
        assert!(matches!(store.define_tag("   "), Err(Error::InvalidTag(_))));
        assert_eq!(store.tag_catalog(), ["later", "Later"]);
    }

    #[test]
    fn test_delete_tag_cascades() {
        let mut store = store_with_tags(&["foo", "bar"]);
        store.toggle_tag(&key(1), "foo").unwrap();
        store.toggle_tag(&key(2), "foo").unwrap();
        store.toggle_tag(&key(2), "bar").unwrap();
        assert!(store.delete_tag("foo").unwrap());
        assert_eq!(store.tag_catalog(), ["bar"]);
        assert!(!store.assignments().contains_key(&key(1)));
        assert_eq!(store.tags_for(&key(2)), ["bar"]);
        assert!(store
            .assignments()
            .values()
            .all(|tags| !tags.iter().any(|t| t == "foo")));
        assert_eq!(store.store().saved().unwrap(), store.settings());
        assert!(!store.delete_tag("foo").unwrap());
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_failed_save_keeps_change_in_memory() {
        let mut store = TagStore::load(MemoryStore::new().failing_saves());
        assert!(matches!(store.toggle_pin(&key(3)), Err(Error::Save(_))));
        assert!(store.is_pinned(&key(3)));
        assert!(store.store().saved().is_none());
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_load_failure_falls_back_to_defaults() {
        let store = TagStore::load(MemoryStore::new().failing_loads());
        assert_eq!(store.settings(), &Settings::default());
    }

    #[test]
    fn test_favorites_and_flags() {
        let mut store = TagStore::load(MemoryStore::new());
        assert!(store.toggle_favorite_board("g").unwrap());
        assert!(store.is_favorite("g"));
        assert!(!store.toggle_favorite_board("g").unwrap());
        store.set_auto_refresh(true).unwrap();
        store.set_hover_zoom(false).unwrap();
        let saved = store.store().saved().unwrap();
        assert!(saved.auto_refresh);
        assert!(!saved.hover_zoom);
    }
}
