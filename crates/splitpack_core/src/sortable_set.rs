use std::any::Any;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

use indexmap::IndexSet;

/// Identity token for a sort order.
///
/// Closures have no stable identity in Rust, so callers name the order they
/// apply; two consecutive sorts with the same tag are assumed to use the same
/// comparator and the second one is a no-op.
pub type SortTag = &'static str;

/// An insertion-ordered unique-element set with lazy, memoized sorting and
/// cached derived computations that are invalidated on mutation.
///
/// The hot sets of the chunk graph (a chunk's modules, a module's chunks) are
/// asked for "this set, sorted" and "an aggregate over the contents" many
/// thousands of times per build. Without memoization that is O(n log n) or
/// O(n) per call; with it, repeated asks are O(1).
pub struct SortableSet<T> {
  items: IndexSet<T>,
  last_sort: Option<SortTag>,
  default_sort: Option<(SortTag, Box<dyn Fn(&T, &T) -> Ordering>)>,
  /// Results that depend on the current iteration order. Invalidated by any
  /// mutation and by any re-sort.
  ordered_cache: RefCell<HashMap<&'static str, Box<dyn Any>>>,
  /// Results of order-insensitive computations (e.g. a size sum).
  /// Invalidated only by mutation, never by sorting.
  unordered_cache: RefCell<HashMap<&'static str, Box<dyn Any>>>,
}

impl<T: Hash + Eq> Default for SortableSet<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Hash + Eq> SortableSet<T> {
  pub fn new() -> Self {
    Self {
      items: IndexSet::new(),
      last_sort: None,
      default_sort: None,
      ordered_cache: RefCell::new(HashMap::new()),
      unordered_cache: RefCell::new(HashMap::new()),
    }
  }

  /// A set with a default order for [`SortableSet::sort`].
  pub fn with_default_order(tag: SortTag, cmp: impl Fn(&T, &T) -> Ordering + 'static) -> Self {
    let mut set = Self::new();
    set.default_sort = Some((tag, Box::new(cmp)));
    set
  }

  /// Appends `value` unless it is already present. Returns whether the set
  /// changed.
  pub fn add(&mut self, value: T) -> bool {
    if self.items.insert(value) {
      self.invalidate();
      true
    } else {
      false
    }
  }

  /// Removes `value`, preserving the relative order of the remaining
  /// elements. Returns whether the set changed.
  pub fn delete(&mut self, value: &T) -> bool {
    if self.items.shift_remove(value) {
      self.invalidate();
      true
    } else {
      false
    }
  }

  pub fn clear(&mut self) {
    if !self.items.is_empty() {
      self.items.clear();
      self.invalidate();
    }
  }

  pub fn contains(&self, value: &T) -> bool {
    self.items.contains(value)
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> indexmap::set::Iter<'_, T> {
    self.items.iter()
  }

  /// Sorts the set in place unless `tag` matches the last applied sort (or
  /// the set has at most one element), in which case nothing moves.
  pub fn sort_with(&mut self, tag: SortTag, cmp: impl FnMut(&T, &T) -> Ordering) {
    if self.items.len() <= 1 || self.last_sort == Some(tag) {
      // Already sorted, or too small to matter. Record the order anyway so a
      // later identical ask stays a no-op.
      self.last_sort = Some(tag);
      return;
    }
    self.items.sort_by(cmp);
    self.last_sort = Some(tag);
    self.ordered_cache.borrow_mut().clear();
  }

  /// Sorts with the default comparator supplied at construction.
  ///
  /// # Panics
  ///
  /// Panics when the set was built without a default order.
  pub fn sort(&mut self) {
    let (tag, cmp) = self
      .default_sort
      .take()
      .unwrap_or_else(|| panic!("sort() called on a SortableSet without a default order"));
    self.sort_with(tag, |a, b| cmp(a, b));
    self.default_sort = Some((tag, cmp));
  }

  /// Memoizes `compute` over the set's current contents and order. The value
  /// is dropped on any mutation or re-sort.
  pub fn get_from_cache<R: Clone + 'static>(
    &self,
    key: &'static str,
    compute: impl FnOnce(&IndexSet<T>) -> R,
  ) -> R {
    let mut cache = self.ordered_cache.borrow_mut();
    if let Some(hit) = cache.get(key).and_then(|v| v.downcast_ref::<R>()) {
      return hit.clone();
    }
    let value = compute(&self.items);
    cache.insert(key, Box::new(value.clone()));
    value
  }

  /// Memoizes `compute` assuming it is order-insensitive: the cached value
  /// survives re-sorts and is dropped only on mutation.
  pub fn get_from_unordered_cache<R: Clone + 'static>(
    &self,
    key: &'static str,
    compute: impl FnOnce(&IndexSet<T>) -> R,
  ) -> R {
    let mut cache = self.unordered_cache.borrow_mut();
    if let Some(hit) = cache.get(key).and_then(|v| v.downcast_ref::<R>()) {
      return hit.clone();
    }
    let value = compute(&self.items);
    cache.insert(key, Box::new(value.clone()));
    value
  }

  fn invalidate(&mut self) {
    self.last_sort = None;
    self.ordered_cache.borrow_mut().clear();
    self.unordered_cache.borrow_mut().clear();
  }
}

impl<'a, T: Hash + Eq> IntoIterator for &'a SortableSet<T> {
  type Item = &'a T;
  type IntoIter = indexmap::set::Iter<'a, T>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

impl<T: Hash + Eq> FromIterator<T> for SortableSet<T> {
  fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
    let mut set = Self::new();
    for item in iter {
      set.add(item);
    }
    set
  }
}

impl<T: Hash + Eq + std::fmt::Debug> std::fmt::Debug for SortableSet<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_set().entries(self.items.iter()).finish()
  }
}
