//! Test suggestions from the prefix → tests mapping.

use std::collections::BTreeSet;

use crate::config::TestMap;

/// Union of the tests of every mapping whose prefix starts a changed path.
/// An empty set means no mapping matched, not that no tests are needed.
pub fn suggest<S: AsRef<str>>(changed_files: &[S], test_map: &TestMap) -> BTreeSet<String> {
  let mut tests = BTreeSet::new();
  for file in changed_files {
    let file = file.as_ref();
    for (prefix, mapped) in test_map.iter() {
      if file.starts_with(prefix.as_str()) {
        tests.extend(mapped.iter().cloned());
      }
    }
  }
  tests
}
